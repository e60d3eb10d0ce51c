//! Data models shared across the session lifecycle.
//!
//! This module contains the types visible outside the credential layer:
//!
//! - `IdentityClaims`: who is signed in, established once per sign-in
//! - `PropertyScope`: an authorized resource scope (property) for the user
//!
//! Both are exported as TypeScript definitions when the `ts` feature is
//! enabled, for consumption by the web dashboard.

pub mod claims;
pub mod property;

pub use claims::IdentityClaims;
pub use property::PropertyScope;

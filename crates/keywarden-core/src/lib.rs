//! Session lifecycle and credential renewal against a bearer-token backend.
//!
//! `keywarden-core` keeps one signed-in session alive across two REST
//! services: an identity backend that issues short-lived access credentials
//! alongside opaque refresh credentials, and a resource API that accepts the
//! access credential as a bearer header.
//!
//! The pieces:
//! - [`SessionPipeline`]: sign-in (password or federated), session
//!   materialization with lazy renewal, restore, sign-out
//! - [`RefreshCoordinator`]: single-flight renewal, however many tasks
//!   notice staleness at once
//! - [`Transport`]: resource calls with bearer injection and silent 401
//!   recovery
//! - [`authorize`]: pure allow-or-redirect decisions for protected paths
//! - [`ScopeCache`]: the property scope list with a sticky selection
//!
//! Everything hangs off an explicitly constructed [`SessionStore`] handle;
//! the crate holds no global state.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;

pub use api::{ApiError, FederatedGrant, IdentityClient, TokenGrant, Transport};
pub use auth::{
    authorize, AuthError, FileStorage, GuardDecision, KeyringStorage, MemoryStorage,
    RefreshCoordinator, SessionFailure, SessionPhase, SessionPipeline, SessionSnapshot,
    SessionStorage, SessionStore,
};
pub use cache::ScopeCache;
pub use config::Config;
pub use models::{IdentityClaims, PropertyScope};

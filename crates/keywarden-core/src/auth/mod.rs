//! Session and credential lifecycle.
//!
//! This module provides:
//! - `SessionStore`: shared in-memory session state, written atomically
//! - `RefreshCoordinator`: single-flight renewal of the access credential
//! - `SessionPipeline`: sign-in, materialization, restore, sign-out
//! - `authorize`: pure route-guard decisions
//! - `SessionStorage` backends: keychain, file, and in-memory persistence
//!
//! A session fails in one of two ways, and the distinction matters:
//! `RefreshFailed` is terminal until the next sign-in, while
//! `VerificationFailed` is given one renewal attempt to heal.

pub mod error;
pub mod guard;
pub mod pipeline;
pub mod refresh;
pub mod storage;
pub mod store;
pub mod verifier;

pub use error::AuthError;
pub use guard::{authorize, GuardDecision};
pub use pipeline::{SessionPhase, SessionPipeline};
pub use refresh::RefreshCoordinator;
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};
pub use store::{CredentialPair, SessionFailure, SessionRecord, SessionSnapshot, SessionStore};
pub use verifier::DEFAULT_REFRESH_GRACE_SECS;

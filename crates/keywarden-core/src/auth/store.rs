//! In-memory session state shared across the crate.
//!
//! One [`SessionStore`] handle is created at startup and cloned into the
//! refresh coordinator, the transport, and the callback pipeline. Every
//! mutation swaps the credential pair and the failure flag in a single write
//! so readers never observe a half-updated session.
//!
//! Raw credential values stay inside this module's types. Callers that only
//! render state get a [`SessionSnapshot`], which carries the identity claims
//! and a failure flag but no token material.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::error::AuthError;
use super::verifier;
use crate::models::IdentityClaims;

// ===== Credential pair =====

/// An access/refresh credential pair plus the access credential's decoded
/// expiry. Constructed through [`CredentialPair::from_tokens`] so the stored
/// expiry always matches what is embedded in the access credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub access_expiry: DateTime<Utc>,
    pub refresh: String,
}

impl CredentialPair {
    /// Build a pair from raw wire tokens, decoding the access expiry.
    pub fn from_tokens(
        access: impl Into<String>,
        refresh: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let access = access.into();
        let access_expiry = verifier::decode_expiry(&access)?;
        Ok(Self {
            access,
            access_expiry,
            refresh: refresh.into(),
        })
    }

    /// Whether the access credential is due for renewal at `now`.
    pub fn needs_refresh_at(&self, grace_secs: i64, now: DateTime<Utc>) -> bool {
        now >= self.access_expiry - Duration::seconds(grace_secs)
    }

    /// [`Self::needs_refresh_at`] against the current wall clock.
    pub fn needs_refresh(&self, grace_secs: i64) -> bool {
        self.needs_refresh_at(grace_secs, Utc::now())
    }
}

// ===== Failure flag =====

/// Why a session stopped being usable. `RefreshFailed` is terminal: no
/// further implicit renewals are attempted until the user signs in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SessionFailure {
    RefreshFailed,
    VerificationFailed,
}

impl SessionFailure {
    /// Stable reason code carried to the sign-in redirect.
    pub fn reason_code(&self) -> &'static str {
        match self {
            SessionFailure::RefreshFailed => "RefreshTokenError",
            SessionFailure::VerificationFailed => "TokenVerificationError",
        }
    }
}

// ===== Records =====

/// Everything known about the signed-in user. This is what storage backends
/// persist; it never crosses an API boundary directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub claims: IdentityClaims,
    pub credentials: CredentialPair,
    pub failure: Option<SessionFailure>,
}

impl SessionRecord {
    pub fn new(claims: IdentityClaims, credentials: CredentialPair) -> Self {
        Self {
            claims,
            credentials,
            failure: None,
        }
    }
}

/// Credential-free projection of a [`SessionRecord`] for rendering and
/// route decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionSnapshot {
    pub claims: IdentityClaims,
    pub has_access: bool,
    pub failure: Option<SessionFailure>,
}

// ===== Store =====

/// Shared handle to the current session. Clones are cheap and all point at
/// the same record.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<SessionRecord>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole session after a successful sign-in.
    pub async fn install(&self, record: SessionRecord) {
        *self.inner.write().await = Some(record);
    }

    /// Swap in a freshly renewed pair and clear any failure flag in the same
    /// write. Does nothing when no session exists (signed out mid-renewal).
    pub async fn install_pair(&self, pair: CredentialPair) {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.as_mut() {
            record.credentials = pair;
            record.failure = None;
        }
    }

    /// Flag the session as failed, keeping claims and credentials in place so
    /// callers can still render who was signed in. No-op without a session.
    pub async fn mark_failure(&self, failure: SessionFailure) {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.as_mut() {
            record.failure = Some(failure);
        }
    }

    /// Drop the session entirely.
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }

    /// Credential-free view of the current session.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        self.inner.read().await.as_ref().map(|record| SessionSnapshot {
            claims: record.claims.clone(),
            has_access: record.failure.is_none(),
            failure: record.failure,
        })
    }

    /// The current credential pair, if any.
    pub async fn credentials(&self) -> Option<CredentialPair> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|record| record.credentials.clone())
    }

    /// The current failure flag, if any.
    pub async fn failure(&self) -> Option<SessionFailure> {
        self.inner.read().await.as_ref().and_then(|record| record.failure)
    }

    /// Full record clone, for persistence.
    pub async fn record(&self) -> Option<SessionRecord> {
        self.inner.read().await.clone()
    }
}

//! Session lifecycle orchestration.
//!
//! The pipeline strings the other pieces together: sign-in (password or
//! federated) establishes a session, `session()` materializes the current
//! view and lazily renews a stale credential, `sign_out()` tears everything
//! down. When a storage backend is attached, the record is persisted on
//! every change so a later process can pick the session back up.
//!
//! Sign-in is all-or-nothing. Any failure along the way, including a
//! federated exchange the provider half-completed, leaves no session
//! behind.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::AuthError;
use super::refresh::RefreshCoordinator;
use super::storage::SessionStorage;
use super::store::{CredentialPair, SessionFailure, SessionRecord, SessionSnapshot, SessionStore};
use super::verifier::{self, DEFAULT_REFRESH_GRACE_SECS};
use crate::api::{ApiError, FederatedGrant, IdentityClient, TokenGrant};

/// Where the session currently stands, derived from the stored record so it
/// cannot drift from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticated,
    Failed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Drives sign-in, materialization, and sign-out against one session store.
#[derive(Clone)]
pub struct SessionPipeline {
    identity: IdentityClient,
    store: SessionStore,
    coordinator: RefreshCoordinator,
    storage: Option<Arc<dyn SessionStorage>>,
    grace_secs: i64,
}

impl SessionPipeline {
    pub fn new(
        identity: IdentityClient,
        store: SessionStore,
        coordinator: RefreshCoordinator,
    ) -> Self {
        Self {
            identity,
            store,
            coordinator,
            storage: None,
            grace_secs: DEFAULT_REFRESH_GRACE_SECS,
        }
    }

    /// Attach a persistence backend; the session survives process restarts.
    pub fn with_storage(mut self, storage: impl SessionStorage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Override the renewal grace window.
    pub fn with_grace(mut self, grace_secs: i64) -> Self {
        self.grace_secs = grace_secs;
        self
    }

    /// The shared store handle, for wiring a transport.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Password sign-in. On success the store holds a healthy session and
    /// the snapshot is returned; on any failure no session exists.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionSnapshot, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let grant = match self.identity.obtain_grant(username, password).await {
            Ok(grant) => grant,
            Err(ApiError::Unauthorized) | Err(ApiError::BadRequest(_)) => {
                debug!(username, "Password sign-in rejected");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                warn!(error = %e, "Sign-in request failed");
                return Err(AuthError::Network {
                    detail: e.to_string(),
                });
            }
        };

        self.establish(grant).await
    }

    /// Exchange a provider-issued credential and establish a session. The
    /// exchange either fully succeeds or the sign-in is aborted; there is no
    /// degraded half-session.
    pub async fn sign_in_federated(
        &self,
        grant: &FederatedGrant,
    ) -> Result<SessionSnapshot, AuthError> {
        let token_grant = match self.identity.exchange_federated(grant).await {
            Ok(token_grant) => token_grant,
            Err(e) => {
                warn!(provider = %grant.provider, error = %e, "Federated exchange failed");
                return Err(AuthError::ProviderExchangeFailed {
                    detail: e.to_string(),
                });
            }
        };

        self.establish(token_grant).await
    }

    /// Current session view, renewing the access credential first when it
    /// needs it. Failures never surface as errors here; they ride inside the
    /// snapshot where the guard and the UI can read them.
    pub async fn session(&self) -> Option<SessionSnapshot> {
        let record = self.store.record().await?;

        if record.failure.is_some() {
            return self.store.snapshot().await;
        }

        match verifier::decode_expiry(&record.credentials.access) {
            Err(e) => {
                warn!(error = %e, "Stored access credential does not decode");
                self.store
                    .mark_failure(SessionFailure::VerificationFailed)
                    .await;
                match self.coordinator.refresh().await {
                    Ok(_) => {
                        debug!("Renewal healed the verification failure");
                        self.persist_current().await;
                    }
                    Err(e) => debug!(error = %e, "Healing renewal failed"),
                }
            }
            Ok(_) if verifier::is_expired(&record.credentials.access, self.grace_secs) => {
                match self.coordinator.refresh().await {
                    Ok(_) => self.persist_current().await,
                    Err(e) => debug!(error = %e, "Implicit renewal failed"),
                }
            }
            Ok(_) => {}
        }

        self.store.snapshot().await
    }

    /// Lifecycle phase, derived from the record.
    pub async fn phase(&self) -> SessionPhase {
        match self.store.snapshot().await {
            None => SessionPhase::Unauthenticated,
            Some(snapshot) if snapshot.failure.is_some() => SessionPhase::Failed,
            Some(_) => SessionPhase::Authenticated,
        }
    }

    /// Load a persisted session into the store. A stale access credential is
    /// acceptable; the first use renews it. Returns whether a session was
    /// restored.
    pub async fn restore(&self) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };
        match storage.load() {
            Ok(Some(record)) => {
                debug!(username = %record.claims.username, "Restored persisted session");
                self.store.install(record).await;
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session");
                false
            }
        }
    }

    /// Drop the session from the store and from persistence.
    pub async fn sign_out(&self) {
        self.store.clear().await;
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.clear() {
                warn!(error = %e, "Failed to clear persisted session");
            }
        }
        info!("Signed out");
    }

    /// Shared sign-in tail: decode the grant, fetch claims, install, persist.
    async fn establish(&self, grant: TokenGrant) -> Result<SessionSnapshot, AuthError> {
        let refresh = grant
            .rotated_refresh()
            .map(str::to_string)
            .ok_or_else(|| AuthError::verification_failed("grant carried no refresh credential"))?;
        let pair = CredentialPair::from_tokens(grant.access, refresh)?;

        let claims = match self.identity.check_auth(&pair.access).await {
            Ok(claims) => claims,
            Err(ApiError::NetworkError(e)) => {
                warn!(error = %e, "Claims fetch unreachable during sign-in");
                return Err(AuthError::Network {
                    detail: e.to_string(),
                });
            }
            Err(e) => {
                warn!(error = %e, "Claims fetch failed during sign-in");
                return Err(AuthError::verification_failed(format!(
                    "claims fetch failed: {e}"
                )));
            }
        };

        let record = SessionRecord::new(claims, pair);
        self.store.install(record.clone()).await;
        self.persist(&record);
        info!(username = %record.claims.username, "Signed in");

        Ok(SessionSnapshot {
            claims: record.claims,
            has_access: true,
            failure: None,
        })
    }

    fn persist(&self, record: &SessionRecord) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(record) {
                warn!(error = %e, "Failed to persist session");
            }
        }
    }

    async fn persist_current(&self) {
        if let Some(record) = self.store.record().await {
            self.persist(&record);
        }
    }
}

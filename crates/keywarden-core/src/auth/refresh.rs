//! Single-flight renewal of the access credential.
//!
//! Every caller that finds the access credential stale lands here, as does
//! the transport when the resource backend rejects a credential outright.
//! The first one spawns a renewal task; callers arriving while it runs join
//! the same ticket and observe the same outcome. The task is spawned rather
//! than awaited inline, so a caller that stops waiting cannot abort a
//! renewal other callers depend on.
//!
//! A failed renewal marks the session `RefreshFailed`, and that flag is
//! terminal: later calls answer locally without touching the network until
//! a fresh sign-in replaces the session.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::error::AuthError;
use super::store::{CredentialPair, SessionFailure, SessionStore};
use super::verifier::DEFAULT_REFRESH_GRACE_SECS;
use crate::api::IdentityClient;

type RefreshTicket = Shared<BoxFuture<'static, Result<CredentialPair, AuthError>>>;

/// Serializes credential renewal across every clone of the handle.
#[derive(Clone)]
pub struct RefreshCoordinator {
    identity: IdentityClient,
    store: SessionStore,
    grace_secs: i64,
    inflight: Arc<Mutex<Option<RefreshTicket>>>,
}

impl RefreshCoordinator {
    pub fn new(identity: IdentityClient, store: SessionStore) -> Self {
        Self {
            identity,
            store,
            grace_secs: DEFAULT_REFRESH_GRACE_SECS,
            inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the renewal grace window.
    pub fn with_grace(mut self, grace_secs: i64) -> Self {
        self.grace_secs = grace_secs;
        self
    }

    /// Obtain a usable credential pair, renewing it over the network at most
    /// once no matter how many callers ask concurrently.
    pub async fn refresh(&self) -> Result<CredentialPair, AuthError> {
        self.coordinate(None).await
    }

    /// Renewal for a credential the resource backend just rejected. Skips
    /// the local freshness check: a rejected credential needs the network
    /// no matter what its expiry claims. Still single-flight, and still
    /// answered locally when another caller renewed in the meantime.
    pub async fn refresh_after_rejection(
        &self,
        rejected_access: &str,
    ) -> Result<CredentialPair, AuthError> {
        self.coordinate(Some(rejected_access)).await
    }

    async fn coordinate(
        &self,
        rejected_access: Option<&str>,
    ) -> Result<CredentialPair, AuthError> {
        let ticket = {
            let mut slot = self.inflight.lock().await;

            if let Some(ticket) = slot.as_ref() {
                debug!("Joining in-flight credential renewal");
                ticket.clone()
            } else {
                let failure = self.store.failure().await;
                if failure == Some(SessionFailure::RefreshFailed) {
                    return Err(AuthError::refresh_failed(
                        "renewal already failed; sign in again",
                    ));
                }
                let pair = match self.store.credentials().await {
                    Some(pair) => pair,
                    None => return Err(AuthError::refresh_failed("no session to renew")),
                };
                // Another caller may have renewed between our caller's
                // staleness check and this lock. A session flagged for
                // verification healing still goes to the network.
                let answered_locally = match rejected_access {
                    Some(rejected) => pair.access != rejected,
                    None => failure.is_none() && !pair.needs_refresh(self.grace_secs),
                };
                if answered_locally {
                    return Ok(pair);
                }

                let ticket = self.spawn_renewal(pair.refresh);
                *slot = Some(ticket.clone());
                ticket
            }
        };

        ticket.await
    }

    fn spawn_renewal(&self, refresh_credential: String) -> RefreshTicket {
        debug!("Starting credential renewal");
        let identity = self.identity.clone();
        let store = self.store.clone();
        let inflight = Arc::clone(&self.inflight);

        let task = tokio::spawn(async move {
            let outcome = renew(&identity, &store, refresh_credential).await;
            // The store already reflects the outcome; empty the slot last so
            // a caller finding it vacant also finds the store up to date.
            inflight.lock().await.take();
            outcome
        });

        task.map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => Err(AuthError::refresh_failed(format!(
                "renewal task failed: {e}"
            ))),
        })
        .boxed()
        .shared()
    }
}

/// One network renewal attempt. Writes the outcome to the store before
/// returning it.
async fn renew(
    identity: &IdentityClient,
    store: &SessionStore,
    refresh_credential: String,
) -> Result<CredentialPair, AuthError> {
    let grant = match identity.refresh_grant(&refresh_credential).await {
        Ok(grant) => grant,
        Err(e) => {
            warn!(error = %e, "Credential renewal rejected");
            store.mark_failure(SessionFailure::RefreshFailed).await;
            return Err(AuthError::refresh_failed(e.to_string()));
        }
    };

    let refresh = grant
        .rotated_refresh()
        .map(str::to_string)
        .unwrap_or(refresh_credential);

    match CredentialPair::from_tokens(grant.access, refresh) {
        Ok(pair) => {
            store.install_pair(pair.clone()).await;
            debug!(expiry = %pair.access_expiry, "Access credential renewed");
            Ok(pair)
        }
        Err(e) => {
            warn!(error = %e, "Renewed access credential does not decode");
            store.mark_failure(SessionFailure::RefreshFailed).await;
            Err(AuthError::refresh_failed(format!(
                "renewed credential undecodable: {e}"
            )))
        }
    }
}

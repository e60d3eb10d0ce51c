//! Authenticated access to the resource API.
//!
//! Every request rides on the current access credential and hides renewal
//! from the caller: a credential inside the grace window is renewed before
//! the request goes out, and a 401 answer triggers exactly one renewal plus
//! one retry. A caller sees either the resource payload or a final error;
//! silent recovery leaves no trace in the result.
//!
//! Rate limiting is handled separately from credential recovery: 429
//! answers are retried with exponential backoff a bounded number of times.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::auth::{verifier, AuthError, RefreshCoordinator, SessionStore};

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making callers wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Resource API client that keeps its bearer credential fresh.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    store: SessionStore,
    coordinator: RefreshCoordinator,
    grace_secs: i64,
}

impl Transport {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        store: SessionStore,
        coordinator: RefreshCoordinator,
        grace_secs: i64,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
            coordinator,
            grace_secs,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut access = self.usable_access().await?;
        let mut auth_retried = false;
        let mut rate_retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&access);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                if auth_retried {
                    // The renewed credential was rejected too. Locally fatal
                    // for this request, but the session itself stands.
                    let body_text = response.text().await.unwrap_or_default();
                    warn!(url = %url, "Request rejected after credential renewal");
                    return Err(AuthError::TransportRejected {
                        status: status.as_u16(),
                        detail: ApiError::truncate_body(&body_text),
                    }
                    .into());
                }
                auth_retried = true;
                debug!(url = %url, "Credential rejected, renewing once");
                access = self.coordinator.refresh_after_rejection(&access).await?.access;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                rate_retries += 1;
                if rate_retries > MAX_RATE_LIMIT_RETRIES {
                    return Err(ApiError::RateLimited);
                }
                warn!(url = %url, retry = rate_retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            if !status.is_success() {
                let body_text = response.text().await.unwrap_or_default();
                return Err(ApiError::from_status(status, &body_text));
            }

            return response
                .json()
                .await
                .map_err(|e| ApiError::InvalidResponse(format!("bad response payload: {e}")));
        }
    }

    /// The current access credential, renewed first if it sits inside the
    /// grace window or does not decode.
    async fn usable_access(&self) -> Result<String, ApiError> {
        if let Some(pair) = self.store.credentials().await {
            if !verifier::is_expired(&pair.access, self.grace_secs) {
                return Ok(pair.access);
            }
        }
        debug!("Access credential stale, renewing before request");
        let pair = self.coordinator.refresh().await?;
        Ok(pair.access)
    }
}

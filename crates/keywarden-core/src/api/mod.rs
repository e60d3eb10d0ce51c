//! HTTP clients for the identity and resource backends.
//!
//! `IdentityClient` speaks to the credential-issuing service; `Transport`
//! wraps resource calls with bearer injection and silent credential
//! recovery. Both share one `reqwest` connection pool when built through
//! the session pipeline.

pub mod error;
pub mod identity;
pub mod transport;

pub use error::ApiError;
pub use identity::{FederatedGrant, IdentityClient, TokenGrant};
pub use transport::Transport;

/// Turn a non-success response into an [`ApiError`] carrying the body.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

use thiserror::Error;

/// Credential-layer errors.
///
/// Every variant owns plain `String` detail so the enum stays `Clone`: a
/// single refresh outcome is handed verbatim to every caller waiting on the
/// in-flight renewal. HTTP-level failures outside the credential layer live
/// in [`crate::api::ApiError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad username or password. Shown inline at the sign-in form; no
    /// session is created.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The federated provider token could not be exchanged for a credential
    /// pair. Sign-in is aborted; no session is created.
    #[error("identity provider exchange failed: {detail}")]
    ProviderExchangeFailed { detail: String },

    /// The access credential could not be decoded. Treated as immediate
    /// staleness: the holder should attempt one refresh.
    #[error("access credential verification failed: {detail}")]
    VerificationFailed { detail: String },

    /// The refresh credential was rejected or the renewal call failed.
    /// Terminal for the session; the route guard forces the sign-in path.
    #[error("credential refresh failed: {detail}")]
    RefreshFailed { detail: String },

    /// The resource API rejected the request even after a fresh credential
    /// and one retry. Local to the calling request; does not end the session.
    #[error("request rejected by resource API after credential retry (status {status})")]
    TransportRejected { status: u16, detail: String },

    /// The identity backend was unreachable during sign-in.
    #[error("identity backend unreachable: {detail}")]
    Network { detail: String },
}

impl AuthError {
    pub(crate) fn refresh_failed(detail: impl Into<String>) -> Self {
        AuthError::RefreshFailed {
            detail: detail.into(),
        }
    }

    pub(crate) fn verification_failed(detail: impl Into<String>) -> Self {
        AuthError::VerificationFailed {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_cloneable() {
        let err = AuthError::refresh_failed("backend said no");
        let copy = err.clone();
        assert_eq!(err, copy);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "invalid username or password"
        );
        let err = AuthError::TransportRejected {
            status: 401,
            detail: "expired".to_string(),
        };
        assert!(err.to_string().contains("401"));
    }
}

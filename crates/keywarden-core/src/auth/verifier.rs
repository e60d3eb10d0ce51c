//! Local expiry checks for access credentials.
//!
//! The access credential is a standard three-part token whose payload carries
//! an `exp` claim (unix seconds). Only the expiry is read here; signature
//! validity is the backend's concern and checking it locally would add a key
//! distribution problem without making renewal scheduling any better.
//!
//! Anything that cannot be decoded is reported as expired. Failing toward
//! expiry costs one refresh call; failing toward validity sends a dead
//! credential to the resource API.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};

use super::error::AuthError;

/// Seconds before hard expiry at which renewal becomes due.
/// 300s gives a comfortable window for the refresh round trip so requests
/// never race the credential's actual deadline.
pub const DEFAULT_REFRESH_GRACE_SECS: i64 = 300;

/// Decode the embedded expiry of an access credential without any I/O.
pub fn decode_expiry(access: &str) -> Result<DateTime<Utc>, AuthError> {
    let parts: Vec<&str> = access.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::verification_failed(format!(
            "expected 3 credential segments, got {}",
            parts.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|e| AuthError::verification_failed(format!("payload is not base64url: {e}")))?;

    let claims: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|e| AuthError::verification_failed(format!("payload is not JSON: {e}")))?;

    let exp = claims
        .get("exp")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| AuthError::verification_failed("missing integer exp claim"))?;

    DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| AuthError::verification_failed(format!("exp {exp} is out of range")))
}

/// Check whether an access credential is due for renewal at `now`.
///
/// Returns true when `now >= expiry - grace`, so a credential sitting exactly
/// on the grace boundary already counts as expired. Undecodable input also
/// returns true.
pub fn is_expired_at(access: &str, grace_secs: i64, now: DateTime<Utc>) -> bool {
    match decode_expiry(access) {
        Ok(expiry) => now >= expiry - Duration::seconds(grace_secs),
        Err(_) => true,
    }
}

/// [`is_expired_at`] against the current wall clock.
pub fn is_expired(access: &str, grace_secs: i64) -> bool {
    is_expired_at(access, grace_secs, Utc::now())
}

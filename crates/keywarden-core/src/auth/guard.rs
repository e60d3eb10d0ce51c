//! Route protection decisions.
//!
//! A pure function from (path, session view) to allow-or-redirect. It holds
//! no state on purpose: callers must evaluate it on every protected-route
//! entry, because a session can fail between two navigations and a cached
//! decision would let the dead session through.

use serde::Serialize;

use super::store::SessionSnapshot;

/// Outcome of a guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum GuardDecision {
    Allow,
    Redirect { target: String },
}

/// Decide whether `path` may be entered with the given session view.
///
/// Paths outside every protected prefix are always allowed. Inside one, a
/// missing session redirects to the sign-in path, and a failed session
/// appends the failure's reason code as an `error` query parameter so the
/// sign-in page can explain what happened.
pub fn authorize(
    path: &str,
    session: Option<&SessionSnapshot>,
    protected_prefixes: &[String],
    sign_in_path: &str,
) -> GuardDecision {
    if !protected_prefixes.iter().any(|p| matches_prefix(path, p)) {
        return GuardDecision::Allow;
    }

    match session {
        None => GuardDecision::Redirect {
            target: sign_in_path.to_string(),
        },
        Some(snapshot) => match snapshot.failure {
            Some(failure) => GuardDecision::Redirect {
                target: format!("{}?error={}", sign_in_path, failure.reason_code()),
            },
            None => GuardDecision::Allow,
        },
    }
}

/// Segment-bounded prefix match: `/dashboard` covers `/dashboard` and
/// `/dashboard/...` but not `/dashboards`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::SessionFailure;
    use crate::models::IdentityClaims;

    fn prefixes() -> Vec<String> {
        vec!["/dashboard".to_string(), "/profile".to_string()]
    }

    fn snapshot(failure: Option<SessionFailure>) -> SessionSnapshot {
        SessionSnapshot {
            claims: IdentityClaims {
                subject: "17".to_string(),
                username: "marta".to_string(),
                email: None,
                position: "User".to_string(),
                profile_image: "default.jpg".to_string(),
                property_ids: vec![],
            },
            has_access: failure.is_none(),
            failure,
        }
    }

    #[test]
    fn test_unprotected_path_always_allowed() {
        let decision = authorize("/about", None, &prefixes(), "/auth/signin");
        assert_eq!(decision, GuardDecision::Allow);
    }

    #[test]
    fn test_protected_path_without_session_redirects() {
        let decision = authorize("/dashboard", None, &prefixes(), "/auth/signin");
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                target: "/auth/signin".to_string()
            }
        );
    }

    #[test]
    fn test_protected_path_with_healthy_session_allowed() {
        let snap = snapshot(None);
        let decision = authorize("/dashboard/jobs/7", Some(&snap), &prefixes(), "/auth/signin");
        assert_eq!(decision, GuardDecision::Allow);
    }

    #[test]
    fn test_refresh_failure_carries_reason_code() {
        let snap = snapshot(Some(SessionFailure::RefreshFailed));
        let decision = authorize("/dashboard", Some(&snap), &prefixes(), "/auth/signin");
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                target: "/auth/signin?error=RefreshTokenError".to_string()
            }
        );
    }

    #[test]
    fn test_verification_failure_carries_reason_code() {
        let snap = snapshot(Some(SessionFailure::VerificationFailed));
        let decision = authorize("/profile/settings", Some(&snap), &prefixes(), "/auth/signin");
        assert_eq!(
            decision,
            GuardDecision::Redirect {
                target: "/auth/signin?error=TokenVerificationError".to_string()
            }
        );
    }

    #[test]
    fn test_prefix_match_is_segment_bounded() {
        assert!(matches_prefix("/dashboard", "/dashboard"));
        assert!(matches_prefix("/dashboard/", "/dashboard"));
        assert!(matches_prefix("/dashboard/jobs", "/dashboard"));
        assert!(!matches_prefix("/dashboards", "/dashboard"));
        assert!(!matches_prefix("/profile", "/dashboard"));
    }

    #[test]
    fn test_trailing_slash_in_prefix_tolerated() {
        assert!(matches_prefix("/dashboard/jobs", "/dashboard/"));
        assert!(!matches_prefix("/dashboards", "/dashboard/"));
    }

    #[test]
    fn test_same_inputs_same_decision() {
        let snap = snapshot(Some(SessionFailure::RefreshFailed));
        let first = authorize("/dashboard", Some(&snap), &prefixes(), "/auth/signin");
        let second = authorize("/dashboard", Some(&snap), &prefixes(), "/auth/signin");
        assert_eq!(first, second);
    }
}

//! Client for the identity backend.
//!
//! Covers the four credential operations: password sign-in, claims fetch,
//! refresh, and federated exchange. Grant responses are returned as raw wire
//! pairs; decoding the access credential's expiry is the auth layer's job,
//! so each call site can map a malformed credential into its own failure
//! mode.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::error::ApiError;
use super::check_response;
use crate::models::IdentityClaims;

/// Default HTTP timeout in seconds.
/// 15s matches the backend's own gateway timeout, so callers give up at
/// about the moment the backend would anyway.
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Password sign-in endpoint.
const TOKEN_PATH: &str = "/api/v1/token/";

/// Credential refresh endpoint.
const REFRESH_PATH: &str = "/api/v1/token/refresh/";

/// Claims endpoint; requires a bearer credential.
const CHECK_AUTH_PATH: &str = "/api/v1/auth/check/";

/// Profile image used when the backend omits one.
const DEFAULT_PROFILE_IMAGE: &str = "default.jpg";

/// Position used when the backend omits one.
const DEFAULT_POSITION: &str = "User";

/// An access/refresh pair exactly as the backend sent it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl TokenGrant {
    /// The rotated refresh credential. The backend signals "keep the previous
    /// one" by omitting the field or sending it blank.
    pub fn rotated_refresh(&self) -> Option<&str> {
        self.refresh.as_deref().filter(|r| !r.is_empty())
    }
}

/// A credential issued by an external identity provider, to be exchanged for
/// backend credentials.
#[derive(Debug, Clone)]
pub struct FederatedGrant {
    pub provider: String,
    pub access_token: String,
    pub id_token: Option<String>,
    pub email: Option<String>,
}

impl FederatedGrant {
    pub fn google(
        access_token: impl Into<String>,
        id_token: Option<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            provider: "google".to_string(),
            access_token: access_token.into(),
            id_token,
            email,
        }
    }
}

/// Identity backend client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
}

impl IdentityClient {
    /// Create a client with its own connection pool and default timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client sharing an existing connection pool.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Exchange a username and password for a credential grant.
    pub async fn obtain_grant(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenGrant, ApiError> {
        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        self.post_grant(&url, &body).await
    }

    /// Trade a refresh credential for a new grant.
    pub async fn refresh_grant(&self, refresh: &str) -> Result<TokenGrant, ApiError> {
        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        let body = serde_json::json!({ "refresh": refresh });
        self.post_grant(&url, &body).await
    }

    /// Exchange a provider-issued credential for a backend grant.
    pub async fn exchange_federated(&self, grant: &FederatedGrant) -> Result<TokenGrant, ApiError> {
        let url = format!("{}/api/v1/auth/{}/", self.base_url, grant.provider);
        let body = serde_json::json!({
            "access_token": grant.access_token,
            "id_token": grant.id_token,
            "email": grant.email,
        });
        self.post_grant(&url, &body).await
    }

    /// Fetch the identity claims behind an access credential.
    pub async fn check_auth(&self, access: &str) -> Result<IdentityClaims, ApiError> {
        let url = format!("{}{}", self.base_url, CHECK_AUTH_PATH);
        let response = self.client.get(&url).bearer_auth(access).send().await?;
        let response = check_response(response).await?;

        let payload: CheckAuthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("bad claims payload: {e}")))?;
        Ok(payload.user.into_claims())
    }

    async fn post_grant(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<TokenGrant, ApiError> {
        debug!(url, "Requesting credential grant");
        let response = self.client.post(url).json(body).send().await?;
        let response = check_response(response).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("bad grant payload: {e}")))
    }
}

// Internal API response types for parsing

#[derive(Debug, Deserialize)]
struct CheckAuthResponse {
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: IdValue,
    username: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    profile: Option<ProfilePayload>,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilePayload {
    #[serde(default)]
    profile_image: Option<String>,
    #[serde(default)]
    positions: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyRef>,
}

#[derive(Debug, Deserialize)]
struct PropertyRef {
    property_id: IdValue,
}

/// Backend ids arrive as numbers or strings depending on the serializer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Num(i64),
    Text(String),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Num(n) => n.to_string(),
            IdValue::Text(s) => s,
        }
    }
}

impl UserPayload {
    fn into_claims(self) -> IdentityClaims {
        let profile = self.profile.unwrap_or_default();
        IdentityClaims {
            subject: self.id.into_string(),
            username: self.username,
            email: self.email,
            position: profile
                .positions
                .unwrap_or_else(|| DEFAULT_POSITION.to_string()),
            profile_image: profile
                .profile_image
                .unwrap_or_else(|| DEFAULT_PROFILE_IMAGE.to_string()),
            property_ids: profile
                .properties
                .into_iter()
                .map(|p| p.property_id.into_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grant_with_rotated_refresh() {
        let json = r#"{"access": "aaa.bbb.ccc", "refresh": "rrr"}"#;
        let grant: TokenGrant = serde_json::from_str(json).expect("parse grant");
        assert_eq!(grant.access, "aaa.bbb.ccc");
        assert_eq!(grant.rotated_refresh(), Some("rrr"));
    }

    #[test]
    fn test_parse_grant_without_refresh() {
        let json = r#"{"access": "aaa.bbb.ccc"}"#;
        let grant: TokenGrant = serde_json::from_str(json).expect("parse grant");
        assert_eq!(grant.rotated_refresh(), None);
    }

    #[test]
    fn test_blank_refresh_means_keep_previous() {
        let json = r#"{"access": "aaa.bbb.ccc", "refresh": ""}"#;
        let grant: TokenGrant = serde_json::from_str(json).expect("parse grant");
        assert_eq!(grant.rotated_refresh(), None);
    }

    #[test]
    fn test_parse_claims_with_full_profile() {
        let json = r#"{
            "user": {
                "id": 17,
                "username": "marta",
                "email": "marta@example.com",
                "profile": {
                    "profile_image": "marta.png",
                    "positions": "Manager",
                    "properties": [
                        {"property_id": "p1", "name": "North Tower"},
                        {"property_id": 42, "name": "Annex"}
                    ]
                }
            }
        }"#;

        let payload: CheckAuthResponse = serde_json::from_str(json).expect("parse claims");
        let claims = payload.user.into_claims();
        assert_eq!(claims.subject, "17");
        assert_eq!(claims.username, "marta");
        assert_eq!(claims.position, "Manager");
        assert_eq!(claims.profile_image, "marta.png");
        assert_eq!(claims.property_ids, vec!["p1".to_string(), "42".to_string()]);
    }

    #[test]
    fn test_parse_claims_applies_profile_defaults() {
        let json = r#"{"user": {"id": "9", "username": "jin"}}"#;

        let payload: CheckAuthResponse = serde_json::from_str(json).expect("parse claims");
        let claims = payload.user.into_claims();
        assert_eq!(claims.subject, "9");
        assert_eq!(claims.email, None);
        assert_eq!(claims.position, "User");
        assert_eq!(claims.profile_image, "default.jpg");
        assert!(claims.property_ids.is_empty());
    }

    #[test]
    fn test_google_grant_defaults_provider() {
        let grant = FederatedGrant::google("ya29.token", None, Some("g@example.com".into()));
        assert_eq!(grant.provider, "google");
    }
}

//! Shared fixtures for the integration suites: credential minting, wire
//! payloads, and a fully wired client stack pointed at a mock backend.
#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::json;

use keywarden_core::auth::{CredentialPair, SessionRecord, DEFAULT_REFRESH_GRACE_SECS};
use keywarden_core::{
    IdentityClaims, IdentityClient, RefreshCoordinator, SessionPipeline, SessionStore, Transport,
};

/// Mint an unsigned credential carrying the given expiry claim.
pub fn make_access_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({ "exp": exp, "user_id": 17 }).to_string());
    format!("{header}.{payload}.sig")
}

pub fn fresh_access_token() -> String {
    make_access_token((Utc::now() + Duration::hours(1)).timestamp())
}

pub fn expired_access_token() -> String {
    make_access_token((Utc::now() - Duration::hours(1)).timestamp())
}

/// Grant payload in the identity backend's wire shape.
pub fn grant_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({ "access": access, "refresh": refresh })
}

/// Claims payload in the identity backend's wire shape.
pub fn check_auth_body(username: &str) -> serde_json::Value {
    json!({
        "user": {
            "id": 17,
            "username": username,
            "email": format!("{username}@example.com"),
            "profile": {
                "profile_image": "avatar.png",
                "positions": "Technician",
                "properties": [
                    { "property_id": "P001" },
                    { "property_id": "P002" }
                ]
            }
        }
    })
}

/// The claims [`check_auth_body`] decodes into.
pub fn test_claims(username: &str) -> IdentityClaims {
    IdentityClaims {
        subject: "17".to_string(),
        username: username.to_string(),
        email: Some(format!("{username}@example.com")),
        position: "Technician".to_string(),
        profile_image: "avatar.png".to_string(),
        property_ids: vec!["P001".to_string(), "P002".to_string()],
    }
}

/// The full client stack wired against one backend URL.
pub struct Stack {
    pub store: SessionStore,
    pub coordinator: RefreshCoordinator,
    pub pipeline: SessionPipeline,
    pub transport: Transport,
}

pub fn stack(base_url: &str) -> Stack {
    let client = reqwest::Client::new();
    let identity = IdentityClient::with_client(client.clone(), base_url);
    let store = SessionStore::new();
    let coordinator = RefreshCoordinator::new(identity.clone(), store.clone());
    let transport = Transport::new(
        client,
        base_url,
        store.clone(),
        coordinator.clone(),
        DEFAULT_REFRESH_GRACE_SECS,
    );
    let pipeline = SessionPipeline::new(identity, store.clone(), coordinator.clone());

    Stack {
        store,
        coordinator,
        pipeline,
        transport,
    }
}

/// Install a signed-in session directly, bypassing the network.
pub async fn seed_session(store: &SessionStore, access: &str, refresh: &str) {
    let pair = CredentialPair::from_tokens(access, refresh).expect("decodable access credential");
    store
        .install(SessionRecord::new(test_claims("marta"), pair))
        .await;
}

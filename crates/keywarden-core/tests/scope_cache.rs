//! Scope catalog caching over the authenticated transport.

mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::*;
use keywarden_core::{ApiError, AuthError, ScopeCache};

fn property_list() -> serde_json::Value {
    json!([
        { "property_id": "P001", "name": "Riverside Tower", "description": "Main site" },
        { "property_id": "P002", "name": "Hillside Annex" }
    ])
}

#[tokio::test]
async fn test_fetch_cached_within_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/properties/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(property_list()))
        .expect(1)
        .mount(&server)
        .await;

    let stack = stack(&server.uri());
    seed_session(&stack.store, &fresh_access_token(), "refresh-1").await;

    let cache = ScopeCache::new();
    let first = cache.get_or_fetch(&stack.transport).await.unwrap();
    assert_eq!(first.scopes.len(), 2);
    assert_eq!(first.scopes[0].property_id, "P001");
    // The first scope is seeded as the selection on a cold fetch.
    assert_eq!(first.selected.as_deref(), Some("P001"));

    // A second read inside the TTL answers from the cache; the endpoint
    // stays at one hit.
    let second = cache.get_or_fetch(&stack.transport).await.unwrap();
    assert_eq!(first.scopes, second.scopes);
    assert_eq!(first.cached_at, second.cached_at);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/properties/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(property_list()))
        .expect(2)
        .mount(&server)
        .await;

    let stack = stack(&server.uri());
    seed_session(&stack.store, &fresh_access_token(), "refresh-1").await;

    let cache = ScopeCache::new();
    cache.get_or_fetch(&stack.transport).await.unwrap();
    assert!(cache.select("P002").await);
    assert_eq!(cache.selected().await, Some("P002".to_string()));

    // Invalidation drops the whole entry, selection included; the next
    // access refetches and reseeds.
    cache.invalidate().await;
    assert_eq!(cache.selected().await, None);

    let refetched = cache.get_or_fetch(&stack.transport).await.unwrap();
    assert_eq!(refetched.selected.as_deref(), Some("P001"));
}

#[tokio::test]
async fn test_selection_requires_membership() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/properties/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(property_list()))
        .expect(1)
        .mount(&server)
        .await;

    let stack = stack(&server.uri());
    seed_session(&stack.store, &fresh_access_token(), "refresh-1").await;

    let cache = ScopeCache::new();
    cache.get_or_fetch(&stack.transport).await.unwrap();

    assert!(!cache.select("P999").await);
    assert_eq!(cache.selected().await, Some("P001".to_string()));
}

#[tokio::test]
async fn test_unauthenticated_fetch_propagates_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/properties/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let stack = stack(&server.uri());
    let cache = ScopeCache::new();
    let err = cache.get_or_fetch(&stack.transport).await.unwrap_err();
    assert!(matches!(err, ApiError::Auth(AuthError::RefreshFailed { .. })));
}

//! Cached property scope list with a sticky selection.
//!
//! The scope list changes rarely and backs a selector that is consulted on
//! almost every screen, so it is cached whole for a short TTL. The entry is
//! always replaced as a unit: list and selection move together, and the
//! selection is only ever an id present in the cached list (or `None`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::api::{ApiError, Transport};
use crate::models::PropertyScope;

/// Consider the scope list stale after 5 minutes.
/// Scope membership changes rarely; a short TTL still picks up an admin
/// granting access without a sign-out cycle.
pub const SCOPE_CACHE_TTL_MINUTES: i64 = 5;

/// Scope list endpoint on the resource API.
const PROPERTIES_PATH: &str = "/api/properties/";

/// One cached fetch of the scope list plus the active selection.
#[derive(Debug, Clone)]
pub struct CachedScopes {
    pub scopes: Vec<PropertyScope>,
    pub selected: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CachedScopes {
    fn new(scopes: Vec<PropertyScope>, selected: Option<String>) -> Self {
        Self {
            scopes,
            selected,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > SCOPE_CACHE_TTL_MINUTES
    }
}

/// Cloneable handle to the shared scope cache.
#[derive(Clone, Default)]
pub struct ScopeCache {
    inner: Arc<RwLock<Option<CachedScopes>>>,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached entry, refetched through `transport` when missing or
    /// stale. A previous selection survives the refetch as long as it is
    /// still a member of the new list; otherwise the first scope is seeded.
    pub async fn get_or_fetch(&self, transport: &Transport) -> Result<CachedScopes, ApiError> {
        if let Some(entry) = self.inner.read().await.as_ref() {
            if !entry.is_stale() {
                return Ok(entry.clone());
            }
        }

        debug!("Scope list missing or stale, fetching");
        let scopes: Vec<PropertyScope> = transport.get(PROPERTIES_PATH).await?;

        let mut guard = self.inner.write().await;
        let previous = guard.as_ref().and_then(|e| e.selected.clone());
        let entry = CachedScopes::new(scopes.clone(), carry_over_selection(previous, &scopes));
        *guard = Some(entry.clone());
        debug!(count = entry.scopes.len(), "Scope list cached");
        Ok(entry)
    }

    /// Make `scope_id` the active selection. Refused (returning false) when
    /// the id is not in the cached list, so the selection invariant holds.
    pub async fn select(&self, scope_id: &str) -> bool {
        let mut guard = self.inner.write().await;
        if let Some(entry) = guard.as_mut() {
            if entry.scopes.iter().any(|s| s.property_id == scope_id) {
                entry.selected = Some(scope_id.to_string());
                return true;
            }
        }
        false
    }

    /// The active selection, if any.
    pub async fn selected(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .and_then(|e| e.selected.clone())
    }

    /// Drop the cached entry; the next access refetches. Called on sign-out.
    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }
}

/// Selection for a fresh list: keep the previous id when still a member,
/// otherwise seed the first scope, otherwise nothing.
fn carry_over_selection(previous: Option<String>, scopes: &[PropertyScope]) -> Option<String> {
    match previous {
        Some(id) if scopes.iter().any(|s| s.property_id == id) => Some(id),
        _ => scopes.first().map(|s| s.property_id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scope(id: &str, name: &str) -> PropertyScope {
        PropertyScope {
            property_id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    async fn seeded_cache(scopes: Vec<PropertyScope>, selected: Option<String>) -> ScopeCache {
        let cache = ScopeCache::new();
        *cache.inner.write().await = Some(CachedScopes::new(scopes, selected));
        cache
    }

    #[test]
    fn test_staleness_by_age() {
        let fresh = CachedScopes::new(vec![], None);
        assert!(!fresh.is_stale());

        let mut old = CachedScopes::new(vec![], None);
        old.cached_at = Utc::now() - Duration::minutes(SCOPE_CACHE_TTL_MINUTES + 1);
        assert!(old.is_stale());
    }

    #[test]
    fn test_carry_over_keeps_member_selection() {
        let scopes = vec![scope("p1", "North"), scope("p2", "South")];
        assert_eq!(
            carry_over_selection(Some("p2".to_string()), &scopes),
            Some("p2".to_string())
        );
    }

    #[test]
    fn test_carry_over_seeds_first_when_dropped() {
        let scopes = vec![scope("p1", "North"), scope("p2", "South")];
        assert_eq!(
            carry_over_selection(Some("gone".to_string()), &scopes),
            Some("p1".to_string())
        );
        assert_eq!(carry_over_selection(None, &scopes), Some("p1".to_string()));
    }

    #[test]
    fn test_carry_over_none_for_empty_list() {
        assert_eq!(carry_over_selection(Some("p1".to_string()), &[]), None);
        assert_eq!(carry_over_selection(None, &[]), None);
    }

    #[tokio::test]
    async fn test_select_requires_membership() {
        let cache = seeded_cache(
            vec![scope("p1", "North"), scope("p2", "South")],
            Some("p1".to_string()),
        )
        .await;

        assert!(cache.select("p2").await);
        assert_eq!(cache.selected().await, Some("p2".to_string()));

        // A failed select leaves the previous selection alone.
        assert!(!cache.select("unknown").await);
        assert_eq!(cache.selected().await, Some("p2".to_string()));
    }

    #[tokio::test]
    async fn test_select_on_empty_cache_is_refused() {
        let cache = ScopeCache::new();
        assert!(!cache.select("p1").await);
        assert_eq!(cache.selected().await, None);
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let cache = seeded_cache(vec![scope("p1", "North")], Some("p1".to_string())).await;
        cache.invalidate().await;
        assert_eq!(cache.selected().await, None);
        assert!(cache.inner.read().await.is_none());
    }
}

//! Short-lived caching over resource API data.

pub mod scopes;

pub use scopes::{CachedScopes, ScopeCache, SCOPE_CACHE_TTL_MINUTES};

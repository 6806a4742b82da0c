//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use carbon_storage::{CacheBackend, CacheConfig, Store};

use crate::cached_db::CachedStore;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Store client with the cache-aside layer in front of it. Every route
    /// goes through here, never through the store directly.
    pub cached: CachedStore,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        backend: Arc<dyn CacheBackend>,
        cache_config: &CacheConfig,
    ) -> Self {
        Self {
            cached: CachedStore::new(store, backend, cache_config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(CachedStore, cached);
crate::impl_from_ref!(Instant, start_time);

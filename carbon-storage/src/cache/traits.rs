//! Cache backend traits and cacheable entity marker.
//!
//! Backends store opaque snapshots under a [`NamespacedKey`]; encoding lives
//! one layer up in [`EntityCache`](super::EntityCache). Keeping the backend
//! byte-oriented makes it object safe, so one `Arc<dyn CacheBackend>` built
//! at startup can be shared by every entity cache.

use async_trait::async_trait;
use carbon_core::{CarbonResult, Electric, EntityId, EntityType, Fuel, Tree};
use serde::{de::DeserializeOwned, Serialize};

use super::key::NamespacedKey;

/// Marker trait for types that can be cached.
///
/// - `entity_type()` and `namespace()` must be constant for the type
/// - `entity_id()` must return the store-assigned id
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Get the entity type for this cacheable.
    fn entity_type() -> EntityType;

    /// Namespace holding every snapshot of this type.
    fn namespace() -> &'static str;

    /// Get the unique identifier for this entity.
    fn entity_id(&self) -> EntityId;
}

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be safe for concurrent use. Single-key operations are
/// atomic, and `replace_namespace` must swap the whole namespace so that a
/// concurrent `get_namespace` observes either the old or the new entry set.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get one snapshot, or None if the key is absent.
    async fn get(&self, key: &NamespacedKey) -> CarbonResult<Option<Vec<u8>>>;

    /// Get every snapshot stored under a namespace, ordered by key.
    async fn get_namespace(&self, namespace: &str) -> CarbonResult<Vec<(EntityId, Vec<u8>)>>;

    /// Insert or overwrite one snapshot.
    async fn put(&self, key: &NamespacedKey, value: Vec<u8>) -> CarbonResult<()>;

    /// Atomically replace the namespace contents with `entries`.
    ///
    /// Returns the number of entries removed from the previous set.
    async fn replace_namespace(
        &self,
        namespace: &'static str,
        entries: Vec<(EntityId, Vec<u8>)>,
    ) -> CarbonResult<u64>;

    /// Remove one snapshot. Returns whether the key was present.
    async fn delete(&self, key: &NamespacedKey) -> CarbonResult<bool>;

    /// Get cache statistics.
    async fn stats(&self) -> CarbonResult<CacheStats>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> CarbonResult<()>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Approximate size of the stored snapshots in bytes.
    pub memory_bytes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// IMPLEMENTATIONS FOR CATALOG ENTITIES
// ============================================================================

impl CacheableEntity for Fuel {
    fn entity_type() -> EntityType {
        EntityType::Fuel
    }

    fn namespace() -> &'static str {
        "fuels"
    }

    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl CacheableEntity for Electric {
    fn entity_type() -> EntityType {
        EntityType::Electric
    }

    fn namespace() -> &'static str {
        "electrics"
    }

    fn entity_id(&self) -> EntityId {
        self.id
    }
}

impl CacheableEntity for Tree {
    fn entity_type() -> EntityType {
        EntityType::Tree
    }

    fn namespace() -> &'static str {
        "trees"
    }

    fn entity_id(&self) -> EntityId {
        self.id
    }
}

//! Cached Store Client
//!
//! `CachedStore` puts the read-through cache in front of a `Store`. Routes
//! call it exactly as they would call the store; reads go through the cache
//! and every committed mutation of a cached entity is mirrored into it.
//!
//! Fuels and electric tariffs trust a non-empty cached list. Tree lists are
//! checked against the store's row count on every read because stock
//! changes often.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use carbon_core::{
    CacheError, CarbonResult, Electric, ElectricRequest, EntityId, EntityType, Fuel, FuelRequest,
    StorageError, Tree, TreeCategory, TreeCategoryRequest, TreeRequest,
};
use carbon_storage::{
    CacheBackend, CacheConfig, CacheRead, CacheStats, CacheableEntity, ElectricFetcher,
    EntityCache, FuelFetcher, ListPolicy, ReadThrough, StorageFetcher, Store, TreeFetcher,
    WriteOutcome,
};

use crate::error::{ApiError, ApiResult};

/// Store client with a cache-aside layer for fuels, electrics and trees.
///
/// Tree categories are not cached and pass straight through.
#[derive(Clone)]
pub struct CachedStore {
    store: Arc<dyn Store>,
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
    fuels: ReadThrough<Fuel>,
    electrics: ReadThrough<Electric>,
    trees: ReadThrough<Tree>,
}

impl CachedStore {
    /// Build the per-entity caches over one shared backend.
    pub fn new(
        store: Arc<dyn Store>,
        backend: Arc<dyn CacheBackend>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            fuels: ReadThrough::new(
                EntityCache::new(Arc::clone(&backend), config),
                ListPolicy::TrustCache,
            ),
            electrics: ReadThrough::new(
                EntityCache::new(Arc::clone(&backend), config),
                ListPolicy::TrustCache,
            ),
            trees: ReadThrough::new(
                EntityCache::new(Arc::clone(&backend), config),
                ListPolicy::VerifyCardinality,
            ),
            store,
            backend,
            op_timeout: config.op_timeout,
        }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub async fn cache_stats(&self) -> CarbonResult<CacheStats> {
        self.bounded("stats", self.backend.stats()).await
    }

    pub async fn cache_ping(&self) -> CarbonResult<()> {
        self.bounded("ping", self.backend.ping()).await
    }

    async fn bounded<R, F>(&self, operation: &str, fut: F) -> CarbonResult<R>
    where
        F: Future<Output = CarbonResult<R>>,
    {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(CacheError::Timeout {
                    operation: operation.to_string(),
                }
                .into())
            })
    }

    // ========================================================================
    // CACHED FUEL OPERATIONS
    // ========================================================================

    pub async fn fuel_list(&self) -> ApiResult<CacheRead<Vec<Fuel>>> {
        Ok(self.fuels.list(&FuelFetcher::new(self.store())).await?)
    }

    pub async fn fuel_get(&self, id: EntityId) -> ApiResult<CacheRead<Fuel>> {
        get_or_not_found(&self.fuels, id, &FuelFetcher::new(self.store())).await
    }

    pub async fn fuel_create(&self, req: &FuelRequest) -> ApiResult<WriteOutcome<Fuel>> {
        let fuel = self.store.fuel_create(req).await?;
        Ok(self.fuels.mirror_put(fuel).await)
    }

    pub async fn fuel_update(
        &self,
        id: EntityId,
        req: &FuelRequest,
    ) -> ApiResult<WriteOutcome<Fuel>> {
        let fuel = self.store.fuel_update(id, req).await?;
        Ok(self.fuels.mirror_put(fuel).await)
    }

    pub async fn fuel_delete(&self, id: EntityId) -> ApiResult<WriteOutcome<()>> {
        self.store.fuel_delete(id).await?;
        Ok(self.fuels.mirror_delete(id).await)
    }

    // ========================================================================
    // CACHED ELECTRIC OPERATIONS
    // ========================================================================

    pub async fn electric_list(&self) -> ApiResult<CacheRead<Vec<Electric>>> {
        Ok(self.electrics.list(&ElectricFetcher::new(self.store())).await?)
    }

    pub async fn electric_get(&self, id: EntityId) -> ApiResult<CacheRead<Electric>> {
        get_or_not_found(&self.electrics, id, &ElectricFetcher::new(self.store())).await
    }

    pub async fn electric_create(
        &self,
        req: &ElectricRequest,
    ) -> ApiResult<WriteOutcome<Electric>> {
        let electric = self.store.electric_create(req).await?;
        Ok(self.electrics.mirror_put(electric).await)
    }

    pub async fn electric_update(
        &self,
        id: EntityId,
        req: &ElectricRequest,
    ) -> ApiResult<WriteOutcome<Electric>> {
        let electric = self.store.electric_update(id, req).await?;
        Ok(self.electrics.mirror_put(electric).await)
    }

    pub async fn electric_delete(&self, id: EntityId) -> ApiResult<WriteOutcome<()>> {
        self.store.electric_delete(id).await?;
        Ok(self.electrics.mirror_delete(id).await)
    }

    // ========================================================================
    // CACHED TREE OPERATIONS
    // ========================================================================

    /// List trees, reconciling the cache when its size differs from the store.
    pub async fn tree_list(&self) -> ApiResult<CacheRead<Vec<Tree>>> {
        Ok(self.trees.list(&TreeFetcher::new(self.store())).await?)
    }

    pub async fn tree_get(&self, id: EntityId) -> ApiResult<CacheRead<Tree>> {
        get_or_not_found(&self.trees, id, &TreeFetcher::new(self.store())).await
    }

    pub async fn tree_create(&self, req: &TreeRequest) -> ApiResult<WriteOutcome<Tree>> {
        let tree = self.store.tree_create(req).await?;
        Ok(self.trees.mirror_put(tree).await)
    }

    pub async fn tree_update(
        &self,
        id: EntityId,
        req: &TreeRequest,
    ) -> ApiResult<WriteOutcome<Tree>> {
        let tree = self.store.tree_update(id, req).await?;
        Ok(self.trees.mirror_put(tree).await)
    }

    pub async fn tree_delete(&self, id: EntityId) -> ApiResult<WriteOutcome<()>> {
        self.store.tree_delete(id).await?;
        Ok(self.trees.mirror_delete(id).await)
    }

    // ========================================================================
    // TREE CATEGORY OPERATIONS (uncached)
    // ========================================================================

    pub async fn tree_category_list(&self) -> ApiResult<Vec<TreeCategory>> {
        Ok(self.store.tree_category_list().await?)
    }

    pub async fn tree_category_get(&self, id: EntityId) -> ApiResult<TreeCategory> {
        self.store
            .tree_category_get(id)
            .await?
            .ok_or_else(|| not_found(EntityType::TreeCategory, id))
    }

    pub async fn tree_category_create(
        &self,
        req: &TreeCategoryRequest,
    ) -> ApiResult<TreeCategory> {
        Ok(self.store.tree_category_create(req).await?)
    }

    pub async fn tree_category_update(
        &self,
        id: EntityId,
        req: &TreeCategoryRequest,
    ) -> ApiResult<TreeCategory> {
        Ok(self.store.tree_category_update(id, req).await?)
    }

    pub async fn tree_category_delete(&self, id: EntityId) -> ApiResult<()> {
        Ok(self.store.tree_category_delete(id).await?)
    }
}

async fn get_or_not_found<T, S>(
    read_through: &ReadThrough<T>,
    id: EntityId,
    fetcher: &S,
) -> ApiResult<CacheRead<T>>
where
    T: CacheableEntity,
    S: StorageFetcher<T>,
{
    read_through
        .get(id, fetcher)
        .await?
        .ok_or_else(|| not_found(T::entity_type(), id))
}

fn not_found(entity_type: EntityType, id: EntityId) -> ApiError {
    StorageError::NotFound { entity_type, id }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbon_storage::{InMemoryCacheBackend, InMemoryStore, NamespacedKey, ReadSource};
    use carbon_test_utils::{fuel_request, UnreachableCacheBackend};

    fn cached(store: Arc<InMemoryStore>) -> (CachedStore, Arc<dyn CacheBackend>) {
        let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
        let client = CachedStore::new(store, Arc::clone(&backend), &CacheConfig::default());
        (client, backend)
    }

    #[tokio::test]
    async fn test_fuel_get_backfills_then_hits() {
        let store = Arc::new(InMemoryStore::new());
        let created = store.fuel_create(&fuel_request("Pertamax")).await.unwrap();
        let (client, _backend) = cached(Arc::clone(&store));

        let first = client.fuel_get(created.id).await.unwrap();
        assert_eq!(first.source(), ReadSource::Store);
        let second = client.fuel_get(created.id).await.unwrap();
        assert!(second.was_cache_hit());
        assert_eq!(second.into_value(), created);
    }

    #[tokio::test]
    async fn test_missing_entity_is_404() {
        let (client, _backend) = cached(Arc::new(InMemoryStore::new()));
        let err = client.tree_get(9).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::EntityNotFound);

        let err = client.tree_category_get(9).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::EntityNotFound);
    }

    #[tokio::test]
    async fn test_create_update_delete_mirror_into_cache() {
        let (client, backend) = cached(Arc::new(InMemoryStore::new()));
        let created = client
            .fuel_create(&fuel_request("Solar"))
            .await
            .unwrap()
            .into_value();
        let key = NamespacedKey::new("fuels", created.id);
        assert!(backend.get(&key).await.unwrap().is_some());

        let mut req = fuel_request("Solar");
        req.price = 6800.0;
        let outcome = client.fuel_update(created.id, &req).await.unwrap();
        assert!(outcome.is_mirrored());
        let raw = backend.get(&key).await.unwrap().unwrap();
        let cached: Fuel = serde_json::from_slice(&raw).unwrap();
        assert_eq!(cached.price, 6800.0);

        client.fuel_delete(created.id).await.unwrap();
        assert!(backend.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_store_write_leaves_cache_untouched() {
        let (client, backend) = cached(Arc::new(InMemoryStore::new()));
        let err = client.fuel_update(4, &fuel_request("Solar")).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::EntityNotFound);
        assert!(backend
            .get(&NamespacedKey::new("fuels", 4))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unreachable_cache_does_not_fail_requests() {
        let store = Arc::new(InMemoryStore::new());
        let client = CachedStore::new(
            store,
            Arc::new(UnreachableCacheBackend),
            &CacheConfig::default(),
        );

        let outcome = client.fuel_create(&fuel_request("Pertalite")).await.unwrap();
        assert!(!outcome.is_mirrored());

        let listed = client.fuel_list().await.unwrap();
        assert_eq!(listed.source(), ReadSource::Store);
        assert!(listed.cache_error().is_some());
        assert_eq!(listed.value().len(), 1);
        assert!(client.cache_ping().await.is_err());
    }
}

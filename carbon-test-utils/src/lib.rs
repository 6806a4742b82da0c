//! Carbon Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Request fixtures and store seeding helpers
//! - Cache backends that fail or stall on demand
//! - Proptest generators for request payloads

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

// Re-export the in-memory store from its source crate
pub use carbon_storage::InMemoryStore;

pub use carbon_core::{
    CacheError, CarbonError, CarbonResult, Electric, ElectricRequest, EntityId, Fuel,
    FuelRequest, Tree, TreeCategory, TreeCategoryRequest, TreeRequest,
};
use carbon_storage::{CacheBackend, CacheStats, InMemoryCacheBackend, NamespacedKey, Store};

// ============================================================================
// FIXTURES
// ============================================================================

/// A valid fuel payload.
pub fn fuel_request(name: &str) -> FuelRequest {
    FuelRequest {
        category: "Gas".to_string(),
        name: name.to_string(),
        emission_factor: 2.31,
        price: 10000.0,
        unit: "Liter".to_string(),
    }
}

/// A valid electricity tariff payload.
pub fn electric_request(province: &str) -> ElectricRequest {
    ElectricRequest {
        province: province.to_string(),
        emission_factor: 0.87,
        price: 1444.7,
    }
}

pub fn tree_category_request(name: &str) -> TreeCategoryRequest {
    TreeCategoryRequest {
        name: name.to_string(),
    }
}

/// A valid tree payload in the given category.
pub fn tree_request(tree_category_id: EntityId, name: &str) -> TreeRequest {
    TreeRequest {
        tree_category_id,
        name: name.to_string(),
        description: format!("{} seedling", name),
        price: 25000.0,
        stock: 10,
    }
}

/// Create one category and `count` trees in it, directly in the store.
///
/// Tree names are `Tree 1`, `Tree 2`, ...
pub async fn seed_trees(
    store: &dyn Store,
    count: usize,
) -> CarbonResult<(TreeCategory, Vec<Tree>)> {
    let category = store
        .tree_category_create(&tree_category_request("Hardwood"))
        .await?;
    let mut trees = Vec::with_capacity(count);
    for n in 1..=count {
        let tree = store
            .tree_create(&tree_request(category.id, &format!("Tree {}", n)))
            .await?;
        trees.push(tree);
    }
    Ok((category, trees))
}

/// Create `count` fuels directly in the store, named `Fuel 1`, `Fuel 2`, ...
pub async fn seed_fuels(store: &dyn Store, count: usize) -> CarbonResult<Vec<Fuel>> {
    let mut fuels = Vec::with_capacity(count);
    for n in 1..=count {
        fuels.push(store.fuel_create(&fuel_request(&format!("Fuel {}", n))).await?);
    }
    Ok(fuels)
}

// ============================================================================
// FAULTY CACHE BACKENDS
// ============================================================================

/// Cache backend whose every operation fails as if the server were down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreachableCacheBackend;

impl UnreachableCacheBackend {
    fn refused<T>() -> CarbonResult<T> {
        Err(CacheError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into())
    }
}

#[async_trait]
impl CacheBackend for UnreachableCacheBackend {
    async fn get(&self, _key: &NamespacedKey) -> CarbonResult<Option<Vec<u8>>> {
        Self::refused()
    }

    async fn get_namespace(&self, _namespace: &str) -> CarbonResult<Vec<(EntityId, Vec<u8>)>> {
        Self::refused()
    }

    async fn put(&self, _key: &NamespacedKey, _value: Vec<u8>) -> CarbonResult<()> {
        Self::refused()
    }

    async fn replace_namespace(
        &self,
        _namespace: &'static str,
        _entries: Vec<(EntityId, Vec<u8>)>,
    ) -> CarbonResult<u64> {
        Self::refused()
    }

    async fn delete(&self, _key: &NamespacedKey) -> CarbonResult<bool> {
        Self::refused()
    }

    async fn stats(&self) -> CarbonResult<CacheStats> {
        Self::refused()
    }

    async fn ping(&self) -> CarbonResult<()> {
        Self::refused()
    }
}

/// In-memory backend that sleeps before every operation.
///
/// With a delay longer than the cache deadline, every call times out while
/// the data underneath stays intact.
#[derive(Debug, Clone)]
pub struct SlowCacheBackend {
    inner: Arc<InMemoryCacheBackend>,
    delay: Duration,
}

impl SlowCacheBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(InMemoryCacheBackend::new()),
            delay,
        }
    }

    /// The backend without the delay, for inspecting what was written.
    pub fn inner(&self) -> &InMemoryCacheBackend {
        &self.inner
    }
}

#[async_trait]
impl CacheBackend for SlowCacheBackend {
    async fn get(&self, key: &NamespacedKey) -> CarbonResult<Option<Vec<u8>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn get_namespace(&self, namespace: &str) -> CarbonResult<Vec<(EntityId, Vec<u8>)>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_namespace(namespace).await
    }

    async fn put(&self, key: &NamespacedKey, value: Vec<u8>) -> CarbonResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(key, value).await
    }

    async fn replace_namespace(
        &self,
        namespace: &'static str,
        entries: Vec<(EntityId, Vec<u8>)>,
    ) -> CarbonResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.replace_namespace(namespace, entries).await
    }

    async fn delete(&self, key: &NamespacedKey) -> CarbonResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    async fn stats(&self) -> CarbonResult<CacheStats> {
        self.inner.stats().await
    }

    async fn ping(&self) -> CarbonResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.ping().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for valid request payloads.

    use super::*;
    use proptest::prelude::*;

    fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,11}( [A-Z][a-z]{2,8})?"
    }

    fn arb_positive() -> impl Strategy<Value = f64> {
        0.01f64..100_000.0
    }

    pub fn arb_fuel_request() -> impl Strategy<Value = FuelRequest> {
        (
            prop::sample::select(vec!["Gas", "Diesel"]),
            arb_name(),
            arb_positive(),
            arb_positive(),
            prop::sample::select(vec!["Liter", "kWh"]),
        )
            .prop_map(|(category, name, emission_factor, price, unit)| FuelRequest {
                category: category.to_string(),
                name,
                emission_factor,
                price,
                unit: unit.to_string(),
            })
    }

    pub fn arb_electric_request() -> impl Strategy<Value = ElectricRequest> {
        (arb_name(), arb_positive(), arb_positive()).prop_map(
            |(province, emission_factor, price)| ElectricRequest {
                province,
                emission_factor,
                price,
            },
        )
    }

    /// Tree payloads in `tree_category_id`. Names may repeat.
    pub fn arb_tree_request(tree_category_id: EntityId) -> impl Strategy<Value = TreeRequest> {
        (arb_name(), arb_name(), arb_positive(), 1i64..10_000).prop_map(
            move |(name, description, price, stock)| TreeRequest {
                tree_category_id,
                name,
                description,
                price,
                stock,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fixtures_are_valid() {
        assert!(fuel_request("Pertamax").validate().is_ok());
        assert!(electric_request("Bali").validate().is_ok());
        assert!(tree_category_request("Fruit").validate().is_ok());
        assert!(tree_request(1, "Mango").validate().is_ok());
    }

    #[tokio::test]
    async fn test_seed_trees() {
        let store = InMemoryStore::new();
        let (category, trees) = seed_trees(&store, 3).await.unwrap();
        assert_eq!(trees.len(), 3);
        assert!(trees.iter().all(|t| t.tree_category_id == category.id));
        assert_eq!(store.tree_list().await.unwrap(), trees);
    }

    #[tokio::test]
    async fn test_unreachable_backend_refuses_everything() {
        let backend = UnreachableCacheBackend;
        let key = NamespacedKey::new("fuels", 1);
        assert!(backend.get(&key).await.is_err());
        assert!(backend.put(&key, vec![1]).await.is_err());
        assert!(backend.ping().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_still_stores() {
        let backend = SlowCacheBackend::new(Duration::from_secs(5));
        let key = NamespacedKey::new("trees", 2);
        backend.put(&key, vec![2]).await.unwrap();
        assert_eq!(backend.inner().get(&key).await.unwrap(), Some(vec![2]));
    }

    proptest! {
        #[test]
        fn prop_generated_requests_validate(
            fuel in arb_fuel_request(),
            electric in arb_electric_request(),
            tree in arb_tree_request(7),
        ) {
            prop_assert!(fuel.validate().is_ok());
            prop_assert!(electric.validate().is_ok());
            prop_assert!(tree.validate().is_ok());
        }
    }
}

//! Typed cache adapter, one per cached entity type.
//!
//! `EntityCache<T>` owns the JSON codec and the per-operation deadline; the
//! shared backend only ever sees bytes. Every snapshot is serialized at call
//! time, so later mutation of the caller's value never leaks into the cache.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use carbon_core::{CacheError, CarbonResult, Electric, EntityId, Fuel, Tree};
use tracing::debug;

use super::key::NamespacedKey;
use super::read_through::CacheConfig;
use super::traits::{CacheBackend, CacheableEntity};

pub type FuelCache = EntityCache<Fuel>;
pub type ElectricCache = EntityCache<Electric>;
pub type TreeCache = EntityCache<Tree>;

/// Cache operations for one entity namespace.
pub struct EntityCache<T> {
    backend: Arc<dyn CacheBackend>,
    op_timeout: Duration,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            op_timeout: self.op_timeout,
            _entity: PhantomData,
        }
    }
}

impl<T: CacheableEntity> EntityCache<T> {
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            op_timeout: config.op_timeout,
            _entity: PhantomData,
        }
    }

    /// Get a reference to the cache backend.
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Every cached entity of the namespace, ordered by id.
    ///
    /// An empty vector is a valid answer. Any error means the cache cannot
    /// answer right now.
    pub async fn get_all(&self) -> CarbonResult<Vec<T>> {
        let entries = self
            .bounded("get_all", self.backend.get_namespace(T::namespace()))
            .await?;
        entries.iter().map(|(_, bytes)| Self::decode(bytes)).collect()
    }

    /// One cached entity. Absence is `CacheError::NotFound`.
    pub async fn get_by_id(&self, id: EntityId) -> CarbonResult<T> {
        let key = NamespacedKey::for_entity::<T>(id);
        match self.bounded("get_by_id", self.backend.get(&key)).await? {
            Some(bytes) => Self::decode(&bytes),
            None => Err(CacheError::NotFound {
                entity_type: T::entity_type(),
                id,
            }
            .into()),
        }
    }

    /// Replace the whole namespace with `entities`.
    ///
    /// Concurrent readers observe the previous set or the complete new one.
    pub async fn put_all(&self, entities: &[T]) -> CarbonResult<()> {
        let entries = entities
            .iter()
            .map(|entity| Self::encode(entity).map(|bytes| (entity.entity_id(), bytes)))
            .collect::<CarbonResult<Vec<_>>>()?;
        let count = entries.len();
        let removed = self
            .bounded(
                "put_all",
                self.backend.replace_namespace(T::namespace(), entries),
            )
            .await?;
        debug!(
            namespace = T::namespace(),
            stored = count,
            removed,
            "Replaced cache namespace"
        );
        Ok(())
    }

    /// Insert or overwrite one entity.
    pub async fn put_one(&self, entity: &T) -> CarbonResult<()> {
        let key = NamespacedKey::for_entity::<T>(entity.entity_id());
        let bytes = Self::encode(entity)?;
        self.bounded("put_one", self.backend.put(&key, bytes)).await
    }

    /// Remove one entity. Removing an absent key succeeds.
    pub async fn delete_one(&self, id: EntityId) -> CarbonResult<()> {
        let key = NamespacedKey::for_entity::<T>(id);
        let present = self.bounded("delete_one", self.backend.delete(&key)).await?;
        if !present {
            debug!(key = %key, "Cache delete of absent key");
        }
        Ok(())
    }

    async fn bounded<R, F>(&self, operation: &'static str, fut: F) -> CarbonResult<R>
    where
        F: Future<Output = CarbonResult<R>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout {
                operation: operation.to_string(),
            }
            .into()),
        }
    }

    fn encode(entity: &T) -> CarbonResult<Vec<u8>> {
        serde_json::to_vec(entity).map_err(|e| {
            CacheError::Serialization {
                entity_type: T::entity_type(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn decode(bytes: &[u8]) -> CarbonResult<T> {
        serde_json::from_slice(bytes).map_err(|e| {
            CacheError::Serialization {
                entity_type: T::entity_type(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheBackend;
    use async_trait::async_trait;
    use carbon_core::{CarbonError, EntityType};
    use proptest::prelude::*;

    use crate::cache::traits::CacheStats;

    fn fuel(id: EntityId, name: &str) -> Fuel {
        Fuel {
            id,
            category: "Gas".to_string(),
            name: name.to_string(),
            emission_factor: 2.3,
            price: 10000.0,
            unit: "Liter".to_string(),
        }
    }

    fn fuel_cache() -> FuelCache {
        EntityCache::new(
            Arc::new(InMemoryCacheBackend::new()),
            &CacheConfig::default(),
        )
    }

    /// Backend that never answers within any reasonable deadline.
    struct StalledBackend;

    #[async_trait]
    impl CacheBackend for StalledBackend {
        async fn get(&self, _key: &NamespacedKey) -> CarbonResult<Option<Vec<u8>>> {
            std::future::pending().await
        }
        async fn get_namespace(&self, _ns: &str) -> CarbonResult<Vec<(EntityId, Vec<u8>)>> {
            std::future::pending().await
        }
        async fn put(&self, _key: &NamespacedKey, _value: Vec<u8>) -> CarbonResult<()> {
            std::future::pending().await
        }
        async fn replace_namespace(
            &self,
            _ns: &'static str,
            _entries: Vec<(EntityId, Vec<u8>)>,
        ) -> CarbonResult<u64> {
            std::future::pending().await
        }
        async fn delete(&self, _key: &NamespacedKey) -> CarbonResult<bool> {
            std::future::pending().await
        }
        async fn stats(&self) -> CarbonResult<CacheStats> {
            Ok(CacheStats::default())
        }
        async fn ping(&self) -> CarbonResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_put_one_then_get_by_id() {
        let cache = fuel_cache();
        let pertamax = fuel(1, "Pertamax");
        cache.put_one(&pertamax).await.unwrap();

        assert_eq!(cache.get_by_id(1).await.unwrap(), pertamax);
    }

    #[tokio::test]
    async fn test_snapshot_is_json_under_namespaced_key() {
        let cache = fuel_cache();
        cache.put_one(&fuel(1, "Solar")).await.unwrap();

        let raw = cache
            .backend()
            .get(&NamespacedKey::new("fuels", 1))
            .await
            .unwrap()
            .expect("fuels:1 should be present");
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(json["name"], "Solar");
        assert_eq!(json["id"], 1);
    }

    #[tokio::test]
    async fn test_get_by_id_absent_is_not_found() {
        let cache = fuel_cache();
        let err = cache.get_by_id(7).await.unwrap_err();
        assert!(matches!(
            err,
            CarbonError::Cache(CacheError::NotFound {
                entity_type: EntityType::Fuel,
                id: 7
            })
        ));
    }

    #[tokio::test]
    async fn test_delete_one_is_idempotent() {
        let cache = fuel_cache();
        cache.put_one(&fuel(2, "Solar")).await.unwrap();
        cache.delete_one(2).await.unwrap();
        cache.delete_one(2).await.unwrap();
        assert!(cache.get_by_id(2).await.is_err());
    }

    #[tokio::test]
    async fn test_put_all_replaces_previous_entries() {
        let cache = fuel_cache();
        cache
            .put_all(&[fuel(1, "A"), fuel(2, "B"), fuel(3, "C")])
            .await
            .unwrap();
        cache.put_all(&[fuel(2, "B2")]).await.unwrap();

        assert_eq!(cache.get_all().await.unwrap(), vec![fuel(2, "B2")]);
    }

    #[tokio::test]
    async fn test_snapshot_is_taken_at_call_time() {
        let cache = fuel_cache();
        let mut value = fuel(1, "Before");
        cache.put_one(&value).await.unwrap();
        value.name = "After".to_string();

        assert_eq!(cache.get_by_id(1).await.unwrap().name, "Before");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_serialization_error() {
        let cache = fuel_cache();
        cache
            .backend()
            .put(&NamespacedKey::new("fuels", 1), b"not json".to_vec())
            .await
            .unwrap();
        let err = cache.get_by_id(1).await.unwrap_err();
        assert!(matches!(
            err,
            CarbonError::Cache(CacheError::Serialization { .. })
        ));
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out() {
        let config = CacheConfig::default().with_op_timeout(Duration::from_millis(20));
        let cache: FuelCache = EntityCache::new(Arc::new(StalledBackend), &config);

        for err in [
            cache.get_all().await.unwrap_err(),
            cache.get_by_id(1).await.unwrap_err(),
            cache.put_one(&fuel(1, "A")).await.unwrap_err(),
            cache.delete_one(1).await.unwrap_err(),
        ] {
            assert!(matches!(err, CarbonError::Cache(CacheError::Timeout { .. })));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_readers_never_see_partial_namespace() {
        let cache = fuel_cache();
        let small: Vec<_> = (1..=3).map(|id| fuel(id, "small")).collect();
        let large: Vec<_> = (10..=15).map(|id| fuel(id, "large")).collect();
        cache.put_all(&small).await.unwrap();

        let mut readers = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            let (small, large) = (small.clone(), large.clone());
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let seen = cache.get_all().await.unwrap();
                    assert!(seen == small || seen == large, "partial set: {:?}", seen);
                }
            }));
        }
        for round in 0..100 {
            let next = if round % 2 == 0 { &large } else { &small };
            cache.put_all(next).await.unwrap();
        }
        for reader in readers {
            reader.await.unwrap();
        }
    }

    fn arb_fuel() -> impl Strategy<Value = Fuel> {
        (1i64..500, "[A-Za-z]{1,12}", 0.01f64..10.0, 1.0f64..50_000.0).prop_map(
            |(id, name, emission_factor, price)| Fuel {
                id,
                category: "Gas".to_string(),
                name,
                emission_factor,
                price,
                unit: "Liter".to_string(),
            },
        )
    }

    proptest! {
        #[test]
        fn prop_last_write_per_id_wins(fuels in prop::collection::vec(arb_fuel(), 0..20)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                let cache = fuel_cache();
                for f in &fuels {
                    cache.put_one(f).await.unwrap();
                }
                let mut expected = std::collections::BTreeMap::new();
                for f in &fuels {
                    expected.insert(f.id, f.clone());
                }
                let expected: Vec<_> = expected.into_values().collect();
                prop_assert_eq!(cache.get_all().await.unwrap(), expected);
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}

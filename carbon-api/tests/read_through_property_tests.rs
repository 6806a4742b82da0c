//! Property tests for read-through backfill
//!
//! For any set of rows in the store and an empty cache, a list or get
//! through `CachedStore` must leave the cache holding exactly the store's
//! serialized rows.

use std::sync::Arc;

use carbon_api::CachedStore;
use carbon_core::{Electric, Fuel, Tree};
use carbon_storage::{
    CacheBackend, CacheConfig, CacheableEntity, InMemoryCacheBackend, InMemoryStore,
    NamespacedKey, Store,
};
use carbon_test_utils::generators::{arb_electric_request, arb_fuel_request, arb_tree_request};
use carbon_test_utils::tree_category_request;
use proptest::prelude::*;
use serde::Serialize;
use tokio::runtime::Runtime;

fn case_err(e: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

fn test_runtime() -> Result<Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn fresh_cache(store: &Arc<InMemoryStore>) -> (CachedStore, Arc<InMemoryCacheBackend>) {
    let backend = Arc::new(InMemoryCacheBackend::new());
    let cached = CachedStore::new(store.clone(), backend.clone(), &CacheConfig::default());
    (cached, backend)
}

/// The cached snapshot of every row must be byte-identical to the row's
/// own serialization.
async fn assert_mirrored<T>(backend: &dyn CacheBackend, rows: &[T]) -> Result<(), TestCaseError>
where
    T: CacheableEntity + Serialize,
{
    let cached = backend.get_namespace(T::namespace()).await.map_err(case_err)?;
    prop_assert_eq!(cached.len(), rows.len());
    for row in rows {
        let key = NamespacedKey::new(T::namespace(), row.entity_id());
        let snapshot = backend
            .get(&key)
            .await
            .map_err(case_err)?;
        let expected = serde_json::to_vec(row).map_err(case_err)?;
        prop_assert_eq!(snapshot, Some(expected), "snapshot for {}", key);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_list_backfill_mirrors_store(
        fuels in prop::collection::vec(arb_fuel_request(), 1..6),
        electrics in prop::collection::vec(arb_electric_request(), 1..6),
        trees in prop::collection::vec(arb_tree_request(1), 1..6),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let category = store
                .tree_category_create(&tree_category_request("Hardwood"))
                .await
                .map_err(case_err)?;
            prop_assume!(category.id == 1);

            for req in &fuels {
                store.fuel_create(req).await.map_err(case_err)?;
            }
            for req in &electrics {
                store.electric_create(req).await.map_err(case_err)?;
            }
            // Tree names are unique in the store.
            for (n, req) in trees.iter().enumerate() {
                let mut req = req.clone();
                req.name = format!("{} {}", req.name, n);
                store.tree_create(&req).await.map_err(case_err)?;
            }

            let (cached, backend) = fresh_cache(&store);

            let stored: Vec<Fuel> = store.fuel_list().await.map_err(case_err)?;
            let read = cached.fuel_list().await.map_err(case_err)?;
            prop_assert_eq!(read.into_value(), stored.clone());
            assert_mirrored(backend.as_ref(), &stored).await?;

            let stored: Vec<Electric> = store.electric_list().await.map_err(case_err)?;
            let read = cached.electric_list().await.map_err(case_err)?;
            prop_assert_eq!(read.into_value(), stored.clone());
            assert_mirrored(backend.as_ref(), &stored).await?;

            let stored: Vec<Tree> = store.tree_list().await.map_err(case_err)?;
            let read = cached.tree_list().await.map_err(case_err)?;
            prop_assert_eq!(read.into_value(), stored.clone());
            assert_mirrored(backend.as_ref(), &stored).await?;
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_get_backfills_only_the_requested_row(
        trees in prop::collection::vec(arb_tree_request(1), 2..6),
        pick in any::<prop::sample::Index>(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let store = Arc::new(InMemoryStore::new());
            store
                .tree_category_create(&tree_category_request("Fruit"))
                .await
                .map_err(case_err)?;
            let mut rows = Vec::new();
            for (n, req) in trees.iter().enumerate() {
                let mut req = req.clone();
                req.name = format!("{} {}", req.name, n);
                rows.push(store.tree_create(&req).await.map_err(case_err)?);
            }
            let target = pick.get(rows.as_slice()).clone();

            let (cached, backend) = fresh_cache(&store);
            let read = cached
                .tree_get(target.id)
                .await
                .map_err(case_err)?;
            prop_assert!(!read.was_cache_hit());
            prop_assert_eq!(read.into_value(), target.clone());
            assert_mirrored(backend.as_ref(), std::slice::from_ref(&target)).await?;

            let again = cached
                .tree_get(target.id)
                .await
                .map_err(case_err)?;
            prop_assert!(again.was_cache_hit());
            Ok::<(), TestCaseError>(())
        })?;
    }
}

//! Read-through cache with store fallback and write mirroring.
//!
//! Reads go to the cache first and fall back to the store on any cache error
//! or miss, backfilling the cache before returning. Store errors always win:
//! a failed store read is never papered over with cached data. Writes are
//! mirrored after the store commits; a failed mirror is logged and reported
//! but never undoes the store change.

use std::time::Duration;

use async_trait::async_trait;
use carbon_core::{CarbonError, CarbonResult, EntityId};
use tracing::{debug, info, warn};

use super::entity_cache::EntityCache;
use super::freshness::{CacheRead, ListPolicy, WriteOutcome};
use super::traits::CacheableEntity;

/// Configuration for the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upper bound on each cache operation; slower calls count as misses.
    pub op_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_millis(500),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-operation timeout.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }
}

/// Storage fetcher trait for retrieving entities from the underlying storage.
#[async_trait]
pub trait StorageFetcher<T: CacheableEntity>: Send + Sync {
    /// Fetch every entity, ordered by id.
    async fn fetch_all(&self) -> CarbonResult<Vec<T>>;

    /// Fetch an entity from storage by ID.
    async fn fetch(&self, id: EntityId) -> CarbonResult<Option<T>>;
}

/// Read-through cache for one entity type.
pub struct ReadThrough<T> {
    cache: EntityCache<T>,
    policy: ListPolicy,
}

impl<T> Clone for ReadThrough<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            policy: self.policy,
        }
    }
}

impl<T: CacheableEntity> ReadThrough<T> {
    pub fn new(cache: EntityCache<T>, policy: ListPolicy) -> Self {
        Self { cache, policy }
    }

    pub fn cache(&self) -> &EntityCache<T> {
        &self.cache
    }

    pub fn policy(&self) -> ListPolicy {
        self.policy
    }

    /// List every entity.
    pub async fn list<S>(&self, storage: &S) -> CarbonResult<CacheRead<Vec<T>>>
    where
        S: StorageFetcher<T> + ?Sized,
    {
        let cached = match self.cache.get_all().await {
            Ok(entities) if !entities.is_empty() => entities,
            Ok(_) => {
                debug!(namespace = T::namespace(), "Cache namespace empty");
                return self.list_from_store(storage, None).await;
            }
            Err(e) => {
                debug!(namespace = T::namespace(), error = %e, "Cache list miss");
                return self.list_from_store(storage, Some(e)).await;
            }
        };

        match self.policy {
            ListPolicy::TrustCache => Ok(CacheRead::from_cache(cached)),
            ListPolicy::VerifyCardinality => self.list_verified(storage, cached.len()).await,
        }
    }

    /// Store read plus cardinality comparison against a non-empty cache.
    async fn list_verified<S>(
        &self,
        storage: &S,
        cached_len: usize,
    ) -> CarbonResult<CacheRead<Vec<T>>>
    where
        S: StorageFetcher<T> + ?Sized,
    {
        let stored = storage.fetch_all().await?;
        if stored.len() == cached_len {
            return Ok(CacheRead::from_store(stored, None));
        }

        info!(
            namespace = T::namespace(),
            cached = cached_len,
            stored = stored.len(),
            "Cache out of date, rebuilding namespace"
        );
        let cache_error = self.backfill_all(&stored).await;
        Ok(CacheRead::from_store(stored, cache_error).reconciled())
    }

    async fn list_from_store<S>(
        &self,
        storage: &S,
        miss: Option<CarbonError>,
    ) -> CarbonResult<CacheRead<Vec<T>>>
    where
        S: StorageFetcher<T> + ?Sized,
    {
        let stored = storage.fetch_all().await?;
        let write_error = self.backfill_all(&stored).await;
        Ok(CacheRead::from_store(stored, miss.or(write_error)))
    }

    /// Get one entity. `Ok(None)` means the store has no such row.
    pub async fn get<S>(&self, id: EntityId, storage: &S) -> CarbonResult<Option<CacheRead<T>>>
    where
        S: StorageFetcher<T> + ?Sized,
    {
        let miss = match self.cache.get_by_id(id).await {
            Ok(entity) => return Ok(Some(CacheRead::from_cache(entity))),
            Err(e) => e,
        };
        debug!(namespace = T::namespace(), id, error = %miss, "Cache get miss");

        let Some(entity) = storage.fetch(id).await? else {
            return Ok(None);
        };
        if let Err(e) = self.cache.put_one(&entity).await {
            warn!(namespace = T::namespace(), id, error = %e, "Cache backfill failed");
        }
        Ok(Some(CacheRead::from_store(entity, Some(miss))))
    }

    /// Mirror a committed create or update.
    pub async fn mirror_put(&self, entity: T) -> WriteOutcome<T> {
        let cache_error = self.cache.put_one(&entity).await.err();
        if let Some(e) = &cache_error {
            warn!(
                namespace = T::namespace(),
                id = entity.entity_id(),
                error = %e,
                "Cache write failed after store commit"
            );
        }
        WriteOutcome::new(entity, cache_error)
    }

    /// Mirror a committed delete.
    pub async fn mirror_delete(&self, id: EntityId) -> WriteOutcome<()> {
        let cache_error = self.cache.delete_one(id).await.err();
        if let Some(e) = &cache_error {
            warn!(
                namespace = T::namespace(),
                id,
                error = %e,
                "Cache delete failed after store commit"
            );
        }
        WriteOutcome::new((), cache_error)
    }

    async fn backfill_all(&self, entities: &[T]) -> Option<CarbonError> {
        let result = self.cache.put_all(entities).await;
        if let Err(e) = &result {
            warn!(namespace = T::namespace(), error = %e, "Cache backfill failed");
        }
        result.err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::freshness::ReadSource;
    use crate::cache::{CacheBackend, InMemoryCacheBackend, NamespacedKey};
    use carbon_core::{CacheError, StorageError, Tree};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, RwLock};

    fn tree(id: EntityId) -> Tree {
        Tree {
            id,
            tree_category_id: 1,
            name: format!("Tree {}", id),
            description: "Shade".to_string(),
            price: 20000.0,
            stock: 5,
        }
    }

    /// Fetcher over a fixed vector, counting calls.
    #[derive(Default)]
    struct VecFetcher {
        rows: RwLock<Vec<Tree>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl VecFetcher {
        fn with(rows: Vec<Tree>) -> Self {
            Self {
                rows: RwLock::new(rows),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> CarbonResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StorageError::Unavailable {
                    reason: "connection reset".to_string(),
                }
                .into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl StorageFetcher<Tree> for VecFetcher {
        async fn fetch_all(&self) -> CarbonResult<Vec<Tree>> {
            self.check()?;
            Ok(self.rows.read().unwrap().clone())
        }

        async fn fetch(&self, id: EntityId) -> CarbonResult<Option<Tree>> {
            self.check()?;
            Ok(self.rows.read().unwrap().iter().find(|t| t.id == id).cloned())
        }
    }

    fn read_through(policy: ListPolicy) -> ReadThrough<Tree> {
        let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
        ReadThrough::new(EntityCache::new(backend, &CacheConfig::default()), policy)
    }

    #[tokio::test]
    async fn test_list_miss_backfills_then_hits() {
        let rt = read_through(ListPolicy::TrustCache);
        let store = VecFetcher::with(vec![tree(1), tree(2)]);

        let first = rt.list(&store).await.unwrap();
        assert_eq!(first.source(), ReadSource::Store);
        assert_eq!(rt.cache().get_all().await.unwrap(), vec![tree(1), tree(2)]);

        let second = rt.list(&store).await.unwrap();
        assert!(second.was_cache_hit());
        assert_eq!(second.into_value(), vec![tree(1), tree(2)]);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_miss_backfills_single_entry() {
        let rt = read_through(ListPolicy::TrustCache);
        let store = VecFetcher::with(vec![tree(4)]);

        let read = rt.get(4, &store).await.unwrap().expect("tree 4 exists");
        assert_eq!(read.source(), ReadSource::Store);
        assert!(matches!(
            read.cache_error(),
            Some(CarbonError::Cache(CacheError::NotFound { id: 4, .. }))
        ));

        let again = rt.get(4, &store).await.unwrap().expect("tree 4 exists");
        assert!(again.was_cache_hit());
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_absent_everywhere_is_none() {
        let rt = read_through(ListPolicy::TrustCache);
        let store = VecFetcher::with(vec![]);
        assert!(rt.get(9, &store).await.unwrap().is_none());
        assert!(rt.cache().get_by_id(9).await.is_err());
    }

    #[tokio::test]
    async fn test_store_error_propagates_on_miss() {
        let rt = read_through(ListPolicy::TrustCache);
        let store = VecFetcher::failing();
        let err = rt.list(&store).await.unwrap_err();
        assert!(matches!(
            err,
            CarbonError::Storage(StorageError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_verified_list_rebuilds_on_count_mismatch() {
        let rt = read_through(ListPolicy::VerifyCardinality);
        rt.cache().put_all(&[tree(1), tree(2)]).await.unwrap();
        let store = VecFetcher::with(vec![tree(1), tree(2), tree(3)]);

        let read = rt.list(&store).await.unwrap();
        assert!(read.was_reconciled());
        assert_eq!(read.source(), ReadSource::Store);
        assert_eq!(read.value().len(), 3);
        assert_eq!(rt.cache().get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_verified_list_returns_store_rows_when_counts_match() {
        let rt = read_through(ListPolicy::VerifyCardinality);
        let mut stale = tree(1);
        stale.stock = 99;
        rt.cache().put_all(&[stale.clone()]).await.unwrap();
        let store = VecFetcher::with(vec![tree(1)]);

        let read = rt.list(&store).await.unwrap();
        assert!(!read.was_reconciled());
        assert_eq!(read.into_value(), vec![tree(1)]);
        // Equal counts leave the cache alone, even with a stale field.
        assert_eq!(rt.cache().get_all().await.unwrap(), vec![stale]);
    }

    #[tokio::test]
    async fn test_verified_list_never_serves_cache_when_store_fails() {
        let rt = read_through(ListPolicy::VerifyCardinality);
        rt.cache().put_all(&[tree(1)]).await.unwrap();
        assert!(rt.list(&VecFetcher::failing()).await.is_err());
    }

    #[tokio::test]
    async fn test_mirror_put_and_delete() {
        let rt = read_through(ListPolicy::TrustCache);
        let outcome = rt.mirror_put(tree(5)).await;
        assert!(outcome.is_mirrored());
        assert!(rt
            .cache()
            .backend()
            .get(&NamespacedKey::new("trees", 5))
            .await
            .unwrap()
            .is_some());

        assert!(rt.mirror_delete(5).await.is_mirrored());
        // Deleting again is still a success.
        assert!(rt.mirror_delete(5).await.is_mirrored());
        assert!(rt.cache().get_by_id(5).await.is_err());
    }
}

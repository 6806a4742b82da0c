//! Process-local cache backend.
//!
//! Each namespace is one ordered map behind a single `tokio::sync::RwLock`, so
//! a namespace replacement happens inside one write-lock critical section and
//! readers see either the old or the new set.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use carbon_core::{CarbonResult, EntityId};
use tokio::sync::RwLock;

use super::key::NamespacedKey;
use super::traits::{CacheBackend, CacheStats};

type Namespace = BTreeMap<EntityId, Vec<u8>>;

/// In-memory cache backend, used for local runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    namespaces: RwLock<HashMap<&'static str, Namespace>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, key: &NamespacedKey) -> CarbonResult<Option<Vec<u8>>> {
        let namespaces = self.namespaces.read().await;
        let value = namespaces
            .get(key.namespace())
            .and_then(|ns| ns.get(&key.id()))
            .cloned();
        self.record(value.is_some());
        Ok(value)
    }

    async fn get_namespace(&self, namespace: &str) -> CarbonResult<Vec<(EntityId, Vec<u8>)>> {
        let namespaces = self.namespaces.read().await;
        let entries: Vec<_> = namespaces
            .get(namespace)
            .map(|ns| ns.iter().map(|(id, v)| (*id, v.clone())).collect())
            .unwrap_or_default();
        self.record(!entries.is_empty());
        Ok(entries)
    }

    async fn put(&self, key: &NamespacedKey, value: Vec<u8>) -> CarbonResult<()> {
        let mut namespaces = self.namespaces.write().await;
        namespaces
            .entry(key.namespace())
            .or_default()
            .insert(key.id(), value);
        Ok(())
    }

    async fn replace_namespace(
        &self,
        namespace: &'static str,
        entries: Vec<(EntityId, Vec<u8>)>,
    ) -> CarbonResult<u64> {
        let fresh: Namespace = entries.into_iter().collect();
        let mut namespaces = self.namespaces.write().await;
        let previous = namespaces.insert(namespace, fresh);
        Ok(previous.map(|ns| ns.len() as u64).unwrap_or(0))
    }

    async fn delete(&self, key: &NamespacedKey) -> CarbonResult<bool> {
        let mut namespaces = self.namespaces.write().await;
        Ok(namespaces
            .get_mut(key.namespace())
            .and_then(|ns| ns.remove(&key.id()))
            .is_some())
    }

    async fn stats(&self) -> CarbonResult<CacheStats> {
        let namespaces = self.namespaces.read().await;
        let (entry_count, memory_bytes) = namespaces
            .values()
            .flat_map(|ns| ns.values())
            .fold((0u64, 0u64), |(n, bytes), v| (n + 1, bytes + v.len() as u64));
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            memory_bytes,
        })
    }

    async fn ping(&self) -> CarbonResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: EntityId) -> NamespacedKey {
        NamespacedKey::new("fuels", id)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let backend = InMemoryCacheBackend::new();
        backend.put(&key(1), b"one".to_vec()).await.unwrap();

        assert_eq!(backend.get(&key(1)).await.unwrap(), Some(b"one".to_vec()));
        assert!(backend.delete(&key(1)).await.unwrap());
        assert!(!backend.delete(&key(1)).await.unwrap());
        assert_eq!(backend.get(&key(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_replace_namespace_drops_absent_entries() {
        let backend = InMemoryCacheBackend::new();
        for id in 1..=3 {
            backend.put(&key(id), vec![id as u8]).await.unwrap();
        }
        backend.put(&NamespacedKey::new("trees", 1), vec![9]).await.unwrap();

        let removed = backend
            .replace_namespace("fuels", vec![(2, vec![20]), (5, vec![50])])
            .await
            .unwrap();
        assert_eq!(removed, 3);

        let ids: Vec<_> = backend
            .get_namespace("fuels")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![2, 5]);
        // Other namespaces are untouched.
        assert_eq!(
            backend.get(&NamespacedKey::new("trees", 1)).await.unwrap(),
            Some(vec![9])
        );
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let backend = InMemoryCacheBackend::new();
        backend.put(&key(1), b"abc".to_vec()).await.unwrap();
        backend.get(&key(1)).await.unwrap();
        backend.get(&key(2)).await.unwrap();

        let stats = backend.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.memory_bytes, 3);
    }
}

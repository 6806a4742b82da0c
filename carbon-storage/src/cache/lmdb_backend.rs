//! LMDB-backed cache implementation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep entity snapshots in a
//! memory-mapped key-value store that survives process restarts.
//!
//! # Atomicity
//!
//! LMDB provides ACID transactions with MVCC readers. The backend uses:
//! - Read transactions for `get` and `get_namespace`
//! - One write transaction per `put` and `delete`
//! - One write transaction for the whole of `replace_namespace`, so readers
//!   holding an older snapshot keep seeing the previous entry set
//!
//! # Blocking
//!
//! heed calls are synchronous and a writer can wait on the environment's
//! write lock. Every operation runs on the blocking pool so the caller's
//! deadline can fire while it waits.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use carbon_core::{CacheError, CarbonError, CarbonResult, EntityId};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};

use super::key::NamespacedKey;
use super::traits::{CacheBackend, CacheStats};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Map size in bytes does not fit in `usize`.
    #[error("Map size of {0} MB is too large")]
    MapSize(usize),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CarbonError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Transaction(reason) => {
                CarbonError::Cache(CacheError::Transaction { reason })
            }
            other => CarbonError::Cache(CacheError::Unavailable {
                reason: other.to_string(),
            }),
        }
    }
}

fn txn_error(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB map size for `max_size_mb`, or None on overflow.
pub fn map_size_bytes(max_size_mb: usize) -> Option<usize> {
    max_size_mb.checked_mul(1024 * 1024)
}

/// Environment handle shared with blocking tasks.
struct LmdbInner {
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbInner {
    fn record(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Collect the keys under `prefix` visible to `txn`.
    fn collect_keys_with_prefix(
        &self,
        txn: &RoTxn,
        prefix: &[u8],
    ) -> Result<Vec<Vec<u8>>, LmdbCacheError> {
        let mut keys = Vec::new();
        for result in self.db.prefix_iter(txn, prefix).map_err(txn_error)? {
            let (key, _) = result.map_err(txn_error)?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}

/// LMDB-backed cache.
#[derive(Clone)]
pub struct LmdbCacheBackend {
    inner: Arc<LmdbInner>,
}

impl LmdbCacheBackend {
    /// Create a new LMDB cache backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the map size overflows, the directory cannot be
    /// created, or the LMDB environment or database cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        let map_size = map_size_bytes(max_size_mb).ok_or(LmdbCacheError::MapSize(max_size_mb))?;
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment directory is owned by this process; no other
        // handle to the same path is opened while this one is alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self {
            inner: Arc::new(LmdbInner {
                env,
                db,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
            }),
        })
    }

    /// Run `op` on the blocking pool.
    ///
    /// If the caller stops waiting, the operation still runs to completion;
    /// a write that was already queued on the write lock commits late.
    async fn blocking<R, F>(&self, op: F) -> CarbonResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&LmdbInner) -> Result<R, LmdbCacheError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let result = tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| CacheError::Unavailable {
                reason: format!("LMDB task failed: {}", e),
            })?;
        Ok(result?)
    }
}

#[async_trait]
impl CacheBackend for LmdbCacheBackend {
    async fn get(&self, key: &NamespacedKey) -> CarbonResult<Option<Vec<u8>>> {
        let key = key.encode();
        self.blocking(move |inner| {
            let rtxn = inner.env.read_txn().map_err(txn_error)?;
            let value = inner
                .db
                .get(&rtxn, key.as_slice())
                .map_err(txn_error)?
                .map(<[u8]>::to_vec);
            inner.record(value.is_some());
            Ok(value)
        })
        .await
    }

    async fn get_namespace(&self, namespace: &str) -> CarbonResult<Vec<(EntityId, Vec<u8>)>> {
        let namespace = namespace.to_string();
        self.blocking(move |inner| {
            let prefix = NamespacedKey::namespace_prefix(&namespace);
            let rtxn = inner.env.read_txn().map_err(txn_error)?;

            let mut entries = Vec::new();
            for result in inner.db.prefix_iter(&rtxn, prefix.as_slice()).map_err(txn_error)? {
                let (key, value) = result.map_err(txn_error)?;
                if let Some(id) = NamespacedKey::decode_id(&namespace, key) {
                    entries.push((id, value.to_vec()));
                }
            }
            // Keys sort as strings ("fuels:10" < "fuels:2"); callers expect id order.
            entries.sort_by_key(|(id, _)| *id);

            inner.record(!entries.is_empty());
            Ok(entries)
        })
        .await
    }

    async fn put(&self, key: &NamespacedKey, value: Vec<u8>) -> CarbonResult<()> {
        let key = key.encode();
        self.blocking(move |inner| {
            let mut wtxn = inner.env.write_txn().map_err(txn_error)?;
            inner
                .db
                .put(&mut wtxn, key.as_slice(), value.as_slice())
                .map_err(txn_error)?;
            wtxn.commit().map_err(txn_error)
        })
        .await
    }

    async fn replace_namespace(
        &self,
        namespace: &'static str,
        entries: Vec<(EntityId, Vec<u8>)>,
    ) -> CarbonResult<u64> {
        self.blocking(move |inner| {
            let prefix = NamespacedKey::namespace_prefix(namespace);
            let mut wtxn = inner.env.write_txn().map_err(txn_error)?;

            let stale = inner.collect_keys_with_prefix(&wtxn, &prefix)?;
            let mut removed = 0u64;
            for key in &stale {
                if inner.db.delete(&mut wtxn, key.as_slice()).map_err(txn_error)? {
                    removed += 1;
                }
            }
            for (id, value) in &entries {
                let key = NamespacedKey::new(namespace, *id).encode();
                inner
                    .db
                    .put(&mut wtxn, key.as_slice(), value.as_slice())
                    .map_err(txn_error)?;
            }

            // Nothing is visible to readers until this commit.
            wtxn.commit().map_err(txn_error)?;
            Ok(removed)
        })
        .await
    }

    async fn delete(&self, key: &NamespacedKey) -> CarbonResult<bool> {
        let key = key.encode();
        self.blocking(move |inner| {
            let mut wtxn = inner.env.write_txn().map_err(txn_error)?;
            let deleted = inner
                .db
                .delete(&mut wtxn, key.as_slice())
                .map_err(txn_error)?;
            wtxn.commit().map_err(txn_error)?;
            Ok(deleted)
        })
        .await
    }

    async fn stats(&self) -> CarbonResult<CacheStats> {
        self.blocking(|inner| {
            let rtxn = inner.env.read_txn().map_err(txn_error)?;
            let mut entry_count = 0u64;
            let mut memory_bytes = 0u64;
            for result in inner.db.iter(&rtxn).map_err(txn_error)? {
                let (_, value) = result.map_err(txn_error)?;
                entry_count += 1;
                memory_bytes += value.len() as u64;
            }
            Ok(CacheStats {
                hits: inner.hits.load(Ordering::Relaxed),
                misses: inner.misses.load(Ordering::Relaxed),
                entry_count,
                memory_bytes,
            })
        })
        .await
    }

    async fn ping(&self) -> CarbonResult<()> {
        self.blocking(|inner| {
            let _rtxn = inner.env.read_txn().map_err(txn_error)?;
            Ok(())
        })
        .await
    }
}

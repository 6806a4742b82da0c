//! Cache-aside layer for the catalog entities.
//!
//! The store is authoritative. The cache holds JSON snapshots of fuels,
//! electricity tariffs and trees keyed by `<namespace>:<id>` and may be
//! empty, stale or briefly inconsistent; it never has a TTL.
//!
//! # Layers
//!
//! - [`CacheBackend`]: byte-level, object-safe storage shared by every cache
//!   ([`InMemoryCacheBackend`], [`LmdbCacheBackend`])
//! - [`EntityCache`]: typed get-all / get-by-id / put-all / put-one /
//!   delete-one with a JSON codec and a per-operation deadline
//! - [`ReadThrough`]: miss fallback, backfill, list verification and write
//!   mirroring, reporting how each call was served via [`CacheRead`] and
//!   [`WriteOutcome`]
//!
//! # Example
//!
//! ```ignore
//! let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
//! let trees = ReadThrough::new(
//!     TreeCache::new(backend, &CacheConfig::default()),
//!     ListPolicy::VerifyCardinality,
//! );
//! let read = trees.list(&TreeFetcher::new(&store)).await?;
//! if read.was_reconciled() {
//!     tracing::info!("tree cache rebuilt");
//! }
//! ```

pub mod entity_cache;
pub mod freshness;
pub mod key;
pub mod lmdb_backend;
pub mod memory_backend;
pub mod read_through;
pub mod traits;

pub use entity_cache::{ElectricCache, EntityCache, FuelCache, TreeCache};
pub use freshness::{CacheRead, ListPolicy, ReadSource, WriteOutcome};
pub use key::NamespacedKey;
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use read_through::{CacheConfig, ReadThrough, StorageFetcher};
pub use traits::{CacheBackend, CacheStats, CacheableEntity};

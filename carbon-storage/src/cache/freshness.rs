//! Read and write metadata for cache-aside operations.
//!
//! Handlers never see a different body depending on where data came from,
//! but callers and tests can inspect how a request was served.

use carbon_core::CarbonError;

/// How much a list read trusts a non-empty cached namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPolicy {
    /// Serve a non-empty cached namespace as-is.
    #[default]
    TrustCache,

    /// Always read the store as well and compare entry counts. On mismatch
    /// the cache is rebuilt from the store. The store's list is returned
    /// either way.
    ///
    /// Only cardinality is compared, so an in-place edit that bypassed the
    /// cache goes unnoticed until the next mismatch.
    VerifyCardinality,
}

/// Where the returned value was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Cache,
    Store,
}

/// Result of a cache-aside read.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    source: ReadSource,
    /// Set when a cardinality check found the cache out of date.
    reconciled: bool,
    /// Why the cache could not answer, if it could not.
    cache_error: Option<CarbonError>,
}

impl<T> CacheRead<T> {
    /// Create a read served from the cache.
    pub fn from_cache(value: T) -> Self {
        Self {
            value,
            source: ReadSource::Cache,
            reconciled: false,
            cache_error: None,
        }
    }

    /// Create a read served from the store after a miss or a check.
    pub fn from_store(value: T, cache_error: Option<CarbonError>) -> Self {
        Self {
            value,
            source: ReadSource::Store,
            reconciled: false,
            cache_error,
        }
    }

    pub(crate) fn reconciled(mut self) -> Self {
        self.reconciled = true;
        self
    }

    pub fn source(&self) -> ReadSource {
        self.source
    }

    pub fn was_cache_hit(&self) -> bool {
        self.source == ReadSource::Cache
    }

    pub fn was_reconciled(&self) -> bool {
        self.reconciled
    }

    pub fn cache_error(&self) -> Option<&CarbonError> {
        self.cache_error.as_ref()
    }

    /// Get a reference to the underlying value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consume the wrapper and return the underlying value.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Result of a store mutation mirrored into the cache.
///
/// The value is whatever the store committed. `cache_error` is set when the
/// mirror write failed; the store change stands regardless.
#[derive(Debug, Clone)]
pub struct WriteOutcome<T> {
    value: T,
    cache_error: Option<CarbonError>,
}

impl<T> WriteOutcome<T> {
    pub fn new(value: T, cache_error: Option<CarbonError>) -> Self {
        Self { value, cache_error }
    }

    pub fn is_mirrored(&self) -> bool {
        self.cache_error.is_none()
    }

    pub fn cache_error(&self) -> Option<&CarbonError> {
        self.cache_error.as_ref()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

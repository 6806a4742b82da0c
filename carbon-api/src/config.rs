//! API Configuration Module
//!
//! Configuration for CORS, request timeouts and the cache backend. Values are
//! loaded from environment variables with development defaults.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use carbon_core::{CarbonResult, ConfigError};
use carbon_storage::cache::lmdb_backend::map_size_bytes;
use carbon_storage::{CacheBackend, CacheConfig, InMemoryCacheBackend, LmdbCacheBackend};

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and request handling.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Upper bound on a whole request, store and cache calls included.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CARBON_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `CARBON_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `CARBON_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `CARBON_REQUEST_TIMEOUT_SECS`: Request deadline (default: 30)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("CARBON_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("CARBON_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("CARBON_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let request_timeout = Duration::from_secs(
            std::env::var("CARBON_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        );

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            request_timeout,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Which cache backend to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Process-local map. Lost on restart.
    Memory,
    /// LMDB environment at the given directory.
    Lmdb { path: PathBuf, max_size_mb: usize },
}

/// Cache settings for the shared backend and its per-operation deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub backend: CacheBackendKind,
    pub op_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            op_timeout: CacheConfig::default().op_timeout,
        }
    }
}

impl CacheSettings {
    /// Load cache settings from environment variables.
    ///
    /// Environment variables:
    /// - `CARBON_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `CARBON_CACHE_PATH`: LMDB directory (default: ./data/cache)
    /// - `CARBON_CACHE_MAX_SIZE_MB`: LMDB map size (default: 256)
    /// - `CARBON_CACHE_TIMEOUT_MS`: Per-operation deadline (default: 500)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = lookup("CARBON_CACHE_BACKEND").unwrap_or_else(|| "memory".to_string());
        let backend = match kind.trim().to_lowercase().as_str() {
            "memory" => CacheBackendKind::Memory,
            "lmdb" => {
                let max_size_mb: usize = parse_number(&lookup, "CARBON_CACHE_MAX_SIZE_MB", 256)?;
                if max_size_mb == 0 || map_size_bytes(max_size_mb).is_none() {
                    return Err(ConfigError::InvalidValue {
                        field: "CARBON_CACHE_MAX_SIZE_MB".to_string(),
                        value: max_size_mb.to_string(),
                        reason: "must be a non-zero size that fits in memory".to_string(),
                    });
                }
                CacheBackendKind::Lmdb {
                    path: lookup("CARBON_CACHE_PATH")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("./data/cache")),
                    max_size_mb,
                }
            }
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "CARBON_CACHE_BACKEND".to_string(),
                    value: kind,
                    reason: "expected 'memory' or 'lmdb'".to_string(),
                })
            }
        };

        let default_ms = CacheConfig::default().op_timeout.as_millis() as u64;
        let timeout_ms = parse_number(&lookup, "CARBON_CACHE_TIMEOUT_MS", default_ms)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CARBON_CACHE_TIMEOUT_MS".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            backend,
            op_timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Typed-cache settings derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new().with_op_timeout(self.op_timeout)
    }

    /// Open the backend. Called once at startup; the result is shared by
    /// every entity cache.
    pub fn build_backend(&self) -> CarbonResult<Arc<dyn CacheBackend>> {
        match &self.backend {
            CacheBackendKind::Memory => Ok(Arc::new(InMemoryCacheBackend::new())),
            CacheBackendKind::Lmdb { path, max_size_mb } => {
                let backend = LmdbCacheBackend::new(path, *max_size_mb)?;
                Ok(Arc::new(backend))
            }
        }
    }
}

fn parse_number<F, N>(lookup: &F, field: &str, default: N) -> Result<N, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: std::str::FromStr,
{
    match lookup(field) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw,
            reason: "expected a non-negative integer".to_string(),
        }),
    }
}

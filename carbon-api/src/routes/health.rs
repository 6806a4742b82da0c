//! Health Check Endpoints
//!
//! - /health/live - Process alive check
//! - /health/ready - Store and cache connectivity check
//!
//! An unreachable cache only degrades readiness: every read can still be
//! served by the store.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use carbon_storage::CacheStats;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cached_db::CachedStore;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthDetails {
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_stats: Option<CacheStatsBody>,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_check(result: Result<u64, String>) -> Self {
        match result {
            Ok(latency) => Self {
                status: HealthStatus::Healthy,
                latency_ms: Some(latency),
                error: None,
            },
            Err(e) => Self {
                status: HealthStatus::Unhealthy,
                latency_ms: None,
                error: Some(e),
            },
        }
    }
}

/// Cache counters as reported on readiness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CacheStatsBody {
    pub hits: u64,
    pub misses: u64,
    pub entry_count: u64,
    pub memory_bytes: u64,
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsBody {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            entry_count: stats.entry_count,
            memory_bytes: stats.memory_bytes,
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/live - Process liveness check
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = HealthResponse),
    ),
))]
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check (store and cache connectivity)
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready, possibly without cache", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = HealthResponse),
    ),
))]
pub async fn readiness(
    State(cached): State<CachedStore>,
    State(start_time): State<Instant>,
) -> impl IntoResponse {
    let database = ComponentHealth::from_check(check_store(&cached).await);
    let cache = ComponentHealth::from_check(check_cache(&cached).await);
    let cache_stats = match cached.cache_stats().await {
        Ok(stats) => Some(CacheStatsBody::from(stats)),
        Err(e) => {
            tracing::debug!(error = %e, "Cache stats unavailable");
            None
        }
    };

    let overall_status = overall(database.status, cache.status);
    let response = HealthResponse {
        status: overall_status,
        message: None,
        details: Some(HealthDetails {
            database,
            cache,
            cache_stats,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: start_time.elapsed().as_secs(),
        }),
    };

    let status_code = if overall_status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status_code, Json(response))
}

fn overall(database: HealthStatus, cache: HealthStatus) -> HealthStatus {
    match (database, cache) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

async fn check_store(cached: &CachedStore) -> Result<u64, String> {
    let start = Instant::now();
    match cached.store().ping().await {
        Ok(()) => Ok(start.elapsed().as_millis() as u64),
        Err(e) => Err(format!("Database check failed: {}", e)),
    }
}

async fn check_cache(cached: &CachedStore) -> Result<u64, String> {
    let start = Instant::now();
    match cached.cache_ping().await {
        Ok(()) => Ok(start.elapsed().as_millis() as u64),
        Err(e) => Err(format!("Cache check failed: {}", e)),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create health check router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
}

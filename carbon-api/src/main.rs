//! Carbon API Server Entry Point
//!
//! Bootstraps configuration, opens the cache backend and the store once,
//! and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use carbon_api::telemetry::{init_tracing, TelemetryConfig};
use carbon_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, CacheSettings, DbClient,
    DbConfig,
};
use carbon_storage::{InMemoryStore, Store};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let cache_settings = CacheSettings::from_env()?;
    let backend = cache_settings.build_backend()?;
    tracing::info!(backend = ?cache_settings.backend, "Cache backend ready");

    let store = open_store().await?;

    let api_config = ApiConfig::from_env();
    let state = AppState::new(store, backend, &cache_settings.cache_config());
    let app: Router = create_api_router(state, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Carbon API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

/// `CARBON_STORE=memory` runs without PostgreSQL; anything else connects
/// with `DbConfig::from_env` and bootstraps the schema.
async fn open_store() -> ApiResult<Arc<dyn Store>> {
    if std::env::var("CARBON_STORE").is_ok_and(|s| s.eq_ignore_ascii_case("memory")) {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let db = DbClient::from_config(&DbConfig::from_env())?;
    db.migrate().await?;
    Ok(Arc::new(db))
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("CARBON_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("CARBON_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}

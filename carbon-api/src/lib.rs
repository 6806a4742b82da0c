//! Carbon API - REST layer for the emission-factor catalog
//!
//! Axum routes for fuels, electricity tariffs, trees and tree categories.
//! Reads of the cached entity types go through a cache-aside layer in front
//! of PostgreSQL; every committed write is mirrored into the cache.

pub mod cached_db;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod macros;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use cached_db::CachedStore;
pub use config::{ApiConfig, CacheBackendKind, CacheSettings};
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::{create_api_router, MessageResponse};
pub use state::AppState;

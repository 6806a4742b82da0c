//! REST API Routes Module
//!
//! Route handlers for the catalog endpoints, organized by entity type, and
//! the router assembly shared by `main` and the integration tests.

use axum::{
    error_handling::HandleErrorLayer,
    http::{header, Method},
    BoxError, Router,
};
use carbon_core::EntityType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::error::{ApiError, ErrorCode};
use crate::state::AppState;

pub mod electric;
pub mod fuel;
pub mod health;
pub mod tree;
pub mod tree_category;

/// Body of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn deleted(entity_type: EntityType) -> Self {
        Self {
            message: format!("{} deleted successfully", entity_type.label()),
        }
    }
}

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if !config.is_production() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<axum::http::HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let router = Router::new()
        .nest("/fuels", fuel::create_router())
        .nest("/electrics", electric::create_router())
        .nest("/trees", tree::create_router())
        .nest("/tree-categories", tree_category::create_router())
        .nest("/health", health::create_router());

    #[cfg(feature = "openapi")]
    let router = router.route("/openapi.json", axum::routing::get(openapi_json));

    router
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(api_config.request_timeout)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::new(ErrorCode::EntityNotFound, "Route not found")
}

/// Errors raised by the middleware stack, rendered in the `ApiError` shape.
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded the configured deadline");
        ApiError::timeout("Request timed out")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::internal_error("Internal server error")
    }
}

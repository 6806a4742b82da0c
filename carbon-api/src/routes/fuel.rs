//! Fuel REST API Routes
//!
//! Reads go through the fuel cache and fall back to the store on any miss.
//! Writes are committed to the store first and then mirrored into the cache.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use carbon_core::{EntityType, Fuel, FuelRequest};

use crate::{
    cached_db::CachedStore,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, PathId},
    routes::MessageResponse,
    state::AppState,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// GET /fuels - List all fuels
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/fuels",
    tag = "Fuels",
    responses(
        (status = 200, description = "List of fuels", body = Vec<Fuel>),
        (status = 500, description = "Database error", body = ApiError),
    ),
))]
pub async fn list_fuels(State(cached): State<CachedStore>) -> ApiResult<Json<Vec<Fuel>>> {
    let read = cached.fuel_list().await?;
    Ok(Json(read.into_value()))
}

/// GET /fuels/{id} - Get fuel by ID
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/fuels/{id}",
    tag = "Fuels",
    params(("id" = i64, Path, description = "Fuel ID")),
    responses(
        (status = 200, description = "Fuel details", body = Fuel),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 404, description = "Fuel not found", body = ApiError),
    ),
))]
pub async fn get_fuel(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<Fuel>> {
    let read = cached.fuel_get(id).await?;
    Ok(Json(read.into_value()))
}

/// POST /fuels - Create a new fuel
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/fuels",
    tag = "Fuels",
    request_body = FuelRequest,
    responses(
        (status = 201, description = "Fuel created successfully", body = Fuel),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
))]
pub async fn create_fuel(
    State(cached): State<CachedStore>,
    ApiJson(req): ApiJson<FuelRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let outcome = cached.fuel_create(&req).await?;
    Ok((StatusCode::CREATED, Json(outcome.into_value())))
}

/// PUT /fuels/{id} - Replace a fuel
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/fuels/{id}",
    tag = "Fuels",
    params(("id" = i64, Path, description = "Fuel ID")),
    request_body = FuelRequest,
    responses(
        (status = 200, description = "Fuel updated successfully", body = Fuel),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Fuel not found", body = ApiError),
    ),
))]
pub async fn update_fuel(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
    ApiJson(req): ApiJson<FuelRequest>,
) -> ApiResult<Json<Fuel>> {
    req.validate()?;
    let outcome = cached.fuel_update(id, &req).await?;
    Ok(Json(outcome.into_value()))
}

/// DELETE /fuels/{id} - Delete a fuel
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/fuels/{id}",
    tag = "Fuels",
    params(("id" = i64, Path, description = "Fuel ID")),
    responses(
        (status = 200, description = "Fuel deleted successfully", body = MessageResponse),
        (status = 404, description = "Fuel not found", body = ApiError),
    ),
))]
pub async fn delete_fuel(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    cached.fuel_delete(id).await?;
    Ok(Json(MessageResponse::deleted(EntityType::Fuel)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", axum::routing::get(list_fuels).post(create_fuel))
        .route(
            "/:id",
            axum::routing::get(get_fuel).put(update_fuel).delete(delete_fuel),
        )
}

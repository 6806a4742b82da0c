//! Electric Tariff REST API Routes
//!
//! Same cache-aside flow as fuels. Deleting a tariff is a soft delete in the
//! store and a hard delete in the cache.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use carbon_core::{Electric, ElectricRequest, EntityType};

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

/// GET /electrics - List all electric tariffs
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/electrics",
    tag = "Electrics",
    responses(
        (status = 200, description = "List of electric tariffs", body = Vec<Electric>),
        (status = 500, description = "Database error", body = ApiError),
    ),
))]
pub async fn list_electrics(
    State(cached): State<CachedStore>,
) -> ApiResult<Json<Vec<Electric>>> {
    let read = cached.electric_list().await?;
    Ok(Json(read.into_value()))
}

/// GET /electrics/{id} - Get tariff by ID
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/electrics/{id}",
    tag = "Electrics",
    params(("id" = i64, Path, description = "Electric tariff ID")),
    responses(
        (status = 200, description = "Tariff details", body = Electric),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 404, description = "Tariff not found", body = ApiError),
    ),
))]
pub async fn get_electric(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<Electric>> {
    let read = cached.electric_get(id).await?;
    Ok(Json(read.into_value()))
}

/// POST /electrics - Create a new tariff
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/electrics",
    tag = "Electrics",
    request_body = ElectricRequest,
    responses(
        (status = 201, description = "Tariff created successfully", body = Electric),
        (status = 400, description = "Invalid request", body = ApiError),
    ),
))]
pub async fn create_electric(
    State(cached): State<CachedStore>,
    ApiJson(req): ApiJson<ElectricRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let outcome = cached.electric_create(&req).await?;
    Ok((StatusCode::CREATED, Json(outcome.into_value())))
}

/// PUT /electrics/{id} - Replace a tariff
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/electrics/{id}",
    tag = "Electrics",
    params(("id" = i64, Path, description = "Electric tariff ID")),
    request_body = ElectricRequest,
    responses(
        (status = 200, description = "Tariff updated successfully", body = Electric),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 404, description = "Tariff not found", body = ApiError),
    ),
))]
pub async fn update_electric(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
    ApiJson(req): ApiJson<ElectricRequest>,
) -> ApiResult<Json<Electric>> {
    req.validate()?;
    let outcome = cached.electric_update(id, &req).await?;
    Ok(Json(outcome.into_value()))
}

/// DELETE /electrics/{id} - Soft-delete a tariff
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/electrics/{id}",
    tag = "Electrics",
    params(("id" = i64, Path, description = "Electric tariff ID")),
    responses(
        (status = 200, description = "Tariff deleted successfully", body = MessageResponse),
        (status = 404, description = "Tariff not found", body = ApiError),
    ),
))]
pub async fn delete_electric(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    cached.electric_delete(id).await?;
    Ok(Json(MessageResponse::deleted(EntityType::Electric)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", axum::routing::get(list_electrics).post(create_electric))
        .route(
            "/:id",
            axum::routing::get(get_electric).put(update_electric).delete(delete_electric),
        )
}

//! Tree REST API Routes
//!
//! The tree list is always answered from the store. A non-empty cached
//! namespace is only compared by size and rebuilt when it has drifted, so
//! stock changes made outside this service eventually show up in the cache.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use carbon_core::{EntityType, Tree, TreeRequest};

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

/// GET /trees - List all trees
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/trees",
    tag = "Trees",
    responses(
        (status = 200, description = "List of trees", body = Vec<Tree>),
        (status = 500, description = "Database error", body = ApiError),
    ),
))]
pub async fn list_trees(State(cached): State<CachedStore>) -> ApiResult<Json<Vec<Tree>>> {
    let read = cached.tree_list().await?;
    if read.was_reconciled() {
        tracing::debug!(count = read.value().len(), "Tree cache rebuilt from store");
    }
    Ok(Json(read.into_value()))
}

/// GET /trees/{id} - Get tree by ID
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/trees/{id}",
    tag = "Trees",
    params(("id" = i64, Path, description = "Tree ID")),
    responses(
        (status = 200, description = "Tree details", body = Tree),
        (status = 400, description = "Invalid ID", body = ApiError),
        (status = 404, description = "Tree not found", body = ApiError),
    ),
))]
pub async fn get_tree(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<Tree>> {
    let read = cached.tree_get(id).await?;
    Ok(Json(read.into_value()))
}

/// POST /trees - Create a new tree
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/trees",
    tag = "Trees",
    request_body = TreeRequest,
    responses(
        (status = 201, description = "Tree created successfully", body = Tree),
        (status = 400, description = "Invalid request or unknown category", body = ApiError),
        (status = 409, description = "Tree name already in use", body = ApiError),
    ),
))]
pub async fn create_tree(
    State(cached): State<CachedStore>,
    ApiJson(req): ApiJson<TreeRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let outcome = cached.tree_create(&req).await?;
    Ok((StatusCode::CREATED, Json(outcome.into_value())))
}

/// PUT /trees/{id} - Replace a tree
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/trees/{id}",
    tag = "Trees",
    params(("id" = i64, Path, description = "Tree ID")),
    request_body = TreeRequest,
    responses(
        (status = 200, description = "Tree updated successfully", body = Tree),
        (status = 400, description = "Invalid request or unknown category", body = ApiError),
        (status = 404, description = "Tree not found", body = ApiError),
        (status = 409, description = "Tree name already in use", body = ApiError),
    ),
))]
pub async fn update_tree(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
    ApiJson(req): ApiJson<TreeRequest>,
) -> ApiResult<Json<Tree>> {
    req.validate()?;
    let outcome = cached.tree_update(id, &req).await?;
    Ok(Json(outcome.into_value()))
}

/// DELETE /trees/{id} - Delete a tree
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/trees/{id}",
    tag = "Trees",
    params(("id" = i64, Path, description = "Tree ID")),
    responses(
        (status = 200, description = "Tree deleted successfully", body = MessageResponse),
        (status = 404, description = "Tree not found", body = ApiError),
    ),
))]
pub async fn delete_tree(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    cached.tree_delete(id).await?;
    Ok(Json(MessageResponse::deleted(EntityType::Tree)))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/", axum::routing::get(list_trees).post(create_tree))
        .route(
            "/:id",
            axum::routing::get(get_tree).put(update_tree).delete(delete_tree),
        )
}

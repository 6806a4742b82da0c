//! Tree Category REST API Routes
//!
//! Categories are read and written straight against the store.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use carbon_core::{EntityType, TreeCategory, TreeCategoryRequest};

use crate::{
    cached_db::CachedStore,
    error::{ApiError, ApiResult},
    extractors::{ApiJson, PathId},
    routes::MessageResponse,
    state::AppState,
};

/// GET /tree-categories - List all tree categories
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/tree-categories",
    tag = "Tree Categories",
    responses(
        (status = 200, description = "List of tree categories", body = Vec<TreeCategory>),
    ),
))]
pub async fn list_tree_categories(
    State(cached): State<CachedStore>,
) -> ApiResult<Json<Vec<TreeCategory>>> {
    Ok(Json(cached.tree_category_list().await?))
}

/// GET /tree-categories/{id} - Get tree category by ID
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/tree-categories/{id}",
    tag = "Tree Categories",
    params(("id" = i64, Path, description = "Tree category ID")),
    responses(
        (status = 200, description = "Tree category details", body = TreeCategory),
        (status = 404, description = "Tree category not found", body = ApiError),
    ),
))]
pub async fn get_tree_category(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<TreeCategory>> {
    Ok(Json(cached.tree_category_get(id).await?))
}

/// POST /tree-categories - Create a new tree category
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/tree-categories",
    tag = "Tree Categories",
    request_body = TreeCategoryRequest,
    responses(
        (status = 201, description = "Tree category created successfully", body = TreeCategory),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Category name already in use", body = ApiError),
    ),
))]
pub async fn create_tree_category(
    State(cached): State<CachedStore>,
    ApiJson(req): ApiJson<TreeCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let category = cached.tree_category_create(&req).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /tree-categories/{id} - Rename a tree category
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/tree-categories/{id}",
    tag = "Tree Categories",
    params(("id" = i64, Path, description = "Tree category ID")),
    request_body = TreeCategoryRequest,
    responses(
        (status = 200, description = "Tree category updated successfully", body = TreeCategory),
        (status = 404, description = "Tree category not found", body = ApiError),
        (status = 409, description = "Category name already in use", body = ApiError),
    ),
))]
pub async fn update_tree_category(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
    ApiJson(req): ApiJson<TreeCategoryRequest>,
) -> ApiResult<Json<TreeCategory>> {
    req.validate()?;
    Ok(Json(cached.tree_category_update(id, &req).await?))
}

/// DELETE /tree-categories/{id} - Delete an unused tree category
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/tree-categories/{id}",
    tag = "Tree Categories",
    params(("id" = i64, Path, description = "Tree category ID")),
    responses(
        (status = 200, description = "Tree category deleted successfully", body = MessageResponse),
        (status = 400, description = "Category still used by trees", body = ApiError),
        (status = 404, description = "Tree category not found", body = ApiError),
    ),
))]
pub async fn delete_tree_category(
    State(cached): State<CachedStore>,
    PathId(id): PathId,
) -> ApiResult<Json<MessageResponse>> {
    cached.tree_category_delete(id).await?;
    Ok(Json(MessageResponse::deleted(EntityType::TreeCategory)))
}

pub fn create_router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/",
            axum::routing::get(list_tree_categories).post(create_tree_category),
        )
        .route(
            "/:id",
            axum::routing::get(get_tree_category)
                .put(update_tree_category)
                .delete(delete_tree_category),
        )
}

//! Request extractors that reject with `ApiError` bodies.
//!
//! Axum's stock `Path` and `Json` extractors answer bad input with plain-text
//! rejections. These wrappers keep every 4xx response in the JSON error
//! shape.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Json, Path, Request},
    http::request::Parts,
};
use carbon_core::{parse_entity_id, EntityId};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Positive numeric entity id taken from the `:id` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub EntityId);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_input(format!("Invalid path parameter: {}", e)))?;

        let id = parse_entity_id(&raw)
            .map_err(|_| ApiError::invalid_format("id", "a positive integer"))?;
        Ok(PathId(id))
    }
}

/// JSON request body.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::invalid_input(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))),
        }
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use carbon_api::{create_api_router, ApiConfig, AppState};
use carbon_storage::{CacheBackend, CacheConfig, InMemoryCacheBackend, InMemoryStore};
use serde_json::Value;
use tower::ServiceExt;

/// Router over an in-memory store, plus handles to both sides of the cache.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub backend: Arc<dyn CacheBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_backend(Arc::new(InMemoryCacheBackend::new()))
    }

    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_config(backend, ApiConfig::default())
    }

    pub fn with_config(backend: Arc<dyn CacheBackend>, api_config: ApiConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(
            store.clone(),
            Arc::clone(&backend),
            &CacheConfig::default(),
        );
        Self {
            router: create_api_router(state, &api_config),
            store,
            backend,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body.to_string())).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Send a raw body, for payloads that are not valid JSON.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("request builds");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is JSON")
        };
        (status, json)
    }
}

//! API Layer - HTTP access to the sales engine

pub mod rest;

use std::sync::Arc;
use axum::{Router, routing::get, Extension, Json};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;

use crate::engine::SalesEngine;

pub const HOME_MESSAGE: &str = "E-commerce AI Agent is running";

/// Create the main API router
pub fn router(engine: Arc<SalesEngine>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .merge(rest::routes())
        .layer(Extension(engine))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": HOME_MESSAGE }))
}

async fn health_check() -> &'static str {
    "OK"
}

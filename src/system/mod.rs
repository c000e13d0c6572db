//! System-level routes

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    Json(json!({ "greeting": "Hello world" }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Creates system routes
#[tracing::instrument(name = "create_system_router")]
pub fn create_system_router() -> Router {
    tracing::info!("Creating system router");

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

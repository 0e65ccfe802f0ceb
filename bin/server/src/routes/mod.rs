//! HTTP routes.
//!
//! - `GET /` and `GET /health`: liveness
//! - `/conversations`: conversation CRUD and paginated listing
//! - `/tasks/{task_id}`: background task polling

pub mod conversations;
pub mod tasks;

use crate::middleware::request_tracing;
use crate::state::AppState;
use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/{conversation_id}",
            get(conversations::get)
                .put(conversations::update)
                .delete(conversations::delete),
        )
        .route("/tasks/{task_id}", get(tasks::status))
        .layer(axum::middleware::from_fn(request_tracing))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Conversation service is running" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

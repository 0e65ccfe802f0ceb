//! Background task polling.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use convo_core::TaskId;
use serde_json::{Value, json};
use std::sync::Arc;

/// `GET /tasks/{task_id}`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = task_id
        .parse::<TaskId>()
        .ok()
        .and_then(|id| state.tasks.get(id))
        .ok_or_else(|| ApiError::not_found("Task not found"))?;

    Ok(Json(json!({
        "task_id": task.id,
        "status": task.status,
        "result": task.result,
        "created_at": task.created_at,
        "updated_at": task.updated_at,
    })))
}

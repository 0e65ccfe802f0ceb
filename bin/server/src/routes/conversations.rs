//! Conversation handlers.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use convo_conversation::{ConversationId, ConversationPage, ServiceError};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

const BASE_PATH: &str = "/conversations";

#[derive(Debug, Default, Deserialize)]
pub struct CreateParams {
    /// Run the creation as a background task and answer 202.
    #[serde(default)]
    pub background: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// `POST /conversations`
pub async fn create(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CreateParams>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let Json(body) = body?;

    if params.background {
        return Ok(create_in_background(&state, body));
    }

    let id = state.conversations.create_conversation(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "convo_id": id,
            "detail": "Conversation created successfully",
        })),
    )
        .into_response())
}

fn create_in_background(state: &AppState, body: Value) -> Response {
    let conversations = state.conversations.clone();
    let task_id = state.tasks.spawn(async move {
        match conversations.create_conversation(&body).await {
            Ok(id) => Ok(json!({
                "convo_id": id,
                "detail": "Conversation created successfully",
            })),
            Err(report) => Err(failure(report.current_context())),
        }
    });

    let status_url = format!("/tasks/{task_id}");
    (
        StatusCode::ACCEPTED,
        [(header::LOCATION, status_url.clone())],
        Json(json!({
            "task_id": task_id,
            "status": "in_progress",
            "status_url": status_url,
        })),
    )
        .into_response()
}

fn failure(err: &ServiceError) -> Value {
    json!({
        "status_code": err.status_code(),
        "detail": err.to_string(),
    })
}

/// `GET /conversations?page=&limit=`
pub async fn list(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(state.pagination.default_limit);

    let listing = state.conversations.list_conversations(page, limit).await?;
    Ok(Json(page_body(&listing)))
}

fn page_body(listing: &ConversationPage) -> Value {
    let link = |page: u64| format!("{BASE_PATH}?page={page}&limit={}", listing.limit);
    json!({
        "detail": listing.items,
        "pagination": {
            "page": listing.page,
            "limit": listing.limit,
            "total": listing.total,
            "total_pages": listing.total_pages,
        },
        "links": {
            "self": link(listing.page),
            "next": listing.has_next().then(|| link(listing.page + 1)),
            "prev": listing.has_prev().then(|| link(listing.page - 1)),
        },
    })
}

/// `GET /conversations/{conversation_id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let conversation = state.conversations.get_conversation(id).await?;
    Ok(Json(json!({ "detail": conversation })))
}

/// `PUT /conversations/{conversation_id}`
pub async fn update(
    State(state): State<Arc<AppState>>,
    id: Result<Path<ConversationId>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    state.conversations.update_conversation(id, &body).await?;
    Ok(Json(json!({ "detail": "Conversation updated successfully" })))
}

/// `DELETE /conversations/{conversation_id}`
pub async fn delete(
    State(state): State<Arc<AppState>>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id?;
    state.conversations.delete_conversation(id).await?;
    Ok(Json(json!({ "detail": "Conversation deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_conversation::{Conversation, PageRequest};

    fn listing(page: u64, limit: u64, total: u64) -> ConversationPage {
        let request = PageRequest::new(page, limit).expect("valid page");
        ConversationPage::new(Vec::<Conversation>::new(), request, total)
    }

    #[test]
    fn middle_page_links_both_ways() {
        let body = page_body(&listing(2, 5, 12));
        assert_eq!(body["links"]["self"], "/conversations?page=2&limit=5");
        assert_eq!(body["links"]["next"], "/conversations?page=3&limit=5");
        assert_eq!(body["links"]["prev"], "/conversations?page=1&limit=5");
        assert_eq!(body["pagination"]["total_pages"], 3);
    }

    #[test]
    fn edge_pages_omit_links() {
        let first = page_body(&listing(1, 10, 4));
        assert!(first["links"]["next"].is_null());
        assert!(first["links"]["prev"].is_null());
    }

    #[test]
    fn failure_carries_status() {
        let body = failure(&ServiceError::InvalidPayload {
            reason: "name must not be blank".to_string(),
        });
        assert_eq!(body["status_code"], 400);
    }
}

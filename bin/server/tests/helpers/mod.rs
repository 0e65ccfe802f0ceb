//! Shared helpers for HTTP tests against the in-memory backend.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use convo_server::{
    AppState,
    config::ServerConfig,
    factory::{MEMORY, ServiceFactory},
    router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Builds a router over a fresh in-memory conversations table.
pub fn test_app() -> Router {
    let config = ServerConfig {
        data_service: MEMORY.to_string(),
        ..ServerConfig::default()
    };
    let conversations = ServiceFactory::new(&config)
        .conversation_service()
        .expect("build memory conversation service");
    router(Arc::new(AppState::new(conversations, config.pagination)))
}

/// A decoded test response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Sends one request through the router.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("build request");

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> TestResponse {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> TestResponse {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::DELETE, uri, None).await
}

/// A valid conversation body.
pub fn conversation(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "participants": ["John Doe", "CurrentUser"],
        "messages": [
            {"text": "Hey, how are you?", "sender": "CurrentUser", "timestamp": "10:00 AM"},
            {"text": "Good, thanks!", "sender": "John Doe", "timestamp": "10:01 AM"}
        ],
        "isGroup": false
    })
}

//! Error types for server operations.
//!
//! `ApiError` is the single error type handlers return. It renders as a
//! `{"detail": "..."}` JSON body with the status code carried by the
//! underlying service error or extractor rejection.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use convo_conversation::ServiceError;
use rootcause::Report;
use serde_json::json;
use std::fmt;

/// An error rendered to HTTP clients.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    /// Creates an error with an explicit status.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// 404 with the given detail.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl From<Report<ServiceError>> for ApiError {
    fn from(report: Report<ServiceError>) -> Self {
        let err = report.current_context();
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if err.is_internal() {
            tracing::error!(error = %err, "conversation service failure");
        } else {
            tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
        }
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Errors from the service factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    /// No constructor is registered under the name.
    UnknownService { name: String, available: Vec<String> },
    /// The constructor ran but could not build the service.
    ConstructionFailed { name: String, details: String },
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownService { name, available } => write!(
                f,
                "Service {name} is not supported (available: {})",
                available.join(", ")
            ),
            Self::ConstructionFailed { name, details } => {
                write!(f, "failed to construct service {name}: {details}")
            }
        }
    }
}

impl std::error::Error for FactoryError {}

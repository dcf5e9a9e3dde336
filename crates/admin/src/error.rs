//! Unified error handling with Sentry integration.
//!
//! All route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before responding; clients only see a generic message
//! for those.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use plateful_core::order::FieldError;

use crate::db::RepositoryError;
use crate::push::PushError;
use crate::services::TransitionFailure;

/// Application-level error type for the admin.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order status change rejected or failed.
    #[error(transparent)]
    Transition(#[from] TransitionFailure),

    /// Push delivery or device bookkeeping failed.
    #[error("Push error: {0}")]
    Push(#[from] PushError),

    /// Request body failed validation.
    #[error("Invalid input")]
    Validation(Vec<FieldError>),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Vec<FieldError>> for AppError {
    fn from(fields: Vec<FieldError>) -> Self {
        Self::Validation(fields)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(e) | Self::Push(PushError::Store(e)) => repository_status(e),
            Self::Transition(TransitionFailure::NotFound) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Transition(TransitionFailure::Invalid(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Transition(TransitionFailure::Conflict(_)) => StatusCode::CONFLICT,
            Self::Transition(TransitionFailure::Store(e)) => repository_status(e),
            Self::Push(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Validation(fields) => json!({
                "error": self.to_string(),
                "fields": fields,
            }),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                json!({ "error": "Internal server error" })
            }
            Self::Push(_) if status.is_server_error() => {
                json!({ "error": "Push service unavailable" })
            }
            Self::Database(RepositoryError::NotFound)
            | Self::Push(PushError::Store(RepositoryError::NotFound)) => {
                json!({ "error": "Not found" })
            }
            Self::Database(RepositoryError::Conflict(msg))
            | Self::Transition(TransitionFailure::Conflict(msg)) => json!({
                "error": msg,
                "code": "conflict",
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

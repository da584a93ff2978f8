//! Error types for feedback-intake HTTP handlers
//!
//! Provider failures never reach this layer; they are absorbed by the
//! enrichment orchestrator. What remains is client errors, unknown ids and
//! infrastructure failures.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::intake::SubmissionError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown feedback id (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Malformed request body or parameters (422)
    #[error("Unprocessable request: {0}")]
    Unprocessable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// feedback-common error
    #[error("Common error: {0}")]
    Common(#[from] feedback_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Common(feedback_common::Error::Database(e))
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        // A vanished record during merge is an invariant violation, not a 404
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(_) | ApiError::Common(feedback_common::Error::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "not_found".to_string())
            }
            ApiError::Unprocessable(msg)
            | ApiError::Common(feedback_common::Error::InvalidInput(msg)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, msg)
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error".to_string())
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Error types for Content Service
///
/// This module defines all error types that can occur in the content-service.
/// Errors are converted to appropriate HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Result type for content-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Input rejected before any write happened
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown or already expired resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller identity missing
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {}", kind, id))
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Storage details stay in the logs.
        let error_msg = match self {
            AppError::Storage(detail) => {
                tracing::error!(error = %detail, "storage failure");
                "Storage failure".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal failure");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

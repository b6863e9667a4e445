//! Error types for Bibliotheca server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Whether error bodies include the `debug` field. Set once at startup.
static EXPOSE_DEBUG: OnceCell<bool> = OnceCell::new();

/// Enable or disable debug details in error responses (disabled in production)
pub fn set_expose_debug(expose: bool) {
    let _ = EXPOSE_DEBUG.set(expose);
}

fn expose_debug() -> bool {
    EXPOSE_DEBUG.get().copied().unwrap_or(false)
}

/// Stable numeric error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    Duplicate = 6,
    CopyNotAvailable = 7,
    Forbidden = 8,
    BusinessRule = 9,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] validator::ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Copy not available: {0}")]
    CopyNotAvailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

/// Error response body
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    pub code: u32,
    pub message: String,
    /// Structured details (field validation errors, ...)
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    /// Debug rendering of the error, omitted in production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

// Postgres SQLSTATE codes
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl AppError {
    fn status_and_body(&self, with_debug: bool) -> (StatusCode, ErrorResponse) {
        let mut details = None;

        let (status, code, message) = match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::InvalidInput(errors) => {
                details = serde_json::to_value(errors).ok();
                (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::BadValue,
                    "Invalid input".to_string(),
                )
            }
            AppError::Database(e) => match e.as_database_error().and_then(|d| d.code()) {
                Some(code) if code == UNIQUE_VIOLATION => (
                    StatusCode::CONFLICT,
                    ErrorCode::Duplicate,
                    "Resource already exists".to_string(),
                ),
                Some(code) if code == FOREIGN_KEY_VIOLATION => (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::BadValue,
                    "Referenced resource does not exist".to_string(),
                ),
                _ => {
                    tracing::error!("Database error: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::DbFailure,
                        "Database error".to_string(),
                    )
                }
            },
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::CopyNotAvailable(msg) => {
                (StatusCode::CONFLICT, ErrorCode::CopyNotAvailable, msg.clone())
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::BusinessRule,
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            success: false,
            code: code as u32,
            message,
            details,
            debug: with_debug.then(|| format!("{:?}", self)),
        };

        (status, body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body(expose_debug());
        (status, Json(body)).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

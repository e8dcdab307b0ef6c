//! Error types for the edge service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::retry::OperationError;

// == App Error Enum ==
/// Error returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials missing or rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is known but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Write conflicts with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream data service kept failing
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<OperationError> for AppError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::Validation(msg) => AppError::InvalidRequest(msg),
            OperationError::NotFound(msg) => AppError::NotFound(msg),
            OperationError::Unauthorized(msg) => AppError::Unauthorized(msg),
            OperationError::Forbidden(msg) => AppError::Forbidden(msg),
            OperationError::Conflict(msg) | OperationError::Duplicate(msg) => {
                AppError::Conflict(msg)
            }
            OperationError::Transient(msg) | OperationError::Unavailable(msg) => {
                AppError::Unavailable(msg)
            }
        }
    }
}

// == Config Error ==
/// Rejected configuration value.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// == Result Type Alias ==
/// Convenience Result type for handlers.
pub type Result<T> = std::result::Result<T, AppError>;

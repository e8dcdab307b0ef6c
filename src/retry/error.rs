//! Operation errors and retry classification.

use thiserror::Error;

/// Substrings that mark a free-form error message as terminal.
const NON_RETRYABLE_MARKERS: &[&str] = &[
    "validation",
    "invalid",
    "not found",
    "unauthorized",
    "forbidden",
    "conflict",
    "duplicate",
    "unique constraint",
];

// == Retryable ==
/// Classifies an error as transient (worth another attempt) or terminal.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

// == Operation Error ==
/// Failure of a call into an external data service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Network blip, timeout, dropped connection
    #[error("transient failure: {0}")]
    Transient(String),

    /// Remote service unavailable or overloaded
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl OperationError {
    /// Classifies an untyped error by its message.
    ///
    /// Matching is case-insensitive. Anything that does not look terminal
    /// is treated as transient.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        let marker = NON_RETRYABLE_MARKERS
            .iter()
            .find(|marker| lowered.contains(**marker));

        match marker.copied() {
            Some("validation") | Some("invalid") => Self::Validation(message),
            Some("not found") => Self::NotFound(message),
            Some("unauthorized") => Self::Unauthorized(message),
            Some("forbidden") => Self::Forbidden(message),
            Some("conflict") => Self::Conflict(message),
            Some("duplicate") | Some("unique constraint") => Self::Duplicate(message),
            _ => Self::Transient(message),
        }
    }
}

impl Retryable for OperationError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Unavailable(_))
    }
}

impl Retryable for anyhow::Error {
    fn is_retryable(&self) -> bool {
        match self.downcast_ref::<OperationError>() {
            Some(err) => err.is_retryable(),
            None => OperationError::from_message(self.to_string()).is_retryable(),
        }
    }
}

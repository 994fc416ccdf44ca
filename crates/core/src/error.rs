//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic failures raised before anything is sent to the backend.
///
/// Transport failures and backend rejections are not domain errors; the infra
/// layer has its own types for those.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Operator input failed validation; the message names the field.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Blank or malformed identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The caller acted on a snapshot that is no longer current.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Whether the operator can fix this by correcting the form.
    pub fn is_input_error(&self) -> bool {
        matches!(self, DomainError::Validation(_) | DomainError::InvalidId(_))
    }
}

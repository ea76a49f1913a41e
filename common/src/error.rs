//! Error types for the Durian settlement service.

use crate::{OfframpRequestId, OfframpStatus};
use thiserror::Error;

/// Main error type for offramp operations.
#[derive(Error, Debug)]
pub enum DurianError {
    /// Invalid request content.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
    },

    /// Amount is zero, negative, or not a number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Caller is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Offramp request not found.
    #[error("Offramp request not found: {0}")]
    OfframpNotFound(OfframpRequestId),

    /// Invalid state transition.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: OfframpStatus,
        to: OfframpStatus,
    },

    /// The record changed between read and conditional write.
    #[error("Offramp request {0} was modified concurrently")]
    ConcurrentModification(OfframpRequestId),

    /// Database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DurianError {
    /// Check if the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DurianError::ConcurrentModification(_) | DurianError::DatabaseError(_)
        )
    }

    /// Get a stable error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            DurianError::InvalidRequest { .. } => "INVALID_REQUEST",
            DurianError::InvalidAmount(_) => "INVALID_AMOUNT",
            DurianError::Forbidden(_) => "FORBIDDEN",
            DurianError::OfframpNotFound(_) => "OFFRAMP_NOT_FOUND",
            DurianError::InvalidTransition { .. } => "INVALID_TRANSITION",
            DurianError::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            DurianError::DatabaseError(_) => "DATABASE_ERROR",
            DurianError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            DurianError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for Durian operations.
pub type Result<T> = std::result::Result<T, DurianError>;

//! FX engine error types.

use durian_common::Currency;
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Amount is zero, negative, or not a number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A provider answered with a rate that is not a positive number.
    #[error("Invalid rate from {provider}: {reason}")]
    InvalidRate { provider: String, reason: String },

    /// Every provider in the chain failed.
    #[error("Rate not available from any provider")]
    RateNotAvailable,

    /// No rate providers configured.
    #[error("No rate providers available")]
    NoProvidersAvailable,

    /// Provider request failed (network, status code, or body).
    #[error("Rate provider {provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    /// Currency mismatch in conversion.
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: Currency, actual: Currency },
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;

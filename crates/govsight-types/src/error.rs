//! Shared error types for the GovSight system.

use crate::retrieval::SourceTier;
use thiserror::Error;

/// Top-level error type for the GovSight system.
#[derive(Error, Debug)]
pub enum GovsightError {
    /// The fact store could not be opened or queried.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A subject or attribute normalized to an empty string.
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    /// A retrieval adapter failed for this query.
    #[error("Adapter unavailable ({tier}): {reason}")]
    AdapterUnavailable {
        /// The tier whose adapter failed.
        tier: SourceTier,
        /// Why it failed.
        reason: String,
    },

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid user input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GovsightError {
    /// Shorthand for an [`GovsightError::AdapterUnavailable`] error.
    pub fn adapter(tier: SourceTier, reason: impl Into<String>) -> Self {
        Self::AdapterUnavailable {
            tier,
            reason: reason.into(),
        }
    }
}

/// Alias for Result with GovsightError.
pub type GovsightResult<T> = Result<T, GovsightError>;

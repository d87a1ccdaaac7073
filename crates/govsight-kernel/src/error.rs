//! Kernel-specific error types.

use govsight_types::error::GovsightError;
use thiserror::Error;

/// Kernel error type wrapping GovsightError.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A wrapped GovsightError.
    #[error(transparent)]
    Govsight(#[from] GovsightError),

    /// Text could not be parsed as a fact statement.
    #[error("Could not parse statement: {0}")]
    Unparseable(String),
}

/// Alias for kernel results.
pub type KernelResult<T> = Result<T, KernelError>;

//! Error types for fundamentals operations.
//!
//! This module defines [`DataError`] which covers the failures that abort a
//! reconciliation run: upstream fetch failures and persistence failures.
//! Absent concepts, malformed observations and unresolved provenance are not
//! errors and never surface here.

use thiserror::Error;

/// Errors that can occur while fetching, extracting or persisting fundamentals.
#[derive(Error, Debug)]
pub enum DataError {
    /// The registry has no record for the requested entity.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure, timeout, rate limiting or an upstream 5xx response.
    ///
    /// The caller may retry.
    #[error("Transient upstream error: {0}")]
    Transient(String),

    /// The upstream payload could not be decoded into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No registry identifier is known for the ticker symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Error reading from or writing to the metric store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested feature is not supported by this collaborator.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl DataError {
    /// Returns true if retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

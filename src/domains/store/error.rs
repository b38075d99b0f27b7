//! Store-specific error types.

use thiserror::Error;

/// Errors raised by the configuration store or the target database.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No configuration record matches the requested name.
    #[error("Configuration record not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error.
    #[error("Store operation failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "unavailable" error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a new "operation failed" error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Error kind reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundError",
            Self::Unavailable(_) => "StoreUnavailableError",
            Self::Operation(_) => "ExecutionError",
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

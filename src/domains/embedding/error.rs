//! Embedding-specific error types.

use thiserror::Error;

/// Errors raised while turning text into a vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmbeddingError {
    /// No embedding endpoint is configured.
    #[error("No embedding provider configured (set MCP_EMBEDDING_URL)")]
    NotConfigured,

    /// The request failed or the provider answered with an error status.
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The provider answered with something that is not a vector.
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

impl EmbeddingError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

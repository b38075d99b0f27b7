//! Embedding domain module.
//!
//! Vector search needs the query text as a vector of the same dimension as
//! the target index. The provider is external; a dimension mismatch is
//! reported by the database, not checked here.

mod error;
mod http;

use async_trait::async_trait;

pub use error::EmbeddingError;
pub use http::{EmbeddingFormat, HttpEmbedder};

/// Turns query text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

//! Embedding/vector-store errors. Batch-scoped failures are non-fatal to
//! an index run; the pipeline degrades to graph-only retrieval.

use thiserror::Error;

pub type EmbedResult<T> = Result<T, EmbedError>;

#[derive(Debug, Error)]
pub enum EmbedError {
    /// Embedding provider failure (HTTP, decode, wrong dimension).
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Qdrant transport or server failure.
    #[error("vector store error: {0}")]
    Qdrant(String),

    /// Bad local configuration (vector length mismatch, empty endpoint).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
}

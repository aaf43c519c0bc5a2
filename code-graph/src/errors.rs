//! Crate error type. The graph itself is pure in-memory state, so the only
//! failure mode is snapshot (de)serialization.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GraphResult<T> = Result<T, GraphError>;

/// Root error type for the code-graph crate.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Snapshot JSON encode/decode failure.
    #[error("snapshot serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

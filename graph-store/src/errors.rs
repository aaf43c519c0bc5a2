//! Storage errors. Fatal to the operation that hit them; the indexer and
//! orchestrator surface them upward instead of absorbing.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored blob decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

//! Indexer errors. Only storage and snapshot problems abort an index run;
//! everything else is absorbed with a warning.

use thiserror::Error;

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] graph_store::StoreError),

    #[error(transparent)]
    Snapshot(#[from] code_graph::GraphError),

    #[error("io error under {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

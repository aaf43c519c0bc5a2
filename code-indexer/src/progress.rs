//! Best-effort progress streaming.
//!
//! Events flow over a `tokio::sync::broadcast` channel: with no
//! subscriber connected a send simply drops the event instead of
//! buffering, and a subscriber joining mid-index only sees what comes
//! after it joined.

use serde::Serialize;
use tokio::sync::broadcast;

/// Progress event shapes emitted during indexing.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum IndexProgress {
    Parsing {
        file: String,
        progress: usize,
        total: usize,
    },
    Embedding {
        symbol_count: usize,
        progress: usize,
        total: usize,
    },
    Done {
        symbol_count: usize,
        edge_count: usize,
        duration_ms: u128,
    },
    Error {
        message: String,
    },
}

/// Sending side handed to the indexer; clone freely.
#[derive(Clone)]
pub struct ProgressSink {
    tx: broadcast::Sender<IndexProgress>,
}

impl ProgressSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IndexProgress> {
        self.tx.subscribe()
    }

    /// Fire and forget; a send with zero receivers is not an error.
    pub fn emit(&self, event: IndexProgress) {
        let _ = self.tx.send(event);
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new(256)
    }
}

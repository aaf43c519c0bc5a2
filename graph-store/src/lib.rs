//! Durable SQLite persistence for the review core.
//!
//! One database holds everything a (repo, branch) accumulates:
//! - `symbols` / `edges` rows mirroring the in-memory graph;
//! - `graph_snapshots` blobs for fast graph reload;
//! - `symbol_embeddings` vectors keyed (symbol_id, repo_id, branch);
//! - `reviews`, `review_comments` (with optional embedding) and
//!   `review_feedback` for the RAG example retrieval.
//!
//! Every write is an upsert keyed the same way the indexer re-triggers
//! work, so a crashed operation can simply run again. File-level replace
//! (delete + insert) happens inside one transaction.

pub mod errors;
pub mod records;
pub mod store;

mod schema;

pub use errors::{StoreError, StoreResult};
pub use records::{FeedbackSignal, RatedComment, ReviewCommentRecord, ReviewRecord};
pub use store::GraphStore;

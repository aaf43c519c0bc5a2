//! Indexing pipeline: parse -> graph -> storage -> embeddings -> snapshot.
//!
//! Two entry points on [`Indexer`]:
//! - `full_index(root)` walks the working tree, extracts every supported
//!   file, resolves names once, persists rows, embeds symbols in batches
//!   of 32 and writes the graph snapshot;
//! - `incremental_update(root, paths)` removes each changed file from the
//!   graph and storage, re-parses survivors, resolves once per batch,
//!   re-embeds only the affected symbols and rewrites the snapshot.
//!
//! Failure policy: a parse problem skips one file, an embedding failure
//! skips one batch (the review pipeline degrades gracefully), a storage
//! error aborts the operation and surfaces upward. Progress events stream
//! over a best-effort broadcast channel: no subscriber, no buffering.

pub mod errors;
pub mod fs_scan;
pub mod indexer;
pub mod progress;

pub use errors::{IndexError, IndexResult};
pub use fs_scan::{ScannedFile, scan_source_files};
pub use indexer::{Indexer, embedding_text};
pub use progress::{IndexProgress, ProgressSink};

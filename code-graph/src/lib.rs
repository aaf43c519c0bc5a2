//! Per-repository symbol dependency graph.
//!
//! The graph is the in-memory heart of the review pipeline:
//! - symbols keyed by `"<file_path>:<qualified_name>"` ids;
//! - directed edges (calls/imports/inherits/implements/uses/overrides)
//!   stored as two owned adjacency maps, no back-references;
//! - bounded BFS for caller/callee queries and blast-radius scoring;
//! - per-file removal for incremental re-indexing;
//! - a JSON snapshot sufficient to rebuild every index on load.
//!
//! Call edges arrive from the extractors with a **bare callee name**;
//! [`SymbolGraph::resolve_names`] expands them against the name index once
//! per indexing batch. Unresolvable edges are discarded at that point.

pub mod errors;
pub mod graph;
pub mod snapshot;
pub mod types;

pub use errors::{GraphError, GraphResult};
pub use graph::SymbolGraph;
pub use snapshot::GraphSnapshot;
pub use types::{BlastRadius, Edge, EdgeKind, EdgeTarget, ResolvedEdge, Symbol, SymbolKind};

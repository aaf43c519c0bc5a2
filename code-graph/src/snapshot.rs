//! Durable JSON snapshot of a symbol graph.
//!
//! A snapshot stores the sorted symbol list plus the extraction-edge
//! journal. Adjacency and the name/file indices are derived state and are
//! rebuilt on restore, so the format stays small and byte-stable: the same
//! graph always serializes to the same bytes.

use serde::{Deserialize, Serialize};

use crate::errors::GraphResult;
use crate::graph::SymbolGraph;
use crate::types::{Edge, Symbol};

/// Serialized form of one (repo, branch) graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub symbols: Vec<Symbol>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Capture the current graph state in deterministic order.
    pub fn capture(graph: &SymbolGraph) -> Self {
        Self {
            symbols: graph.sorted_symbols(),
            edges: graph.journal_edges(),
        }
    }

    /// Serialize to the stored blob form.
    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored blob.
    pub fn from_json(data: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Rebuild a graph with every index restored and names resolved.
    pub fn restore(self) -> SymbolGraph {
        let mut graph = SymbolGraph::new();
        for symbol in self.symbols {
            graph.add_symbol(symbol);
        }
        for edge in self.edges {
            graph.add_edge(edge);
        }
        graph.resolve_names();
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, EdgeKind, EdgeTarget, SymbolKind};

    fn sym(file: &str, name: &str) -> Symbol {
        Symbol {
            id: Symbol::make_id(file, name),
            file_path: file.to_string(),
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind: SymbolKind::Function,
            signature: format!("def {name}()"),
            body_range: (1, 3),
            doc_comment: Some("docs".into()),
            repo_id: "r".into(),
            branch: "main".into(),
        }
    }

    #[test]
    fn round_trip_is_lossless() {
        let mut g = SymbolGraph::new();
        let a = sym("pkg/a.py", "alpha");
        let b = sym("pkg/b.py", "beta");
        g.add_symbol(a.clone());
        g.add_symbol(b.clone());
        g.add_edge(Edge::new(
            a.id.clone(),
            EdgeTarget::Name("beta".into()),
            EdgeKind::Calls,
        ));
        g.resolve_names();

        let snap = GraphSnapshot::capture(&g);
        let json = snap.to_json().unwrap();
        let restored = GraphSnapshot::from_json(&json).unwrap().restore();

        assert_eq!(GraphSnapshot::capture(&restored), snap);
        assert_eq!(restored.symbol_count(), 2);
        assert_eq!(restored.edge_count(), 1);
        assert_eq!(restored.get_callees(&a.id, 1)[0].id, b.id);

        // Same graph, same bytes.
        let json2 = GraphSnapshot::capture(&restored).to_json().unwrap();
        assert_eq!(json, json2);
    }
}

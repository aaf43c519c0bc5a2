//! Graph data model shared by the extractors, the indexer and the retriever.
//!
//! Field names serialize in camelCase so snapshots and provider payloads
//! stay compatible with the host-facing JSON the rest of the system speaks.
//! Avoid renaming variants: kinds are part of persisted snapshots.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Kind of a named declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Const,
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use SymbolKind::*;
        let s = match self {
            Function => "function",
            Method => "method",
            Class => "class",
            Interface => "interface",
            Type => "type",
            Const => "const",
        };
        f.write_str(s)
    }
}

/// Directed relation between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    Imports,
    Inherits,
    Implements,
    Uses,
    Overrides,
}

impl Display for EdgeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use EdgeKind::*;
        let s = match self {
            Calls => "calls",
            Imports => "imports",
            Inherits => "inherits",
            Implements => "implements",
            Uses => "uses",
            Overrides => "overrides",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use SymbolKind::*;
        match s {
            "function" => Ok(Function),
            "method" => Ok(Method),
            "class" => Ok(Class),
            "interface" => Ok(Interface),
            "type" => Ok(Type),
            "const" => Ok(Const),
            other => Err(format!("unknown symbol kind: {other}")),
        }
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use EdgeKind::*;
        match s {
            "calls" => Ok(Calls),
            "imports" => Ok(Imports),
            "inherits" => Ok(Inherits),
            "implements" => Ok(Implements),
            "uses" => Ok(Uses),
            "overrides" => Ok(Overrides),
            other => Err(format!("unknown edge kind: {other}")),
        }
    }
}

/// A named declaration with a stable id.
///
/// `id` is always `"<file_path>:<qualified_name>"` and stays identical
/// across re-parses of the same unchanged declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: String,
    /// Repo-relative path, forward slashes, no leading slash.
    pub file_path: String,
    /// Bare identifier (`login`).
    pub name: String,
    /// Dotted form (`AuthService.login`).
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// Single-line human-readable declaration.
    pub signature: String,
    /// Inclusive `[start_line, end_line]`, 1-indexed.
    pub body_range: (u32, u32),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_comment: Option<String>,
    pub repo_id: String,
    pub branch: String,
}

impl Symbol {
    /// Canonical id for a declaration inside a file.
    pub fn make_id(file_path: &str, qualified_name: &str) -> String {
        format!("{file_path}:{qualified_name}")
    }
}

/// Edge destination as produced by the extractors.
///
/// Language-agnostic extractors cannot resolve arbitrary references, so a
/// call site is captured as the bare callee name and resolved against the
/// graph's name index later. Import/inherit targets that are known paths
/// may be emitted as ids directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeTarget {
    /// Unresolved bare identifier, e.g. the callee name at a call site.
    Name(String),
    /// A concrete symbol id.
    Id(String),
}

impl EdgeTarget {
    pub fn as_str(&self) -> &str {
        match self {
            EdgeTarget::Name(s) | EdgeTarget::Id(s) => s,
        }
    }
}

/// Extraction-time edge. `to` may still be a bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: EdgeTarget,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: EdgeTarget, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to,
            kind,
        }
    }
}

/// Fully resolved edge: both endpoints are symbol ids present in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResolvedEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Callers of a set of changed symbols, with their files and a risk score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastRadius {
    /// Symbols one inbound hop away from any changed symbol.
    pub direct_callers: Vec<Symbol>,
    /// Symbols within two inbound hops but not direct.
    pub transitive_callers: Vec<Symbol>,
    /// Deduplicated union of the two caller sets' file paths.
    pub affected_files: Vec<String>,
    /// 0..=100; see [`BlastRadius::score`].
    pub risk_score: u32,
}

impl BlastRadius {
    /// `min(100, 10·|direct| + 5·|files|)`, amplified by 1.5 when the
    /// change fans out across more than five files (still capped at 100).
    pub fn score(direct: usize, affected_files: usize) -> u32 {
        let base = (10 * direct + 5 * affected_files).min(100) as f64;
        let scaled = if affected_files > 5 { base * 1.5 } else { base };
        scaled.min(100.0) as u32
    }
}

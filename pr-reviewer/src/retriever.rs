//! Review-context assembly from a raw unified diff.
//!
//! Pipeline: changed paths from the diff headers -> changed symbols by
//! file path (no file contents are read) -> callers/callees via bounded
//! BFS -> blast radius -> (deep only) semantic neighbours re-ranked by
//! graph distance -> feedback-rated prior examples via RAG over stored
//! comments. Every stage degrades to empty on missing inputs; a review
//! without a graph is just a flat-diff review.

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use code_graph::{BlastRadius, Symbol, SymbolGraph};
use embed_store::{EmbeddingAdapter, math};
use graph_store::{FeedbackSignal, GraphStore, RatedComment};

use crate::feedback::strip_feedback_artifacts;

/// Analysis depth selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDepth {
    Fast,
    Standard,
    Deep,
}

impl ReviewDepth {
    /// Caller BFS hops for this depth.
    pub fn hops(&self) -> i32 {
        match self {
            Self::Fast => 1,
            Self::Standard | Self::Deep => 2,
        }
    }
}

/// Everything the prompt builder gets from the graph side.
#[derive(Debug, Clone, Default)]
pub struct ReviewContext {
    pub changed_symbols: Vec<Symbol>,
    pub callers: Vec<Symbol>,
    pub callees: Vec<Symbol>,
    pub blast_radius: BlastRadius,
    pub semantic_neighbors: Vec<Symbol>,
    pub prior_examples: Vec<String>,
    pub rejected_examples: Vec<String>,
}

impl ReviewContext {
    pub fn is_empty(&self) -> bool {
        self.changed_symbols.is_empty()
    }
}

/// Semantic-neighbour candidates returned by the vector index.
const NEIGHBOR_TOP_K: usize = 10;
/// Survivors kept after graph-distance re-ranking.
const NEIGHBOR_KEEP: usize = 5;
/// Graph distance assigned when no path exists within two hops.
const NEIGHBOR_DISTANCE_CAP: usize = 3;
/// Diff prefix embedded for prior-example retrieval.
const EXAMPLE_QUERY_CHARS: usize = 8_000;
const ACCEPTED_EXAMPLES: usize = 5;
const REJECTED_EXAMPLES: usize = 3;

/// Builds review contexts for one (repo, branch).
pub struct Retriever {
    graph: Arc<RwLock<SymbolGraph>>,
    store: GraphStore,
    embedder: Option<EmbeddingAdapter>,
    repo_id: String,
}

impl Retriever {
    pub fn new(
        graph: Arc<RwLock<SymbolGraph>>,
        store: GraphStore,
        embedder: Option<EmbeddingAdapter>,
        repo_id: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            store,
            embedder,
            repo_id: repo_id.into(),
        }
    }

    /// Assemble the full context bundle for a raw unified diff.
    pub async fn build_context(&self, raw_diff: &str, depth: ReviewDepth) -> ReviewContext {
        let changed_paths = changed_paths_from_diff(raw_diff);
        let hops = depth.hops();

        let graph = self.graph.read().await;

        let mut changed_symbols: Vec<Symbol> = Vec::new();
        for path in &changed_paths {
            for symbol in graph.symbols_in_file(path) {
                changed_symbols.push(symbol.clone());
            }
        }
        let changed_ids: Vec<String> = changed_symbols.iter().map(|s| s.id.clone()).collect();

        let mut callers: Vec<Symbol> = Vec::new();
        let mut seen_callers: HashSet<String> = HashSet::new();
        let mut callees: Vec<Symbol> = Vec::new();
        let mut seen_callees: HashSet<String> = HashSet::new();
        for id in &changed_ids {
            for caller in graph.get_callers(id, hops) {
                if seen_callers.insert(caller.id.clone()) {
                    callers.push(caller.clone());
                }
            }
            for callee in graph.get_callees(id, 1) {
                if seen_callees.insert(callee.id.clone()) {
                    callees.push(callee.clone());
                }
            }
        }

        let blast_radius = graph.get_blast_radius(&changed_ids);

        // Deep mode only: vector search re-ranked by graph distance.
        let semantic_neighbors = if depth == ReviewDepth::Deep && !changed_symbols.is_empty() {
            self.semantic_neighbors(&graph, &changed_symbols, &seen_callers, &seen_callees)
                .await
        } else {
            Vec::new()
        };

        drop(graph);

        let (prior_examples, rejected_examples) = self.rated_examples(raw_diff).await;

        debug!(
            "retriever: changed={} callers={} callees={} neighbors={} examples={}/{}",
            changed_symbols.len(),
            callers.len(),
            callees.len(),
            semantic_neighbors.len(),
            prior_examples.len(),
            rejected_examples.len(),
        );

        ReviewContext {
            changed_symbols,
            callers,
            callees,
            blast_radius,
            semantic_neighbors,
            prior_examples,
            rejected_examples,
        }
    }

    /// Embed the changed signatures, mean-pool into one query, search the
    /// repo's vectors and re-rank by `sim * 1/(graph_distance+1)`.
    async fn semantic_neighbors(
        &self,
        graph: &SymbolGraph,
        changed: &[Symbol],
        caller_ids: &HashSet<String>,
        callee_ids: &HashSet<String>,
    ) -> Vec<Symbol> {
        let Some(embedder) = &self.embedder else {
            return Vec::new();
        };

        let texts: Vec<String> = changed
            .iter()
            .map(|s| match &s.doc_comment {
                Some(doc) => format!("{} {}", s.signature, doc),
                None => s.signature.clone(),
            })
            .collect();

        let vectors = match embedder.embed(&texts).await {
            Ok(v) => v,
            Err(e) => {
                warn!("retriever: neighbour embedding failed, degrading: {}", e);
                return Vec::new();
            }
        };
        let mut query = math::mean_pool(&vectors);
        if query.is_empty() {
            return Vec::new();
        }
        math::normalize(&mut query);

        let hits = match embedder.search(query, &self.repo_id, NEIGHBOR_TOP_K).await {
            Ok(h) => h,
            Err(e) => {
                warn!("retriever: vector search failed, degrading: {}", e);
                return Vec::new();
            }
        };

        let changed_ids: HashSet<&str> = changed.iter().map(|s| s.id.as_str()).collect();
        let mut ranked: Vec<(f32, Symbol)> = Vec::new();
        for hit in hits {
            if changed_ids.contains(hit.symbol_id.as_str())
                || caller_ids.contains(&hit.symbol_id)
                || callee_ids.contains(&hit.symbol_id)
            {
                continue;
            }
            let Some(symbol) = graph.symbol(&hit.symbol_id) else {
                continue;
            };
            let distance = changed_ids
                .iter()
                .filter_map(|id| {
                    graph.undirected_distance(id, &hit.symbol_id, NEIGHBOR_DISTANCE_CAP - 1)
                })
                .min()
                .unwrap_or(NEIGHBOR_DISTANCE_CAP);
            let score = hit.score * (1.0 / (distance as f32 + 1.0));
            ranked.push((score, symbol.clone()));
        }

        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked
            .into_iter()
            .take(NEIGHBOR_KEEP)
            .map(|(_, s)| s)
            .collect()
    }

    /// Top accepted and rejected prior comments by similarity to the diff.
    async fn rated_examples(&self, raw_diff: &str) -> (Vec<String>, Vec<String>) {
        let Some(embedder) = &self.embedder else {
            return (Vec::new(), Vec::new());
        };
        let rated = match self.store.load_rated_comments(&self.repo_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("retriever: rated-comment load failed, degrading: {}", e);
                return (Vec::new(), Vec::new());
            }
        };
        if rated.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let query_text: String = raw_diff.chars().take(EXAMPLE_QUERY_CHARS).collect();
        let query = match embedder.embed(&[query_text]).await {
            Ok(mut v) if !v.is_empty() => v.remove(0),
            _ => return (Vec::new(), Vec::new()),
        };

        let rank = |signal: FeedbackSignal, keep: usize| -> Vec<String> {
            let mut scored: Vec<(f32, &RatedComment)> = rated
                .iter()
                .filter(|c| c.signal == signal)
                .filter_map(|c| {
                    let emb = c.embedding.as_ref()?;
                    Some((math::cosine(&query, emb), c))
                })
                .collect();
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
            scored
                .into_iter()
                .take(keep)
                .map(|(_, c)| strip_feedback_artifacts(&c.body))
                .collect()
        };

        (
            rank(FeedbackSignal::Accepted, ACCEPTED_EXAMPLES),
            rank(FeedbackSignal::Rejected, REJECTED_EXAMPLES),
        )
    }
}

lazy_static! {
    static ref NEW_PATH: Regex = Regex::new(r"(?m)^\+\+\+ b/(.+)$").expect("static regex");
    static ref OLD_PATH: Regex = Regex::new(r"(?m)^--- a/(.+)$").expect("static regex");
}

/// Changed file paths from the `--- a/...` / `+++ b/...` header pairs.
/// Deletions (`+++ /dev/null`) fall back to the old-side path.
pub fn changed_paths_from_diff(raw_diff: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for cap in NEW_PATH.captures_iter(raw_diff) {
        let path = cap[1].trim().to_string();
        if seen.insert(path.clone()) {
            out.push(path);
        }
    }
    // Old-side headers cover deletions where the +++ side is /dev/null.
    for cap in OLD_PATH.captures_iter(raw_diff) {
        let path = cap[1].trim().to_string();
        if seen.insert(path.clone()) {
            out.push(path);
        }
    }
    out
}

/// Serialize the context into the prompt's "Codebase Context" section,
/// one line per symbol. The section is intentionally compact.
pub fn render_context(ctx: &ReviewContext) -> String {
    if ctx.is_empty() {
        return String::new();
    }

    fn lines(symbols: &[Symbol], cap: usize) -> String {
        symbols
            .iter()
            .take(cap)
            .map(|s| format!("- `{}` ({}): `{}`", s.qualified_name, s.kind, s.signature))
            .collect::<Vec<_>>()
            .join("\n")
    }

    let mut out = String::from("## Codebase Context\n");

    out.push_str("\n### Changed Symbols\n");
    out.push_str(&lines(&ctx.changed_symbols, 20));

    let br = &ctx.blast_radius;
    out.push_str(&format!(
        "\n\n### Blast Radius\nRisk score: {}/100. {} direct callers, {} transitive, {} affected files.\n",
        br.risk_score,
        br.direct_callers.len(),
        br.transitive_callers.len(),
        br.affected_files.len(),
    ));

    if !br.direct_callers.is_empty() {
        out.push_str("\n### Direct Callers (1 hop)\n");
        out.push_str(&lines(&br.direct_callers, 10));
        out.push('\n');
    }
    if !br.transitive_callers.is_empty() {
        out.push_str("\n### Transitive Callers (2 hops)\n");
        out.push_str(&lines(&br.transitive_callers, 10));
        out.push('\n');
    }
    if !ctx.callees.is_empty() {
        out.push_str("\n### Callees\n");
        out.push_str(&lines(&ctx.callees, 10));
        out.push('\n');
    }
    if !ctx.semantic_neighbors.is_empty() {
        out.push_str("\n### Semantic Neighbors\n");
        out.push_str(&lines(&ctx.semantic_neighbors, NEIGHBOR_KEEP));
        out.push('\n');
    }
    if !ctx.prior_examples.is_empty() {
        out.push_str("\n### Examples your team found helpful\n");
        for example in &ctx.prior_examples {
            out.push_str(&format!("> {}\n", example.replace('\n', "\n> ")));
        }
    }
    if !ctx.rejected_examples.is_empty() {
        out.push_str("\n### Examples your team found NOT helpful\n");
        for example in &ctx.rejected_examples {
            out.push_str(&format!("> {}\n", example.replace('\n', "\n> ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_graph::{Edge, EdgeKind, EdgeTarget, SymbolKind};

    fn sym(file: &str, name: &str) -> Symbol {
        Symbol {
            id: Symbol::make_id(file, name),
            file_path: file.into(),
            name: name.into(),
            qualified_name: name.into(),
            kind: SymbolKind::Function,
            signature: format!("function {name}()"),
            body_range: (1, 3),
            doc_comment: None,
            repo_id: "r".into(),
            branch: "main".into(),
        }
    }

    fn retriever_with(graph: SymbolGraph) -> Retriever {
        Retriever::new(
            Arc::new(RwLock::new(graph)),
            GraphStore::in_memory().unwrap(),
            None,
            "r",
        )
    }

    #[test]
    fn changed_paths_cover_edits_and_deletions() {
        let diff = "\
--- a/src/a.ts
+++ b/src/a.ts
@@ -1 +1 @@
-x
+y
--- a/src/gone.ts
+++ /dev/null
@@ -1 +0,0 @@
-dead
";
        let paths = changed_paths_from_diff(diff);
        assert_eq!(paths, vec!["src/a.ts".to_string(), "src/gone.ts".to_string()]);
    }

    #[tokio::test]
    async fn fast_depth_stays_within_one_hop() {
        let mut graph = SymbolGraph::new();
        let a = sym("src/a.ts", "a");
        let b = sym("src/b.ts", "b");
        let c = sym("src/c.ts", "c");
        for s in [&a, &b, &c] {
            graph.add_symbol(s.clone());
        }
        // c -> b -> a
        graph.add_edge(Edge::new(
            b.id.clone(),
            EdgeTarget::Name("a".into()),
            EdgeKind::Calls,
        ));
        graph.add_edge(Edge::new(
            c.id.clone(),
            EdgeTarget::Name("b".into()),
            EdgeKind::Calls,
        ));
        graph.resolve_names();

        let retriever = retriever_with(graph);
        let diff = "--- a/src/a.ts\n+++ b/src/a.ts\n@@ -1 +1 @@\n-x\n+y\n";

        let fast = retriever.build_context(diff, ReviewDepth::Fast).await;
        let fast_callers: Vec<&str> = fast.callers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(fast_callers, vec!["b"]);

        let standard = retriever.build_context(diff, ReviewDepth::Standard).await;
        let std_callers: std::collections::HashSet<&str> =
            standard.callers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(std_callers, std::collections::HashSet::from(["b", "c"]));
    }

    #[tokio::test]
    async fn missing_graph_yields_empty_context() {
        let retriever = retriever_with(SymbolGraph::new());
        let ctx = retriever
            .build_context("--- a/src/a.ts\n+++ b/src/a.ts\n", ReviewDepth::Deep)
            .await;
        assert!(ctx.is_empty());
        assert!(render_context(&ctx).is_empty());
    }

    #[tokio::test]
    async fn context_renders_the_expected_sections() {
        let mut graph = SymbolGraph::new();
        let a = sym("src/a.ts", "a");
        let b = sym("src/b.ts", "b");
        graph.add_symbol(a.clone());
        graph.add_symbol(b.clone());
        graph.add_edge(Edge::new(
            b.id.clone(),
            EdgeTarget::Name("a".into()),
            EdgeKind::Calls,
        ));
        graph.resolve_names();

        let retriever = retriever_with(graph);
        let ctx = retriever
            .build_context(
                "--- a/src/a.ts\n+++ b/src/a.ts\n@@ -1 +1 @@\n-x\n+y\n",
                ReviewDepth::Standard,
            )
            .await;
        let rendered = render_context(&ctx);
        assert!(rendered.contains("## Codebase Context"));
        assert!(rendered.contains("### Changed Symbols"));
        assert!(rendered.contains("Risk score:"));
        assert!(rendered.contains("### Direct Callers (1 hop)"));
    }
}

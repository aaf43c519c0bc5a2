//! Full and incremental indexing over one (repo, branch) graph.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use code_graph::{GraphSnapshot, Symbol, SymbolGraph};
use code_parsers::registry::{FileOrigin, ParserRegistry};
use embed_store::EmbeddingAdapter;
use graph_store::GraphStore;

use crate::errors::IndexResult;
use crate::fs_scan::scan_source_files;
use crate::progress::{IndexProgress, ProgressSink};

/// Embedding batch size.
const EMBED_BATCH: usize = 32;

/// Compact, high-signal text embedded per symbol: kind, qualified name,
/// signature and the first doc line.
pub fn embedding_text(symbol: &Symbol) -> String {
    let mut text = format!(
        "{} | {} | {}",
        symbol.kind, symbol.qualified_name, symbol.signature
    );
    if let Some(doc) = &symbol.doc_comment {
        if let Some(first) = doc.lines().next() {
            text.push_str("\nDoc: ");
            text.push_str(first);
        }
    }
    text
}

/// Drives parse -> graph mutation -> storage -> embedding -> snapshot for
/// one (repo, branch).
pub struct Indexer {
    registry: Arc<ParserRegistry>,
    graph: Arc<RwLock<SymbolGraph>>,
    store: GraphStore,
    embedder: Option<EmbeddingAdapter>,
    progress: ProgressSink,
    origin: FileOrigin,
}

impl Indexer {
    pub fn new(
        registry: Arc<ParserRegistry>,
        graph: Arc<RwLock<SymbolGraph>>,
        store: GraphStore,
        embedder: Option<EmbeddingAdapter>,
        progress: ProgressSink,
        repo_id: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            graph,
            store,
            embedder,
            progress,
            origin: FileOrigin {
                repo_id: repo_id.into(),
                branch: branch.into(),
            },
        }
    }

    pub fn progress(&self) -> &ProgressSink {
        &self.progress
    }

    /// Index the whole working tree under `root`.
    pub async fn full_index(&self, root: &Path) -> IndexResult<()> {
        let t0 = Instant::now();
        let files = scan_source_files(root);
        let total = files.len();
        info!(
            "index: full start repo={} branch={} files={}",
            self.origin.repo_id, self.origin.branch, total
        );

        let mut all_symbols: Vec<Symbol> = Vec::new();
        let mut all_edges = Vec::new();

        for (i, file) in files.iter().enumerate() {
            match tokio::fs::read(&file.abs_path).await {
                Ok(bytes) => match self.registry.parse(&file.rel_path, &bytes, &self.origin) {
                    Ok((symbols, edges)) => {
                        let mut graph = self.graph.write().await;
                        for s in &symbols {
                            graph.add_symbol(s.clone());
                        }
                        for e in &edges {
                            graph.add_edge(e.clone());
                        }
                        drop(graph);
                        all_symbols.extend(symbols);
                        all_edges.extend(edges);
                    }
                    Err(e) => warn!("index: skipping {}: {}", file.rel_path, e),
                },
                Err(e) => warn!("index: unreadable {}: {}", file.rel_path, e),
            }
            self.progress.emit(IndexProgress::Parsing {
                file: file.rel_path.clone(),
                progress: i + 1,
                total,
            });
        }

        self.graph.write().await.resolve_names();

        self.store.upsert_symbols(&all_symbols).await?;
        self.store
            .upsert_edges(&self.origin.repo_id, &self.origin.branch, &all_edges)
            .await?;

        self.embed_symbols(&all_symbols).await?;
        self.write_snapshot().await?;

        let (symbol_count, edge_count) = {
            let graph = self.graph.read().await;
            (graph.symbol_count(), graph.edge_count())
        };
        let duration_ms = t0.elapsed().as_millis();
        info!(
            "index: full done symbols={} edges={} in {} ms",
            symbol_count, edge_count, duration_ms
        );
        self.progress.emit(IndexProgress::Done {
            symbol_count,
            edge_count,
            duration_ms,
        });
        Ok(())
    }

    /// Re-index only `changed_paths` (repo-relative). Files that no longer
    /// exist in the working tree are just removed.
    pub async fn incremental_update(
        &self,
        root: &Path,
        changed_paths: &[String],
    ) -> IndexResult<()> {
        let t0 = Instant::now();
        let total = changed_paths.len();
        info!(
            "index: incremental start repo={} branch={} files={}",
            self.origin.repo_id, self.origin.branch, total
        );

        let mut affected_symbols: Vec<Symbol> = Vec::new();

        for (i, rel_path) in changed_paths.iter().enumerate() {
            let old_ids: Vec<String> = {
                let graph = self.graph.read().await;
                graph
                    .symbols_in_file(rel_path)
                    .iter()
                    .map(|s| s.id.clone())
                    .collect()
            };

            self.graph.write().await.remove_file(rel_path);
            self.store
                .delete_file_rows(&self.origin.repo_id, &self.origin.branch, rel_path)
                .await?;
            if let Some(embedder) = &self.embedder {
                if let Err(e) = embedder
                    .delete_symbols(&self.origin.repo_id, &old_ids)
                    .await
                {
                    warn!("index: stale vector cleanup failed for {}: {}", rel_path, e);
                }
            }

            let abs = root.join(rel_path);
            if abs.is_file() && self.registry.supports(rel_path) {
                match tokio::fs::read(&abs).await {
                    Ok(bytes) => match self.registry.parse(rel_path, &bytes, &self.origin) {
                        Ok((symbols, edges)) => {
                            {
                                let mut graph = self.graph.write().await;
                                for s in &symbols {
                                    graph.add_symbol(s.clone());
                                }
                                for e in &edges {
                                    graph.add_edge(e.clone());
                                }
                            }
                            self.store.upsert_symbols(&symbols).await?;
                            self.store
                                .upsert_edges(&self.origin.repo_id, &self.origin.branch, &edges)
                                .await?;
                            affected_symbols.extend(symbols);
                        }
                        Err(e) => warn!("index: skipping {}: {}", rel_path, e),
                    },
                    Err(e) => warn!("index: unreadable {}: {}", rel_path, e),
                }
            } else {
                debug!("index: {} removed from tree", rel_path);
            }

            self.progress.emit(IndexProgress::Parsing {
                file: rel_path.clone(),
                progress: i + 1,
                total,
            });
        }

        self.graph.write().await.resolve_names();
        self.embed_symbols(&affected_symbols).await?;
        self.write_snapshot().await?;

        let (symbol_count, edge_count) = {
            let graph = self.graph.read().await;
            (graph.symbol_count(), graph.edge_count())
        };
        let duration_ms = t0.elapsed().as_millis();
        info!(
            "index: incremental done symbols={} edges={} in {} ms",
            symbol_count, edge_count, duration_ms
        );
        self.progress.emit(IndexProgress::Done {
            symbol_count,
            edge_count,
            duration_ms,
        });
        Ok(())
    }

    /// Embed symbols in batches. Embedding failures skip their batch and
    /// the run continues; storage failures abort.
    async fn embed_symbols(&self, symbols: &[Symbol]) -> IndexResult<()> {
        let Some(embedder) = &self.embedder else {
            return Ok(());
        };
        let total = symbols.len();

        for (batch_index, batch) in symbols.chunks(EMBED_BATCH).enumerate() {
            let texts: Vec<String> = batch.iter().map(embedding_text).collect();
            match embedder.embed(&texts).await {
                Ok(vectors) => {
                    for (symbol, vector) in batch.iter().zip(vectors) {
                        if let Err(e) = embedder
                            .upsert(
                                &symbol.id,
                                &self.origin.repo_id,
                                &self.origin.branch,
                                vector.clone(),
                            )
                            .await
                        {
                            warn!("index: vector upsert failed for {}: {}", symbol.id, e);
                            continue;
                        }
                        self.store
                            .upsert_embedding(
                                &symbol.id,
                                &self.origin.repo_id,
                                &self.origin.branch,
                                &vector,
                            )
                            .await?;
                    }
                }
                Err(e) => {
                    warn!("index: embedding batch {} skipped: {}", batch_index, e);
                }
            }
            self.progress.emit(IndexProgress::Embedding {
                symbol_count: batch.len(),
                progress: (batch_index * EMBED_BATCH + batch.len()).min(total),
                total,
            });
        }
        Ok(())
    }

    async fn write_snapshot(&self) -> IndexResult<()> {
        let json = {
            let graph = self.graph.read().await;
            GraphSnapshot::capture(&graph).to_json()?
        };
        self.store
            .save_snapshot(&self.origin.repo_id, &self.origin.branch, &json)
            .await?;
        Ok(())
    }
}

//! Process-wide cache of live per-(repo, branch) graphs.
//!
//! One entry owns the graph behind an async `RwLock` (any number of BFS
//! readers, one indexing writer), plus the storage and embedding handles
//! the retriever and indexer need. First access restores the durable
//! snapshot; repository deletion evicts and purges.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use code_graph::{GraphSnapshot, SymbolGraph};
use code_indexer::{Indexer, ProgressSink};
use code_parsers::registry::ParserRegistry;
use embed_store::EmbeddingAdapter;
use graph_store::GraphStore;

use crate::errors::ReviewResult;
use crate::retriever::Retriever;

/// Live state for one (repo, branch) pair. Opaque to callers; clone the
/// `Arc` freely.
pub struct RepoGraphHandle {
    pub repo_id: String,
    pub branch: String,
    pub graph: Arc<RwLock<SymbolGraph>>,
    pub store: GraphStore,
    pub embedder: Option<EmbeddingAdapter>,
    progress: ProgressSink,
}

impl RepoGraphHandle {
    /// Retriever bound to this entry's graph and stores.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(
            self.graph.clone(),
            self.store.clone(),
            self.embedder.clone(),
            self.repo_id.clone(),
        )
    }

    /// Indexer bound to this entry. Indexing runs are serialised per
    /// entry by the graph's write lock.
    pub fn indexer(&self, registry: Arc<ParserRegistry>) -> Indexer {
        Indexer::new(
            registry,
            self.graph.clone(),
            self.store.clone(),
            self.embedder.clone(),
            self.progress.clone(),
            self.repo_id.clone(),
            self.branch.clone(),
        )
    }

    pub fn progress(&self) -> &ProgressSink {
        &self.progress
    }
}

/// The cache proper.
pub struct GraphCache {
    store: GraphStore,
    embedder: Option<EmbeddingAdapter>,
    entries: RwLock<HashMap<(String, String), Arc<RepoGraphHandle>>>,
}

impl GraphCache {
    pub fn new(store: GraphStore, embedder: Option<EmbeddingAdapter>) -> Self {
        Self {
            store,
            embedder,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Get the live entry for (repo, branch), restoring the snapshot on
    /// first access. With no snapshot the entry starts empty; the caller
    /// decides whether to trigger a full index.
    pub async fn get_or_load(
        &self,
        repo_id: &str,
        branch: &str,
    ) -> ReviewResult<Arc<RepoGraphHandle>> {
        let key = (repo_id.to_string(), branch.to_string());
        if let Some(entry) = self.entries.read().await.get(&key) {
            return Ok(entry.clone());
        }

        let mut entries = self.entries.write().await;
        // Lost the race: someone else loaded while we waited.
        if let Some(entry) = entries.get(&key) {
            return Ok(entry.clone());
        }

        let graph = match self.store.load_snapshot(repo_id, branch).await? {
            Some(json) => match GraphSnapshot::from_json(&json) {
                Ok(snapshot) => {
                    let graph = snapshot.restore();
                    info!(
                        "cache: restored graph repo={} branch={} symbols={} edges={}",
                        repo_id,
                        branch,
                        graph.symbol_count(),
                        graph.edge_count()
                    );
                    graph
                }
                Err(e) => {
                    warn!(
                        "cache: corrupt snapshot for {}/{}, starting empty: {}",
                        repo_id, branch, e
                    );
                    SymbolGraph::new()
                }
            },
            None => {
                debug!("cache: no snapshot for {}/{}, starting empty", repo_id, branch);
                SymbolGraph::new()
            }
        };

        let entry = Arc::new(RepoGraphHandle {
            repo_id: repo_id.to_string(),
            branch: branch.to_string(),
            graph: Arc::new(RwLock::new(graph)),
            store: self.store.clone(),
            embedder: self.embedder.clone(),
            progress: ProgressSink::default(),
        });
        entries.insert(key, entry.clone());
        Ok(entry)
    }

    /// Evict every branch of a repository and purge its durable state.
    pub async fn evict_repo(&self, repo_id: &str) -> ReviewResult<()> {
        self.entries
            .write()
            .await
            .retain(|(repo, _), _| repo != repo_id);
        self.store.delete_repo(repo_id).await?;
        if let Some(embedder) = &self.embedder {
            if let Err(e) = embedder.delete_repo(repo_id).await {
                warn!("cache: vector purge failed for {}: {}", repo_id, e);
            }
        }
        info!("cache: evicted repo {}", repo_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_graph::{Symbol, SymbolKind};

    fn sym(file: &str, name: &str) -> Symbol {
        Symbol {
            id: Symbol::make_id(file, name),
            file_path: file.into(),
            name: name.into(),
            qualified_name: name.into(),
            kind: SymbolKind::Function,
            signature: format!("fn {name}()"),
            body_range: (1, 2),
            doc_comment: None,
            repo_id: "r".into(),
            branch: "main".into(),
        }
    }

    #[tokio::test]
    async fn first_access_restores_the_snapshot() {
        let store = GraphStore::in_memory().unwrap();
        let mut graph = SymbolGraph::new();
        graph.add_symbol(sym("src/a.ts", "a"));
        let json = GraphSnapshot::capture(&graph).to_json().unwrap();
        store.save_snapshot("r", "main", &json).await.unwrap();

        let cache = GraphCache::new(store, None);
        let entry = cache.get_or_load("r", "main").await.unwrap();
        assert_eq!(entry.graph.read().await.symbol_count(), 1);

        // Second access returns the same live entry.
        let again = cache.get_or_load("r", "main").await.unwrap();
        assert!(Arc::ptr_eq(&entry, &again));
    }

    #[tokio::test]
    async fn eviction_drops_the_entry_and_rows() {
        let store = GraphStore::in_memory().unwrap();
        let cache = GraphCache::new(store.clone(), None);
        let entry = cache.get_or_load("r", "main").await.unwrap();
        entry.graph.write().await.add_symbol(sym("src/a.ts", "a"));
        store.save_snapshot("r", "main", "{}").await.unwrap();

        cache.evict_repo("r").await.unwrap();
        assert!(store.load_snapshot("r", "main").await.unwrap().is_none());
        let fresh = cache.get_or_load("r", "main").await.unwrap();
        assert!(!Arc::ptr_eq(&entry, &fresh));
        assert_eq!(fresh.graph.read().await.symbol_count(), 0);
    }
}

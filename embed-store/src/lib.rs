//! Embedding adapter: Ollama text vectors plus a Qdrant index.
//!
//! The embedding concern stays isolated from parsing and storage:
//! - [`embedder`] turns text batches into dense vectors (and validates
//!   their dimensionality against the configured `dim`);
//! - [`vectors`] owns the per-deployment Qdrant collection: creation,
//!   dimension-drift detection (drop and recreate, never truncate),
//!   keyed upserts and repo-filtered top-K search;
//! - [`math`] has the small pure helpers (mean pooling, unit
//!   normalisation, cosine) the retriever needs.
//!
//! [`EmbeddingAdapter`] bundles the two halves behind the contract the
//! indexer and retriever depend on.

pub mod config;
pub mod embedder;
pub mod errors;
pub mod math;
pub mod vectors;

pub use config::EmbeddingConfig;
pub use errors::{EmbedError, EmbedResult};
pub use vectors::{SymbolHit, VectorStore};

use embedder::OllamaEmbedder;
use tracing::info;

/// The full adapter: embed texts, upsert and search per-repo vectors.
#[derive(Clone)]
pub struct EmbeddingAdapter {
    embedder: OllamaEmbedder,
    vectors: VectorStore,
    dim: usize,
}

impl EmbeddingAdapter {
    /// Connect both halves and make sure the collection matches `dim`.
    ///
    /// Returns `(adapter, recreated)`; `recreated == true` means the
    /// stored vectors were dropped over a dimension change and the caller
    /// must trigger a re-index.
    pub async fn connect(config: EmbeddingConfig) -> EmbedResult<(Self, bool)> {
        let embedder = OllamaEmbedder::new(&config)?;
        let vectors = VectorStore::connect(&config).await?;
        let recreated = vectors.ensure_collection().await?;
        if recreated {
            info!(
                "embeddings: collection recreated for dim={}, re-index required",
                config.dim
            );
        }
        let dim = config.dim;
        Ok((
            Self {
                embedder,
                vectors,
                dim,
            },
            recreated,
        ))
    }

    /// Vector dimension this adapter produces and stores.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a batch of texts. One request per text; a failure fails the
    /// whole batch so the indexer can skip it as a unit.
    pub async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        self.embedder.embed(texts).await
    }

    /// Upsert one symbol vector keyed (symbol_id, repo_id, branch).
    pub async fn upsert(
        &self,
        symbol_id: &str,
        repo_id: &str,
        branch: &str,
        vec: Vec<f32>,
    ) -> EmbedResult<()> {
        self.vectors.upsert(symbol_id, repo_id, branch, vec).await
    }

    /// Top-K nearest symbols within one repository.
    pub async fn search(
        &self,
        query: Vec<f32>,
        repo_id: &str,
        top_k: usize,
    ) -> EmbedResult<Vec<SymbolHit>> {
        self.vectors.search(query, repo_id, top_k).await
    }

    /// Remove stale vectors for symbols that no longer exist.
    pub async fn delete_symbols(&self, repo_id: &str, symbol_ids: &[String]) -> EmbedResult<()> {
        self.vectors.delete_symbols(repo_id, symbol_ids).await
    }

    /// Drop every vector of one repository.
    pub async fn delete_repo(&self, repo_id: &str) -> EmbedResult<()> {
        self.vectors.delete_repo(repo_id).await
    }
}

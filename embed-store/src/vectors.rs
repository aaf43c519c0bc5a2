//! Qdrant collection lifecycle and per-repo vector operations.
//!
//! Point ids must be UUIDs or integers, while our symbol ids are
//! path-derived strings, so every point id is a deterministic UUID v5 of
//! `"<symbol_id>|<repo_id>|<branch>"` and the payload carries the real
//! keys for filtering and readback.

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EmbeddingConfig;
use crate::errors::{EmbedError, EmbedResult};

/// One nearest-neighbour hit.
#[derive(Debug, Clone)]
pub struct SymbolHit {
    pub symbol_id: String,
    pub score: f32,
}

/// Qdrant-backed vector store, cheap to clone.
#[derive(Clone)]
pub struct VectorStore {
    client: std::sync::Arc<Qdrant>,
    collection: String,
    dim: usize,
}

/// Deterministic point id for (symbol, repo, branch).
fn point_id(symbol_id: &str, repo_id: &str, branch: &str) -> String {
    let key = format!("{symbol_id}|{repo_id}|{branch}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

impl VectorStore {
    pub async fn connect(config: &EmbeddingConfig) -> EmbedResult<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| EmbedError::Qdrant(format!("client build: {e}")))?;
        Ok(Self {
            client: std::sync::Arc::new(client),
            collection: config.collection.clone(),
            dim: config.dim,
        })
    }

    /// Create the collection if missing; drop and recreate it when the
    /// stored dimension differs from the configured one. Returns `true`
    /// when existing vectors were dropped (re-index required).
    pub async fn ensure_collection(&self) -> EmbedResult<bool> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| EmbedError::Qdrant(format!("collection_exists: {e}")))?;

        if exists {
            match self.stored_dim().await {
                Some(stored) if stored == self.dim as u64 => return Ok(false),
                stored => {
                    warn!(
                        "embeddings: dimension drift (stored {:?}, configured {}), recreating collection",
                        stored, self.dim
                    );
                    self.client
                        .delete_collection(&self.collection)
                        .await
                        .map_err(|e| EmbedError::Qdrant(format!("delete_collection: {e}")))?;
                }
            }
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(
                    VectorParamsBuilder::new(self.dim as u64, Distance::Cosine),
                ),
            )
            .await
            .map_err(|e| EmbedError::Qdrant(format!("create_collection: {e}")))?;

        Ok(exists)
    }

    /// Vector size recorded in the live collection config, if readable.
    async fn stored_dim(&self) -> Option<u64> {
        use qdrant_client::qdrant::vectors_config::Config;

        let info = self.client.collection_info(&self.collection).await.ok()?;
        let params = info.result?.config?.params?.vectors_config?.config?;
        match params {
            Config::Params(p) => Some(p.size),
            Config::ParamsMap(_) => None,
        }
    }

    pub async fn upsert(
        &self,
        symbol_id: &str,
        repo_id: &str,
        branch: &str,
        vec: Vec<f32>,
    ) -> EmbedResult<()> {
        if vec.len() != self.dim {
            return Err(EmbedError::InvalidConfig(format!(
                "vector length {} != dim {} for {symbol_id}",
                vec.len(),
                self.dim
            )));
        }

        let payload: Payload = json!({
            "symbol_id": symbol_id,
            "repo_id": repo_id,
            "branch": branch,
        })
        .try_into()
        .map_err(|e| EmbedError::Qdrant(format!("payload convert: {e}")))?;

        let point = PointStruct::new(point_id(symbol_id, repo_id, branch), vec, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|e| EmbedError::Qdrant(format!("upsert_points: {e}")))?;
        Ok(())
    }

    /// Cosine top-K restricted to one repository.
    pub async fn search(
        &self,
        query: Vec<f32>,
        repo_id: &str,
        top_k: usize,
    ) -> EmbedResult<Vec<SymbolHit>> {
        if query.len() != self.dim {
            return Err(EmbedError::InvalidConfig(format!(
                "query length {} != dim {}",
                query.len(),
                self.dim
            )));
        }

        let filter = Filter::must([Condition::matches("repo_id", repo_id.to_string())]);
        let resp = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query, top_k as u64)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .map_err(|e| EmbedError::Qdrant(format!("search_points: {e}")))?;

        let hits = resp
            .result
            .into_iter()
            .filter_map(|point| {
                let symbol_id = point
                    .payload
                    .get("symbol_id")
                    .and_then(|v| v.clone().into_json().as_str().map(str::to_owned))?;
                Some(SymbolHit {
                    symbol_id,
                    score: point.score,
                })
            })
            .collect();
        debug!("embeddings: search repo={} k={}", repo_id, top_k);
        Ok(hits)
    }

    /// Delete the vectors of specific symbols within one repository.
    pub async fn delete_symbols(&self, repo_id: &str, symbol_ids: &[String]) -> EmbedResult<()> {
        if symbol_ids.is_empty() {
            return Ok(());
        }
        // Nested should-filter: repo must match and any of the ids may.
        let ids_any = Filter::should(
            symbol_ids
                .iter()
                .map(|id| Condition::matches("symbol_id", id.clone()))
                .collect::<Vec<_>>(),
        );
        let filter = Filter::must([
            Condition::matches("repo_id", repo_id.to_string()),
            Condition::from(ids_any),
        ]);

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(|e| EmbedError::Qdrant(format!("delete_points: {e}")))?;
        Ok(())
    }

    /// Delete every vector of one repository.
    pub async fn delete_repo(&self, repo_id: &str) -> EmbedResult<()> {
        let filter = Filter::must([Condition::matches("repo_id", repo_id.to_string())]);
        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(|e| EmbedError::Qdrant(format!("delete_points: {e}")))?;
        Ok(())
    }
}

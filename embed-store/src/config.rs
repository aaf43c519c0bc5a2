//! Embedding configuration, env-overridable.

use serde::{Deserialize, Serialize};

/// Settings for the embedding provider and the vector collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Ollama base URL.
    pub ollama_url: String,
    /// Embedding model name.
    pub model: String,
    /// Expected vector dimension; a stored collection with a different
    /// dimension is dropped and recreated.
    pub dim: usize,
    /// Qdrant gRPC URL.
    pub qdrant_url: String,
    /// Collection holding every repo's symbol vectors.
    pub collection: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".into(),
            model: "nomic-embed-text".into(),
            dim: 768,
            qdrant_url: "http://localhost:6334".into(),
            collection: "symbol_embeddings".into(),
            timeout_secs: 60,
        }
    }
}

impl EmbeddingConfig {
    /// Defaults overlaid with `OLLAMA_URL`, `EMBEDDING_MODEL`,
    /// `EMBEDDING_DIM`, `QDRANT_URL` and `QDRANT_COLLECTION`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("OLLAMA_URL") {
            cfg.ollama_url = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_MODEL") {
            cfg.model = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_DIM") {
            if let Ok(dim) = v.parse() {
                cfg.dim = dim;
            }
        }
        if let Ok(v) = std::env::var("QDRANT_URL") {
            cfg.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("QDRANT_COLLECTION") {
            cfg.collection = v;
        }
        cfg
    }
}

//! Ollama-based embedder.
//!
//! Calls `POST {endpoint}/api/embeddings` once per text. Sequential on
//! purpose: memory stays flat and error handling stays per-batch; callers
//! needing throughput run batches from separate tasks.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::errors::{EmbedError, EmbedResult};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Thin client over the Ollama embeddings endpoint.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> EmbedResult<Self> {
        let endpoint = config.ollama_url.trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(EmbedError::InvalidConfig("empty ollama url".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::Embedding(format!("http client build: {e}")))?;
        Ok(Self {
            client,
            url: format!("{endpoint}/api/embeddings"),
            model: config.model.clone(),
            dim: config.dim,
        })
    }

    /// Embed a batch of texts in order.
    ///
    /// # Errors
    /// `EmbedError::Embedding` on transport failure, non-200 status, bad
    /// JSON or a vector whose dimension differs from the configured one.
    pub async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let resp = self
                .client
                .post(&self.url)
                .json(&EmbedRequest {
                    model: &self.model,
                    prompt: text,
                })
                .send()
                .await
                .map_err(|e| EmbedError::Embedding(format!("POST {}: {e}", self.url)))?;

            if resp.status() != StatusCode::OK {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_else(|_| "<no body>".into());
                return Err(EmbedError::Embedding(format!(
                    "embeddings endpoint returned {status}: {body}"
                )));
            }

            let parsed: EmbedResponse = resp
                .json()
                .await
                .map_err(|e| EmbedError::Embedding(format!("decode embeddings json: {e}")))?;

            if parsed.embedding.len() != self.dim {
                return Err(EmbedError::Embedding(format!(
                    "embedding dim {} != expected {} (model {})",
                    parsed.embedding.len(),
                    self.dim,
                    self.model
                )));
            }
            out.push(parsed.embedding);
        }
        debug!("embeddings: embedded batch of {}", out.len());
        Ok(out)
    }
}

//! Thin Ollama client for non-streaming generation.
//!
//! `POST {endpoint}/api/generate` with `stream=false`; options map from
//! the shared [`LlmConfig`] (`num_predict` from `max_tokens`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LlmConfig;
use crate::errors::{LlmError, LlmResult};

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Clone)]
pub struct OllamaService {
    client: reqwest::Client,
    config: LlmConfig,
    url: String,
}

impl OllamaService {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let base = config.base_endpoint()?;
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(180));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{base}/api/generate"),
            config,
        })
    }

    /// # Errors
    /// `HttpStatus` for non-2xx, `Transport` for client failures,
    /// `Decode` when the body is not the expected non-streaming shape.
    #[instrument(skip_all, fields(model = %self.config.model))]
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        };

        debug!("POST {}", self.url);
        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status,
                url: self.url.clone(),
                snippet: text.chars().take(240).collect(),
            });
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(format!("{e}; is stream=false honoured?")))?;

        if out.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(out.response)
    }
}

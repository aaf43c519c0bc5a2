//! Client for OpenAI-compatible chat-completions servers.
//!
//! The whole review prompt travels as a single user message; the output
//! format lives in the prompt itself, so no system message is split out
//! here.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::LlmConfig;
use crate::errors::{LlmError, LlmResult};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Clone)]
pub struct OpenAiService {
    client: reqwest::Client,
    config: LlmConfig,
    url: String,
}

impl OpenAiService {
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        let base = config.base_endpoint()?;
        let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(LlmError::InvalidConfig(
                "api_key required for openai-compatible provider".into(),
            ));
        };

        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| LlmError::InvalidConfig("api_key has invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(180));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url: format!("{base}/v1/chat/completions"),
            config,
        })
    }

    /// # Errors
    /// `HttpStatus` for non-2xx, `Transport` for client failures,
    /// `Decode`/`EmptyResponse` for malformed or empty choices.
    #[instrument(skip_all, fields(model = %self.config.model))]
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
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

        let out: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let content = out
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }
}

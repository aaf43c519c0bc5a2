//! Provider selection and model configuration.

use serde::{Deserialize, Serialize};

/// Which backend serves the generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    /// Any server speaking the OpenAI chat-completions protocol.
    OpenAiCompatible,
}

/// Configuration for one model invocation target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model identifier, e.g. `"qwen3:14b"` or `"gpt-4o-mini"`.
    pub model: String,
    /// Base endpoint; paths are appended per provider.
    pub endpoint: String,
    /// API key where the provider requires one.
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: "qwen3:14b".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: Some(4_096),
            temperature: Some(0.2),
            timeout_secs: Some(180),
        }
    }
}

impl LlmConfig {
    /// Defaults overlaid with `LLM_PROVIDER`, `LLM_MODEL`, `LLM_ENDPOINT`,
    /// `LLM_API_KEY`, `LLM_MAX_TOKENS` and `LLM_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("LLM_PROVIDER") {
            if v.eq_ignore_ascii_case("openai") || v.eq_ignore_ascii_case("openai_compatible") {
                cfg.provider = LlmProvider::OpenAiCompatible;
            }
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            cfg.model = v;
        }
        if let Ok(v) = std::env::var("LLM_ENDPOINT") {
            cfg.endpoint = v;
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            if !v.is_empty() {
                cfg.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse() {
                cfg.max_tokens = Some(n);
            }
        }
        if let Ok(v) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                cfg.timeout_secs = Some(n);
            }
        }
        cfg
    }

    /// Validated, slash-trimmed endpoint.
    pub(crate) fn base_endpoint(&self) -> Result<String, crate::errors::LlmError> {
        let endpoint = self.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(crate::errors::LlmError::InvalidConfig(format!(
                "endpoint must be http(s): {:?}",
                self.endpoint
            )));
        }
        Ok(endpoint.to_string())
    }
}

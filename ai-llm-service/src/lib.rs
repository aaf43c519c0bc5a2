//! LLM backend used by the review orchestrator.
//!
//! One contract: `generate(prompt) -> String`. Two providers implement
//! it, dispatched over a plain enum (no `async-trait`, no boxed trait
//! objects):
//! - **Ollama** via `POST {endpoint}/api/generate` with `stream=false`;
//! - **OpenAI-compatible** servers via `POST {endpoint}/v1/chat/completions`.
//!
//! Errors are typed and fatal to the single review that hit them; the
//! orchestrator logs and exits that task.

pub mod config;
pub mod errors;
pub mod services;

pub use config::{LlmConfig, LlmProvider};
pub use errors::{LlmError, LlmResult};

use services::ollama::OllamaService;
use services::openai::OpenAiService;

/// Provider-dispatched client.
#[derive(Clone)]
pub enum LlmClient {
    Ollama(OllamaService),
    OpenAi(OpenAiService),
}

impl LlmClient {
    /// Build the concrete service for the configured provider.
    ///
    /// # Errors
    /// `LlmError::InvalidConfig` for an empty or non-HTTP endpoint, or a
    /// missing API key where the provider requires one.
    pub fn from_config(config: LlmConfig) -> LlmResult<Self> {
        match config.provider {
            LlmProvider::Ollama => Ok(Self::Ollama(OllamaService::new(config)?)),
            LlmProvider::OpenAiCompatible => Ok(Self::OpenAi(OpenAiService::new(config)?)),
        }
    }

    /// Run one generation with the full prompt.
    pub async fn generate(&self, prompt: &str) -> LlmResult<String> {
        match self {
            Self::Ollama(svc) => svc.generate(prompt).await,
            Self::OpenAi(svc) => svc.generate(prompt).await,
        }
    }
}

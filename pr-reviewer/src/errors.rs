//! Crate-wide error hierarchy.
//!
//! Goals:
//! - single root `Error` for all public functions;
//! - provider-aware HTTP mapping (401 -> Unauthorized, 429 -> RateLimited,
//!   5xx -> Server, ...);
//! - `?` ergonomics via `From` impls, no dynamic dispatch.
//!
//! Soft conditions (hallucinated paths, bad line numbers, malformed
//! checkpoints) never become errors; they are absorbed with warnings in
//! the policy layer.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ReviewResult<T> = Result<T, Error>;

/// Root error type for the pr-reviewer crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Host (GitLab/GitHub) related failure.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// LLM backend failure; fatal to the one review that hit it.
    #[error(transparent)]
    Llm(#[from] ai_llm_service::LlmError),

    /// Storage failure; fatal to the current operation.
    #[error(transparent)]
    Store(#[from] graph_store::StoreError),

    /// Indexing failure surfaced through the cache.
    #[error(transparent)]
    Index(#[from] code_indexer::IndexError),

    /// Snapshot decode failure while loading a cached graph.
    #[error(transparent)]
    Graph(#[from] code_graph::GraphError),

    /// Configuration problems (missing token, bad base URL).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input validation (bad PR ids, unsupported flavors).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Provider-specific error with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("server error: status {0}")]
    Server(u16),

    #[error("http status error: {0}")]
    HttpStatus(u16),

    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration and setup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing provider token")]
    MissingToken,

    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ProviderError::Unauthorized,
                403 => ProviderError::Forbidden,
                404 => ProviderError::NotFound,
                429 => ProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ProviderError::Server(code),
                _ => ProviderError::HttpStatus(code),
            };
        }
        ProviderError::Network(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Provider(ProviderError::from(e))
    }
}

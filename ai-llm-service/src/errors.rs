//! Unified error type for both providers.

use reqwest::StatusCode;
use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Bad local configuration (endpoint, missing API key).
    #[error("invalid llm config: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connect, timeout, TLS).
    #[error("llm transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status from the provider.
    #[error("llm returned {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Response body did not match the expected shape.
    #[error("llm response decode error: {0}")]
    Decode(String),

    /// The provider answered but produced no usable text.
    #[error("llm produced an empty response")]
    EmptyResponse,
}

//! Parser crate errors. Extraction itself is total; only registry
//! construction and language lookup can fail.

use thiserror::Error;

pub type ParserResult<T> = Result<T, ParserError>;

#[derive(Debug, Error)]
pub enum ParserError {
    /// Grammar failed to load (ABI mismatch or similar). The registry
    /// downgrades this to a warning and skips the language.
    #[error("grammar load failed for {language}: {reason}")]
    GrammarLoad { language: String, reason: String },

    /// File extension is not mapped to any supported language.
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),
}

//! Deterministic multi-language symbol and edge extraction.
//!
//! One Tree-sitter extractor per supported language (TypeScript/JavaScript,
//! Python, Java, C#, Go), all behind [`ParserRegistry`]:
//! - `parse(file_path, bytes)` is **total**: syntax errors yield a partial
//!   result, never an error, and no I/O happens inside a parser;
//! - the same bytes always produce the same symbols and edges;
//! - call sites are captured as **bare callee names**; the graph resolves
//!   them against its name index later;
//! - a grammar that fails to load disables only that language (warned once
//!   at registry construction), everything else keeps operating.

pub mod errors;
pub mod languages;
pub mod paths;
pub mod registry;

pub use errors::{ParserError, ParserResult};
pub use registry::{FileOrigin, Language, ParserRegistry};

//! Language registry: extension mapping, grammar lifecycle, dispatch.
//!
//! Grammars load once at construction. A load failure (ABI mismatch,
//! broken build of one grammar crate) disables that language with a
//! warning and leaves the rest operational. A fresh `Parser` is created
//! per call; profiling never showed it worth pooling.

use std::collections::HashMap;

use tracing::warn;
use tree_sitter::Parser;

use code_graph::{Edge, Symbol};

use crate::errors::{ParserError, ParserResult};
use crate::languages;

/// Supported source languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
    Java,
    CSharp,
    Go,
}

impl Language {
    /// Map a file path to its language by extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?;
        match ext {
            "ts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "jsx" => Some(Self::JavaScript),
            "py" => Some(Self::Python),
            "java" => Some(Self::Java),
            "cs" => Some(Self::CSharp),
            "go" => Some(Self::Go),
            _ => None,
        }
    }

    /// Extensions the indexer should pick up.
    pub const EXTENSIONS: &'static [&'static str] =
        &["ts", "tsx", "js", "jsx", "py", "java", "cs", "go"];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Python => "python",
            Self::Java => "java",
            Self::CSharp => "csharp",
            Self::Go => "go",
        }
    }

    fn grammar(&self) -> tree_sitter::Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Java => tree_sitter_java::LANGUAGE.into(),
            Self::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
            Self::Go => tree_sitter_go::LANGUAGE.into(),
        }
    }

    const ALL: &'static [Language] = &[
        Language::TypeScript,
        Language::Tsx,
        Language::JavaScript,
        Language::Python,
        Language::Java,
        Language::CSharp,
        Language::Go,
    ];
}

/// Repo coordinates stamped onto every extracted symbol.
#[derive(Debug, Clone)]
pub struct FileOrigin {
    pub repo_id: String,
    pub branch: String,
}

/// Holds the loaded grammars and dispatches extraction.
pub struct ParserRegistry {
    grammars: HashMap<Language, tree_sitter::Language>,
}

impl ParserRegistry {
    /// Load every grammar, skipping (with a warning) any that fails a
    /// smoke `set_language` check.
    pub fn new() -> Self {
        let mut grammars = HashMap::new();
        for lang in Language::ALL {
            let grammar = lang.grammar();
            let mut probe = Parser::new();
            match probe.set_language(&grammar) {
                Ok(()) => {
                    grammars.insert(*lang, grammar);
                }
                Err(e) => {
                    warn!(
                        "parsers: grammar for {} failed to load, language disabled: {}",
                        lang.name(),
                        e
                    );
                }
            }
        }
        Self { grammars }
    }

    /// True when the file maps to a language whose grammar loaded.
    pub fn supports(&self, path: &str) -> bool {
        Language::from_path(path)
            .map(|l| self.grammars.contains_key(&l))
            .unwrap_or(false)
    }

    /// Extract symbols and edges from one file.
    ///
    /// Total with respect to input bytes: invalid UTF-8 is replaced
    /// lossily, syntax errors produce whatever Tree-sitter could still
    /// recognise, and an empty result is a valid outcome. Never reads the
    /// filesystem.
    ///
    /// # Errors
    /// Only for files whose extension maps to no (loaded) language.
    pub fn parse(
        &self,
        file_path: &str,
        bytes: &[u8],
        origin: &FileOrigin,
    ) -> ParserResult<(Vec<Symbol>, Vec<Edge>)> {
        let lang = Language::from_path(file_path)
            .ok_or_else(|| ParserError::UnsupportedFile(file_path.to_string()))?;
        let grammar = self
            .grammars
            .get(&lang)
            .ok_or_else(|| ParserError::GrammarLoad {
                language: lang.name().to_string(),
                reason: "grammar disabled at startup".to_string(),
            })?;

        let code = String::from_utf8_lossy(bytes);

        let mut parser = Parser::new();
        if parser.set_language(grammar).is_err() {
            // Probed fine at startup; treat a late failure like a syntax
            // error and return a partial (empty) result.
            warn!("parsers: set_language failed late for {}", lang.name());
            return Ok((Vec::new(), Vec::new()));
        }

        let Some(tree) = parser.parse(code.as_ref(), None) else {
            warn!("parsers: tree-sitter returned no tree for {}", file_path);
            return Ok((Vec::new(), Vec::new()));
        };

        let ctx = languages::FileCtx {
            code: code.as_ref(),
            file_path,
            repo_id: &origin.repo_id,
            branch: &origin.branch,
        };

        Ok(match lang {
            Language::TypeScript | Language::Tsx | Language::JavaScript => {
                languages::typescript::extract(&tree, &ctx)
            }
            Language::Python => languages::python::extract(&tree, &ctx),
            Language::Java => languages::java::extract(&tree, &ctx),
            Language::CSharp => languages::csharp::extract(&tree, &ctx),
            Language::Go => languages::go::extract(&tree, &ctx),
        })
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping() {
        assert_eq!(Language::from_path("a/b/c.ts"), Some(Language::TypeScript));
        assert_eq!(Language::from_path("x.tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_path("x.jsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("m.py"), Some(Language::Python));
        assert_eq!(Language::from_path("A.java"), Some(Language::Java));
        assert_eq!(Language::from_path("A.cs"), Some(Language::CSharp));
        assert_eq!(Language::from_path("m.go"), Some(Language::Go));
        assert_eq!(Language::from_path("style.css"), None);
    }

    #[test]
    fn parse_is_deterministic() {
        let registry = ParserRegistry::new();
        let origin = FileOrigin {
            repo_id: "r".into(),
            branch: "main".into(),
        };
        let src = b"export function greet(name: string) { return hello(name); }";
        let first = registry.parse("src/greet.ts", src, &origin).unwrap();
        let second = registry.parse("src/greet.ts", src, &origin).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ill_formed_input_yields_partial_result() {
        let registry = ParserRegistry::new();
        let origin = FileOrigin {
            repo_id: "r".into(),
            branch: "main".into(),
        };
        // Unclosed brace plus garbage; must not error.
        let src = b"function ok() { return 1; }\nfunction broken( {{{ \x00\xff";
        let (symbols, _) = registry.parse("src/broken.js", src, &origin).unwrap();
        assert!(symbols.iter().any(|s| s.name == "ok"));
    }
}

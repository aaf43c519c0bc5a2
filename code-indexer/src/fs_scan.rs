//! Working-tree enumeration.
//!
//! Walks the root, prunes ignored directories during descent (so huge
//! `node_modules` trees are never entered), and keeps only supported
//! extensions that pass the generated/lock-file filters.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use code_parsers::paths;
use code_parsers::registry::Language;

/// One indexable file.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Absolute path for reading.
    pub abs_path: PathBuf,
    /// Repo-relative, forward-slash path used in symbol ids.
    pub rel_path: String,
}

/// Enumerate indexable source files under `root`, sorted by relative path
/// for deterministic indexing order.
pub fn scan_source_files(root: &Path) -> Vec<ScannedFile> {
    let mut files: Vec<ScannedFile> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_dir() && paths::IGNORED_DIRS.contains(&name.as_ref()))
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let rel_path = rel.to_string_lossy().replace('\\', "/");
            if Language::from_path(&rel_path).is_none() || paths::is_excluded(&rel_path) {
                return None;
            }
            Some(ScannedFile {
                abs_path: entry.path().to_path_buf(),
                rel_path,
            })
        })
        .collect();

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    debug!("scan: {} indexable files under {}", files.len(), root.display());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn prunes_ignored_dirs_and_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/app.ts"), "export const x = 1;").unwrap();
        fs::write(root.join("src/app.css"), "body {}").unwrap();
        fs::write(root.join("src/app.min.js"), "x").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();

        let files = scan_source_files(root);
        let rels: Vec<&str> = files.iter().map(|f| f.rel_path.as_str()).collect();
        assert_eq!(rels, vec!["src/app.ts"]);
    }
}

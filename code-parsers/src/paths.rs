//! Path filters shared by the registry and the indexer scan.
//!
//! Two layers:
//! - directory names that never contain reviewable first-party code;
//! - generated-file patterns (minified bundles, protobuf output, lock
//!   files) matched with a compiled glob set.

use globset::{Glob, GlobSet, GlobSetBuilder};
use lazy_static::lazy_static;

/// Directory names skipped wholesale during scans.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".git",
    ".next",
    "__pycache__",
    "coverage",
    ".turbo",
    "target",
];

const GENERATED_GLOBS: &[&str] = &[
    "*.min.*",
    "*.bundle.*",
    "*.pb.*",
    "*.generated.*",
    "*.gen.*",
    "**/__generated__/**",
];

const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    "Gemfile.lock",
    "go.sum",
    "packages.lock.json",
];

lazy_static! {
    static ref GENERATED: GlobSet = {
        let mut builder = GlobSetBuilder::new();
        for pattern in GENERATED_GLOBS {
            builder.add(Glob::new(pattern).expect("static glob"));
        }
        builder.build().expect("static glob set")
    };
}

/// True when any component of `path` is an ignored directory.
pub fn in_ignored_dir(path: &str) -> bool {
    path.split('/')
        .any(|part| IGNORED_DIRS.contains(&part))
}

/// True for recognised generated-file patterns.
pub fn is_generated(path: &str) -> bool {
    GENERATED.is_match(path)
}

/// True for dependency lock files.
pub fn is_lock_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    LOCK_FILES.contains(&name)
}

/// Combined indexing filter: ignored directory, generated or lock file.
pub fn is_excluded(path: &str) -> bool {
    in_ignored_dir(path) || is_generated(path) || is_lock_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_excluded() {
        assert!(is_excluded("node_modules/react/index.js"));
        assert!(is_excluded("packages/web/.next/chunk.js"));
        assert!(is_excluded("api/__pycache__/mod.pyc"));
        assert!(!is_excluded("src/services/auth.ts"));
    }

    #[test]
    fn generated_patterns_are_excluded() {
        assert!(is_excluded("assets/app.min.js"));
        assert!(is_excluded("web/vendor.bundle.js"));
        assert!(is_excluded("proto/user.pb.go"));
        assert!(is_excluded("src/schema.generated.ts"));
        assert!(is_excluded("src/types.gen.ts"));
        assert!(is_excluded("app/__generated__/queries.ts"));
        assert!(!is_excluded("src/generator.ts"));
    }

    #[test]
    fn lock_files_are_excluded() {
        assert!(is_excluded("package-lock.json"));
        assert!(is_excluded("services/api/poetry.lock"));
        assert!(!is_excluded("src/lock.ts"));
    }
}

//! Skill snippets: plain-text review rules keyed by file globs.
//!
//! A skill file is any `.md` or `.txt` under the skills directory whose
//! first line declares its globs:
//!
//! ```text
//! globs: src/**/*.ts, **/*.tsx
//! Never use `any` in exported signatures.
//! ```
//!
//! A skill is injected into the prompt when any changed file matches one
//! of its globs.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

/// One loaded rule snippet.
pub struct Skill {
    pub name: String,
    pub patterns: Vec<String>,
    matcher: GlobSet,
    pub text: String,
}

impl Skill {
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

/// Load every skill file under `dir`. Unreadable or malformed files are
/// skipped with a warning.
pub fn load_skills(dir: &Path) -> Vec<Skill> {
    let Ok(entries) = fs::read_dir(dir) else {
        debug!("skills: no directory at {}", dir.display());
        return Vec::new();
    };

    let mut skills = Vec::new();
    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("md") | Some("txt")
            )
        })
        .collect();
    paths.sort();

    for path in paths {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("skills: unreadable {}: {}", path.display(), e);
                continue;
            }
        };
        match parse_skill(&path, &content) {
            Some(skill) => skills.push(skill),
            None => warn!(
                "skills: {} is missing a leading `globs:` line, skipped",
                path.display()
            ),
        }
    }
    debug!("skills: loaded {}", skills.len());
    skills
}

fn parse_skill(path: &Path, content: &str) -> Option<Skill> {
    let mut lines = content.lines();
    let header = lines.next()?.trim();
    let globs = header.strip_prefix("globs:")?;

    let patterns: Vec<String> = globs
        .split(',')
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    if patterns.is_empty() {
        return None;
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in &patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => {
                warn!("skills: bad glob {pattern:?} in {}: {}", path.display(), e);
            }
        }
    }
    let matcher = builder.build().ok()?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "skill".to_string());
    Some(Skill {
        name,
        patterns,
        matcher,
        text: lines.collect::<Vec<_>>().join("\n"),
    })
}

/// Skills whose globs match at least one changed file.
pub fn matching_skills<'a>(skills: &'a [Skill], changed_paths: &[String]) -> Vec<&'a Skill> {
    skills
        .iter()
        .filter(|skill| changed_paths.iter().any(|p| skill.matches(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_and_matches_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("typescript.md"),
            "globs: **/*.ts, **/*.tsx\nAvoid `any` in exported APIs.",
        )
        .unwrap();
        fs::write(
            dir.path().join("python.md"),
            "globs: **/*.py\nUse type hints on public functions.",
        )
        .unwrap();
        fs::write(dir.path().join("broken.md"), "no header at all").unwrap();

        let skills = load_skills(dir.path());
        assert_eq!(skills.len(), 2);

        let changed = vec!["src/auth.ts".to_string()];
        let matched = matching_skills(&skills, &changed);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "typescript");
        assert!(matched[0].text.contains("Avoid `any`"));
    }

    #[test]
    fn missing_directory_is_empty_not_fatal() {
        assert!(load_skills(Path::new("/definitely/not/here")).is_empty());
    }
}

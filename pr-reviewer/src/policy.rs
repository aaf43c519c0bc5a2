//! Policy layer between the parser and the host: precision filter, path
//! validation, line validation, content-hash dedup and dismissal checks.
//!
//! Everything here drops comments with a warning; nothing fails a review.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use diff_engine::DiffLine;

use crate::git_providers::types::{ExistingComment, FileDiff, ReviewComment};

/// Hidden marker embedded into every posted comment body.
/// Example: `<!-- agnusai:id=0f3a9c4be2d11078 -->`
const MARKER_PREFIX: &str = "<!-- agnusai:id=";
const MARKER_SUFFIX: &str = " -->";

lazy_static! {
    static ref MARKER: Regex =
        Regex::new(r"<!-- agnusai:id=([0-9a-f]{16}) -->").expect("static regex");
    static ref DISMISSAL: Regex = Regex::new(
        r"(?i)\b(dismiss(ed)?|false positive|not (an|a) (issue|problem)|won'?t ?fix|intended|by design|disagree)\b"
    )
    .expect("static regex");
}

/// Content-addressed dedup id: SHA-256 over `path || line || body`,
/// truncated to 16 hex chars.
pub fn dedup_id(path: &str, line: u32, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(line.to_string().as_bytes());
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// Render the hidden marker for a dedup id.
pub fn marker_for(id: &str) -> String {
    format!("{MARKER_PREFIX}{id}{MARKER_SUFFIX}")
}

/// Precision (confidence) filter.
///
/// Keeps comments with `confidence >= threshold` and comments without a
/// confidence at all (older model output). Returns the survivors and the
/// dropped count.
pub fn apply_precision_filter(
    comments: Vec<ReviewComment>,
    threshold: f32,
) -> (Vec<ReviewComment>, usize) {
    let before = comments.len();
    let kept: Vec<ReviewComment> = comments
        .into_iter()
        .filter(|c| match c.confidence {
            Some(conf) => conf >= threshold,
            None => true,
        })
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        debug!(
            "policy: precision filter dropped {} of {} comments (threshold {})",
            dropped, before, threshold
        );
    }
    (kept, dropped)
}

/// Added (post-state) line numbers per file in the diff.
fn plus_lines_by_file(diffs: &[FileDiff]) -> HashMap<&str, HashSet<u32>> {
    let mut map: HashMap<&str, HashSet<u32>> = HashMap::new();
    for diff in diffs {
        let entry = map.entry(diff.path.as_str()).or_default();
        for hunk in &diff.hunks {
            for line in &hunk.lines {
                if let DiffLine::Added { new_line, .. } = line {
                    entry.insert(*new_line);
                }
            }
        }
    }
    map
}

/// Validate comment paths against the diff's file list and comment lines
/// against the `+` lines of their hunks. Hallucinations are dropped with
/// a warning.
pub fn validate_against_diff(
    comments: Vec<ReviewComment>,
    diffs: &[FileDiff],
) -> Vec<ReviewComment> {
    // normalised (no leading slash) -> original path
    let path_map: HashMap<String, &str> = diffs
        .iter()
        .map(|d| (d.path.trim_start_matches('/').to_string(), d.path.as_str()))
        .collect();
    let plus_lines = plus_lines_by_file(diffs);

    let mut out = Vec::with_capacity(comments.len());
    for mut comment in comments {
        let normalised = comment.path.trim_start_matches('/').to_string();
        let Some(original) = path_map.get(&normalised) else {
            warn!(
                "policy: dropping comment on unknown path {} (hallucinated?)",
                comment.path
            );
            continue;
        };
        comment.path = original.to_string();

        let valid_line = plus_lines
            .get(original)
            .map(|lines| lines.contains(&comment.line))
            .unwrap_or(false);
        if !valid_line {
            warn!(
                "policy: dropping comment on {}:{} (not an added line)",
                comment.path, comment.line
            );
            continue;
        }
        out.push(comment);
    }
    out
}

/// Dedup ids already present on the PR, read from hidden markers, plus
/// the subset whose threads contain a dismissal reply.
pub fn existing_marker_ids(existing: &[ExistingComment]) -> (HashSet<String>, HashSet<String>) {
    let mut ids = HashSet::new();
    let mut dismissed = HashSet::new();
    for comment in existing {
        let Some(cap) = MARKER.captures(&comment.body) else {
            continue;
        };
        let id = cap[1].to_string();
        // A dismissal counts only on a reply, never on the comment body
        // itself (the bot's own wording must not suppress re-posting).
        if comment.replies.iter().any(|r| DISMISSAL.is_match(r)) {
            dismissed.insert(id.clone());
        }
        ids.insert(id);
    }
    (ids, dismissed)
}

/// Drop comments that already exist on the PR (same dedup id), comments
/// whose counterpart was dismissed, and in-response duplicates on the
/// same (file, line).
pub fn dedup_comments(
    comments: Vec<ReviewComment>,
    existing: &[ExistingComment],
) -> Vec<ReviewComment> {
    let (existing_ids, dismissed) = existing_marker_ids(existing);
    let mut seen_in_response: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(comments.len());

    for comment in comments {
        let id = dedup_id(&comment.path, comment.line, &comment.body);
        if existing_ids.contains(&id) {
            debug!(
                "policy: skip duplicate comment {}:{} (already posted{})",
                comment.path,
                comment.line,
                if dismissed.contains(&id) {
                    ", dismissed"
                } else {
                    ""
                }
            );
            continue;
        }
        if !seen_in_response.insert(id) {
            debug!(
                "policy: skip in-response duplicate at {}:{}",
                comment.path, comment.line
            );
            continue;
        }
        out.push(comment);
    }
    out
}

/// Files that never receive review comments: binary, lock files and
/// generated artifacts. Config/data files (JSON/YAML/TOML) are reviewed.
pub fn is_reviewable(diff: &FileDiff) -> bool {
    !diff.is_binary
        && !code_parsers::paths::is_lock_file(&diff.path)
        && !code_parsers::paths::is_generated(&diff.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_providers::types::{DiffStatus, Severity};
    use diff_engine::DiffHunk;

    fn comment(path: &str, line: u32, body: &str, confidence: Option<f32>) -> ReviewComment {
        ReviewComment {
            path: path.into(),
            line,
            body: body.into(),
            severity: Severity::Info,
            confidence,
            suggestion: None,
        }
    }

    fn diff_with_added(path: &str, lines: &[u32]) -> FileDiff {
        FileDiff {
            path: path.into(),
            old_path: None,
            status: DiffStatus::Modified,
            additions: lines.len() as u32,
            deletions: 0,
            is_binary: false,
            hunks: vec![DiffHunk {
                old_start: 1,
                old_lines: 0,
                new_start: lines.first().copied().unwrap_or(1),
                new_lines: lines.len() as u32,
                lines: lines
                    .iter()
                    .map(|n| DiffLine::Added {
                        new_line: *n,
                        content: format!("line {n}"),
                    })
                    .collect(),
            }],
            raw_unidiff: None,
        }
    }

    #[test]
    fn precision_filter_scenario() {
        let comments = vec![
            comment("a.ts", 1, "one [was 0.92]", Some(0.92)),
            comment("a.ts", 2, "two", Some(0.60)),
            comment("a.ts", 3, "three", Some(0.80)),
        ];
        let (kept, dropped) = apply_precision_filter(comments, 0.7);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
        assert!(kept.iter().all(|c| c.confidence.unwrap() >= 0.7));
    }

    #[test]
    fn missing_confidence_passes_the_filter() {
        let (kept, dropped) = apply_precision_filter(vec![comment("a.ts", 1, "x", None)], 0.7);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn hallucinated_paths_are_dropped() {
        let diffs = vec![diff_with_added("src/a.ts", &[10])];
        let kept = validate_against_diff(
            vec![
                comment("src/a.ts", 10, "ok", None),
                comment("src/b.ts", 10, "ghost file", None),
            ],
            &diffs,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "src/a.ts");
    }

    #[test]
    fn leading_slash_is_normalised() {
        let diffs = vec![diff_with_added("src/a.ts", &[5])];
        let kept = validate_against_diff(vec![comment("/src/a.ts", 5, "ok", None)], &diffs);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "src/a.ts");
    }

    #[test]
    fn lines_outside_added_set_are_dropped() {
        let diffs = vec![diff_with_added("src/a.ts", &[5, 6])];
        let kept = validate_against_diff(
            vec![
                comment("src/a.ts", 5, "on added line", None),
                comment("src/a.ts", 99, "context line", None),
            ],
            &diffs,
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].line, 5);
    }

    #[test]
    fn replaying_a_response_posts_nothing_new() {
        let comments = vec![comment("src/a.ts", 5, "issue body", None)];
        let id = dedup_id("src/a.ts", 5, "issue body");
        let existing = vec![ExistingComment {
            id: "1".into(),
            body: format!("issue body\n\n{}", marker_for(&id)),
            replies: vec![],
        }];
        let kept = dedup_comments(comments, &existing);
        assert!(kept.is_empty());
    }

    #[test]
    fn dismissal_counts_only_on_replies() {
        let id = dedup_id("src/a.ts", 5, "maybe a false positive generator");
        // Dismissal keywords in the comment body itself must not register.
        let body_only = vec![ExistingComment {
            id: "1".into(),
            body: format!("this could be a false positive\n{}", marker_for(&id)),
            replies: vec![],
        }];
        let (_, dismissed) = existing_marker_ids(&body_only);
        assert!(dismissed.is_empty());

        let with_reply = vec![ExistingComment {
            id: "1".into(),
            body: format!("finding\n{}", marker_for(&id)),
            replies: vec!["this is a false positive, dismissed".into()],
        }];
        let (_, dismissed) = existing_marker_ids(&with_reply);
        assert!(dismissed.contains(&id));
    }

    #[test]
    fn in_response_duplicates_collapse() {
        let comments = vec![
            comment("src/a.ts", 5, "same body", None),
            comment("src/a.ts", 5, "same body", None),
        ];
        let kept = dedup_comments(comments, &[]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn config_files_are_reviewable_but_locks_are_not() {
        let json = diff_with_added("config/settings.json", &[1]);
        assert!(is_reviewable(&json));
        let lock = diff_with_added("package-lock.json", &[1]);
        assert!(!is_reviewable(&lock));
        let generated = diff_with_added("src/schema.generated.ts", &[1]);
        assert!(!is_reviewable(&generated));
    }
}

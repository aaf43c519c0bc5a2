//! Unified-diff text parser.
//!
//! Providers hand back raw unified diffs; this turns them into the same
//! hunk/line model the local engine produces. Robust to missing file
//! headers (hunks-only input), ignores `\ No newline at end of file`
//! markers, and recognises binary-patch notices.

use crate::types::{DiffHunk, DiffLine};

/// Parse one file's unified diff into hunks. Only `@@` headers are
/// required; anything before the first hunk header is skipped.
pub fn parse_unified(s: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;
    let mut old_line = 0u32;
    let mut new_line = 0u32;

    for line in s.lines() {
        if line.starts_with("@@") {
            if let Some(hunk) = current.take() {
                if !hunk.lines.is_empty() {
                    hunks.push(hunk);
                }
            }
            if let Some((old_start, old_lines, new_start, new_lines)) = parse_hunk_header(line) {
                old_line = old_start;
                new_line = new_start;
                current = Some(DiffHunk {
                    old_start,
                    old_lines,
                    new_start,
                    new_lines,
                    lines: Vec::new(),
                });
            }
            continue;
        }

        // `\ No newline at end of file` and similar marker lines.
        if line.starts_with('\\') {
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            continue;
        };

        if let Some(rest) = line.strip_prefix('+') {
            hunk.lines.push(DiffLine::Added {
                new_line,
                content: rest.to_string(),
            });
            new_line += 1;
        } else if let Some(rest) = line.strip_prefix('-') {
            hunk.lines.push(DiffLine::Removed {
                old_line,
                content: rest.to_string(),
            });
            old_line += 1;
        } else {
            let content = line.strip_prefix(' ').unwrap_or(line);
            hunk.lines.push(DiffLine::Context {
                old_line,
                new_line,
                content: content.to_string(),
            });
            old_line += 1;
            new_line += 1;
        }
    }

    if let Some(hunk) = current {
        if !hunk.lines.is_empty() {
            hunks.push(hunk);
        }
    }
    hunks
}

/// `@@ -12,7 +12,9 @@ context` into (12, 7, 12, 9). Counts default to 1
/// when omitted, per the unified format.
fn parse_hunk_header(line: &str) -> Option<(u32, u32, u32, u32)> {
    let trimmed = line.trim_start_matches('@').trim_end();
    let trimmed = trimmed.trim_start();
    let mut parts = trimmed.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    let (old_start, old_lines) = split_range(old)?;
    let (new_start, new_lines) = split_range(new)?;
    Some((old_start, old_lines, new_start, new_lines))
}

fn split_range(s: &str) -> Option<(u32, u32)> {
    if let Some((start, len)) = s.split_once(',') {
        Some((start.parse().ok()?, len.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}

/// Heuristic for binary patches inside unified-diff text.
pub fn looks_like_binary_patch(s: &str) -> bool {
    s.contains("GIT binary patch")
        || s.starts_with("Binary files ")
        || (s.starts_with("Files ") && s.contains(" differ"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headers_and_line_numbers() {
        let diff = "\
--- a/src/x.ts
+++ b/src/x.ts
@@ -1,3 +1,4 @@
 keep
-old
+new
+extra
 tail
\\ No newline at end of file
";
        let hunks = parse_unified(diff);
        assert_eq!(hunks.len(), 1);
        let hunk = &hunks[0];
        assert_eq!((hunk.old_start, hunk.old_lines), (1, 3));
        assert_eq!((hunk.new_start, hunk.new_lines), (1, 4));

        let added: Vec<_> = hunk
            .lines
            .iter()
            .filter_map(|l| match l {
                DiffLine::Added { new_line, content } => Some((*new_line, content.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec![(2, "new"), (3, "extra")]);
    }

    #[test]
    fn hunks_only_input_is_accepted() {
        let diff = "@@ -5 +5 @@\n-a\n+b\n";
        let hunks = parse_unified(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_start, 5);
        assert_eq!(hunks[0].old_lines, 1);
    }

    #[test]
    fn binary_notices_are_recognised() {
        assert!(looks_like_binary_patch("Binary files a/x.png and b/x.png differ"));
        assert!(!looks_like_binary_patch("@@ -1 +1 @@"));
    }
}

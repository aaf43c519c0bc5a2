//! Hunk grouping and unified rendering.
//!
//! Change blocks get a fixed leading/trailing context window; overlapping
//! or adjacent windows merge into one hunk.

use crate::myers::ScriptLine;
use crate::types::{DiffHunk, DiffLine};

/// Group a full edit script into unified hunks with `context` lines of
/// surrounding context.
pub fn group_hunks(script: &[ScriptLine], context: usize) -> Vec<DiffHunk> {
    let change_indices: Vec<usize> = script
        .iter()
        .enumerate()
        .filter(|(_, l)| !matches!(l, ScriptLine::Equal { .. }))
        .map(|(i, _)| i)
        .collect();
    if change_indices.is_empty() {
        return Vec::new();
    }

    // Expand each change into a window and merge overlaps.
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for &i in &change_indices {
        let start = i.saturating_sub(context);
        let end = (i + context).min(script.len() - 1);
        match windows.last_mut() {
            Some((_, last_end)) if start <= *last_end + 1 => {
                *last_end = (*last_end).max(end);
            }
            _ => windows.push((start, end)),
        }
    }

    windows
        .into_iter()
        .map(|(start, end)| build_hunk(&script[start..=end]))
        .collect()
}

fn build_hunk(window: &[ScriptLine]) -> DiffHunk {
    let mut lines = Vec::with_capacity(window.len());
    let mut old_start: Option<u32> = None;
    let mut new_start: Option<u32> = None;
    let mut old_count = 0u32;
    let mut new_count = 0u32;

    for entry in window {
        match entry {
            ScriptLine::Equal {
                old_line,
                new_line,
                text,
            } => {
                old_start.get_or_insert(*old_line);
                new_start.get_or_insert(*new_line);
                old_count += 1;
                new_count += 1;
                lines.push(DiffLine::Context {
                    old_line: *old_line,
                    new_line: *new_line,
                    content: text.clone(),
                });
            }
            ScriptLine::Remove { old_line, text } => {
                old_start.get_or_insert(*old_line);
                old_count += 1;
                lines.push(DiffLine::Removed {
                    old_line: *old_line,
                    content: text.clone(),
                });
            }
            ScriptLine::Add { new_line, text } => {
                new_start.get_or_insert(*new_line);
                new_count += 1;
                lines.push(DiffLine::Added {
                    new_line: *new_line,
                    content: text.clone(),
                });
            }
        }
    }

    DiffHunk {
        // A side with no lines renders as `-0,0` / `+0,0`, matching the
        // empty-file convention.
        old_start: old_start.unwrap_or(0),
        old_lines: old_count,
        new_start: new_start.unwrap_or(0),
        new_lines: new_count,
        lines,
    }
}

/// (additions, deletions) across all hunks.
pub fn stats(hunks: &[DiffHunk]) -> (u32, u32) {
    let mut additions = 0;
    let mut deletions = 0;
    for hunk in hunks {
        for line in &hunk.lines {
            match line {
                DiffLine::Added { .. } => additions += 1,
                DiffLine::Removed { .. } => deletions += 1,
                DiffLine::Context { .. } => {}
            }
        }
    }
    (additions, deletions)
}

/// Render hunks into standard unified-diff text, with file headers.
pub fn render_unified(path: &str, hunks: &[DiffHunk]) -> String {
    let mut out = String::new();
    out.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));
    for hunk in hunks {
        out.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk.old_start, hunk.old_lines, hunk.new_start, hunk.new_lines
        ));
        for line in &hunk.lines {
            match line {
                DiffLine::Context { content, .. } => {
                    out.push(' ');
                    out.push_str(content);
                }
                DiffLine::Added { content, .. } => {
                    out.push('+');
                    out.push_str(content);
                }
                DiffLine::Removed { content, .. } => {
                    out.push('-');
                    out.push_str(content);
                }
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::myers::edit_script;

    #[test]
    fn nearby_changes_merge_into_one_hunk() {
        let old = "1\n2\n3\n4\n5\n6\n7\n8";
        let new = "1\nTWO\n3\n4\n5\nSIX\n7\n8";
        let script = edit_script(old, new, 1_000).unwrap();
        let hunks = group_hunks(&script, 3);
        assert_eq!(hunks.len(), 1);
    }

    #[test]
    fn distant_changes_stay_separate() {
        let old: String = (1..=30).map(|i| format!("line-{i}\n")).collect();
        let new = old
            .replace("line-3\n", "line-three\n")
            .replace("line-27\n", "line-twentyseven\n");
        let script = edit_script(old.trim_end(), new.trim_end(), 1_000).unwrap();
        let hunks = group_hunks(&script, 3);
        assert_eq!(hunks.len(), 2);
    }

    #[test]
    fn unified_rendering_has_standard_headers() {
        let script = edit_script("a\nb\nc", "a\nB\nc", 100).unwrap();
        let hunks = group_hunks(&script, 3);
        let rendered = render_unified("src/x.ts", &hunks);
        assert!(rendered.starts_with("--- a/src/x.ts\n+++ b/src/x.ts\n"));
        assert!(rendered.contains("@@ -1,3 +1,3 @@"));
        assert!(rendered.contains("\n-b\n"));
        assert!(rendered.contains("\n+B\n"));
    }
}

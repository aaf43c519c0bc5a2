//! Local unified-diff computation for hosts that return file snapshots
//! instead of diffs.
//!
//! - Myers O(N·D) over lines, with FNV-1a 32-bit hashes caching equality
//!   (full string comparison only on hash collision);
//! - hunk grouping with a fixed 3-line context and merged windows;
//! - a full-replacement fallback once the **actual edit distance** crosses
//!   the configured limit, so small edits in large files stay precise;
//! - an LLM-facing annotation that stamps every added line with its
//!   post-state `[Line N]` number.

pub mod annotate;
pub mod hunks;
pub mod myers;
pub mod parse;
pub mod types;

pub use annotate::annotate_for_llm;
pub use hunks::{group_hunks, render_unified, stats};
pub use myers::{ScriptLine, edit_script};
pub use parse::{looks_like_binary_patch, parse_unified};
pub use types::{DiffHunk, DiffLine, DiffOptions};

use tracing::debug;

/// Diff two file snapshots into unified hunks.
///
/// Equal inputs produce an empty hunk list. Past the edit-distance limit
/// the result degrades to one full-replacement hunk (everything removed,
/// everything added).
pub fn diff_snapshots(old: &str, new: &str, opts: &DiffOptions) -> Vec<DiffHunk> {
    let script = edit_script(old, new, opts.max_edit_distance);
    match script {
        Some(script) => group_hunks(&script, opts.context),
        None => {
            debug!(
                "diff: edit distance over {} limit, falling back to full replacement",
                opts.max_edit_distance
            );
            full_replacement(old, new)
        }
    }
}

fn full_replacement(old: &str, new: &str) -> Vec<DiffHunk> {
    let old_lines: Vec<&str> = lines_of(old);
    let new_lines: Vec<&str> = lines_of(new);
    if old_lines.is_empty() && new_lines.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::with_capacity(old_lines.len() + new_lines.len());
    for (i, content) in old_lines.iter().enumerate() {
        lines.push(DiffLine::Removed {
            old_line: i as u32 + 1,
            content: content.to_string(),
        });
    }
    for (i, content) in new_lines.iter().enumerate() {
        lines.push(DiffLine::Added {
            new_line: i as u32 + 1,
            content: content.to_string(),
        });
    }

    vec![DiffHunk {
        old_start: if old_lines.is_empty() { 0 } else { 1 },
        old_lines: old_lines.len() as u32,
        new_start: if new_lines.is_empty() { 0 } else { 1 },
        new_lines: new_lines.len() as u32,
        lines,
    }]
}

/// Split into lines without a phantom trailing entry for a final newline.
pub(crate) fn lines_of(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_produce_no_hunks() {
        let text = "a\nb\nc\n";
        assert!(diff_snapshots(text, text, &DiffOptions::default()).is_empty());
    }

    #[test]
    fn single_line_replacement_scenario() {
        // Old: a b c d e f, new: a b X d e f.
        let old = "a\nb\nc\nd\ne\nf\n";
        let new = "a\nb\nX\nd\ne\nf\n";
        let hunks = diff_snapshots(old, new, &DiffOptions::default());
        assert_eq!(hunks.len(), 1);

        let hunk = &hunks[0];
        let removed: Vec<_> = hunk
            .lines
            .iter()
            .filter_map(|l| match l {
                DiffLine::Removed { old_line, content } => Some((*old_line, content.as_str())),
                _ => None,
            })
            .collect();
        let added: Vec<_> = hunk
            .lines
            .iter()
            .filter_map(|l| match l {
                DiffLine::Added { new_line, content } => Some((*new_line, content.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec![(3, "c")]);
        assert_eq!(added, vec![(3, "X")]);

        let (additions, deletions) = stats(&hunks);
        assert_eq!((additions, deletions), (1, 1));

        // Leading context clipped to two lines by the file start, three
        // lines of trailing context.
        let leading = hunk
            .lines
            .iter()
            .take_while(|l| matches!(l, DiffLine::Context { .. }))
            .count();
        let trailing = hunk
            .lines
            .iter()
            .rev()
            .take_while(|l| matches!(l, DiffLine::Context { .. }))
            .count();
        assert_eq!((leading, trailing), (2, 3));
        assert_eq!((hunk.old_start, hunk.old_lines), (1, 6));
        assert_eq!((hunk.new_start, hunk.new_lines), (1, 6));
    }

    #[test]
    fn fallback_kicks_in_past_the_distance_limit() {
        let old: String = (0..40).map(|i| format!("old-{i}\n")).collect();
        let new: String = (0..40).map(|i| format!("new-{i}\n")).collect();
        let opts = DiffOptions {
            max_edit_distance: 10,
            ..DiffOptions::default()
        };
        let hunks = diff_snapshots(&old, &new, &opts);
        assert_eq!(hunks.len(), 1);
        let (additions, deletions) = stats(&hunks);
        assert_eq!((additions, deletions), (40, 40));
    }

    #[test]
    fn small_edit_in_large_file_is_not_truncated() {
        // The distance bound is on D, not on file size, so one changed
        // line in a big file still diffs precisely.
        let old: String = (0..5000).map(|i| format!("line-{i}\n")).collect();
        let new = old.replace("line-2500", "line-changed");
        let opts = DiffOptions {
            max_edit_distance: 10,
            ..DiffOptions::default()
        };
        let hunks = diff_snapshots(&old, &new, &opts);
        assert_eq!(hunks.len(), 1);
        let (additions, deletions) = stats(&hunks);
        assert_eq!((additions, deletions), (1, 1));
    }
}

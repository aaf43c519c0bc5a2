//! Diff annotation for LLM prompts.
//!
//! Added lines carry an explicit `[Line N]` marker with their post-state
//! number, removed lines stay unmarked (context only), and equal lines
//! are omitted entirely. Models anchor comments to the printed numbers
//! instead of counting lines themselves, which removes a whole class of
//! hallucinated line numbers.

use crate::types::{DiffHunk, DiffLine};

/// Render hunks into the annotated form handed to the model.
pub fn annotate_for_llm(hunks: &[DiffHunk]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        for line in &hunk.lines {
            match line {
                DiffLine::Added { new_line, content } => {
                    out.push_str(&format!("[Line {new_line}] {content}\n"));
                }
                DiffLine::Removed { content, .. } => {
                    out.push_str(&format!("- {content}\n"));
                }
                DiffLine::Context { .. } => {}
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiffOptions;

    #[test]
    fn added_lines_carry_post_state_numbers() {
        let hunks = crate::diff_snapshots("a\nb\nc", "a\nB\nc\nd", &DiffOptions::default());
        let annotated = annotate_for_llm(&hunks);
        assert!(annotated.contains("[Line 2] B"));
        assert!(annotated.contains("[Line 4] d"));
        assert!(annotated.contains("- b"));
        // Context lines are omitted.
        assert!(!annotated.contains("a\n"));
    }
}

//! Prompt assembly for one review.
//!
//! Layout, top to bottom: fixed system preamble with the required output
//! format, matched skill snippets, the (possibly truncated) diff, the
//! serialized codebase context, confidence-scoring instructions. The
//! model is told to use the context but never name it.

use crate::skills::Skill;

/// Everything the builder needs for one prompt.
pub struct PromptInput<'a> {
    pub pr_title: &'a str,
    pub diff_text: &'a str,
    pub truncated: bool,
    /// Serialized "Codebase Context" section; empty means flat-diff mode.
    pub context_md: &'a str,
    pub skills: &'a [&'a Skill],
}

const PREAMBLE: &str = r#"You are a senior engineer reviewing a pull request.

Rules:
- Comment only on real problems in the changed lines: bugs, security issues, race conditions, broken error handling, API misuse.
- Do not praise, restate the diff, or comment on style a formatter would fix.
- Added lines are marked with [Line N]; use exactly those numbers.
- Never invent file paths: only files shown in the diff exist.

Output format (strict):
SUMMARY: <one short paragraph on the overall change>
[File: <path>, Line: <N>]
<the issue, one paragraph, ending with [Confidence: X.X]>
(repeat the [File: ...] block per issue)
VERDICT: approve | request_changes | comment"#;

const CONFIDENCE_INSTRUCTIONS: &str = r#"Confidence scale for the mandatory [Confidence: X.X] suffix:
- 0.9-1.0: certain defect, would break in production
- 0.7-0.8: likely defect, worth a second look
- 0.5-0.6: plausible concern, might be intended
- below 0.5: speculation; prefer not to comment at all"#;

const TRUNCATION_NOTICE: &str = "NOTE: the diff below was truncated to fit the size limit. \
Do not comment on files that are not shown.";

/// Build the full prompt string.
pub fn build_review_prompt(input: &PromptInput) -> String {
    let mut prompt = String::with_capacity(input.diff_text.len() + 4_000);
    prompt.push_str(PREAMBLE);

    if !input.skills.is_empty() {
        prompt.push_str("\n\n## Project review rules\n");
        for skill in input.skills {
            prompt.push_str(&format!("\n### {}\n{}\n", skill.name, skill.text.trim()));
        }
    }

    prompt.push_str(&format!("\n\n## Pull request: {}\n", input.pr_title));

    if input.truncated {
        prompt.push_str("\n");
        prompt.push_str(TRUNCATION_NOTICE);
        prompt.push('\n');
    }

    prompt.push_str("\n## Diff\n```\n");
    prompt.push_str(input.diff_text);
    prompt.push_str("\n```\n");

    if !input.context_md.is_empty() {
        prompt.push('\n');
        prompt.push_str(input.context_md);
        prompt.push_str(
            "\nUse this section to judge impact on callers and related code, \
             but do not mention it or its headings in your comments.\n",
        );
    }

    prompt.push('\n');
    prompt.push_str(CONFIDENCE_INSTRUCTIONS);
    prompt
}

/// Cut the diff to `max_chars` on a char boundary. Returns the text and
/// whether truncation happened.
pub fn truncate_diff(diff: &str, max_chars: usize) -> (String, bool) {
    if diff.chars().count() <= max_chars {
        return (diff.to_string(), false);
    }
    (diff.chars().take(max_chars).collect(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_is_flagged_and_announced() {
        let diff = "x".repeat(100);
        let (cut, truncated) = truncate_diff(&diff, 10);
        assert_eq!(cut.len(), 10);
        assert!(truncated);

        let prompt = build_review_prompt(&PromptInput {
            pr_title: "t",
            diff_text: &cut,
            truncated,
            context_md: "",
            skills: &[],
        });
        assert!(prompt.contains("truncated"));
        assert!(prompt.contains("Do not comment on files that are not shown."));
    }

    #[test]
    fn prompt_carries_format_and_confidence_sections() {
        let prompt = build_review_prompt(&PromptInput {
            pr_title: "Add login throttle",
            diff_text: "[Line 3] let x = 1;",
            truncated: false,
            context_md: "## Codebase Context\n- `a` (function): `a()`",
            skills: &[],
        });
        assert!(prompt.contains("SUMMARY:"));
        assert!(prompt.contains("VERDICT:"));
        assert!(prompt.contains("[Confidence: X.X]"));
        assert!(prompt.contains("## Codebase Context"));
        assert!(prompt.contains("do not mention it"));
    }
}

//! LLM response parsing (the §output-format counterpart).
//!
//! Tolerant by design: a malformed block is dropped with a warning, a
//! missing SUMMARY falls back to the head of the response, a missing
//! VERDICT defaults to `comment`. Nothing here fails the review.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use crate::git_providers::types::{ReviewComment, Severity, Verdict};

lazy_static! {
    static ref FILE_MARKER: Regex =
        Regex::new(r"\[File:\s*([^,\]]+),\s*Line:\s*(-?\d+)\]").expect("static regex");
    static ref CONFIDENCE: Regex =
        Regex::new(r"\[Confidence:\s*([0-9]*\.?[0-9]+)\]").expect("static regex");
    static ref VERDICT: Regex =
        Regex::new(r"(?mi)^\s*VERDICT:\s*(approve|request_changes|comment)\s*$")
            .expect("static regex");
    static ref SUGGESTION: Regex =
        Regex::new(r"(?s)```suggestion\n(.*?)```").expect("static regex");
}

/// Parsed review response before filtering.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub summary: String,
    pub comments: Vec<ReviewComment>,
    pub verdict: Verdict,
}

/// Parse the raw model output into summary, comments and verdict.
pub fn parse_response(raw: &str) -> ParsedResponse {
    let summary = extract_summary(raw);
    let verdict = extract_verdict(raw);
    let comments = extract_comments(raw);

    if comments.is_empty() && !VERDICT.is_match(raw) {
        warn!("response: no comment markers and no verdict; output may be truncated");
    }

    ParsedResponse {
        summary,
        comments,
        verdict,
    }
}

/// `SUMMARY:` up to the first file marker or verdict line; otherwise the
/// first 500 characters of the response.
fn extract_summary(raw: &str) -> String {
    if let Some(start) = raw.find("SUMMARY:") {
        let after = &raw[start + "SUMMARY:".len()..];
        let mut end = after.len();
        if let Some(m) = FILE_MARKER.find(after) {
            end = end.min(m.start());
        }
        if let Some(m) = VERDICT.find(after) {
            end = end.min(m.start());
        }
        let summary = after[..end].trim();
        if !summary.is_empty() {
            return summary.to_string();
        }
    }
    raw.chars().take(500).collect::<String>().trim().to_string()
}

fn extract_verdict(raw: &str) -> Verdict {
    match VERDICT.captures(raw) {
        Some(cap) => match cap[1].to_ascii_lowercase().as_str() {
            "approve" => Verdict::Approve,
            "request_changes" => Verdict::RequestChanges,
            _ => Verdict::Comment,
        },
        None => {
            warn!("response: no VERDICT found, defaulting to comment");
            Verdict::Comment
        }
    }
}

fn extract_comments(raw: &str) -> Vec<ReviewComment> {
    let markers: Vec<_> = FILE_MARKER.captures_iter(raw).collect();
    let mut out = Vec::with_capacity(markers.len());

    for (i, cap) in markers.iter().enumerate() {
        let whole = cap.get(0).expect("capture 0");
        let path = cap[1].trim().to_string();

        let line: i64 = match cap[2].parse() {
            Ok(n) => n,
            Err(_) => {
                warn!("response: unparseable line number for {}, dropped", path);
                continue;
            }
        };
        if line < 1 {
            warn!("response: line {} < 1 for {}, comment dropped", line, path);
            continue;
        }

        // Body runs to the next marker or the verdict line.
        let body_start = whole.end();
        let mut body_end = raw.len();
        if let Some(next) = markers.get(i + 1) {
            body_end = next.get(0).expect("capture 0").start();
        }
        if let Some(m) = VERDICT.find(&raw[body_start..]) {
            body_end = body_end.min(body_start + m.start());
        }
        let mut body = raw[body_start..body_end].trim().to_string();
        if body.is_empty() {
            continue;
        }

        let confidence = CONFIDENCE.captures(&body).and_then(|c| {
            let value: f32 = c[1].parse().ok()?;
            Some(value.clamp(0.0, 1.0))
        });
        body = CONFIDENCE.replace_all(&body, "").trim().to_string();

        let suggestion = SUGGESTION
            .captures(&body)
            .map(|c| c[1].trim_end().to_string());

        let severity = derive_severity(&body);
        out.push(ReviewComment {
            path,
            line: line as u32,
            body,
            severity,
            confidence,
            suggestion,
        });
    }
    out
}

/// Keyword-derived severity: "Critical" -> error, "Major" -> warning.
fn derive_severity(body: &str) -> Severity {
    if body.contains("Critical") {
        Severity::Error
    } else if body.contains("Major") {
        Severity::Warning
    } else {
        Severity::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"SUMMARY: Solid change with two issues worth fixing.

[File: src/auth.ts, Line: 42]
Critical: the token is logged in plain text. [Confidence: 0.92]

[File: src/auth.ts, Line: 50]
Major: missing error handling around the refresh call. [Confidence: 0.60]

[File: src/db.ts, Line: 7]
Consider a named constant for the retry count. [Confidence: 0.80]

VERDICT: request_changes"#;

    #[test]
    fn parses_summary_comments_and_verdict() {
        let parsed = parse_response(RESPONSE);
        assert_eq!(parsed.summary, "Solid change with two issues worth fixing.");
        assert_eq!(parsed.verdict, Verdict::RequestChanges);
        assert_eq!(parsed.comments.len(), 3);

        let first = &parsed.comments[0];
        assert_eq!(first.path, "src/auth.ts");
        assert_eq!(first.line, 42);
        assert_eq!(first.severity, Severity::Error);
        assert_eq!(first.confidence, Some(0.92));
        assert!(!first.body.contains("[Confidence"));

        assert_eq!(parsed.comments[1].severity, Severity::Warning);
        assert_eq!(parsed.comments[2].severity, Severity::Info);
    }

    #[test]
    fn invalid_line_numbers_are_dropped() {
        let raw = "SUMMARY: s\n[File: a.ts, Line: 0]\nbad line. [Confidence: 0.9]\n\
                   [File: a.ts, Line: -3]\nnegative. \nVERDICT: comment";
        let parsed = parse_response(raw);
        assert!(parsed.comments.is_empty());
    }

    #[test]
    fn missing_summary_falls_back_to_head() {
        let raw = "[File: a.ts, Line: 2]\nan issue [Confidence: 0.8]\nVERDICT: comment";
        let parsed = parse_response(raw);
        assert!(parsed.summary.starts_with("[File: a.ts"));
        assert_eq!(parsed.comments.len(), 1);
    }

    #[test]
    fn missing_verdict_defaults_to_comment() {
        let parsed = parse_response("SUMMARY: fine\n[File: a.ts, Line: 3]\nsomething");
        assert_eq!(parsed.verdict, Verdict::Comment);
    }

    #[test]
    fn empty_bodies_are_skipped() {
        let raw = "SUMMARY: s\n[File: a.ts, Line: 2]\n[File: b.ts, Line: 3]\nreal body\nVERDICT: comment";
        let parsed = parse_response(raw);
        assert_eq!(parsed.comments.len(), 1);
        assert_eq!(parsed.comments[0].path, "b.ts");
    }

    #[test]
    fn suggestion_blocks_are_captured() {
        let raw = "SUMMARY: s\n[File: a.ts, Line: 2]\nUse this:\n```suggestion\nconst x = 1;\n```\nVERDICT: comment";
        let parsed = parse_response(raw);
        assert_eq!(parsed.comments[0].suggestion.as_deref(), Some("const x = 1;"));
    }
}

//! Provider-agnostic data model for pull requests, diffs and reviews.
//!
//! These are the normalized shapes the orchestrator consumes; the
//! GitLab/GitHub clients map their REST payloads into them.

use serde::{Deserialize, Serialize};

use diff_engine::DiffHunk;

/// A unique reference to a pull/merge request inside a provider.
///
/// * `project`: GitLab "group/project" (or numeric id as string),
///   GitHub "owner/repo".
/// * `number`: MR IID or PR number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrId {
    pub project: String,
    pub number: u64,
}

/// High-level PR metadata the review pipeline needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrMeta {
    pub id: PrId,
    pub title: String,
    pub description: Option<String>,
    pub author: String,
    pub head_sha: String,
    pub base_sha: String,
    pub source_branch: Option<String>,
    pub target_branch: Option<String>,
    pub web_url: Option<String>,
}

/// File-level change status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

/// One changed file with parsed hunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    /// Post-state path (old path for deletions).
    pub path: String,
    pub old_path: Option<String>,
    pub status: DiffStatus,
    pub additions: u32,
    pub deletions: u32,
    pub is_binary: bool,
    pub hunks: Vec<DiffHunk>,
    /// Raw unified diff text, kept for prompt assembly.
    pub raw_unidiff: Option<String>,
}

/// File listing entry with an inferred language hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub language: Option<String>,
}

/// Severity of one inline comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Review verdict, mapped to a host vote where supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    RequestChanges,
    Comment,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::RequestChanges => "request_changes",
            Self::Comment => "comment",
        }
    }
}

/// One inline review comment, 1-indexed post-state line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub path: String,
    pub line: u32,
    pub body: String,
    pub severity: Severity,
    pub confidence: Option<f32>,
    pub suggestion: Option<String>,
}

/// Full review output ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutput {
    pub summary: String,
    pub comments: Vec<ReviewComment>,
    pub verdict: Verdict,
}

/// A comment already present on the PR, with its replies (used for
/// checkpoint discovery, dedup markers and dismissal detection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingComment {
    pub id: String,
    pub body: String,
    pub replies: Vec<String>,
}

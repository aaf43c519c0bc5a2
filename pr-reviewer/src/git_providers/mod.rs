//! Host adapters (GitLab, GitHub) behind one enum-dispatch client.
//!
//! The orchestrator only sees the operations in [`ProviderClient`]; each
//! host client maps its REST payloads into the normalized types and the
//! shared error mapping (401 -> Unauthorized, 429 -> RateLimited, ...).
//! Hosts that cannot return a unified diff for a file fall back to
//! fetching both snapshots and running the local diff engine.

pub mod github;
pub mod gitlab;
pub mod types;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ReviewResult};
use github::GitHubClient;
use gitlab::GitLabClient;
pub use types::{
    DiffStatus, ExistingComment, FileDiff, FileInfo, PrId, PrMeta, ReviewComment, ReviewOutput,
    Severity, Verdict,
};

/// Supported hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    GitLab,
    GitHub,
}

/// Connection settings for one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Base API URL, e.g. `https://gitlab.com/api/v4` or
    /// `https://api.github.com`.
    pub base_api: String,
    pub token: String,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if !(self.base_api.starts_with("http://") || self.base_api.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_api.clone()));
        }
        Ok(())
    }
}

/// Enum-dispatched provider client (no `async-trait`, no boxed objects).
pub enum ProviderClient {
    GitLab(GitLabClient),
    GitHub(GitHubClient),
}

impl ProviderClient {
    pub fn from_config(config: ProviderConfig) -> ReviewResult<Self> {
        config.validate()?;
        Ok(match config.kind {
            ProviderKind::GitLab => Self::GitLab(GitLabClient::new(config)?),
            ProviderKind::GitHub => Self::GitHub(GitHubClient::new(config)?),
        })
    }

    pub async fn get_pr(&self, id: &PrId) -> ReviewResult<PrMeta> {
        match self {
            Self::GitLab(c) => c.get_pr(id).await,
            Self::GitHub(c) => c.get_pr(id).await,
        }
    }

    /// Changed files with parsed hunks; `since_sha` restricts the diff to
    /// commits after a checkpoint.
    pub async fn get_diff(&self, id: &PrId, since_sha: Option<&str>) -> ReviewResult<Vec<FileDiff>> {
        match self {
            Self::GitLab(c) => c.get_diff(id, since_sha).await,
            Self::GitHub(c) => c.get_diff(id, since_sha).await,
        }
    }

    pub async fn get_files(&self, id: &PrId) -> ReviewResult<Vec<FileInfo>> {
        match self {
            Self::GitLab(c) => c.get_files(id).await,
            Self::GitHub(c) => c.get_files(id).await,
        }
    }

    /// File bytes at a ref; empty on 404 (non-fatal by contract).
    pub async fn get_file_content(&self, id: &PrId, path: &str, r: &str) -> ReviewResult<Vec<u8>> {
        match self {
            Self::GitLab(c) => c.get_file_content(id, path, r).await,
            Self::GitHub(c) => c.get_file_content(id, path, r).await,
        }
    }

    pub async fn add_inline_comment(
        &self,
        meta: &PrMeta,
        path: &str,
        line: u32,
        body: &str,
    ) -> ReviewResult<()> {
        match self {
            Self::GitLab(c) => c.add_inline_comment(meta, path, line, body).await,
            Self::GitHub(c) => c.add_inline_comment(meta, path, line, body).await,
        }
    }

    /// Post a general PR comment; returns the host comment id.
    pub async fn post_comment(&self, id: &PrId, body: &str) -> ReviewResult<String> {
        match self {
            Self::GitLab(c) => c.post_comment(id, body).await,
            Self::GitHub(c) => c.post_comment(id, body).await,
        }
    }

    /// Rewrite an existing general comment (checkpoint upsert).
    pub async fn update_comment(
        &self,
        id: &PrId,
        comment_id: &str,
        body: &str,
    ) -> ReviewResult<()> {
        match self {
            Self::GitLab(c) => c.update_comment(id, comment_id, body).await,
            Self::GitHub(c) => c.update_comment(id, comment_id, body).await,
        }
    }

    /// Every comment on the PR with its replies.
    pub async fn list_comments(&self, id: &PrId) -> ReviewResult<Vec<ExistingComment>> {
        match self {
            Self::GitLab(c) => c.list_comments(id).await,
            Self::GitHub(c) => c.list_comments(id).await,
        }
    }

    /// Post the summary and set the host vote for the verdict.
    pub async fn submit_review(&self, id: &PrId, output: &ReviewOutput) -> ReviewResult<()> {
        match self {
            Self::GitLab(c) => c.submit_review(id, output).await,
            Self::GitHub(c) => c.submit_review(id, output).await,
        }
    }
}

lazy_static! {
    static ref TICKET_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b[A-Z]+-\d+\b").expect("static regex"),
        Regex::new(r"\bAB#\d+\b").expect("static regex"),
        Regex::new(r"#\d+\b").expect("static regex"),
    ];
}

/// Ticket keys referenced in the PR title/description.
pub fn linked_tickets(title: &str, description: Option<&str>) -> Vec<String> {
    let mut text = title.to_string();
    if let Some(d) = description {
        text.push('\n');
        text.push_str(d);
    }

    let mut out: Vec<String> = Vec::new();
    for pattern in TICKET_PATTERNS.iter() {
        for m in pattern.find_iter(&text) {
            let key = m.as_str().to_string();
            if !out.contains(&key) {
                out.push(key);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_from_title_and_description() {
        let tickets = linked_tickets(
            "PROJ-123: fix login",
            Some("Relates to AB#42 and closes #17. Also PROJ-123 again."),
        );
        assert_eq!(tickets, vec!["PROJ-123", "AB#42", "#42", "#17"]);
    }
}

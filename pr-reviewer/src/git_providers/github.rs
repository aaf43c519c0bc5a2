//! GitHub provider (REST v3).
//!
//! Endpoints used:
//! - GET  /repos/{owner}/{repo}/pulls/{n}
//! - GET  /repos/{owner}/{repo}/pulls/{n}/files
//! - GET  /repos/{owner}/{repo}/compare/{base}...{head}
//! - GET  /repos/{owner}/{repo}/contents/{path}?ref=   (raw accept header)
//! - POST /repos/{owner}/{repo}/pulls/{n}/comments     (inline, RIGHT side)
//! - POST /repos/{owner}/{repo}/issues/{n}/comments    (general)
//! - PATCH /repos/{owner}/{repo}/issues/comments/{id}
//! - GET  /repos/{owner}/{repo}/pulls/{n}/comments + issues comments
//! - POST /repos/{owner}/{repo}/pulls/{n}/reviews      (verdict vote)

use std::collections::HashMap;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use diff_engine::{DiffOptions, diff_snapshots, parse_unified, stats};

use crate::errors::{ProviderError, ReviewResult};
use crate::git_providers::ProviderConfig;
use crate::git_providers::gitlab::language_hint;
use crate::git_providers::types::*;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    sha: String,
    #[serde(rename = "ref")]
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    title: String,
    body: Option<String>,
    user: GhUser,
    html_url: Option<String>,
    head: GhRef,
    base: GhRef,
}

#[derive(Debug, Deserialize)]
struct GhFile {
    filename: String,
    previous_filename: Option<String>,
    status: String,
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GhCompare {
    files: Vec<GhFile>,
}

#[derive(Debug, Deserialize)]
struct GhComment {
    id: u64,
    body: Option<String>,
    in_reply_to_id: Option<u64>,
}

impl GitHubClient {
    pub fn new(config: ProviderConfig) -> ReviewResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| ProviderError::InvalidResponse("token has invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(USER_AGENT, HeaderValue::from_static("pr-reviewer"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_api: config.base_api.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, id: &PrId, tail: &str) -> String {
        format!("{}/repos/{}{}", self.base_api, id.project, tail)
    }

    pub async fn get_pr(&self, id: &PrId) -> ReviewResult<PrMeta> {
        let resp: GhPull = self
            .http
            .get(self.repo_url(id, &format!("/pulls/{}", id.number)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PrMeta {
            id: id.clone(),
            title: resp.title,
            description: resp.body,
            author: resp.user.login,
            head_sha: resp.head.sha,
            base_sha: resp.base.sha,
            source_branch: resp.head.branch,
            target_branch: resp.base.branch,
            web_url: resp.html_url,
        })
    }

    pub async fn get_diff(&self, id: &PrId, since_sha: Option<&str>) -> ReviewResult<Vec<FileDiff>> {
        let (files, head_sha, base_sha) = match since_sha {
            Some(from) => {
                let meta = self.get_pr(id).await?;
                let url = self.repo_url(id, &format!("/compare/{}...{}", from, meta.head_sha));
                let resp: GhCompare = self
                    .http
                    .get(url)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                (resp.files, meta.head_sha, from.to_string())
            }
            None => {
                let meta = self.get_pr(id).await?;
                let files: Vec<GhFile> = self
                    .http
                    .get(self.repo_url(id, &format!("/pulls/{}/files?per_page=100", id.number)))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                (files, meta.head_sha, meta.base_sha)
            }
        };

        let mut out = Vec::with_capacity(files.len());
        for file in files {
            out.push(self.normalize_file(id, file, &base_sha, &head_sha).await?);
        }
        Ok(out)
    }

    /// A missing `patch` on a text file means GitHub withheld the diff
    /// (too large); fall back to diffing the two snapshots locally.
    async fn normalize_file(
        &self,
        id: &PrId,
        file: GhFile,
        base_sha: &str,
        head_sha: &str,
    ) -> ReviewResult<FileDiff> {
        let status = match file.status.as_str() {
            "added" => DiffStatus::Added,
            "removed" => DiffStatus::Deleted,
            "renamed" => DiffStatus::Renamed,
            _ => DiffStatus::Modified,
        };
        let path = file.filename;
        let is_binary = file.patch.is_none() && status != DiffStatus::Renamed && {
            // Binary vs oversized text is not distinguishable from the
            // listing; probing the blob settles it.
            let probe = self.get_file_content(id, &path, head_sha).await?;
            probe.contains(&0u8)
        };

        let (hunks, raw_unidiff) = match (&file.patch, is_binary) {
            (_, true) => (Vec::new(), None),
            (Some(patch), _) => (parse_unified(patch), Some(patch.clone())),
            (None, _) if status == DiffStatus::Modified || status == DiffStatus::Added => {
                debug!("github: no patch for {}, diffing snapshots locally", path);
                let old = if status == DiffStatus::Added {
                    Vec::new()
                } else {
                    self.get_file_content(id, &path, base_sha).await?
                };
                let new = self.get_file_content(id, &path, head_sha).await?;
                let hunks = diff_snapshots(
                    &String::from_utf8_lossy(&old),
                    &String::from_utf8_lossy(&new),
                    &DiffOptions::default(),
                );
                let raw = diff_engine::render_unified(&path, &hunks);
                (hunks, Some(raw))
            }
            (None, _) => (Vec::new(), None),
        };

        let (additions, deletions) = stats(&hunks);
        Ok(FileDiff {
            old_path: file.previous_filename,
            path,
            status,
            additions,
            deletions,
            is_binary,
            hunks,
            raw_unidiff,
        })
    }

    pub async fn get_files(&self, id: &PrId) -> ReviewResult<Vec<FileInfo>> {
        let diffs = self.get_diff(id, None).await?;
        Ok(diffs
            .into_iter()
            .map(|d| FileInfo {
                language: language_hint(&d.path),
                path: d.path,
            })
            .collect())
    }

    pub async fn get_file_content(&self, id: &PrId, path: &str, r: &str) -> ReviewResult<Vec<u8>> {
        let url = self.repo_url(id, &format!("/contents/{}?ref={}", path, urlencoding::encode(r)));
        let resp = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github.raw+json")
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            warn!("github: {} not found at {}", path, r);
            return Ok(Vec::new());
        }
        Ok(resp.error_for_status()?.bytes().await?.to_vec())
    }

    pub async fn add_inline_comment(
        &self,
        meta: &PrMeta,
        path: &str,
        line: u32,
        body: &str,
    ) -> ReviewResult<()> {
        let payload = json!({
            "body": body,
            "commit_id": meta.head_sha,
            "path": path,
            "line": line,
            "side": "RIGHT",
        });
        self.http
            .post(self.repo_url(&meta.id, &format!("/pulls/{}/comments", meta.id.number)))
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn post_comment(&self, id: &PrId, body: &str) -> ReviewResult<String> {
        let resp: GhComment = self
            .http
            .post(self.repo_url(id, &format!("/issues/{}/comments", id.number)))
            .json(&json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.id.to_string())
    }

    pub async fn update_comment(&self, id: &PrId, comment_id: &str, body: &str) -> ReviewResult<()> {
        self.http
            .patch(self.repo_url(id, &format!("/issues/comments/{comment_id}")))
            .json(&json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Review comments (threaded by `in_reply_to_id`) plus issue comments.
    pub async fn list_comments(&self, id: &PrId) -> ReviewResult<Vec<ExistingComment>> {
        let review_comments: Vec<GhComment> = self
            .http
            .get(self.repo_url(id, &format!("/pulls/{}/comments?per_page=100", id.number)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let issue_comments: Vec<GhComment> = self
            .http
            .get(self.repo_url(id, &format!("/issues/{}/comments?per_page=100", id.number)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut roots: Vec<ExistingComment> = Vec::new();
        let mut index: HashMap<u64, usize> = HashMap::new();
        for comment in &review_comments {
            if comment.in_reply_to_id.is_none() {
                index.insert(comment.id, roots.len());
                roots.push(ExistingComment {
                    id: comment.id.to_string(),
                    body: comment.body.clone().unwrap_or_default(),
                    replies: Vec::new(),
                });
            }
        }
        for comment in &review_comments {
            if let Some(parent) = comment.in_reply_to_id {
                if let Some(&slot) = index.get(&parent) {
                    roots[slot]
                        .replies
                        .push(comment.body.clone().unwrap_or_default());
                }
            }
        }
        for comment in issue_comments {
            roots.push(ExistingComment {
                id: comment.id.to_string(),
                body: comment.body.unwrap_or_default(),
                replies: Vec::new(),
            });
        }
        Ok(roots)
    }

    /// One review submission carries the summary and the verdict event.
    pub async fn submit_review(&self, id: &PrId, output: &ReviewOutput) -> ReviewResult<()> {
        let event = match output.verdict {
            Verdict::Approve => "APPROVE",
            Verdict::RequestChanges => "REQUEST_CHANGES",
            Verdict::Comment => "COMMENT",
        };
        self.http
            .post(self.repo_url(id, &format!("/pulls/{}/reviews", id.number)))
            .json(&json!({ "body": output.summary, "event": event }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

//! GitLab provider (REST v4).
//!
//! Endpoints used:
//! - GET  /projects/:id/merge_requests/:iid
//! - GET  /projects/:id/merge_requests/:iid/diffs
//! - GET  /repository/compare?from=:sha&to=:sha      (checkpoint-bounded diff)
//! - GET  /repository/files/:path/raw?ref=:sha
//! - POST /projects/:id/merge_requests/:iid/discussions   (inline)
//! - POST /projects/:id/merge_requests/:iid/notes         (general)
//! - PUT  /projects/:id/merge_requests/:iid/notes/:note_id
//! - GET  /projects/:id/merge_requests/:iid/discussions   (existing + replies)
//! - POST /projects/:id/merge_requests/:iid/approve       (verdict vote)

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use diff_engine::{DiffOptions, diff_snapshots, looks_like_binary_patch, parse_unified, stats};

use crate::errors::ReviewResult;
use crate::git_providers::ProviderConfig;
use crate::git_providers::types::*;

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct GlDiffRefs {
    base_sha: String,
    head_sha: String,
}

#[derive(Debug, Deserialize)]
struct GlAuthor {
    username: String,
}

#[derive(Debug, Deserialize)]
struct GlMr {
    title: String,
    description: Option<String>,
    author: GlAuthor,
    web_url: Option<String>,
    source_branch: Option<String>,
    target_branch: Option<String>,
    diff_refs: GlDiffRefs,
}

#[derive(Debug, Deserialize)]
struct GlDiff {
    old_path: String,
    new_path: String,
    new_file: bool,
    renamed_file: bool,
    deleted_file: bool,
    diff: String,
}

#[derive(Debug, Deserialize)]
struct GlCompare {
    diffs: Vec<GlDiff>,
}

#[derive(Debug, Deserialize)]
struct GlNote {
    id: u64,
    body: String,
}

#[derive(Debug, Deserialize)]
struct GlDiscussion {
    notes: Vec<GlNote>,
}

impl GitLabClient {
    pub fn new(config: ProviderConfig) -> ReviewResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_api: config.base_api.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn mr_url(&self, id: &PrId, tail: &str) -> String {
        format!(
            "{}/projects/{}/merge_requests/{}{}",
            self.base_api,
            urlencoding::encode(&id.project),
            id.number,
            tail
        )
    }

    pub async fn get_pr(&self, id: &PrId) -> ReviewResult<PrMeta> {
        let resp: GlMr = self
            .http
            .get(self.mr_url(id, ""))
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PrMeta {
            id: id.clone(),
            title: resp.title,
            description: resp.description,
            author: resp.author.username,
            head_sha: resp.diff_refs.head_sha,
            base_sha: resp.diff_refs.base_sha,
            source_branch: resp.source_branch,
            target_branch: resp.target_branch,
            web_url: resp.web_url,
        })
    }

    pub async fn get_diff(&self, id: &PrId, since_sha: Option<&str>) -> ReviewResult<Vec<FileDiff>> {
        let raw = match since_sha {
            Some(from) => {
                let meta = self.get_pr(id).await?;
                let url = format!(
                    "{}/projects/{}/repository/compare?from={}&to={}",
                    self.base_api,
                    urlencoding::encode(&id.project),
                    urlencoding::encode(from),
                    urlencoding::encode(&meta.head_sha),
                );
                let resp: GlCompare = self
                    .http
                    .get(url)
                    .header("PRIVATE-TOKEN", &self.token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                resp.diffs
            }
            None => self
                .http
                .get(self.mr_url(id, "/diffs?per_page=100"))
                .header("PRIVATE-TOKEN", &self.token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?,
        };

        let mut out = Vec::with_capacity(raw.len());
        for diff in raw {
            out.push(self.normalize_diff(id, diff).await?);
        }
        Ok(out)
    }

    /// Map one GitLab diff entry; an empty diff body on a text file means
    /// the host truncated it, so the two snapshots are diffed locally.
    async fn normalize_diff(&self, id: &PrId, diff: GlDiff) -> ReviewResult<FileDiff> {
        let status = if diff.new_file {
            DiffStatus::Added
        } else if diff.deleted_file {
            DiffStatus::Deleted
        } else if diff.renamed_file {
            DiffStatus::Renamed
        } else {
            DiffStatus::Modified
        };
        let path = if diff.deleted_file {
            diff.old_path.clone()
        } else {
            diff.new_path.clone()
        };

        let is_binary = looks_like_binary_patch(&diff.diff);
        let (hunks, raw_unidiff) = if is_binary {
            (Vec::new(), None)
        } else if diff.diff.is_empty() && status == DiffStatus::Modified {
            debug!("gitlab: empty diff for {}, diffing snapshots locally", path);
            let meta = self.get_pr(id).await?;
            let old = self.get_file_content(id, &diff.old_path, &meta.base_sha).await?;
            let new = self.get_file_content(id, &diff.new_path, &meta.head_sha).await?;
            let hunks = diff_snapshots(
                &String::from_utf8_lossy(&old),
                &String::from_utf8_lossy(&new),
                &DiffOptions::default(),
            );
            let raw = diff_engine::render_unified(&path, &hunks);
            (hunks, Some(raw))
        } else {
            (parse_unified(&diff.diff), Some(diff.diff.clone()))
        };

        let (additions, deletions) = stats(&hunks);
        Ok(FileDiff {
            old_path: Some(diff.old_path).filter(|p| *p != path),
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
        let url = format!(
            "{}/projects/{}/repository/files/{}/raw?ref={}",
            self.base_api,
            urlencoding::encode(&id.project),
            urlencoding::encode(path),
            urlencoding::encode(r),
        );
        let resp = self
            .http
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            warn!("gitlab: {} not found at {}", path, r);
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
            "position": {
                "position_type": "text",
                "base_sha": meta.base_sha,
                "head_sha": meta.head_sha,
                "start_sha": meta.base_sha,
                "new_path": path,
                "new_line": line,
            }
        });
        self.http
            .post(self.mr_url(&meta.id, "/discussions"))
            .header("PRIVATE-TOKEN", &self.token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn post_comment(&self, id: &PrId, body: &str) -> ReviewResult<String> {
        let resp: GlNote = self
            .http
            .post(self.mr_url(id, "/notes"))
            .header("PRIVATE-TOKEN", &self.token)
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
            .put(self.mr_url(id, &format!("/notes/{comment_id}")))
            .header("PRIVATE-TOKEN", &self.token)
            .json(&json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn list_comments(&self, id: &PrId) -> ReviewResult<Vec<ExistingComment>> {
        let discussions: Vec<GlDiscussion> = self
            .http
            .get(self.mr_url(id, "/discussions?per_page=100"))
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(discussions
            .into_iter()
            .filter_map(|d| {
                let mut notes = d.notes.into_iter();
                let first = notes.next()?;
                Some(ExistingComment {
                    id: first.id.to_string(),
                    body: first.body,
                    replies: notes.map(|n| n.body).collect(),
                })
            })
            .collect())
    }

    /// Posts the summary note, then maps the verdict onto approval state.
    pub async fn submit_review(&self, id: &PrId, output: &ReviewOutput) -> ReviewResult<()> {
        self.post_comment(id, &output.summary).await?;
        match output.verdict {
            Verdict::Approve => {
                self.http
                    .post(self.mr_url(id, "/approve"))
                    .header("PRIVATE-TOKEN", &self.token)
                    .send()
                    .await?
                    .error_for_status()?;
            }
            Verdict::RequestChanges | Verdict::Comment => {
                // GitLab has no negative vote; a previous approval is
                // withdrawn on request_changes.
                if output.verdict == Verdict::RequestChanges {
                    let resp = self
                        .http
                        .post(self.mr_url(id, "/unapprove"))
                        .header("PRIVATE-TOKEN", &self.token)
                        .send()
                        .await?;
                    if !resp.status().is_success()
                        && resp.status() != reqwest::StatusCode::NOT_FOUND
                    {
                        resp.error_for_status()?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Rough language hint by extension, for the file listing.
pub(crate) fn language_hint(path: &str) -> Option<String> {
    code_parsers::registry::Language::from_path(path).map(|l| l.name().to_string())
}

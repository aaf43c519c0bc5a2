//! Per-PR review checkpoints, persisted as a sentinel-wrapped host
//! comment.
//!
//! Body shape:
//! `<!-- AGNUSAI_CHECKPOINT: {"sha":"...","timestamp":...,"filesReviewed":[...],"commentCount":N,"verdict":"..."} -->`
//! followed by a human-readable summary. Malformed JSON inside the
//! sentinel is reported (the caller logs and falls back to a full
//! review), never silently ignored.

use serde::{Deserialize, Serialize};

use crate::git_providers::types::ExistingComment;

pub const CHECKPOINT_PREFIX: &str = "<!-- AGNUSAI_CHECKPOINT:";
const CHECKPOINT_SUFFIX: &str = "-->";

/// State of the last finished review on a PR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub sha: String,
    /// Unix seconds of the review that wrote this checkpoint.
    pub timestamp: i64,
    pub files_reviewed: Vec<String>,
    pub comment_count: u32,
    pub verdict: String,
}

/// Where a checkpoint was found (host comment id, for upserts).
#[derive(Debug)]
pub struct FoundCheckpoint {
    pub comment_id: String,
    pub checkpoint: Result<Checkpoint, serde_json::Error>,
}

impl Checkpoint {
    /// Render the host comment body: sentinel line plus summary.
    pub fn encode(&self, human_summary: &str) -> String {
        let json = serde_json::to_string(self).expect("checkpoint serializes");
        format!("{CHECKPOINT_PREFIX} {json} {CHECKPOINT_SUFFIX}\n\n{human_summary}")
    }

    /// Parse a checkpoint out of one comment body, if the sentinel is
    /// present. A present-but-corrupt payload returns `Some(Err(_))`.
    pub fn parse(body: &str) -> Option<Result<Self, serde_json::Error>> {
        let start = body.find(CHECKPOINT_PREFIX)?;
        let after = &body[start + CHECKPOINT_PREFIX.len()..];
        let end = after.find(CHECKPOINT_SUFFIX)?;
        Some(serde_json::from_str(after[..end].trim()))
    }

    /// Locate the checkpoint comment on a PR.
    pub fn find(existing: &[ExistingComment]) -> Option<FoundCheckpoint> {
        existing.iter().find_map(|comment| {
            Checkpoint::parse(&comment.body).map(|checkpoint| FoundCheckpoint {
                comment_id: comment.id.clone(),
                checkpoint,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checkpoint {
        Checkpoint {
            sha: "abc123".into(),
            timestamp: 1_722_470_400,
            files_reviewed: vec!["src/a.ts".into(), "src/b.ts".into()],
            comment_count: 2,
            verdict: "comment".into(),
        }
    }

    #[test]
    fn round_trip_through_a_host_comment() {
        let checkpoint = sample();
        let body = checkpoint.encode("Reviewed 2 files, 2 comments.");
        assert!(body.starts_with(CHECKPOINT_PREFIX));
        assert!(body.contains("\"filesReviewed\""));

        let parsed = Checkpoint::parse(&body).expect("sentinel present").unwrap();
        assert_eq!(parsed, checkpoint);
    }

    #[test]
    fn corrupt_json_reports_instead_of_hiding() {
        let body = sample().encode("summary");
        let corrupted = body.replace("\"sha\"", "\"sh");
        let result = Checkpoint::parse(&corrupted).expect("sentinel still present");
        assert!(result.is_err());
    }

    #[test]
    fn find_scans_all_comments() {
        let comments = vec![
            ExistingComment {
                id: "10".into(),
                body: "just a human comment".into(),
                replies: vec![],
            },
            ExistingComment {
                id: "11".into(),
                body: sample().encode("summary"),
                replies: vec![],
            },
        ];
        let found = Checkpoint::find(&comments).expect("found");
        assert_eq!(found.comment_id, "11");
        assert_eq!(found.checkpoint.unwrap().sha, "abc123");
    }

    #[test]
    fn absent_sentinel_is_none() {
        assert!(Checkpoint::parse("no sentinel here").is_none());
    }
}

//! Row types crossing the storage boundary.

use serde::{Deserialize, Serialize};

/// Developer rating attached to one posted comment. Latest wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignal {
    Accepted,
    Rejected,
}

impl FeedbackSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One finished review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub repo_id: String,
    pub pr_id: String,
    pub head_sha: String,
    pub verdict: String,
    pub summary: String,
    pub comment_count: u32,
}

/// One posted comment, id = content-addressed dedup id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCommentRecord {
    pub id: String,
    pub repo_id: String,
    pub pr_id: String,
    pub path: String,
    pub line: u32,
    pub body: String,
    pub severity: String,
    pub confidence: Option<f32>,
    /// Embedding of the body, when an embedder was configured.
    pub embedding: Option<Vec<f32>>,
}

/// Comment joined with its latest feedback signal, for RAG retrieval.
#[derive(Debug, Clone)]
pub struct RatedComment {
    pub id: String,
    pub path: String,
    pub line: u32,
    pub body: String,
    pub signal: FeedbackSignal,
    pub embedding: Option<Vec<f32>>,
}

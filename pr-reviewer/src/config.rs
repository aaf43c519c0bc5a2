//! Review configuration, env-overridable with documented defaults.

use serde::{Deserialize, Serialize};

use crate::retriever::ReviewDepth;

/// Tunables for one review run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Maximum diff characters injected into the prompt. Past this the
    /// diff is cut and the model is told not to comment on unseen files.
    pub max_diff_size: usize,
    /// Precision filter threshold; comments below it are dropped.
    pub confidence_threshold: f32,
    /// Analysis depth (hop counts, semantic neighbours).
    pub depth: ReviewDepth,
    /// Directory holding skill snippets; `None` disables skills.
    pub skills_dir: Option<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_diff_size: 50_000,
            confidence_threshold: 0.7,
            depth: ReviewDepth::Standard,
            skills_dir: None,
        }
    }
}

impl ReviewConfig {
    /// Defaults overlaid with `REVIEW_MAX_DIFF_SIZE`,
    /// `REVIEW_CONFIDENCE_THRESHOLD`, `REVIEW_DEPTH` and
    /// `REVIEW_SKILLS_DIR`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("REVIEW_MAX_DIFF_SIZE") {
            if let Ok(n) = v.parse() {
                cfg.max_diff_size = n;
            }
        }
        if let Ok(v) = std::env::var("REVIEW_CONFIDENCE_THRESHOLD") {
            if let Ok(t) = v.parse::<f32>() {
                cfg.confidence_threshold = t.clamp(0.0, 1.0);
            }
        }
        if let Ok(v) = std::env::var("REVIEW_DEPTH") {
            cfg.depth = match v.to_ascii_lowercase().as_str() {
                "fast" => ReviewDepth::Fast,
                "deep" => ReviewDepth::Deep,
                _ => ReviewDepth::Standard,
            };
        }
        if let Ok(v) = std::env::var("REVIEW_SKILLS_DIR") {
            if !v.is_empty() {
                cfg.skills_dir = Some(v);
            }
        }
        cfg
    }
}

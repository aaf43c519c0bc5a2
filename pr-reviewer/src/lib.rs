//! Graph-aware pull-request review pipeline.
//!
//! End-to-end flow for one PR:
//! 1. provider I/O: metadata, diff (optionally bounded by a checkpoint),
//!    existing comments;
//! 2. retrieval: changed symbols, callers/callees, blast radius, semantic
//!    neighbours and feedback-rated prior examples from the symbol graph
//!    ([`retriever`]);
//! 3. prompt assembly and one LLM generation ([`prompt`]);
//! 4. parsing, the precision filter, path/line validation, content-hash
//!    dedup ([`response`], [`policy`]);
//! 5. posting: inline comments with hidden dedup markers and feedback
//!    links, the summary with the host vote, and the sentinel checkpoint
//!    ([`review`], [`checkpoint`], [`feedback`]).
//!
//! No `async-trait` and no boxed trait objects; provider and LLM dispatch
//! are enum-based. Errors are unified by the crate-level error type.

pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod errors;
pub mod feedback;
pub mod git_providers;
pub mod policy;
pub mod prompt;
pub mod response;
pub mod retriever;
pub mod review;
pub mod skills;

pub use cache::{GraphCache, RepoGraphHandle};
pub use checkpoint::Checkpoint;
pub use config::ReviewConfig;
pub use errors::{Error, ProviderError, ReviewResult};
pub use feedback::FeedbackSigner;
pub use git_providers::{
    PrId, PrMeta, ProviderClient, ProviderConfig, ProviderKind, ReviewComment, ReviewOutput,
    Severity, Verdict, linked_tickets,
};
pub use retriever::{ReviewContext, ReviewDepth, Retriever};
pub use review::{ReviewOutcome, run_review};

use graph_store::{FeedbackSignal, GraphStore};
use tracing::{info, warn};

/// Handle one feedback click: verify the token in constant time, then
/// record the signal (latest wins). Returns `false` for an invalid
/// token; the HTTP layer answers 401 and records nothing.
pub async fn record_feedback(
    store: &GraphStore,
    signer: &FeedbackSigner,
    comment_id: &str,
    signal: FeedbackSignal,
    token: &str,
) -> ReviewResult<bool> {
    if !signer.verify(comment_id, signal, token) {
        warn!("feedback: invalid token for comment {}", comment_id);
        return Ok(false);
    }
    store.upsert_feedback(comment_id, signal).await?;
    info!("feedback: {} recorded for {}", signal.as_str(), comment_id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn feedback_round_trip_records_only_valid_tokens() {
        let store = GraphStore::in_memory().unwrap();
        let signer = FeedbackSigner::new(Some("https://r.example".into()), Some("s3cret".into()));

        let token = signer.mint("c-1", FeedbackSignal::Accepted).unwrap();
        assert!(
            record_feedback(&store, &signer, "c-1", FeedbackSignal::Accepted, &token)
                .await
                .unwrap()
        );

        // Tampered token is refused and leaves no row behind.
        assert!(
            !record_feedback(&store, &signer, "c-2", FeedbackSignal::Accepted, "deadbeef")
                .await
                .unwrap()
        );
    }
}

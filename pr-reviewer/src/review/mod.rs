//! Review orchestrator: context -> prompt -> LLM -> policy -> host.
//!
//! Drives one PR review end to end, in both full and incremental modes.
//! Incremental mode pins its diff boundary to the checkpoint comment
//! found on the PR; a malformed checkpoint falls back to a full review
//! with a warning, and an up-to-date checkpoint exits early.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use ai_llm_service::LlmClient;
use diff_engine::{annotate_for_llm, render_unified};
use graph_store::{ReviewCommentRecord, ReviewRecord};

use crate::cache::RepoGraphHandle;
use crate::checkpoint::Checkpoint;
use crate::config::ReviewConfig;
use crate::errors::ReviewResult;
use crate::feedback::FeedbackSigner;
use crate::git_providers::types::{FileDiff, PrId, PrMeta, ReviewOutput, Verdict};
use crate::git_providers::ProviderClient;
use crate::policy::{
    apply_precision_filter, dedup_comments, dedup_id, is_reviewable, marker_for,
    validate_against_diff,
};
use crate::prompt::{PromptInput, build_review_prompt, truncate_diff};
use crate::response::parse_response;
use crate::retriever::{ReviewContext, changed_paths_from_diff, render_context};
use crate::skills::{load_skills, matching_skills};

/// What one review run did.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub output: ReviewOutput,
    /// Inline comments actually posted (after filtering and dedup).
    pub posted: usize,
    /// True when an incremental run found the head sha already reviewed.
    pub no_new_commits: bool,
}

/// Run one review end to end.
///
/// `handle` is the live graph entry for (repo, branch); with `None` the
/// review degrades to a flat-diff review (empty context). `incremental`
/// bounds the diff to commits since the last checkpoint.
pub async fn run_review(
    client: &ProviderClient,
    pr_id: &PrId,
    handle: Option<&Arc<RepoGraphHandle>>,
    llm: &LlmClient,
    config: &ReviewConfig,
    signer: &FeedbackSigner,
    incremental: bool,
) -> ReviewResult<ReviewOutcome> {
    let t0 = Instant::now();

    debug!("review: fetch meta for {}!{}", pr_id.project, pr_id.number);
    let meta = client.get_pr(pr_id).await?;
    let existing = client.list_comments(pr_id).await?;

    // Checkpoint discovery pins the incremental boundary.
    let found_checkpoint = Checkpoint::find(&existing);
    let checkpoint_comment_id = found_checkpoint.as_ref().map(|f| f.comment_id.clone());
    let mut since_sha: Option<String> = None;
    if incremental {
        match found_checkpoint.map(|f| f.checkpoint) {
            Some(Ok(checkpoint)) => {
                if checkpoint.sha == meta.head_sha {
                    info!("review: checkpoint matches head {}, nothing to do", meta.head_sha);
                    return Ok(ReviewOutcome {
                        output: ReviewOutput {
                            summary: "No new commits since the last review.".into(),
                            comments: Vec::new(),
                            verdict: Verdict::Comment,
                        },
                        posted: 0,
                        no_new_commits: true,
                    });
                }
                debug!("review: incremental since {}", checkpoint.sha);
                since_sha = Some(checkpoint.sha);
            }
            Some(Err(e)) => {
                warn!("review: malformed checkpoint, falling back to full review: {}", e);
            }
            None => debug!("review: no checkpoint found, full review"),
        }
    }

    debug!("review: fetch diff (since={:?})", since_sha);
    let diffs = client.get_diff(pr_id, since_sha.as_deref()).await?;
    let reviewable: Vec<FileDiff> = diffs.into_iter().filter(is_reviewable).collect();
    if reviewable.is_empty() {
        info!("review: no reviewable files, exiting");
        return Ok(ReviewOutcome {
            output: ReviewOutput {
                summary: "No reviewable changes in this update.".into(),
                comments: Vec::new(),
                verdict: Verdict::Comment,
            },
            posted: 0,
            no_new_commits: false,
        });
    }

    // Canonical unified text feeds the retriever; the annotated form
    // (with [Line N] markers) feeds the model.
    let unified_text: String = reviewable
        .iter()
        .map(|d| render_unified(&d.path, &d.hunks))
        .collect();
    let annotated_text: String = reviewable
        .iter()
        .map(|d| format!("### {}\n{}\n", d.path, annotate_for_llm(&d.hunks)))
        .collect();

    let changed_paths = changed_paths_from_diff(&unified_text);
    let skills = match &config.skills_dir {
        Some(dir) => load_skills(Path::new(dir)),
        None => Vec::new(),
    };
    let matched_skills = matching_skills(&skills, &changed_paths);

    let context = match handle {
        Some(handle) => {
            handle
                .retriever()
                .build_context(&unified_text, config.depth)
                .await
        }
        None => {
            debug!("review: no graph loaded, flat-diff review");
            ReviewContext::default()
        }
    };
    let context_md = render_context(&context);

    let (diff_text, truncated) = truncate_diff(&annotated_text, config.max_diff_size);
    let prompt = build_review_prompt(&PromptInput {
        pr_title: &meta.title,
        diff_text: &diff_text,
        truncated,
        context_md: &context_md,
        skills: &matched_skills,
    });

    debug!("review: prompt ready ({} chars), calling llm", prompt.chars().count());
    let raw = llm.generate(&prompt).await?;

    let parsed = parse_response(&raw);
    let (kept, dropped) = apply_precision_filter(parsed.comments, config.confidence_threshold);
    let validated = validate_against_diff(kept, &reviewable);
    let final_comments = dedup_comments(validated, &existing);

    let summary = if final_comments.is_empty() {
        // All comments filtered away is still a successful review.
        if dropped > 0 {
            "No significant issues found (low-confidence findings were filtered).".to_string()
        } else {
            parsed.summary.clone()
        }
    } else {
        parsed.summary.clone()
    };

    let output = ReviewOutput {
        summary: summary.clone(),
        comments: final_comments.clone(),
        verdict: parsed.verdict,
    };

    let posted = post_comments(client, &meta, handle, signer, &output).await;

    client.submit_review(pr_id, &output).await?;

    upsert_checkpoint(
        client,
        pr_id,
        &meta,
        checkpoint_comment_id.as_deref(),
        &reviewable,
        posted,
        output.verdict,
    )
    .await?;

    if let Some(handle) = handle {
        handle
            .store
            .save_review(&ReviewRecord {
                repo_id: handle.repo_id.clone(),
                pr_id: format!("{}!{}", pr_id.project, pr_id.number),
                head_sha: meta.head_sha.clone(),
                verdict: output.verdict.as_str().to_string(),
                summary: summary.clone(),
                comment_count: posted as u32,
            })
            .await?;
    }

    info!(
        "review: done pr={}!{} posted={} verdict={} in {} ms",
        pr_id.project,
        pr_id.number,
        posted,
        output.verdict.as_str(),
        t0.elapsed().as_millis()
    );
    Ok(ReviewOutcome {
        output,
        posted,
        no_new_commits: false,
    })
}

/// Post the surviving inline comments. Per-comment host failures are
/// tolerated: what was posted stays posted, the rest is logged.
async fn post_comments(
    client: &ProviderClient,
    meta: &PrMeta,
    handle: Option<&Arc<RepoGraphHandle>>,
    signer: &FeedbackSigner,
    output: &ReviewOutput,
) -> usize {
    let mut posted = 0usize;
    for comment in &output.comments {
        let id = dedup_id(&comment.path, comment.line, &comment.body);

        let mut body = format!("**[{}]** {}", comment.severity.as_str(), comment.body);
        body.push_str("\n\n");
        body.push_str(&marker_for(&id));
        if let Some(links) = signer.links_markdown(&id) {
            body.push_str(&links);
        }

        if let Err(e) = client
            .add_inline_comment(meta, &comment.path, comment.line, &body)
            .await
        {
            warn!(
                "review: failed to post comment at {}:{}: {}",
                comment.path, comment.line, e
            );
            continue;
        }
        posted += 1;

        if let Some(handle) = handle {
            let embedding = match &handle.embedder {
                Some(embedder) => match embedder.embed(&[comment.body.clone()]).await {
                    Ok(mut v) if !v.is_empty() => Some(v.remove(0)),
                    Ok(_) => None,
                    Err(e) => {
                        warn!("review: comment embedding skipped: {}", e);
                        None
                    }
                },
                None => None,
            };
            let record = ReviewCommentRecord {
                id: id.clone(),
                repo_id: handle.repo_id.clone(),
                pr_id: format!("{}!{}", meta.id.project, meta.id.number),
                path: comment.path.clone(),
                line: comment.line,
                body: comment.body.clone(),
                severity: comment.severity.as_str().to_string(),
                confidence: comment.confidence,
                embedding,
            };
            if let Err(e) = handle.store.save_review_comment(&record).await {
                warn!("review: comment persistence failed for {}: {}", id, e);
            }
        }
    }
    posted
}

/// Write or rewrite the sentinel checkpoint comment.
async fn upsert_checkpoint(
    client: &ProviderClient,
    pr_id: &PrId,
    meta: &PrMeta,
    existing_comment_id: Option<&str>,
    reviewable: &[FileDiff],
    posted: usize,
    verdict: Verdict,
) -> ReviewResult<()> {
    let checkpoint = Checkpoint {
        sha: meta.head_sha.clone(),
        timestamp: chrono::Utc::now().timestamp(),
        files_reviewed: reviewable.iter().map(|d| d.path.clone()).collect(),
        comment_count: posted as u32,
        verdict: verdict.as_str().to_string(),
    };
    let body = checkpoint.encode(&format!(
        "Reviewed {} file(s) at `{}`, {} comment(s).",
        reviewable.len(),
        &meta.head_sha[..meta.head_sha.len().min(12)],
        posted
    ));

    match existing_comment_id {
        Some(comment_id) => client.update_comment(pr_id, comment_id, &body).await?,
        None => {
            client.post_comment(pr_id, &body).await?;
        }
    }
    Ok(())
}

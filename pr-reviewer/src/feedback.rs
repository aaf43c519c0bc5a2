//! Feedback tokens and links for posted comments.
//!
//! Token = hex(HMAC-SHA-256(secret, "<comment_id>:<signal>")), verified
//! in constant time via `Mac::verify_slice`. An empty secret counts as
//! unset, and links are only rendered when both the base URL and the
//! secret are configured; the system never emits links it cannot verify.

use hmac::{Hmac, Mac};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::Sha256;
use tracing::warn;

use graph_store::FeedbackSignal;

type HmacSha256 = Hmac<Sha256>;

lazy_static! {
    /// The trailing feedback block appended to posted comment bodies.
    static ref FEEDBACK_BLOCK: Regex =
        Regex::new(r"(?s)\n*---\n\[👍[^\n]*\n?$").expect("static regex");
    /// Any leftover markdown link to the feedback endpoint.
    static ref FEEDBACK_LINK: Regex =
        Regex::new(r"\[[^\]]*\]\([^)]*?/feedback\?[^)]*\)").expect("static regex");
}

/// Mints and verifies per-comment feedback tokens.
#[derive(Clone)]
pub struct FeedbackSigner {
    base_url: Option<String>,
    secret: Option<Vec<u8>>,
}

impl FeedbackSigner {
    /// Empty strings are normalised to `None` (empty secret is unset, not
    /// a valid key).
    pub fn new(base_url: Option<String>, secret: Option<String>) -> Self {
        Self {
            base_url: base_url.filter(|u| !u.trim().is_empty()),
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.into_bytes()),
        }
    }

    /// `FEEDBACK_BASE_URL` / `FEEDBACK_SECRET`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("FEEDBACK_BASE_URL").ok(),
            std::env::var("FEEDBACK_SECRET").ok(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.secret.is_some()
    }

    /// Hex token for one (comment, signal) pair; `None` without a secret.
    pub fn mint(&self, comment_id: &str, signal: FeedbackSignal) -> Option<String> {
        let secret = self.secret.as_ref()?;
        let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
        mac.update(format!("{comment_id}:{}", signal.as_str()).as_bytes());
        let tag = mac.finalize().into_bytes();
        Some(tag.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Constant-time verification of a presented hex token.
    pub fn verify(&self, comment_id: &str, signal: FeedbackSignal, token_hex: &str) -> bool {
        let Some(secret) = self.secret.as_ref() else {
            warn!("feedback: verification attempted with no secret configured");
            return false;
        };
        let Some(token) = decode_hex(token_hex) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
        mac.update(format!("{comment_id}:{}", signal.as_str()).as_bytes());
        mac.verify_slice(&token).is_ok()
    }

    /// The 👍/👎 markdown block for one comment, or `None` when feedback
    /// is not fully configured.
    pub fn links_markdown(&self, comment_id: &str) -> Option<String> {
        let base = self.base_url.as_ref()?.trim_end_matches('/');
        let up = self.mint(comment_id, FeedbackSignal::Accepted)?;
        let down = self.mint(comment_id, FeedbackSignal::Rejected)?;
        let id = urlencoding::encode(comment_id);
        Some(format!(
            "\n\n---\n[👍 Helpful]({base}/feedback?id={id}&signal=accepted&token={up}) · [👎 Not helpful]({base}/feedback?id={id}&signal=rejected&token={down})"
        ))
    }
}

/// Remove feedback-link artifacts from a stored comment body before it is
/// injected into a prompt as an example.
pub fn strip_feedback_artifacts(body: &str) -> String {
    let stripped = FEEDBACK_BLOCK.replace_all(body, "");
    let stripped = FEEDBACK_LINK.replace_all(&stripped, "");
    stripped.trim().to_string()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> FeedbackSigner {
        FeedbackSigner::new(
            Some("https://review.example.com".into()),
            Some("server-secret".into()),
        )
    }

    #[test]
    fn mint_verify_round_trip() {
        let signer = signer();
        let token = signer.mint("c-42", FeedbackSignal::Accepted).unwrap();
        assert!(signer.verify("c-42", FeedbackSignal::Accepted, &token));
        // Wrong signal, wrong comment, tampered token all fail.
        assert!(!signer.verify("c-42", FeedbackSignal::Rejected, &token));
        assert!(!signer.verify("c-43", FeedbackSignal::Accepted, &token));
        let mut tampered = token.clone();
        tampered.replace_range(0..1, if &token[0..1] == "0" { "1" } else { "0" });
        assert!(!signer.verify("c-42", FeedbackSignal::Accepted, &tampered));
        assert!(!signer.verify("c-42", FeedbackSignal::Accepted, "zz-not-hex"));
    }

    #[test]
    fn empty_secret_means_unset() {
        let signer = FeedbackSigner::new(Some("https://x".into()), Some(String::new()));
        assert!(!signer.is_configured());
        assert!(signer.mint("c", FeedbackSignal::Accepted).is_none());
        assert!(signer.links_markdown("c").is_none());
        assert!(!signer.verify("c", FeedbackSignal::Accepted, "00"));
    }

    #[test]
    fn links_require_both_url_and_secret() {
        let no_url = FeedbackSigner::new(None, Some("secret".into()));
        assert!(no_url.links_markdown("c").is_none());
        let full = signer();
        let links = full.links_markdown("c-42").unwrap();
        assert!(links.contains("signal=accepted"));
        assert!(links.contains("signal=rejected"));
        assert!(links.contains("token="));
    }

    #[test]
    fn artifacts_are_stripped_from_examples() {
        let signer = signer();
        let body = format!(
            "Use a constant here.{}",
            signer.links_markdown("c-42").unwrap()
        );
        let stripped = strip_feedback_artifacts(&body);
        assert_eq!(stripped, "Use a constant here.");
    }
}

//! Subscription handshake and event-source checks.
//!
//! The platform verifies a webhook subscription with a one-time GET carrying
//! `hub.mode`, `hub.verify_token` and `hub.challenge`. The challenge is echoed
//! back only when the mode is `subscribe` and the token matches the shared
//! secret configured for this service.
//!
//! Event deliveries additionally declare the page they belong to. This
//! service is bound to exactly one page, so any other page id is rejected.

use thiserror::Error;

use crate::types::PageId;

/// The only handshake mode the platform uses for subscription checks.
pub const SUBSCRIBE_MODE: &str = "subscribe";

/// Verification failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Handshake mode, token or challenge did not check out.
    #[error("handshake rejected")]
    Unauthorized,

    /// An event was declared for a page this service does not serve.
    #[error("event for page {declared} does not belong to configured page")]
    Forbidden { declared: PageId },
}

/// Checks a subscription handshake and returns the challenge to echo back.
///
/// All three parameters are optional because they come straight from the
/// query string. A missing challenge is treated like a wrong token.
///
/// # Examples
///
/// ```
/// use page_webhook::webhooks::verify::{VerifyError, verify_handshake};
///
/// let ok = verify_handshake(Some("subscribe"), Some("1158201444"), Some("s3cret"), "s3cret");
/// assert_eq!(ok, Ok("1158201444"));
///
/// let bad = verify_handshake(Some("subscribe"), Some("1158201444"), Some("guess"), "s3cret");
/// assert_eq!(bad, Err(VerifyError::Unauthorized));
/// ```
pub fn verify_handshake<'a>(
    mode: Option<&str>,
    challenge: Option<&'a str>,
    provided_token: Option<&str>,
    verify_token: &str,
) -> Result<&'a str, VerifyError> {
    if mode != Some(SUBSCRIBE_MODE) {
        return Err(VerifyError::Unauthorized);
    }

    let provided = provided_token.ok_or(VerifyError::Unauthorized)?;
    if !constant_time_eq(provided.as_bytes(), verify_token.as_bytes()) {
        return Err(VerifyError::Unauthorized);
    }

    challenge.ok_or(VerifyError::Unauthorized)
}

/// Checks that an entry's declared page id is the configured page.
pub fn verify_event_source(declared: &PageId, configured: &PageId) -> Result<(), VerifyError> {
    // Single-page deployment. Serving several pages turns this into a set lookup.
    if declared == configured {
        Ok(())
    } else {
        Err(VerifyError::Forbidden {
            declared: declared.clone(),
        })
    }
}

/// Compares two byte strings without short-circuiting on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

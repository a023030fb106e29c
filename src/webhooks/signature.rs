//! Payload signature verification using HMAC-SHA256.
//!
//! When an app secret is configured, the platform signs every event delivery
//! with HMAC-SHA256 over the raw request body and sends the result in the
//! `X-Hub-Signature-256` header as `sha256=<hex>`.
//!
//! Signature verification runs before the body is parsed; a request with a
//! bad signature never reaches the parser or the store.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Parses a signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
/// Never panics.
///
/// # Examples
///
/// ```
/// use page_webhook::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha256=abcd1234").is_some());
/// assert!(parse_signature_header("abcd1234").is_none());
/// assert!(parse_signature_header("sha1=abcd1234").is_none());
/// assert!(parse_signature_header("sha256=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload using the given secret.
///
/// Used by tests and by anything replaying signed deliveries.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a payload signature against the app secret.
///
/// Returns `true` only if the header is well formed and matches. The
/// comparison is constant-time (delegated to the HMAC implementation).
///
/// # Examples
///
/// ```
/// use page_webhook::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let payload = br#"{"object":"page","entry":[]}"#;
/// let secret = b"app-secret";
///
/// let header = format_signature_header(&compute_signature(payload, secret));
///
/// assert!(verify_signature(payload, &header, secret));
/// assert!(!verify_signature(payload, &header, b"other-secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected_signature = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_signature_header_valid() {
        let result = parse_signature_header("sha256=1234abcd");
        assert_eq!(result, Some(vec![0x12, 0x34, 0xab, 0xcd]));
    }

    #[test]
    fn parse_signature_header_rejects_other_algorithms() {
        assert_eq!(parse_signature_header("sha1=1234abcd"), None);
        assert_eq!(parse_signature_header("1234abcd"), None);
        assert_eq!(parse_signature_header(""), None);
    }

    #[test]
    fn parse_signature_header_odd_length_hex() {
        assert_eq!(parse_signature_header("sha256=abc"), None);
    }

    #[test]
    fn parse_signature_header_uppercase_hex() {
        let result = parse_signature_header("sha256=ABCD1234");
        assert_eq!(result, Some(vec![0xab, 0xcd, 0x12, 0x34]));
    }

    #[test]
    fn verify_signature_page_payload() {
        let payload = br#"{"object":"page","entry":[{"id":"42","time":1,"changes":[]}]}"#;
        let secret = b"app-secret";

        let header = format_signature_header(&compute_signature(payload, secret));

        assert!(verify_signature(payload, &header, secret));
    }

    #[test]
    fn verify_signature_modified_payload() {
        let secret = b"secret";
        let header = format_signature_header(&compute_signature(b"original", secret));

        assert!(verify_signature(b"original", &header, secret));
        assert!(!verify_signature(b"tampered", &header, secret));
    }

    #[test]
    fn verify_signature_malformed_header_returns_false() {
        let payload = b"test";
        let secret = b"secret";

        assert!(!verify_signature(payload, "", secret));
        assert!(!verify_signature(payload, "sha256=", secret));
        assert!(!verify_signature(payload, "sha256=invalid", secret));
        assert!(!verify_signature(payload, "sha1=abc123", secret));
    }

    #[test]
    fn format_signature_header_is_lowercase_hex() {
        let header = format_signature_header(&[0x12, 0x34, 0xab, 0xcd]);
        assert_eq!(header, "sha256=1234abcd");
    }

    proptest! {
        /// verify(payload, sign(payload, secret), secret) always holds.
        #[test]
        fn prop_sign_verify_roundtrip(payload: Vec<u8>, secret: Vec<u8>) {
            let header = format_signature_header(&compute_signature(&payload, &secret));
            prop_assert!(verify_signature(&payload, &header, &secret));
        }

        /// Signing with one secret and verifying with another always fails.
        #[test]
        fn prop_wrong_secret_fails(payload: Vec<u8>, secret1: Vec<u8>, secret2: Vec<u8>) {
            prop_assume!(secret1 != secret2);

            let header = format_signature_header(&compute_signature(&payload, &secret1));
            prop_assert!(!verify_signature(&payload, &header, &secret2));
        }

        /// Arbitrary header strings never panic.
        #[test]
        fn prop_malformed_header_no_panic(header: String, payload: Vec<u8>, secret: Vec<u8>) {
            let _ = parse_signature_header(&header);
            let _ = verify_signature(&payload, &header, &secret);
        }
    }
}

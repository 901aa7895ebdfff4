use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const TIMESTAMP_HEADER: &str = "X-Lark-Request-Timestamp";
pub const NONCE_HEADER: &str = "X-Lark-Request-Nonce";
pub const SIGNATURE_HEADER: &str = "X-Lark-Signature";

/// Signature the platform attaches to encrypted callbacks:
/// `hex(sha256(timestamp + nonce + encrypt_key + body))`.
pub fn request_signature(timestamp: &str, nonce: &str, encrypt_key: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.update(encrypt_key.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

pub fn verify_request_signature(
    timestamp: &str,
    nonce: &str,
    encrypt_key: &str,
    body: &[u8],
    signature: &str,
) -> bool {
    if timestamp.is_empty() || signature.is_empty() {
        return false;
    }
    let expected = request_signature(timestamp, nonce, encrypt_key, body);
    expected
        .as_bytes()
        .ct_eq(signature.trim().to_ascii_lowercase().as_bytes())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"encrypt":"abc"}"#;
        let sig = request_signature("1700000000", "nonce-1", "enc-key", body);
        assert_eq!(sig.len(), 64);
        assert!(verify_request_signature(
            "1700000000",
            "nonce-1",
            "enc-key",
            body,
            &sig
        ));
    }

    #[test]
    fn rejects_tampered_body_or_missing_parts() {
        let sig = request_signature("1", "n", "k", b"{}");
        assert!(!verify_request_signature("1", "n", "k", b"{ }", &sig));
        assert!(!verify_request_signature("", "n", "k", b"{}", &sig));
        assert!(!verify_request_signature("1", "n", "k", b"{}", ""));
    }

    #[test]
    fn signature_comparison_ignores_hex_case() {
        let sig = request_signature("1", "n", "k", b"{}").to_uppercase();
        assert!(verify_request_signature("1", "n", "k", b"{}", &sig));
    }
}

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("invalid hmac key length")]
    InvalidKey,
}

/// Signs a webhook push for a bot that has "signature verification" enabled.
///
/// The platform expects the HMAC-SHA256 of an empty message, keyed with
/// `"{timestamp}\n{secret}"`, encoded as standard base64.
///
/// ```
/// let sign = security::gen_sign("secret", 1_700_000_000).unwrap();
/// assert_eq!(sign.len(), 44);
/// ```
pub fn gen_sign(secret: &str, timestamp: i64) -> Result<String, SignError> {
    let string_to_sign = format!("{timestamp}\n{secret}");
    let mac = HmacSha256::new_from_slice(string_to_sign.as_bytes())
        .map_err(|_| SignError::InvalidKey)?;
    Ok(B64.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_sign_keys_hmac_with_timestamp_and_secret() {
        let mut mac = HmacSha256::new_from_slice(b"1599360473\ndemo-secret").unwrap();
        mac.update(b"");
        let expected = B64.encode(mac.finalize().into_bytes());

        assert_eq!(gen_sign("demo-secret", 1_599_360_473).unwrap(), expected);
    }

    #[test]
    fn gen_sign_is_stable_and_depends_on_inputs() {
        let a = gen_sign("demo-secret", 1_700_000_000).unwrap();
        let b = gen_sign("demo-secret", 1_700_000_000).unwrap();
        let c = gen_sign("demo-secret", 1_700_000_001).unwrap();
        let d = gen_sign("other-secret", 1_700_000_000).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn gen_sign_output_is_padded_base64_of_sha256_mac() {
        let sign = gen_sign("s", 0).unwrap();
        let raw = B64.decode(&sign).expect("valid base64");
        assert_eq!(raw.len(), 32);
        assert!(sign.ends_with('='));
    }
}

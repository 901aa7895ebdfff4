//! AES-256-CBC envelope used by encrypted event callbacks.
//!
//! The platform posts `{"encrypt": "<base64>"}` where the decoded bytes are a
//! 16 byte IV followed by the ciphertext. The AES key is the SHA-256 digest of
//! the "Encrypt Key" configured on the developer console.

use aes::Aes256;
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use cbc::cipher::{
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
    block_padding::{NoPadding, Pkcs7},
};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

const BLOCK_SIZE: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cipher too short")]
    TooShort,
    #[error("ciphertext is not a multiple of the block size")]
    NotBlockAligned,
    #[error("invalid key or iv length")]
    InvalidKeyIv,
    #[error("decrypted payload is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn derive_key(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

/// Decrypts an `encrypt` field and returns the JSON document it carries.
///
/// Block padding is not interpreted. The plaintext is cut down to the span
/// between the first `{` and the last `}`, which drops the padding bytes.
pub fn decrypt(encrypt: &str, key: &str) -> Result<String, CipherError> {
    let buf = B64.decode(encrypt.trim())?;
    if buf.len() < BLOCK_SIZE {
        return Err(CipherError::TooShort);
    }
    let (iv, ciphertext) = buf.split_at(BLOCK_SIZE);
    if ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::NotBlockAligned);
    }
    if ciphertext.is_empty() {
        return Ok(String::new());
    }

    let key = derive_key(key);
    let plain = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|_| CipherError::InvalidKeyIv)?
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| CipherError::NotBlockAligned)?;

    let start = plain.iter().position(|&b| b == b'{').unwrap_or(0);
    let end = plain
        .iter()
        .rposition(|&b| b == b'}')
        .map(|idx| idx + 1)
        .unwrap_or(plain.len());
    if start >= end {
        return Ok(String::new());
    }
    Ok(String::from_utf8(plain[start..end].to_vec())?)
}

/// Produces an envelope the way the platform does: random IV, PKCS#7
/// padding, base64 of `iv || ciphertext`.
pub fn encrypt(plaintext: &str, key: &str) -> Result<String, CipherError> {
    let key = derive_key(key);
    let mut iv = [0u8; BLOCK_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(&key, &iv)
        .map_err(|_| CipherError::InvalidKeyIv)?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let mut out = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    Ok(B64.encode(out))
}

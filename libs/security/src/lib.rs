//! Signing and envelope helpers for bot webhooks and event callbacks.
//!
//! * [`gen_sign`] signs outgoing webhook pushes.
//! * [`decrypt`] opens the AES-CBC envelope of encrypted event callbacks.
//! * [`verify_request_signature`] checks the `X-Lark-Signature` header.

pub mod cipher;
pub mod sign;
pub mod verify;

pub use cipher::{CipherError, decrypt, encrypt};
pub use sign::{SignError, gen_sign};
pub use verify::{
    NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, request_signature, verify_request_signature,
};

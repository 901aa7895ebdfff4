use security::{CipherError, SignError};

#[derive(Debug, thiserror::Error)]
pub enum FeishuError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("api error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("access token unavailable: {0}")]
    Token(String),
    #[error("sign failed: {0}")]
    Sign(#[from] SignError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid message id: {0:?}")]
    InvalidMessageId(String),
}

pub type FeishuResult<T> = Result<T, FeishuError>;

/// Error returned by user supplied event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing encrypt")]
    MissingEncrypt,
    #[error("decrypt error: {0}")]
    Decrypt(#[from] CipherError),
    #[error("schema is empty")]
    MissingSchema,
    #[error("verification token mismatch")]
    TokenMismatch,
    #[error("no handler registered for {0}")]
    MissingHandler(&'static str),
    #[error("msg_type [{0}] is ignored, register an any-message handler to receive it")]
    Unhandled(String),
    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),
}

//! Feishu event subscription receiver.
//!
//! Serves `POST /bot/event`, which verifies and decrypts callbacks, answers
//! URL verification challenges and echoes text messages back into their chat.

pub mod config;
pub mod reqid;
pub mod routes;

pub use config::IngressConfig;
pub use routes::{AppState, ChatReplier, build_dispatcher, router};

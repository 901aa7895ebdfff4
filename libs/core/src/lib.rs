//! Feishu bot SDK core.
//!
//! * [`message`] and [`markup`] build webhook payloads.
//! * [`bot`] signs and posts them to a custom bot webhook.
//! * [`event`] opens and routes event subscription callbacks.
//! * [`reply`] answers messages through the authenticated messaging API.
pub mod bot;
pub mod error;
pub mod event;
pub mod http;
pub mod markup;
pub mod message;
pub mod reply;

pub use bot::*;
pub use error::*;
pub use event::*;
pub use http::{PostRequest, ReqwestTransport, Transport, TransportResponse};
pub use message::*;
pub use reply::*;

/// Returns the semantic version advertised by this crate.
///
/// ```
/// assert_eq!(feishu_core::version(), env!("CARGO_PKG_VERSION"));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

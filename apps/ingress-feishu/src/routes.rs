use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    Extension,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use feishu_core::{
    Dispatched, EventDispatcher, EventError, FeishuResult, HandlerError, ReplyClient, Transport,
    markup::at_user_in_post, text_content,
};
use security::{NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER, verify_request_signature};
use serde_json::json;
use tracing::Instrument;

use crate::{
    config::IngressConfig,
    reqid::{RequestId, with_request_id},
};

pub const MSG_EVENT: &str = "msg event";
pub const REPLY_PREFIX: &str = "收到消息：";

const WELCOME_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>Feishu bot</title></head>\n\
<body><h1>Welcome</h1><p>Event callbacks are accepted at <code>POST /bot/event</code>.</p></body>\n</html>\n";

/// Sends a text message into a chat. Implemented by [`ReplyClient`].
#[async_trait]
pub trait ChatReplier: Send + Sync {
    async fn reply_text(&self, chat_id: &str, text: &str) -> FeishuResult<Option<String>>;
}

#[async_trait]
impl<T: Transport> ChatReplier for ReplyClient<T> {
    async fn reply_text(&self, chat_id: &str, text: &str) -> FeishuResult<Option<String>> {
        self.text_reply_by_chat_id(text, chat_id).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
}

impl AppState {
    pub fn new(dispatcher: EventDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

/// Wires the demo handlers: text messages are echoed back into their chat,
/// everything else is logged.
pub fn build_dispatcher(
    cfg: &IngressConfig,
    replier: Option<Arc<dyn ChatReplier>>,
) -> EventDispatcher {
    EventDispatcher::new(cfg.encrypt_key.clone())
        .with_verification_token(cfg.verification_token.clone())
        .on_url_verification(|_challenge| async {
            tracing::info!("url verification requested");
            Ok::<(), HandlerError>(())
        })
        .on_text_message(move |event| {
            let replier = replier.clone();
            async move {
                let text = text_content(&event)?;
                let chat_id = event.chat_id().to_string();
                tracing::info!(
                    chat_id = %chat_id,
                    message_id = %event.message_id(),
                    "text message received"
                );
                let Some(replier) = replier else {
                    tracing::debug!("replies disabled, message not answered");
                    return Ok::<(), HandlerError>(());
                };
                let reply = format!(
                    "{REPLY_PREFIX}{text}{}",
                    at_user_in_post(event.sender_open_id())
                );
                tokio::spawn(async move {
                    match replier.reply_text(&chat_id, &reply).await {
                        Ok(message_id) => {
                            tracing::debug!(chat_id = %chat_id, message_id = ?message_id, "reply sent")
                        }
                        Err(err) => {
                            tracing::error!(chat_id = %chat_id, error = %err, "reply failed")
                        }
                    }
                });
                Ok(())
            }
        })
        .on_any_message(|event| async move {
            tracing::info!(
                chat_id = %event.chat_id(),
                message_type = %event.event.message.message_type,
                "non-text message received"
            );
            Ok::<(), HandlerError>(())
        })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/hello", get(hello))
        .route("/welcome", get(welcome))
        .route("/healthz", get(healthz))
        .route("/bot/event", post(bot_event))
        .layer(middleware::from_fn(with_request_id))
        .with_state(state)
}

async fn hello() -> &'static str {
    "hello world"
}

async fn welcome() -> Html<&'static str> {
    Html(WELCOME_PAGE)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn bot_event(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let span = tracing::info_span!("bot_event", request_id = %request_id);
    handle_event(state, headers, body).instrument(span).await
}

async fn handle_event(state: AppState, headers: HeaderMap, body: Bytes) -> Response {
    if !signature_ok(&state, &headers, &body) {
        tracing::warn!("invalid callback signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match state.dispatcher.dispatch(&body).await {
        Ok(Dispatched::UrlVerification { challenge }) => {
            Json(json!({ "challenge": challenge })).into_response()
        }
        Ok(Dispatched::Message { .. } | Dispatched::Ignored { .. }) => MSG_EVENT.into_response(),
        Err(err @ EventError::TokenMismatch) => {
            tracing::warn!(error = %err, "callback rejected");
            StatusCode::UNAUTHORIZED.into_response()
        }
        Err(
            err @ (EventError::Handler(_)
            | EventError::MissingHandler(_)
            | EventError::Unhandled(_)),
        ) => {
            tracing::error!(error = %err, "event handler failed");
            MSG_EVENT.into_response()
        }
        Err(err) => {
            tracing::warn!(error = %err, "callback payload rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}

/// Only checked when both an encrypt key is configured and the platform sent
/// signature headers.
fn signature_ok(state: &AppState, headers: &HeaderMap, body: &[u8]) -> bool {
    let Some(key) = state.dispatcher.encrypt_key() else {
        return true;
    };
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    };
    let signature = header(SIGNATURE_HEADER);
    if signature.is_empty() {
        return true;
    }
    verify_request_signature(
        header(TIMESTAMP_HEADER),
        header(NONCE_HEADER),
        key,
        body,
        signature,
    )
}

//! Event subscription callbacks.
//!
//! A callback body is `{"encrypt": "..."}` when an encrypt key is configured
//! on the app, otherwise the plain event document. After decryption the
//! document is either the one-off `url_verification` handshake or an event
//! (schema 2.0). Only `im.message.receive_v1` is routed to handlers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{EventError, HandlerError};

pub const URL_VERIFICATION: &str = "url_verification";
pub const IM_MESSAGE_RECEIVE_V1: &str = "im.message.receive_v1";
pub const TEXT_MESSAGE: &str = "text";

/// Partial schema of `im.message.receive_v1`; absent or null fields are empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub schema: String,
    #[serde(deserialize_with = "null_as_default")]
    pub header: EventHeader,
    #[serde(deserialize_with = "null_as_default")]
    pub event: MessageEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventHeader {
    #[serde(deserialize_with = "null_as_default")]
    pub event_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub event_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub create_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(deserialize_with = "null_as_default")]
    pub app_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tenant_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub message: EventMessage,
    #[serde(deserialize_with = "null_as_default")]
    pub sender: EventSender,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub message_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub root_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub parent_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub chat_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub chat_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message_type: String,
    /// JSON encoded content, e.g. `{"text":"hello"}` for text messages.
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSender {
    #[serde(deserialize_with = "null_as_default")]
    pub sender_id: SenderId,
    #[serde(deserialize_with = "null_as_default")]
    pub sender_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderId {
    #[serde(deserialize_with = "null_as_default")]
    pub open_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub union_id: String,
}

impl ReceiveEvent {
    pub fn chat_id(&self) -> &str {
        &self.event.message.chat_id
    }

    pub fn message_id(&self) -> &str {
        &self.event.message.message_id
    }

    pub fn sender_open_id(&self) -> &str {
        &self.event.sender.sender_id.open_id
    }
}

/// Extracts the `text` field from a text message's JSON content.
pub fn text_content(event: &ReceiveEvent) -> Result<String, EventError> {
    let content: Map<String, Value> = serde_json::from_str(&event.event.message.content)?;
    Ok(content
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    UrlVerification {
        challenge: String,
    },
    Message {
        event_id: String,
        message_type: String,
    },
    Ignored {
        event_type: String,
    },
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;
type ChallengeHandler = Arc<dyn Fn(String) -> HandlerFuture + Send + Sync>;
type MessageHandler = Arc<dyn Fn(ReceiveEvent) -> HandlerFuture + Send + Sync>;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "null_as_default")]
    encrypt: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decrypts callbacks and routes them to the registered handlers.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    encrypt_key: Option<String>,
    verification_token: Option<String>,
    on_url_verification: Option<ChallengeHandler>,
    on_text: Option<MessageHandler>,
    on_any: Option<MessageHandler>,
}

impl EventDispatcher {
    /// An empty key means callbacks arrive unencrypted.
    pub fn new(encrypt_key: impl Into<String>) -> Self {
        let key = encrypt_key.into();
        Self {
            encrypt_key: (!key.is_empty()).then_some(key),
            ..Default::default()
        }
    }

    /// Rejects callbacks whose `token` differs from the app's verification token.
    pub fn with_verification_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.verification_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn on_url_verification<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_url_verification = Some(Arc::new(move |challenge| Box::pin(handler(challenge))));
        self
    }

    pub fn on_text_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ReceiveEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_text = Some(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    /// Receives every non-text message of `im.message.receive_v1`.
    pub fn on_any_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(ReceiveEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        self.on_any = Some(Arc::new(move |event| Box::pin(handler(event))));
        self
    }

    pub fn encrypt_key(&self) -> Option<&str> {
        self.encrypt_key.as_deref()
    }

    /// Returns the plaintext event document carried by a callback body.
    pub fn open(&self, body: &[u8]) -> Result<String, EventError> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        if !envelope.encrypt.is_empty() {
            if self.encrypt_key.is_none() {
                tracing::warn!("encrypted callback received but FEISHU_ENCRYPT_KEY is not set");
            }
            let key = self.encrypt_key.as_deref().unwrap_or_default();
            return Ok(security::decrypt(&envelope.encrypt, key)?);
        }
        if self.encrypt_key.is_some() {
            return Err(EventError::MissingEncrypt);
        }
        Ok(String::from_utf8_lossy(body).into_owned())
    }

    pub async fn dispatch(&self, body: &[u8]) -> Result<Dispatched, EventError> {
        let plaintext = self.open(body)?;
        let document: Map<String, Value> = serde_json::from_str(&plaintext)?;

        if document.get("type").and_then(Value::as_str) == Some(URL_VERIFICATION) {
            self.check_token(document.get("token").and_then(Value::as_str))?;
            let challenge = document
                .get("challenge")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let handler = self
                .on_url_verification
                .as_ref()
                .ok_or(EventError::MissingHandler(URL_VERIFICATION))?;
            handler(challenge.clone())
                .await
                .map_err(EventError::Handler)?;
            tracing::info!("url verification handshake answered");
            return Ok(Dispatched::UrlVerification { challenge });
        }

        let event: ReceiveEvent = serde_json::from_value(Value::Object(document))?;
        if event.schema.is_empty() {
            return Err(EventError::MissingSchema);
        }
        self.check_token(Some(event.header.token.as_str()))?;

        let event_type = event.header.event_type.clone();
        if event_type != IM_MESSAGE_RECEIVE_V1 {
            tracing::debug!(event_type = %event_type, "ignoring event");
            return Ok(Dispatched::Ignored { event_type });
        }

        let event_id = event.header.event_id.clone();
        let message_type = event.event.message.message_type.clone();
        let handler = if message_type == TEXT_MESSAGE {
            self.on_text
                .as_ref()
                .ok_or(EventError::MissingHandler(TEXT_MESSAGE))?
        } else {
            self.on_any
                .as_ref()
                .ok_or_else(|| EventError::Unhandled(message_type.clone()))?
        };
        tracing::debug!(
            event_id = %event_id,
            message_type = %message_type,
            chat_id = %event.chat_id(),
            "dispatching message event"
        );
        handler(event).await.map_err(EventError::Handler)?;

        Ok(Dispatched::Message {
            event_id,
            message_type,
        })
    }

    fn check_token(&self, provided: Option<&str>) -> Result<(), EventError> {
        match self.verification_token.as_deref() {
            Some(expected) if provided != Some(expected) => Err(EventError::TokenMismatch),
            _ => Ok(()),
        }
    }
}

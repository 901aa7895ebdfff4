//! JSON payloads accepted by the bot webhook.
//!
//! Every payload is a JSON object carrying `msg_type` plus either `content`
//! (text, image, post) or `card` (interactive). Signing adds `timestamp` and
//! `sign` at the top level, see [`Message::insert`].

mod card;
mod post;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub use card::{
    ButtonKind, Card, CardButton, CardConfig, CardElement, CardText, CardTitleBgColor, TextTag,
};
pub use post::{Post, PostElement};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh_cn")]
    Chinese,
    #[serde(rename = "en_us")]
    English,
    #[serde(rename = "ja_jp")]
    Japanese,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Chinese => "zh_cn",
            Language::English => "en_us",
            Language::Japanese => "ja_jp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zh_cn" | "zh" => Ok(Language::Chinese),
            "en_us" | "en" => Ok(Language::English),
            "ja_jp" | "ja" => Ok(Language::Japanese),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgType {
    Text,
    Image,
    Post,
    Interactive,
}

impl MsgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::Text => "text",
            MsgType::Image => "image",
            MsgType::Post => "post",
            MsgType::Interactive => "interactive",
        }
    }
}

/// A webhook payload ready to be signed and posted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Message {
    body: Map<String, Value>,
}

impl Message {
    fn from_json(value: Value) -> Self {
        match value {
            Value::Object(body) => Self { body },
            _ => Self { body: Map::new() },
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_json(json!({
            "msg_type": MsgType::Text.as_str(),
            "content": { "text": text.into() },
        }))
    }

    pub fn image(image_key: impl Into<String>) -> Self {
        Self::from_json(json!({
            "msg_type": MsgType::Image.as_str(),
            "content": { "image_key": image_key.into() },
        }))
    }

    pub fn msg_type(&self) -> &str {
        self.body
            .get("msg_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Sets a top-level field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.body.insert(key.into(), value);
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

//! Outbound HTTP seam shared by the webhook bot and the reply client.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{FeishuError, FeishuResult};

pub const JSON_UTF8: &str = "application/json; charset=utf-8";
pub const JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    pub url: String,
    pub bearer: Option<String>,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl PostRequest {
    pub fn json(
        url: impl Into<String>,
        content_type: &'static str,
        body: &Value,
    ) -> FeishuResult<Self> {
        Ok(Self {
            url: url.into(),
            bearer: None,
            content_type,
            body: serde_json::to_vec(body)?,
        })
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> FeishuResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Best-effort view of the body; `Value::Null` when it is not JSON.
    pub fn json_value(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: PostRequest) -> FeishuResult<TransportResponse>;
}

#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: PostRequest) -> FeishuResult<TransportResponse> {
        let mut builder = self
            .http
            .post(&request.url)
            .header(CONTENT_TYPE, HeaderValue::from_static(request.content_type))
            .body(request.body);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(FeishuError::Transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(FeishuError::Transport)?;
        Ok(TransportResponse { status, body })
    }
}

/// Checks the `{code, msg}` envelope returned by the open APIs.
///
/// Webhook responses from older deployments use `StatusCode`/`StatusMessage`
/// instead, both spellings are accepted.
pub fn check_api_code(body: &Value) -> FeishuResult<()> {
    let code = body
        .get("code")
        .or_else(|| body.get("StatusCode"))
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if code == 0 {
        return Ok(());
    }
    let msg = body
        .get("msg")
        .or_else(|| body.get("StatusMessage"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    Err(FeishuError::Api { code, msg })
}

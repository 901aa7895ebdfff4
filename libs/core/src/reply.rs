//! Authenticated messaging API used to answer received messages.
//!
//! Unlike the webhook bot, these calls act as the app and need a
//! `tenant_access_token`. A token can be supplied up front; otherwise it is
//! fetched with the app credentials and refreshed shortly before it expires.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use crate::error::{FeishuError, FeishuResult};
use crate::http::{JSON, JSON_UTF8, PostRequest, ReqwestTransport, Transport, check_api_code};
use crate::message::MsgType;

pub const DEFAULT_API_BASE: &str = "https://open.feishu.cn/open-apis";
const APP_ACCESS_TOKEN_PATH: &str = "auth/v3/app_access_token/internal";
const REFRESH_MARGIN: Duration = Duration::minutes(5);

#[derive(Clone, Debug, Default)]
pub struct ReplyOptions {
    pub app_id: String,
    pub app_secret: String,
    /// Tokens expire after two hours; a supplied token is never refreshed.
    pub tenant_access_token: String,
    pub api_base: Option<String>,
}

/// `receive_id_type` accepted by the send-message API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReceiveIdType {
    OpenId,
    UserId,
    UnionId,
    Email,
    #[default]
    ChatId,
}

impl ReceiveIdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiveIdType::OpenId => "open_id",
            ReceiveIdType::UserId => "user_id",
            ReceiveIdType::UnionId => "union_id",
            ReceiveIdType::Email => "email",
            ReceiveIdType::ChatId => "chat_id",
        }
    }
}

impl fmt::Display for ReceiveIdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReceiveIdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open_id" => Ok(ReceiveIdType::OpenId),
            "user_id" => Ok(ReceiveIdType::UserId),
            "union_id" => Ok(ReceiveIdType::UnionId),
            "email" => Ok(ReceiveIdType::Email),
            "chat_id" => Ok(ReceiveIdType::ChatId),
            other => Err(format!("unknown receive_id_type: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyTarget {
    /// Quote-reply to an existing message.
    Reply { message_id: String },
    /// New message to a chat or user.
    Send {
        receive_id_type: ReceiveIdType,
        receive_id: String,
    },
}

impl ReplyTarget {
    fn receive_id(&self) -> &str {
        match self {
            ReplyTarget::Reply { message_id } => message_id,
            ReplyTarget::Send { receive_id, .. } => receive_id,
        }
    }

    /// The message id becomes a path segment, so only `[A-Za-z0-9_-]` is
    /// accepted.
    fn path(&self) -> FeishuResult<String> {
        Ok(match self {
            ReplyTarget::Reply { message_id } => {
                let safe = !message_id.is_empty()
                    && message_id
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
                if !safe {
                    return Err(FeishuError::InvalidMessageId(message_id.clone()));
                }
                format!("im/v1/messages/{message_id}/reply")
            }
            ReplyTarget::Send {
                receive_id_type, ..
            } => format!("im/v1/messages?receive_id_type={receive_id_type}"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    #[serde(default)]
    expire: Option<i64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<OffsetDateTime>,
}

impl AccessToken {
    fn needs_refresh(&self, now: OffsetDateTime) -> bool {
        self.value.is_empty()
            || self
                .expires_at
                .is_some_and(|expires_at| now + REFRESH_MARGIN >= expires_at)
    }
}

pub struct ReplyClient<T: Transport = ReqwestTransport> {
    transport: T,
    app_id: String,
    app_secret: String,
    api_base: String,
    token: Mutex<AccessToken>,
}

impl ReplyClient<ReqwestTransport> {
    pub async fn new(opts: ReplyOptions) -> FeishuResult<Self> {
        Self::with_transport(ReqwestTransport::default(), opts).await
    }
}

impl<T: Transport> ReplyClient<T> {
    /// Fetches a token right away when none is supplied, so bad credentials
    /// surface at construction time.
    pub async fn with_transport(transport: T, opts: ReplyOptions) -> FeishuResult<Self> {
        let api_base = opts
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let client = Self {
            transport,
            app_id: opts.app_id,
            app_secret: opts.app_secret,
            api_base,
            token: Mutex::new(AccessToken {
                value: opts.tenant_access_token,
                expires_at: None,
            }),
        };
        client.tenant_access_token().await?;
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    pub async fn tenant_access_token(&self) -> FeishuResult<String> {
        let mut token = self.token.lock().await;
        if token.needs_refresh(OffsetDateTime::now_utc()) {
            *token = self.fetch_token().await?;
        }
        Ok(token.value.clone())
    }

    async fn fetch_token(&self) -> FeishuResult<AccessToken> {
        let body = json!({
            "app_id": self.app_id,
            "app_secret": self.app_secret,
        });
        let request = PostRequest::json(self.url(APP_ACCESS_TOKEN_PATH), JSON_UTF8, &body)?;
        let response = self.transport.post(request).await?;
        if !response.is_success() {
            return Err(FeishuError::Http {
                status: response.status,
                body: response.body,
            });
        }

        let data: TokenResponse = response.json()?;
        if data.code != 0 {
            return Err(FeishuError::Api {
                code: data.code,
                msg: data.msg,
            });
        }
        if data.tenant_access_token.is_empty() {
            return Err(FeishuError::Token(format!(
                "get tenant_access_token error: {}",
                data.msg
            )));
        }

        tracing::info!(app_id = %self.app_id, expire = ?data.expire, "fetched tenant access token");
        Ok(AccessToken {
            value: data.tenant_access_token,
            expires_at: data
                .expire
                .map(|secs| OffsetDateTime::now_utc() + Duration::seconds(secs)),
        })
    }

    /// Replies to `msg_id` with a text message.
    pub async fn text_reply_by_msg_id(
        &self,
        msg: &str,
        msg_id: &str,
    ) -> FeishuResult<Option<String>> {
        let target = ReplyTarget::Reply {
            message_id: msg_id.to_string(),
        };
        self.process_reply(&target, MsgType::Text.as_str(), text_content(msg))
            .await
    }

    /// Sends a text message to the chat `receive_id`.
    pub async fn text_reply_by_chat_id(
        &self,
        msg: &str,
        receive_id: &str,
    ) -> FeishuResult<Option<String>> {
        let target = ReplyTarget::Send {
            receive_id_type: ReceiveIdType::ChatId,
            receive_id: receive_id.to_string(),
        };
        self.process_reply(&target, MsgType::Text.as_str(), text_content(msg))
            .await
    }

    /// Posts `content` (already JSON encoded, as the API expects a string)
    /// and returns the id of the created message when the API reports one.
    pub async fn process_reply(
        &self,
        target: &ReplyTarget,
        msg_type: &str,
        content: String,
    ) -> FeishuResult<Option<String>> {
        let path = target.path()?;
        let token = self.tenant_access_token().await?;
        let body = json!({
            "receive_id": target.receive_id(),
            "msg_type": msg_type,
            "content": content,
        });
        let request = PostRequest::json(self.url(&path), JSON, &body)?.bearer(token);
        let response = self.transport.post(request).await?;
        let data = response.json_value();

        if response.status != 200 {
            let msg = data
                .get("msg")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(response.body);
            tracing::warn!(status = response.status, msg = %msg, "send message error");
            return Err(FeishuError::Http {
                status: response.status,
                body: msg,
            });
        }
        check_api_code(&data)?;

        let message_id = data
            .pointer("/data/message_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        tracing::debug!(msg_type, message_id = ?message_id, "message delivered");
        Ok(message_id)
    }
}

fn text_content(msg: &str) -> String {
    json!({ "text": msg }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::MockTransport;

    fn token_ok(token: &str, expire: i64) -> (u16, Value) {
        (
            200,
            json!({
                "code": 0,
                "msg": "ok",
                "app_access_token": "a-xxx",
                "tenant_access_token": token,
                "expire": expire
            }),
        )
    }

    fn supplied(token: &str) -> ReplyOptions {
        ReplyOptions {
            tenant_access_token: token.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn supplied_token_skips_fetch() {
        let transport = MockTransport::default();
        let client = ReplyClient::with_transport(transport.clone(), supplied("t-given"))
            .await
            .unwrap();
        assert_eq!(client.tenant_access_token().await.unwrap(), "t-given");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_token_is_fetched_with_app_credentials() {
        let transport = MockTransport::with_responses([token_ok("t-fetched", 7200)]);
        let client = ReplyClient::with_transport(
            transport.clone(),
            ReplyOptions {
                app_id: "cli_a".into(),
                app_secret: "s3cr3t".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let requests = transport.requests();
        assert_eq!(
            requests[0].url,
            "https://open.feishu.cn/open-apis/auth/v3/app_access_token/internal"
        );
        assert_eq!(
            transport.body(0),
            json!({"app_id": "cli_a", "app_secret": "s3cr3t"})
        );
        assert_eq!(client.tenant_access_token().await.unwrap(), "t-fetched");
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn near_expiry_token_is_refreshed() {
        let transport =
            MockTransport::with_responses([token_ok("t-short", 60), token_ok("t-next", 7200)]);
        let client = ReplyClient::with_transport(transport.clone(), ReplyOptions::default())
            .await
            .unwrap();
        assert_eq!(client.tenant_access_token().await.unwrap(), "t-next");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn token_errors_surface() {
        let transport = MockTransport::with_responses([(
            200,
            json!({"code": 10003, "msg": "invalid param"}),
        )]);
        let err = ReplyClient::with_transport(transport, ReplyOptions::default())
            .await
            .err()
            .expect("api error");
        assert!(matches!(err, FeishuError::Api { code: 10003, .. }));

        let transport = MockTransport::with_responses([(200, json!({"code": 0, "msg": "odd"}))]);
        let err = ReplyClient::with_transport(transport, ReplyOptions::default())
            .await
            .err()
            .expect("token error");
        assert_eq!(
            err.to_string(),
            "access token unavailable: get tenant_access_token error: odd"
        );
    }

    #[tokio::test]
    async fn reply_by_message_id() {
        let transport = MockTransport::with_responses([(
            200,
            json!({"code": 0, "msg": "success", "data": {"message_id": "om_new"}}),
        )]);
        let client = ReplyClient::with_transport(transport.clone(), supplied("t-1"))
            .await
            .unwrap();

        let id = client
            .text_reply_by_msg_id("pong", "om_dc13264520392913993dd051dba21dcf")
            .await
            .unwrap();
        assert_eq!(id.as_deref(), Some("om_new"));

        let request = &transport.requests()[0];
        assert_eq!(
            request.url,
            "https://open.feishu.cn/open-apis/im/v1/messages/om_dc13264520392913993dd051dba21dcf/reply"
        );
        assert_eq!(request.bearer.as_deref(), Some("t-1"));
        assert_eq!(request.content_type, "application/json");
        assert_eq!(
            transport.body(0),
            json!({
                "receive_id": "om_dc13264520392913993dd051dba21dcf",
                "msg_type": "text",
                "content": "{\"text\":\"pong\"}"
            })
        );
    }

    #[tokio::test]
    async fn reply_rejects_message_id_that_would_alter_the_path() {
        let transport = MockTransport::default();
        let client = ReplyClient::with_transport(transport.clone(), supplied("t-1"))
            .await
            .unwrap();

        for bad in ["", "om_1/../../auth", "om_1?x=1", "om 1"] {
            let err = client.text_reply_by_msg_id("pong", bad).await.unwrap_err();
            assert!(matches!(err, FeishuError::InvalidMessageId(ref id) if id == bad));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn send_to_chat_uses_chat_id_receive_type() {
        let transport = MockTransport::default();
        let client = ReplyClient::with_transport(transport.clone(), supplied("t-1"))
            .await
            .unwrap();
        client
            .text_reply_by_chat_id("收到消息：hi", "oc_1")
            .await
            .unwrap();

        assert_eq!(
            transport.requests()[0].url,
            "https://open.feishu.cn/open-apis/im/v1/messages?receive_id_type=chat_id"
        );
        assert_eq!(transport.body(0)["receive_id"], "oc_1");
        assert_eq!(transport.body(0)["content"], "{\"text\":\"收到消息：hi\"}");
    }

    #[tokio::test]
    async fn non_200_reports_api_message() {
        let transport = MockTransport::with_responses([(
            400,
            json!({"code": 230002, "msg": "Bot/User can NOT be out of the chat."}),
        )]);
        let client = ReplyClient::with_transport(transport, supplied("t-1"))
            .await
            .unwrap();
        let err = client.text_reply_by_chat_id("hi", "oc_x").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected status 400: Bot/User can NOT be out of the chat."
        );
    }

    #[tokio::test]
    async fn custom_api_base_and_receive_type() {
        let transport = MockTransport::default();
        let client = ReplyClient::with_transport(
            transport.clone(),
            ReplyOptions {
                tenant_access_token: "t".into(),
                api_base: Some("http://127.0.0.1:9000/open-apis/".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let target = ReplyTarget::Send {
            receive_id_type: "open_id".parse().unwrap(),
            receive_id: "ou_1".into(),
        };
        client
            .process_reply(&target, "image", json!({"image_key": "img_1"}).to_string())
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "http://127.0.0.1:9000/open-apis/im/v1/messages?receive_id_type=open_id"
        );
        assert_eq!(transport.body(0)["msg_type"], "image");
    }
}

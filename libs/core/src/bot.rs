//! Custom bot ("群机器人") webhook sender.

use async_trait::async_trait;
use serde_json::json;
use time::OffsetDateTime;

use crate::error::{FeishuError, FeishuResult};
use crate::http::{JSON_UTF8, PostRequest, ReqwestTransport, Transport, check_api_code};
use crate::message::{Card, CardConfig, CardTitleBgColor, Message, Post};

pub const WEBHOOK_HOST: &str = "open.feishu.cn";
pub const WEBHOOK_BASE: &str = "https://open.feishu.cn/open-apis/bot/v2/hook/";

/// Expands a bare hook id into the full webhook URL. Anything that already
/// points at the open platform host is used verbatim.
pub fn webhook_url(webhook: &str) -> String {
    if webhook.contains(WEBHOOK_HOST) {
        webhook.to_string()
    } else {
        format!("{WEBHOOK_BASE}{webhook}")
    }
}

#[async_trait]
pub trait Bot: Send + Sync {
    async fn send_text(&self, content: &str) -> FeishuResult<()>;
    async fn send_post(&self, post: Post, more: Vec<Post>) -> FeishuResult<()>;
    async fn send_image(&self, image_key: &str) -> FeishuResult<()>;
    async fn send_card(
        &self,
        bg_color: CardTitleBgColor,
        config: Option<CardConfig>,
        card: Card,
        more: Vec<Card>,
    ) -> FeishuResult<()>;
}

pub struct WebhookBot<T: Transport = ReqwestTransport> {
    transport: T,
    webhook: String,
    secret_key: String,
}

impl WebhookBot<ReqwestTransport> {
    pub fn new(webhook: &str, secret_key: &str) -> Self {
        Self::with_transport(ReqwestTransport::default(), webhook, secret_key)
    }
}

impl<T: Transport> WebhookBot<T> {
    pub fn with_transport(transport: T, webhook: &str, secret_key: &str) -> Self {
        Self {
            transport,
            webhook: webhook_url(webhook),
            secret_key: secret_key.trim().to_string(),
        }
    }

    pub fn webhook(&self) -> &str {
        &self.webhook
    }

    pub fn is_signed(&self) -> bool {
        !self.secret_key.is_empty()
    }

    /// Signs (when a secret is configured) and posts a single message.
    pub async fn send(&self, msg: Message) -> FeishuResult<()> {
        self.send_at(msg, OffsetDateTime::now_utc().unix_timestamp())
            .await
    }

    async fn send_at(&self, mut msg: Message, timestamp: i64) -> FeishuResult<()> {
        if self.is_signed() {
            let sign = security::gen_sign(&self.secret_key, timestamp)?;
            msg.insert("timestamp", json!(timestamp));
            msg.insert("sign", json!(sign));
        }

        let msg_type = msg.msg_type().to_string();
        let request = PostRequest::json(&self.webhook, JSON_UTF8, &msg.into_value())?;
        tracing::debug!(msg_type = %msg_type, signed = self.is_signed(), "posting webhook message");

        let response = self.transport.post(request).await?;
        if !response.is_success() {
            tracing::warn!(status = response.status, msg_type = %msg_type, "webhook rejected message");
            return Err(FeishuError::Http {
                status: response.status,
                body: response.body,
            });
        }
        check_api_code(&response.json_value()).inspect_err(|err| {
            tracing::warn!(error = %err, msg_type = %msg_type, "webhook returned error code");
        })
    }
}

#[async_trait]
impl<T: Transport> Bot for WebhookBot<T> {
    async fn send_text(&self, content: &str) -> FeishuResult<()> {
        self.send(Message::text(content)).await
    }

    async fn send_post(&self, post: Post, more: Vec<Post>) -> FeishuResult<()> {
        self.send(Message::post(post, more)).await
    }

    async fn send_image(&self, image_key: &str) -> FeishuResult<()> {
        self.send(Message::image(image_key)).await
    }

    async fn send_card(
        &self,
        bg_color: CardTitleBgColor,
        config: Option<CardConfig>,
        card: Card,
        more: Vec<Card>,
    ) -> FeishuResult<()> {
        self.send(Message::card(bg_color, config, card, more)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::MockTransport;
    use crate::markup::{bold, text_link};
    use crate::message::{CardElement, Language, PostElement};

    const HOOK_ID: &str = "95f3e056-56d6-4ede-8f18-30b8107ff69b";

    #[test]
    fn webhook_id_is_expanded() {
        assert_eq!(
            webhook_url(HOOK_ID),
            format!("https://open.feishu.cn/open-apis/bot/v2/hook/{HOOK_ID}")
        );
        let full = "https://open.feishu.cn/open-apis/bot/v2/hook/abc";
        assert_eq!(webhook_url(full), full);
    }

    #[tokio::test]
    async fn unsigned_text_is_posted_as_is() {
        let transport = MockTransport::default();
        let bot = WebhookBot::with_transport(transport.clone(), HOOK_ID, "   ");
        assert!(!bot.is_signed());

        let text = format!("{}已发布，{}", bold("生产环境"), text_link("点击去测试", "https://example.com/"));
        bot.send_text(&text).await.expect("send");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, bot.webhook());
        assert_eq!(requests[0].content_type, "application/json; charset=utf-8");
        assert!(requests[0].bearer.is_none());
        assert_eq!(
            transport.body(0),
            json!({"msg_type": "text", "content": {"text": text}})
        );
    }

    #[tokio::test]
    async fn signed_message_carries_timestamp_and_sign() {
        let transport = MockTransport::default();
        let bot = WebhookBot::with_transport(transport.clone(), HOOK_ID, " secret \n");
        bot.send_at(Message::image("img_1"), 1_700_000_000)
            .await
            .expect("send");

        let body = transport.body(0);
        assert_eq!(body["timestamp"], json!(1_700_000_000_i64));
        assert_eq!(
            body["sign"],
            json!(security::gen_sign("secret", 1_700_000_000).unwrap())
        );
        assert_eq!(body["msg_type"], "image");
    }

    #[tokio::test]
    async fn post_and_card_use_their_builders() {
        let transport = MockTransport::default();
        let bot = WebhookBot::with_transport(transport.clone(), HOOK_ID, "");

        bot.send_post(
            Post::new(Language::English, "t").line([PostElement::text("x")]),
            Vec::new(),
        )
        .await
        .unwrap();
        bot.send_card(
            CardTitleBgColor::Red,
            None,
            Card::new(Language::English, "alert", [CardElement::markdown("down")]),
            Vec::new(),
        )
        .await
        .unwrap();

        assert_eq!(transport.body(0)["msg_type"], "post");
        assert_eq!(transport.body(1)["msg_type"], "interactive");
        assert_eq!(transport.body(1)["card"]["header"]["template"], "red");
    }

    #[tokio::test]
    async fn http_failure_is_reported() {
        let transport = MockTransport::with_responses([(500, json!({"msg": "boom"}))]);
        let bot = WebhookBot::with_transport(transport, HOOK_ID, "");
        let err = bot.send_text("hi").await.expect_err("http error");
        assert!(matches!(err, FeishuError::Http { status: 500, .. }));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn api_error_code_is_reported() {
        let transport =
            MockTransport::with_responses([(200, json!({"code": 19021, "msg": "sign match fail"}))]);
        let bot = WebhookBot::with_transport(transport, HOOK_ID, "bad-secret");
        let err = bot.send_text("hi").await.expect_err("api error");
        assert_eq!(err.to_string(), "api error 19021: sign match fail");
        assert!(logs_contain("webhook returned error code"));
        assert!(!logs_contain("bad-secret"));
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use feishu_core::{
    Dispatched, EventDispatcher, FeishuResult, HandlerError, PostRequest, ReplyClient,
    ReplyOptions, Transport, TransportResponse, text_content,
};
use serde_json::{Value, json};

const ENCRYPT_KEY: &str = "kudryavka";
const APP_SECRET: &str = "app-secret-value";
const TENANT_TOKEN: &str = "t-tenant-token-value";

#[derive(Clone, Default)]
struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
    seen: Arc<Mutex<Vec<PostRequest>>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<(u16, Value)>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            seen: Arc::default(),
        }
    }

    fn seen(&self) -> Vec<PostRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: PostRequest) -> FeishuResult<TransportResponse> {
        self.seen.lock().unwrap().push(request);
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((200, json!({"code": 0})));
        Ok(TransportResponse {
            status,
            body: body.to_string(),
        })
    }
}

fn callback(text: &str) -> Vec<u8> {
    let doc = json!({
        "schema": "2.0",
        "header": {
            "event_id": "evt-1",
            "event_type": "im.message.receive_v1",
            "token": "verify-me"
        },
        "event": {
            "sender": {"sender_id": {"open_id": "ou_sender"}},
            "message": {
                "message_id": "om_in",
                "chat_id": "oc_room",
                "message_type": "text",
                "content": json!({"text": text}).to_string()
            }
        }
    });
    let encrypt = security::encrypt(&doc.to_string(), ENCRYPT_KEY).unwrap();
    json!({ "encrypt": encrypt }).to_string().into_bytes()
}

#[tokio::test]
#[tracing_test::traced_test]
async fn echo_bot_replies_without_leaking_credentials() {
    let transport = ScriptedTransport::new(vec![
        (
            200,
            json!({"code": 0, "msg": "ok", "tenant_access_token": TENANT_TOKEN, "expire": 7200}),
        ),
        (200, json!({"code": 0, "data": {"message_id": "om_out"}})),
    ]);
    let client = ReplyClient::with_transport(
        transport.clone(),
        ReplyOptions {
            app_id: "cli_app".into(),
            app_secret: APP_SECRET.into(),
            ..Default::default()
        },
    )
    .await
    .expect("token fetched");
    let client = Arc::new(client);
    let replied = Arc::new(Mutex::new(None));

    let dispatcher = {
        let client = client.clone();
        let replied = replied.clone();
        EventDispatcher::new(ENCRYPT_KEY)
            .with_verification_token("verify-me")
            .on_text_message(move |event| {
                let client = client.clone();
                let replied = replied.clone();
                async move {
                    let text = text_content(&event)?;
                    let id = client
                        .text_reply_by_msg_id(&format!("echo: {text}"), event.message_id())
                        .await?;
                    *replied.lock().unwrap() = id;
                    Ok::<(), HandlerError>(())
                }
            })
    };

    let outcome = dispatcher.dispatch(&callback("hi there")).await.unwrap();
    assert_eq!(
        outcome,
        Dispatched::Message {
            event_id: "evt-1".into(),
            message_type: "text".into()
        }
    );
    assert_eq!(replied.lock().unwrap().as_deref(), Some("om_out"));

    let seen = transport.seen();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].url.ends_with("/auth/v3/app_access_token/internal"));
    assert!(seen[1].url.ends_with("/im/v1/messages/om_in/reply"));
    assert_eq!(seen[1].bearer.as_deref(), Some(TENANT_TOKEN));
    let body: Value = serde_json::from_slice(&seen[1].body).unwrap();
    assert_eq!(body["content"], json!({"text": "echo: hi there"}).to_string());

    assert!(logs_contain("fetched tenant access token"));
    assert!(!logs_contain(APP_SECRET));
    assert!(!logs_contain(TENANT_TOKEN));
}

#[tokio::test]
async fn rejected_reply_surfaces_as_handler_error() {
    let transport = ScriptedTransport::new(vec![(
        400,
        json!({"code": 230002, "msg": "bot is not in the chat"}),
    )]);
    let client = Arc::new(
        ReplyClient::with_transport(
            transport,
            ReplyOptions {
                tenant_access_token: TENANT_TOKEN.into(),
                ..Default::default()
            },
        )
        .await
        .unwrap(),
    );

    let dispatcher = EventDispatcher::new(ENCRYPT_KEY).on_text_message(move |event| {
        let client = client.clone();
        async move {
            client
                .text_reply_by_chat_id("pong", event.chat_id())
                .await?;
            Ok::<(), HandlerError>(())
        }
    });

    let err = dispatcher.dispatch(&callback("ping")).await.unwrap_err();
    assert!(err.to_string().contains("bot is not in the chat"), "{err}");
}

//! Local stand-in for the Bot API, shared by this crate's tests.

use std::sync::{Arc, Mutex};

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{Method, Uri},
        response::{IntoResponse, Response},
    },
    serde::Deserialize,
    serde_json::{Value, json},
    teloxide::Bot,
    tokio::sync::oneshot,
};

/// Bytes served for any `/file/...` download.
pub const FILE_BYTES: &[u8] = b"OggS-fake-audio";

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(default)]
    pub parse_mode: Option<String>,
}

#[derive(Clone, Default)]
struct Recorded {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn telegram_api(
    State(recorded): State<Recorded>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if method == Method::GET && uri.path().starts_with("/file/") {
        return FILE_BYTES.to_vec().into_response();
    }

    let name = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let result = match name.as_str() {
        "SendMessage" => json!({
            "message_id": 1,
            "date": 0,
            "chat": { "id": payload["chat_id"], "type": "private" },
            "text": "ok"
        }),
        "GetFile" => json!({
            "file_id": "voice-file-id",
            "file_unique_id": "voice-unique-id",
            "file_size": FILE_BYTES.len(),
            "file_path": "voice/file_1.oga"
        }),
        "GetMe" => json!({
            "id": 7,
            "is_bot": true,
            "first_name": "ONIKA",
            "username": "onika_bot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false,
            "can_connect_to_business": false,
            "has_main_web_app": false
        }),
        "GetWebhookInfo" => json!({
            "url": "https://bot.example.com/webhook",
            "has_custom_certificate": false,
            "pending_update_count": 3
        }),
        _ => Value::Bool(true),
    };
    if let Ok(mut calls) = recorded.calls.lock() {
        calls.push((name, payload));
    }
    Json(json!({ "ok": true, "result": result })).into_response()
}

/// Bot API server on an ephemeral port plus a `Bot` pointed at it.
pub struct MockTelegram {
    pub bot: Bot,
    recorded: Recorded,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
impl MockTelegram {
    pub async fn start() -> Self {
        let recorded = Recorded::default();
        let app = Router::new()
            .fallback(telegram_api)
            .with_state(recorded.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });
        let url = reqwest::Url::parse(&format!("http://{addr}/")).unwrap();
        Self {
            bot: Bot::new("test-token").set_api_url(url),
            recorded,
            shutdown,
            task,
        }
    }

    /// Payloads of every call to `method`, in order.
    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.recorded
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn called(&self, method: &str) -> bool {
        !self.calls(method).is_empty()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.calls("SendMessage")
            .into_iter()
            .map(|payload| serde_json::from_value(payload).unwrap())
            .collect()
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.task.await.unwrap();
    }
}

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub body: Value,
    pub authorization: Option<String>,
    pub organization: Option<String>,
}

#[derive(Clone)]
struct UpstreamState {
    requests: Arc<AsyncMutex<Vec<RecordedRequest>>>,
    status: StatusCode,
    body: String,
}

async fn handle_chat(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, String) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };
    state.requests.lock().await.push(RecordedRequest {
        body: payload,
        authorization: header("authorization"),
        organization: header("openai-organization"),
    });
    (state.status, state.body.clone())
}

/// Minimal OpenAI-compatible upstream answering every call with a fixed status and body.
pub struct MockUpstream {
    pub base_url: String,
    requests: Arc<AsyncMutex<Vec<RecordedRequest>>>,
    join: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        let requests = Arc::new(AsyncMutex::new(Vec::new()));
        let state = UpstreamState {
            requests: requests.clone(),
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.into(),
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(handle_chat))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let join = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("upstream server error");
        });

        Self {
            base_url,
            requests,
            join,
        }
    }

    pub async fn ok(model: &str, prompt: u64, completion: u64) -> Self {
        Self::start(200, completion_body(model, prompt, completion).to_string()).await
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.join.abort();
    }
}

pub fn completion_body(model: &str, prompt: u64, completion: u64) -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "from upstream"},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt,
            "completion_tokens": completion,
            "total_tokens": prompt + completion
        }
    })
}

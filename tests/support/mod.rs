//! Shared fixtures for the mock API tests.
#![allow(dead_code)]

use std::time::Duration;

use mistral_client::ClientConfig;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const API_KEY: &str = "test-api-key";

/// Config pointed at `server` with fast retries.
pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(API_KEY)
        .with_base_url(server.uri())
        .with_retry(3, Duration::from_millis(1), Duration::from_millis(5))
}

pub fn chat_completion_body(content: &str) -> Value {
    json!({
        "id": "cmpl-e5cc70bb28c444948073e77776eb30ef",
        "object": "chat.completion",
        "created": 1702256327,
        "model": "mistral-small-latest",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 16, "completion_tokens": 34, "total_tokens": 50}
    })
}

pub fn embedding_body() -> Value {
    json!({
        "id": "embd-aad6fc62b17349b192ef09225058bc45",
        "object": "list",
        "model": "mistral-embed",
        "data": [
            {"object": "embedding", "embedding": [0.1, 0.2, 0.3], "index": 0},
            {"object": "embedding", "embedding": [0.4, 0.5, 0.6], "index": 1}
        ],
        "usage": {"prompt_tokens": 9, "completion_tokens": 0, "total_tokens": 9}
    })
}

/// SSE body: one `data:` event per content piece, the last one finishing.
pub fn sse_body(pieces: &[&str]) -> String {
    let mut body = String::new();
    for (i, piece) in pieces.iter().enumerate() {
        let last = i + 1 == pieces.len();
        let chunk = json!({
            "id": "cmpl-stream",
            "object": "chat.completion.chunk",
            "created": 1702256327,
            "model": "mistral-small-latest",
            "choices": [{
                "index": 0,
                "delta": {"role": "assistant", "content": piece},
                "finish_reason": if last { Value::from("stop") } else { Value::Null }
            }],
            "usage": if last {
                json!({"prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8})
            } else {
                Value::Null
            }
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

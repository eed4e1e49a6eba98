//! Response cache
//!
//! [`CachedClient`] memoizes chat completions, streamed chat completions and
//! embeddings. Entries are keyed by a fingerprint of the request: the SHA-256
//! of its canonical JSON (object keys sorted at every level), hex encoded. Each
//! entry is a [`CachedData`] envelope stored through a [`CacheEngine`].
//!
//! Only [`CacheError::Miss`] from the engine leads to a call through to the
//! wrapped client; any other engine failure is reported to the caller.

mod client;
mod local;

pub use client::CachedClient;
pub use local::LocalFsEngine;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::CacheError;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, CompletionChunk, EmbeddingRequest,
    EmbeddingResponse,
};

/// Default directory of the local cache.
pub const DEFAULT_CACHE_DIR: &str = "./.mistral/cache";

/// Key/value storage behind the cache.
#[async_trait]
pub trait CacheEngine: Send + Sync {
    /// Stored bytes, or [`CacheError::Miss`] when the key is absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    async fn set(&self, key: &str, data: Vec<u8>) -> Result<(), CacheError>;
}

/// Stored cache entry. Exactly one of the three payload kinds is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData {
    pub key: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_completion_request: Option<ChatCompletionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_completion_response: Option<ChatCompletionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_request: Option<EmbeddingRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_response: Option<EmbeddingResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_chunks: Option<Vec<CompletionChunk>>,
}

impl CachedData {
    fn empty(key: String) -> Self {
        Self {
            key,
            created_at: Utc::now(),
            chat_completion_request: None,
            chat_completion_response: None,
            embedding_request: None,
            embedding_response: None,
            completion_chunks: None,
        }
    }

    pub fn chat(key: String, request: ChatCompletionRequest, response: ChatCompletionResponse) -> Self {
        Self {
            chat_completion_request: Some(request),
            chat_completion_response: Some(response),
            ..Self::empty(key)
        }
    }

    pub fn embedding(key: String, request: EmbeddingRequest, response: EmbeddingResponse) -> Self {
        Self {
            embedding_request: Some(request),
            embedding_response: Some(response),
            ..Self::empty(key)
        }
    }

    /// Chunks of a streamed completion with the request that produced them.
    pub fn stream(key: String, request: ChatCompletionRequest, chunks: Vec<CompletionChunk>) -> Self {
        Self {
            chat_completion_request: Some(request),
            completion_chunks: Some(chunks),
            ..Self::empty(key)
        }
    }
}

/// Fingerprint of a request.
///
/// Field order never matters; any change to any value changes the key. A
/// request that serializes to `null` is rejected.
pub fn compute_hash_key<T: Serialize + ?Sized>(request: &T) -> Result<String, CacheError> {
    let value = serde_json::to_value(request)?;
    if value.is_null() {
        return Err(CacheError::NilRequest);
    }

    let mut canonical = String::new();
    write_canonical(&value, &mut canonical)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

fn write_canonical(value: &Value, out: &mut String) -> Result<(), CacheError> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key)?);
                out.push(':');
                write_canonical(item, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&serde_json::to_string(scalar)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use serde_json::json;

    #[test]
    fn key_ignores_field_order() {
        let a = json!({"model": "m", "input": ["x"], "nested": {"b": 1, "a": 2}});
        let b = json!({"nested": {"a": 2, "b": 1}, "input": ["x"], "model": "m"});
        assert_eq!(compute_hash_key(&a).unwrap(), compute_hash_key(&b).unwrap());
    }

    #[test]
    fn key_changes_with_any_value() {
        let base = ChatCompletionRequest::new("m", vec![ChatMessage::user("hi")]);
        let key = compute_hash_key(&base).unwrap();
        assert_eq!(key.len(), 64);
        assert_eq!(key, compute_hash_key(&base.clone()).unwrap());

        let changed = base.clone().with_temperature(0.1);
        assert_ne!(key, compute_hash_key(&changed).unwrap());

        let streamed = base.with_streaming();
        assert_ne!(key, compute_hash_key(&streamed).unwrap());
    }

    #[test]
    fn null_request_is_rejected() {
        let nothing: Option<ChatCompletionRequest> = None;
        assert!(matches!(compute_hash_key(&nothing), Err(CacheError::NilRequest)));
    }

    #[test]
    fn envelope_holds_single_payload() {
        let request = EmbeddingRequest::new("mistral-embed", vec!["a".into()]);
        let response: EmbeddingResponse =
            serde_json::from_value(json!({"id": "e", "data": []})).unwrap();
        let data = CachedData::embedding("k".into(), request, response);

        let encoded = serde_json::to_value(&data).unwrap();
        assert!(encoded.get("embedding_response").is_some());
        assert!(encoded.get("chat_completion_response").is_none());
        assert!(encoded.get("completion_chunks").is_none());
    }
}

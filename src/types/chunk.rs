//! Streamed completion chunks

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chat::{FinishReason, finish_reason_opt};
use super::message::AssistantMessage;
use super::usage::UsageInfo;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionStreamChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: AssistantMessage,
    #[serde(
        default,
        deserialize_with = "finish_reason_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub finish_reason: Option<FinishReason>,
}

/// One incremental unit of a streamed chat completion.
///
/// `is_last_chunk`, the two latencies and `error` are filled in locally by the
/// stream reader and never travel on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub object: String,
    #[serde(default, with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
    /// Only present on the terminal chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
    #[serde(default)]
    pub choices: Vec<CompletionStreamChoice>,

    #[serde(skip)]
    pub is_last_chunk: bool,
    /// Read time since the previous chunk was emitted.
    #[serde(skip)]
    pub chunk_latency: Duration,
    /// Connection latency plus every chunk latency; set on the terminal chunk.
    #[serde(skip)]
    pub total_latency: Duration,
    /// Set when the stream failed; such a chunk carries nothing else and is
    /// always the last one received.
    #[serde(skip)]
    pub error: Option<ClientError>,
}

impl CompletionChunk {
    pub fn from_error(error: ClientError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Delta of the first choice; an empty message when there is none.
    pub fn delta_message(&self) -> AssistantMessage {
        self.choices
            .first()
            .map(|choice| choice.delta.clone())
            .unwrap_or_default()
    }

    /// Finish reason of the first choice.
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.choices.first()?.finish_reason.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_wire_chunk_and_skips_local_fields() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "id": "c1",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "mistral-small-latest",
            "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hi"}, "finish_reason": null}]
        }))
        .unwrap();

        assert_eq!(chunk.delta_message().text(), "Hi");
        assert!(chunk.finish_reason().is_none());
        assert!(chunk.usage.is_none());

        let encoded = serde_json::to_value(&chunk).unwrap();
        assert!(encoded.get("is_last_chunk").is_none());
        assert!(encoded.get("error").is_none());
    }

    #[test]
    fn error_chunk_has_empty_delta() {
        let chunk = CompletionChunk::from_error(ClientError::Stream("boom".into()));
        assert!(chunk.is_error());
        assert_eq!(chunk.delta_message(), AssistantMessage::default());
    }
}

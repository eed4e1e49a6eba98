//! Chat capability trait

use async_trait::async_trait;

use crate::error::ClientError;
use crate::streaming::ChunkStream;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse};

#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// Single-shot completion. Fails fast when `request.stream` is set.
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError>;

    /// Streamed completion. Fails fast unless `request.stream` is set.
    ///
    /// Errors met after the stream has started arrive as a final chunk whose
    /// `error` is set.
    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChunkStream, ClientError>;
}

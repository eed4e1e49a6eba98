//! Caching decorator over any [`Client`](crate::traits::Client)

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{CacheEngine, CachedData, compute_hash_key};
use crate::error::{CacheError, ClientError};
use crate::streaming::ChunkStream;
use crate::traits::{ChatCapability, EmbeddingCapability, ModelListingCapability};
use crate::types::{
    AssistantMessage, BaseModelCard, ChatCompletionRequest, ChatCompletionResponse,
    CompletionChunk, CompletionStreamChoice, EmbeddingRequest, EmbeddingResponse,
    ModelCapabilities,
};

/// Serves repeated requests from a [`CacheEngine`] instead of the API.
///
/// Model listing calls pass straight through.
pub struct CachedClient<C, E> {
    inner: C,
    engine: Arc<E>,
}

impl<C, E> std::fmt::Debug for CachedClient<C, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedClient").finish_non_exhaustive()
    }
}

impl<C, E> CachedClient<C, E>
where
    E: CacheEngine + 'static,
{
    pub fn new(inner: C, engine: E) -> Self {
        Self {
            inner,
            engine: Arc::new(engine),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Decoded envelope for `key`, `None` on a miss.
    async fn lookup(&self, key: &str) -> Result<Option<CachedData>, ClientError> {
        match self.engine.get(key).await {
            Ok(bytes) => {
                let data = serde_json::from_slice(&bytes).map_err(CacheError::from)?;
                Ok(Some(data))
            }
            Err(CacheError::Miss) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Shared hit/miss routine for single-response calls.
    async fn cached_call<Req, Resp, Fut>(
        &self,
        request: &Req,
        unpack: impl FnOnce(CachedData) -> Option<Resp>,
        pack: impl FnOnce(String, &Resp) -> CachedData,
        call: impl FnOnce() -> Fut,
    ) -> Result<Resp, ClientError>
    where
        Req: Serialize + Sync,
        Fut: Future<Output = Result<Resp, ClientError>>,
    {
        let key = compute_hash_key(request)?;

        if let Some(data) = self.lookup(&key).await? {
            if let Some(response) = unpack(data) {
                tracing::debug!(target: "mistral_client::cache", %key, "cache hit");
                return Ok(response);
            }
            tracing::debug!(target: "mistral_client::cache", %key, "cache entry lacks this payload, refreshing");
        }

        let response = call().await?;
        persist(self.engine.as_ref(), &key, &pack(key.clone(), &response)).await?;
        tracing::debug!(target: "mistral_client::cache", %key, "cache entry stored");
        Ok(response)
    }
}

async fn persist<E: CacheEngine + ?Sized>(
    engine: &E,
    key: &str,
    data: &CachedData,
) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(data)?;
    engine.set(key, bytes).await
}

/// Chunk appended to a relayed stream when storing it failed.
fn cache_failure_chunk(err: CacheError) -> CompletionChunk {
    CompletionChunk {
        choices: vec![CompletionStreamChoice {
            index: 0,
            delta: AssistantMessage::new(""),
            finish_reason: None,
        }],
        ..CompletionChunk::from_error(ClientError::Cache(err))
    }
}

/// Stored chunks carry no local fields; restore the terminal flag.
fn restore_chunk(mut chunk: CompletionChunk) -> CompletionChunk {
    chunk.is_last_chunk = chunk.finish_reason().is_some();
    chunk
}

#[async_trait]
impl<C, E> ChatCapability for CachedClient<C, E>
where
    C: ChatCapability,
    E: CacheEngine + 'static,
{
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError> {
        self.cached_call(
            request,
            |data| data.chat_completion_response,
            |key, response| CachedData::chat(key, request.clone(), response.clone()),
            || self.inner.chat_completion(request),
        )
        .await
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChunkStream, ClientError> {
        let key = compute_hash_key(request)?;

        if let Some(data) = self.lookup(&key).await? {
            if let Some(chunks) = data.completion_chunks {
                tracing::debug!(target: "mistral_client::cache", %key, chunks = chunks.len(), "cache hit, replaying stream");
                return Ok(ChunkStream::from_chunks(
                    chunks.into_iter().map(restore_chunk).collect(),
                ));
            }
        }

        let mut upstream = self.inner.chat_completion_stream(request).await?;
        let (tx, stream) = ChunkStream::channel();
        let engine = Arc::clone(&self.engine);
        let request = request.clone();

        tokio::spawn(async move {
            let mut buffered = Vec::new();
            let mut failed = false;

            while let Some(chunk) = upstream.recv().await {
                if chunk.is_error() {
                    failed = true;
                } else if !failed {
                    buffered.push(chunk.clone());
                }
                if tx.send(chunk).await.is_err() {
                    tracing::debug!(target: "mistral_client::cache", %key, "consumer dropped the stream, not caching");
                    return;
                }
            }

            if failed {
                tracing::debug!(target: "mistral_client::cache", %key, "stream ended with an error, not caching");
                return;
            }

            let data = CachedData::stream(key.clone(), request, buffered);
            match persist(engine.as_ref(), &key, &data).await {
                Ok(()) => {
                    tracing::debug!(target: "mistral_client::cache", %key, "streamed response stored")
                }
                Err(err) => {
                    tracing::warn!(target: "mistral_client::cache", %key, error = %err, "failed to store streamed response");
                    let _ = tx.send(cache_failure_chunk(err)).await;
                }
            }
        });

        Ok(stream)
    }
}

#[async_trait]
impl<C, E> EmbeddingCapability for CachedClient<C, E>
where
    C: EmbeddingCapability,
    E: CacheEngine + 'static,
{
    async fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, ClientError> {
        self.cached_call(
            request,
            |data| data.embedding_response,
            |key, response| CachedData::embedding(key, request.clone(), response.clone()),
            || self.inner.embeddings(request),
        )
        .await
    }
}

#[async_trait]
impl<C, E> ModelListingCapability for CachedClient<C, E>
where
    C: ModelListingCapability,
    E: CacheEngine + 'static,
{
    async fn list_models(&self) -> Result<Vec<BaseModelCard>, ClientError> {
        self.inner.list_models().await
    }

    async fn get_model(&self, model_id: &str) -> Result<BaseModelCard, ClientError> {
        self.inner.get_model(model_id).await
    }

    async fn search_models(
        &self,
        required: &ModelCapabilities,
    ) -> Result<Vec<BaseModelCard>, ClientError> {
        self.inner.search_models(required).await
    }
}

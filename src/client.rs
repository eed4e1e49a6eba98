//! La Plateforme HTTP client
//!
//! [`MistralClient`] turns typed requests into HTTP calls through the retrying
//! [`HttpExecutor`] and decodes the replies. [`new_client`] is the usual entry
//! point: it also wraps the client in the response cache when the
//! configuration asks for one.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{CachedClient, LocalFsEngine};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::execution::http::http_event;
use crate::execution::{HttpExecutor, HttpResponse, HttpTransport, ReqwestTransport};
use crate::streaming::{ChunkStream, spawn_chunk_stream};
use crate::traits::{ChatCapability, Client, EmbeddingCapability, ModelListingCapability};
use crate::types::models::ModelList;
use crate::types::{
    BaseModelCard, ChatCompletionRequest, ChatCompletionResponse, EmbeddingRequest,
    EmbeddingResponse,
};
use crate::utils::{CancelHandle, RateLimiter};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const EMBEDDINGS_PATH: &str = "/v1/embeddings";
const MODELS_PATH: &str = "/v1/models";

/// Build a client from `config`, behind the local cache when it is enabled.
pub fn new_client(config: ClientConfig) -> Result<Arc<dyn Client>, ClientError> {
    let cache = config.cache.clone();
    let client = MistralClient::new(config)?;

    if !cache.enabled {
        return Ok(Arc::new(client));
    }

    let engine = LocalFsEngine::new(&cache.dir)?;
    tracing::debug!(target: "mistral_client::cache", dir = %cache.dir.display(), "local response cache enabled");
    Ok(Arc::new(CachedClient::new(client, engine)))
}

/// Direct client for the La Plateforme REST API. Cheap to clone.
#[derive(Clone)]
pub struct MistralClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    executor: HttpExecutor,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    cancel: CancelHandle,
    verbose: bool,
}

impl std::fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralClient")
            .field("base_url", &self.inner.base_url)
            .field("executor", &self.inner.executor)
            .field("rate_limited", &self.inner.rate_limiter.is_some())
            .finish()
    }
}

impl MistralClient {
    /// Validate `config` and build the client. No request is sent.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let transport: Arc<dyn HttpTransport> = match config.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.timeout)?),
        };
        let executor = HttpExecutor::new(
            transport,
            config.api_key,
            config.retry,
            config.cancel.clone(),
            config.verbose,
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                executor,
                rate_limiter: config.rate_limiter,
                cancel: config.cancel,
                verbose: config.verbose,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.inner.cancel
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Take a rate limiter token, giving up if the call is cancelled first.
    async fn throttle(&self) -> Result<(), ClientError> {
        match &self.inner.rate_limiter {
            Some(limiter) => self.inner.cancel.run(limiter.wait()).await?,
            None => Ok(()),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, ClientError> {
        let url = self.url(path);
        http_event!(self.inner.verbose, %method, url = %url, "sending request");
        self.inner.executor.send(method, &url, body).await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, ClientError> {
        let body = serde_json::to_vec(body)
            .map_err(|e| ClientError::Json(format!("failed to marshal request body: {e}")))?;
        self.send(Method::POST, path, Some(Bytes::from(body))).await
    }
}

async fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ClientError> {
    let body = response.response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| ClientError::Json(format!("failed to unmarshal response body: {e}")))
}

#[async_trait]
impl ChatCapability for MistralClient {
    async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ClientError> {
        if request.stream {
            return Err(ClientError::InvalidRequest(
                "the method chat_completion does not support streaming".into(),
            ));
        }
        self.throttle().await?;

        let response = self.post_json(CHAT_COMPLETIONS_PATH, request).await?;
        let latency = response.latency;
        let mut completion: ChatCompletionResponse = decode(response).await?;
        completion.latency = latency;

        http_event!(
            self.inner.verbose,
            id = %completion.id,
            model = %completion.model,
            latency_ms = latency.as_millis() as u64,
            "chat completion received"
        );
        Ok(completion)
    }

    async fn chat_completion_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChunkStream, ClientError> {
        if !request.stream {
            return Err(ClientError::InvalidRequest(
                "the method chat_completion_stream requires the stream flag to be set".into(),
            ));
        }
        self.throttle().await?;

        let response = self.post_json(CHAT_COMPLETIONS_PATH, request).await?;
        http_event!(
            self.inner.verbose,
            latency_ms = response.latency.as_millis() as u64,
            "chat completion stream opened"
        );
        Ok(spawn_chunk_stream(
            response.response.into_reader(),
            response.latency,
            self.inner.cancel.clone(),
        ))
    }
}

#[async_trait]
impl EmbeddingCapability for MistralClient {
    async fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, ClientError> {
        self.throttle().await?;

        let response = self.post_json(EMBEDDINGS_PATH, request).await?;
        let latency = response.latency;
        let mut embeddings: EmbeddingResponse = decode(response).await?;
        embeddings.latency = latency;
        Ok(embeddings)
    }
}

#[async_trait]
impl ModelListingCapability for MistralClient {
    async fn list_models(&self) -> Result<Vec<BaseModelCard>, ClientError> {
        let response = self.send(Method::GET, MODELS_PATH, None).await?;
        let list: ModelList = decode(response).await?;
        Ok(list.data)
    }

    async fn get_model(&self, model_id: &str) -> Result<BaseModelCard, ClientError> {
        let path = format!("{MODELS_PATH}/{}", urlencoding::encode(model_id));
        match self.send(Method::GET, &path, None).await {
            Ok(response) => decode(response).await,
            Err(err) if err.status_code() == Some(404) => {
                Err(ClientError::ModelNotFound(model_id.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}

//! Embedding capability trait

use async_trait::async_trait;

use crate::error::ClientError;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

#[async_trait]
pub trait EmbeddingCapability: Send + Sync {
    async fn embeddings(&self, request: &EmbeddingRequest)
    -> Result<EmbeddingResponse, ClientError>;
}

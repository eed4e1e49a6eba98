//! Core error types

use std::sync::Arc;
use thiserror::Error;

use super::api::ApiError;

/// Error returned by every client operation.
///
/// The variants carry enough structure to branch on the failure kind with the
/// predicate helpers (`is_retryable`, `is_cache_failure`, ...) instead of matching
/// on message text.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Structured 4xx response from the API.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Non-success status outside the retry set and outside the 4xx range.
    #[error("HTTP request failed with status {status} and body '{body}'")]
    HttpStatus { status: u16, body: String },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected end of stream: {0}")]
    UnexpectedEof(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request cancelled")]
    Cancelled,

    /// Every attempt failed on a retryable condition; only the last failure is kept.
    #[error("exhausted retries after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ClientError>,
    },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("cache failure: {0}")]
    Cache(#[from] CacheError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Transport-level failures worth another attempt.
    ///
    /// Status-code retries are decided by the retry policy, not here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::UnexpectedEof(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the cache subsystem failed, as opposed to the upstream API.
    pub fn is_cache_failure(&self) -> bool {
        matches!(self, Self::Cache(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ModelNotFound(_)) || self.status_code() == Some(404)
    }

    /// HTTP status carried by the error, looking through retry exhaustion.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.code()),
            Self::HttpStatus { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status_code(),
            _ => None,
        }
    }

    /// The structured API error, looking through retry exhaustion.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::RetriesExhausted { last, .. } => last.api_error(),
            _ => None,
        }
    }
}

/// Errors raised by a [`CacheEngine`](crate::cache::CacheEngine) or by the cache
/// decorator itself.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The key is not stored. This is the only error the decorator treats as a
    /// signal to call through to the wrapped client.
    #[error("cache miss")]
    Miss,

    #[error("request cannot be nil")]
    NilRequest,

    #[error("cache storage error: {0}")]
    Storage(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("cache codec error: {0}")]
    Codec(#[source] Arc<serde_json::Error>),
}

impl CacheError {
    /// Wrap a backend error so it stays reachable through `source()`.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Arc::new(err))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

//! # mistral-client - An async client for Mistral La Plateforme
//!
//! Typed requests for chat completions (single-shot and streamed), embeddings
//! and the model catalogue, sent with retries and backoff, with an optional
//! response cache on the local filesystem.
//!
#![deny(unsafe_code)]

//! ## Features
//!
//! - **Polymorphic content**: message content is either plain text or typed chunks (text, images, documents, thinking, ...).
//! - **Retries**: configurable retry set and full-jitter exponential backoff.
//! - **Streaming**: server-sent events decoded into typed chunks with per-chunk latency.
//! - **Response cache**: content-addressed, keyed on the request itself.
//! - **Capability traits**: the cache and any test double stand in for the HTTP client.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mistral_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = new_client(ClientConfig::from_env()?)?;
//!
//!     let request = ChatCompletionRequest::new(
//!         "mistral-small-latest",
//!         vec![ChatMessage::user("Hello, world!")],
//!     );
//!     let response = client.chat_completion(&request).await?;
//!     if let Some(message) = response.assistant_message() {
//!         println!("Response: {}", message.text());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use mistral_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MistralClient::new(ClientConfig::from_env()?)?;
//!     let request = ChatCompletionRequest::new(
//!         "mistral-small-latest",
//!         vec![ChatMessage::user("Tell me a story")],
//!     )
//!     .with_streaming();
//!
//!     let mut stream = client.chat_completion_stream(&request).await?;
//!     while let Some(chunk) = stream.next().await {
//!         if let Some(err) = &chunk.error {
//!             return Err(err.clone().into());
//!         }
//!         print!("{}", chunk.delta_message().text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod execution;
pub mod retry;
pub mod streaming;
pub mod traits;
pub mod types;
pub mod utils;

pub use client::{MistralClient, new_client};
pub use config::{CacheConfig, ClientConfig};
pub use error::{ApiError, CacheError, ClientError};

/// Convenient pre-imports for the most common types and traits
pub mod prelude {
    pub use crate::cache::{CacheEngine, CachedClient, LocalFsEngine};
    pub use crate::client::{MistralClient, new_client};
    pub use crate::config::{CacheConfig, ClientConfig};
    pub use crate::error::{ApiError, CacheError, ClientError};
    pub use crate::retry::RetryPolicy;
    pub use crate::streaming::ChunkStream;
    pub use crate::traits::{ChatCapability, Client, EmbeddingCapability, ModelListingCapability};
    pub use crate::types::*;
    pub use crate::utils::{BucketRateLimiter, CancelHandle, NoneRateLimiter, RateLimiter};
}

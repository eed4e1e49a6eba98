//! Error Handling Module
//!
//! - `types`: the crate-wide `ClientError` and the cache subsystem's `CacheError`
//! - `api`: `ApiError`, the structured form of a non-retryable 4xx response
//! - `conversions`: `From` impls for the transport/codec errors we wrap
//!
//! # Example
//!
//! ```rust,ignore
//! use mistral_client::error::{ApiError, ClientError};
//!
//! let err = ClientError::from(ApiError::new(401, None));
//! assert_eq!(err.status_code(), Some(401));
//! assert!(!err.is_retryable());
//! ```

mod api;
mod conversions;
pub mod types;

pub use api::ApiError;
pub(crate) use conversions::body_read_error;
pub use types::*;

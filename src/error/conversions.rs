//! Type Conversions for ClientError
//!
//! `From` implementations for the transport, codec and IO errors the client wraps.

use std::error::Error as _;
use std::sync::Arc;

use super::types::{CacheError, ClientError};

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if is_unexpected_eof(&err) {
            Self::UnexpectedEof(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Walk the source chain looking for a truncated exchange: an IO error of
/// kind `UnexpectedEof`, or hyper reporting the connection closed before a
/// complete message arrived.
fn is_unexpected_eof(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::UnexpectedEof {
                return true;
            }
        }
        if cause
            .downcast_ref::<hyper::Error>()
            .is_some_and(hyper::Error::is_incomplete_message)
        {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Body read failures surface as IO errors so they can flow through
/// `AsyncRead` adapters; keep the timeout and truncation kinds visible.
pub(crate) fn body_read_error(err: reqwest::Error) -> std::io::Error {
    let kind = if err.is_timeout() {
        std::io::ErrorKind::TimedOut
    } else if is_unexpected_eof(&err) {
        std::io::ErrorKind::UnexpectedEof
    } else {
        std::io::ErrorKind::Other
    };
    std::io::Error::new(kind, err)
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::Timeout(err.to_string()),
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof(err.to_string()),
            _ => Self::Http(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(Arc::new(err))
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::Miss
        } else {
            Self::storage(err)
        }
    }
}

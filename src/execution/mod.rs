//! HTTP execution layer
//!
//! - `transport`: the injectable [`HttpTransport`] seam and its reqwest implementation
//! - `http`: [`HttpExecutor`], which adds auth headers, retries and backoff on top

pub mod http;
pub mod transport;

pub use http::{HttpExecutor, HttpResponse};
pub use transport::{
    ByteStream, HttpTransport, HttpTransportRequest, HttpTransportResponse, ReqwestTransport,
};

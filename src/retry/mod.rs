//! Retry module
//! - policy.rs: status/transport retry decisions and full-jitter backoff

pub mod policy;

pub use policy::*;

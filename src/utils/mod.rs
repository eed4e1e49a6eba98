//! Utility modules
//!
//! - `cancel`: cooperative cancellation handle
//! - `rate_limit`: client-side token bucket

pub mod cancel;
pub mod rate_limit;

pub use cancel::CancelHandle;
pub use rate_limit::{BucketRateLimiter, NoneRateLimiter, RateLimiter};

//! Client configuration
//!
//! [`ClientConfig`] gathers everything a [`MistralClient`](crate::MistralClient)
//! needs. Start from [`ClientConfig::new`] or [`ClientConfig::from_env`] and
//! adjust with the `with_*` setters; [`ClientConfig::validate`] runs when the
//! client is built.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::cache::DEFAULT_CACHE_DIR;
use crate::error::ClientError;
use crate::execution::HttpTransport;
use crate::retry::RetryPolicy;
use crate::utils::{CancelHandle, RateLimiter};

pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable read by [`ClientConfig::from_env`].
pub const API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Response cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

pub struct ClientConfig {
    /// Bearer token sent with every request.
    pub api_key: SecretString,
    /// API root, without a trailing `/`.
    pub base_url: String,
    /// Whole-request timeout of the default transport.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Log requests and retries at `info` instead of `debug`.
    pub verbose: bool,
    /// Replaces the default reqwest transport; `timeout` is then not applied.
    pub transport: Option<Arc<dyn HttpTransport>>,
    /// Waited on before every chat and embedding call.
    pub rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub cache: CacheConfig,
    pub cancel: CancelHandle,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("has_api_key", &!self.api_key.expose_secret().is_empty())
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("verbose", &self.verbose)
            .field("custom_transport", &self.transport.is_some())
            .field("rate_limited", &self.rate_limiter.is_some())
            .field("cache", &self.cache)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            verbose: false,
            transport: None,
            rate_limiter: None,
            cache: CacheConfig::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Read the API key from `MISTRAL_API_KEY`.
    pub fn from_env() -> Result<Self, ClientError> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| {
            ClientError::Configuration(format!("{API_KEY_ENV} environment variable is not set"))
        })?;
        Ok(Self::new(key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry count and wait bounds; the retried statuses are kept.
    pub fn with_retry(mut self, max_retries: u32, wait_min: Duration, wait_max: Duration) -> Self {
        self.retry = self
            .retry
            .with_max_retries(max_retries)
            .with_wait(wait_min, wait_max);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry.normalized();
        self
    }

    pub fn with_retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry = self.retry.with_retry_status_codes(codes);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Turn the local response cache on or off.
    pub fn with_local_cache(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// Cache under `dir`. Enables the cache.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache.enabled = true;
        self.cache.dir = dir.into();
        self
    }

    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Check the settings a client cannot run without.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(ClientError::Configuration("API key cannot be empty".into()));
        }
        if self.base_url.is_empty() {
            return Err(ClientError::Configuration("Base URL cannot be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::Configuration(
                "Base URL must start with http:// or https://".into(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::Configuration("Timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new("key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from("./.mistral/cache"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ClientConfig::new("key").with_base_url("http://localhost:8080//");
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn validation_rejects_bad_settings() {
        assert!(ClientConfig::new("  ").validate().is_err());
        assert!(ClientConfig::new("key").with_base_url("ftp://x").validate().is_err());
        assert!(ClientConfig::new("key").with_timeout(Duration::ZERO).validate().is_err());
    }

    #[test]
    fn retry_bounds_are_normalized() {
        let config = ClientConfig::new("key").with_retry(
            5,
            Duration::from_secs(2),
            Duration::from_millis(100),
        );
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.wait_min, Duration::from_millis(100));
        assert_eq!(config.retry.wait_max, Duration::from_secs(2));
    }

    #[test]
    fn cache_dir_enables_cache() {
        let config = ClientConfig::new("key").with_cache_dir("/tmp/elsewhere");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.dir, PathBuf::from("/tmp/elsewhere"));
    }

    #[test]
    fn debug_hides_key() {
        let rendered = format!("{:?}", ClientConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("has_api_key: true"));
    }
}

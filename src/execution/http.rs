//! Retrying HTTP execution
//!
//! One call to [`HttpExecutor::send`] performs up to `1 + max_retries`
//! attempts. A response is retried when its status is in the policy's retry set;
//! a transport failure is retried only when it is a timeout or a truncated
//! body. Everything else ends the call on the spot:
//! - 2xx: returned, body unread, with the attempt's latency;
//! - other 4xx: decoded into an [`ApiError`];
//! - any other status: [`ClientError::HttpStatus`] with the raw body.
//!
//! Cancellation is observed during every roundtrip and every backoff sleep.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use super::transport::{HttpTransport, HttpTransportRequest, HttpTransportResponse};
use crate::error::{ApiError, ClientError};
use crate::retry::RetryPolicy;
use crate::utils::CancelHandle;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Emit at `info` when the client is verbose, `debug` otherwise.
macro_rules! http_event {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!(target: "mistral_client::http", $($arg)+);
        } else {
            tracing::debug!(target: "mistral_client::http", $($arg)+);
        }
    };
}
pub(crate) use http_event;

/// A successful response with its body still open.
#[derive(Debug)]
pub struct HttpResponse {
    pub response: HttpTransportResponse,
    /// Time to response headers on the successful attempt.
    pub latency: Duration,
    /// Attempts made, the successful one included.
    pub attempts: u32,
}

pub struct HttpExecutor {
    transport: Arc<dyn HttpTransport>,
    api_key: SecretString,
    retry: RetryPolicy,
    cancel: CancelHandle,
    verbose: bool,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("retry", &self.retry)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl HttpExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_key: SecretString,
        retry: RetryPolicy,
        cancel: CancelHandle,
        verbose: bool,
    ) -> Self {
        Self {
            transport,
            api_key,
            retry: retry.normalized(),
            cancel,
            verbose,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn cancel_handle(&self) -> &CancelHandle {
        &self.cancel
    }

    fn headers(&self) -> Result<HeaderMap, ClientError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key.expose_secret()))
            .map_err(|_| {
                ClientError::Configuration("API key contains invalid header characters".into())
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Ok(headers)
    }

    /// Send a request, retrying per policy.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, ClientError> {
        let headers = self.headers()?;
        let budget = self.retry.attempt_budget();

        for attempt in 0..budget {
            let attempts = attempt + 1;
            let has_next = attempts < budget;
            let request = HttpTransportRequest {
                method: method.clone(),
                url: url.to_string(),
                headers: headers.clone(),
                body: body.clone(),
            };

            let started = Instant::now();
            let outcome = self.cancel.run(self.transport.execute(request)).await?;
            let latency = started.elapsed();

            let response = match outcome {
                Ok(response) => response,
                Err(err) if self.retry.should_retry_error(&err) => {
                    if !has_next {
                        return Err(exhausted(attempts, err));
                    }
                    let wait = self.retry.backoff(attempt);
                    http_event!(
                        self.verbose,
                        %method,
                        url,
                        attempt = attempts,
                        max_retries = self.retry.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "HTTP request error, retrying"
                    );
                    self.sleep(wait).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            if response.is_success() {
                http_event!(self.verbose, %method, url, attempts, latency_ms = latency.as_millis() as u64, "HTTP request succeeded");
                return Ok(HttpResponse {
                    response,
                    latency,
                    attempts,
                });
            }

            let status = response.status;
            if self.retry.should_retry_status(status) {
                if !has_next {
                    // Decoded API errors pass through; only raw statuses are wrapped.
                    return Err(match classify(response).await {
                        api @ ClientError::Api(_) => api,
                        last => exhausted(attempts, last),
                    });
                }
                // Free the connection before waiting.
                response.bytes().await?;
                let wait = self.retry.backoff(attempt);
                http_event!(
                    self.verbose,
                    %method,
                    url,
                    status,
                    attempt = attempts,
                    max_retries = self.retry.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    "HTTP status retryable, retrying"
                );
                self.sleep(wait).await?;
                continue;
            }

            return Err(classify(response).await);
        }

        Err(ClientError::Internal(
            "retry loop ended without an outcome".to_string(),
        ))
    }

    async fn sleep(&self, wait: Duration) -> Result<(), ClientError> {
        self.cancel.run(tokio::time::sleep(wait)).await
    }
}

fn exhausted(attempts: u32, last: ClientError) -> ClientError {
    tracing::warn!(target: "mistral_client::http", attempts, error = %last, "retries exhausted");
    ClientError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    }
}

/// Turn a non-success response into the matching error.
async fn classify(response: HttpTransportResponse) -> ClientError {
    let status = response.status;
    let body = response.bytes().await.unwrap_or_default();

    if (400..500).contains(&status) {
        ApiError::from_body(status, &body).into()
    } else {
        ClientError::HttpStatus {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted outcomes and records the requests it saw.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<(u16, &'static str), ClientError>>>,
        seen: Mutex<Vec<HttpTransportRequest>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(u16, &'static str), ClientError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn execute(
            &self,
            request: HttpTransportRequest,
        ) -> Result<HttpTransportResponse, ClientError> {
            self.seen.lock().unwrap().push(request);
            let next = self.script.lock().unwrap().pop_front().expect("script exhausted");
            next.map(|(status, body)| HttpTransportResponse::from_bytes(status, body))
        }
    }

    fn executor(transport: Arc<ScriptedTransport>, max_retries: u32) -> HttpExecutor {
        let retry = RetryPolicy::new()
            .with_max_retries(max_retries)
            .with_wait(Duration::from_millis(1), Duration::from_millis(2));
        HttpExecutor::new(
            transport,
            SecretString::from("test-key".to_string()),
            retry,
            CancelHandle::new(),
            false,
        )
    }

    #[tokio::test]
    async fn retries_retryable_statuses_then_succeeds() {
        let transport = ScriptedTransport::new(vec![Ok((500, "")), Ok((503, "")), Ok((200, "{}"))]);
        let exec = executor(transport.clone(), 3);

        let resp = exec.send(Method::POST, "http://x/v1/chat/completions", None).await.unwrap();
        assert_eq!(resp.attempts, 3);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn sets_auth_and_content_type_headers() {
        let transport = ScriptedTransport::new(vec![Ok((200, "{}"))]);
        let exec = executor(transport.clone(), 0);
        exec.send(Method::GET, "http://x/v1/models", None).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].headers[AUTHORIZATION], "Bearer test-key");
        assert!(seen[0].headers[AUTHORIZATION].is_sensitive());
        assert_eq!(seen[0].headers[CONTENT_TYPE], JSON_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok((
            400,
            r#"{"message": {"detail": [{"type": "extra_forbidden", "loc": ["body", "x"], "msg": "Extra inputs are not permitted"}]}, "type": "invalid_request_error"}"#,
        ))]);
        let exec = executor(transport.clone(), 3);

        let err = exec.send(Method::POST, "http://x", None).await.unwrap_err();
        assert_eq!(transport.calls(), 1);
        assert_eq!(
            err.to_string(),
            "[400] invalid_request_error: extra_forbidden: Extra inputs are not permitted (body.x)"
        );
    }

    #[tokio::test]
    async fn non_retryable_server_status_keeps_body() {
        let transport = ScriptedTransport::new(vec![Ok((501, "not implemented"))]);
        let exec = executor(transport, 3);

        let err = exec.send(Method::POST, "http://x", None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "HTTP request failed with status 501 and body 'not implemented'"
        );
    }

    #[tokio::test]
    async fn exhaustion_keeps_only_last_failure() {
        let transport = ScriptedTransport::new(vec![Ok((502, "first")), Ok((503, "last"))]);
        let exec = executor(transport.clone(), 1);

        let err = exec.send(Method::POST, "http://x", None).await.unwrap_err();
        assert_eq!(transport.calls(), 2);
        match err {
            ClientError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last, ClientError::HttpStatus { status: 503, ref body } if body == "last"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limited_final_attempt_returns_api_error() {
        const BODY: &str = r#"{"message":"Requests rate limit exceeded","type":"rate_limited"}"#;
        let transport = ScriptedTransport::new(vec![Ok((429, BODY)), Ok((429, BODY))]);
        let exec = executor(transport.clone(), 1);

        let err = exec.send(Method::POST, "http://x", None).await.unwrap_err();
        assert_eq!(transport.calls(), 2);
        assert!(matches!(err, ClientError::Api(_)));
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.to_string(), "[429] rate_limited: Requests rate limit exceeded");
    }

    #[tokio::test]
    async fn transport_timeouts_retry_but_connection_errors_do_not() {
        let transport = ScriptedTransport::new(vec![
            Err(ClientError::Timeout("slow".into())),
            Ok((200, "{}")),
        ]);
        let resp = executor(transport.clone(), 2)
            .send(Method::GET, "http://x", None)
            .await
            .unwrap();
        assert_eq!(resp.attempts, 2);

        let transport = ScriptedTransport::new(vec![Err(ClientError::Connection("refused".into()))]);
        let err = executor(transport.clone(), 2)
            .send(Method::GET, "http://x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn retries_and_exhaustion_are_logged() {
        let transport = ScriptedTransport::new(vec![Ok((503, "")), Ok((503, ""))]);
        let exec = executor(transport, 1);

        exec.send(Method::POST, "http://x", None).await.unwrap_err();
        assert!(logs_contain("HTTP status retryable, retrying"));
        assert!(logs_contain("retries exhausted"));
    }

    #[tokio::test]
    async fn cancellation_stops_before_sending() {
        let transport = ScriptedTransport::new(vec![Ok((200, "{}"))]);
        let exec = executor(transport.clone(), 0);
        exec.cancel_handle().cancel();

        let err = exec.send(Method::GET, "http://x", None).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}

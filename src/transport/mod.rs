//! Retrying HTTP transport.
//!
//! Executes one logical API request with timeout, retry, and backoff, and
//! classifies the response into success, retryable failure, or terminal
//! failure. The actual wire I/O sits behind [`HttpBackend`] so tests can
//! substitute a double.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{map_status, Error, Result};

const USER_AGENT: &str = concat!("youtubetranscript-rust/", env!("CARGO_PKG_VERSION"));

/// HTTP method subset the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

/// One logical API request, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Raw response as seen by the transport: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Narrow seam over the HTTP library: send one request, get status + body.
/// Implementations add authentication and enforce the per-request timeout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpBackend: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// [`HttpBackend`] backed by reqwest, with bearer auth and the configured
/// per-request timeout.
pub struct ReqwestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReqwestBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transport {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Delete => self.http.delete(&url),
        };
        builder = builder
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", self.api_key),
            )
            .header(reqwest::header::USER_AGENT, USER_AGENT);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport {
            message: err.to_string(),
        }
    }
}

/// Executes requests against a backend under the configured retry policy.
///
/// Stateless apart from the immutable policy: each `execute` call is
/// independent and safe to run concurrently.
#[derive(Clone)]
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    retry: RetryPolicy,
}

impl Transport {
    pub fn new(backend: Arc<dyn HttpBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Execute a request, retrying retryable failures (network errors,
    /// timeouts, 5xx, 429) up to `max_retries` additional attempts.
    ///
    /// Non-retryable failures terminate immediately without consuming the
    /// remaining budget. A 429 `retry_after` hint overrides the computed
    /// backoff for the next attempt exactly.
    pub async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let attempts = self.retry.max_retries + 1;
        let mut delay_override = None;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = delay_override
                    .take()
                    .unwrap_or_else(|| self.retry.backoff_delay(attempt - 1));
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    path = %request.path,
                    "backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            let outcome = match self.backend.send(&request).await {
                Ok(response) => self.interpret(response),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                    if let Error::RateLimit { retry_after, .. } = &err {
                        delay_override = Some(*retry_after);
                    }
                    warn!(error = %err, attempt = attempt + 1, path = %request.path, "retrying");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or(Error::Transport {
            message: "request failed after retries".to_string(),
        }))
    }

    /// Classify a raw response into a decoded payload or a typed error.
    fn interpret(&self, response: ApiResponse) -> Result<Value> {
        let success = (200..300).contains(&response.status);
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(value) if success => Ok(value),
            Ok(value) => Err(map_status(
                response.status,
                &value,
                self.retry.rate_limit_fallback,
            )),
            Err(_) if success => Err(Error::parse(format!(
                "invalid JSON in {} response",
                response.status
            ))),
            // Error statuses keep their classification even when the body
            // is not JSON (an LB's HTML 503 page must stay retryable).
            Err(_) => Err(map_status(
                response.status,
                &Value::Null,
                self.retry.rate_limit_fallback,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(10),
            ..RetryPolicy::default()
        }
    }

    fn json_response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    fn counting_backend(
        responses: impl Fn(u32) -> Result<ApiResponse> + Send + Sync + 'static,
    ) -> (MockHttpBackend, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let mut backend = MockHttpBackend::new();
        backend
            .expect_send()
            .returning(move |_| responses(seen.fetch_add(1, Ordering::SeqCst)));
        (backend, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retry_budget_on_persistent_503() {
        let (backend, calls) =
            counting_backend(|_| Ok(json_response(503, r#"{"message":"unavailable"}"#)));
        let transport = Transport::new(Arc::new(backend), policy());

        let err = transport.execute(ApiRequest::get("/stats")).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 503, .. }));
        // max_retries retries after the initial attempt
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let (backend, calls) = counting_backend(|n| {
            if n < 2 {
                Ok(json_response(503, r#"{"message":"unavailable"}"#))
            } else {
                Ok(json_response(200, r#"{"ok":true}"#))
            }
        });
        let transport = Transport::new(Arc::new(backend), policy());

        let value = transport.execute(ApiRequest::get("/stats")).await.unwrap();
        assert_eq!(value["ok"], true);
        // k failures then success issues exactly k+1 requests
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn network_errors_count_against_the_budget() {
        let (backend, calls) = counting_backend(|n| {
            if n == 0 {
                Err(Error::Timeout)
            } else {
                Ok(json_response(200, r#"{"ok":true}"#))
            }
        });
        let transport = Transport::new(Arc::new(backend), policy());

        transport.execute(ApiRequest::get("/stats")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_overrides_backoff() {
        let (backend, _) = counting_backend(|n| {
            if n == 0 {
                Ok(json_response(
                    429,
                    r#"{"message":"slow down","retry_after":5}"#,
                ))
            } else {
                Ok(json_response(200, r#"{"ok":true}"#))
            }
        });
        let transport = Transport::new(Arc::new(backend), policy());

        let started = tokio::time::Instant::now();
        transport.execute(ApiRequest::get("/stats")).await.unwrap();
        // The next attempt happens no sooner than the server's hint.
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_surfaces_after_budget_exhaustion() {
        let (backend, calls) = counting_backend(|_| {
            Ok(json_response(
                429,
                r#"{"message":"slow down","retry_after":1}"#,
            ))
        });
        let transport = Transport::new(Arc::new(backend), policy());

        let err = transport.execute(ApiRequest::get("/stats")).await.unwrap_err();
        assert!(matches!(err, Error::RateLimit { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_4xx_terminates_immediately() {
        let (backend, calls) = counting_backend(|_| {
            Ok(json_response(
                404,
                r#"{"error_code":"no_captions","message":"none"}"#,
            ))
        });
        let transport = Transport::new(Arc::new(backend), policy());

        let err = transport
            .execute(ApiRequest::get("/transcripts/xyz"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCaptions { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_success_body_is_a_parse_error() {
        let (backend, calls) = counting_backend(|_| {
            Ok(ApiResponse {
                status: 200,
                body: b"<html>not json</html>".to_vec(),
            })
        });
        let transport = Transport::new(Arc::new(backend), policy());

        let err = transport.execute(ApiRequest::get("/stats")).await.unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_json_503_is_still_retryable() {
        let (backend, calls) = counting_backend(|_| {
            Ok(ApiResponse {
                status: 503,
                body: b"<html>gateway unavailable</html>".to_vec(),
            })
        });
        let transport = Transport::new(Arc::new(backend), policy());

        let err = transport.execute(ApiRequest::get("/stats")).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}

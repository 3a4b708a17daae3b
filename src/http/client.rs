//! HTTP client with retry and rate limiting
//!
//! Provides a resilient HTTP client that handles:
//! - Automatic retries with exponential backoff
//! - Rate-limit waits driven by the server's reset header
//! - Transient vs fatal transport error classification
//! - Optional client-side throttling and cancellation

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::retry::{
    classify_error, rate_limit_wait, BackoffPolicy, TransientKind, RATE_LIMIT_FALLBACK,
    RATE_LIMIT_RESET_HEADER,
};
use crate::error::{Error, Result};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Accept header sent with every request
pub const ACCEPT_HEADER: &str = "application/vnd.github+json";

/// API version header name
pub const API_VERSION_HEADER: &str = "x-github-api-version";

/// API version sent with every request
pub const API_VERSION: &str = "2022-11-28";

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("gh-cost-center/", env!("CARGO_PKG_VERSION"));

/// Upper bound on how much of an error response body is kept
pub const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

/// Largest success body accepted before the call fails
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Configuration for the HTTP client
#[derive(Clone)]
pub struct HttpClientConfig {
    /// Per-attempt request timeout
    pub timeout: Duration,
    /// Total attempts per logical call (first try included)
    pub max_attempts: u32,
    /// Backoff for transport failures and 5xx responses
    pub backoff: BackoffPolicy,
    /// Wait for a 429 without a usable reset header
    pub rate_limit_fallback: Duration,
    /// Client-side throttling, off unless configured
    pub rate_limit: Option<RateLimiterConfig>,
    /// Extra headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
    /// Bearer token
    pub token: Option<String>,
    /// Bound on error body reads
    pub max_error_body: usize,
    /// Bound on success body reads
    pub max_body: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            backoff: BackoffPolicy::default(),
            rate_limit_fallback: RATE_LIMIT_FALLBACK,
            rate_limit: None,
            default_headers: HashMap::new(),
            user_agent: USER_AGENT.to_string(),
            token: None,
            max_error_body: MAX_ERROR_BODY_BYTES,
            max_body: MAX_BODY_BYTES,
        }
    }
}

impl std::fmt::Debug for HttpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientConfig")
            .field("timeout", &self.timeout)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("rate_limit_fallback", &self.rate_limit_fallback)
            .field("rate_limit", &self.rate_limit)
            .field("default_headers", &self.default_headers)
            .field("user_agent", &self.user_agent)
            .field("has_token", &self.token.is_some())
            .field("max_error_body", &self.max_error_body)
            .field("max_body", &self.max_body)
            .finish()
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the total attempt count
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the backoff base delay
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.config.backoff = BackoffPolicy::new(base);
        self
    }

    /// Set the wait used for 429 responses without a reset header
    pub fn rate_limit_fallback(mut self, wait: Duration) -> Self {
        self.config.rate_limit_fallback = wait;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the largest accepted success body
    pub fn max_body(mut self, bytes: usize) -> Self {
        self.config.max_body = bytes;
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// One outbound call: method, absolute URL and optional JSON body
///
/// Built once and re-sent unchanged on every retry.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    body: Option<Value>,
}

impl ApiRequest {
    /// Create a request for an absolute URL
    pub fn new(method: Method, url: &str) -> Result<Self> {
        Ok(Self {
            method,
            url: Url::parse(url)?,
            body: None,
        })
    }

    /// Create a GET request
    pub fn get(url: &str) -> Result<Self> {
        Self::new(Method::GET, url)
    }

    /// Create a POST request with a JSON body
    pub fn post<B: Serialize + ?Sized>(url: &str, body: &B) -> Result<Self> {
        Self::new(Method::POST, url)?.json(body)
    }

    /// Create a DELETE request with a JSON body
    pub fn delete<B: Serialize + ?Sized>(url: &str, body: &B) -> Result<Self> {
        Self::new(Method::DELETE, url)?.json(body)
    }

    /// Set the JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Set a query parameter, replacing any existing value for `key`
    #[must_use]
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        {
            let mut pairs = self.url.query_pairs_mut();
            pairs.clear();
            for (k, v) in &kept {
                pairs.append_pair(k, v);
            }
            pairs.append_pair(key, value);
        }
        self
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full URL including query
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// JSON body, if any
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Result of a single attempt, before the retry decision
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 2xx with the full response body
    Success { status: u16, body: Bytes },
    /// Not retryable: 4xx other than 429, or an unclassified transport error
    Fatal(Error),
    /// Transport failure recognised as transient
    Transient {
        kind: TransientKind,
        error: reqwest::Error,
    },
    /// 5xx response
    ServerError { status: u16, body: String },
    /// 429 response with the raw reset header, if present
    RateLimited { body: String, reset: Option<String> },
}

/// HTTP client with retry and rate limiting
///
/// Holds no per-call state; clones share the connection pool (and the
/// throttling bucket when one is configured).
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    rate_limiter: Option<RateLimiter>,
    cancel: Option<CancellationToken>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(default_headers(&config)?)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            rate_limiter,
            cancel: None,
        })
    }

    /// Abort calls before their next attempt once `token` is cancelled
    ///
    /// A wait that is already in progress is not interrupted.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Check if client-side throttling is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Execute a request with retries, returning the raw success body
    pub async fn request(&self, request: &ApiRequest) -> Result<Bytes> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            if self
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                return Err(Error::Cancelled { attempt });
            }

            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let can_retry = attempt + 1 < max_attempts;
            let wait = match self.attempt(request).await {
                AttemptOutcome::Success { status, body } => {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        attempt = attempt + 1,
                        status,
                        "Request succeeded"
                    );
                    return Ok(body);
                }
                AttemptOutcome::Fatal(err) => {
                    debug!(
                        method = %request.method,
                        url = %request.url,
                        attempt = attempt + 1,
                        status = ?err.status(),
                        error = %err,
                        "Request failed, not retryable"
                    );
                    return Err(err);
                }
                AttemptOutcome::Transient { kind, error } => {
                    if !can_retry {
                        warn!(
                            url = %request.url,
                            attempt = attempt + 1,
                            max_attempts,
                            ?kind,
                            error = %error,
                            "Transport failure, attempts exhausted"
                        );
                        return Err(Error::RetriesExhausted {
                            attempts: attempt + 1,
                            source: error,
                        });
                    }
                    let wait = self.config.backoff.delay(attempt);
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        max_attempts,
                        ?kind,
                        error = %error,
                        wait_ms = wait.as_millis() as u64,
                        "Transient transport failure, retrying"
                    );
                    wait
                }
                AttemptOutcome::ServerError { status, body } => {
                    if !can_retry {
                        warn!(
                            url = %request.url,
                            attempt = attempt + 1,
                            max_attempts,
                            status,
                            "Server error, attempts exhausted"
                        );
                        return Err(Error::http_status(status, body));
                    }
                    let wait = self.config.backoff.delay(attempt);
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        max_attempts,
                        status,
                        wait_ms = wait.as_millis() as u64,
                        "Server error, retrying"
                    );
                    wait
                }
                AttemptOutcome::RateLimited { body, reset } => {
                    if !can_retry {
                        warn!(
                            url = %request.url,
                            attempt = attempt + 1,
                            max_attempts,
                            status = 429,
                            "Rate limited, attempts exhausted"
                        );
                        return Err(Error::http_status(
                            StatusCode::TOO_MANY_REQUESTS.as_u16(),
                            body,
                        ));
                    }
                    let wait = rate_limit_wait(
                        reset.as_deref(),
                        Utc::now(),
                        self.config.rate_limit_fallback,
                    );
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        max_attempts,
                        status = 429,
                        reset = reset.as_deref().unwrap_or("-"),
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited, waiting for reset"
                    );
                    wait
                }
            };

            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// Execute a request and decode the JSON response
    ///
    /// An empty body decodes as JSON `null`.
    pub async fn request_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let body = self.request(request).await?;
        decode_body(&body)
    }

    /// Execute a request and discard the response body
    pub async fn send(&self, request: &ApiRequest) -> Result<()> {
        self.request(request).await.map(|_| ())
    }

    /// Make a GET request and parse JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.request_json(&ApiRequest::get(url)?).await
    }

    /// Make a POST request and parse JSON response
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        self.request_json(&ApiRequest::post(url, body)?).await
    }

    /// Perform one attempt and classify what happened
    async fn attempt(&self, request: &ApiRequest) -> AttemptOutcome {
        let mut req = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(ref body) = request.body {
            req = req.json(body);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => return transport_outcome(e),
        };

        let status = response.status();
        if status.is_success() {
            let limit = self.config.max_body;
            return match read_capped(response, limit).await {
                Ok(Some(body)) => AttemptOutcome::Success {
                    status: status.as_u16(),
                    body,
                },
                Ok(None) => AttemptOutcome::Fatal(Error::Other(format!(
                    "response body from {} exceeds {limit} bytes",
                    request.url
                ))),
                Err(e) => transport_outcome(e),
            };
        }

        let reset = response
            .headers()
            .get(RATE_LIMIT_RESET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = read_bounded(response, self.config.max_error_body).await;

        if status == StatusCode::TOO_MANY_REQUESTS {
            AttemptOutcome::RateLimited { body, reset }
        } else if status.is_server_error() {
            AttemptOutcome::ServerError {
                status: status.as_u16(),
                body,
            }
        } else {
            AttemptOutcome::Fatal(Error::http_status(status.as_u16(), body))
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

/// Headers sent with every request
fn default_headers(config: &HttpClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
    headers.insert(
        HeaderName::from_static(API_VERSION_HEADER),
        HeaderValue::from_static(API_VERSION),
    );

    for (key, value) in &config.default_headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::invalid_value(key.clone(), e.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_value(key.clone(), e.to_string()))?;
        headers.insert(name, value);
    }

    if let Some(ref token) = config.token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::invalid_value("token", "contains invalid header characters"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

fn transport_outcome(error: reqwest::Error) -> AttemptOutcome {
    match classify_error(&error) {
        Some(kind) => AttemptOutcome::Transient { kind, error },
        None => AttemptOutcome::Fatal(Error::Http(error)),
    }
}

/// Read at most `limit` bytes of a response body as lossy UTF-8
async fn read_bounded(mut response: Response, limit: usize) -> String {
    let mut buf = Vec::new();
    while buf.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - buf.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Read a whole success body, or `None` once it grows past `limit` bytes
async fn read_capped(mut response: Response, limit: usize) -> reqwest::Result<Option<Bytes>> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Ok(None);
    }
    let mut buf = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf.freeze()))
}

/// Decode a success body, treating an empty body as JSON `null`
pub(crate) fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(body)?)
}

//! HTTP client module
//!
//! Provides the resilient transport every GitHub call goes through.
//!
//! # Features
//!
//! - **Automatic Retries**: transient transport failures, 429 and 5xx
//! - **Backoff**: deterministic exponential backoff (1s, 2s, 4s, ...)
//! - **Rate Limits**: waits until the server-declared reset time
//! - **Throttling**: optional token bucket limiter using governor
//! - **Cancellation**: checked before every attempt

mod client;
mod rate_limit;
pub mod retry;

pub use client::{
    ApiRequest, AttemptOutcome, HttpClient, HttpClientConfig, HttpClientConfigBuilder,
    ACCEPT_HEADER, API_VERSION, API_VERSION_HEADER, MAX_BODY_BYTES, MAX_ERROR_BODY_BYTES,
    USER_AGENT,
};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use retry::{BackoffPolicy, TransientKind};

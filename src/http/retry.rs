//! Retry decisions: transient error classification and wait computation
//!
//! Two independent wait policies are used by the client:
//! - exponential backoff for transport failures and 5xx responses
//! - server-declared reset times for 429 responses

use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::time::Duration;

/// Minimum wait before retrying a rate-limited request
pub const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Wait used when a 429 carries no usable reset header
pub const RATE_LIMIT_FALLBACK: Duration = Duration::from_secs(60);

/// Header carrying the rate-limit reset time as a Unix timestamp
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

// ============================================================================
// Transient error classification
// ============================================================================

/// Category of a transport failure considered safe to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    ConnectionRefused,
    ConnectionReset,
    Timeout,
    HandshakeTimeout,
    UnexpectedEof,
}

// Checked in order; handshake timeouts must win over the generic timeout.
const TRANSIENT_MARKERS: &[(&str, TransientKind)] = &[
    ("connection refused", TransientKind::ConnectionRefused),
    ("connection reset", TransientKind::ConnectionReset),
    ("handshake timeout", TransientKind::HandshakeTimeout),
    ("i/o timeout", TransientKind::Timeout),
    ("timed out", TransientKind::Timeout),
    ("unexpected eof", TransientKind::UnexpectedEof),
    ("unexpected end of file", TransientKind::UnexpectedEof),
    (
        "connection closed before message completed",
        TransientKind::UnexpectedEof,
    ),
];

/// Classify an error description
///
/// Matching is by substring, case-insensitive. An empty description is
/// never transient.
pub fn classify_message(message: &str) -> Option<TransientKind> {
    if message.is_empty() {
        return None;
    }
    let message = message.to_lowercase();
    TRANSIENT_MARKERS
        .iter()
        .find(|(marker, _)| message.contains(marker))
        .map(|(_, kind)| *kind)
}

/// Classify an error by walking its whole `source()` chain
///
/// HTTP client errors usually wrap the interesting I/O error a few levels
/// down, so the top-level message alone is not enough.
pub fn classify_error(err: &(dyn StdError + 'static)) -> Option<TransientKind> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(kind) = classify_message(&e.to_string()) {
            return Some(kind);
        }
        current = e.source();
    }
    None
}

/// Decide whether a transport failure is retryable
///
/// `None` (no error) is not transient.
pub fn is_transient(err: Option<&(dyn StdError + 'static)>) -> bool {
    err.and_then(classify_error).is_some()
}

// ============================================================================
// Backoff
// ============================================================================

/// Deterministic exponential backoff: `base * 2^attempt`
///
/// No jitter and no ceiling; the attempt cap bounds the total wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait before the first retry
    pub base: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the given base delay
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Wait before retrying after the zero-based `attempt` failed
    ///
    /// Saturates at [`Duration::MAX`].
    pub fn delay(&self, attempt: u32) -> Duration {
        1u32.checked_shl(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

// ============================================================================
// Rate-limit wait
// ============================================================================

/// Compute the wait for a 429 response
///
/// `reset` is the raw rate-limit reset header (Unix seconds). A missing or
/// unparseable header yields `fallback`; a reset time that has passed (or is
/// under a second away) yields [`MIN_RATE_LIMIT_WAIT`].
pub fn rate_limit_wait(reset: Option<&str>, now: DateTime<Utc>, fallback: Duration) -> Duration {
    let Some(reset_at) = reset
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    else {
        return fallback;
    };

    (reset_at - now)
        .to_std()
        .ok()
        .filter(|wait| *wait >= MIN_RATE_LIMIT_WAIT)
        .unwrap_or(MIN_RATE_LIMIT_WAIT)
}

#[cfg(test)]
mod retry_tests {
    use super::*;
    use std::io;
    use test_case::test_case;

    #[test_case("connection refused", Some(TransientKind::ConnectionRefused); "refused")]
    #[test_case("tcp connect error: Connection refused (os error 111)", Some(TransientKind::ConnectionRefused); "refused os error")]
    #[test_case("connection reset by peer", Some(TransientKind::ConnectionReset); "reset")]
    #[test_case("i/o timeout", Some(TransientKind::Timeout); "io timeout")]
    #[test_case("operation timed out", Some(TransientKind::Timeout); "timed out")]
    #[test_case("TLS handshake timeout", Some(TransientKind::HandshakeTimeout); "handshake")]
    #[test_case("unexpected EOF", Some(TransientKind::UnexpectedEof); "eof")]
    #[test_case("unexpected end of file", Some(TransientKind::UnexpectedEof); "end of file")]
    #[test_case("connection closed before message completed", Some(TransientKind::UnexpectedEof); "closed early")]
    #[test_case("404: not found", None; "not found")]
    #[test_case("permission denied", None; "permission denied")]
    #[test_case("builder error: relative URL without a base", None; "builder")]
    #[test_case("", None; "empty")]
    fn test_classify_message(message: &str, expected: Option<TransientKind>) {
        assert_eq!(classify_message(message), expected);
    }

    #[derive(Debug)]
    struct Wrapper(io::Error);

    impl std::fmt::Display for Wrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("error sending request")
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_classify_error_walks_source_chain() {
        let err = Wrapper(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert_eq!(classify_error(&err), Some(TransientKind::ConnectionReset));

        let err = Wrapper(io::Error::new(io::ErrorKind::Other, "permission denied"));
        assert_eq!(classify_error(&err), None);
    }

    #[test]
    fn test_is_transient() {
        assert!(!is_transient(None));

        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "unexpected EOF");
        assert!(is_transient(Some(&err)));

        let err = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        assert!(!is_transient(Some(&err)));
    }

    #[test_case(0, 1; "first retry")]
    #[test_case(1, 2; "second retry")]
    #[test_case(2, 4; "third retry")]
    #[test_case(3, 8; "fourth retry")]
    fn test_default_backoff(attempt: u32, seconds: u64) {
        assert_eq!(
            BackoffPolicy::default().delay(attempt),
            Duration::from_secs(seconds)
        );
    }

    #[test]
    fn test_backoff_custom_base_and_saturation() {
        let policy = BackoffPolicy::new(Duration::from_millis(10));
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(3), Duration::from_millis(80));
        assert_eq!(BackoffPolicy::default().delay(200), Duration::MAX);
        assert_eq!(BackoffPolicy::default().delay(32), Duration::MAX);
        assert_eq!(
            BackoffPolicy::default().delay(31),
            Duration::from_secs(1 << 31)
        );
        assert_eq!(BackoffPolicy::new(Duration::MAX).delay(1), Duration::MAX);
    }

    #[test]
    fn test_rate_limit_wait_future_reset() {
        let now = Utc::now();
        let reset = (now + chrono::Duration::seconds(30)).timestamp().to_string();
        let wait = rate_limit_wait(Some(&reset), now, RATE_LIMIT_FALLBACK);
        assert!(wait >= Duration::from_secs(29), "wait was {wait:?}");
        assert!(wait <= Duration::from_secs(33), "wait was {wait:?}");
    }

    #[test]
    fn test_rate_limit_wait_past_reset_is_floored() {
        let now = Utc::now();
        let reset = (now - chrono::Duration::seconds(10)).timestamp().to_string();
        assert_eq!(
            rate_limit_wait(Some(&reset), now, RATE_LIMIT_FALLBACK),
            MIN_RATE_LIMIT_WAIT
        );
    }

    #[test]
    fn test_rate_limit_wait_missing_or_invalid_header() {
        let now = Utc::now();
        assert_eq!(
            rate_limit_wait(None, now, RATE_LIMIT_FALLBACK),
            RATE_LIMIT_FALLBACK
        );
        assert_eq!(
            rate_limit_wait(Some("bad"), now, RATE_LIMIT_FALLBACK),
            RATE_LIMIT_FALLBACK
        );
        assert_eq!(
            rate_limit_wait(Some(""), now, Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }
}

//! Error types for gh-cost-center
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for gh-cost-center
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    /// Transport failure that was not retried (not transient).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Terminal API error: a non-retryable status, or a retryable one after
    /// the attempt budget ran out.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A transient transport failure persisted through every attempt.
    #[error("Request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request cancelled before attempt {attempt}")]
    Cancelled { attempt: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // GitHub Errors
    // ============================================================================
    #[error("Budgets API is not available for enterprise '{enterprise}'; this feature may not be enabled")]
    BudgetsUnavailable { enterprise: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Status code carried by a terminal API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Response body carried by a terminal API error
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Check for a 404 response
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check for a 409 response
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Check if this error would have been retried by the HTTP client
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RetriesExhausted { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

/// 429 and every 5xx are retried; any other status is terminal.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Result type alias for gh-cost-center
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::http_status(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::BudgetsUnavailable {
            enterprise: "acme".to_string(),
        };
        assert!(err.to_string().contains("'acme'"));
    }

    #[test]
    fn test_status_accessors() {
        let err = Error::http_status(409, "Existing cost center UUID: x");
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.body(), Some("Existing cost center UUID: x"));
        assert!(err.is_conflict());
        assert!(!err.is_not_found());

        assert!(Error::http_status(404, "").is_not_found());
        assert_eq!(Error::config("x").status(), None);
        assert_eq!(Error::config("x").body(), None);
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::http_status(429, "").is_retryable());
        assert!(Error::http_status(500, "").is_retryable());
        assert!(Error::http_status(502, "").is_retryable());
        assert!(Error::http_status(599, "").is_retryable());

        assert!(!Error::http_status(400, "").is_retryable());
        assert!(!Error::http_status(403, "").is_retryable());
        assert!(!Error::http_status(404, "").is_retryable());
        assert!(!Error::http_status(409, "").is_retryable());
        assert!(!Error::config("test").is_retryable());
        assert!(!Error::Cancelled { attempt: 0 }.is_retryable());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }
}

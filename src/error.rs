// src/error.rs

//! Unified error handling for the upsolve application.

use std::fmt;

use thiserror::Error;

/// Result type alias for upsolve operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network-level failure (timeout, connection reset) after exhausting retries
    #[error("Transport failure for {url} after {attempts} attempt(s): {message}")]
    TransportFailure {
        url: String,
        attempts: u32,
        message: String,
    },

    /// HTTP 429 persisted across every allowed attempt
    #[error("Rate limited by {url} after {attempts} attempt(s)")]
    RateLimited { url: String, attempts: u32 },

    /// Response had an unexpected or malformed shape
    #[error("Upstream protocol error in {context}: {message}")]
    UpstreamProtocol { context: String, message: String },

    /// Non-retryable HTTP status, with the start of the response body
    #[error("Upstream returned HTTP {status} for {url}{}", body_suffix(.body))]
    UpstreamStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// Required per-platform credential or handle is missing
    #[error("Configuration gap for {platform}: {message}")]
    ConfigurationGap { platform: String, message: String },

    /// No enabled platform produced any data
    #[error("No platform produced any data")]
    NoData,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl AppError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an upstream protocol error with context.
    pub fn protocol(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::UpstreamProtocol {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration gap for a platform.
    pub fn gap(platform: impl fmt::Display, message: impl Into<String>) -> Self {
        Self::ConfigurationGap {
            platform: platform.to_string(),
            message: message.into(),
        }
    }

    /// Whether a later identical request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportFailure { .. } | Self::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let rate_limited = AppError::RateLimited {
            url: "https://clist.by".into(),
            attempts: 3,
        };
        assert!(rate_limited.is_retryable());
        assert!(!AppError::protocol("clist", "missing objects").is_retryable());
        assert!(
            !AppError::UpstreamStatus {
                url: "https://codeforces.com/api/user.status".into(),
                status: 400,
                body: String::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_status_message_carries_body() {
        let err = AppError::UpstreamStatus {
            url: "https://clist.by/api/v4/problem/".into(),
            status: 401,
            body: " {\"detail\": \"bad key\"} ".into(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream returned HTTP 401 for https://clist.by/api/v4/problem/: {\"detail\": \"bad key\"}"
        );

        let bare = AppError::UpstreamStatus {
            url: "https://leetcode.com/graphql".into(),
            status: 403,
            body: String::new(),
        };
        assert_eq!(bare.to_string(), "Upstream returned HTTP 403 for https://leetcode.com/graphql");
    }

    #[test]
    fn test_gap_message_names_platform() {
        let err = AppError::gap("atcoder", "handle is empty");
        assert_eq!(
            err.to_string(),
            "Configuration gap for atcoder: handle is empty"
        );
    }
}

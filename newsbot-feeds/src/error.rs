//! Error types for the feeds module

use newsbot_core::error::{is_retryable_status, Transient};
use thiserror::Error;

/// Errors that can occur while collecting feeds or extracting content
#[derive(Debug, Error)]
pub enum NewsError {
    /// HTTP request failed before a response arrived
    #[error("Request failed: {message}")]
    RequestFailed {
        /// Error message from the HTTP client
        message: String,
        /// Whether the failure was a timeout or connection error
        transient: bool,
    },

    /// Remote returned a non-success response
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message or body excerpt
        message: String,
    },

    /// Failed to parse a feed or page
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Article extraction produced nothing usable
    #[error("Scrape failed: {0}")]
    ScrapeFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for NewsError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return NewsError::ApiError {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        NewsError::RequestFailed {
            transient: err.is_timeout() || err.is_connect() || err.is_body(),
            message: err.to_string(),
        }
    }
}

impl Transient for NewsError {
    fn is_transient(&self) -> bool {
        match self {
            NewsError::RequestFailed { transient, .. } => *transient,
            NewsError::ApiError { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

//! Error types for generative-text backends

use async_openai::error::OpenAIError;
use newsbot_core::error::{is_retryable_status, Transient};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request timed out: {0}")]
    Timeout(String),

    #[error("LLM connection failed: {0}")]
    Connection(String),

    #[error("LLM API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("LLM authentication failed: {0}")]
    Auth(String),

    #[error("Invalid LLM request: {0}")]
    InvalidRequest(String),

    #[error("Empty response from LLM")]
    EmptyResponse,

    #[error("LLM provider error: {0}")]
    Provider(String),
}

impl Transient for LlmError {
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Timeout(_) | LlmError::Connection(_) => true,
            LlmError::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            LlmError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_connect() || err.is_request() || err.is_body() {
            LlmError::Connection(err.to_string())
        } else {
            LlmError::Provider(err.to_string())
        }
    }
}

impl From<OpenAIError> for LlmError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => LlmError::from(e),
            OpenAIError::ApiError(api) => {
                let kind = api.r#type.as_deref().unwrap_or_default();
                let code = api.code.as_deref().unwrap_or_default();
                classify_api_error(kind, code, api.message)
            }
            other => LlmError::Provider(other.to_string()),
        }
    }
}

/// Map an OpenAI error body onto the retry taxonomy.
///
/// The client surfaces API failures without their HTTP status, so the status
/// is recovered from the documented error `type`/`code` values.
fn classify_api_error(kind: &str, code: &str, message: String) -> LlmError {
    match (kind, code) {
        (_, "insufficient_quota") => LlmError::Provider(message),
        (_, "rate_limit_exceeded") | ("requests" | "tokens", _) => LlmError::Status {
            status: 429,
            message,
        },
        ("server_error", _) | (_, "server_error") => LlmError::Status {
            status: 500,
            message,
        },
        ("authentication_error", _) | (_, "invalid_api_key") => LlmError::Auth(message),
        ("invalid_request_error", _) => LlmError::InvalidRequest(message),
        _ => LlmError::Provider(message),
    }
}

//! Error classification shared across newsbot crates

/// Classifies an error as worth retrying.
///
/// Connection failures, timeouts and HTTP statuses 408, 409, 425, 429 or any
/// 5xx are transient. Everything else (authentication, malformed requests,
/// parse failures) is permanent and must not be retried.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// HTTP statuses that are retried in addition to the whole 5xx range
pub const RETRYABLE_STATUS_CODES: [u16; 4] = [408, 409, 425, 429];

/// Whether an HTTP status code signals a transient failure
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || RETRYABLE_STATUS_CODES.contains(&status)
}

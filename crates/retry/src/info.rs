use std::time::Duration;

/// What a failed attempt tells the retry engine about itself (spec §4.6).
/// Populated from the wire error's modeled fault/retryable traits and, for
/// HTTP transports, a `Retry-After` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryInfo {
    pub is_retryable: bool,
    pub is_throttle: bool,
    pub retry_after: Option<Duration>,
}

impl RetryInfo {
    pub fn transient() -> Self {
        Self { is_retryable: true, is_throttle: false, retry_after: None }
    }

    pub fn throttle(retry_after: Option<Duration>) -> Self {
        Self { is_retryable: true, is_throttle: true, retry_after }
    }

    pub fn not_retryable() -> Self {
        Self { is_retryable: false, is_throttle: false, retry_after: None }
    }
}

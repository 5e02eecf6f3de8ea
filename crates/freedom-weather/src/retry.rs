//! Backoff policy for failed background refreshes.
//!
//! Transient failures are retried:
//! - Timeouts and connection errors
//! - 5xx, 408 and 429 responses
//!
//! Everything else waits for the next periodic tick:
//! - Other 4xx responses (bad API key, unknown endpoint)
//! - Malformed provider payloads
//! - Location permission errors

use std::time::Duration;

use reqwest::StatusCode;

use crate::orchestrator::RefreshFailure;
use crate::types::{LocationError, WeatherError};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 30_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 15 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt)
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // initial_delay * 2^attempt
        let factor = 2u64.saturating_pow(attempt);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

pub fn is_retryable_failure(failure: &RefreshFailure) -> RetryDecision {
    match failure {
        RefreshFailure::Weather(WeatherError::Network(e)) => is_retryable_error(e),
        RefreshFailure::Weather(WeatherError::MalformedResponse(_)) => RetryDecision::NoRetry,
        RefreshFailure::Location(LocationError::PermissionDenied) => RetryDecision::NoRetry,
        RefreshFailure::Location(_) => RetryDecision::Retry,
        RefreshFailure::Cache(_) => RetryDecision::NoRetry,
    }
}

pub fn is_retryable_error(error: &reqwest::Error) -> RetryDecision {
    if error.is_timeout() {
        tracing::debug!("Request timed out, will retry");
        return RetryDecision::Retry;
    }

    if error.is_connect() {
        tracing::debug!("Connection error, will retry");
        return RetryDecision::Retry;
    }

    if let Some(status) = error.status() {
        return is_retryable_status(status);
    }

    RetryDecision::NoRetry
}

pub fn is_retryable_status(status: StatusCode) -> RetryDecision {
    if status.is_server_error() {
        tracing::debug!("Server error ({}), will retry", status);
        return RetryDecision::Retry;
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT {
        tracing::debug!("Transient status ({}), will retry", status);
        return RetryDecision::Retry;
    }

    // 401 here usually means a bad API key; retrying won't fix it
    if status.is_client_error() {
        tracing::debug!("Client error ({}), not retryable", status);
        return RetryDecision::NoRetry;
    }

    RetryDecision::NoRetry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CacheError;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay, Duration::from_secs(30));
        assert_eq!(config.max_delay, Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_delay_doubles() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(30));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(60));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(120));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(240));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let config = RetryConfig::default();
        // 30s * 2^5 = 16min > 15min
        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(15 * 60));
        assert_eq!(config.delay_for_attempt(40), Duration::from_secs(15 * 60));
    }

    #[test]
    fn test_retryable_status_codes() {
        assert_eq!(is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE), RetryDecision::Retry);
        assert_eq!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS), RetryDecision::Retry);

        assert_eq!(is_retryable_status(StatusCode::UNAUTHORIZED), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::NOT_FOUND), RetryDecision::NoRetry);
        assert_eq!(is_retryable_status(StatusCode::OK), RetryDecision::NoRetry);
    }

    #[test]
    fn test_failure_classification() {
        let malformed = RefreshFailure::Weather(WeatherError::MalformedResponse("x".into()));
        assert_eq!(is_retryable_failure(&malformed), RetryDecision::NoRetry);

        let denied = RefreshFailure::Location(LocationError::PermissionDenied);
        assert_eq!(is_retryable_failure(&denied), RetryDecision::NoRetry);

        let unavailable = RefreshFailure::Location(LocationError::Unavailable);
        assert_eq!(is_retryable_failure(&unavailable), RetryDecision::Retry);

        let cache = RefreshFailure::Cache(CacheError::TypeMismatch {
            key: "last_temp_c",
            expected: "double",
        });
        assert_eq!(is_retryable_failure(&cache), RetryDecision::NoRetry);
    }
}

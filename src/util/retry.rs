//! Retry with exponential backoff and server-directed rate-limit delays.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCategory};

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total tries = `max_retries + 1`).
    pub max_retries: u32,
    /// Delay before retry `n` (0-based) is `base_delay * 2^n`.
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// `Retry-After` seconds to assume when a 429 carries no usable hint.
    pub rate_limit_default_secs: u64,
    /// Length of one `Retry-After` second.
    #[serde(with = "duration_ms")]
    pub rate_limit_unit: Duration,
    /// Retry 4xx responses other than 429.
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            rate_limit_default_secs: 60,
            rate_limit_unit: Duration::from_secs(1),
            retry_client_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry that follows failed attempt `attempt` (0-based).
    ///
    /// A 429 waits for the server's `Retry-After`; everything else backs off
    /// exponentially.
    pub fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        match error {
            ApiError::RateLimited { retry_after_secs } => {
                let secs = retry_after_secs.unwrap_or(self.rate_limit_default_secs);
                self.rate_limit_unit
                    .saturating_mul(u32::try_from(secs).unwrap_or(u32::MAX))
            }
            _ => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(attempt)),
        }
    }

    fn should_retry(&self, error: &ApiError) -> bool {
        if !error.is_retryable() {
            return false;
        }
        self.retry_client_errors || error.category() != ErrorCategory::Client
    }

    /// Execute an async operation with retry, returning the last error once
    /// the attempts are exhausted.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.max_retries || !self.should_retry(&e) {
                        tracing::warn!(
                            attempts = attempt + 1,
                            error = %e,
                            "Request failed"
                        );
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt, &e);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_schedule_doubles_from_base() {
        let policy = RetryPolicy::default();
        let err = ApiError::api(500, "boom");
        assert_eq!(policy.delay_for(0, &err), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1, &err), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2, &err), Duration::from_millis(4000));
    }

    #[test]
    fn rate_limit_uses_retry_after_or_default() {
        let policy = RetryPolicy::default();
        let hinted = ApiError::RateLimited {
            retry_after_secs: Some(5),
        };
        let bare = ApiError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(policy.delay_for(2, &hinted), Duration::from_secs(5));
        assert_eq!(policy.delay_for(0, &bare), Duration::from_secs(60));
    }

    #[test]
    fn client_errors_stop_when_disabled() {
        let policy = RetryPolicy {
            retry_client_errors: false,
            ..Default::default()
        };
        assert!(!policy.should_retry(&ApiError::api(404, "missing")));
        assert!(policy.should_retry(&ApiError::api(503, "down")));
        assert!(policy.should_retry(&ApiError::RateLimited {
            retry_after_secs: None
        }));
    }

    #[test]
    fn configuration_errors_are_never_retried() {
        let policy = RetryPolicy::default();
        assert!(!policy.should_retry(&ApiError::Configuration("bad url".into())));
    }
}

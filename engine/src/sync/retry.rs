//! Bounded retry with exponential backoff for remote calls
//!
//! Each attempt runs under its own timeout. Only transient failures are
//! retried; the caller decides what a single attempt covers.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::error::RemoteError;

/// Retry configuration with exponential backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Execute a remote call with a per-attempt timeout, retrying transient
    /// failures with exponential backoff
    pub async fn execute<F, Fut, T>(&self, limit: Duration, mut func: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        let mut delay_ms = self.initial_delay_ms;

        loop {
            let result = match timeout(limit, func()).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout(limit)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;

                    if !e.is_transient() {
                        return Err(e);
                    }
                    if attempt >= self.max_attempts {
                        tracing::warn!("Max attempts ({}) exceeded", self.max_attempts);
                        return Err(e);
                    }

                    tracing::debug!(
                        "Attempt {} failed, retrying in {}ms: {}",
                        attempt,
                        delay_ms,
                        e
                    );

                    sleep(Duration::from_millis(delay_ms)).await;

                    // Exponential backoff with cap
                    delay_ms = ((delay_ms as f64 * self.backoff_factor) as u64).min(self.max_delay_ms);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            ..Default::default()
        }
    }

    fn unavailable() -> RemoteError {
        RemoteError::Status {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_success_on_first_try() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = fast()
            .execute(Duration::from_secs(1), || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, RemoteError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = fast()
            .execute(Duration::from_secs(1), || {
                let attempts = attempts_clone.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(unavailable())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_max_attempts_exceeded() {
        let config = RetryConfig {
            max_attempts: 2,
            ..fast()
        };
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = config
            .execute(Duration::from_secs(1), || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(unavailable())
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = fast()
            .execute(Duration::from_secs(1), || {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>(RemoteError::Status {
                        status: 401,
                        message: "JWT expired".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Status { status: 401, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_attempts_time_out() {
        let config = RetryConfig {
            max_attempts: 2,
            ..fast()
        };

        let result = config
            .execute(Duration::from_millis(10), || async {
                sleep(Duration::from_secs(5)).await;
                Ok::<_, RemoteError>(1)
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Timeout(_))));
    }
}

//! Bounded retry with linear backoff for oracle and search calls.
//!
//! Every external stage goes through the same [`RetryExecutor`]: an attempt
//! closure is run up to `max_attempts` times, sleeping `base_delay × k`
//! after the k-th failure. Exhaustion is returned as a typed
//! [`RetryExhausted`] so callers can substitute their documented fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::OracleError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one. Never zero.
    pub max_attempts: u32,
    /// Backoff unit; the wait after failure k is `base_delay * k`.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// All attempts failed.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub last_error: OracleError,
}

pub struct RetryExecutor {
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self { policy, clock }
    }

    /// Run `attempt` until it succeeds or the policy is exhausted. The closure
    /// receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
    {
        let mut n = 1;
        loop {
            match attempt(n).await {
                Ok(value) => {
                    if n > 1 {
                        debug!(operation, attempt = n, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if n < self.policy.max_attempts => {
                    let wait = self.policy.backoff(n);
                    debug!(
                        operation,
                        attempt = n,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    self.clock.sleep(wait).await;
                    n += 1;
                }
                Err(e) => {
                    warn!(operation, attempts = n, error = %e, "All attempts failed");
                    return Err(RetryExhausted {
                        operation: operation.to_string(),
                        attempts: n,
                        last_error: e,
                    });
                }
            }
        }
    }

    /// Like [`run`](Self::run), mapping exhaustion to a fallback value.
    pub async fn run_or_else<T, F, Fut, D>(&self, operation: &str, attempt: F, fallback: D) -> T
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, OracleError>>,
        D: FnOnce(RetryExhausted) -> T,
    {
        self.run(operation, attempt).await.unwrap_or_else(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn executor(attempts: u32, base_ms: u64) -> (RetryExecutor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = RetryPolicy::new(attempts, Duration::from_millis(base_ms));
        (RetryExecutor::new(policy, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_returns_first_success_without_sleeping() {
        let (retry, clock) = executor(3, 100);
        let out = retry.run("op", |_| async { Ok::<_, OracleError>(7) }).await.unwrap();
        assert_eq!(out, 7);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_linear_backoff_between_attempts() {
        let (retry, clock) = executor(3, 100);
        let calls = AtomicU32::new(0);
        let out = retry
            .run("op", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err(OracleError::malformed("not yet"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_is_typed_and_bounded() {
        let (retry, clock) = executor(4, 50);
        let calls = AtomicU32::new(0);
        let err = retry
            .run("search", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(OracleError::Provider(anyhow::anyhow!("503"))) }
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.attempts, 4);
        assert_eq!(err.operation, "search");
        assert!(matches!(err.last_error, OracleError::Provider(_)));
        // No wait after the final attempt.
        assert_eq!(clock.sleeps().len(), 3);
    }

    #[tokio::test]
    async fn test_run_or_else_uses_fallback() {
        let (retry, _clock) = executor(2, 0);
        let out = retry
            .run_or_else(
                "rephrase",
                |_| async { Err::<String, _>(OracleError::malformed("empty")) },
                |_| "original".to_string(),
            )
            .await;
        assert_eq!(out, "original");
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}

//! Shared retry policy for network calls
//!
//! Every outbound call site (oracle lookups, aggregator HTTP, transaction
//! sends) goes through one policy instead of hand-rolled sleep loops.
//! Transient vs permanent is decided by `Error::is_retryable`.

use std::future::Future;
use std::time::Duration;

use backoff::{future::retry, ExponentialBackoff};
use tracing::warn;

use crate::error::{Error, Result};

/// Retry policy: bounded attempts with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Build a policy from RPC config (max_retries, retry_delay_ms)
    pub fn from_config(config: &crate::config::RpcConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Run `op` until it succeeds, fails permanently, or the retry window
    /// closes. Retryable errors are logged at warn level per attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Bound the whole retry window instead of counting attempts
        let window = self.base_delay * self.max_attempts * 2;
        let backoff = ExponentialBackoff {
            initial_interval: self.base_delay,
            max_interval: self.base_delay * 4,
            max_elapsed_time: Some(window),
            ..Default::default()
        };

        retry(backoff, || {
            let attempt = op();
            async move {
                match attempt.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_retryable() => {
                        warn!("Retryable error in {}: {}", label, e);
                        Err(backoff::Error::transient(e))
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_returns_first_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(42u32)
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let policy = RetryPolicy::new(50, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result = policy
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::Rpc("flaky".to_string()))
                } else {
                    Ok(7u32)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert!(calls.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_immediately() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let calls = AtomicU32::new(0);

        let result: Result<u32> = policy
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Config("bad".to_string()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

use std::future::Future;
use std::time::Duration;

use crate::utils::error::Result;

/// Bounded retry policy for collaborator I/O. Only transient failures are
/// retried; everything else surfaces on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryConfig {
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms * 2u64.pow(attempt.saturating_sub(1)))
    }
}

pub async fn retry_transient<T, F, Fut>(config: &RetryConfig, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < config.max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation,
                    attempt,
                    config.max_attempts,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::utils::error::PipelineError;

    fn fast_retries() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 500,
        };
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_retries(), "flaky op", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(PipelineError::transient("throttled"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_transient(&fast_retries(), "always down", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PipelineError::transient("connection reset")) }
        })
        .await;

        assert!(matches!(result, Err(PipelineError::TransientIo { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_transient_errors_fail_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_transient(&fast_retries(), "bad input", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(PipelineError::malformed("not json")) }
        })
        .await;

        assert!(matches!(result, Err(PipelineError::MalformedInput { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

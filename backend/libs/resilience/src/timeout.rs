/// Timeout wrappers for async operations
use crate::presets::CallPolicy;
use crate::retry::{with_retry_if, RetryDecision, RetryError};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub duration: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E = String> {
    #[error("Operation timed out after {0:?}")]
    Elapsed(Duration),
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> TimeoutError<E> {
    pub fn is_elapsed(&self) -> bool {
        matches!(self, TimeoutError::Elapsed(_))
    }
}

/// Execute a future with timeout
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future)
        .await
        .map_err(|_| TimeoutError::Elapsed(duration))
}

/// Execute a fallible future with timeout, keeping the operation's own error type
pub async fn with_timeout_result<F, T, E>(
    duration: Duration,
    future: F,
) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::OperationFailed(e)),
        Err(_) => Err(TimeoutError::Elapsed(duration)),
    }
}

/// Run `f` under a [`CallPolicy`]: each attempt is bounded by the policy
/// timeout, and failures (including elapsed attempts) are retried within the
/// policy's retry budget when `classify` allows it. Elapsed attempts are
/// always considered transient.
pub async fn call_with_policy<F, Fut, T, E, C>(
    policy: &CallPolicy,
    mut f: F,
    classify: C,
) -> Result<T, RetryError<TimeoutError<E>>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    C: Fn(&E) -> RetryDecision,
{
    let per_attempt = policy.timeout.duration;
    with_retry_if(
        &policy.retry,
        || with_timeout_result(per_attempt, f()),
        |err: &TimeoutError<E>| match err {
            TimeoutError::Elapsed(_) => RetryDecision::Retry,
            TimeoutError::OperationFailed(inner) => classify(inner),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_timeout_success() {
        let result = with_timeout(Duration::from_secs(1), async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_timeout_elapsed() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            42
        })
        .await;

        assert!(matches!(result, Err(TimeoutError::Elapsed(_))));
    }

    #[tokio::test]
    async fn test_timeout_result_operation_failed() {
        let result = with_timeout_result(Duration::from_secs(1), async {
            Err::<i32, _>("operation failed")
        })
        .await;

        assert!(matches!(
            result,
            Err(TimeoutError::OperationFailed("operation failed"))
        ));
    }

    #[tokio::test]
    async fn test_policy_retries_elapsed_attempts() {
        let policy = CallPolicy {
            timeout: TimeoutConfig {
                duration: Duration::from_millis(10),
            },
            retry: RetryConfig {
                max_retries: 1,
                initial_backoff: Duration::from_millis(1),
                jitter: false,
                ..Default::default()
            },
        };
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = call_with_policy(
            &policy,
            move || {
                let n = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                    Ok::<_, String>(n)
                }
            },
            |_| RetryDecision::Abort,
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}

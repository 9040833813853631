/// Bounded retry with exponential backoff and jitter
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to backoff (±30%)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Whether a failed attempt should be tried again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Abort,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Retry budget spent; carries the error from the final attempt
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    /// The classifier declared the error permanent
    #[error("permanent failure: {0}")]
    Aborted(E),
}

impl<E> RetryError<E> {
    /// Final underlying error, regardless of why retrying stopped
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted(e) => e,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Aborted(_) => 1,
        }
    }
}

/// Execute a future with retry logic, retrying every error
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, f: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, f, |_| RetryDecision::Retry).await
}

/// Execute a future with retry logic; `classify` decides whether an error is transient
pub async fn with_retry_if<F, Fut, T, E, C>(
    config: &RetryConfig,
    mut f: F,
    classify: C,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    C: Fn(&E) -> RetryDecision,
{
    let mut attempt = 0;
    let mut backoff = config.initial_backoff;

    loop {
        attempt += 1;
        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "call succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if classify(&e) == RetryDecision::Abort {
                    return Err(RetryError::Aborted(e));
                }

                if attempt > config.max_retries {
                    warn!(attempts = attempt, error = %e, "retry budget exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }

                let delay = calculate_backoff(backoff, config.jitter);
                warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );

                tokio::time::sleep(delay).await;

                backoff = Duration::from_millis(
                    ((backoff.as_millis() as f64 * config.backoff_multiplier)
                        .min(config.max_backoff.as_millis() as f64)) as u64,
                );
            }
        }
    }
}

fn calculate_backoff(base: Duration, jitter: bool) -> Duration {
    if jitter {
        let mut rng = rand::thread_rng();
        let jitter_factor = 1.0 + rng.gen_range(-0.3..0.3);
        Duration::from_millis((base.as_millis() as f64 * jitter_factor) as u64)
    } else {
        base
    }
}

/// Resilience helpers for calls that leave the process
///
/// Two patterns for talking to third parties:
/// - **Timeout**: every attempt is bounded by a fixed deadline
/// - **Retry**: a small, fixed number of retries with exponential backoff and
///   jitter, applied only to errors the caller classifies as transient
///
/// [`CallPolicy`] bundles both for one logical call.
///
/// # Example: provider call with a bounded retry budget
///
/// ```rust,no_run
/// use resilience::{call_with_policy, CallPolicy, RetryDecision};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let policy = CallPolicy::new(Duration::from_secs(5), 2, Duration::from_millis(200));
///
///     let result = call_with_policy(
///         &policy,
///         || async { Ok::<_, String>(()) },
///         |_err: &String| RetryDecision::Retry,
///     )
///     .await;
/// }
/// ```

pub mod presets;
pub mod retry;
pub mod timeout;

pub use presets::CallPolicy;
pub use retry::{with_retry, with_retry_if, RetryConfig, RetryDecision, RetryError};
pub use timeout::{call_with_policy, with_timeout, with_timeout_result, TimeoutConfig, TimeoutError};

/// Call policy shared by outbound clients
use crate::retry::RetryConfig;
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Timeout + retry budget applied to one logical call
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: TimeoutConfig,
    pub retry: RetryConfig,
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            timeout: TimeoutConfig { duration: timeout },
            retry: RetryConfig {
                max_retries,
                initial_backoff,
                ..Default::default()
            },
        }
    }
}

//! Retry policy for failed webhook deliveries.
//!
//! The delay grows linearly: the n-th retry waits `n * delay_step`.

use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_DELAY_STEP: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub delay_step: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            delay_step: DEFAULT_DELAY_STEP,
        }
    }

    /// Whether a job that has already been retried `retry_count` times may be retried again.
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }

    /// Delay before the attempt numbered `retry_count` (1-based).
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        self.delay_step * retry_count
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

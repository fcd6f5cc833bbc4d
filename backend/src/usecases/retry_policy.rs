use std::{future::Future, time::Duration};

use tracing::debug;

/// Bounded polling with linear back-off: attempt `n` waits `base_delay * n` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome<T> {
    pub value: Option<T>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Runs `check` until it yields `Some` or the attempts are spent.
    pub async fn poll<T, F, Fut>(&self, mut check: F) -> PollOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for attempt in 1..=self.max_attempts {
            let delay = self.delay_for(attempt);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "retry_policy: waiting");
            tokio::time::sleep(delay).await;

            if let Some(value) = check(attempt).await {
                return PollOutcome {
                    value: Some(value),
                    attempts: attempt,
                };
            }
        }

        PollOutcome {
            value: None,
            attempts: self.max_attempts,
        }
    }
}

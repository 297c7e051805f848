use std::time::Duration;

/// Attempt cap and delay growth for connecting to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed `attempt` (1-based) before the next one, or `None`
    /// when that attempt was the last one allowed.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts {
            return None;
        }
        let factor = self
            .multiplier
            .checked_pow(attempt - 1)
            .unwrap_or(u32::MAX);
        Some(self.initial_delay.saturating_mul(factor))
    }
}

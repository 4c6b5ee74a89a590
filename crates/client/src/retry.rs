use std::time::Duration;

use reqflow_core::config::ApiConfig;

/// Backoff for HTTP 429 responses; other failures are never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 1_000, max_delay_ms: 30_000 }
    }
}

impl RetryPolicy {
    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            max_retries: api.max_retries,
            base_delay_ms: api.retry_base_delay_ms,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (zero-based): base, 2x base, 4x base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

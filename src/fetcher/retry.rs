//! Retry with backoff for transient fetch failures.
//!
//! A fetch is retried only when the failure is transient: a timeout, a
//! connection failure, HTTP 5xx or HTTP 429. Everything else fails at once.

use std::time::Duration;

use crate::app::FetchError;

pub const DEFAULT_MAX_RETRIES: u32 = 1;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), or `None` when the
    /// error is not worth retrying or the budget is spent.
    pub fn delay_for(&self, error: &FetchError, retry: u32) -> Option<Duration> {
        if retry == 0 || retry > self.max_retries || !is_transient(error) {
            return None;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        Some(self.base_delay.saturating_mul(factor).min(MAX_DELAY))
    }
}

pub fn is_transient(error: &FetchError) -> bool {
    match error {
        FetchError::Http(e) => {
            if e.is_timeout() || e.is_connect() {
                return true;
            }
            e.status()
                .map(|s| s.is_server_error() || s.as_u16() == 429)
                .unwrap_or(false)
        }
        FetchError::FeedParse(_)
        | FetchError::Json(_)
        | FetchError::InvalidUrl(_)
        | FetchError::NotFound(_) => false,
    }
}

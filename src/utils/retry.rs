//! Shared retry wrapper for upstream calls.
//!
//! Every rate-limited call (social search, chain RPC) goes through
//! [`retry_with_backoff`]. Errors tell the wrapper whether they are retryable and
//! may carry a reset hint; the [`RetryPolicy`] decides how long to wait and how often.

use std::future::Future;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::error::CollectorError;

/// Errors that can be fed through [`retry_with_backoff`].
pub trait Retryable {
    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool;

    /// Provider-supplied wait before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for CollectorError {
    fn is_retryable(&self) -> bool {
        CollectorError::is_retryable(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        CollectorError::retry_after(self)
    }
}

/// Backoff policy: the delay starts at `base_delay_ms` and doubles per attempt
/// up to `max_delay_ms`; at most `max_attempts` calls are made in total.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
        }
    }

    /// Delay after the 0-indexed failed `attempt`, without a provider hint.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }

    /// Delay after a failed attempt. A provider hint wins over the doubling schedule
    /// but is still capped at `max_delay_ms`.
    pub fn backoff_delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        match hint {
            Some(hint) => hint.min(Duration::from_millis(self.max_delay_ms)),
            None => self.delay_for_attempt(attempt),
        }
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the policy's
/// attempt budget is spent. The last error is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                let delay = policy.backoff_delay(attempt, e.retry_after());
                attempt += 1;
                warn!(
                    "{} rate limited (attempt {}/{}), retrying in {:?}: {}",
                    operation, attempt, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
            },
            Err(e) => return Err(e),
        }
    }
}

//! Utility functions shared by the collectors.
//!
//! - [`retry`] - Exponential backoff wrapper for rate-limited upstream calls

pub mod retry;

// ============================================
// Common Constants
// ============================================

/// Lamports per SOL. RPC balances are reported in lamports.
pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Seconds in one day, the width of each on-chain volume bucket.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

// ============================================
// Re-exports
// ============================================

pub use retry::{retry_with_backoff, Retryable, RetryPolicy};

/// Clamp `value` into [min, max], mapping NaN to `min`.
#[inline]
pub fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

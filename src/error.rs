//! Error taxonomy for the index pipeline.
//!
//! Collectors report [`CollectorError`], the history store reports [`StorageError`],
//! and a whole run reports [`PipelineError`]. The binary and the cron layer wrap these
//! in `anyhow` with context.

use std::time::Duration;

use thiserror::Error;

/// Failure of an upstream data source.
#[derive(Error, Debug)]
pub enum CollectorError {
    /// HTTP/RPC transport failure, non-success status, or undecodable payload.
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Upstream asked us to slow down. Retried internally; only surfaces once
    /// the retry budget is spent.
    #[error("rate limited by {provider} (retry after {retry_after:?})")]
    RateLimited {
        provider: &'static str,
        retry_after: Option<Duration>,
    },

    /// The market provider returned zero usable tokens.
    #[error("no data returned for any requested token")]
    NoData,

    /// Every token of the on-chain basket failed.
    #[error("no valid on-chain metrics collected ({failed} tokens failed)")]
    NoValidMetrics { failed: usize },
}

impl CollectorError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        CollectorError::Provider {
            provider,
            message: message.into(),
        }
    }

    /// Only rate-limit responses go through the backoff path.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CollectorError::RateLimited { .. })
    }

    /// Reset hint supplied by the provider, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CollectorError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Failure reading or writing the persisted history.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("history document at {0} is corrupt")]
    Corrupt(String),
}

impl StorageError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Failure of a whole pipeline run. Nothing is persisted when this is returned.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("all three sources failed (market: {market}; social: {social}; on-chain: {on_chain})")]
    AllSourcesFailed {
        market: String,
        social: String,
        on_chain: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_are_retryable() {
        let limited = CollectorError::RateLimited {
            provider: "solana",
            retry_after: Some(Duration::from_secs(3)),
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(3)));

        let fatal = CollectorError::provider("solana", "boom");
        assert!(!fatal.is_retryable());
        assert_eq!(fatal.retry_after(), None);
        assert!(!CollectorError::NoData.is_retryable());
    }
}

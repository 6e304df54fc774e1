use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

use super::store::HistoryStore;

/// Entries considered by the trend.
pub const TREND_WINDOW: usize = 7;

/// Absolute score change below which the trend is `stable`.
pub const STABLE_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    InsufficientData,
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::InsufficientData => "insufficient_data",
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        };
        f.write_str(s)
    }
}

/// Newest minus oldest score of the window (oldest first).
pub fn window_change(scores: &[u8]) -> Option<i32> {
    if scores.len() < 2 {
        return None;
    }
    let oldest = *scores.first()? as i32;
    let newest = *scores.last()? as i32;
    Some(newest - oldest)
}

pub fn classify(scores: &[u8]) -> Trend {
    match window_change(scores) {
        None => Trend::InsufficientData,
        Some(change) if change.abs() < STABLE_THRESHOLD => Trend::Stable,
        Some(change) if change > 0 => Trend::Increasing,
        Some(_) => Trend::Decreasing,
    }
}

/// Trend over the most recent [`TREND_WINDOW`] history entries.
pub struct TrendAnalyzer {
    store: Arc<HistoryStore>,
}

impl TrendAnalyzer {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self { store }
    }

    pub async fn trend(&self) -> Result<Trend, StorageError> {
        let scores: Vec<u8> = self
            .store
            .read_window(TREND_WINDOW)
            .await?
            .iter()
            .map(|entry| entry.score())
            .collect();
        Ok(classify(&scores))
    }
}

//! Read-only access to the persisted index for downstream consumers.

use std::sync::Arc;

use crate::error::StorageError;
use crate::history::{HistoryStore, Trend, TrendAnalyzer};
use crate::models::HistoryEntry;

/// Entries returned by [`IndexReader::get_history`] when no window is given.
pub const DEFAULT_HISTORY_DAYS: usize = 30;

pub struct IndexReader {
    store: Arc<HistoryStore>,
    trend: TrendAnalyzer,
}

impl IndexReader {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self {
            trend: TrendAnalyzer::new(store.clone()),
            store,
        }
    }

    /// `Ok(None)` until the first run has been persisted.
    pub async fn get_latest(&self) -> Result<Option<HistoryEntry>, StorageError> {
        self.store.latest().await
    }

    /// Most recent `days` entries (default 30), oldest first.
    pub async fn get_history(&self, days: Option<usize>) -> Result<Vec<HistoryEntry>, StorageError> {
        self.store
            .read_window(days.unwrap_or(DEFAULT_HISTORY_DAYS))
            .await
    }

    pub async fn get_trend(&self) -> Result<Trend, StorageError> {
        self.trend.trend().await
    }
}

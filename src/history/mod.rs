//! Persisted index history.
//!
//! - [`store`] - Append-only JSON log with retention trimming and daily snapshots
//! - [`trend`] - Three-state trend over the most recent window

pub mod store;
pub mod trend;

pub use store::HistoryStore;
pub use trend::{Trend, TrendAnalyzer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{RawMarketMetrics, RawOnChainMetrics, RawSocialMetrics};

/// The three signal sources of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Market,
    Sentiment,
    OnChain,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceKind::Market => "market",
            SourceKind::Sentiment => "sentiment",
            SourceKind::OnChain => "on_chain",
        };
        f.write_str(name)
    }
}

/// Per-source sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub market: f64,
    pub sentiment: f64,
    pub on_chain: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMarket {
    pub price_change: f64,
    pub volume_change: f64,
    pub market_cap_change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSentiment {
    pub sentiment_score: f64,
    pub engagement_score: f64,
    pub volume_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOnChain {
    pub activity_score: f64,
    pub success_rate: f64,
    pub volume_score: f64,
}

/// Normalized sub-metrics behind each component, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexDetails {
    pub normalized_market: NormalizedMarket,
    pub normalized_sentiment: NormalizedSentiment,
    pub normalized_on_chain: NormalizedOnChain,
}

/// Output of one scoring pass. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeIndexResult {
    pub computed_at: DateTime<Utc>,
    /// Composite score, clamped to [0, 100] and rounded.
    pub score: u8,
    pub label: String,
    pub components: ComponentScores,
    pub details: IndexDetails,
    /// Sources substituted with the neutral placeholder this run.
    #[serde(default)]
    pub degraded: Vec<SourceKind>,
    /// Version of the scoring policy that produced this result.
    #[serde(default)]
    pub policy_version: u32,
}

/// A persisted daily index reading. `timestamp` is assigned by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub result: CompositeIndexResult,
}

impl HistoryEntry {
    pub fn score(&self) -> u8 {
        self.result.score
    }

    pub fn label(&self) -> &str {
        &self.result.label
    }
}

/// Raw collector output of one run; `None` for a source that failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReadings {
    pub market: Option<RawMarketMetrics>,
    pub social: Option<RawSocialMetrics>,
    pub on_chain: Option<RawOnChainMetrics>,
}

/// Per-day audit document: the stored entry plus everything it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub entry: HistoryEntry,
    pub raw: RawReadings,
}

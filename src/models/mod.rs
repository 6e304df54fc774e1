//! Data records flowing through the pipeline.
//!
//! - [`metrics`] - Raw per-source metrics produced by the collectors
//! - [`index`] - Composite index result and persisted history entries

pub mod index;
pub mod metrics;

pub use index::{
    ComponentScores, CompositeIndexResult, DailySnapshot, HistoryEntry, IndexDetails, NormalizedMarket,
    NormalizedOnChain, NormalizedSentiment, RawReadings, SourceKind,
};
pub use metrics::{
    percent_change, BasketChainVolume, BudgetUsage, ChainMarketMetrics, ChainVolume, Engagement,
    RawMarketMetrics, RawOnChainMetrics, RawSocialMetrics, SentimentDistribution,
    TokenChainMetrics, TokenSocialMetrics, TokenSymbol,
};

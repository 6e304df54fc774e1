use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Ticker symbol of a basket token (e.g. `BONK`).
pub type TokenSymbol = String;

/// Basket-wide market snapshot averaged over the tokens the provider returned.
///
/// Tokens missing from the provider response are excluded from every average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMarketMetrics {
    pub price_change_pct_24h: f64,
    /// Basket-average `total_volume` as reported by the provider.
    pub volume_change_24h: f64,
    pub market_cap_change_pct_24h: f64,
    /// Provider ids that contributed to the averages.
    pub tokens: Vec<String>,
}

impl RawMarketMetrics {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Share of items per polarity bucket, in percent.
///
/// Sums to 100 when the token had items, all zeros otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Public engagement counters summed over a token's items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub impressions: u64,
    /// (likes + retweets + replies) / impressions, 0 when no impressions were reported.
    pub rate: f64,
}

impl Engagement {
    pub fn interactions(&self) -> u64 {
        self.likes + self.retweets + self.replies
    }
}

/// Social metrics of one token for one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSocialMetrics {
    pub item_count: u32,
    /// Mean item polarity, in [-1, 1].
    pub average_sentiment: f64,
    pub sentiment_distribution: SentimentDistribution,
    pub engagement: Engagement,
}

impl TokenSocialMetrics {
    /// Placeholder for a token that was skipped or failed.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Daily item budget state after a collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub used: u32,
    pub budget: u32,
    pub remaining: u32,
}

/// Basket-wide social summary plus the per-token breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSocialMetrics {
    /// Item-count weighted mean of the per-token average sentiment.
    pub overall_sentiment_score: f64,
    /// Item-count weighted mean of the per-token engagement rate.
    pub engagement_rate: f64,
    /// Change of this cycle's item total against the previous cycle, in percent.
    pub tweet_volume_change_pct: f64,
    pub total_items: u32,
    pub per_token: BTreeMap<TokenSymbol, TokenSocialMetrics>,
    pub usage: BudgetUsage,
}

/// Transfer volume of one token over the last two days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainVolume {
    /// Token-denominated volume, last 24h.
    pub current_24h: f64,
    /// Token-denominated volume, the 24h before that.
    pub previous_24h: f64,
    /// `(current - previous) / previous * 100`, 0 when previous is 0.
    pub change_pct: f64,
    /// Native (SOL) volume, last 24h.
    pub sol_amount: f64,
    /// Native (SOL) volume, the 24h before that.
    pub sol_previous: f64,
    pub sol_change_pct: f64,
    /// `sol_amount` priced in USD.
    pub usd_amount: f64,
}

/// On-chain metrics of one token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenChainMetrics {
    /// Circulating supply in UI units.
    pub supply: f64,
    pub transaction_count_24h: u32,
    /// Failed share of the last-24h signatures, in [0, 1].
    pub error_rate: f64,
    pub volume: ChainVolume,
    /// Blended activity score, in [0, 100].
    pub activity_score: f64,
}

/// Token-volume totals across the succeeding tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasketChainVolume {
    pub current_24h: f64,
    pub previous_24h: f64,
    pub change_pct: f64,
}

/// Basket-wide on-chain aggregates. Failed tokens are excluded, never zero-filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainMarketMetrics {
    pub total_transactions_24h: u64,
    pub average_activity_score: f64,
    pub average_error_rate: f64,
    pub volume: BasketChainVolume,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOnChainMetrics {
    pub per_token: BTreeMap<TokenSymbol, TokenChainMetrics>,
    pub market_metrics: ChainMarketMetrics,
    /// Tokens whose collection failed this cycle.
    pub failed_tokens: Vec<TokenSymbol>,
}

/// `(current - previous) / previous * 100`, or 0 when there is no previous volume.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

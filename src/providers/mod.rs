//! Upstream data providers.
//!
//! Each provider is a trait so collectors can run against in-memory fakes:
//! - [`MarketDataProvider`] - batched market snapshot ([`coingecko`])
//! - [`SocialSearchProvider`] - recent-item keyword search ([`twitter`])
//! - [`ChainRpcProvider`] - token supply, signatures and transactions ([`solana_rpc`])
//!
//! Adapters only translate the wire format. Retries and pacing live in the collectors.

pub mod coingecko;
pub mod solana_rpc;
pub mod twitter;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CollectorError;

pub use coingecko::CoinGeckoClient;
pub use solana_rpc::SolanaRpcClient;
pub use twitter::TwitterClient;

// ============================================
// Market data
// ============================================

/// One token of a market snapshot. Every numeric field may be absent upstream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MarketQuote {
    pub id: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub market_cap_change_percentage_24h: Option<f64>,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Current snapshot for `ids`. Unknown ids are simply missing from the result.
    async fn markets(&self, ids: &[String]) -> Result<Vec<MarketQuote>, CollectorError>;
}

// ============================================
// Social search
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Provider query string, e.g. `("$BONK" OR "#BONK") lang:en -is:retweet`.
    pub query: String,
    pub max_results: u32,
    pub start_time: DateTime<Utc>,
}

impl SearchQuery {
    /// OR-s the quoted keywords, restricted to English posts that are not retweets.
    pub fn for_keywords(keywords: &[String], max_results: u32, start_time: DateTime<Utc>) -> Self {
        let terms = keywords
            .iter()
            .map(|k| format!("\"{}\"", k))
            .collect::<Vec<_>>()
            .join(" OR ");

        Self {
            query: format!("({}) lang:en -is:retweet", terms),
            max_results,
            start_time,
        }
    }
}

/// A social post with its public engagement counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialItem {
    pub text: String,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub impressions: Option<u64>,
}

/// Rate-limit headers reported with a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub items: Vec<SocialItem>,
    pub rate_limit: RateLimitStatus,
}

#[async_trait]
pub trait SocialSearchProvider: Send + Sync {
    async fn search_recent(&self, query: &SearchQuery) -> Result<SearchPage, CollectorError>;

    /// Smallest page the provider will return. Requests below it are raised
    /// upstream and consume the larger amount.
    fn min_results(&self) -> u32 {
        1
    }
}

// ============================================
// Chain RPC
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: String,
    /// Unix seconds; absent for very recent or pruned transactions.
    pub block_time: Option<i64>,
    pub failed: bool,
}

/// Token balance of one account before or after a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBalance {
    pub account_index: usize,
    pub mint: String,
    pub ui_amount: f64,
}

/// Balance changes recorded in a transaction's metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionDelta {
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
}

impl TransactionDelta {
    /// Largest absolute lamport change of any account.
    pub fn max_lamport_change(&self) -> u64 {
        self.pre_balances
            .iter()
            .zip(&self.post_balances)
            .map(|(pre, post)| pre.abs_diff(*post))
            .max()
            .unwrap_or(0)
    }

    /// Largest absolute change, in UI units, of any account holding `mint`.
    /// An account missing on one side counts as a zero balance there.
    pub fn max_token_change(&self, mint: &str) -> f64 {
        let mut deltas: HashMap<usize, (f64, f64)> = HashMap::new();

        for balance in self.pre_token_balances.iter().filter(|b| b.mint == mint) {
            deltas.entry(balance.account_index).or_default().0 = balance.ui_amount;
        }
        for balance in self.post_token_balances.iter().filter(|b| b.mint == mint) {
            deltas.entry(balance.account_index).or_default().1 = balance.ui_amount;
        }

        deltas
            .values()
            .map(|(pre, post)| (post - pre).abs())
            .fold(0.0, f64::max)
    }
}

#[async_trait]
pub trait ChainRpcProvider: Send + Sync {
    /// Circulating supply of `mint`, in UI units.
    async fn token_supply(&self, mint: &str) -> Result<f64, CollectorError>;

    /// Most recent signatures involving `address`, newest first.
    async fn signatures_for_address(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<SignatureInfo>, CollectorError>;

    /// Balance deltas of a transaction; `None` when the node no longer has it.
    async fn transaction(&self, signature: &str) -> Result<Option<TransactionDelta>, CollectorError>;
}

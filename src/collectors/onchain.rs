use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::{ActivityPolicy, ChainTarget, OnChainSettings};
use crate::error::CollectorError;
use crate::models::{
    percent_change, BasketChainVolume, ChainMarketMetrics, ChainVolume, RawOnChainMetrics,
    TokenChainMetrics,
};
use crate::providers::{ChainRpcProvider, MarketDataProvider, SignatureInfo};
use crate::scoring::normalize;
use crate::utils::{clamp_finite, retry_with_backoff, RetryPolicy, LAMPORTS_PER_SOL, SECONDS_PER_DAY};

/// Market provider id used to price native volume.
const SOL_PRICE_ID: &str = "solana";

/// Per-token chain activity from the RPC endpoint.
///
/// Tokens are processed one at a time with a pause in between. A token whose
/// RPC calls fail (after rate-limit retries) is skipped; the cycle fails only
/// when no token succeeds.
pub struct OnChainCollector {
    rpc: Arc<dyn ChainRpcProvider>,
    prices: Option<Arc<dyn MarketDataProvider>>,
    retry: RetryPolicy,
    signature_limit: u32,
    transaction_sample: usize,
    token_delay: Duration,
    activity: ActivityPolicy,
}

impl OnChainCollector {
    pub fn new(rpc: Arc<dyn ChainRpcProvider>, settings: &OnChainSettings) -> Self {
        Self {
            rpc,
            prices: None,
            retry: settings.retry.clone(),
            signature_limit: settings.signature_limit,
            transaction_sample: settings.transaction_sample,
            token_delay: settings.token_delay(),
            activity: settings.activity.clone(),
        }
    }

    /// Prices native volume in USD through `prices`.
    pub fn with_price_source(mut self, prices: Arc<dyn MarketDataProvider>) -> Self {
        self.prices = Some(prices);
        self
    }

    pub async fn collect(
        &self,
        targets: &[ChainTarget],
        now: DateTime<Utc>,
    ) -> Result<RawOnChainMetrics, CollectorError> {
        let sol_price = self.sol_price().await;

        let mut per_token = BTreeMap::new();
        let mut failed_tokens = Vec::new();

        for (i, target) in targets.iter().enumerate() {
            info!("Fetching on-chain metrics for {}...", target.symbol);

            match self.token_metrics(target, now, sol_price).await {
                Ok(metrics) => {
                    debug!(
                        "{}: {} txs, error rate {:.3}, activity {:.1}",
                        target.symbol,
                        metrics.transaction_count_24h,
                        metrics.error_rate,
                        metrics.activity_score
                    );
                    per_token.insert(target.symbol.clone(), metrics);
                },
                Err(e) => {
                    warn!("Failed to fetch on-chain metrics for {}: {}", target.symbol, e);
                    failed_tokens.push(target.symbol.clone());
                },
            }

            if i + 1 < targets.len() {
                tokio::time::sleep(self.token_delay).await;
            }
        }

        if per_token.is_empty() {
            return Err(CollectorError::NoValidMetrics {
                failed: failed_tokens.len(),
            });
        }

        info!(
            "On-chain metrics collected for {}/{} tokens",
            per_token.len(),
            targets.len()
        );

        Ok(RawOnChainMetrics {
            market_metrics: aggregate(&per_token),
            per_token,
            failed_tokens,
        })
    }

    /// SOL/USD once per cycle; 0 when unavailable.
    async fn sol_price(&self) -> f64 {
        let Some(prices) = &self.prices else {
            return 0.0;
        };

        match prices.markets(&[SOL_PRICE_ID.to_string()]).await {
            Ok(quotes) => quotes
                .iter()
                .find(|q| q.id == SOL_PRICE_ID)
                .and_then(|q| q.current_price)
                .unwrap_or(0.0),
            Err(e) => {
                warn!("SOL price unavailable, USD volume will be 0: {}", e);
                0.0
            },
        }
    }

    async fn call<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, CollectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CollectorError>>,
    {
        retry_with_backoff(&self.retry, operation, op).await
    }

    async fn token_metrics(
        &self,
        target: &ChainTarget,
        now: DateTime<Utc>,
        sol_price: f64,
    ) -> Result<TokenChainMetrics, CollectorError> {
        let mint = target.mint.as_str();

        let supply = self
            .call("getTokenSupply", || self.rpc.token_supply(mint))
            .await?;
        let signatures = self
            .call("getSignaturesForAddress", || {
                self.rpc.signatures_for_address(mint, self.signature_limit)
            })
            .await?;

        let (current, previous) = partition_by_day(&signatures, now.timestamp());

        let transaction_count_24h = current.len() as u32;
        let error_rate = if current.is_empty() {
            0.0
        } else {
            current.iter().filter(|s| s.failed).count() as f64 / current.len() as f64
        };

        let (current_24h, sol_amount) = self.sample_volume(&current, mint).await?;
        let (previous_24h, sol_previous) = self.sample_volume(&previous, mint).await?;

        let volume = ChainVolume {
            current_24h,
            previous_24h,
            change_pct: percent_change(current_24h, previous_24h),
            sol_amount,
            sol_previous,
            sol_change_pct: percent_change(sol_amount, sol_previous),
            usd_amount: sol_amount * sol_price,
        };

        Ok(TokenChainMetrics {
            supply,
            transaction_count_24h,
            error_rate,
            activity_score: activity_score(&self.activity, transaction_count_24h, &volume),
            volume,
        })
    }

    /// Token and SOL volume over the first `transaction_sample` signatures.
    /// Each transaction contributes its largest single balance change.
    async fn sample_volume(
        &self,
        signatures: &[&SignatureInfo],
        mint: &str,
    ) -> Result<(f64, f64), CollectorError> {
        let mut token_volume = 0.0;
        let mut lamports: u64 = 0;

        for sig in signatures.iter().take(self.transaction_sample) {
            let delta = self
                .call("getTransaction", || self.rpc.transaction(&sig.signature))
                .await?;

            if let Some(delta) = delta {
                token_volume += delta.max_token_change(mint);
                lamports = lamports.saturating_add(delta.max_lamport_change());
            }
        }

        Ok((token_volume, lamports as f64 / LAMPORTS_PER_SOL))
    }
}

/// Splits signatures into the last 24h and the 24h before that.
/// Signatures without a block time are too recent to be indexed and count as current.
fn partition_by_day(signatures: &[SignatureInfo], now: i64) -> (Vec<&SignatureInfo>, Vec<&SignatureInfo>) {
    let day_ago = now - SECONDS_PER_DAY;
    let two_days_ago = now - 2 * SECONDS_PER_DAY;

    let mut current = Vec::new();
    let mut previous = Vec::new();
    for sig in signatures {
        match sig.block_time {
            None => current.push(sig),
            Some(t) if t >= day_ago => current.push(sig),
            Some(t) if t >= two_days_ago => previous.push(sig),
            Some(_) => {},
        }
    }
    (current, previous)
}

/// Blended activity in [0, 100]. Components are scaled to [0, 100] first.
pub fn activity_score(policy: &ActivityPolicy, transactions: u32, volume: &ChainVolume) -> f64 {
    let tx = clamp_finite(
        transactions as f64 / policy.transaction_ceiling * 100.0,
        0.0,
        100.0,
    );
    let volume_change = normalize(
        volume.change_pct,
        policy.change_range.min,
        policy.change_range.max,
    ) * 100.0;
    let sol_volume = clamp_finite(
        volume.sol_amount / policy.sol_volume_ceiling * 100.0,
        0.0,
        100.0,
    );
    let sol_change = normalize(
        volume.sol_change_pct,
        policy.change_range.min,
        policy.change_range.max,
    ) * 100.0;

    let score = tx * policy.transaction_weight
        + volume_change * policy.volume_change_weight
        + sol_volume * policy.sol_volume_weight
        + sol_change * policy.sol_volume_change_weight;

    clamp_finite(score, 0.0, 100.0)
}

fn aggregate(per_token: &BTreeMap<String, TokenChainMetrics>) -> ChainMarketMetrics {
    let count = per_token.len().max(1) as f64;

    let current_24h: f64 = per_token.values().map(|m| m.volume.current_24h).sum();
    let previous_24h: f64 = per_token.values().map(|m| m.volume.previous_24h).sum();

    ChainMarketMetrics {
        total_transactions_24h: per_token
            .values()
            .map(|m| m.transaction_count_24h as u64)
            .sum(),
        average_activity_score: per_token.values().map(|m| m.activity_score).sum::<f64>() / count,
        average_error_rate: per_token.values().map(|m| m.error_rate).sum::<f64>() / count,
        volume: BasketChainVolume {
            current_24h,
            previous_24h,
            change_pct: percent_change(current_24h, previous_24h),
        },
    }
}

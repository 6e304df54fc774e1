//! One index computation: collect, score, persist.
//!
//! The three collectors run concurrently and are awaited together. A failed
//! source is replaced by the neutral placeholder; only a run where all three
//! fail is aborted. Storage failures always abort.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use log::{info, warn};
use tokio::sync::Mutex;

use crate::collectors::{BudgetTracker, MarketCollector, OnChainCollector, SocialCollector};
use crate::config::{Basket, Settings};
use crate::error::{CollectorError, PipelineError};
use crate::history::HistoryStore;
use crate::models::{HistoryEntry, RawReadings, RawSocialMetrics};
use crate::providers::{
    ChainRpcProvider, CoinGeckoClient, MarketDataProvider, SocialSearchProvider, SolanaRpcClient,
    TwitterClient,
};
use crate::scoring::{NormalizationScorer, SourceReading};

/// Upstream clients the pipeline reads from.
pub struct Providers {
    pub market: Arc<dyn MarketDataProvider>,
    pub social: Arc<dyn SocialSearchProvider>,
    pub chain: Arc<dyn ChainRpcProvider>,
}

impl Providers {
    /// HTTP clients for CoinGecko, X and Solana JSON-RPC.
    pub fn from_settings(settings: &Settings) -> Result<Self, CollectorError> {
        Ok(Self {
            market: Arc::new(CoinGeckoClient::new(&settings.market)?),
            social: Arc::new(TwitterClient::new(&settings.social)?),
            chain: Arc::new(SolanaRpcClient::new(&settings.onchain)?),
        })
    }
}

pub struct Orchestrator {
    market: MarketCollector,
    social: SocialCollector,
    on_chain: OnChainCollector,
    scorer: NormalizationScorer,
    store: Arc<HistoryStore>,
    budget: Mutex<BudgetTracker>,
    basket: Basket,
}

impl Orchestrator {
    pub fn new(settings: &Settings, providers: Providers, store: Arc<HistoryStore>) -> Self {
        let on_chain = OnChainCollector::new(providers.chain, &settings.onchain)
            .with_price_source(providers.market.clone());

        Self {
            market: MarketCollector::new(providers.market),
            social: SocialCollector::new(
                providers.social,
                settings.social.retry.clone(),
                settings.social.request_delay(),
            ),
            on_chain,
            scorer: NormalizationScorer::new(settings.scoring.clone()),
            store,
            budget: Mutex::new(BudgetTracker::new(
                settings.social.daily_budget,
                settings.social.per_token_cap,
            )),
            basket: settings.basket.clone(),
        }
    }

    /// Runs one full cycle and returns the persisted entry.
    pub async fn run(&self) -> Result<HistoryEntry, PipelineError> {
        let started = Instant::now();
        let now = Utc::now();

        let market_ids = self.basket.market_ids();
        let social_targets = self.basket.social_targets();
        let chain_targets = self.basket.chain_targets();

        info!(
            "Collecting index inputs: {} market ids, {} social targets, {} chain targets",
            market_ids.len(),
            social_targets.len(),
            chain_targets.len()
        );

        let (market, social, on_chain) = tokio::join!(
            self.market.collect(&market_ids),
            async {
                let mut budget = self.budget.lock().await;
                self.social.collect(&social_targets, &mut budget, now).await
            },
            self.on_chain.collect(&chain_targets, now),
        );
        let social = social_reading(social);

        if let Err(e) = &market {
            warn!("Market source degraded to neutral: {}", e);
        }
        if let Err(reason) = &social {
            warn!("Sentiment source degraded to neutral: {}", reason);
        }
        if let Err(e) = &on_chain {
            warn!("On-chain source degraded to neutral: {}", e);
        }

        if let (Err(market), Err(social), Err(on_chain)) = (&market, &social, &on_chain) {
            return Err(PipelineError::AllSourcesFailed {
                market: market.to_string(),
                social: social.clone(),
                on_chain: on_chain.to_string(),
            });
        }

        let raw = RawReadings {
            market: market.ok(),
            social: social.ok(),
            on_chain: on_chain.ok(),
        };

        let result = self.scorer.score(
            SourceReading::from(raw.market.as_ref()),
            SourceReading::from(raw.social.as_ref()),
            SourceReading::from(raw.on_chain.as_ref()),
            now,
        );

        let entry = self.store.append(result).await?;
        let snapshot = self.store.write_snapshot(&entry, raw).await?;

        info!(
            "Index computed in {:?}: {} ({}), components market {:.1} sentiment {:.1} on-chain {:.1}, degraded {:?}, snapshot {}",
            started.elapsed(),
            entry.score(),
            entry.label(),
            entry.result.components.market,
            entry.result.components.sentiment,
            entry.result.components.on_chain,
            entry.result.degraded,
            snapshot.display()
        );

        Ok(entry)
    }
}

/// A social cycle without a single item carries no signal.
fn social_reading(metrics: RawSocialMetrics) -> Result<RawSocialMetrics, String> {
    if metrics.total_items == 0 {
        return Err(format!(
            "no social items collected ({} of {} budget used today)",
            metrics.usage.used, metrics.usage.budget
        ));
    }
    Ok(metrics)
}

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use overback::error::{CollectorError, PipelineError};
use overback::models::{DailySnapshot, SourceKind};
use overback::providers::{
    ChainRpcProvider, MarketDataProvider, MarketQuote, SearchPage, SearchQuery, SignatureInfo,
    SocialItem, SocialSearchProvider, TokenBalance, TransactionDelta,
};
use overback::{HistoryStore, IndexReader, Orchestrator, Providers, Settings, Trend};

const SETTINGS: &str = r#"
social:
  daily_budget: 100
  per_token_cap: 20
  request_delay_ms: 0
onchain:
  token_delay_ms: 0
  transaction_sample: 5
basket:
  core:
    - symbol: BONK
      mint: bonk-mint
      coingecko_id: bonk
    - symbol: WIF
      mint: wif-mint
      coingecko_id: dogwifcoin
  market:
    - symbol: POPCAT
      coingecko_id: popcat
"#;

struct FakeMarket {
    fail: bool,
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn markets(&self, ids: &[String]) -> Result<Vec<MarketQuote>, CollectorError> {
        if self.fail {
            return Err(CollectorError::provider("fake-market", "HTTP 503"));
        }
        Ok(ids
            .iter()
            .map(|id| MarketQuote {
                id: id.clone(),
                current_price: Some(if id == "solana" { 150.0 } else { 0.01 }),
                price_change_percentage_24h: Some(6.0),
                total_volume: Some(2_000_000.0),
                market_cap_change_percentage_24h: Some(5.0),
            })
            .collect())
    }
}

struct FakeSocial {
    fail: bool,
    requests: AtomicU32,
}

#[async_trait]
impl SocialSearchProvider for FakeSocial {
    async fn search_recent(&self, query: &SearchQuery) -> Result<SearchPage, CollectorError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollectorError::provider("fake-social", "HTTP 401"));
        }
        Ok(SearchPage {
            items: (0..query.max_results)
                .map(|i| SocialItem {
                    text: if i % 2 == 0 {
                        "so bullish, we are so back".to_string()
                    } else {
                        "just watching the chart".to_string()
                    },
                    likes: 10,
                    retweets: 2,
                    replies: 1,
                    impressions: Some(500),
                })
                .collect(),
            ..Default::default()
        })
    }
}

struct FakeChain {
    fail: bool,
}

#[async_trait]
impl ChainRpcProvider for FakeChain {
    async fn token_supply(&self, _mint: &str) -> Result<f64, CollectorError> {
        if self.fail {
            return Err(CollectorError::provider("fake-rpc", "connection refused"));
        }
        Ok(1_000_000_000.0)
    }

    async fn signatures_for_address(
        &self,
        _address: &str,
        _limit: u32,
    ) -> Result<Vec<SignatureInfo>, CollectorError> {
        let now = Utc::now().timestamp();
        Ok(vec![
            SignatureInfo {
                signature: "a".to_string(),
                block_time: Some(now - 600),
                failed: false,
            },
            SignatureInfo {
                signature: "b".to_string(),
                block_time: Some(now - 3_600),
                failed: true,
            },
            SignatureInfo {
                signature: "c".to_string(),
                block_time: Some(now - 30 * 3_600),
                failed: false,
            },
        ])
    }

    async fn transaction(&self, _signature: &str) -> Result<Option<TransactionDelta>, CollectorError> {
        Ok(Some(TransactionDelta {
            pre_balances: vec![5_000_000_000, 0],
            post_balances: vec![3_000_000_000, 2_000_000_000],
            pre_token_balances: vec![TokenBalance {
                account_index: 1,
                mint: "bonk-mint".to_string(),
                ui_amount: 100.0,
            }],
            post_token_balances: vec![TokenBalance {
                account_index: 1,
                mint: "bonk-mint".to_string(),
                ui_amount: 350.0,
            }],
        }))
    }
}

struct Harness {
    _dir: TempDir,
    store: Arc<HistoryStore>,
    social: Arc<FakeSocial>,
    orchestrator: Orchestrator,
}

async fn harness(market_fails: bool, social_fails: bool, chain_fails: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let settings = Settings::from_yaml(SETTINGS).unwrap();
    let store = Arc::new(HistoryStore::new(
        dir.path().join("data"),
        "over-back-history.json",
        365,
    ));
    store.initialize().await.unwrap();

    let social = Arc::new(FakeSocial {
        fail: social_fails,
        requests: AtomicU32::new(0),
    });
    let providers = Providers {
        market: Arc::new(FakeMarket { fail: market_fails }),
        social: social.clone(),
        chain: Arc::new(FakeChain { fail: chain_fails }),
    };

    Harness {
        orchestrator: Orchestrator::new(&settings, providers, store.clone()),
        store,
        social,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_full_run_persists_entry_and_snapshot() {
    let h = harness(false, false, false).await;

    let entry = h.orchestrator.run().await.unwrap();

    assert!(entry.result.degraded.is_empty());
    assert!(entry.score() <= 100);
    assert!(!entry.label().is_empty());
    assert_eq!(entry.result.policy_version, 1);

    let reader = IndexReader::new(h.store.clone());
    assert_eq!(reader.get_latest().await.unwrap(), Some(entry.clone()));

    let snapshot_path = h.store.snapshot_path(entry.timestamp.date_naive());
    let snapshot: DailySnapshot =
        serde_json::from_str(&std::fs::read_to_string(snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot.entry, entry);

    let market = snapshot.raw.market.unwrap();
    assert_eq!(market.token_count(), 3);
    assert_eq!(market.price_change_pct_24h, 6.0);

    let social = snapshot.raw.social.unwrap();
    assert_eq!(social.total_items, 40);
    assert_eq!(social.usage.used, 40);

    let on_chain = snapshot.raw.on_chain.unwrap();
    assert_eq!(on_chain.per_token.len(), 2);
    assert!(on_chain.failed_tokens.is_empty());
    assert_eq!(on_chain.market_metrics.total_transactions_24h, 4);
}

#[tokio::test]
async fn test_failed_market_source_scores_neutral() {
    let h = harness(true, false, false).await;

    let entry = h.orchestrator.run().await.unwrap();

    assert_eq!(entry.result.degraded, vec![SourceKind::Market]);
    assert_eq!(entry.result.components.market, 50.0);
    assert_eq!(entry.result.details.normalized_market.price_change, 0.5);
    assert!(h.store.latest().await.unwrap().is_some());
}

#[tokio::test]
async fn test_empty_social_cycle_scores_neutral() {
    let h = harness(false, true, false).await;

    let entry = h.orchestrator.run().await.unwrap();

    assert_eq!(entry.result.degraded, vec![SourceKind::Sentiment]);
    assert_eq!(entry.result.components.sentiment, 50.0);
    assert_eq!(h.social.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_all_sources_failed_persists_nothing() {
    let h = harness(true, true, true).await;

    let result = h.orchestrator.run().await;

    match result {
        Err(PipelineError::AllSourcesFailed {
            market,
            social,
            on_chain,
        }) => {
            assert!(market.contains("HTTP 503"));
            assert!(social.contains("no social items"));
            assert!(on_chain.contains("2 tokens failed"));
        },
        other => panic!("expected AllSourcesFailed, got {:?}", other),
    }

    assert!(h.store.latest().await.unwrap().is_none());
    let snapshot = h.store.snapshot_path(Utc::now().date_naive());
    assert!(!snapshot.exists());
}

#[tokio::test]
async fn test_storage_failure_aborts_run() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let settings = Settings::from_yaml(SETTINGS).unwrap();
    let store = Arc::new(HistoryStore::new(&blocker, "over-back-history.json", 365));
    let providers = Providers {
        market: Arc::new(FakeMarket { fail: false }),
        social: Arc::new(FakeSocial {
            fail: false,
            requests: AtomicU32::new(0),
        }),
        chain: Arc::new(FakeChain { fail: false }),
    };
    let orchestrator = Orchestrator::new(&settings, providers, store);

    let result = orchestrator.run().await;
    assert!(matches!(result, Err(PipelineError::Storage(_))));
}

#[tokio::test]
async fn test_budget_carries_across_runs_and_history_grows() {
    let h = harness(false, false, false).await;

    let first = h.orchestrator.run().await.unwrap();
    let second = h.orchestrator.run().await.unwrap();
    let third = h.orchestrator.run().await.unwrap();

    let reader = IndexReader::new(h.store.clone());
    let history = reader.get_history(None).await.unwrap();
    assert_eq!(history, vec![first, second, third.clone()]);

    // Only the tweet volume change moves, by less than the stable threshold.
    assert_eq!(reader.get_trend().await.unwrap(), Trend::Stable);

    let snapshot_path = h.store.snapshot_path(third.timestamp.date_naive());
    let snapshot: DailySnapshot =
        serde_json::from_str(&std::fs::read_to_string(snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot.raw.social.unwrap().usage.used, 100);
}

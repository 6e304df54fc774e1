use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::SocialTarget;
use crate::models::{RawSocialMetrics, TokenSocialMetrics};
use crate::providers::{SearchQuery, SocialSearchProvider};
use crate::utils::{retry_with_backoff, RetryPolicy};

use super::budget::BudgetTracker;
use super::sentiment::analyze_items;

/// Per-token social sentiment under the daily item budget.
///
/// Never fails: a token that is skipped, rate limited past its retry budget or
/// rejected by the provider gets empty metrics.
pub struct SocialCollector {
    provider: Arc<dyn SocialSearchProvider>,
    retry: RetryPolicy,
    request_delay: Duration,
}

impl SocialCollector {
    pub fn new(
        provider: Arc<dyn SocialSearchProvider>,
        retry: RetryPolicy,
        request_delay: Duration,
    ) -> Self {
        Self {
            provider,
            retry,
            request_delay,
        }
    }

    pub async fn collect(
        &self,
        targets: &[SocialTarget],
        tracker: &mut BudgetTracker,
        now: DateTime<Utc>,
    ) -> RawSocialMetrics {
        tracker.roll_over(now.date_naive());
        let cap = tracker.cap_for(targets.len());
        let start_time = now - chrono::Duration::hours(24);

        info!(
            "Social budget: {} items per token ({} of {} left today)",
            cap,
            tracker.remaining(),
            tracker.usage().budget
        );

        let mut per_token = BTreeMap::new();

        for (i, target) in targets.iter().enumerate() {
            if tracker.is_exhausted() {
                warn!("Daily social budget exhausted, skipping {}", target.symbol);
                per_token.insert(target.symbol.clone(), TokenSocialMetrics::empty());
                continue;
            }

            let limit = tracker.allowance(cap);
            let min_results = self.provider.min_results();
            if limit < min_results {
                warn!(
                    "Social allowance of {} is below the provider minimum of {}, skipping {}",
                    limit, min_results, target.symbol
                );
                per_token.insert(target.symbol.clone(), TokenSocialMetrics::empty());
                continue;
            }

            let metrics = self.fetch_token(target, limit, start_time).await;
            tracker.record(metrics.item_count);
            info!(
                "{}: {} items, sentiment {:.3} ({}/{} used)",
                target.symbol,
                metrics.item_count,
                metrics.average_sentiment,
                tracker.usage().used,
                tracker.usage().budget
            );
            per_token.insert(target.symbol.clone(), metrics);

            if i + 1 < targets.len() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        let total_items: u32 = per_token.values().map(|m| m.item_count).sum();
        let weighted = |f: fn(&TokenSocialMetrics) -> f64| -> f64 {
            if total_items == 0 {
                return 0.0;
            }
            per_token
                .values()
                .map(|m| f(m) * m.item_count as f64)
                .sum::<f64>()
                / total_items as f64
        };

        let overall_sentiment_score = weighted(|m| m.average_sentiment);
        let engagement_rate = weighted(|m| m.engagement.rate);
        let tweet_volume_change_pct = tracker.complete_cycle(total_items);

        RawSocialMetrics {
            overall_sentiment_score,
            engagement_rate,
            tweet_volume_change_pct,
            total_items,
            per_token,
            usage: tracker.usage(),
        }
    }

    async fn fetch_token(
        &self,
        target: &SocialTarget,
        limit: u32,
        start_time: DateTime<Utc>,
    ) -> TokenSocialMetrics {
        let query = SearchQuery::for_keywords(&target.keywords, limit, start_time);
        let operation = format!("social search for {}", target.symbol);

        let result = retry_with_backoff(&self.retry, &operation, || {
            self.provider.search_recent(&query)
        })
        .await;

        match result {
            Ok(page) => {
                if let Some(remaining) = page.rate_limit.remaining {
                    info!("{}: {} search requests left in window", target.symbol, remaining);
                }
                let take = (limit as usize).min(page.items.len());
                analyze_items(&page.items[..take])
            },
            Err(e) => {
                warn!("Social collection failed for {}: {}", target.symbol, e);
                TokenSocialMetrics::empty()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectorError;
    use crate::providers::{SearchPage, SocialItem};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Returns as many items as requested and records each request size.
    #[derive(Default)]
    struct FakeSearch {
        requests: Mutex<Vec<(String, u32)>>,
        rate_limited_calls: AtomicU32,
        fail_for: Option<&'static str>,
    }

    #[async_trait]
    impl SocialSearchProvider for FakeSearch {
        fn min_results(&self) -> u32 {
            10
        }

        async fn search_recent(&self, query: &SearchQuery) -> Result<SearchPage, CollectorError> {
            self.requests
                .lock()
                .unwrap()
                .push((query.query.clone(), query.max_results));

            if let Some(symbol) = self.fail_for {
                if query.query.contains(symbol) {
                    return Err(CollectorError::provider("fake", "HTTP 403"));
                }
            }
            if self.rate_limited_calls.load(Ordering::SeqCst) > 0 {
                self.rate_limited_calls.fetch_sub(1, Ordering::SeqCst);
                return Err(CollectorError::RateLimited {
                    provider: "fake",
                    retry_after: Some(Duration::from_secs(30)),
                });
            }

            // Raised to the minimum page size, like the real API.
            let count = query.max_results.max(self.min_results());
            Ok(SearchPage {
                items: (0..count)
                    .map(|_| SocialItem {
                        text: "bullish gm".to_string(),
                        likes: 3,
                        retweets: 1,
                        replies: 1,
                        impressions: Some(100),
                    })
                    .collect(),
                ..Default::default()
            })
        }
    }

    fn targets(n: usize) -> Vec<SocialTarget> {
        (0..n)
            .map(|i| SocialTarget {
                symbol: format!("TOK{}", i),
                keywords: vec![format!("$TOK{}", i)],
            })
            .collect()
    }

    fn collector(provider: Arc<FakeSearch>) -> SocialCollector {
        SocialCollector::new(
            provider,
            RetryPolicy::new(4, Duration::from_secs(5), Duration::from_secs(900)),
            Duration::from_secs(3),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_split_across_seven_tokens() {
        let provider = Arc::new(FakeSearch::default());
        let mut tracker = BudgetTracker::new(500, 100);

        let metrics = collector(provider.clone())
            .collect(&targets(7), &mut tracker, Utc::now())
            .await;

        let requests = provider.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 7);
        assert!(requests.iter().all(|(_, max)| *max == 71));
        assert_eq!(metrics.total_items, 497);
        assert_eq!(metrics.usage.used, 497);
        assert_eq!(metrics.usage.remaining, 3);
        assert_eq!(metrics.per_token.len(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_budget_caps_and_then_skips() {
        let provider = Arc::new(FakeSearch::default());
        let mut tracker = BudgetTracker::new(500, 100);
        let now = Utc::now();
        tracker.roll_over(now.date_naive());
        tracker.record(460);

        let metrics = collector(provider.clone())
            .collect(&targets(3), &mut tracker, now)
            .await;

        let requests = provider.requests.lock().unwrap().clone();
        // Only the first token is requested, with what is left of the budget.
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].1, 40);
        assert_eq!(metrics.per_token["TOK0"].item_count, 40);
        assert_eq!(metrics.per_token["TOK1"], TokenSocialMetrics::empty());
        assert_eq!(metrics.per_token["TOK2"], TokenSocialMetrics::empty());
        assert_eq!(metrics.usage.used, 500);
        assert_eq!(metrics.usage.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_token_is_retried() {
        let provider = Arc::new(FakeSearch {
            rate_limited_calls: AtomicU32::new(2),
            ..Default::default()
        });
        let mut tracker = BudgetTracker::new(500, 50);

        let metrics = collector(provider.clone())
            .collect(&targets(1), &mut tracker, Utc::now())
            .await;

        assert_eq!(provider.requests.lock().unwrap().len(), 3);
        assert_eq!(metrics.per_token["TOK0"].item_count, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_degrade_token_to_empty() {
        let provider = Arc::new(FakeSearch {
            rate_limited_calls: AtomicU32::new(100),
            ..Default::default()
        });
        let mut tracker = BudgetTracker::new(500, 50);

        let metrics = collector(provider.clone())
            .collect(&targets(2), &mut tracker, Utc::now())
            .await;

        assert_eq!(provider.requests.lock().unwrap().len(), 8);
        assert_eq!(metrics.total_items, 0);
        assert_eq!(metrics.overall_sentiment_score, 0.0);
        assert_eq!(metrics.usage.used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_token_has_no_weight_in_aggregate() {
        let provider = Arc::new(FakeSearch {
            fail_for: Some("$TOK1"),
            ..Default::default()
        });
        let mut tracker = BudgetTracker::new(500, 50);

        let metrics = collector(provider)
            .collect(&targets(2), &mut tracker, Utc::now())
            .await;

        let ok = metrics.per_token["TOK0"];
        assert_eq!(metrics.per_token["TOK1"], TokenSocialMetrics::empty());
        assert_eq!(metrics.total_items, 50);
        assert!((metrics.overall_sentiment_score - ok.average_sentiment).abs() < 1e-12);
        assert!((metrics.engagement_rate - 0.05).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_volume_change_against_previous_cycle() {
        let provider = Arc::new(FakeSearch::default());
        let collector = collector(provider);
        let mut tracker = BudgetTracker::new(1_000, 100);
        let now = Utc::now();

        let first = collector.collect(&targets(2), &mut tracker, now).await;
        assert_eq!(first.tweet_volume_change_pct, 0.0);

        let second = collector.collect(&targets(3), &mut tracker, now).await;
        assert_eq!(second.total_items, 300);
        assert_eq!(second.tweet_volume_change_pct, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_allowance_below_provider_minimum_is_skipped() {
        let provider = Arc::new(FakeSearch::default());
        let mut tracker = BudgetTracker::new(500, 100);
        let now = Utc::now();
        tracker.roll_over(now.date_naive());
        tracker.record(497);

        let metrics = collector(provider.clone())
            .collect(&targets(1), &mut tracker, now)
            .await;

        // A request would have consumed 10 items upstream against 3 left.
        assert!(provider.requests.lock().unwrap().is_empty());
        assert_eq!(metrics.per_token["TOK0"], TokenSocialMetrics::empty());
        assert_eq!(metrics.usage.used, 497);
        assert_eq!(metrics.usage.remaining, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_tokens() {
        let provider = Arc::new(FakeSearch::default());
        let mut tracker = BudgetTracker::new(500, 100);

        let start = tokio::time::Instant::now();
        collector(provider)
            .collect(&targets(3), &mut tracker, Utc::now())
            .await;

        // Two pauses of 3s, none after the last token.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_skipped_tokens_add_no_delay() {
        let provider = Arc::new(FakeSearch::default());
        let mut tracker = BudgetTracker::new(500, 100);
        let now = Utc::now();
        tracker.roll_over(now.date_naive());
        tracker.record(460);

        let start = tokio::time::Instant::now();
        collector(provider)
            .collect(&targets(3), &mut tracker, now)
            .await;

        // Only the pause after the first, fetched token.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_for_reset_hint() {
        let provider = Arc::new(FakeSearch {
            rate_limited_calls: AtomicU32::new(1),
            ..Default::default()
        });
        let mut tracker = BudgetTracker::new(500, 50);

        let start = tokio::time::Instant::now();
        collector(provider)
            .collect(&targets(1), &mut tracker, Utc::now())
            .await;

        // One retry after the 30s hint, no inter-token pause for a single token.
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }
}

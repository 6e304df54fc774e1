use std::sync::Arc;

use log::info;

use crate::error::CollectorError;
use crate::models::RawMarketMetrics;
use crate::providers::MarketDataProvider;

/// Basket-wide market snapshot from one batched provider request.
///
/// Failures are not retried here; the orchestrator decides whether the source
/// degrades.
pub struct MarketCollector {
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketCollector {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    pub async fn collect(&self, ids: &[String]) -> Result<RawMarketMetrics, CollectorError> {
        if ids.is_empty() {
            return Err(CollectorError::NoData);
        }

        let quotes = self.provider.markets(ids).await?;

        let mut seen: Vec<&str> = Vec::with_capacity(quotes.len());
        let mut price_sum = 0.0;
        let mut volume_sum = 0.0;
        let mut cap_sum = 0.0;

        for quote in &quotes {
            if !ids.contains(&quote.id) || seen.contains(&quote.id.as_str()) {
                continue;
            }
            seen.push(&quote.id);
            price_sum += quote.price_change_percentage_24h.unwrap_or(0.0);
            volume_sum += quote.total_volume.unwrap_or(0.0);
            cap_sum += quote.market_cap_change_percentage_24h.unwrap_or(0.0);
        }

        if seen.is_empty() {
            return Err(CollectorError::NoData);
        }

        let count = seen.len() as f64;
        info!(
            "Retrieved market data for {}/{} tokens: {}",
            seen.len(),
            ids.len(),
            seen.join(", ")
        );

        Ok(RawMarketMetrics {
            price_change_pct_24h: price_sum / count,
            volume_change_24h: volume_sum / count,
            market_cap_change_pct_24h: cap_sum / count,
            tokens: seen.into_iter().map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MarketQuote;
    use async_trait::async_trait;

    struct FakeMarket {
        quotes: Vec<MarketQuote>,
    }

    #[async_trait]
    impl MarketDataProvider for FakeMarket {
        async fn markets(&self, _ids: &[String]) -> Result<Vec<MarketQuote>, CollectorError> {
            Ok(self.quotes.clone())
        }
    }

    struct FailingMarket;

    #[async_trait]
    impl MarketDataProvider for FailingMarket {
        async fn markets(&self, _ids: &[String]) -> Result<Vec<MarketQuote>, CollectorError> {
            Err(CollectorError::provider("fake", "HTTP 500"))
        }
    }

    fn quote(id: &str, price: Option<f64>, volume: Option<f64>, cap: Option<f64>) -> MarketQuote {
        MarketQuote {
            id: id.to_string(),
            current_price: Some(1.0),
            price_change_percentage_24h: price,
            total_volume: volume,
            market_cap_change_percentage_24h: cap,
        }
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_averages_only_returned_tokens() {
        let collector = MarketCollector::new(Arc::new(FakeMarket {
            quotes: vec![
                quote("bonk", Some(10.0), Some(1_000.0), Some(4.0)),
                quote("popcat", Some(-4.0), Some(3_000.0), Some(2.0)),
            ],
        }));

        let metrics = collector
            .collect(&ids(&["bonk", "popcat", "dogwifcoin", "ai16z", "fartcoin"]))
            .await
            .unwrap();

        assert_eq!(metrics.token_count(), 2);
        assert_eq!(metrics.price_change_pct_24h, 3.0);
        assert_eq!(metrics.volume_change_24h, 2_000.0);
        assert_eq!(metrics.market_cap_change_pct_24h, 3.0);
    }

    #[tokio::test]
    async fn test_missing_fields_default_to_zero() {
        let collector = MarketCollector::new(Arc::new(FakeMarket {
            quotes: vec![
                quote("bonk", Some(8.0), None, None),
                quote("wif", None, Some(50.0), Some(6.0)),
            ],
        }));

        let metrics = collector.collect(&ids(&["bonk", "wif"])).await.unwrap();
        assert_eq!(metrics.price_change_pct_24h, 4.0);
        assert_eq!(metrics.volume_change_24h, 25.0);
        assert_eq!(metrics.market_cap_change_pct_24h, 3.0);
    }

    #[tokio::test]
    async fn test_empty_response_is_no_data() {
        let collector = MarketCollector::new(Arc::new(FakeMarket { quotes: vec![] }));
        let result = collector.collect(&ids(&["bonk"])).await;
        assert!(matches!(result, Err(CollectorError::NoData)));
    }

    #[tokio::test]
    async fn test_unrequested_ids_are_ignored() {
        let collector = MarketCollector::new(Arc::new(FakeMarket {
            quotes: vec![quote("solana", Some(50.0), None, None)],
        }));
        let result = collector.collect(&ids(&["bonk"])).await;
        assert!(matches!(result, Err(CollectorError::NoData)));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let collector = MarketCollector::new(Arc::new(FailingMarket));
        let result = collector.collect(&ids(&["bonk"])).await;
        assert!(matches!(result, Err(CollectorError::Provider { .. })));
    }
}

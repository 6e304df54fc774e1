//! CoinGecko Pro `/coins/markets` adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::MarketSettings;
use crate::error::CollectorError;

use super::{MarketDataProvider, MarketQuote};

const PROVIDER: &str = "coingecko";

pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(settings: &MarketSettings) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CollectorError::provider(PROVIDER, e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    fn markets_url(&self, ids: &[String]) -> Result<Url, CollectorError> {
        let mut url = Url::parse(&format!("{}/coins/markets", self.base_url))
            .map_err(|e| CollectorError::provider(PROVIDER, format!("invalid base url: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("vs_currency", "usd")
            .append_pair("ids", &ids.join(","))
            .append_pair("order", "market_cap_desc")
            .append_pair("per_page", &ids.len().max(1).to_string())
            .append_pair("page", "1")
            .append_pair("sparkline", "false")
            .append_pair("price_change_percentage", "24h");

        Ok(url)
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    async fn markets(&self, ids: &[String]) -> Result<Vec<MarketQuote>, CollectorError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.get(self.markets_url(ids)?);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CollectorError::provider(PROVIDER, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollectorError::RateLimited {
                provider: PROVIDER,
                retry_after: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::provider(
                PROVIDER,
                format!("HTTP {}: {}", status, body),
            ));
        }

        response
            .json::<Vec<MarketQuote>>()
            .await
            .map_err(|e| CollectorError::provider(PROVIDER, format!("invalid response: {}", e)))
    }
}

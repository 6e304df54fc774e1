//! X (Twitter) API v2 recent-search adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::SocialSettings;
use crate::error::CollectorError;

use super::{RateLimitStatus, SearchPage, SearchQuery, SocialItem, SocialSearchProvider};

const PROVIDER: &str = "twitter";

/// Bounds the API accepts for `max_results`.
const MIN_RESULTS: u32 = 10;
const MAX_RESULTS: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<Vec<Tweet>>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    text: String,
    #[serde(default)]
    public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    retweet_count: u64,
    #[serde(default)]
    reply_count: u64,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    impression_count: Option<u64>,
}

impl From<Tweet> for SocialItem {
    fn from(tweet: Tweet) -> Self {
        let metrics = tweet.public_metrics.unwrap_or_default();
        SocialItem {
            text: tweet.text,
            likes: metrics.like_count,
            retweets: metrics.retweet_count,
            replies: metrics.reply_count,
            impressions: metrics.impression_count,
        }
    }
}

pub struct TwitterClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl TwitterClient {
    pub fn new(settings: &SocialSettings) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CollectorError::provider(PROVIDER, e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            bearer_token: settings.bearer_token.clone(),
        })
    }

    fn search_url(&self, query: &SearchQuery) -> Result<Url, CollectorError> {
        let mut url = Url::parse(&format!("{}/tweets/search/recent", self.base_url))
            .map_err(|e| CollectorError::provider(PROVIDER, format!("invalid base url: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("query", &query.query)
            .append_pair(
                "max_results",
                &query.max_results.clamp(MIN_RESULTS, MAX_RESULTS).to_string(),
            )
            .append_pair("tweet.fields", "public_metrics,created_at")
            .append_pair(
                "start_time",
                &query.start_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            );

        Ok(url)
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn rate_limit_status(headers: &HeaderMap) -> RateLimitStatus {
    RateLimitStatus {
        remaining: header_u64(headers, "x-rate-limit-remaining").map(|v| v as u32),
        reset_at: header_u64(headers, "x-rate-limit-reset")
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0)),
    }
}

/// Time left until the window resets, from `x-rate-limit-reset` (unix seconds).
fn reset_hint(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let reset_at = rate_limit_status(headers).reset_at?;
    (reset_at - now).to_std().ok()
}

#[async_trait]
impl SocialSearchProvider for TwitterClient {
    fn min_results(&self) -> u32 {
        MIN_RESULTS
    }

    async fn search_recent(&self, query: &SearchQuery) -> Result<SearchPage, CollectorError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| CollectorError::provider(PROVIDER, "no bearer token configured"))?;

        let response = self
            .client
            .get(self.search_url(query)?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CollectorError::provider(PROVIDER, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollectorError::RateLimited {
                provider: PROVIDER,
                retry_after: reset_hint(response.headers(), Utc::now()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::provider(
                PROVIDER,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let rate_limit = rate_limit_status(response.headers());
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| CollectorError::provider(PROVIDER, format!("invalid response: {}", e)))?;

        Ok(SearchPage {
            items: body
                .data
                .unwrap_or_default()
                .into_iter()
                .map(SocialItem::from)
                .collect(),
            rate_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn client() -> TwitterClient {
        TwitterClient::new(&SocialSettings::default()).unwrap()
    }

    fn query(max_results: u32) -> SearchQuery {
        SearchQuery {
            query: "(\"$WIF\") lang:en -is:retweet".to_string(),
            max_results,
            start_time: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_max_results_is_clamped_to_api_bounds() {
        let c = client();
        assert_eq!(param(&c.search_url(&query(3)).unwrap(), "max_results").unwrap(), "10");
        assert_eq!(param(&c.search_url(&query(71)).unwrap(), "max_results").unwrap(), "71");
        assert_eq!(param(&c.search_url(&query(500)).unwrap(), "max_results").unwrap(), "100");
    }

    #[test]
    fn test_search_url_params() {
        let url = client().search_url(&query(50)).unwrap();
        assert_eq!(url.path(), "/2/tweets/search/recent");
        assert_eq!(param(&url, "query").unwrap(), "(\"$WIF\") lang:en -is:retweet");
        assert_eq!(param(&url, "start_time").unwrap(), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_reset_hint_from_headers() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit-reset", HeaderValue::from_static("1700000042"));
        headers.insert("x-rate-limit-remaining", HeaderValue::from_static("0"));

        assert_eq!(reset_hint(&headers, now), Some(Duration::from_secs(42)));
        assert_eq!(rate_limit_status(&headers).remaining, Some(0));

        // A reset time already in the past gives no hint.
        let later = DateTime::<Utc>::from_timestamp(1_700_000_100, 0).unwrap();
        assert_eq!(reset_hint(&headers, later), None);
        assert_eq!(reset_hint(&HeaderMap::new(), now), None);
    }

    #[test]
    fn test_tweets_map_to_items() {
        let json = r#"{"data":[{"id":"1","text":"gm $WIF","public_metrics":{"retweet_count":2,"reply_count":1,"like_count":7,"quote_count":0,"impression_count":400}},{"id":"2","text":"no metrics"}]}"#;
        let body: SearchResponse = serde_json::from_str(json).unwrap();
        let items: Vec<SocialItem> = body.data.unwrap().into_iter().map(SocialItem::from).collect();

        assert_eq!(items[0].likes, 7);
        assert_eq!(items[0].impressions, Some(400));
        assert_eq!(items[1], SocialItem { text: "no metrics".to_string(), ..Default::default() });

        let empty: SearchResponse = serde_json::from_str(r#"{"meta":{"result_count":0}}"#).unwrap();
        assert!(empty.data.is_none());
    }
}

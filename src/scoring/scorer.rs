//! Composite index scorer.
//!
//! Pure computation: raw per-source metrics in, a bounded 0–100 score with a label out.
//! Which sources count as degraded is decided by the caller through [`SourceReading`].

use chrono::{DateTime, Utc};

use crate::models::{
    ComponentScores, CompositeIndexResult, IndexDetails, NormalizedMarket, NormalizedOnChain,
    NormalizedSentiment, RawMarketMetrics, RawOnChainMetrics, RawSocialMetrics, SourceKind,
};

use super::normalize::{normalize, normalize_in, NEUTRAL};
use super::policy::ScoringPolicy;

/// Input for one source: either collected metrics or the neutral placeholder
/// substituted for a source that failed.
#[derive(Debug)]
pub enum SourceReading<'a, T> {
    Collected(&'a T),
    Neutral,
}

// Manual impls: derive would require `T: Copy`.
impl<T> Clone for SourceReading<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SourceReading<'_, T> {}

impl<'a, T> SourceReading<'a, T> {
    pub fn is_neutral(&self) -> bool {
        matches!(self, SourceReading::Neutral)
    }
}

impl<'a, T> From<Option<&'a T>> for SourceReading<'a, T> {
    fn from(value: Option<&'a T>) -> Self {
        match value {
            Some(metrics) => SourceReading::Collected(metrics),
            None => SourceReading::Neutral,
        }
    }
}

/// Weighted blend of normalized values, scaled to [0, 100].
fn blend(parts: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = parts.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return NEUTRAL * 100.0;
    }
    let weighted: f64 = parts.iter().map(|(v, w)| v * w).sum();
    (weighted / total_weight * 100.0).clamp(0.0, 100.0)
}

pub struct NormalizationScorer {
    policy: ScoringPolicy,
}

impl NormalizationScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn normalize_market(&self, metrics: SourceReading<'_, RawMarketMetrics>) -> NormalizedMarket {
        let policy = &self.policy.market;
        match metrics {
            SourceReading::Collected(m) => NormalizedMarket {
                price_change: normalize_in(m.price_change_pct_24h, policy.price_change),
                volume_change: normalize_in(m.volume_change_24h, policy.volume_change),
                market_cap_change: normalize_in(m.market_cap_change_pct_24h, policy.market_cap_change),
            },
            SourceReading::Neutral => NormalizedMarket {
                price_change: NEUTRAL,
                volume_change: NEUTRAL,
                market_cap_change: NEUTRAL,
            },
        }
    }

    pub fn normalize_sentiment(
        &self,
        metrics: SourceReading<'_, RawSocialMetrics>,
    ) -> NormalizedSentiment {
        let policy = &self.policy.sentiment;
        match metrics {
            SourceReading::Collected(m) => NormalizedSentiment {
                sentiment_score: normalize_in(m.overall_sentiment_score, policy.sentiment_score),
                engagement_score: normalize_in(m.engagement_rate, policy.engagement_rate),
                volume_score: normalize_in(m.tweet_volume_change_pct, policy.volume_change),
            },
            SourceReading::Neutral => NormalizedSentiment {
                sentiment_score: NEUTRAL,
                engagement_score: NEUTRAL,
                volume_score: NEUTRAL,
            },
        }
    }

    pub fn normalize_on_chain(
        &self,
        metrics: SourceReading<'_, RawOnChainMetrics>,
    ) -> NormalizedOnChain {
        let policy = &self.policy.on_chain;
        match metrics {
            SourceReading::Collected(m) => {
                let market = &m.market_metrics;
                let error_rate = normalize(market.average_error_rate, 0.0, 1.0);
                NormalizedOnChain {
                    activity_score: normalize(
                        market.average_activity_score,
                        0.0,
                        policy.activity_ceiling,
                    ),
                    success_rate: policy.error_rate_mode.success_rate(error_rate),
                    volume_score: normalize_in(market.volume.change_pct, policy.volume_change),
                }
            },
            SourceReading::Neutral => NormalizedOnChain {
                activity_score: NEUTRAL,
                success_rate: NEUTRAL,
                volume_score: NEUTRAL,
            },
        }
    }

    fn market_score(&self, reading: SourceReading<'_, RawMarketMetrics>, n: &NormalizedMarket) -> f64 {
        if reading.is_neutral() {
            return self.policy.neutral_baseline;
        }
        let p = &self.policy.market;
        blend(&[
            (n.price_change, p.price_weight),
            (n.volume_change, p.volume_weight),
            (n.market_cap_change, p.market_cap_weight),
        ])
    }

    fn sentiment_score(
        &self,
        reading: SourceReading<'_, RawSocialMetrics>,
        n: &NormalizedSentiment,
    ) -> f64 {
        if reading.is_neutral() {
            return self.policy.neutral_baseline;
        }
        let p = &self.policy.sentiment;
        blend(&[
            (n.sentiment_score, p.sentiment_weight),
            (n.engagement_score, p.engagement_weight),
            (n.volume_score, p.volume_weight),
        ])
    }

    fn on_chain_score(
        &self,
        reading: SourceReading<'_, RawOnChainMetrics>,
        n: &NormalizedOnChain,
    ) -> f64 {
        if reading.is_neutral() {
            return self.policy.neutral_baseline;
        }
        let p = &self.policy.on_chain;
        blend(&[
            (n.activity_score, p.activity_weight),
            (n.success_rate, p.success_weight),
            (n.volume_score, p.volume_weight),
        ])
    }

    /// Weighted mean of the component scores, clamped to [0, 100].
    pub fn composite(&self, components: &ComponentScores) -> f64 {
        let w = &self.policy.weights;
        let total = match w.total() {
            Some(total) if total > 0 => total,
            _ => return self.policy.neutral_baseline,
        };

        let raw = (components.market * w.market as f64
            + components.sentiment * w.sentiment as f64
            + components.on_chain * w.on_chain as f64)
            / total as f64;

        if raw.is_nan() {
            self.policy.neutral_baseline
        } else {
            raw.clamp(0.0, 100.0)
        }
    }

    /// First label whose threshold the score does not exceed; the last label otherwise.
    pub fn label_for(&self, score: f64) -> &str {
        self.policy
            .labels
            .iter()
            .find(|level| score <= level.max)
            .or_else(|| self.policy.labels.last())
            .map(|level| level.label.as_str())
            .unwrap_or_default()
    }

    pub fn score(
        &self,
        market: SourceReading<'_, RawMarketMetrics>,
        sentiment: SourceReading<'_, RawSocialMetrics>,
        on_chain: SourceReading<'_, RawOnChainMetrics>,
        computed_at: DateTime<Utc>,
    ) -> CompositeIndexResult {
        let normalized_market = self.normalize_market(market);
        let normalized_sentiment = self.normalize_sentiment(sentiment);
        let normalized_on_chain = self.normalize_on_chain(on_chain);

        let components = ComponentScores {
            market: self.market_score(market, &normalized_market),
            sentiment: self.sentiment_score(sentiment, &normalized_sentiment),
            on_chain: self.on_chain_score(on_chain, &normalized_on_chain),
        };

        let score = self.composite(&components).round() as u8;
        let label = self.label_for(score as f64).to_string();

        let mut degraded = Vec::new();
        if market.is_neutral() {
            degraded.push(SourceKind::Market);
        }
        if sentiment.is_neutral() {
            degraded.push(SourceKind::Sentiment);
        }
        if on_chain.is_neutral() {
            degraded.push(SourceKind::OnChain);
        }

        CompositeIndexResult {
            computed_at,
            score,
            label,
            components,
            details: IndexDetails {
                normalized_market,
                normalized_sentiment,
                normalized_on_chain,
            },
            degraded,
            policy_version: self.policy.version,
        }
    }
}

//! Scoring policy: every range, weight and label threshold used by the scorer.
//!
//! The policy is one versioned value loaded from configuration, so a change of
//! weights or thresholds is visible in config history and in the `policy_version`
//! stamped on every persisted result.

use serde::{Deserialize, Serialize};

/// Closed normalization range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarketPolicy {
    pub price_change: Range,
    pub volume_change: Range,
    pub market_cap_change: Range,
    pub price_weight: f64,
    pub volume_weight: f64,
    pub market_cap_weight: f64,
}

impl Default for MarketPolicy {
    fn default() -> Self {
        Self {
            price_change: Range::new(-20.0, 20.0),
            volume_change: Range::new(-50.0, 50.0),
            market_cap_change: Range::new(-25.0, 25.0),
            price_weight: 0.4,
            volume_weight: 0.3,
            market_cap_weight: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SentimentPolicy {
    pub sentiment_score: Range,
    pub engagement_rate: Range,
    pub volume_change: Range,
    pub sentiment_weight: f64,
    pub engagement_weight: f64,
    pub volume_weight: f64,
}

impl Default for SentimentPolicy {
    fn default() -> Self {
        Self {
            sentiment_score: Range::new(-0.3, 0.3),
            engagement_rate: Range::new(0.0, 0.03),
            volume_change: Range::new(-30.0, 30.0),
            sentiment_weight: 0.4,
            engagement_weight: 0.3,
            volume_weight: 0.3,
        }
    }
}

/// How the basket error rate is turned into a success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorRateMode {
    /// `1 - error_rate`
    Standard,
    /// `1 - 2 * error_rate`
    Strict,
}

impl ErrorRateMode {
    pub fn success_rate(&self, error_rate: f64) -> f64 {
        let rate = match self {
            ErrorRateMode::Standard => 1.0 - error_rate,
            ErrorRateMode::Strict => 1.0 - 2.0 * error_rate,
        };
        rate.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OnChainPolicy {
    /// Activity score that normalizes to 1.0. Historically 100 or 60.
    pub activity_ceiling: f64,
    pub error_rate_mode: ErrorRateMode,
    pub volume_change: Range,
    pub activity_weight: f64,
    pub success_weight: f64,
    pub volume_weight: f64,
}

impl Default for OnChainPolicy {
    fn default() -> Self {
        Self {
            activity_ceiling: 100.0,
            error_rate_mode: ErrorRateMode::Standard,
            volume_change: Range::new(-50.0, 50.0),
            activity_weight: 0.4,
            success_weight: 0.3,
            volume_weight: 0.3,
        }
    }
}

/// Integer weights of the three sources in the composite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceWeights {
    pub market: u32,
    pub sentiment: u32,
    pub on_chain: u32,
}

impl SourceWeights {
    /// Sum of the three weights; `None` when it does not fit in a `u32`.
    pub fn total(&self) -> Option<u32> {
        self.market
            .checked_add(self.sentiment)?
            .checked_add(self.on_chain)
    }
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            market: 40,
            sentiment: 15,
            on_chain: 45,
        }
    }
}

/// Upper score bound (inclusive) and the label shown up to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelThreshold {
    pub max: f64,
    pub label: String,
}

impl LabelThreshold {
    fn new(max: f64, label: &str) -> Self {
        Self {
            max,
            label: label.to_string(),
        }
    }
}

fn default_labels() -> Vec<LabelThreshold> {
    vec![
        LabelThreshold::new(10.0, "It's so over."),
        LabelThreshold::new(25.0, "It's over."),
        LabelThreshold::new(35.0, "Fuck it, we ball."),
        LabelThreshold::new(50.0, "It is what it is."),
        LabelThreshold::new(65.0, "We vibing."),
        LabelThreshold::new(75.0, "We're back."),
        LabelThreshold::new(90.0, "We are so back."),
        LabelThreshold::new(100.0, "LET'S FUCKING GOOO!"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringPolicy {
    pub version: u32,
    pub weights: SourceWeights,
    pub market: MarketPolicy,
    pub sentiment: SentimentPolicy,
    pub on_chain: OnChainPolicy,
    /// Sub-score assigned to a source that failed to collect.
    pub neutral_baseline: f64,
    /// Ascending thresholds; the first one the score does not exceed wins.
    pub labels: Vec<LabelThreshold>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            version: 1,
            weights: SourceWeights::default(),
            market: MarketPolicy::default(),
            sentiment: SentimentPolicy::default(),
            on_chain: OnChainPolicy::default(),
            neutral_baseline: 50.0,
            labels: default_labels(),
        }
    }
}

impl ScoringPolicy {
    /// Checks the invariants the scorer relies on.
    pub fn validate(&self) -> Result<(), String> {
        let ranges = [
            ("market.price_change", self.market.price_change),
            ("market.volume_change", self.market.volume_change),
            ("market.market_cap_change", self.market.market_cap_change),
            ("sentiment.sentiment_score", self.sentiment.sentiment_score),
            ("sentiment.engagement_rate", self.sentiment.engagement_rate),
            ("sentiment.volume_change", self.sentiment.volume_change),
            ("on_chain.volume_change", self.on_chain.volume_change),
        ];
        for (name, range) in ranges {
            if !(range.min < range.max) {
                return Err(format!("{} range must have min < max", name));
            }
        }

        if self.on_chain.activity_ceiling <= 0.0 {
            return Err("on_chain.activity_ceiling must be positive".to_string());
        }

        match self.weights.total() {
            None => return Err("source weights overflow when summed".to_string()),
            Some(0) => return Err("at least one source weight must be positive".to_string()),
            Some(_) => {},
        }

        if !(0.0..=100.0).contains(&self.neutral_baseline) {
            return Err("neutral_baseline must be within [0, 100]".to_string());
        }

        if self.labels.is_empty() {
            return Err("label table must not be empty".to_string());
        }
        if self.labels.windows(2).any(|w| w[0].max >= w[1].max) {
            return Err("label thresholds must be strictly ascending".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = ScoringPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.weights.total(), Some(100));
        assert_eq!(policy.labels.len(), 8);
    }

    #[test]
    fn test_validate_rejects_overflowing_weights() {
        let mut policy = ScoringPolicy::default();
        policy.weights = SourceWeights {
            market: u32::MAX,
            sentiment: 1,
            on_chain: 0,
        };
        assert_eq!(policy.weights.total(), None);
        assert_eq!(
            policy.validate().unwrap_err(),
            "source weights overflow when summed"
        );
    }

    #[test]
    fn test_validate_rejects_unordered_labels() {
        let mut policy = ScoringPolicy::default();
        policy.labels.swap(0, 1);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_degenerate_range() {
        let mut policy = ScoringPolicy::default();
        policy.market.price_change = Range::new(5.0, 5.0);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_error_rate_modes() {
        assert_eq!(ErrorRateMode::Standard.success_rate(0.2), 0.8);
        assert!((ErrorRateMode::Strict.success_rate(0.2) - 0.6).abs() < 1e-12);
        assert_eq!(ErrorRateMode::Strict.success_rate(0.9), 0.0);
    }
}

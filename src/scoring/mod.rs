//! Normalization and composite scoring.
//!
//! - [`normalize`] - Linear clamp into [0, 1]
//! - [`policy`] - Versioned ranges, weights and label thresholds
//! - [`scorer`] - Raw metrics to a labelled 0-100 composite

pub mod normalize;
pub mod policy;
pub mod scorer;

pub use normalize::{normalize, NEUTRAL};
pub use policy::{
    ErrorRateMode, LabelThreshold, MarketPolicy, OnChainPolicy, Range, ScoringPolicy,
    SentimentPolicy, SourceWeights,
};
pub use scorer::{NormalizationScorer, SourceReading};

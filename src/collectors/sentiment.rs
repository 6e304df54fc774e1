//! Lexicon-based polarity scoring for social items.
//!
//! Words are looked up in an AFINN-style valence table (-5..=5). An item's polarity
//! is the summed valence divided by its word count, clamped to [-1, 1]. A valence
//! directly after a negator flips sign.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::models::{Engagement, SentimentDistribution, TokenSocialMetrics};
use crate::providers::SocialItem;

static LEXICON: Lazy<FxHashMap<&'static str, i8>> = Lazy::new(|| {
    [
        // General English
        ("good", 3),
        ("great", 3),
        ("awesome", 4),
        ("amazing", 4),
        ("excellent", 3),
        ("love", 3),
        ("loving", 2),
        ("like", 2),
        ("happy", 3),
        ("win", 4),
        ("winning", 4),
        ("winner", 4),
        ("best", 3),
        ("nice", 3),
        ("cool", 1),
        ("fun", 4),
        ("strong", 2),
        ("growth", 2),
        ("gain", 2),
        ("gains", 2),
        ("profit", 2),
        ("success", 2),
        ("exciting", 3),
        ("excited", 3),
        ("wow", 4),
        ("beautiful", 3),
        ("fantastic", 4),
        ("perfect", 3),
        ("hope", 2),
        ("thanks", 2),
        ("bad", -3),
        ("terrible", -3),
        ("awful", -3),
        ("hate", -3),
        ("worst", -3),
        ("sad", -2),
        ("loss", -3),
        ("losses", -3),
        ("lose", -3),
        ("losing", -3),
        ("lost", -3),
        ("fail", -2),
        ("failed", -2),
        ("weak", -2),
        ("fear", -2),
        ("panic", -3),
        ("scared", -2),
        ("worried", -3),
        ("fraud", -4),
        ("scam", -2),
        ("fake", -3),
        ("dead", -3),
        ("crash", -2),
        ("crashed", -2),
        ("broke", -1),
        ("ugly", -3),
        ("stupid", -2),
        ("disaster", -2),
        ("angry", -3),
        ("problem", -2),
        ("trouble", -2),
        ("warning", -3),
        ("avoid", -1),
        ("regret", -2),
        ("steal", -2),
        ("stolen", -2),
        ("hack", -1),
        ("hacked", -1),
        // Market slang
        ("moon", 3),
        ("mooning", 3),
        ("bullish", 3),
        ("bull", 2),
        ("pump", 2),
        ("pumping", 2),
        ("gem", 3),
        ("rocket", 2),
        ("lfg", 3),
        ("wagmi", 3),
        ("hodl", 2),
        ("breakout", 2),
        ("ath", 3),
        ("send", 1),
        ("based", 2),
        ("gm", 1),
        ("bearish", -3),
        ("bear", -2),
        ("dump", -3),
        ("dumping", -3),
        ("rug", -4),
        ("rugged", -4),
        ("rugpull", -4),
        ("rekt", -3),
        ("ngmi", -3),
        ("honeypot", -4),
        ("ponzi", -4),
        ("bleeding", -2),
        ("capitulation", -3),
        ("cope", -1),
    ]
    .into_iter()
    .collect()
});

static NEGATORS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["not", "no", "never", "dont", "don't", "isnt", "isn't", "cant", "can't", "wont", "won't", "aint"]
        .into_iter()
        .collect()
});

/// Lowercased alphanumeric words. `$BONK` and `#BONK` both become `bonk`;
/// apostrophes stay inside words so `don't` is one token.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Polarity of one text in [-1, 1]; 0 for empty or unknown-only text.
pub fn polarity(text: &str) -> f64 {
    let words = tokenize(text);
    if words.is_empty() {
        return 0.0;
    }

    let mut total = 0i32;
    let mut negate = false;
    for word in &words {
        if NEGATORS.contains(word.as_str()) {
            negate = true;
            continue;
        }
        if let Some(valence) = LEXICON.get(word.as_str()) {
            let valence = *valence as i32;
            total += if negate { -valence } else { valence };
        }
        negate = false;
    }

    (total as f64 / words.len() as f64).clamp(-1.0, 1.0)
}

/// Per-token metrics for a batch of items.
pub fn analyze_items(items: &[SocialItem]) -> TokenSocialMetrics {
    if items.is_empty() {
        return TokenSocialMetrics::empty();
    }

    let mut sentiment_sum = 0.0;
    let (mut positive, mut negative, mut neutral) = (0u32, 0u32, 0u32);
    let mut engagement = Engagement::default();

    for item in items {
        let score = polarity(&item.text);
        sentiment_sum += score;
        if score > 0.0 {
            positive += 1;
        } else if score < 0.0 {
            negative += 1;
        } else {
            neutral += 1;
        }

        engagement.likes += item.likes;
        engagement.retweets += item.retweets;
        engagement.replies += item.replies;
        engagement.impressions += item.impressions.unwrap_or(0);
    }

    if engagement.impressions > 0 {
        engagement.rate = engagement.interactions() as f64 / engagement.impressions as f64;
    }

    let count = items.len() as f64;
    TokenSocialMetrics {
        item_count: items.len() as u32,
        average_sentiment: sentiment_sum / count,
        sentiment_distribution: SentimentDistribution {
            positive: positive as f64 / count * 100.0,
            negative: negative as f64 / count * 100.0,
            neutral: neutral as f64 / count * 100.0,
        },
        engagement,
    }
}

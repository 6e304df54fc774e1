use serde::Deserialize;

/// A core index token: tracked on-chain, on social media and (when listed) by the
/// market provider.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CoreToken {
    pub symbol: String,
    /// SPL mint address.
    pub mint: String,
    /// CoinGecko id; `None` while the token is unlisted.
    #[serde(default)]
    pub coingecko_id: Option<String>,
    /// Search keywords; `$SYM` and `#SYM` are used when empty.
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Auxiliary token that only feeds the market average.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MarketToken {
    pub symbol: String,
    pub coingecko_id: String,
}

/// Social search target: a symbol and the keywords OR-ed into its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialTarget {
    pub symbol: String,
    pub keywords: Vec<String>,
}

/// On-chain target: a symbol and its mint address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTarget {
    pub symbol: String,
    pub mint: String,
}

/// The fixed set of tokens aggregated into one index reading.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Basket {
    #[serde(default)]
    pub core: Vec<CoreToken>,
    #[serde(default)]
    pub market: Vec<MarketToken>,
}

impl Basket {
    /// Provider ids for the market snapshot: listed core tokens first, then the
    /// auxiliary market tokens. Unlisted tokens are skipped; duplicates dropped.
    pub fn market_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let core = self.core.iter().filter_map(|t| t.coingecko_id.clone());
        let market = self.market.iter().map(|t| t.coingecko_id.clone());

        for id in core.chain(market) {
            if !id.is_empty() && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    pub fn social_targets(&self) -> Vec<SocialTarget> {
        self.core
            .iter()
            .map(|t| SocialTarget {
                symbol: t.symbol.clone(),
                keywords: if t.keywords.is_empty() {
                    vec![format!("${}", t.symbol), format!("#{}", t.symbol)]
                } else {
                    t.keywords.clone()
                },
            })
            .collect()
    }

    pub fn chain_targets(&self) -> Vec<ChainTarget> {
        self.core
            .iter()
            .map(|t| ChainTarget {
                symbol: t.symbol.clone(),
                mint: t.mint.clone(),
            })
            .collect()
    }
}

fn core(symbol: &str, mint: &str, coingecko_id: Option<&str>, keywords: &[&str]) -> CoreToken {
    CoreToken {
        symbol: symbol.to_string(),
        mint: mint.to_string(),
        coingecko_id: coingecko_id.map(str::to_string),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn market(symbol: &str, coingecko_id: &str) -> MarketToken {
    MarketToken {
        symbol: symbol.to_string(),
        coingecko_id: coingecko_id.to_string(),
    }
}

impl Default for Basket {
    fn default() -> Self {
        Self {
            core: vec![
                core(
                    "BONK",
                    "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
                    Some("bonk"),
                    &["$BONK", "#BONK", "bonkcoin", "bonksolana"],
                ),
                core(
                    "PENGU",
                    "2zMMhcVQEXDtdE6vsFS7S7D5oUodfJHE8vd1gnBouauv",
                    Some("pudgy-penguins"),
                    &["$PENGU", "#PENGU", "pudgypenguins"],
                ),
                core(
                    "WIF",
                    "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",
                    Some("dogwifcoin"),
                    &["$WIF", "#WIF", "dogwifhat"],
                ),
                core(
                    "POPCAT",
                    "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr",
                    Some("popcat"),
                    &["$POPCAT", "#POPCAT", "popcatsolana"],
                ),
                core(
                    "FART",
                    "9BB6NFEcjBCtnNLFko2FqVQBq8HHM13kCyYcdQbgpump",
                    Some("fartcoin"),
                    &["$FART", "#FARTCOIN", "fartcoin"],
                ),
                core(
                    "AI16Z",
                    "HeLp6NuQkmYB4pYWo2zYs22mESHXPQYzXbB8n4V98jwC",
                    Some("ai16z"),
                    &["$AI16Z", "#AI16Z", "ai16z"],
                ),
                // Not yet listed by the market provider.
                core(
                    "BACK",
                    "AUiXW4YH5TLNFBgVayFBRvgWTz2ApeeM1Br7FCoyrugj",
                    None,
                    &["$BACK", "#BACK"],
                ),
            ],
            market: vec![
                market("GIGACHAD", "gigachad-2"),
                market("PEANUT", "peanut-the-squirrel"),
                market("MOODENG", "moo-deng"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_ids_skip_unlisted_tokens() {
        let basket = Basket::default();
        let ids = basket.market_ids();

        assert_eq!(ids.len(), 9);
        assert_eq!(ids[0], "bonk");
        assert!(ids.contains(&"moo-deng".to_string()));
        assert!(!ids.iter().any(|id| id.is_empty()));
    }

    #[test]
    fn test_market_ids_are_deduplicated() {
        let basket = Basket {
            core: vec![core("BONK", "mint", Some("bonk"), &[])],
            market: vec![market("BONK2", "bonk")],
        };
        assert_eq!(basket.market_ids(), vec!["bonk".to_string()]);
    }

    #[test]
    fn test_social_targets_default_keywords() {
        let basket = Basket {
            core: vec![core("MYRO", "mint", None, &[])],
            market: vec![],
        };
        let targets = basket.social_targets();
        assert_eq!(targets[0].keywords, vec!["$MYRO", "#MYRO"]);
    }
}

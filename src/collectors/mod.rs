//! Per-source collectors.
//!
//! - [`market`] - Basket market snapshot, one batched request, no retries
//! - [`social`] - Per-token social search under a daily budget ([`budget`], [`sentiment`])
//! - [`onchain`] - Per-token RPC polling with rate-limit backoff

pub mod budget;
pub mod market;
pub mod onchain;
pub mod sentiment;
pub mod social;

pub use budget::BudgetTracker;
pub use market::MarketCollector;
pub use onchain::OnChainCollector;
pub use social::SocialCollector;

mod config;
pub mod tokens;

pub use config::{
    ActivityPolicy, LoggingSettings, MarketSettings, OnChainSettings, ScheduleSettings, Settings,
    SocialSettings, StorageSettings,
};
pub use tokens::{Basket, ChainTarget, CoreToken, MarketToken, SocialTarget};

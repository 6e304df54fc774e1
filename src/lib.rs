pub mod collectors;
pub mod config;
pub mod cron;
pub mod error;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod query;
pub mod scoring;
pub mod utils;

pub use config::Settings;
pub use cron::CronScheduler;
pub use error::{CollectorError, PipelineError, StorageError};
pub use history::{HistoryStore, Trend};
pub use models::{CompositeIndexResult, HistoryEntry};
pub use pipeline::{Orchestrator, Providers};
pub use query::IndexReader;

//! Daily index pipeline.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, Providers};

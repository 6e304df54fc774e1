//! Job computing and persisting the daily index.

use anyhow::{Context, Result};
use log::info;

use crate::pipeline::Orchestrator;

/// Runs one pipeline cycle. A failed run is reported to the caller and not
/// retried; the next trigger starts a fresh cycle.
pub async fn run(orchestrator: &Orchestrator) -> Result<()> {
    info!("Starting compute_index job...");

    let start = std::time::Instant::now();

    let entry = orchestrator
        .run()
        .await
        .context("Index computation failed")?;

    info!(
        "Completed compute_index job in {:?} (score {}, \"{}\")",
        start.elapsed(),
        entry.score(),
        entry.label()
    );
    Ok(())
}

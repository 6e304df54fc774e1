//! Cron scheduler for the daily index computation.
//!
//! Registers the `compute_index` job on a six-field cron expression evaluated
//! in UTC, and optionally runs it once right after startup.

use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::config::ScheduleSettings;
use crate::pipeline::Orchestrator;

use super::jobs;

pub struct CronScheduler {
    orchestrator: Arc<Orchestrator>,
    settings: ScheduleSettings,
}

impl CronScheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, settings: ScheduleSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    /// Starts the cron scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        self.register_compute_index_job(&scheduler).await?;

        scheduler.start().await?;
        info!("Cron scheduler started");

        if self.settings.run_on_startup {
            tokio::select! {
                _ = run_compute_index(&self.orchestrator) => {},
                _ = cancellation_token.cancelled() => {
                    info!("Startup run interrupted by shutdown");
                },
            }
        }

        cancellation_token.cancelled().await;
        info!("Cron scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_compute_index_job(&self, scheduler: &JobScheduler) -> Result<()> {
        let orchestrator = self.orchestrator.clone();
        let schedule = self.settings.cron.as_str();

        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let orchestrator = orchestrator.clone();
            Box::pin(async move {
                run_compute_index(&orchestrator).await;
            })
        })?;

        scheduler.add(job).await?;
        info!("Registered compute_index job ({} UTC)", schedule);
        Ok(())
    }
}

async fn run_compute_index(orchestrator: &Orchestrator) {
    if let Err(e) = jobs::compute_index::run(orchestrator).await {
        error!("Failed to compute index: {:#}", e);
    }
}

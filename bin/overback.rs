use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use overback::{CronScheduler, HistoryStore, Orchestrator, Providers, Settings};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it is valid")?;

    let level = LevelFilter::from_str(&settings.logging.level)
        .map_err(|_| anyhow::anyhow!("Invalid log level '{}'", settings.logging.level))?;
    SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    let run_once = std::env::args().skip(1).any(|arg| arg == "--once");

    let store = Arc::new(HistoryStore::from_settings(&settings.storage));
    store
        .initialize()
        .await
        .context("Failed to initialize history storage")?;

    let providers = Providers::from_settings(&settings).context("Failed to build API clients")?;
    let orchestrator = Arc::new(Orchestrator::new(&settings, providers, store));

    // The history store has a single writer: never run `--once` against a data
    // directory a running service also writes to.
    if run_once {
        let entry = orchestrator.run().await.context("Index computation failed")?;
        info!("Over & Back index: {} ({})", entry.score(), entry.label());
        return Ok(());
    }

    run_scheduler(orchestrator, settings).await
}

async fn run_scheduler(orchestrator: Arc<Orchestrator>, settings: Settings) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    let cron_scheduler = CronScheduler::new(orchestrator, settings.schedule.clone());

    let cron_token = cancellation_token.child_token();
    let cron_handle = tokio::spawn(async move {
        if let Err(e) = cron_scheduler.run(cron_token).await {
            error!("Cron scheduler failed: {:#}", e);
        }
    });

    info!(
        "Cron scheduler started - index computed on '{}' (UTC)",
        settings.schedule.cron
    );

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Service running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    info!("Waiting for cron scheduler to stop...");
    let _ = cron_handle.await;

    info!("Shutdown complete");
    Ok(())
}

use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use dagsync::{cron::jobs, sources::{DexApi, ListingApi}, CronScheduler, Database, Settings};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    let db = Arc::new(
        Database::new(settings.clone())
            .await
            .context("Failed to initialize database connection")?,
    );

    // One sync pass per enabled source before the first scheduled tick, so
    // a fresh deployment serves data immediately
    run_startup_sync(&db, &settings).await;

    let cancellation_token = CancellationToken::new();

    let cron_scheduler = CronScheduler::new(db.clone(), settings.clone());
    let cron_token = cancellation_token.child_token();
    let cron_handle = tokio::spawn(async move {
        if let Err(e) = cron_scheduler.run(cron_token).await {
            error!("Cron scheduler failed: {:#}", e);
        }
    });

    info!("Cron scheduler started - sync jobs will run periodically");

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("dagsync running. Press Ctrl+C to stop.");

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

    // Cancel all running tasks
    info!("Finishing all tasks...");

    cancellation_token.cancel();

    info!("Waiting for cron scheduler to stop...");
    let _ = cron_handle.await;

    info!("All tasks stopped");
    Ok(())
}

/// Sync every enabled source once at startup. Failures are logged and do
/// not prevent the scheduler from starting; the next tick retries.
async fn run_startup_sync(db: &Database, settings: &Settings) {
    for dex in settings.dexes.iter().filter(|d| d.enabled) {
        match DexApi::new(dex) {
            Ok(api) => {
                if let Err(e) = jobs::dex_sync::run(db, &api, dex).await {
                    error!("Initial {} sync failed: {:#}", dex.name, e);
                }
            },
            Err(e) => error!("Failed to build {} API client: {:#}", dex.name, e),
        }
    }

    for listing in settings.listings.iter().filter(|l| l.enabled) {
        match ListingApi::new(listing) {
            Ok(api) => {
                if let Err(e) = jobs::listing_sync::run(db, &api, listing).await {
                    error!("Initial {} listing snapshot failed: {:#}", listing.name, e);
                }
            },
            Err(e) => error!("Failed to build {} API client: {:#}", listing.name, e),
        }
    }
}

//! Cron scheduler for the periodic sync jobs.
//!
//! Registers one repeated job per enabled configured source:
//! - DEX mirror sync (tokens, prices, pools, protocol stats)
//! - Top-N listing snapshot
//!
//! Every job owns a [`SingleFlight`] state: a tick that finds the previous
//! cycle still in flight is a no-op. Errors inside a cycle are caught at
//! the tick boundary and logged; they never stop the schedule.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::config::{DexSettings, ListingSettings, Settings};
use crate::cron::{jobs, SingleFlight};
use crate::db::Database;
use crate::sources::{DexApi, ListingApi};

/// Cron scheduler that manages the periodic sync jobs.
pub struct CronScheduler {
    db: Arc<Database>,
    settings: Arc<Settings>,
}

impl CronScheduler {
    pub fn new(db: Arc<Database>, settings: Arc<Settings>) -> Self {
        Self { db, settings }
    }

    /// Starts the cron scheduler and runs until cancellation.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        let mut registered = 0;
        for dex in self.settings.dexes.iter().filter(|d| d.enabled) {
            self.register_dex_sync_job(&scheduler, dex).await?;
            registered += 1;
        }
        for listing in self.settings.listings.iter().filter(|l| l.enabled) {
            self.register_listing_sync_job(&scheduler, listing).await?;
            registered += 1;
        }

        if registered == 0 {
            warn!("No sync jobs enabled; scheduler will idle until shutdown");
        }

        scheduler.start().await?;
        info!("Cron scheduler started with {} jobs", registered);

        // Wait for cancellation
        cancellation_token.cancelled().await;
        info!("Cron scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_dex_sync_job(
        &self,
        scheduler: &JobScheduler,
        settings: &DexSettings,
    ) -> Result<()> {
        let db = self.db.clone();
        let settings = Arc::new(settings.clone());
        let api = Arc::new(DexApi::new(&settings)?);
        let flight = SingleFlight::new();
        let interval = settings.sync_interval_secs;

        let job_settings = settings.clone();
        let job = Job::new_repeated_async(
            Duration::from_secs(interval),
            move |_uuid, _lock| {
                let db = db.clone();
                let settings = job_settings.clone();
                let api = api.clone();
                let flight = flight.clone();
                Box::pin(async move {
                    let Some(_guard) = flight.try_begin() else {
                        warn!("{} sync still running, skipping tick", settings.name);
                        return;
                    };
                    if let Err(e) = jobs::dex_sync::run(&db, &api, &settings).await {
                        error!("{} sync failed: {:#}", settings.name, e);
                    }
                })
            },
        )?;

        scheduler.add(job).await?;
        info!(
            "Registered {} DEX sync job (every {}s)",
            settings.name, interval
        );
        Ok(())
    }

    async fn register_listing_sync_job(
        &self,
        scheduler: &JobScheduler,
        settings: &ListingSettings,
    ) -> Result<()> {
        let db = self.db.clone();
        let settings = Arc::new(settings.clone());
        let api = Arc::new(ListingApi::new(&settings)?);
        let flight = SingleFlight::new();
        let interval = settings.sync_interval_secs;

        let job_settings = settings.clone();
        let job = Job::new_repeated_async(
            Duration::from_secs(interval),
            move |_uuid, _lock| {
                let db = db.clone();
                let settings = job_settings.clone();
                let api = api.clone();
                let flight = flight.clone();
                Box::pin(async move {
                    let Some(_guard) = flight.try_begin() else {
                        warn!(
                            "{} listing snapshot still running, skipping tick",
                            settings.name
                        );
                        return;
                    };
                    if let Err(e) = jobs::listing_sync::run(&db, &api, &settings).await {
                        error!("{} listing snapshot failed: {:#}", settings.name, e);
                    }
                })
            },
        )?;

        scheduler.add(job).await?;
        info!(
            "Registered {} listing snapshot job (every {}s)",
            settings.name, interval
        );
        Ok(())
    }
}

//! Job to mirror one DEX upstream.
//!
//! Runs a full sync cycle: token metadata and prices first (so the tracked
//! set is fresh), then protocol stats and pools. Per-record problems are
//! counted by the cycle, not raised; only a cycle-level failure (e.g. a
//! malformed response envelope) reaches the scheduler.

use anyhow::Result;
use log::info;

use crate::config::DexSettings;
use crate::db::Database;
use crate::sources::DexApi;
use crate::sync::{pipeline, SyncReport};

pub async fn run(db: &Database, api: &DexApi, settings: &DexSettings) -> Result<SyncReport> {
    info!("Starting {} sync...", settings.name);

    let start = std::time::Instant::now();
    let report = pipeline::run_dex_cycle(db, api, settings).await?;

    info!(
        "{} sync completed: {} in {:?}",
        settings.name,
        report,
        start.elapsed()
    );
    Ok(report)
}

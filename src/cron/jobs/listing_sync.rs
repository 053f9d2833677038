//! Job to snapshot the top-N tokens of a listing upstream.
//!
//! The page walk tolerates partial failures (a dead page ends the walk
//! with whatever was collected), and the price points are keyed by
//! (token, time bucket) so a tick landing in the same bucket as the last
//! one overwrites instead of duplicating.

use anyhow::Result;
use log::info;

use crate::config::ListingSettings;
use crate::db::Database;
use crate::sources::ListingApi;
use crate::sync::{pipeline, SyncReport};

pub async fn run(
    db: &Database,
    api: &ListingApi,
    settings: &ListingSettings,
) -> Result<SyncReport> {
    info!("Starting {} listing snapshot...", settings.name);

    let start = std::time::Instant::now();
    let report = pipeline::run_listing_cycle(db, api, settings).await?;

    info!(
        "{} listing snapshot completed: {} in {:?}",
        settings.name,
        report,
        start.elapsed()
    );
    Ok(report)
}

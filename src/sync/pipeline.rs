//! Sync cycle orchestration.
//!
//! Each cycle is idempotent and safe to invoke repeatedly: the upstream is
//! the source of truth and every write is either an append or an upsert
//! keyed by identity. The two writes of the dual-write (history + latest)
//! are independent failure domains; a failed write is logged with its
//! identity and counted, and the cycle keeps going. The next cycle
//! self-heals anything that was missed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::config::{DexSettings, ListingSettings};
use crate::db::models::{ListedToken, ListedTokenPrice};
use crate::db::Database;
use crate::sources::{DexApi, ListingApi};
use crate::sync::normalize;
use crate::sync::{SyncReport, TrackedSet};
use crate::utils::bucket_timestamp;

/// Run one full DEX sync cycle: tokens (metadata + prices), protocol
/// stats, then pools gated on the tracked set.
///
/// Returns an error only for cycle-level failures (unreachable upstream,
/// malformed response envelope, unreadable tracked set). Per-record
/// problems are counted in the report instead.
pub async fn run_dex_cycle(
    db: &Database,
    api: &DexApi,
    settings: &DexSettings,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    let tokens = api.fetch_tokens().await?;
    let now = Utc::now();

    for raw in &tokens.tokens {
        let Some(normalized) = normalize::normalize_token(raw, now) else {
            warn!("Skipping token with missing required fields: {}", raw);
            report.skipped += 1;
            continue;
        };

        // Admission policy: tokens outside the tracked set are not
        // persisted at all (no metadata, no price history)
        if !settings.tracked_policy.admits(normalized.token.verified) {
            report.skipped += 1;
            continue;
        }

        report.processed += 1;
        let address = normalized.token.address.clone();

        if let Err(e) = db.postgres.set_token(&normalized.token).await {
            error!("Failed to upsert token {}: {:#}", address, e);
            report.errors += 1;
        }

        // Price writes only when the upstream reported a price; 0 counts
        if let Some(price_usd) = normalized.price_usd {
            if let Err(e) = db
                .postgres
                .insert_token_price(&normalized.price_row(price_usd, now))
                .await
            {
                error!("Failed to save price point for {}: {:#}", address, e);
                report.errors += 1;
            }
            if let Err(e) = db
                .postgres
                .set_token_price_latest(&normalized.price_latest_row(price_usd, now))
                .await
            {
                error!("Failed to upsert latest price for {}: {:#}", address, e);
                report.errors += 1;
            }
        }
    }

    let pools = api.fetch_pools().await?;
    let now = Utc::now();

    let stat = normalize::normalize_protocol_stat(&settings.name, &pools.protocol, now);
    if let Err(e) = db.postgres.insert_protocol_stat(&stat).await {
        error!("Failed to save protocol stats for {}: {:#}", settings.name, e);
        report.errors += 1;
    }

    // Tracked set is computed once per cycle, not per record
    let tracked = TrackedSet::new(
        db.postgres
            .get_tracked_addresses(settings.tracked_policy)
            .await?,
    );
    debug!("{} tracked addresses for {}", tracked.len(), settings.name);

    for raw in pools.pools.values() {
        let Some(pool) = normalize::normalize_pool(&settings.name, raw, now) else {
            warn!("Skipping pool with missing required fields: {}", raw);
            report.skipped += 1;
            continue;
        };

        if !tracked.admits_pool(settings.pool_gating, &pool.token0.address, &pool.token1.address) {
            report.skipped += 1;
            continue;
        }

        report.processed += 1;

        // History and latest are independent failure domains
        if let Err(e) = db.postgres.insert_pool_snapshot(&pool).await {
            error!("Failed to save pool snapshot for {}: {:#}", pool.address, e);
            report.errors += 1;
        }
        if let Err(e) = db.postgres.set_pool_latest(&pool).await {
            error!("Failed to upsert latest pool for {}: {:#}", pool.address, e);
            report.errors += 1;
        }
    }

    Ok(report)
}

/// Run one listing snapshot cycle: walk the top-N pages, bucket the
/// observation time, and batch-upsert the latest projections plus the
/// bucketed price points.
pub async fn run_listing_cycle(
    db: &Database,
    api: &ListingApi,
    settings: &ListingSettings,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    let records = api.fetch_top().await;
    if records.is_empty() {
        info!("{}: no listed tokens fetched", settings.name);
        return Ok(report);
    }

    let now = Utc::now();
    let bucket = bucket_timestamp(now, settings.bucket_secs);

    let (tokens, prices) = stage_listing_batch(&records, now, bucket, &mut report);

    if let Err(e) = db.postgres.set_listed_tokens(&tokens).await {
        error!(
            "Failed to upsert {} listed tokens for {}: {:#}",
            tokens.len(),
            settings.name,
            e
        );
        report.errors += 1;
    }
    if let Err(e) = db.postgres.set_listed_token_prices(&prices).await {
        error!(
            "Failed to upsert {} price points for {}: {:#}",
            prices.len(),
            settings.name,
            e
        );
        report.errors += 1;
    }

    info!(
        "{}: snapped {} listed tokens at bucket {}",
        settings.name,
        tokens.len(),
        bucket
    );

    Ok(report)
}

/// Normalize a walked listing batch into rows ready for the batch upserts,
/// counting skips as it goes.
///
/// Duplicate identities within the batch are dropped (first occurrence
/// wins: pages arrive in rank order), which both serializes per-identity
/// writes and keeps the multi-row upsert from touching one key twice.
fn stage_listing_batch(
    records: &[Value],
    now: DateTime<Utc>,
    bucket: DateTime<Utc>,
    report: &mut SyncReport,
) -> (Vec<ListedToken>, Vec<ListedTokenPrice>) {
    let mut tokens = Vec::with_capacity(records.len());
    let mut prices = Vec::with_capacity(records.len());
    let mut seen: FxHashSet<String> = FxHashSet::default();

    for raw in records {
        let Some((token, price)) = normalize::normalize_listed_token(raw, now, bucket) else {
            warn!("Skipping listed token with missing required fields: {}", raw);
            report.skipped += 1;
            continue;
        };

        if !seen.insert(token.token_address.clone()) {
            report.skipped += 1;
            continue;
        }

        report.processed += 1;
        tokens.push(token);
        prices.push(price);
    }

    (tokens, prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200, 0).unwrap()
    }

    #[test]
    fn test_clean_batch_counts_every_record() {
        let records: Vec<_> = (0..5)
            .map(|i| json!({ "tokenAddress": format!("0xt{}", i), "price": i as f64 }))
            .collect();

        let mut report = SyncReport::default();
        let (tokens, prices) = stage_listing_batch(&records, ts(), ts(), &mut report);

        assert_eq!(report.processed, 5);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.errors, 0);
        assert_eq!(tokens.len(), 5);
        assert_eq!(prices.len(), 5);
    }

    #[test]
    fn test_one_malformed_record_is_skipped_not_fatal() {
        let records = vec![
            json!({ "tokenAddress": "0xaaa", "price": 1.0 }),
            json!({ "ticker": "NOADDR" }),
            json!({ "tokenAddress": "0xbbb", "price": 3.0 }),
        ];

        let mut report = SyncReport::default();
        let (tokens, _) = stage_listing_batch(&records, ts(), ts(), &mut report);

        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(tokens.len(), 2);
    }

    // The storage batch upserts reject batches that touch one key twice,
    // so the walk-level dedup has to catch repeats across pages.
    #[test]
    fn test_batch_dedup_keeps_first_occurrence() {
        let records = vec![
            json!({ "tokenAddress": "0xAAA", "price": 1.0 }),
            json!({ "tokenAddress": "0xaaa", "price": 2.0 }),
            json!({ "tokenAddress": "0xbbb", "price": 3.0 }),
        ];

        let mut report = SyncReport::default();
        let (tokens, _) = stage_listing_batch(&records, ts(), ts(), &mut report);

        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(tokens[0].token_address, "0xaaa");
        assert_eq!(tokens[0].price, 1.0);
        assert_eq!(tokens[1].token_address, "0xbbb");
    }
}

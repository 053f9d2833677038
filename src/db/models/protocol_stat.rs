use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Protocol-wide aggregate totals observed at a point in time (append-only).
///
/// Keyed by the upstream `updated_at`, not the local write time, so the log
/// reflects when the remote data actually changed. Rows are never mutated
/// after insert; daily volume is derived by max-min per calendar day at
/// query time.
#[derive(Debug, Clone, Serialize)]
pub struct ProtocolStat {
    pub dex: String,
    pub total_tvl_usd: f64,
    pub total_volume_usd: f64,
    pub pool_count: i64,
    pub updated_at: DateTime<Utc>,
    pub inserted_at: DateTime<Utc>,
}

/// Day-over-day traded volume derived from the protocol stat log.
#[derive(Debug, Clone, Serialize)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub volume_usd: f64,
}

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Token from the launchpad listing feed (latest projection).
///
/// Primary Key: token_address (lowercase; partial unique index tolerates
/// legacy rows with an empty address).
///
/// The typed fields cover what the pipeline and the read side rely on;
/// everything else the upstream sends (socials, launch flags, bonding-curve
/// details, ...) is captured verbatim into the `extra` JSONB side-map so new
/// upstream fields survive a round-trip without schema changes.
#[derive(Debug, Clone, Serialize)]
pub struct ListedToken {
    pub token_address: String,
    pub deployer_address: Option<String>,
    pub ticker: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub total_supply: Option<f64>,
    pub image: Option<String>,
    pub decimals: Option<i32>,
    pub state: Option<String>,
    pub price: f64,
    pub market_cap: f64,
    /// Unrecognized upstream fields, stored as-is.
    pub extra: serde_json::Value,
    /// Timestamp carried by the upstream payload, if any.
    pub updated_at_remote: Option<DateTime<Utc>>,
    pub last_synced_at: DateTime<Utc>,
}

/// Time-bucketed price point for a listed token.
///
/// Identity: (token_address, bucket), unique at the storage layer, so
/// repeated polls inside one bucket overwrite in place instead of
/// accumulating near-duplicate rows.
#[derive(Debug, Clone, Serialize)]
pub struct ListedTokenPrice {
    pub token_address: String,
    pub bucket: DateTime<Utc>,
    pub price: f64,
    pub market_cap: f64,
    pub volume_1h: f64,
    pub volume_4h: f64,
    pub volume_12h: f64,
    pub volume_1d: f64,
    pub volume_3d: f64,
    pub volume_7d: f64,
    pub change_1h: f64,
    pub change_4h: f64,
    pub change_12h: f64,
    pub change_1d: f64,
    pub change_3d: f64,
    pub change_7d: f64,
}

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::sync::{PoolGating, TrackedPolicy};
use crate::utils::DEFAULT_BUCKET_SECS;

/// PostgreSQL database connection configuration.
///
/// All mirrored collections live here: token metadata, price history and
/// latest projections, pool snapshots, protocol stats, listing snapshots.
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

/// One DEX upstream to mirror (tokens + prices + pools + protocol stats).
///
/// The tokens and pools endpoints are point lookups returning a single JSON
/// document each; both are retried with backoff on transient failures.
#[derive(Debug, Deserialize, Clone)]
pub struct DexSettings {
    /// Source tag stored alongside pool and protocol rows.
    pub name: String,
    pub tokens_url: String,
    pub pools_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Which tokens are admitted into the tracked set (default: verified only).
    #[serde(default)]
    pub tracked_policy: TrackedPolicy,
    /// Which side(s) of a pool must be tracked for the pool to be persisted.
    #[serde(default)]
    pub pool_gating: PoolGating,
}

/// One paginated token-listing upstream to snapshot (top-N ranking feed).
#[derive(Debug, Deserialize, Clone)]
pub struct ListingSettings {
    pub name: String,
    pub search_url: String,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_view")]
    pub view: String,
    /// Page budget for one snapshot walk.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Hard cap on records collected per snapshot.
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,
    /// Width of the time bucket that keys price points, in seconds.
    #[serde(default = "default_bucket_secs")]
    pub bucket_secs: i64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

fn default_sort_by() -> String {
    "Market Cap (High to Low)".to_string()
}

fn default_view() -> String {
    "grid".to_string()
}

fn default_max_pages() -> u32 {
    8
}

fn default_result_cap() -> usize {
    100
}

fn default_bucket_secs() -> i64 {
    DEFAULT_BUCKET_SECS
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup, with `DAGSYNC_`-prefixed
/// environment variables layered on top (e.g. `DAGSYNC_POSTGRES__HOST`),
/// so deployments can toggle per-source `enabled` flags without touching
/// the file.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub dexes: Vec<DexSettings>,
    #[serde(default)]
    pub listings: Vec<ListingSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(Environment::with_prefix("DAGSYNC").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}

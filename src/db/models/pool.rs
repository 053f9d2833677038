use chrono::{DateTime, Utc};
use serde::Serialize;

/// Reference to one side of a pool, by token address.
///
/// A back-reference only: the token itself lives in the tokens collection
/// and is never owned by the pool row.
#[derive(Debug, Clone, Serialize)]
pub struct PoolTokenRef {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
}

/// Liquidity pool state as reported by a DEX upstream.
///
/// Identity: (dex, address). The same shape is dual-written to two
/// collections each sync cycle:
///   - `pool_snapshots`: append-only history, one row per cycle
///   - `pools_latest`: exactly one live row per identity, upserted
///
/// `updated_at` is the timestamp carried by the upstream payload;
/// `synced_at` is when this process observed it.
#[derive(Debug, Clone, Serialize)]
pub struct Pool {
    pub dex: String,
    pub address: String,
    pub token0: PoolTokenRef,
    pub token1: PoolTokenRef,

    // Token-denominated metrics (decimal-adjusted)
    pub token0_volume: f64,
    pub token1_volume: f64,
    pub token0_fees: f64,
    pub token1_fees: f64,
    pub token0_reserves: f64,
    pub token1_reserves: f64,

    // USD-denominated metrics
    pub tvl_usd: f64,
    pub volume_usd: f64,
    pub fees_usd: f64,

    // Yield
    pub apr: f64,
    pub has_active_farm: bool,
    pub farm_apr: f64,

    /// Whether the upstream considers its USD figures reliable.
    pub has_usd_values: bool,

    pub regular_fee_rate: Option<f64>,
    pub discounted_fee_rate: Option<f64>,

    pub updated_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// One observed USD price point for a token (append-only history).
///
/// A new row is inserted on every sync cycle that carries a price, even if
/// the value is unchanged. The history is never upserted.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPrice {
    pub token_address: String,
    pub symbol: String,
    pub name: String,
    pub logo_uri: String,
    pub price_usd: f64,
    pub ts: DateTime<Utc>,
}

/// Most recent USD price per token (latest projection).
///
/// Primary Key: token_address (lowercase)
/// Exactly one live row per token, maintained by upsert.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPriceLatest {
    pub token_address: String,
    pub symbol: String,
    pub name: String,
    pub logo_uri: String,
    pub price_usd: f64,
    pub verified: bool,
    pub rank: i64,
    pub decimals: i32,
    pub ts: DateTime<Utc>,
}

/// Per-day price aggregate derived from the history at query time.
#[derive(Debug, Clone, Serialize)]
pub struct DailyTokenPrice {
    pub date: NaiveDate,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub first_price: f64,
    pub last_price: f64,
    pub symbol: String,
    pub name: String,
    pub logo_uri: String,
}

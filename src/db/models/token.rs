use chrono::{DateTime, Utc};
use serde::Serialize;

/// Rank sentinel for tokens the upstream feed does not rank.
/// Large enough that unranked tokens sort after every ranked one.
pub const UNRANKED: i64 = 1_000_000_000;

/// DEX token metadata (latest projection, PostgreSQL).
///
/// Primary Key: address (lowercase)
/// Query Pattern: "List tracked tokens ordered by rank"
///
/// Rows are overwritten on every sync cycle the token appears in and are
/// never deleted by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
    pub logo_uri: String,
    pub verified: bool,
    pub rank: i64,
    pub updated_at: DateTime<Utc>,
}

impl Token {
    pub fn new(
        address: String,
        symbol: String,
        name: String,
        decimals: i32,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            // Always lowercase addresses for consistent comparisons
            address: address.to_lowercase(),
            symbol,
            name,
            decimals,
            logo_uri: String::new(),
            verified: false,
            rank: UNRANKED,
            updated_at,
        }
    }
}

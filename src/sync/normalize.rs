//! Per-record validation and coercion.
//!
//! Upstream records arrive as raw `serde_json::Value`s. Each normalizer
//! checks the required fields (identity plus the minimal typed set the
//! storage invariants need) and returns `None` when any is missing or of
//! the wrong shape; the caller logs the offending payload and moves on to
//! the next record. One malformed record never aborts a batch.
//!
//! Coercion rules:
//! - identity fields are lowercased
//! - optional numerics default to 0.0; non-finite values coerce to 0.0
//! - optional booleans default to false
//! - token-denominated amounts given as strings are treated as
//!   fixed-point-scaled integers and divided by `10^decimals`
//! - free-text fields are stripped of null bytes before they reach storage

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::db::models::{
    ListedToken, ListedTokenPrice, Pool, PoolTokenRef, ProtocolStat, Token, TokenPrice,
    TokenPriceLatest, UNRANKED,
};
use crate::utils::{finite_or_zero, str_to_f64_with_decimals};

/// A DEX token that passed validation, with its optional price.
///
/// A price of 0 is legitimate; only an absent (or uncoercible) price skips
/// the price writes.
#[derive(Debug, Clone)]
pub struct NormalizedToken {
    pub token: Token,
    pub price_usd: Option<f64>,
}

impl NormalizedToken {
    /// History row for the dual price write.
    pub fn price_row(&self, price_usd: f64, ts: DateTime<Utc>) -> TokenPrice {
        TokenPrice {
            token_address: self.token.address.clone(),
            symbol: self.token.symbol.clone(),
            name: self.token.name.clone(),
            logo_uri: self.token.logo_uri.clone(),
            price_usd,
            ts,
        }
    }

    /// Latest-projection row for the dual price write.
    pub fn price_latest_row(&self, price_usd: f64, ts: DateTime<Utc>) -> TokenPriceLatest {
        TokenPriceLatest {
            token_address: self.token.address.clone(),
            symbol: self.token.symbol.clone(),
            name: self.token.name.clone(),
            logo_uri: self.token.logo_uri.clone(),
            price_usd,
            verified: self.token.verified,
            rank: self.token.rank,
            decimals: self.token.decimals,
            ts,
        }
    }
}

/// Validate and coerce one raw DEX token record.
///
/// Required: address (string), decimals (number), name (string),
/// symbol (string).
pub fn normalize_token(raw: &Value, now: DateTime<Utc>) -> Option<NormalizedToken> {
    let address = required_address(raw, "address")?;
    let decimals = raw.get("decimals").and_then(Value::as_i64)? as i32;
    let name = sanitize_text(raw.get("name").and_then(Value::as_str)?);
    let symbol = sanitize_text(raw.get("symbol").and_then(Value::as_str)?);

    // Price may legitimately be 0; only absent/null/uncoercible skips it
    let price_usd = match raw.get("price") {
        None | Some(Value::Null) => None,
        Some(value) => coerce_f64(value).map(finite_or_zero),
    };

    let rank = raw.get("rank").and_then(Value::as_i64).unwrap_or(UNRANKED);
    let verified = raw.get("verified").and_then(Value::as_bool).unwrap_or(false);
    let logo_uri = raw
        .get("logoURI")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    Some(NormalizedToken {
        token: Token {
            address,
            symbol,
            name,
            decimals,
            logo_uri,
            verified,
            rank,
            updated_at: now,
        },
        price_usd,
    })
}

/// Coerce the protocol section of the pools payload. Infallible: every
/// field has a safe default, and a missing upstream timestamp falls back
/// to the observation time.
pub fn normalize_protocol_stat(dex: &str, raw: &Value, now: DateTime<Utc>) -> ProtocolStat {
    ProtocolStat {
        dex: dex.to_string(),
        total_tvl_usd: num_or_zero(raw, "totalTVL"),
        total_volume_usd: num_or_zero(raw, "totalVolumeUSD"),
        pool_count: raw
            .get("poolCount")
            .and_then(coerce_f64)
            .map(|v| finite_or_zero(v) as i64)
            .unwrap_or(0),
        updated_at: raw
            .get("updatedAt")
            .and_then(coerce_datetime)
            .unwrap_or(now),
        inserted_at: now,
    }
}

/// Validate and coerce one raw pool record.
///
/// Required: pool address and both side addresses; the gating invariant
/// needs the sides, the upsert needs the identity.
pub fn normalize_pool(dex: &str, raw: &Value, now: DateTime<Utc>) -> Option<Pool> {
    let address = required_address(raw, "address")?;
    let token0 = token_ref(raw.get("token0")?)?;
    let token1 = token_ref(raw.get("token1")?)?;

    let token0_reserves = scaled_amount(raw, "token0Reserves", token0.decimals);
    let token1_reserves = scaled_amount(raw, "token1Reserves", token1.decimals);
    let token0_volume = scaled_amount(raw, "token0Volume", token0.decimals);
    let token1_volume = scaled_amount(raw, "token1Volume", token1.decimals);
    let token0_fees = scaled_amount(raw, "token0Fees", token0.decimals);
    let token1_fees = scaled_amount(raw, "token1Fees", token1.decimals);

    Some(Pool {
        dex: dex.to_string(),
        address,
        token0,
        token1,
        token0_volume,
        token1_volume,
        token0_fees,
        token1_fees,
        token0_reserves,
        token1_reserves,
        tvl_usd: num_or_zero(raw, "tvl"),
        volume_usd: num_or_zero(raw, "volumeUSD"),
        fees_usd: num_or_zero(raw, "feesUSD"),
        apr: num_or_zero(raw, "apr"),
        has_active_farm: raw
            .get("hasActiveFarm")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        farm_apr: num_or_zero(raw, "farmApr"),
        has_usd_values: raw
            .get("hasUSDValues")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        regular_fee_rate: raw.get("regularFeeRate").and_then(coerce_f64),
        discounted_fee_rate: raw.get("discountedFeeRate").and_then(coerce_f64),
        updated_at: raw
            .get("updatedAt")
            .and_then(coerce_datetime)
            .unwrap_or(now),
        synced_at: now,
    })
}

/// Upstream keys of the listing feed that map to typed columns; everything
/// else lands in the JSONB side-map.
const KNOWN_LISTED_FIELDS: &[&str] = &[
    "tokenAddress",
    "deployerAddress",
    "ticker",
    "name",
    "description",
    "totalSupply",
    "image",
    "decimals",
    "state",
    "price",
    "marketCap",
    "volume",
    "priceChange",
    "updatedAt",
];

/// Validate and coerce one raw listing record into the latest-projection
/// row plus its bucketed price point.
///
/// Required: tokenAddress (non-empty string).
pub fn normalize_listed_token(
    raw: &Value,
    now: DateTime<Utc>,
    bucket: DateTime<Utc>,
) -> Option<(ListedToken, ListedTokenPrice)> {
    let token_address = required_address(raw, "tokenAddress")?;

    let volume = raw.get("volume");
    let change = raw.get("priceChange");

    let price = ListedTokenPrice {
        token_address: token_address.clone(),
        bucket,
        price: num_or_zero(raw, "price"),
        market_cap: num_or_zero(raw, "marketCap"),
        volume_1h: window_or_zero(volume, "1h"),
        volume_4h: window_or_zero(volume, "4h"),
        volume_12h: window_or_zero(volume, "12h"),
        volume_1d: window_or_zero(volume, "1d"),
        volume_3d: window_or_zero(volume, "3d"),
        volume_7d: window_or_zero(volume, "7d"),
        change_1h: window_or_zero(change, "1h"),
        change_4h: window_or_zero(change, "4h"),
        change_12h: window_or_zero(change, "12h"),
        change_1d: window_or_zero(change, "1d"),
        change_3d: window_or_zero(change, "3d"),
        change_7d: window_or_zero(change, "7d"),
    };

    let extra: serde_json::Map<String, Value> = raw
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(key, _)| !KNOWN_LISTED_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let token = ListedToken {
        token_address,
        deployer_address: raw
            .get("deployerAddress")
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase()),
        ticker: text_field(raw, "ticker"),
        name: text_field(raw, "name"),
        description: text_field(raw, "description"),
        total_supply: raw.get("totalSupply").and_then(coerce_f64),
        image: text_field(raw, "image"),
        decimals: raw.get("decimals").and_then(Value::as_i64).map(|d| d as i32),
        state: text_field(raw, "state"),
        price: price.price,
        market_cap: price.market_cap,
        extra: Value::Object(extra),
        updated_at_remote: raw.get("updatedAt").and_then(coerce_datetime),
        last_synced_at: now,
    };

    Some((token, price))
}

// ==================== COERCION HELPERS ====================

/// Required identity field: a non-empty string, lowercased.
fn required_address(raw: &Value, key: &str) -> Option<String> {
    let address = raw.get(key)?.as_str()?.to_lowercase();
    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}

/// Side reference of a pool. The address is required; display metadata
/// defaults like any other optional field.
fn token_ref(raw: &Value) -> Option<PoolTokenRef> {
    let address = required_address(raw, "address")?;
    Some(PoolTokenRef {
        address,
        symbol: raw
            .get("symbol")
            .and_then(Value::as_str)
            .map(sanitize_text)
            .unwrap_or_default(),
        name: raw
            .get("name")
            .and_then(Value::as_str)
            .map(sanitize_text)
            .unwrap_or_default(),
        decimals: raw.get("decimals").and_then(Value::as_i64).unwrap_or(0) as i32,
    })
}

/// Accept a JSON number or a numeric string.
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn num_or_zero(raw: &Value, key: &str) -> f64 {
    raw.get(key)
        .and_then(coerce_f64)
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Lookback-window value out of an aggregate object like
/// `{"1h": ..., "4h": ...}`.
fn window_or_zero(aggregate: Option<&Value>, window: &str) -> f64 {
    aggregate
        .and_then(|v| v.get(window))
        .and_then(coerce_f64)
        .map(finite_or_zero)
        .unwrap_or(0.0)
}

/// Token-denominated amount. Strings carry fixed-point-scaled integers and
/// are divided by `10^decimals`; plain numbers are already decimal.
fn scaled_amount(raw: &Value, key: &str, decimals: i32) -> f64 {
    match raw.get(key) {
        Some(Value::String(s)) => {
            str_to_f64_with_decimals(s, decimals.clamp(0, u8::MAX as i32) as u8).unwrap_or(0.0)
        },
        Some(Value::Number(n)) => finite_or_zero(n.as_f64().unwrap_or(0.0)),
        _ => 0.0,
    }
}

/// Upstream timestamps arrive as RFC 3339 strings or epoch milliseconds.
fn coerce_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn text_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(sanitize_text)
}

/// Strip null bytes, which are invalid in Postgres text columns.
fn sanitize_text(s: &str) -> String {
    s.replace('\0', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_067_200, 0).unwrap()
    }

    #[test]
    fn test_token_requires_identity() {
        let raw = json!({ "decimals": 18, "name": "Wrapped KAS", "symbol": "WKAS" });
        assert!(normalize_token(&raw, now()).is_none());
    }

    #[test]
    fn test_token_requires_typed_decimals() {
        let raw = json!({
            "address": "0xAbC", "decimals": "18", "name": "Wrapped KAS", "symbol": "WKAS"
        });
        assert!(normalize_token(&raw, now()).is_none());
    }

    #[test]
    fn test_token_identity_lowercased_and_defaults_applied() {
        let raw = json!({
            "address": "0xAbCdEf", "decimals": 18, "name": "Wrapped KAS", "symbol": "WKAS"
        });
        let normalized = normalize_token(&raw, now()).unwrap();
        assert_eq!(normalized.token.address, "0xabcdef");
        assert_eq!(normalized.token.rank, UNRANKED);
        assert!(!normalized.token.verified);
        assert_eq!(normalized.token.logo_uri, "");
        assert_eq!(normalized.price_usd, None);
    }

    #[test]
    fn test_token_price_zero_is_preserved() {
        let raw = json!({
            "address": "0xabc", "decimals": 18, "name": "T", "symbol": "T",
            "price": 0.0, "verified": true, "rank": 3
        });
        let normalized = normalize_token(&raw, now()).unwrap();
        assert_eq!(normalized.price_usd, Some(0.0));
        assert!(normalized.token.verified);
        assert_eq!(normalized.token.rank, 3);
    }

    #[test]
    fn test_one_malformed_record_never_poisons_the_batch() {
        let batch = vec![
            json!({ "address": "0xa1", "decimals": 6, "name": "A", "symbol": "A" }),
            json!({ "decimals": 6, "name": "broken", "symbol": "B" }),
            json!({ "address": "0xa3", "decimals": 6, "name": "C", "symbol": "C" }),
        ];
        let survivors: Vec<_> = batch
            .iter()
            .filter_map(|raw| normalize_token(raw, now()))
            .collect();
        assert_eq!(survivors.len(), batch.len() - 1);
    }

    #[test]
    fn test_pool_requires_both_side_addresses() {
        let raw = json!({
            "address": "0xpool",
            "token0": { "address": "0xa", "decimals": 18 },
            "token1": { "symbol": "ORPHAN" }
        });
        assert!(normalize_pool("zealous", &raw, now()).is_none());
    }

    #[test]
    fn test_pool_string_reserves_are_descaled() {
        let raw = json!({
            "address": "0xPool",
            "token0": { "address": "0xA", "symbol": "A", "name": "A", "decimals": 18 },
            "token1": { "address": "0xB", "symbol": "B", "name": "B", "decimals": 6 },
            "token0Reserves": "2500000000000000000",
            "token1Reserves": "7000000",
            "tvl": 1234.5,
            "hasUSDValues": true,
            "updatedAt": "2023-12-31T22:30:00Z"
        });
        let pool = normalize_pool("zealous", &raw, now()).unwrap();
        assert_eq!(pool.address, "0xpool");
        assert_eq!(pool.token0.address, "0xa");
        assert_eq!(pool.token0_reserves, 2.5);
        assert_eq!(pool.token1_reserves, 7.0);
        assert_eq!(pool.tvl_usd, 1234.5);
        assert!(pool.has_usd_values);
        assert_eq!(pool.volume_usd, 0.0);
        // Upstream timestamp, not the local observation time
        assert_eq!(
            pool.updated_at,
            DateTime::from_timestamp(1_704_061_800, 0).unwrap()
        );
        assert_eq!(pool.synced_at, now());
    }

    #[test]
    fn test_pool_numeric_amounts_pass_through() {
        let raw = json!({
            "address": "0xpool",
            "token0": { "address": "0xa", "decimals": 18 },
            "token1": { "address": "0xb", "decimals": 6 },
            "token0Reserves": 12.5
        });
        let pool = normalize_pool("zealous", &raw, now()).unwrap();
        assert_eq!(pool.token0_reserves, 12.5);
    }

    #[test]
    fn test_protocol_stat_defaults() {
        let stat = normalize_protocol_stat("zealous", &json!({}), now());
        assert_eq!(stat.total_tvl_usd, 0.0);
        assert_eq!(stat.pool_count, 0);
        assert_eq!(stat.updated_at, now());
    }

    #[test]
    fn test_protocol_stat_takes_upstream_timestamp() {
        let raw = json!({
            "totalTVL": 100.0, "totalVolumeUSD": 200.0, "poolCount": 7,
            "updatedAt": "2023-06-01T12:00:00Z"
        });
        let stat = normalize_protocol_stat("zealous", &raw, now());
        assert_eq!(stat.pool_count, 7);
        assert_ne!(stat.updated_at, stat.inserted_at);
    }

    #[test]
    fn test_listed_token_requires_identity() {
        assert!(normalize_listed_token(&json!({ "ticker": "X" }), now(), now()).is_none());
        assert!(normalize_listed_token(&json!({ "tokenAddress": "" }), now(), now()).is_none());
    }

    #[test]
    fn test_listed_token_windows_and_side_map() {
        let raw = json!({
            "tokenAddress": "0xToken",
            "deployerAddress": "0xDEPLOYER",
            "ticker": "TOK",
            "price": 0.5,
            "marketCap": 1000.0,
            "volume": { "1h": 1.0, "1d": "24.5" },
            "priceChange": { "7d": -3.5 },
            "socials": { "x": "tok" },
            "isHypedLaunch": true
        });
        let (token, price) = normalize_listed_token(&raw, now(), now()).unwrap();

        assert_eq!(token.token_address, "0xtoken");
        assert_eq!(token.deployer_address.as_deref(), Some("0xdeployer"));
        assert_eq!(price.volume_1h, 1.0);
        assert_eq!(price.volume_1d, 24.5);
        assert_eq!(price.volume_7d, 0.0);
        assert_eq!(price.change_7d, -3.5);

        // Unrecognized upstream fields survive in the side-map; typed ones don't
        let extra = token.extra.as_object().unwrap();
        assert!(extra.contains_key("socials"));
        assert!(extra.contains_key("isHypedLaunch"));
        assert!(!extra.contains_key("ticker"));
        assert!(!extra.contains_key("price"));
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let raw = json!({ "tokenAddress": "0xt", "updatedAt": 1_704_067_200_000_i64 });
        let (token, _) = normalize_listed_token(&raw, now(), now()).unwrap();
        assert_eq!(token.updated_at_remote, Some(now()));
    }
}

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use crate::config::DexSettings;
use crate::sources::http::{build_client, get_json_with_retry};

/// Response envelope of the DEX tokens endpoint.
///
/// Individual records stay untyped; a single malformed token must not
/// poison the whole payload, so validation happens per record in the
/// normalizer.
#[derive(Debug, Deserialize)]
pub struct TokensResponse {
    pub tokens: Vec<Value>,
}

/// Response envelope of the DEX pools endpoint.
///
/// `pools` is keyed by an upstream pool label; only the values matter here.
/// A missing `protocol` or `pools` field fails deserialization, which the
/// caller treats as a malformed response (cycle-level error).
#[derive(Debug, Deserialize)]
pub struct PoolsResponse {
    pub protocol: Value,
    pub pools: serde_json::Map<String, Value>,
}

/// Point-lookup adapter for one DEX upstream.
#[derive(Clone)]
pub struct DexApi {
    client: reqwest::Client,
    tokens_url: String,
    pools_url: String,
}

impl DexApi {
    pub fn new(settings: &DexSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.request_timeout_secs)?,
            tokens_url: settings.tokens_url.clone(),
            pools_url: settings.pools_url.clone(),
        })
    }

    /// Fetch the current token list (with latest prices) from the upstream.
    pub async fn fetch_tokens(&self) -> Result<TokensResponse> {
        get_json_with_retry(&self.client, &self.tokens_url).await
    }

    /// Fetch the current pool and protocol information from the upstream.
    pub async fn fetch_pools(&self) -> Result<PoolsResponse> {
        get_json_with_retry(&self.client, &self.pools_url).await
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// User-Agent sent with every upstream request.
const USER_AGENT: &str = "DagsyncBot/1.0";

/// Maximum retries for point lookups
const MAX_RETRIES: u32 = 3;

/// Delay between retries (exponential backoff base)
const RETRY_DELAY_MS: u64 = 500;

/// Build the shared HTTP client with a bounded per-request timeout.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// GET a JSON document. A non-2xx status is an error.
pub async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?
        .error_for_status()
        .with_context(|| format!("non-success status from {}", url))?;

    response
        .json::<T>()
        .await
        .with_context(|| format!("invalid JSON body from {}", url))
}

/// GET a JSON document, retrying transient failures with exponential
/// backoff.
///
/// Point lookups only. Paginated listing fetches are never retried: the
/// page loop stops and keeps what it has.
pub async fn get_json_with_retry<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let mut last_err = None;

    for attempt in 0..MAX_RETRIES {
        match get_json(client, url).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    "GET {} failed (attempt {}/{}): {:#}",
                    url,
                    attempt + 1,
                    MAX_RETRIES,
                    e
                );
                last_err = Some(e);
                if attempt < MAX_RETRIES - 1 {
                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(attempt));
                    tokio::time::sleep(delay).await;
                }
            },
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("GET {} failed", url)))
}

use std::future::Future;

use anyhow::Result;
use log::warn;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::config::ListingSettings;
use crate::sources::http::{build_client, get_json};

/// One page of the paginated listing endpoint.
#[derive(Debug, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub result: Vec<Value>,
    #[serde(default, rename = "hasMore")]
    pub has_more: bool,
}

/// Adapter for a paginated token-listing upstream.
#[derive(Clone)]
pub struct ListingApi {
    client: reqwest::Client,
    settings: ListingSettings,
}

impl ListingApi {
    pub fn new(settings: &ListingSettings) -> Result<Self> {
        Ok(Self {
            client: build_client(settings.request_timeout_secs)?,
            settings: settings.clone(),
        })
    }

    /// Fetch a single listing page. Not retried.
    pub async fn fetch_page(&self, page: u32) -> Result<ListingPage> {
        let mut url = Url::parse(&self.settings.search_url)?;
        url.query_pairs_mut()
            .append_pair("sortBy", &self.settings.sort_by)
            .append_pair("view", &self.settings.view)
            .append_pair("page", &page.to_string());

        get_json(&self.client, url.as_str()).await
    }

    /// Walk listing pages until the result cap is reached, the upstream
    /// reports no more pages, a page fails, or the page budget runs out.
    pub async fn fetch_top(&self) -> Vec<Value> {
        collect_pages(
            |page| self.fetch_page(page),
            self.settings.max_pages,
            self.settings.result_cap,
        )
        .await
    }
}

/// Page-walk loop shared by [`ListingApi::fetch_top`].
///
/// Never fails: a page error ends the walk and whatever was accumulated so
/// far is returned. Favors having a (possibly short) snapshot over having
/// none.
pub async fn collect_pages<F, Fut>(mut fetch_page: F, max_pages: u32, cap: usize) -> Vec<Value>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<ListingPage>>,
{
    let mut out = Vec::new();

    for page in 1..=max_pages {
        match fetch_page(page).await {
            Ok(listing) => {
                for record in listing.result {
                    out.push(record);
                    if out.len() >= cap {
                        break;
                    }
                }
                if out.len() >= cap || !listing.has_more {
                    break;
                }
            },
            Err(e) => {
                warn!("listing page {} fetch failed: {:#}", page, e);
                break;
            },
        }
    }

    out.truncate(cap);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(records: usize, has_more: bool) -> ListingPage {
        ListingPage {
            result: (0..records).map(|i| json!({ "i": i })).collect(),
            has_more,
        }
    }

    #[tokio::test]
    async fn test_walks_until_has_more_is_false() {
        let records = collect_pages(
            |p| async move {
                match p {
                    1 => Ok(page(3, true)),
                    2 => Ok(page(2, false)),
                    _ => panic!("walk should stop after page 2"),
                }
            },
            8,
            100,
        )
        .await;
        assert_eq!(records.len(), 5);
    }

    #[tokio::test]
    async fn test_cap_stops_mid_page() {
        let records = collect_pages(|_| async { Ok(page(40, true)) }, 8, 100).await;
        assert_eq!(records.len(), 100);
    }

    #[tokio::test]
    async fn test_page_failure_returns_partial_results() {
        let records = collect_pages(
            |p| async move {
                match p {
                    1 => Ok(page(25, true)),
                    _ => Err(anyhow::anyhow!("HTTP 502")),
                }
            },
            8,
            100,
        )
        .await;
        assert_eq!(records.len(), 25);
    }

    #[tokio::test]
    async fn test_page_budget_exhausted() {
        let records = collect_pages(|_| async { Ok(page(1, true)) }, 3, 100).await;
        assert_eq!(records.len(), 3);
    }
}

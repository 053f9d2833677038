//! Upstream HTTP API adapters.
//!
//! Two kinds of upstream feed the mirror:
//!
//! - `dex` - DEX public endpoints (tokens, pools): single-document point
//!   lookups, retried with backoff on transient failures
//! - `listing` - paginated launchpad listing feed: walked page by page,
//!   never retried; a failed page ends the walk with partial results
//!
//! All payloads are treated as untrusted: records come back as raw
//! `serde_json::Value`s and are validated per-record by the normalizer.

mod dex;
mod http;
mod listing;

pub use dex::{DexApi, PoolsResponse, TokensResponse};
pub use http::{build_client, get_json, get_json_with_retry};
pub use listing::{collect_pages, ListingApi, ListingPage};

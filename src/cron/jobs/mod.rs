pub mod dex_sync;
pub mod listing_sync;

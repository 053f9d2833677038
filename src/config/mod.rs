mod config;

pub use config::{DexSettings, ListingSettings, PostgresSettings, Settings};

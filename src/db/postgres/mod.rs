mod client;
mod ops;

pub use client::PostgresClient;
pub use ops::{PoolSortField, SortOrder};

use std::sync::Arc;

use crate::config::Settings;

pub mod models;
pub mod postgres;

pub use postgres::PostgresClient;

/// Database handle shared by the sync pipeline and the read-side queries.
///
/// The sync pipeline is write-mostly and the read side is read-only, so the
/// only coordination needed is the storage layer's native upsert atomicity.
#[derive(Clone)]
pub struct Database {
    pub postgres: Arc<PostgresClient>,
}

impl Database {
    pub async fn new(settings: Arc<Settings>) -> anyhow::Result<Self> {
        let postgres = PostgresClient::new(settings.postgres.clone()).await?;

        // Apply schema before anything reads or writes
        postgres.migrate().await?;

        Ok(Self {
            postgres: Arc::new(postgres),
        })
    }
}

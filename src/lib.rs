pub mod config;
pub mod cron;
pub mod db;
pub mod sources;
pub mod sync;
pub mod utils;

pub use config::Settings;
pub use cron::CronScheduler;
pub use db::Database;
pub use sync::SyncReport;

//! The ingestion pipeline: per-record normalization, tracked-set gating,
//! and the dual-write sync cycles.

pub mod normalize;
pub mod pipeline;
pub mod tracked;

pub use pipeline::{run_dex_cycle, run_listing_cycle};
pub use tracked::{PoolGating, TrackedPolicy, TrackedSet};

use std::fmt;

/// Outcome counters for one sync cycle.
///
/// `processed` counts records handed to the persister, `skipped` counts
/// records dropped before persistence (malformed, filtered by policy, or
/// duplicate identity within the batch), `errors` counts individual
/// storage writes that failed. None of the three ever aborts a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} skipped, {} errors",
            self.processed, self.skipped, self.errors
        )
    }
}

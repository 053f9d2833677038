//! Tracked-set filtering.
//!
//! Pools reference tokens on both sides; only pools touching the tracked
//! working set are persisted, which bounds the size of the derived
//! collections. The set is computed once per sync cycle so gating is an
//! O(1) membership check per record.

use rustc_hash::FxHashSet;
use serde::Deserialize;

/// Which tokens are admitted into the persisted working set.
///
/// A configuration value rather than a hardcoded condition, so the
/// admission policy can change without touching the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedPolicy {
    /// Only tokens the upstream marks as verified (default).
    #[default]
    Verified,
    /// Every token the upstream lists.
    All,
}

impl TrackedPolicy {
    pub fn admits(self, verified: bool) -> bool {
        match self {
            Self::Verified => verified,
            Self::All => true,
        }
    }
}

/// Which side(s) of a pool must reference a tracked token for the pool to
/// be persisted. Default: at least one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolGating {
    #[default]
    Either,
    Token0,
    Token1,
    Both,
}

/// Set of currently-tracked token addresses (lowercase).
#[derive(Debug, Default)]
pub struct TrackedSet {
    addresses: FxHashSet<String>,
}

impl TrackedSet {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses: addresses.into_iter().map(|a| a.to_lowercase()).collect(),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(&address.to_lowercase())
    }

    /// Whether a pool with the given side addresses passes the gate.
    pub fn admits_pool(&self, gating: PoolGating, token0: &str, token1: &str) -> bool {
        let t0 = self.contains(token0);
        let t1 = self.contains(token1);
        match gating {
            PoolGating::Either => t0 || t1,
            PoolGating::Token0 => t0,
            PoolGating::Token1 => t1,
            PoolGating::Both => t0 && t1,
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> TrackedSet {
        TrackedSet::new(vec!["0xAAA".to_string(), "0xbbb".to_string()])
    }

    #[test]
    fn test_membership_is_case_insensitive() {
        let tracked = set();
        assert!(tracked.contains("0xaaa"));
        assert!(tracked.contains("0xAAA"));
        assert!(!tracked.contains("0xccc"));
    }

    #[test]
    fn test_either_side_gating() {
        let tracked = set();
        assert!(tracked.admits_pool(PoolGating::Either, "0xaaa", "0xzzz"));
        assert!(tracked.admits_pool(PoolGating::Either, "0xzzz", "0xbbb"));
        assert!(!tracked.admits_pool(PoolGating::Either, "0xyyy", "0xzzz"));
    }

    #[test]
    fn test_specific_side_gating() {
        let tracked = set();
        assert!(tracked.admits_pool(PoolGating::Token0, "0xaaa", "0xzzz"));
        assert!(!tracked.admits_pool(PoolGating::Token0, "0xzzz", "0xbbb"));
        assert!(tracked.admits_pool(PoolGating::Token1, "0xzzz", "0xbbb"));
        assert!(!tracked.admits_pool(PoolGating::Token1, "0xaaa", "0xzzz"));
    }

    #[test]
    fn test_both_sides_gating() {
        let tracked = set();
        assert!(tracked.admits_pool(PoolGating::Both, "0xaaa", "0xbbb"));
        assert!(!tracked.admits_pool(PoolGating::Both, "0xaaa", "0xzzz"));
    }

    #[test]
    fn test_policy_admission() {
        assert!(TrackedPolicy::Verified.admits(true));
        assert!(!TrackedPolicy::Verified.admits(false));
        assert!(TrackedPolicy::All.admits(false));
    }

    #[test]
    fn test_empty_set_admits_nothing() {
        let tracked = TrackedSet::new(vec![]);
        assert!(tracked.is_empty());
        assert!(!tracked.admits_pool(PoolGating::Either, "0xaaa", "0xbbb"));
    }
}

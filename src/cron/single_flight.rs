//! Single-flight guard for scheduled sync cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Explicit Idle/Running state for one scheduled job.
///
/// A tick attempts the Idle → Running transition atomically; if a previous
/// cycle is still in flight the attempt fails and the tick is a no-op, so
/// at most one cycle per job runs at any time regardless of how long a
/// cycle takes relative to the interval. The guard returns the state to
/// Idle when dropped, on success and failure alike.
#[derive(Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt the Idle → Running transition.
    ///
    /// Returns `None` when a cycle is already in flight.
    pub fn try_begin(&self) -> Option<FlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| FlightGuard {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// RAII token for a running cycle; dropping it transitions back to Idle.
pub struct FlightGuard {
    running: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_begin_is_a_noop_while_running() {
        let flight = SingleFlight::new();

        let guard = flight.try_begin();
        assert!(guard.is_some());
        assert!(flight.is_running());

        // Tick fires while the previous cycle is still pending
        assert!(flight.try_begin().is_none());
    }

    #[test]
    fn test_guard_drop_returns_to_idle() {
        let flight = SingleFlight::new();

        drop(flight.try_begin().unwrap());
        assert!(!flight.is_running());
        assert!(flight.try_begin().is_some());
    }

    #[test]
    fn test_exactly_one_of_many_attempts_wins() {
        let flight = SingleFlight::new();
        // Guards must stay alive while counting, or each drop re-opens the slot
        let guards: Vec<_> = (0..10).filter_map(|_| flight.try_begin()).collect();
        assert_eq!(guards.len(), 1);
    }
}

//! Wait/wakeup coordinator.
//!
//! Maintains `resource_waiters[name][tid]`, signaling every waiter on a resource when it
//! is released. Cleanup is clear-on-acquire: `signal` never removes waiter entries, only
//! `clear_waiter` (called by the engine once a retried acquisition actually succeeds) and
//! `purge` (called on abort) do.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::common::{ObjectName, TransactionId};

#[derive(Default)]
struct WaiterState {
    /// resource name -> set of waiting transaction ids.
    resource_waiters: HashMap<ObjectName, Vec<TransactionId>>,
    /// resource name -> generation counter, bumped on every `signal`.
    generations: HashMap<ObjectName, u64>,
}

/// Coordinates blocked transactions with the release events that wake them.
pub struct WaitCoordinator {
    state: Mutex<WaiterState>,
    condvar: Condvar,
}

impl WaitCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WaiterState::default()),
            condvar: Condvar::new(),
        }
    }

    /// Registers `id` as waiting on `name`, allocating a fresh notification handle
    /// (the resource's current generation) if the transaction is not already registered.
    /// Returns the generation the caller should compare against when it later blocks.
    pub fn register_waiting_transaction(&self, id: TransactionId, name: &str) -> u64 {
        let mut state = self.state.lock();
        let waiters = state.resource_waiters.entry(name.to_string()).or_default();
        if !waiters.contains(&id) {
            waiters.push(id);
        }
        *state.generations.get(name).unwrap_or(&0)
    }

    /// Signals every waiter on `name`: bumps the generation and wakes blocked callers.
    /// Entries are **not** removed here.
    pub fn signal_waiters(&self, name: &str) {
        let mut state = self.state.lock();
        *state.generations.entry(name.to_string()).or_insert(0) += 1;
        debug!(object = name, "signaled waiters");
        self.condvar.notify_all();
    }

    /// Removes `id` from `name`'s waiter set once it has successfully reacquired the lock.
    pub fn clear_waiter(&self, id: TransactionId, name: &str) {
        let mut state = self.state.lock();
        if let Some(waiters) = state.resource_waiters.get_mut(name) {
            waiters.retain(|w| *w != id);
            if waiters.is_empty() {
                state.resource_waiters.remove(name);
            }
        }
    }

    /// Purges every waiter entry for `id`, across all resources, on abort.
    pub fn purge(&self, id: TransactionId) {
        let mut state = self.state.lock();
        state.resource_waiters.retain(|_, waiters| {
            waiters.retain(|w| *w != id);
            !waiters.is_empty()
        });
    }

    pub fn is_waiting(&self, id: TransactionId, name: &str) -> bool {
        self.state
            .lock()
            .resource_waiters
            .get(name)
            .map(|w| w.contains(&id))
            .unwrap_or(false)
    }

    pub fn waiter_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .resource_waiters
            .get(name)
            .map(|w| w.len())
            .unwrap_or(0)
    }

    /// Blocks the calling thread until `name`'s generation advances past `since_generation`
    /// or `timeout` elapses. Blocking is the caller's responsibility; the decision core
    /// itself never calls this.
    pub fn wait_for_signal(&self, name: &str, since_generation: u64, timeout: Duration) -> bool {
        let mut state = self.state.lock();
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let current = *state.generations.get(name).unwrap_or(&0);
            if current != since_generation {
                return true;
            }
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let result = self.condvar.wait_for(&mut state, remaining);
            if result.timed_out() {
                return false;
            }
        }
    }
}

impl Default for WaitCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_signal_does_not_remove_entry() {
        let wc = WaitCoordinator::new();
        wc.register_waiting_transaction(1, "X");
        assert!(wc.is_waiting(1, "X"));
        wc.signal_waiters("X");
        assert!(wc.is_waiting(1, "X"), "clear-on-acquire: signal must not delete");
    }

    #[test]
    fn clear_waiter_removes_entry() {
        let wc = WaitCoordinator::new();
        wc.register_waiting_transaction(1, "X");
        wc.clear_waiter(1, "X");
        assert!(!wc.is_waiting(1, "X"));
    }

    #[test]
    fn purge_removes_across_all_resources() {
        let wc = WaitCoordinator::new();
        wc.register_waiting_transaction(1, "X");
        wc.register_waiting_transaction(1, "Y");
        wc.purge(1);
        assert!(!wc.is_waiting(1, "X"));
        assert!(!wc.is_waiting(1, "Y"));
    }

    #[test]
    fn multiple_waiters_on_same_resource() {
        let wc = WaitCoordinator::new();
        wc.register_waiting_transaction(1, "X");
        wc.register_waiting_transaction(2, "X");
        assert_eq!(wc.waiter_count("X"), 2);
    }

    #[test]
    fn wait_for_signal_times_out_without_signal() {
        let wc = WaitCoordinator::new();
        let woke = wc.wait_for_signal("X", 0, Duration::from_millis(20));
        assert!(!woke);
    }
}

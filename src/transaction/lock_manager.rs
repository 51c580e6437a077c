//! S2PL lock tables and the acquisition-rules decision function.
//!
//! This type is a pure decision surface: it owns `shared_locks`/`exclusive_locks` and
//! decides what a `query(id, action, object)` call is entitled to, mutating the tables
//! only on a `Granted`/`Upgraded` outcome. Conflict resolution (wait-die vs cycle
//! detection) and wait-queue bookkeeping live one level up, in `lock_engine`/`deadlock`/
//! `waiters`.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{ObjectName, TransactionId};
use crate::transaction::types::Action;

/// Outcome of a single acquisition attempt against the lock tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// No-op grant: the lock is already held in a sufficient mode, or freshly granted.
    Granted,
    /// Sole shared holder was upgraded in place to exclusive.
    Upgraded,
    /// The object is held in an incompatible mode by the given holders; the caller must
    /// resolve this through the configured deadlock policy.
    Conflict(Vec<TransactionId>),
}

#[derive(Default)]
pub struct LockManager {
    shared_locks: RwLock<HashMap<ObjectName, HashSet<TransactionId>>>,
    exclusive_locks: RwLock<HashMap<ObjectName, TransactionId>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to satisfy `query(id, action, object)` against the current lock tables.
    /// Mutates the tables in place on `Granted`/`Upgraded`; leaves them untouched on
    /// `Conflict`.
    pub fn try_acquire(
        &self,
        id: TransactionId,
        action: Action,
        object: &str,
    ) -> AcquireOutcome {
        match action {
            Action::Read => self.try_acquire_read(id, object),
            Action::Write => self.try_acquire_write(id, object),
        }
    }

    fn try_acquire_read(&self, id: TransactionId, object: &str) -> AcquireOutcome {
        if let Some(holder) = self.exclusive_locks.read().get(object).copied() {
            return if holder == id {
                AcquireOutcome::Granted
            } else {
                AcquireOutcome::Conflict(vec![holder])
            };
        }

        let mut shared = self.shared_locks.write();
        shared.entry(object.to_string()).or_default().insert(id);
        debug!(transaction_id = id, object, "shared lock granted");
        AcquireOutcome::Granted
    }

    fn try_acquire_write(&self, id: TransactionId, object: &str) -> AcquireOutcome {
        if let Some(holder) = self.exclusive_locks.read().get(object).copied() {
            return if holder == id {
                AcquireOutcome::Granted
            } else {
                AcquireOutcome::Conflict(vec![holder])
            };
        }

        let sole_or_conflicting_holders = {
            let shared = self.shared_locks.read();
            shared.get(object).cloned()
        };

        match sole_or_conflicting_holders {
            None => {
                self.exclusive_locks.write().insert(object.to_string(), id);
                debug!(transaction_id = id, object, "exclusive lock granted");
                AcquireOutcome::Granted
            }
            Some(holders) if holders.is_empty() => {
                self.exclusive_locks.write().insert(object.to_string(), id);
                AcquireOutcome::Granted
            }
            Some(holders) if holders.len() == 1 && holders.contains(&id) => {
                self.shared_locks.write().remove(object);
                self.exclusive_locks.write().insert(object.to_string(), id);
                debug!(transaction_id = id, object, "lock upgraded to exclusive");
                AcquireOutcome::Upgraded
            }
            Some(holders) => {
                let others: Vec<TransactionId> =
                    holders.into_iter().filter(|h| *h != id).collect();
                AcquireOutcome::Conflict(others)
            }
        }
    }

    /// Releases every shared/exclusive entry attributable to `id` across the given
    /// object names (the caller, `TransactionRegistry::take_locked_tables`, already knows
    /// which names the transaction held). Returns the set of object names whose holder
    /// set changed, for the wait coordinator to wake.
    pub fn release_all(
        &self,
        id: TransactionId,
        shared_tables: &[ObjectName],
        exclusive_tables: &[ObjectName],
    ) -> Vec<ObjectName> {
        let mut freed = Vec::new();

        {
            let mut shared = self.shared_locks.write();
            for name in shared_tables {
                if let Some(holders) = shared.get_mut(name) {
                    holders.remove(&id);
                    if holders.is_empty() {
                        shared.remove(name);
                    }
                    freed.push(name.clone());
                }
            }
        }
        {
            let mut exclusive = self.exclusive_locks.write();
            for name in exclusive_tables {
                if exclusive.get(name) == Some(&id) {
                    exclusive.remove(name);
                    freed.push(name.clone());
                }
            }
        }

        debug!(transaction_id = id, freed = freed.len(), "locks released");
        freed
    }

    pub fn shared_holders(&self, object: &str) -> Vec<TransactionId> {
        self.shared_locks
            .read()
            .get(object)
            .map(|s| {
                let mut v: Vec<_> = s.iter().copied().collect();
                v.sort_unstable();
                v
            })
            .unwrap_or_default()
    }

    pub fn exclusive_holder(&self, object: &str) -> Option<TransactionId> {
        self.exclusive_locks.read().get(object).copied()
    }

    pub fn is_locked(&self, object: &str) -> bool {
        self.exclusive_locks.read().contains_key(object)
            || self
                .shared_locks
                .read()
                .get(object)
                .map(|s| !s.is_empty())
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlocked_read_grants_shared() {
        let lm = LockManager::new();
        assert_eq!(lm.try_acquire(1, Action::Read, "X"), AcquireOutcome::Granted);
        assert_eq!(lm.shared_holders("X"), vec![1]);
    }

    #[test]
    fn unlocked_write_grants_exclusive() {
        let lm = LockManager::new();
        assert_eq!(lm.try_acquire(1, Action::Write, "X"), AcquireOutcome::Granted);
        assert_eq!(lm.exclusive_holder("X"), Some(1));
    }

    #[test]
    fn exclusive_held_by_requester_is_noop() {
        let lm = LockManager::new();
        lm.try_acquire(1, Action::Write, "X");
        assert_eq!(lm.try_acquire(1, Action::Read, "X"), AcquireOutcome::Granted);
        assert_eq!(lm.try_acquire(1, Action::Write, "X"), AcquireOutcome::Granted);
    }

    #[test]
    fn exclusive_held_by_other_conflicts() {
        let lm = LockManager::new();
        lm.try_acquire(1, Action::Write, "X");
        assert_eq!(
            lm.try_acquire(2, Action::Read, "X"),
            AcquireOutcome::Conflict(vec![1])
        );
        assert_eq!(
            lm.try_acquire(2, Action::Write, "X"),
            AcquireOutcome::Conflict(vec![1])
        );
    }

    #[test]
    fn sole_shared_holder_upgrades() {
        let lm = LockManager::new();
        lm.try_acquire(1, Action::Read, "X");
        assert_eq!(lm.try_acquire(1, Action::Write, "X"), AcquireOutcome::Upgraded);
        assert_eq!(lm.exclusive_holder("X"), Some(1));
        assert!(lm.shared_holders("X").is_empty());
    }

    #[test]
    fn shared_by_requester_and_others_conflicts_on_write() {
        let lm = LockManager::new();
        lm.try_acquire(1, Action::Read, "X");
        lm.try_acquire(2, Action::Read, "X");
        assert_eq!(
            lm.try_acquire(1, Action::Write, "X"),
            AcquireOutcome::Conflict(vec![2])
        );
    }

    #[test]
    fn shared_by_others_read_grants_and_adds_requester() {
        let lm = LockManager::new();
        lm.try_acquire(2, Action::Read, "X");
        assert_eq!(lm.try_acquire(1, Action::Read, "X"), AcquireOutcome::Granted);
        assert_eq!(lm.shared_holders("X"), vec![1, 2]);
    }

    #[test]
    fn release_all_frees_tables() {
        let lm = LockManager::new();
        lm.try_acquire(1, Action::Read, "X");
        lm.try_acquire(1, Action::Write, "Y");
        let freed = lm.release_all(1, &["X".to_string()], &["Y".to_string()]);
        assert_eq!(freed.len(), 2);
        assert!(!lm.is_locked("X"));
        assert!(!lm.is_locked("Y"));
    }
}

//! `LockBasedEngine`: strict two-phase locking wired up behind [`ConcurrencyEngine`].
//!
//! Composes a [`TransactionRegistry`] (shared state machine), [`LockManager`]
//! (acquisition rules), [`DeadlockHandler`] (wait-die or cycle detection), and
//! [`WaitCoordinator`] (clear-on-acquire wakeup) rather than inheriting from a base
//! transaction manager.

use crate::common::TransactionId;
use crate::transaction::deadlock::{DeadlockHandler, Resolution};
use crate::transaction::engine::ConcurrencyEngine;
use crate::transaction::error::TransactionResult;
use crate::transaction::lock_manager::{AcquireOutcome, LockManager};
use crate::transaction::registry::TransactionRegistry;
use crate::transaction::response::Response;
use crate::transaction::types::{Action, DeadlockPolicy, TransactionStatus};
use crate::transaction::waiters::WaitCoordinator;

/// Construction-time configuration for [`LockBasedEngine`].
#[derive(Debug, Clone, Copy)]
pub struct LockEngineConfig {
    pub deadlock_policy: DeadlockPolicy,
}

impl Default for LockEngineConfig {
    fn default() -> Self {
        Self {
            deadlock_policy: DeadlockPolicy::default(),
        }
    }
}

pub struct LockBasedEngine {
    registry: TransactionRegistry,
    lock_manager: LockManager,
    deadlock: DeadlockHandler,
    waiters: WaitCoordinator,
}

impl LockBasedEngine {
    /// Constructs an engine using the default configuration (cycle detection).
    pub fn new() -> Self {
        Self::with_config(LockEngineConfig::default())
    }

    pub fn with_config(config: LockEngineConfig) -> Self {
        Self {
            registry: TransactionRegistry::new(),
            lock_manager: LockManager::new(),
            deadlock: DeadlockHandler::new(config.deadlock_policy),
            waiters: WaitCoordinator::new(),
        }
    }

    pub fn with_policy(deadlock_policy: DeadlockPolicy) -> Self {
        Self::with_config(LockEngineConfig { deadlock_policy })
    }

    /// Exposes the wait coordinator so a caller blocked on `Waiting` can wait on the
    /// resource's notification handle outside the decision core.
    pub fn wait_coordinator(&self) -> &WaitCoordinator {
        &self.waiters
    }

    pub fn deadlock_policy(&self) -> DeadlockPolicy {
        self.deadlock.policy()
    }

    /// Releases every lock the transaction holds, signals waiters on freed names, and
    /// purges its wait-for-graph/waiter-map entries. Safe to call more than once: after
    /// the first call the registry has nothing left to drain.
    fn release_locks(&self, tid: TransactionId) -> TransactionResult<()> {
        let (shared, exclusive) = self.registry.take_locked_tables(tid)?;
        if !shared.is_empty() || !exclusive.is_empty() {
            let freed = self.lock_manager.release_all(tid, &shared, &exclusive);
            for name in freed {
                self.waiters.signal_waiters(&name);
            }
        }
        self.deadlock.clear(tid);
        self.waiters.purge(tid);
        Ok(())
    }

    fn victim_reason(&self) -> &'static str {
        match self.deadlock.policy() {
            DeadlockPolicy::WaitDie => "Wait-Die abort",
            DeadlockPolicy::CycleDetection => "Deadlock detected",
        }
    }
}

impl Default for LockBasedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyEngine for LockBasedEngine {
    fn begin(&self) -> TransactionId {
        self.registry.begin()
    }

    fn query(
        &self,
        tid: TransactionId,
        action: Action,
        object: &str,
    ) -> TransactionResult<Response> {
        let status = self.registry.get_status(tid)?;
        let active_transactions = self.registry.active_transaction_ids();

        if status != TransactionStatus::Active {
            let has_released = self.registry.with(tid, |t| t.has_released_lock)?;
            let reason = if has_released {
                "2PL violated"
            } else {
                "transaction not active"
            };
            return Ok(Response::failed(tid, reason, vec![]).with_active_transactions(active_transactions));
        }

        match self.lock_manager.try_acquire(tid, action, object) {
            AcquireOutcome::Granted => {
                self.registry.with_mut(tid, |t| match action {
                    Action::Read => {
                        t.shared_tables.insert(object.to_string());
                    }
                    Action::Write => {
                        t.exclusive_tables.insert(object.to_string());
                    }
                })?;
                self.waiters.clear_waiter(tid, object);
                self.deadlock.clear(tid);
                Ok(Response::granted(tid, "lock granted").with_active_transactions(active_transactions))
            }
            AcquireOutcome::Upgraded => {
                self.registry.with_mut(tid, |t| {
                    t.shared_tables.remove(object);
                    t.exclusive_tables.insert(object.to_string());
                })?;
                self.waiters.clear_waiter(tid, object);
                self.deadlock.clear(tid);
                Ok(Response::granted(tid, "lock upgraded to exclusive")
                    .with_active_transactions(active_transactions))
            }
            AcquireOutcome::Conflict(holders) => {
                let requester_ts = self.registry.timestamp_of(tid)?;
                let mut holder_ts = Vec::with_capacity(holders.len());
                for h in &holders {
                    holder_ts.push((*h, self.registry.timestamp_of(*h).unwrap_or(0)));
                }

                match self.deadlock.resolve(tid, requester_ts, &holder_ts) {
                    Resolution::Wait => {
                        self.registry.with_mut(tid, |t| {
                            t.waiting_for = holders.first().copied();
                        })?;
                        self.waiters.register_waiting_transaction(tid, object);
                        Ok(Response::waiting(tid, "lock held by other transaction(s)", holders)
                            .with_active_transactions(active_transactions))
                    }
                    Resolution::Victim => {
                        let reason = self.victim_reason();
                        self.registry.transition(tid, TransactionStatus::Failed)?;
                        self.release_locks(tid)?;
                        Ok(Response::failed(tid, reason, holders)
                            .with_active_transactions(active_transactions))
                    }
                }
            }
        }
    }

    fn commit(&self, tid: TransactionId) -> TransactionResult<Response> {
        self.registry.transition(tid, TransactionStatus::PartiallyCommitted)?;
        Ok(Response::granted(tid, "commit accepted")
            .with_active_transactions(self.registry.active_transaction_ids()))
    }

    fn commit_flushed(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Committed)?;
        self.release_locks(tid)
    }

    fn rollback(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Failed)?;
        self.release_locks(tid)
    }

    fn abort(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Aborted)?;
        self.release_locks(tid)
    }

    fn end(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Terminated)
    }

    fn get_status(&self, tid: TransactionId) -> TransactionResult<TransactionStatus> {
        self.registry.get_status(tid)
    }
}

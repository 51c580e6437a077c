//! `ValidationBasedEngine`: optimistic concurrency control with backward validation.
//!
//! `query` never blocks: it only grows the transaction's read/write sets. All conflict
//! detection is deferred to `commit`, which validates the requester against every
//! transaction that has already reached `Committed`/`Terminated` and whose active
//! interval overlapped the requester's.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::{Timestamp, TransactionId};
use crate::transaction::engine::ConcurrencyEngine;
use crate::transaction::error::TransactionResult;
use crate::transaction::registry::TransactionRegistry;
use crate::transaction::response::Response;
use crate::transaction::types::{Action, Transaction, TransactionStatus};

/// Construction-time configuration for [`ValidationBasedEngine`]. Currently empty, present
/// for symmetry with [`crate::transaction::lock_engine::LockEngineConfig`] and for future
/// extension (e.g. a retention window for finished transactions' validation state).
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngineConfig {}

pub struct ValidationBasedEngine {
    registry: TransactionRegistry,
    /// Independent monotonic source for start/validation/finish timestamps: logically a
    /// separate clock from the registry's id/timestamp counter, since a single
    /// transaction draws three values from it over its lifetime.
    clock: AtomicU64,
}

impl ValidationBasedEngine {
    pub fn new() -> Self {
        Self::with_config(ValidationEngineConfig::default())
    }

    pub fn with_config(_config: ValidationEngineConfig) -> Self {
        Self {
            registry: TransactionRegistry::new(),
            clock: AtomicU64::new(1),
        }
    }

    fn tick(&self) -> Timestamp {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns `true` if `candidate` conflicts with the committing transaction `ti` under
    /// backward validation: `candidate` must have already finished, its active interval
    /// must overlap `ti`'s, and its write set must intersect `ti`'s read or write set.
    fn conflicts(ti: &Transaction, candidate: &Transaction) -> bool {
        if !matches!(
            candidate.status,
            TransactionStatus::Committed | TransactionStatus::Terminated
        ) {
            return false;
        }

        let finish_ts = match candidate.finish_timestamp {
            Some(ts) => ts,
            None => return false,
        };
        let start_ts = ti.start_timestamp.unwrap_or(0);
        let validation_ts = ti.validation_timestamp.unwrap_or(0);

        if finish_ts <= start_ts {
            return false;
        }
        if candidate.start_timestamp.unwrap_or(0) >= validation_ts {
            return false;
        }

        !candidate.write_set.is_disjoint(&ti.read_set) || !candidate.write_set.is_disjoint(&ti.write_set)
    }
}

impl Default for ValidationBasedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyEngine for ValidationBasedEngine {
    fn begin(&self) -> TransactionId {
        let tid = self.registry.begin();
        let start = self.tick();
        self.registry
            .with_mut(tid, |txn| txn.start_timestamp = Some(start))
            .expect("just-created transaction must exist");
        tid
    }

    fn query(&self, tid: TransactionId, action: Action, object: &str) -> TransactionResult<Response> {
        let status = self.registry.get_status(tid)?;
        if status != TransactionStatus::Active {
            return Ok(Response::failed(tid, "transaction not active", vec![])
                .with_active_transactions(self.registry.active_transaction_ids()));
        }

        self.registry.with_mut(tid, |txn| match action {
            Action::Read => {
                txn.read_set.insert(object.to_string());
            }
            Action::Write => {
                txn.write_set.insert(object.to_string());
            }
        })?;

        Ok(Response::granted(tid, "recorded")
            .with_active_transactions(self.registry.active_transaction_ids()))
    }

    fn commit(&self, tid: TransactionId) -> TransactionResult<Response> {
        let validation_ts = self.tick();
        self.registry
            .with_mut(tid, |txn| txn.validation_timestamp = Some(validation_ts))?;

        let ti = self.registry.with(tid, |txn| txn.clone())?;
        let conflicting_peer = self.registry.with_all(|others| {
            for (other_id, other) in others.iter() {
                if *other_id != tid && Self::conflicts(&ti, other) {
                    return Some(*other_id);
                }
            }
            None
        });

        if let Some(other_id) = conflicting_peer {
            self.registry.transition(tid, TransactionStatus::Aborted)?;
            return Ok(Response::failed(
                tid,
                format!("validation failed: conflict with transaction {other_id}"),
                vec![other_id],
            )
            .with_active_transactions(self.registry.active_transaction_ids()));
        }

        self.registry.transition(tid, TransactionStatus::PartiallyCommitted)?;
        Ok(Response::granted(tid, "validation successful")
            .with_active_transactions(self.registry.active_transaction_ids()))
    }

    fn commit_flushed(&self, tid: TransactionId) -> TransactionResult<()> {
        let finish = self.tick();
        self.registry.transition(tid, TransactionStatus::Committed)?;
        self.registry
            .with_mut(tid, |txn| txn.finish_timestamp = Some(finish))?;
        Ok(())
    }

    fn rollback(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Failed)
    }

    fn abort(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Aborted)
    }

    fn end(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Terminated)
    }

    fn get_status(&self, tid: TransactionId) -> TransactionResult<TransactionStatus> {
        self.registry.get_status(tid)
    }
}

//! Transaction registry: id/timestamp allocation and the shared lifecycle state machine.
//! All three engines embed a `TransactionRegistry` and layer their own bookkeeping (lock
//! sets, object timestamp tables) on top by composition rather than inheritance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::common::{ObjectName, Timestamp, TransactionId};
use crate::transaction::error::{ConcurrencyError, TransactionResult};
use crate::transaction::types::{Transaction, TransactionStatus};

/// Legal predecessor state for a transition into `to`. Returns `None` if `to` is never a
/// valid destination (e.g. `Active`, which only `begin` produces) or has more than one
/// legal predecessor (`Aborted`, `Terminated`, handled as special cases in `transition`).
fn legal_predecessor(to: TransactionStatus) -> Option<TransactionStatus> {
    use TransactionStatus::*;
    match to {
        Active => None,
        PartiallyCommitted => Some(Active),
        Failed => Some(Active),
        Committed => Some(PartiallyCommitted),
        Aborted => None, // reachable from Failed (rollback then abort) or directly from
        // Active (a validation conflict discovered at commit time).
        Terminated => None, // reachable from either Committed or Aborted.
    }
}

/// Registry of all transactions known to one engine instance.
pub struct TransactionRegistry {
    next_id: AtomicU64,
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl TransactionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            transactions: RwLock::new(HashMap::new()),
        }
    }

    /// Allocates the next transaction id and timestamp and creates the entry in `Active`.
    pub fn begin(&self) -> TransactionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let txn = Transaction::new(id, id);
        self.transactions.write().insert(id, txn);
        debug!(transaction_id = id, "transaction begun");
        id
    }

    /// Generic state transition, enforcing the legal-predecessor table above. `Terminated`
    /// is accepted from either `Committed` or `Aborted` since both are dead ends otherwise.
    pub fn transition(
        &self,
        id: TransactionId,
        to: TransactionStatus,
    ) -> TransactionResult<()> {
        let mut txns = self.transactions.write();
        let txn = txns.get_mut(&id).ok_or(ConcurrencyError::TransactionNotFound(id))?;

        let ok = match to {
            TransactionStatus::Terminated => matches!(
                txn.status,
                TransactionStatus::Committed | TransactionStatus::Aborted
            ),
            TransactionStatus::Aborted => matches!(
                txn.status,
                TransactionStatus::Active | TransactionStatus::Failed
            ),
            _ => legal_predecessor(to) == Some(txn.status),
        };

        if !ok {
            warn!(
                transaction_id = id,
                from = %txn.status,
                to = %to,
                "illegal state transition"
            );
            return Err(ConcurrencyError::invalid_transition(id, txn.status, to));
        }

        txn.status = to;
        debug!(transaction_id = id, to = %to, "transaction transitioned");
        Ok(())
    }

    pub fn get_status(&self, id: TransactionId) -> TransactionResult<TransactionStatus> {
        self.transactions
            .read()
            .get(&id)
            .map(|t| t.status)
            .ok_or(ConcurrencyError::TransactionNotFound(id))
    }

    pub fn is_queryable(&self, id: TransactionId) -> TransactionResult<bool> {
        Ok(self.get_status(id)? == TransactionStatus::Active)
    }

    pub fn timestamp_of(&self, id: TransactionId) -> TransactionResult<Timestamp> {
        self.transactions
            .read()
            .get(&id)
            .map(|t| t.timestamp)
            .ok_or(ConcurrencyError::TransactionNotFound(id))
    }

    /// Snapshot of ids currently `Active`, used to populate `Response::active_transactions`.
    pub fn active_transaction_ids(&self) -> Vec<TransactionId> {
        let mut ids: Vec<_> = self
            .transactions
            .read()
            .values()
            .filter(|t| t.status == TransactionStatus::Active)
            .map(|t| t.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_active(&self, id: TransactionId) -> bool {
        self.transactions
            .read()
            .get(&id)
            .map(|t| t.status == TransactionStatus::Active)
            .unwrap_or(false)
    }

    /// Minimum start timestamp among active transactions, or the next timestamp to be
    /// allocated if none are active. Used by garbage collection to find the oldest
    /// snapshot still in use.
    pub fn min_active_timestamp(&self) -> Timestamp {
        self.transactions
            .read()
            .values()
            .filter(|t| t.status == TransactionStatus::Active)
            .map(|t| t.timestamp)
            .min()
            .unwrap_or_else(|| self.next_id.load(Ordering::SeqCst))
    }

    /// Runs `f` with mutable access to one transaction's record. Used by engines to
    /// mutate engine-specific fields (lock sets, read/write sets, timestamps) under the
    /// registry's single writer lock.
    pub fn with_mut<R>(
        &self,
        id: TransactionId,
        f: impl FnOnce(&mut Transaction) -> R,
    ) -> TransactionResult<R> {
        let mut txns = self.transactions.write();
        let txn = txns.get_mut(&id).ok_or(ConcurrencyError::TransactionNotFound(id))?;
        Ok(f(txn))
    }

    pub fn with<R>(&self, id: TransactionId, f: impl FnOnce(&Transaction) -> R) -> TransactionResult<R> {
        let txns = self.transactions.read();
        let txn = txns.get(&id).ok_or(ConcurrencyError::TransactionNotFound(id))?;
        Ok(f(txn))
    }

    /// Read-only access to the full transaction map. Used by the validation engine, whose
    /// backward validation must scan every other transaction at commit time.
    pub fn with_all<R>(&self, f: impl FnOnce(&HashMap<TransactionId, Transaction>) -> R) -> R {
        f(&self.transactions.read())
    }

    /// All object names this transaction currently holds a lock on (S2PL only), clearing
    /// them from the record. Called once by the lock engine at release time.
    pub fn take_locked_tables(
        &self,
        id: TransactionId,
    ) -> TransactionResult<(Vec<ObjectName>, Vec<ObjectName>)> {
        self.with_mut(id, |txn| {
            txn.has_released_lock = true;
            (
                txn.shared_tables.drain().collect(),
                txn.exclusive_tables.drain().collect(),
            )
        })
    }
}

impl Default for TransactionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_allocates_increasing_ids() {
        let reg = TransactionRegistry::new();
        assert_eq!(reg.begin(), 1);
        assert_eq!(reg.begin(), 2);
        assert_eq!(reg.begin(), 3);
    }

    #[test]
    fn legal_lock_based_path() {
        let reg = TransactionRegistry::new();
        let id = reg.begin();
        reg.transition(id, TransactionStatus::PartiallyCommitted).unwrap();
        reg.transition(id, TransactionStatus::Committed).unwrap();
        reg.transition(id, TransactionStatus::Terminated).unwrap();
        assert_eq!(reg.get_status(id).unwrap(), TransactionStatus::Terminated);
    }

    #[test]
    fn legal_failure_path() {
        let reg = TransactionRegistry::new();
        let id = reg.begin();
        reg.transition(id, TransactionStatus::Failed).unwrap();
        reg.transition(id, TransactionStatus::Aborted).unwrap();
        reg.transition(id, TransactionStatus::Terminated).unwrap();
        assert_eq!(reg.get_status(id).unwrap(), TransactionStatus::Terminated);
    }

    #[test]
    fn validation_engine_aborts_directly_from_active() {
        let reg = TransactionRegistry::new();
        let id = reg.begin();
        reg.transition(id, TransactionStatus::Aborted).unwrap();
        assert_eq!(reg.get_status(id).unwrap(), TransactionStatus::Aborted);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let reg = TransactionRegistry::new();
        let id = reg.begin();
        let err = reg.transition(id, TransactionStatus::Committed).unwrap_err();
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn unknown_id_is_not_found() {
        let reg = TransactionRegistry::new();
        let err = reg.get_status(999).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn active_transaction_ids_excludes_terminated() {
        let reg = TransactionRegistry::new();
        let t1 = reg.begin();
        let t2 = reg.begin();
        reg.transition(t1, TransactionStatus::PartiallyCommitted).unwrap();
        assert_eq!(reg.active_transaction_ids(), vec![t2]);
    }

    #[test]
    fn min_active_timestamp_tracks_oldest() {
        let reg = TransactionRegistry::new();
        let t1 = reg.begin();
        let _t2 = reg.begin();
        assert_eq!(reg.min_active_timestamp(), t1);
    }

    #[test]
    fn is_active_reflects_current_status() {
        let reg = TransactionRegistry::new();
        let t1 = reg.begin();
        assert!(reg.is_active(t1));
        reg.transition(t1, TransactionStatus::PartiallyCommitted).unwrap();
        assert!(!reg.is_active(t1));
    }
}

//! Core domain types shared by all three concurrency-control engines.

use std::collections::HashSet;
use std::fmt;

use crate::common::{ObjectName, Timestamp, TransactionId};

/// Canonical transaction lifecycle states.
///
/// ```text
/// Active ──commit───▶ PartiallyCommitted ──commit_flushed──▶ Committed ──end──▶ Terminated
///   │                                                                              ▲
///   ├──rollback──▶ Failed ──abort──▶ Aborted ─────────────────────────────────────┘
///   │                                  ▲
///   └──(validation conflict at commit)─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    Active,
    PartiallyCommitted,
    Committed,
    Failed,
    Aborted,
    Terminated,
}

impl TransactionStatus {
    /// A transaction is queryable (can accept `query`) only while `Active`.
    pub fn is_queryable(&self) -> bool {
        matches!(self, TransactionStatus::Active)
    }

    /// `Terminated` is the only state from which no further transition is legal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Terminated)
    }

    /// Whether the shrinking phase has definitely begun (locks, if any, are gone).
    pub fn holds_no_resources(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Aborted | TransactionStatus::Terminated
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Active => "Active",
            TransactionStatus::PartiallyCommitted => "PartiallyCommitted",
            TransactionStatus::Committed => "Committed",
            TransactionStatus::Failed => "Failed",
            TransactionStatus::Aborted => "Aborted",
            TransactionStatus::Terminated => "Terminated",
        };
        write!(f, "{s}")
    }
}

/// The kind of access a caller intends to perform against an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Read,
    Write,
}

/// Which deadlock-handling discipline a `LockBasedEngine` enforces. Exactly one is
/// configured per engine instance; the two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlockPolicy {
    /// Non-preemptive timestamp rule: older requester waits, younger dies.
    WaitDie,
    /// Wait-for-graph cycle detection; the requester is always the victim on cycle.
    CycleDetection,
}

impl Default for DeadlockPolicy {
    fn default() -> Self {
        DeadlockPolicy::CycleDetection
    }
}

/// A single transaction's bookkeeping record, shared across all engines.
///
/// Individual engines layer their own fields on top by embedding a `Transaction`
/// alongside engine-specific maps (lock sets, object timestamp tables) rather than via
/// inheritance.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub status: TransactionStatus,
    /// Monotonic timestamp assigned at `begin`; identical to `id` for this crate's
    /// counter design.
    pub timestamp: Timestamp,
    /// True once the transaction has released any lock (S2PL shrinking phase).
    pub has_released_lock: bool,
    /// Transaction id currently blocking this one, if any.
    pub waiting_for: Option<TransactionId>,
    /// S2PL: tables on which this transaction holds a shared lock.
    pub shared_tables: HashSet<ObjectName>,
    /// S2PL: tables on which this transaction holds an exclusive lock.
    pub exclusive_tables: HashSet<ObjectName>,
    /// BTO / Validation: objects read during this transaction's lifetime.
    pub read_set: HashSet<ObjectName>,
    /// BTO / Validation: objects written during this transaction's lifetime.
    pub write_set: HashSet<ObjectName>,
    /// Validation engine only: timestamp assigned at `begin`.
    pub start_timestamp: Option<Timestamp>,
    /// Validation engine only: timestamp assigned at `commit`.
    pub validation_timestamp: Option<Timestamp>,
    /// Validation engine only: timestamp assigned at `commit_flushed`.
    pub finish_timestamp: Option<Timestamp>,
}

impl Transaction {
    pub fn new(id: TransactionId, timestamp: Timestamp) -> Self {
        Self {
            id,
            status: TransactionStatus::Active,
            timestamp,
            has_released_lock: false,
            waiting_for: None,
            shared_tables: HashSet::new(),
            exclusive_tables: HashSet::new(),
            read_set: HashSet::new(),
            write_set: HashSet::new(),
            start_timestamp: None,
            validation_timestamp: None,
            finish_timestamp: None,
        }
    }

    pub fn is_queryable(&self) -> bool {
        self.status.is_queryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_is_active_and_empty() {
        let txn = Transaction::new(1, 1);
        assert_eq!(txn.status, TransactionStatus::Active);
        assert!(txn.is_queryable());
        assert!(!txn.has_released_lock);
        assert!(txn.shared_tables.is_empty());
        assert!(txn.exclusive_tables.is_empty());
    }

    #[test]
    fn status_predicates() {
        assert!(TransactionStatus::Active.is_queryable());
        assert!(!TransactionStatus::Committed.is_queryable());
        assert!(TransactionStatus::Terminated.is_terminal());
        assert!(TransactionStatus::Aborted.holds_no_resources());
        assert!(!TransactionStatus::Active.holds_no_resources());
    }

    #[test]
    fn deadlock_policy_default_is_cycle_detection() {
        assert_eq!(DeadlockPolicy::default(), DeadlockPolicy::CycleDetection);
    }
}

//! Contract-violation errors.
//!
//! Two kinds of outcome exist and must not be confused. Protocol-driven failures (lock
//! conflict, stale timestamp, failed validation, 2PL violation) are communicated through
//! `Response::Failed` and never construct a value of this type. Only contract violations
//! (an unknown transaction id, or a state transition attempted from an illegal state)
//! surface here.

use thiserror::Error;

use crate::common::TransactionId;
use crate::transaction::types::TransactionStatus;

/// Result alias for fallible registry/state-transition operations.
pub type TransactionResult<T> = std::result::Result<T, ConcurrencyError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    #[error("transaction {transaction_id}: illegal transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        transaction_id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("deadlock policy not configured for this engine")]
    UnknownDeadlockPolicy,

    #[error("internal lock state poisoned")]
    LockManagerPoisoned,
}

impl ConcurrencyError {
    pub fn not_found(transaction_id: TransactionId) -> Self {
        ConcurrencyError::TransactionNotFound(transaction_id)
    }

    pub fn invalid_transition(
        transaction_id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Self {
        ConcurrencyError::InvalidStateTransition {
            transaction_id,
            from,
            to,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ConcurrencyError::TransactionNotFound(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, ConcurrencyError::InvalidStateTransition { .. })
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            ConcurrencyError::TransactionNotFound(id) => Some(*id),
            ConcurrencyError::InvalidStateTransition { transaction_id, .. } => {
                Some(*transaction_id)
            }
            _ => None,
        }
    }
}

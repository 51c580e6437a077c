//! The uniform result carrier returned by every `query` and `commit` call.

use crate::common::TransactionId;

/// Outcome tag for a `Response`. Distinct from `TransactionStatus`: this describes the
/// *decision* the engine made about one operation, not the transaction's lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// The operation is admitted; the caller may proceed.
    Granted,
    /// The operation must be retried after the caller blocks on its notification handle.
    Waiting,
    /// The operation cannot proceed under the rules; the transaction has moved to `Failed`.
    Failed,
}

/// Uniform response returned by `query`/`commit` across all three engines.
#[derive(Debug, Clone)]
pub struct Response {
    pub transaction_id: TransactionId,
    pub status: ResponseStatus,
    pub reason: String,
    /// Transaction ids responsible for a `Waiting` or lock-conflict `Failed` outcome.
    /// Empty for `Granted`.
    pub blocked_by: Vec<TransactionId>,
    /// Snapshot of ids currently `Active` at decision time.
    pub active_transactions: Vec<TransactionId>,
}

impl Response {
    pub fn granted(transaction_id: TransactionId, reason: impl Into<String>) -> Self {
        Self {
            transaction_id,
            status: ResponseStatus::Granted,
            reason: reason.into(),
            blocked_by: Vec::new(),
            active_transactions: Vec::new(),
        }
    }

    pub fn waiting(
        transaction_id: TransactionId,
        reason: impl Into<String>,
        blocked_by: Vec<TransactionId>,
    ) -> Self {
        Self {
            transaction_id,
            status: ResponseStatus::Waiting,
            reason: reason.into(),
            blocked_by,
            active_transactions: Vec::new(),
        }
    }

    pub fn failed(
        transaction_id: TransactionId,
        reason: impl Into<String>,
        blocked_by: Vec<TransactionId>,
    ) -> Self {
        Self {
            transaction_id,
            status: ResponseStatus::Failed,
            reason: reason.into(),
            blocked_by,
            active_transactions: Vec::new(),
        }
    }

    pub fn with_active_transactions(mut self, active: Vec<TransactionId>) -> Self {
        self.active_transactions = active;
        self
    }

    pub fn can_proceed(&self) -> bool {
        self.status == ResponseStatus::Granted
    }

    pub fn should_retry(&self) -> bool {
        self.status == ResponseStatus::Waiting
    }

    pub fn should_rollback(&self) -> bool {
        self.status == ResponseStatus::Failed
    }
}

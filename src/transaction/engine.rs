//! The single engine contract instantiated as one of `LockBasedEngine`,
//! `TimestampBasedEngine`, or `ValidationBasedEngine`.

use crate::common::TransactionId;
use crate::transaction::error::TransactionResult;
use crate::transaction::response::Response;
use crate::transaction::types::{Action, TransactionStatus};

/// Shared external interface of all three concurrency-control disciplines.
///
/// `query` and `commit` are infallible with respect to protocol-driven failure (that
/// outcome is communicated through `Response::status = Failed`, never an `Err`), but both
/// still return `TransactionResult` because an unknown transaction id is always an `Err`.
pub trait ConcurrencyEngine {
    /// Allocates a new transaction id and timestamp; creates the entry in `Active`.
    fn begin(&self) -> TransactionId;

    /// Decides whether `action` against `object` is admissible for `tid` right now.
    fn query(&self, tid: TransactionId, action: Action, object: &str) -> TransactionResult<Response>;

    /// Attempts to commit. May itself fail the transaction (validation/BTO conflict
    /// check) instead of promoting it to `PartiallyCommitted`.
    fn commit(&self, tid: TransactionId) -> TransactionResult<Response>;

    /// Signals that the recovery log has durably persisted the transaction's effects;
    /// requires `PartiallyCommitted`, moves to `Committed`.
    fn commit_flushed(&self, tid: TransactionId) -> TransactionResult<()>;

    /// Requires `Active`; moves to `Failed`.
    fn rollback(&self, tid: TransactionId) -> TransactionResult<()>;

    /// Requires `Failed`; moves to `Aborted`.
    fn abort(&self, tid: TransactionId) -> TransactionResult<()>;

    /// Requires `Committed` or `Aborted`; moves to `Terminated`.
    fn end(&self, tid: TransactionId) -> TransactionResult<()>;

    /// Current lifecycle status of a transaction.
    fn get_status(&self, tid: TransactionId) -> TransactionResult<TransactionStatus>;
}

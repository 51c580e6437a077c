//! Shared identifier types used across the concurrency control core.

/// Unique identifier for transactions, allocated in strictly increasing order from 1.
pub type TransactionId = u64;

/// Monotonic logical timestamp. Drawn from the same counter as `TransactionId` for the
/// lock-based and timestamp-ordering engines; the validation engine draws three separate
/// timestamps per transaction from its own counter (see `transaction::validation_engine`).
pub type Timestamp = u64;

/// Stable string identifier for a lockable/versioned object (a table name).
pub type ObjectName = String;

//! Concurrency control: three interchangeable isolation disciplines behind one contract.
//!
//! - [`lock_engine::LockBasedEngine`]: strict two-phase locking with a configurable
//!   [`types::DeadlockPolicy`] (wait-die or wait-for-graph cycle detection).
//! - [`timestamp_engine::TimestampBasedEngine`]: basic timestamp ordering with the
//!   Thomas write rule.
//! - [`validation_engine::ValidationBasedEngine`]: optimistic concurrency control with
//!   backward validation at commit.
//!
//! All three embed a [`registry::TransactionRegistry`] for id/timestamp allocation and
//! the shared lifecycle state machine, and implement [`engine::ConcurrencyEngine`].

pub mod deadlock;
pub mod engine;
pub mod error;
pub mod lock_engine;
pub mod lock_manager;
pub mod registry;
pub mod response;
pub mod timestamp_engine;
pub mod types;
pub mod validation_engine;
pub mod waiters;

pub use engine::ConcurrencyEngine;
pub use error::{ConcurrencyError, TransactionResult};
pub use lock_engine::{LockBasedEngine, LockEngineConfig};
pub use response::{Response, ResponseStatus};
pub use timestamp_engine::{TimestampBasedEngine, TimestampEngineConfig};
pub use types::{Action, DeadlockPolicy, Transaction, TransactionStatus};
pub use validation_engine::{ValidationBasedEngine, ValidationEngineConfig};

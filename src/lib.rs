//! Concurrency control core for a relational transaction manager.
//!
//! Provides three interchangeable isolation disciplines (strict two-phase locking,
//! basic timestamp ordering, and optimistic validation) behind a single
//! [`transaction::engine::ConcurrencyEngine`] trait.

pub mod common;
pub mod transaction;

pub use transaction::error::{ConcurrencyError, TransactionResult};

//! `TimestampBasedEngine`: basic timestamp ordering with the Thomas write rule.
//!
//! Each object carries a `read_ts`/`write_ts` pair, the maximum timestamp of any
//! transaction that has successfully read/written it. Admission is decided purely by
//! comparing the requester's timestamp against these two values: there is no lock table,
//! no wait queue, and no deadlock handler, so a rejected request kills the requester
//! outright rather than enqueuing it.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::common::{ObjectName, Timestamp, TransactionId};
use crate::transaction::engine::ConcurrencyEngine;
use crate::transaction::error::TransactionResult;
use crate::transaction::registry::TransactionRegistry;
use crate::transaction::response::Response;
use crate::transaction::types::{Action, TransactionStatus};

#[derive(Clone, Copy, Default)]
struct ObjectTimestamps {
    read_ts: Timestamp,
    write_ts: Timestamp,
}

/// Construction-time configuration for [`TimestampBasedEngine`]. Currently empty, present
/// for symmetry with the other two engines and for future extension (e.g. a
/// garbage-collection horizon for object timestamp entries).
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampEngineConfig {}

pub struct TimestampBasedEngine {
    registry: TransactionRegistry,
    objects: RwLock<HashMap<ObjectName, ObjectTimestamps>>,
}

impl TimestampBasedEngine {
    pub fn new() -> Self {
        Self::with_config(TimestampEngineConfig::default())
    }

    pub fn with_config(_config: TimestampEngineConfig) -> Self {
        Self {
            registry: TransactionRegistry::new(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    fn stamps_of(&self, object: &str) -> ObjectTimestamps {
        self.objects.read().get(object).copied().unwrap_or_default()
    }

    fn reject(&self, tid: TransactionId, reason: &'static str) -> TransactionResult<Response> {
        warn!(transaction_id = tid, reason, "BTO request rejected");
        self.registry.transition(tid, TransactionStatus::Failed)?;
        Ok(Response::failed(tid, reason, vec![])
            .with_active_transactions(self.registry.active_transaction_ids()))
    }

    fn do_query(&self, tid: TransactionId, action: Action, object: &str) -> TransactionResult<Response> {
        let t = self.registry.timestamp_of(tid)?;
        let stamps = self.stamps_of(object);

        match action {
            Action::Read => {
                if t < stamps.write_ts {
                    return self.reject(tid, "rejected: read behind a later write");
                }
                self.objects.write().entry(object.to_string()).or_default().read_ts =
                    stamps.read_ts.max(t);
                self.registry.with_mut(tid, |txn| {
                    txn.read_set.insert(object.to_string());
                })?;
                debug!(transaction_id = tid, object, "BTO read granted");
                Ok(Response::granted(tid, "read granted")
                    .with_active_transactions(self.registry.active_transaction_ids()))
            }
            Action::Write => {
                if t < stamps.read_ts {
                    return self.reject(tid, "rejected: write behind a later read");
                }
                self.registry.with_mut(tid, |txn| {
                    txn.write_set.insert(object.to_string());
                })?;
                if t < stamps.write_ts {
                    debug!(transaction_id = tid, object, "Thomas write rule: write ignored");
                    return Ok(Response::granted(tid, "Thomas write rule")
                        .with_active_transactions(self.registry.active_transaction_ids()));
                }
                self.objects.write().entry(object.to_string()).or_default().write_ts = t;
                debug!(transaction_id = tid, object, "BTO write granted");
                Ok(Response::granted(tid, "write granted")
                    .with_active_transactions(self.registry.active_transaction_ids()))
            }
        }
    }
}

impl Default for TimestampBasedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrencyEngine for TimestampBasedEngine {
    fn begin(&self) -> TransactionId {
        self.registry.begin()
    }

    fn query(&self, tid: TransactionId, action: Action, object: &str) -> TransactionResult<Response> {
        let status = self.registry.get_status(tid)?;
        if status != TransactionStatus::Active {
            return Ok(Response::failed(tid, "transaction not active", vec![])
                .with_active_transactions(self.registry.active_transaction_ids()));
        }
        self.do_query(tid, action, object)
    }

    fn commit(&self, tid: TransactionId) -> TransactionResult<Response> {
        let t = self.registry.timestamp_of(tid)?;
        let read_set = self.registry.with(tid, |txn| txn.read_set.clone())?;

        let conflicting_write = {
            let objects = self.objects.read();
            read_set.iter().any(|name| {
                objects.get(name).map(|s| s.write_ts > t).unwrap_or(false)
            })
        };

        if conflicting_write {
            return self.reject(tid, "rejected: a later writer committed to a read object");
        }

        self.registry.transition(tid, TransactionStatus::PartiallyCommitted)?;
        Ok(Response::granted(tid, "commit accepted")
            .with_active_transactions(self.registry.active_transaction_ids()))
    }

    fn commit_flushed(&self, tid: TransactionId) -> TransactionResult<()> {
        self.registry.transition(tid, TransactionStatus::Committed)
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

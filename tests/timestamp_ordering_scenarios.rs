// Integration tests for basic timestamp ordering and the Thomas write rule.

use concurrency_core::transaction::types::{Action, TransactionStatus};
use concurrency_core::transaction::{ConcurrencyEngine, TimestampBasedEngine};

#[test]
fn thomas_write_rule_discards_stale_write_without_failing_the_transaction() {
    let engine = TimestampBasedEngine::new();
    let t1 = engine.begin();
    let t2 = engine.begin();
    let t3 = engine.begin();

    assert!(engine.query(t2, Action::Write, "ledger").unwrap().can_proceed());

    // t1 is older than t2's write; its write is obsolete under Thomas's rule, but t1
    // itself is not rolled back.
    let r = engine.query(t1, Action::Write, "ledger").unwrap();
    assert!(r.can_proceed());
    assert_eq!(r.reason, "Thomas write rule");
    assert_eq!(engine.get_status(t1).unwrap(), TransactionStatus::Active);

    assert!(engine.query(t3, Action::Read, "ledger").unwrap().can_proceed());
}

#[test]
fn stale_reader_is_rolled_back() {
    let engine = TimestampBasedEngine::new();
    let t1 = engine.begin();
    let t2 = engine.begin();

    assert!(engine.query(t2, Action::Write, "ledger").unwrap().can_proceed());
    let r = engine.query(t1, Action::Read, "ledger").unwrap();
    assert!(r.should_rollback());
    assert_eq!(engine.get_status(t1).unwrap(), TransactionStatus::Failed);
}

#[test]
fn commit_detects_a_writer_that_invalidated_an_earlier_read() {
    let engine = TimestampBasedEngine::new();
    let t1 = engine.begin();
    let t2 = engine.begin();

    assert!(engine.query(t1, Action::Read, "ledger").unwrap().can_proceed());
    assert!(engine.query(t2, Action::Write, "ledger").unwrap().can_proceed());

    let r = engine.commit(t1).unwrap();
    assert!(r.should_rollback());
}

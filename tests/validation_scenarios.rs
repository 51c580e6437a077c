// Integration tests for optimistic (validation-based) concurrency control.

use concurrency_core::transaction::types::{Action, TransactionStatus};
use concurrency_core::transaction::{ConcurrencyEngine, ValidationBasedEngine};

#[test]
fn queries_never_block() {
    let engine = ValidationBasedEngine::new();
    let t1 = engine.begin();
    assert!(engine.query(t1, Action::Read, "inventory").unwrap().can_proceed());
    assert!(engine.query(t1, Action::Write, "inventory").unwrap().can_proceed());
}

#[test]
fn overlapping_writer_invalidates_an_earlier_reader_at_commit() {
    let engine = ValidationBasedEngine::new();

    let t1 = engine.begin();
    engine.query(t1, Action::Read, "inventory").unwrap();

    let t2 = engine.begin();
    engine.query(t2, Action::Write, "inventory").unwrap();
    assert!(engine.commit(t2).unwrap().can_proceed());
    engine.commit_flushed(t2).unwrap();

    let r = engine.commit(t1).unwrap();
    assert!(r.should_rollback());
    assert_eq!(engine.get_status(t1).unwrap(), TransactionStatus::Aborted);
}

#[test]
fn disjoint_read_and_write_sets_do_not_conflict() {
    let engine = ValidationBasedEngine::new();

    let t1 = engine.begin();
    engine.query(t1, Action::Read, "inventory").unwrap();

    let t2 = engine.begin();
    engine.query(t2, Action::Write, "shipments").unwrap();
    assert!(engine.commit(t2).unwrap().can_proceed());
    engine.commit_flushed(t2).unwrap();

    assert!(engine.commit(t1).unwrap().can_proceed());
}

#[test]
fn a_peer_that_finished_before_the_reader_started_cannot_conflict() {
    let engine = ValidationBasedEngine::new();

    let t1 = engine.begin();
    engine.query(t1, Action::Write, "inventory").unwrap();
    assert!(engine.commit(t1).unwrap().can_proceed());
    engine.commit_flushed(t1).unwrap();

    let t2 = engine.begin();
    engine.query(t2, Action::Read, "inventory").unwrap();
    assert!(engine.commit(t2).unwrap().can_proceed());
}

use std::sync::Arc;
use std::sync::Once;

use small_db::{
    BufferPoolConfig, Database, Field, NoopLogWriter, OpIterator, SequentialScan, TransactionID,
    Tuple, TupleDesc,
};
use tempfile::tempdir;

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(small_db::init_log);
}

fn new_db() -> Arc<Database> {
    Database::new(BufferPoolConfig::default(), Box::new(NoopLogWriter))
}

#[test]
fn scanning_an_empty_table_yields_nothing() {
    setup();
    let db = new_db();
    let dir = tempdir().unwrap();
    let scheme = Arc::new(TupleDesc::simple_ints(2, "f"));
    let file = db
        .add_table("empty", &dir.path().join("empty.db"), scheme)
        .unwrap();
    std::mem::forget(dir);

    let tid = TransactionID::new();
    let mut scan = SequentialScan::new(db.clone(), tid, file.table_id()).unwrap();
    scan.open().unwrap();
    assert!(!scan.has_next().unwrap());
}

#[test]
fn insert_then_scan_sees_every_row_in_insertion_order() {
    setup();
    let db = new_db();
    let dir = tempdir().unwrap();
    let scheme = Arc::new(TupleDesc::simple_ints(1, "n"));
    let file = db
        .add_table("nums", &dir.path().join("nums.db"), scheme.clone())
        .unwrap();
    std::mem::forget(dir);

    let write_tid = TransactionID::new();
    for i in 0..20 {
        let t = Tuple::new(scheme.clone(), vec![Field::Int(i)]).unwrap();
        db.insert_tuple(write_tid, file.table_id(), t).unwrap();
    }
    db.transaction_complete(write_tid, true).unwrap();

    let read_tid = TransactionID::new();
    let mut scan = SequentialScan::new(db.clone(), read_tid, file.table_id()).unwrap();
    scan.open().unwrap();
    let mut seen = Vec::new();
    while scan.has_next().unwrap() {
        let t = scan.next().unwrap();
        seen.push(*match t.field(0) {
            Field::Int(v) => v,
            _ => unreachable!(),
        });
    }
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

/// `SequentialScan` is a leaf operator: it accepts no children to rewrite,
/// and reports none of its own — the default `OpIterator` behavior, which
/// it never overrides.
#[test]
fn a_sequential_scan_has_no_children() {
    setup();
    let db = new_db();
    let dir = tempdir().unwrap();
    let scheme = Arc::new(TupleDesc::simple_ints(1, "n"));
    let file = db
        .add_table("leaf", &dir.path().join("leaf.db"), scheme)
        .unwrap();
    std::mem::forget(dir);

    let tid = TransactionID::new();
    let mut scan = SequentialScan::new(db.clone(), tid, file.table_id()).unwrap();
    assert!(scan.get_children().is_empty());
    scan.set_children(Vec::new());
}

/// Calling `set_children` with a non-empty list on a leaf operator is a
/// programmer error, not a recoverable one.
#[test]
#[should_panic(expected = "accepts no children")]
fn setting_children_on_a_leaf_operator_panics() {
    setup();
    let db = new_db();
    let dir = tempdir().unwrap();
    let scheme = Arc::new(TupleDesc::simple_ints(1, "n"));
    let file = db
        .add_table("leaf2", &dir.path().join("leaf2.db"), scheme)
        .unwrap();
    std::mem::forget(dir);

    let tid = TransactionID::new();
    let mut scan = SequentialScan::new(db.clone(), tid, file.table_id()).unwrap();
    let other = SequentialScan::new(db.clone(), tid, file.table_id()).unwrap();
    scan.set_children(vec![Box::new(other)]);
}

/// The default `rewind` (close then reopen) restarts a scan from its first
/// row, matching the teacher's iterator-reset semantics.
#[test]
fn rewind_restarts_the_scan_from_the_beginning() {
    setup();
    let db = new_db();
    let dir = tempdir().unwrap();
    let scheme = Arc::new(TupleDesc::simple_ints(1, "n"));
    let file = db
        .add_table("rw", &dir.path().join("rw.db"), scheme.clone())
        .unwrap();
    std::mem::forget(dir);

    let tid = TransactionID::new();
    for i in 0..3 {
        let t = Tuple::new(scheme.clone(), vec![Field::Int(i)]).unwrap();
        db.insert_tuple(tid, file.table_id(), t).unwrap();
    }
    db.transaction_complete(tid, true).unwrap();

    let scan_tid = TransactionID::new();
    let mut scan = SequentialScan::new(db.clone(), scan_tid, file.table_id()).unwrap();
    scan.open().unwrap();
    let mut first_pass = 0;
    while scan.has_next().unwrap() {
        scan.next().unwrap();
        first_pass += 1;
    }
    scan.rewind().unwrap();
    let mut second_pass = 0;
    while scan.has_next().unwrap() {
        scan.next().unwrap();
        second_pass += 1;
    }
    assert_eq!(first_pass, 3);
    assert_eq!(second_pass, 3);
}

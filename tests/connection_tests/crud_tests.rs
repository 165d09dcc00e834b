//! Tests for the Connection CRUD API
//!
//! These tests verify:
//! - Opening initializes the file and the private lock table
//! - Create/read/update/drop round trips through the data file
//! - The private database is not writable through the API
//! - Reopening an existing file keeps its contents

use std::fs;

use flatdb::{record, Connection, FlatError, Field, FormatVersion, TableDef, Value};
use tempfile::TempDir;

use crate::{config, connect};

// =============================================================================
// Helper Functions
// =============================================================================

fn orders() -> TableDef {
    TableDef::new("orders").with_fields([Field::uuid("id"), Field::text("customer")])
}

fn setup_sales(conn: &Connection) {
    conn.create_database("sales", "").unwrap();
    conn.create_table("sales", &orders()).unwrap();
}

// =============================================================================
// Open
// =============================================================================

#[test]
fn test_open_initializes_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.txt");

    let conn = connect(&path);

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert!(lines[0].starts_with("# @datastore(\"txt\")"));
    assert_eq!(lines[1], "# ===================== @db(txn_db:\"Internal DB\")");
    assert!(lines[2].starts_with("# --------------------- @table(locks_table:\"Locks Table\")"));
    assert!(lines[2].contains("@internal(yes)"));

    assert_eq!(conn.read_store_location().unwrap().version(), FormatVersion::new(0, 1));
    assert!(conn.read_locks().unwrap().is_empty());
    assert!(!path.with_extension("lock").exists());
}

#[test]
fn test_open_twice_does_not_duplicate_setup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.txt");

    let first = connect(&path);
    let second = connect(&path);

    assert_ne!(first.id(), second.id());
    assert_eq!(second.read_all_databases().unwrap().len(), 1);
    assert_eq!(second.read_all_tables("txn_db").unwrap().len(), 1);
}

#[test]
fn test_open_rejects_foreign_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "not a data file\n").unwrap();

    let result = Connection::open(config(&path));

    assert!(matches!(result, Err(FlatError::Format(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), "not a data file\n");
}

#[test]
fn test_open_rejects_incompatible_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.txt");
    drop(connect(&path));

    let mut newer = config(&path);
    newer.version = FormatVersion::new(2, 0);
    let result = Connection::open(newer);

    assert!(matches!(result, Err(FlatError::Incompatible { .. })));
}

#[test]
fn test_open_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    let mut bad = config(&dir.path().join("store.txt"));
    bad.encoding = "UTF-16".to_string();

    assert!(matches!(Connection::open(bad), Err(FlatError::Config(_))));
}

#[test]
fn test_signature_format() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));
    assert_eq!(conn.signature(), format!("testhost:tester:{}", conn.id()));
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_create_insert_read() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));

    conn.create_database("sales", "").unwrap();
    conn.create_table("sales", &orders()).unwrap();
    conn.insert_record("sales", "orders", "o1", record([("customer", "Acme")])).unwrap();

    let found = conn.read_record("sales", "orders", "o1").unwrap();
    assert_eq!(found, record([("id", "o1"), ("customer", "Acme")]));

    // locks are gone once each call returns
    assert!(conn.read_locks().unwrap().is_empty());
}

#[test]
fn test_drop_then_read_fails() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));
    setup_sales(&conn);
    conn.insert_record("sales", "orders", "o1", record([("customer", "Acme")])).unwrap();
    conn.insert_record("sales", "orders", "o2", record([("customer", "Globex")])).unwrap();

    conn.drop_record("sales", "orders", "o1").unwrap();

    let result = conn.read_record("sales", "orders", "o1");
    assert!(matches!(result, Err(FlatError::Integrity(_))));

    let keys: Vec<Value> = conn
        .read_all_records("sales", "orders")
        .unwrap()
        .into_iter()
        .map(|r| r["id"].clone())
        .collect();
    assert_eq!(keys, vec![Value::from("o2")]);
}

#[test]
fn test_duplicates_are_rejected() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));
    setup_sales(&conn);
    conn.insert_record("sales", "orders", "o1", record([("customer", "Acme")])).unwrap();

    let errors = [
        conn.create_database("sales", "").unwrap_err(),
        conn.create_table("sales", &orders()).unwrap_err(),
        conn.insert_record("sales", "orders", "o1", record([("customer", "Globex")]))
            .unwrap_err(),
    ];

    assert!(errors.iter().all(FlatError::is_integrity));
    // failed calls still release their locks
    assert!(conn.read_locks().unwrap().is_empty());
}

#[test]
fn test_update_record() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));
    setup_sales(&conn);
    conn.insert_record("sales", "orders", "o1", record([("customer", "Acme")])).unwrap();

    conn.update_record("sales", "orders", "o1", record([("customer", "Acme Ltd")])).unwrap();

    let found = conn.read_record("sales", "orders", "o1").unwrap();
    assert_eq!(found["customer"], Value::from("Acme Ltd"));
}

#[test]
fn test_drop_records() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));
    setup_sales(&conn);
    for key in ["o1", "o2"] {
        conn.insert_record("sales", "orders", key, record([("customer", "Acme")])).unwrap();
    }

    assert_eq!(conn.drop_records("sales", "orders").unwrap(), 2);
    assert!(conn.read_all_records("sales", "orders").unwrap().is_empty());
}

#[test]
fn test_reads_of_missing_entities() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));
    setup_sales(&conn);

    assert!(conn.read_database("hr").unwrap_err().is_integrity());
    assert!(conn.read_table("sales", "items").unwrap_err().is_integrity());
    assert!(conn.read_all_records("hr", "orders").unwrap_err().is_integrity());
    assert_eq!(conn.read_table("sales", "orders").unwrap(), orders());
}

#[test]
fn test_private_database_is_not_writable() {
    let dir = TempDir::new().unwrap();
    let conn = connect(&dir.path().join("store.txt"));

    assert!(conn.begin("txn_db").unwrap_err().is_integrity());
    assert!(conn.create_database("txn_db", "").unwrap_err().is_integrity());
    assert!(conn
        .insert_record("txn_db", "locks_table", "x", record([("lock_source", "me")]))
        .unwrap_err()
        .is_integrity());
    assert!(conn.drop_records("txn_db", "locks_table").unwrap_err().is_integrity());
    assert!(!conn.in_block());
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.txt");

    {
        let conn = connect(&path);
        setup_sales(&conn);
        conn.insert_record("sales", "orders", "o1", record([("customer", "Acme \"Corp\"")]))
            .unwrap();
        conn.close().unwrap();
    }

    let conn = connect(&path);
    let found = conn.read_record("sales", "orders", "o1").unwrap();
    assert_eq!(found["customer"], Value::from("Acme \"Corp\""));
}

//! Tests for database, table and record functions
//!
//! These tests verify:
//! - Duplicate names and keys are rejected with Integrity errors
//! - Missing databases/tables/records are reported
//! - Updates merge fields and guard key changes
//! - Several edits in one session commit together

use std::time::Duration;

use flatdb::functions;
use flatdb::store::{LineStore, PollTiming};
use flatdb::{record, DatabaseDef, FlatError, Field, FormatVersion, Record, StoreLocation, TableDef, Value};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn timing() -> PollTiming {
    PollTiming {
        timeout: Duration::from_millis(500),
        initial: Duration::from_millis(1),
        max: Duration::from_millis(10),
    }
}

fn orders() -> TableDef {
    TableDef::new("orders").with_fields([
        Field::uuid("id"),
        Field::text("customer").not_null(),
        Field::integer("qty"),
    ])
}

/// Store with header, database `sales` and table `orders`, committed
fn setup_store() -> (TempDir, StoreLocation) {
    let dir = TempDir::new().unwrap();
    let loc = StoreLocation::new(dir.path().join("data.txt"), FormatVersion::default(), "UTF-8");

    let mut store = LineStore::open(&loc, timing(), true).unwrap();
    functions::create_store(&mut store).unwrap();
    functions::create_database(&mut store, &DatabaseDef::new("sales")).unwrap();
    functions::create_table(&mut store, "sales", &orders()).unwrap();
    store.commit().unwrap();

    (dir, loc)
}

fn session(loc: &StoreLocation) -> LineStore {
    LineStore::open(loc, timing(), false).unwrap()
}

fn is_integrity<T>(result: flatdb::Result<T>) -> bool {
    matches!(result, Err(FlatError::Integrity(_)))
}

// =============================================================================
// Databases and Tables
// =============================================================================

#[test]
fn test_duplicate_database_is_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    assert!(is_integrity(functions::create_database(&mut store, &DatabaseDef::new("sales"))));
}

#[test]
fn test_database_requires_header() {
    let dir = TempDir::new().unwrap();
    let loc = StoreLocation::new(dir.path().join("data.txt"), FormatVersion::default(), "UTF-8");
    let mut store = session(&loc);

    let result = functions::create_database(&mut store, &DatabaseDef::new("sales"));
    assert!(matches!(result, Err(FlatError::MissingHeader)));
}

#[test]
fn test_invalid_names_are_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    for name in ["", "  ", "a:b", "x(y)", "at@home", "q\"uote", "tab\there", " padded"] {
        let result = functions::create_database(&mut store, &DatabaseDef::new(name));
        assert!(matches!(result, Err(FlatError::InvalidName(_))), "name {:?}", name);
    }
    assert!(functions::create_database(&mut store, &DatabaseDef::new("west coast")).is_ok());
}

#[test]
fn test_read_all_databases() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    functions::create_database(&mut store, &DatabaseDef::new("hr").with_description("People")).unwrap();

    let names: Vec<String> = functions::read_all_databases(&store)
        .into_iter()
        .map(|db| db.name)
        .collect();
    assert_eq!(names, vec!["sales", "hr"]);
    assert_eq!(functions::read_database(&store, "hr").unwrap().description, "People");
    assert!(is_integrity(functions::read_database(&store, "ops")));
}

#[test]
fn test_duplicate_table_is_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    assert!(is_integrity(functions::create_table(&mut store, "sales", &orders())));
}

#[test]
fn test_same_table_name_in_other_database() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    functions::create_database(&mut store, &DatabaseDef::new("archive")).unwrap();

    functions::create_table(&mut store, "archive", &orders()).unwrap();

    assert_eq!(functions::read_all_tables(&store, "archive").unwrap(), vec![orders()]);
    assert_eq!(functions::read_all_tables(&store, "sales").unwrap(), vec![orders()]);
}

#[test]
fn test_table_in_missing_database_is_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    assert!(is_integrity(functions::create_table(&mut store, "ops", &orders())));
    assert!(is_integrity(functions::read_table(&store, "ops", "orders")));
    assert!(is_integrity(functions::read_table(&store, "sales", "items")));
}

#[test]
fn test_table_definition_is_validated() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    let empty = TableDef::new("empty");
    assert!(is_integrity(functions::create_table(&mut store, "sales", &empty)));

    let twice = TableDef::new("twice").with_fields([Field::text("a"), Field::integer("a")]);
    assert!(is_integrity(functions::create_table(&mut store, "sales", &twice)));

    let bad_field = TableDef::new("bad").with_field(Field::text("a:b"));
    assert!(matches!(
        functions::create_table(&mut store, "sales", &bad_field),
        Err(FlatError::InvalidName(_))
    ));
}

// =============================================================================
// Records
// =============================================================================

#[test]
fn test_insert_and_read_record() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    functions::insert_record(&mut store, "sales", "orders", &Value::from("o1"), record([("customer", "Acme")]))
        .unwrap();
    store.commit().unwrap();

    let store = session(&loc);
    let found = functions::read_record(&store, "sales", "orders", &Value::from("o1")).unwrap();
    assert_eq!(
        found,
        record([
            ("id", Value::from("o1")),
            ("customer", Value::from("Acme")),
            ("qty", Value::Null),
        ])
    );
}

#[test]
fn test_insert_key_overrides_key_field() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    functions::insert_record(
        &mut store,
        "sales",
        "orders",
        &Value::from("o1"),
        record([("id", "ignored"), ("customer", "Acme")]),
    )
    .unwrap();

    assert!(functions::read_record(&store, "sales", "orders", &Value::from("o1")).is_ok());
    assert!(is_integrity(functions::read_record(&store, "sales", "orders", &Value::from("ignored"))));
}

#[test]
fn test_duplicate_key_is_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    let key = Value::from("o1");

    functions::insert_record(&mut store, "sales", "orders", &key, record([("customer", "Acme")])).unwrap();
    let second = functions::insert_record(&mut store, "sales", "orders", &key, record([("customer", "Globex")]));

    assert!(is_integrity(second));
    assert_eq!(functions::read_all_records(&store, "sales", "orders").unwrap().len(), 1);
}

#[test]
fn test_insert_requires_key_and_not_null_fields() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    let no_key = functions::insert_record(&mut store, "sales", "orders", &Value::Null, record([("customer", "Acme")]));
    assert!(is_integrity(no_key));

    let empty_key = functions::insert_record(&mut store, "sales", "orders", &Value::from(""), record([("customer", "Acme")]));
    assert!(is_integrity(empty_key));

    let no_customer = functions::insert_record(&mut store, "sales", "orders", &Value::from("o1"), Record::new());
    assert!(is_integrity(no_customer));

    let unknown = functions::insert_record(
        &mut store,
        "sales",
        "orders",
        &Value::from("o1"),
        record([("customer", "Acme"), ("colour", "red")]),
    );
    assert!(is_integrity(unknown));
    assert!(!store.is_modified());
}

#[test]
fn test_update_merges_fields() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    let key = Value::from("o1");
    functions::insert_record(
        &mut store,
        "sales",
        "orders",
        &key,
        record([("customer", Value::from("Acme")), ("qty", Value::from(1))]),
    )
    .unwrap();
    store.commit().unwrap();

    let mut store = session(&loc);
    functions::update_record(&mut store, "sales", "orders", &key, record([("qty", 5)])).unwrap();
    store.commit().unwrap();

    let store = session(&loc);
    let found = functions::read_record(&store, "sales", "orders", &key).unwrap();
    assert_eq!(found["customer"], Value::from("Acme"));
    assert_eq!(found["qty"], Value::Integer(5));
}

#[test]
fn test_update_can_change_key() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    functions::insert_record(&mut store, "sales", "orders", &Value::from("o1"), record([("customer", "Acme")])).unwrap();

    // same key again is not a conflict
    functions::update_record(&mut store, "sales", "orders", &Value::from("o1"), record([("id", "o1")])).unwrap();
    functions::update_record(&mut store, "sales", "orders", &Value::from("o1"), record([("id", "o7")])).unwrap();

    assert!(is_integrity(functions::read_record(&store, "sales", "orders", &Value::from("o1"))));
    let moved = functions::read_record(&store, "sales", "orders", &Value::from("o7")).unwrap();
    assert_eq!(moved["customer"], Value::from("Acme"));
}

#[test]
fn test_update_to_existing_key_is_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    for (key, customer) in [("o1", "Acme"), ("o2", "Globex")] {
        functions::insert_record(&mut store, "sales", "orders", &Value::from(key), record([("customer", customer)]))
            .unwrap();
    }

    let result = functions::update_record(&mut store, "sales", "orders", &Value::from("o1"), record([("id", "o2")]));
    assert!(is_integrity(result));

    let result = functions::update_record(&mut store, "sales", "orders", &Value::from("o1"), record([("customer", Value::Null)]));
    assert!(is_integrity(result));
}

#[test]
fn test_update_missing_record_is_rejected() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);

    let result = functions::update_record(&mut store, "sales", "orders", &Value::from("o9"), record([("qty", 1)]));
    assert!(is_integrity(result));
}

#[test]
fn test_drop_record() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    let key = Value::from("o1");
    functions::insert_record(&mut store, "sales", "orders", &key, record([("customer", "Acme")])).unwrap();
    store.commit().unwrap();

    let mut store = session(&loc);
    functions::drop_record(&mut store, "sales", "orders", &key).unwrap();
    assert!(is_integrity(functions::drop_record(&mut store, "sales", "orders", &key)));
    store.commit().unwrap();

    let store = session(&loc);
    assert!(is_integrity(functions::read_record(&store, "sales", "orders", &key)));
    assert!(functions::read_all_records(&store, "sales", "orders").unwrap().is_empty());
}

#[test]
fn test_drop_records_empties_only_that_table() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    let items = TableDef::new("items").with_field(Field::text("sku"));
    functions::create_table(&mut store, "sales", &items).unwrap();
    for key in ["o1", "o2", "o3"] {
        functions::insert_record(&mut store, "sales", "orders", &Value::from(key), record([("customer", "Acme")]))
            .unwrap();
    }
    functions::insert_record(&mut store, "sales", "items", &Value::from("s1"), Record::new()).unwrap();
    store.commit().unwrap();

    let mut store = session(&loc);
    assert_eq!(functions::drop_records(&mut store, "sales", "orders").unwrap(), 3);
    store.commit().unwrap();

    let store = session(&loc);
    assert!(functions::read_all_records(&store, "sales", "orders").unwrap().is_empty());
    assert_eq!(functions::read_all_records(&store, "sales", "items").unwrap().len(), 1);
    assert_eq!(functions::read_all_tables(&store, "sales").unwrap().len(), 2);
}

#[test]
fn test_edits_in_one_session_commit_together() {
    let (_dir, loc) = setup_store();
    let mut store = session(&loc);
    let key = Value::from("o1");

    functions::insert_record(&mut store, "sales", "orders", &key, record([("customer", "Acme")])).unwrap();
    functions::update_record(&mut store, "sales", "orders", &key, record([("qty", 2)])).unwrap();
    functions::insert_record(&mut store, "sales", "orders", &Value::from("o2"), record([("customer", "Globex")]))
        .unwrap();
    functions::drop_record(&mut store, "sales", "orders", &Value::from("o2")).unwrap();
    store.commit().unwrap();

    let store = session(&loc);
    let records = functions::read_all_records(&store, "sales", "orders").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["qty"], Value::Integer(2));
}

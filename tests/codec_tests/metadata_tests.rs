//! Tests for metadata lines
//!
//! These tests verify:
//! - Store header encode/decode and the missing-header case
//! - Database and table definitions read back equal to what was written
//! - Insert positions follow the enclosing range

use flatdb::codec::{
    build_database_entry, build_store_entry, build_table_entry, decode_table_line, encode_table_line,
    read_database_def, read_database_defs, read_store_location, read_table_def, read_table_defs,
    ChangeRequest,
};
use flatdb::{DatabaseDef, FlatError, Field, FormatVersion, StoreLocation, TableDef, Wire};

// =============================================================================
// Helper Functions
// =============================================================================

fn apply(lines: &mut Vec<String>, change: ChangeRequest) {
    match change {
        ChangeRequest::Insert { index, entry } => lines.insert(index.min(lines.len()), entry),
        ChangeRequest::Replace { index, entry } => lines[index] = entry,
        ChangeRequest::Remove { index } => {
            lines.remove(index);
        }
    }
}

fn location() -> StoreLocation {
    StoreLocation::new("/data/sales.txt", FormatVersion::new(0, 1), "UTF-8")
}

fn store_lines() -> Vec<String> {
    let mut lines = Vec::new();
    apply(&mut lines, build_store_entry(&location()));
    lines
}

fn orders() -> TableDef {
    TableDef::new("orders")
        .with_description("Customer (web) orders")
        .with_fields([
            Field::uuid("id"),
            Field::text("customer").with_description("who: \"buyer\"").not_null(),
            Field::integer("qty"),
            Field::decimal("price"),
            Field::boolean("paid"),
            Field::timestamp_tz("placed"),
        ])
        .with_wire(Wire::new("customer", "customers.id"))
}

// =============================================================================
// Store Header
// =============================================================================

#[test]
fn test_store_header_round_trip() {
    let lines = store_lines();
    let decoded = read_store_location(&lines).unwrap().unwrap();

    assert_eq!(decoded.path(), location().path());
    assert_eq!(decoded.version(), FormatVersion::new(0, 1));
    assert_eq!(decoded.encoding(), "UTF-8");
    assert!(decoded.is_compatible(&location()));
}

#[test]
fn test_missing_header_reads_as_none() {
    let lines = vec!["just some text".to_string()];
    assert!(read_store_location(&lines).unwrap().is_none());
}

#[test]
fn test_database_entry_requires_header() {
    let lines: Vec<String> = Vec::new();
    let result = build_database_entry(&lines, &DatabaseDef::new("sales"));
    assert!(matches!(result, Err(FlatError::MissingHeader)));
}

#[test]
fn test_incompatible_versions() {
    let older = StoreLocation::new("/a.txt", FormatVersion::new(0, 1), "UTF-8");
    let newer = StoreLocation::new("/b.txt", FormatVersion::new(0, 2), "UTF-8");
    assert!(!older.is_compatible(&newer));
}

// =============================================================================
// Databases
// =============================================================================

#[test]
fn test_database_round_trip() {
    let mut lines = store_lines();
    let sales = DatabaseDef::new("sales").with_description("Sales (2024) @ HQ");
    let change = build_database_entry(&lines, &sales).unwrap();
    apply(&mut lines, change);

    assert_eq!(lines[1], "# ===================== @db(sales:\"Sales &#40;2024&#41; &#64; HQ\")");
    assert_eq!(read_database_def(&lines, "sales"), Some(sales));
    assert_eq!(read_database_def(&lines, "hr"), None);
}

#[test]
fn test_databases_append_in_order() {
    let mut lines = store_lines();
    for name in ["sales", "hr", "ops"] {
        let change = build_database_entry(&lines, &DatabaseDef::new(name)).unwrap();
        apply(&mut lines, change);
    }

    let names: Vec<String> = read_database_defs(&lines).into_iter().map(|db| db.name).collect();
    assert_eq!(names, vec!["sales", "hr", "ops"]);
}

// =============================================================================
// Tables
// =============================================================================

#[test]
fn test_table_round_trip() {
    let table = orders();
    let line = encode_table_line(&table).unwrap();
    assert_eq!(decode_table_line(&line), Some(table));
}

#[test]
fn test_table_flags_round_trip() {
    let table = TableDef::new("log")
        .with_fields([Field::integer("seq"), Field::json("payload")])
        .with_delimiter("|")
        .hidden(true)
        .supports_tags(false)
        .supports_history(true)
        .encapsulate_values(true)
        .supports_headers(true);

    let decoded = decode_table_line(&encode_table_line(&table).unwrap()).unwrap();

    assert_eq!(decoded, table);
    assert_eq!(decoded.key().unwrap().name, "seq");
}

#[test]
fn test_non_table_line_decodes_as_none() {
    assert_eq!(decode_table_line("# ===================== @db(sales:\"\")"), None);
    assert_eq!(decode_table_line("o1\tAcme"), None);
}

#[test]
fn test_table_entry_lands_at_end_of_its_database() {
    let mut lines = store_lines();
    let change = build_database_entry(&lines, &DatabaseDef::new("sales")).unwrap();
    apply(&mut lines, change);
    let change = build_database_entry(&lines, &DatabaseDef::new("hr")).unwrap();
    apply(&mut lines, change);

    let change = build_table_entry(&lines, "sales", &orders()).unwrap();
    apply(&mut lines, change);
    let staff = TableDef::new("staff").with_field(Field::text("name"));
    let change = build_table_entry(&lines, "hr", &staff).unwrap();
    apply(&mut lines, change);

    assert!(lines[2].contains("@table(orders:"));
    assert!(lines[3].contains("@db(hr:"));
    assert!(lines[4].contains("@table(staff:"));

    assert_eq!(read_table_defs(&lines, "sales"), vec![orders()]);
    assert_eq!(read_table_def(&lines, "hr", "staff"), Some(staff));
    assert_eq!(read_table_def(&lines, "sales", "staff"), None);
}

#[test]
fn test_table_entry_requires_database() {
    let lines = store_lines();
    let result = build_table_entry(&lines, "sales", &orders());
    assert!(matches!(result, Err(FlatError::Integrity(_))));
}

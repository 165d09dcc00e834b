//! CRUD Functions
//!
//! Validated create/read/update/delete over one [`LineStore`] session.
//!
//! Every mutating function reads the session's current lines, asks the codec
//! for a single line-level [`ChangeRequest`] and applies it in memory. Nothing
//! reaches the disk before [`LineStore::commit`].

use tracing::debug;

use crate::codec::{self, ChangeRequest};
use crate::error::{FlatError, Result};
use crate::schema::{DatabaseDef, Field, Record, StoreLocation, TableDef, Value};
use crate::store::LineStore;

// =============================================================================
// Store
// =============================================================================

/// Write the store header into an empty file, or check the existing one
pub fn create_store(store: &mut LineStore) -> Result<()> {
    let requested = store.location().clone();
    let live = store.live();

    match codec::read_store_location(&live)? {
        Some(existing) if existing.is_compatible(&requested) => Ok(()),
        Some(existing) => Err(FlatError::Incompatible {
            requested: requested.to_string(),
            existing: existing.to_string(),
        }),
        None if live.iter().any(|line| !line.trim().is_empty()) => Err(FlatError::Format(
            "Datastore is not configured as a flat database and is not empty.".to_string(),
        )),
        None => {
            let change = codec::build_store_entry(&requested);
            apply(store, change);
            Ok(())
        }
    }
}

/// Header of the data file; [`FlatError::MissingHeader`] if there is none
pub fn read_store_location(store: &LineStore) -> Result<StoreLocation> {
    codec::read_store_location(&store.live())?.ok_or(FlatError::MissingHeader)
}

// =============================================================================
// Databases
// =============================================================================

pub fn create_database(store: &mut LineStore, db: &DatabaseDef) -> Result<()> {
    validate_name("database", &db.name)?;

    let live = store.live();
    if codec::read_database_def(&live, &db.name).is_some() {
        return Err(integrity(format!("Database already exists \"{}\"", db.name)));
    }

    let change = codec::build_database_entry(&live, db)?;
    apply(store, change);
    Ok(())
}

pub fn read_all_databases(store: &LineStore) -> Vec<DatabaseDef> {
    codec::read_database_defs(&store.live())
}

pub fn read_database(store: &LineStore, db_name: &str) -> Result<DatabaseDef> {
    codec::read_database_def(&store.live(), db_name)
        .ok_or_else(|| integrity(format!("Database \"{}\" does not exist.", db_name)))
}

// =============================================================================
// Tables
// =============================================================================

pub fn create_table(store: &mut LineStore, db_name: &str, table: &TableDef) -> Result<()> {
    validate_name("table", &table.name)?;
    if table.fields.is_empty() {
        return Err(integrity(format!(
            "Table \"{}\" must define at least one field.",
            table.name
        )));
    }
    for (position, field) in table.fields.iter().enumerate() {
        validate_name("field", &field.name)?;
        if table.fields[..position].iter().any(|f| f.name == field.name) {
            return Err(integrity(format!(
                "Field \"{}\" is defined twice in table \"{}\".",
                field.name, table.name
            )));
        }
    }
    if table.delimiter.is_empty() || table.delimiter.contains(['\n', '\r']) {
        return Err(FlatError::InvalidName(format!(
            "table \"{}\" has an unusable field delimiter",
            table.name
        )));
    }

    read_database(store, db_name)?;

    let live = store.live();
    if codec::read_table_def(&live, db_name, &table.name).is_some() {
        return Err(integrity(format!(
            "Table \"{}\" already exists in database \"{}\"",
            table.name, db_name
        )));
    }

    let change = codec::build_table_entry(&live, db_name, table)?;
    apply(store, change);
    Ok(())
}

pub fn read_all_tables(store: &LineStore, db_name: &str) -> Result<Vec<TableDef>> {
    read_database(store, db_name)?;
    Ok(codec::read_table_defs(&store.live(), db_name))
}

pub fn read_table(store: &LineStore, db_name: &str, table_name: &str) -> Result<TableDef> {
    read_database(store, db_name)?;
    codec::read_table_def(&store.live(), db_name, table_name).ok_or_else(|| {
        integrity(format!(
            "Table \"{}\" does not exist in database \"{}\".",
            table_name, db_name
        ))
    })
}

// =============================================================================
// Records
// =============================================================================

/// Insert a record under `key`; the key field of `fields` is overwritten
pub fn insert_record(
    store: &mut LineStore,
    db_name: &str,
    table_name: &str,
    key: &Value,
    mut fields: Record,
) -> Result<()> {
    let table = read_table(store, db_name, table_name)?;
    let key_field = key_field_of(&table)?;

    if key.is_null() || key.to_text().is_some_and(|text| text.is_empty()) {
        return Err(integrity(format!(
            "Record must provide a value for the key defined for table \"{}\".",
            table_name
        )));
    }

    let live = store.live();
    if codec::find_record(&live, db_name, &table, key)?.is_some() {
        return Err(integrity(format!(
            "Record with key \"{}\" already exists in table \"{}\".",
            key, table_name
        )));
    }

    fields.insert(key_field.name.clone(), key.clone());
    check_fields(&table, &fields)?;

    let change = codec::build_record_entry(&live, db_name, &table, &fields)?;
    apply(store, change);
    Ok(())
}

pub fn read_all_records(store: &LineStore, db_name: &str, table_name: &str) -> Result<Vec<Record>> {
    let table = read_table(store, db_name, table_name)?;
    codec::read_records(&store.live(), db_name, &table)
}

pub fn read_record(store: &LineStore, db_name: &str, table_name: &str, key: &Value) -> Result<Record> {
    let table = read_table(store, db_name, table_name)?;
    codec::find_record(&store.live(), db_name, &table, key)?
        .map(|(_, record)| record)
        .ok_or_else(|| {
            integrity(format!(
                "Record \"{}\" does not exist in table \"{}\".",
                key, table_name
            ))
        })
}

/// Overwrite the given fields of the record keyed `key`
///
/// Fields not present in `changes` keep their values. Changing the key
/// field is allowed as long as no other record already uses the new key.
pub fn update_record(
    store: &mut LineStore,
    db_name: &str,
    table_name: &str,
    key: &Value,
    changes: Record,
) -> Result<()> {
    let table = read_table(store, db_name, table_name)?;
    let key_field = key_field_of(&table)?;
    let mut record = read_record(store, db_name, table_name, key)?;

    let live = store.live();
    if let Some(new_key) = changes.get(&key_field.name) {
        if new_key.is_null() {
            return Err(integrity(format!(
                "Record key of table \"{}\" can not be set to NULL.",
                table_name
            )));
        }
        let current = codec::encode_field_value(key_field, key)?;
        let target = codec::encode_field_value(key_field, new_key)?;
        if current != target && codec::find_record(&live, db_name, &table, new_key)?.is_some() {
            return Err(integrity(format!(
                "Record with primary key already exists in the table (\"{}\")",
                new_key
            )));
        }
    }

    record.extend(changes);
    check_fields(&table, &record)?;

    let change = codec::update_record_entry(&live, db_name, &table, key, &record)?;
    apply(store, change);
    Ok(())
}

pub fn drop_record(store: &mut LineStore, db_name: &str, table_name: &str, key: &Value) -> Result<()> {
    let table = read_table(store, db_name, table_name)?;
    read_record(store, db_name, table_name, key)?;

    let change = codec::drop_record_entry(&store.live(), db_name, &table, key)?;
    apply(store, change);
    Ok(())
}

/// Drop every record of a table; returns how many were dropped
pub fn drop_records(store: &mut LineStore, db_name: &str, table_name: &str) -> Result<usize> {
    let table = read_table(store, db_name, table_name)?;
    let live = store.live();

    let Some(range) = codec::table_range(&live, db_name, &table.name) else {
        return Ok(0);
    };
    let indices: Vec<usize> = range
        .indices()
        .skip(1)
        .filter(|&index| !live[index].trim().is_empty())
        .collect();

    // back to front: each removal shifts the live indices after it
    for &index in indices.iter().rev() {
        apply(store, ChangeRequest::Remove { index });
    }
    Ok(indices.len())
}

// =============================================================================
// Helpers
// =============================================================================

/// Apply a codec change to the session's lines
fn apply(store: &mut LineStore, change: ChangeRequest) {
    debug!(?change, "apply change");
    match change {
        ChangeRequest::Insert { index, entry } => store.insert(index, entry),
        ChangeRequest::Replace { index, entry } => {
            store.replace(index, entry);
        }
        ChangeRequest::Remove { index } => {
            store.remove(index);
        }
    }
}

/// Names end up unescaped inside `@tag(name:...)` tokens
pub fn validate_name(kind: &str, name: &str) -> Result<()> {
    let reserved = |c: char| matches!(c, ':' | '@' | '(' | ')' | '"') || c.is_control();
    if name.trim().is_empty() || name != name.trim() || name.chars().any(reserved) {
        return Err(FlatError::InvalidName(format!("{} name \"{}\"", kind, name)));
    }
    Ok(())
}

fn key_field_of(table: &TableDef) -> Result<&Field> {
    table
        .key()
        .ok_or_else(|| FlatError::Format(format!("table \"{}\" has no key field", table.name)))
}

/// Reject unknown fields and NULL in not-null fields
fn check_fields(table: &TableDef, record: &Record) -> Result<()> {
    if let Some(unknown) = record.keys().find(|name| table.field(name).is_none()) {
        return Err(integrity(format!(
            "Field \"{}\" does not exist in table \"{}\".",
            unknown, table.name
        )));
    }
    for field in table.fields.iter().filter(|f| !f.nullable) {
        if record.get(&field.name).map_or(true, Value::is_null) {
            return Err(integrity(format!(
                "Field \"{}\" of table \"{}\" can not be NULL.",
                field.name, table.name
            )));
        }
    }
    Ok(())
}

fn integrity(message: String) -> FlatError {
    debug!(%message, "integrity check failed");
    FlatError::Integrity(message)
}

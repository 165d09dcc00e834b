//! Store header, database and table lines

use std::path::PathBuf;

use super::escape::{decode_bool, decode_value, encode_bool, encode_value};
use super::range::{database_range, store_range};
use super::token::{find_token, split_key_value, tokens};
use super::{ChangeRequest, DB_BOUNDARY, LINE_START, TABLE_BOUNDARY, TOKEN_SEPARATOR};
use crate::error::{FlatError, Result};
use crate::schema::{
    DatabaseDef, Field, FieldType, FormatVersion, StoreLocation, TableDef, Wire, DEFAULT_DELIMITER,
    STORE_TYPE,
};

// =============================================================================
// Store Header
// =============================================================================

/// Header line for `location`, inserted at the top of the file
pub fn build_store_entry(location: &StoreLocation) -> ChangeRequest {
    let entry = [
        LINE_START.to_string(),
        format!("@datastore({})", encode_value(STORE_TYPE)),
        format!("@source({})", encode_value(&location.path().display().to_string())),
        format!("@version({})", encode_value(&location.version().to_string())),
        format!("@encoding({})", encode_value(&location.encoding().to_uppercase())),
    ]
    .join(TOKEN_SEPARATOR);

    ChangeRequest::Insert { index: 0, entry }
}

/// Decode the first store header line; `None` if the file has none
pub fn read_store_location<L: AsRef<str>>(lines: &[L]) -> Result<Option<StoreLocation>> {
    for line in lines {
        let line = line.as_ref();
        let Some(store_type) = find_token(line, "datastore") else {
            continue;
        };
        if decode_value(store_type) != STORE_TYPE {
            continue;
        }

        let source = find_token(line, "source").map(decode_value).unwrap_or_default();
        let version = match find_token(line, "version") {
            Some(payload) => decode_value(payload).parse::<FormatVersion>()?,
            None => return Err(FlatError::Format("store header has no version".to_string())),
        };
        let encoding = find_token(line, "encoding")
            .map(decode_value)
            .ok_or_else(|| FlatError::Format("store header has no encoding".to_string()))?;

        return Ok(Some(StoreLocation::new(PathBuf::from(source), version, encoding)));
    }
    Ok(None)
}

// =============================================================================
// Databases
// =============================================================================

/// Database line, inserted at the end of the store range
pub fn build_database_entry<L: AsRef<str>>(lines: &[L], db: &DatabaseDef) -> Result<ChangeRequest> {
    let store = store_range(lines).ok_or(FlatError::MissingHeader)?;

    let entry = [
        LINE_START.to_string(),
        DB_BOUNDARY.to_string(),
        format!("@db({}:{})", db.name, encode_value(&db.description)),
    ]
    .join(TOKEN_SEPARATOR);

    Ok(ChangeRequest::Insert {
        index: store.end(),
        entry,
    })
}

/// Every database defined in the store, in file order
pub fn read_database_defs<L: AsRef<str>>(lines: &[L]) -> Vec<DatabaseDef> {
    let Some(store) = store_range(lines) else {
        return Vec::new();
    };

    store
        .indices()
        .filter_map(|index| find_token(lines[index].as_ref(), "db"))
        .map(|payload| {
            let (name, description) = split_key_value(payload);
            DatabaseDef::new(name).with_description(decode_value(description))
        })
        .collect()
}

pub fn read_database_def<L: AsRef<str>>(lines: &[L], db_name: &str) -> Option<DatabaseDef> {
    read_database_defs(lines).into_iter().find(|db| db.name == db_name)
}

// =============================================================================
// Tables
// =============================================================================

/// Table line, inserted at the end of the database range
pub fn build_table_entry<L: AsRef<str>>(
    lines: &[L],
    db_name: &str,
    table: &TableDef,
) -> Result<ChangeRequest> {
    let db = database_range(lines, db_name)
        .ok_or_else(|| FlatError::Integrity(format!("Database \"{}\" does not exist.", db_name)))?;

    Ok(ChangeRequest::Insert {
        index: db.end(),
        entry: encode_table_line(table)?,
    })
}

/// Serialize a table definition into its boundary line
pub fn encode_table_line(table: &TableDef) -> Result<String> {
    let key = table.key().ok_or_else(|| {
        FlatError::Integrity(format!("Table \"{}\" must define at least one field.", table.name))
    })?;

    let mut parts = vec![
        LINE_START.to_string(),
        TABLE_BOUNDARY.to_string(),
        format!("@table({}:{})", table.name, encode_value(&table.description)),
        format!("@sep({})", encode_value(&table.delimiter)),
        format!("@internal({})", encode_bool(table.hidden)),
        format!("@tags({})", encode_bool(table.supports_tags)),
        format!("@history({})", encode_bool(table.supports_history)),
        format!("@encap({})", encode_bool(table.encapsulate_values)),
        format!("@headers({})", encode_bool(table.supports_headers)),
        format!("@key({})", key.name),
    ];

    for field in &table.fields {
        parts.push(format!(
            "@{}({}:{})",
            field.field_type.tag(),
            field.name,
            encode_value(&field.description)
        ));
    }
    for wire in &table.wires {
        parts.push(format!("@wire({}:{})", wire.from_field, wire.to_field));
    }
    for field in table.fields.iter().filter(|f| !f.nullable) {
        parts.push(format!("@notnull({})", field.name));
    }

    Ok(parts.join(TOKEN_SEPARATOR))
}

/// Parse a table boundary line; `None` if the line is not one
pub fn decode_table_line(line: &str) -> Option<TableDef> {
    let all = tokens(line);
    let (_, info) = all.iter().find(|(tag, _)| *tag == "table")?;
    let (name, description) = split_key_value(info);

    let flag = |tag: &str| {
        all.iter()
            .find(|(t, _)| *t == tag)
            .and_then(|(_, payload)| decode_bool(payload))
            .unwrap_or(false)
    };

    let mut table = TableDef::new(name)
        .with_description(decode_value(description))
        .with_delimiter(
            all.iter()
                .find(|(t, _)| *t == "sep")
                .map(|(_, payload)| decode_value(payload))
                .filter(|sep| !sep.is_empty())
                .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()),
        )
        .hidden(flag("internal"))
        .supports_tags(flag("tags"))
        .supports_history(flag("history"))
        .encapsulate_values(flag("encap"))
        .supports_headers(flag("headers"));

    // field and wire definitions follow the key token
    let definitions = all
        .iter()
        .skip_while(|(tag, _)| *tag != "key")
        .skip(1);

    let mut not_null: Vec<&str> = Vec::new();
    for (tag, payload) in definitions {
        match *tag {
            "wire" => {
                let (from, to) = split_key_value(payload);
                table.wires.push(Wire::new(from, to));
            }
            "notnull" => not_null.push(*payload),
            other => {
                let (field_name, field_description) = split_key_value(payload);
                let field_type = FieldType::from_tag(other).unwrap_or(FieldType::Undefined);
                table.fields.push(
                    Field::new(field_type, field_name).with_description(decode_value(field_description)),
                );
            }
        }
    }
    for field in table.fields.iter_mut() {
        if not_null.contains(&field.name.as_str()) {
            field.nullable = false;
        }
    }

    Some(table)
}

/// Every table defined in database `db_name`, in file order
pub fn read_table_defs<L: AsRef<str>>(lines: &[L], db_name: &str) -> Vec<TableDef> {
    let Some(db) = database_range(lines, db_name) else {
        return Vec::new();
    };

    db.indices()
        .filter_map(|index| decode_table_line(lines[index].as_ref()))
        .collect()
}

pub fn read_table_def<L: AsRef<str>>(lines: &[L], db_name: &str, table_name: &str) -> Option<TableDef> {
    read_table_defs(lines, db_name)
        .into_iter()
        .find(|table| table.name == table_name)
}

//! Record lines
//!
//! A record line holds one value per field, in field order, joined by the
//! table delimiter. Hidden tables prefix their record lines with `# `.

use super::escape::{decode_bool, encode_bool, escape, unescape};
use super::range::table_range;
use super::{ChangeRequest, HIDDEN_RECORD_PREFIX, NULL};
use crate::error::{FlatError, Result};
use crate::schema::{Field, FieldType, Record, TableDef, Value};

// =============================================================================
// Field Values
// =============================================================================

/// Encode one value for `field`, checking it reads back as the field's type
///
/// Text that the line format can not represent is rejected with `Format`.
pub fn encode_field_value(field: &Field, value: &Value) -> Result<String> {
    let token = match value {
        Value::Null => NULL.to_string(),
        Value::Bool(b) => encode_bool(*b).to_string(),
        Value::Byte(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => escape(s),
    };

    let decoded = decode_field_value(field, &token).map_err(|_| {
        FlatError::Format(format!(
            "value \"{}\" is not a valid {} for field \"{}\"",
            value, field.field_type, field.name
        ))
    })?;

    // text must read back unchanged: `NULL`, literal `\t` or `&quot;` would not
    if let Value::Text(text) = value {
        let lossless = match &decoded {
            Value::Null => false,
            Value::Text(back) => back == text,
            _ => true,
        };
        if !lossless {
            return Err(FlatError::Format(format!(
                "text \"{}\" can not be stored unchanged in field \"{}\"",
                text, field.name
            )));
        }
    }

    Ok(token)
}

/// Decode one (unquoted) value token for `field`
pub fn decode_field_value(field: &Field, token: &str) -> Result<Value> {
    if token == NULL {
        return Ok(Value::Null);
    }

    let invalid = || {
        FlatError::Format(format!(
            "\"{}\" is not a valid {} for field \"{}\"",
            token, field.field_type, field.name
        ))
    };

    let value = match field.field_type {
        FieldType::Boolean => Value::Bool(decode_bool(token).ok_or_else(invalid)?),
        FieldType::Byte => Value::Byte(token.trim().parse().map_err(|_| invalid())?),
        FieldType::Integer => Value::Integer(token.trim().parse().map_err(|_| invalid())?),
        FieldType::Decimal => Value::Decimal(token.trim().parse().map_err(|_| invalid())?),
        _ => Value::Text(unescape(token)),
    };
    Ok(value)
}

// =============================================================================
// Record Lines
// =============================================================================

/// Serialize a record in field order; missing fields become `NULL`
pub fn encode_record(table: &TableDef, record: &Record) -> Result<String> {
    let mut parts = Vec::with_capacity(table.fields.len());

    for field in &table.fields {
        let value = record.get(&field.name).unwrap_or(&Value::Null);
        let token = encode_field_value(field, value)?;
        if token.contains(table.delimiter.as_str()) {
            return Err(FlatError::Format(format!(
                "value for field \"{}\" contains the field delimiter of table \"{}\"",
                field.name, table.name
            )));
        }
        parts.push(if table.encapsulate_values {
            format!("\"{}\"", token)
        } else {
            token
        });
    }

    let joined = parts.join(&table.delimiter);
    Ok(if table.hidden {
        format!("{}{}", HIDDEN_RECORD_PREFIX, joined)
    } else {
        joined
    })
}

/// Parse a record line of `table`
pub fn decode_record(table: &TableDef, line: &str) -> Result<Record> {
    let body = if table.hidden {
        line.strip_prefix(HIDDEN_RECORD_PREFIX).unwrap_or(line)
    } else {
        line
    };

    let tokens: Vec<&str> = body.split(table.delimiter.as_str()).collect();
    if tokens.len() != table.fields.len() {
        return Err(FlatError::Format(format!(
            "record in table \"{}\" has {} values, expected {}",
            table.name,
            tokens.len(),
            table.fields.len()
        )));
    }

    let mut record = Record::new();
    for (field, token) in table.fields.iter().zip(tokens) {
        let token = if table.encapsulate_values {
            token
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(token)
        } else {
            token
        };
        record.insert(field.name.clone(), decode_field_value(field, token)?);
    }
    Ok(record)
}

/// Every record of `table` in database `db_name`, with its line index
fn indexed_records<L: AsRef<str>>(
    lines: &[L],
    db_name: &str,
    table: &TableDef,
) -> Result<Vec<(usize, Record)>> {
    let Some(range) = table_range(lines, db_name, &table.name) else {
        return Ok(Vec::new());
    };

    // the first line of the range is the table line itself
    range
        .indices()
        .skip(1)
        .filter(|&index| !lines[index].as_ref().trim().is_empty())
        .map(|index| decode_record(table, lines[index].as_ref()).map(|record| (index, record)))
        .collect()
}

/// Every record of `table` in file order
pub fn read_records<L: AsRef<str>>(lines: &[L], db_name: &str, table: &TableDef) -> Result<Vec<Record>> {
    Ok(indexed_records(lines, db_name, table)?
        .into_iter()
        .map(|(_, record)| record)
        .collect())
}

/// Record whose key equals `key`, with its line index
pub fn find_record<L: AsRef<str>>(
    lines: &[L],
    db_name: &str,
    table: &TableDef,
    key: &Value,
) -> Result<Option<(usize, Record)>> {
    let key_field = table.key().ok_or_else(|| {
        FlatError::Format(format!("table \"{}\" has no key field", table.name))
    })?;
    let wanted = encode_field_value(key_field, key)?;

    for (index, record) in indexed_records(lines, db_name, table)? {
        let stored = record.get(&key_field.name).unwrap_or(&Value::Null);
        if encode_field_value(key_field, stored)? == wanted {
            return Ok(Some((index, record)));
        }
    }
    Ok(None)
}

/// Record line, inserted at the end of the table range
pub fn build_record_entry<L: AsRef<str>>(
    lines: &[L],
    db_name: &str,
    table: &TableDef,
    record: &Record,
) -> Result<ChangeRequest> {
    let range = table_range(lines, db_name, &table.name).ok_or_else(|| {
        FlatError::Integrity(format!(
            "Table \"{}\" does not exist in database \"{}\".",
            table.name, db_name
        ))
    })?;

    Ok(ChangeRequest::Insert {
        index: range.end(),
        entry: encode_record(table, record)?,
    })
}

/// Replace the line of the record keyed `key` with `record`
pub fn update_record_entry<L: AsRef<str>>(
    lines: &[L],
    db_name: &str,
    table: &TableDef,
    key: &Value,
    record: &Record,
) -> Result<ChangeRequest> {
    let (index, _) = find_record(lines, db_name, table, key)?
        .ok_or_else(|| record_missing(table, key))?;

    Ok(ChangeRequest::Replace {
        index,
        entry: encode_record(table, record)?,
    })
}

/// Remove the line of the record keyed `key`
pub fn drop_record_entry<L: AsRef<str>>(
    lines: &[L],
    db_name: &str,
    table: &TableDef,
    key: &Value,
) -> Result<ChangeRequest> {
    let (index, _) = find_record(lines, db_name, table, key)?
        .ok_or_else(|| record_missing(table, key))?;

    Ok(ChangeRequest::Remove { index })
}

fn record_missing(table: &TableDef, key: &Value) -> FlatError {
    FlatError::Integrity(format!(
        "Record \"{}\" does not exist in table \"{}\".",
        key, table.name
    ))
}

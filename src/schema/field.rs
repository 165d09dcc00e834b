//! Field and wire definitions

use std::fmt;

use serde::Serialize;

/// Declared type of a table field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Read back from an unknown type tag
    Undefined,
    Boolean,
    Byte,
    Integer,
    Text,
    Date,
    Time,
    TimeStamp,
    TimeStampTz,
    Decimal,
    Uuid,
    Json,
    Xml,
}

impl FieldType {
    /// Tag used for this type on a table line
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::Boolean => "bool",
            FieldType::Byte => "byte",
            FieldType::Integer => "int",
            FieldType::Text | FieldType::Undefined => "text",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::TimeStamp => "tstamp",
            FieldType::TimeStampTz => "tstamptz",
            FieldType::Decimal => "decimal",
            FieldType::Uuid => "uuid",
            FieldType::Json => "json",
            FieldType::Xml => "xml",
        }
    }

    /// Inverse of [`FieldType::tag`]; `None` for tags that are not field types
    pub fn from_tag(tag: &str) -> Option<Self> {
        let field_type = match tag {
            "bool" => FieldType::Boolean,
            "byte" => FieldType::Byte,
            "int" => FieldType::Integer,
            "text" => FieldType::Text,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "tstamp" => FieldType::TimeStamp,
            "tstamptz" => FieldType::TimeStampTz,
            "decimal" => FieldType::Decimal,
            "uuid" => FieldType::Uuid,
            "json" => FieldType::Json,
            "xml" => FieldType::Xml,
            _ => return None,
        };
        Some(field_type)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A named, typed column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub field_type: FieldType,
    pub name: String,
    pub description: String,
    pub nullable: bool,
}

impl Field {
    pub fn new(field_type: FieldType, name: impl Into<String>) -> Self {
        Self {
            field_type,
            name: name.into(),
            description: String::new(),
            nullable: true,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(FieldType::Boolean, name)
    }

    pub fn byte(name: impl Into<String>) -> Self {
        Self::new(FieldType::Byte, name)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(FieldType::Integer, name)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(FieldType::Text, name)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(FieldType::Date, name)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::new(FieldType::Time, name)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(FieldType::TimeStamp, name)
    }

    pub fn timestamp_tz(name: impl Into<String>) -> Self {
        Self::new(FieldType::TimeStampTz, name)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(FieldType::Decimal, name)
    }

    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(FieldType::Uuid, name)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(FieldType::Json, name)
    }

    pub fn xml(name: impl Into<String>) -> Self {
        Self::new(FieldType::Xml, name)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reject `NULL` for this field on insert and update
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A declared (unenforced) reference between two fields
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Wire {
    pub from_field: String,
    pub to_field: String,
}

impl Wire {
    pub fn new(from_field: impl Into<String>, to_field: impl Into<String>) -> Self {
        Self {
            from_field: from_field.into(),
            to_field: to_field.into(),
        }
    }
}

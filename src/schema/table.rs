//! Database and table definitions

use serde::Serialize;

use super::{Field, Wire};

/// Field delimiter used when a table does not choose one
pub const DEFAULT_DELIMITER: &str = "\t";

/// A named database inside the data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseDef {
    pub name: String,
    pub description: String,
}

impl DatabaseDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A named table inside a database
///
/// The first field is always the key field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDef {
    pub name: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub wires: Vec<Wire>,
    pub delimiter: String,
    /// Internal/system table; its record lines start with `# `
    pub hidden: bool,
    pub supports_tags: bool,
    pub supports_history: bool,
    /// Wrap each record value in double quotes
    pub encapsulate_values: bool,
    pub supports_headers: bool,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            fields: Vec::new(),
            wires: Vec::new(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            hidden: false,
            supports_tags: true,
            supports_history: false,
            encapsulate_values: false,
            supports_headers: false,
        }
    }

    /// Key field (`fields[0]`), `None` for a table without fields
    pub fn key(&self) -> Option<&Field> {
        self.fields.first()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_wire(mut self, wire: Wire) -> Self {
        self.wires.push(wire);
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn supports_tags(mut self, enabled: bool) -> Self {
        self.supports_tags = enabled;
        self
    }

    pub fn supports_history(mut self, enabled: bool) -> Self {
        self.supports_history = enabled;
        self
    }

    pub fn encapsulate_values(mut self, enabled: bool) -> Self {
        self.encapsulate_values = enabled;
        self
    }

    pub fn supports_headers(mut self, enabled: bool) -> Self {
        self.supports_headers = enabled;
        self
    }
}

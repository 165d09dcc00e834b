//! Schema Module
//!
//! Typed definitions for everything the data file describes.
//!
//! ## Hierarchy
//! ```text
//! StoreLocation            (one header line per file)
//!   └── DatabaseDef        (name unique within the file)
//!         └── TableDef     (name unique within its database)
//!               └── Record (keyed by TableDef::key(), always fields[0])
//! ```

mod field;
mod location;
mod table;
mod value;

pub use field::{Field, FieldType, Wire};
pub use location::{FormatVersion, StoreLocation, STORE_TYPE};
pub use table::{DatabaseDef, TableDef, DEFAULT_DELIMITER};
pub use value::{record, Record, Value};

//! Entity Codec Module
//!
//! Encodes store headers, databases, tables and records into lines and back,
//! and finds the contiguous line range that belongs to each of them.
//!
//! ## Line Format
//! ```text
//! # @datastore("txt") @source("/data/sales.txt") @version("0.1") @encoding("UTF-8")
//! # ===================== @db(sales:"Sales data")
//! # --------------------- @table(orders:"") @sep("\t") @internal(no) @tags(yes) @history(no) @encap(no) @headers(no) @key(id) @uuid(id:"") @text(customer:"")
//! o1<TAB>Acme
//! o2<TAB>Globex
//! ```
//!
//! Every operation here is pure: it reads a slice of line contents and
//! returns typed definitions or a [`ChangeRequest`] for the line store.

mod escape;
mod metadata;
mod range;
mod record;
mod token;

pub use escape::{decode_value, encode_value, escape, unescape};
pub use metadata::{
    build_database_entry, build_store_entry, build_table_entry, decode_table_line, encode_table_line,
    read_database_def, read_database_defs, read_store_location, read_table_def, read_table_defs,
};
pub use range::{database_range, store_range, table_range, EntryRange};
pub use record::{
    build_record_entry, decode_field_value, decode_record, drop_record_entry, encode_field_value,
    encode_record, find_record, read_records, update_record_entry,
};
pub use token::{find_token, tokens};

/// Line-level edit computed by the codec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRequest {
    /// Insert `entry` before line `index` (at the end if past it)
    Insert { index: usize, entry: String },
    /// Replace line `index` with `entry`
    Replace { index: usize, entry: String },
    /// Drop line `index`
    Remove { index: usize },
}

// Metadata syntax shared by the submodules
pub(crate) const LINE_START: &str = "#";
pub(crate) const TOKEN_SEPARATOR: &str = " ";
pub(crate) const HIDDEN_RECORD_PREFIX: &str = "# ";
pub(crate) const DB_BOUNDARY: &str = "=====================";
pub(crate) const TABLE_BOUNDARY: &str = "---------------------";
pub(crate) const NULL: &str = "NULL";
pub(crate) const YES: &str = "yes";
pub(crate) const NO: &str = "no";

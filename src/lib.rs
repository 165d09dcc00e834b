//! # flatdb
//!
//! An embedded, multi-process data store kept in one human-readable text file:
//! - Databases, tables and keyed records as tagged text lines
//! - Hierarchical advisory locks stored inside the file itself
//! - Sentinel lock file serializing short exclusive sections across processes
//! - Commit-time three-way merge of concurrent edits
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Connection                             │
//! │        (begin/end envelope, lock rows in txn_db)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    CRUD Functions                            │
//! │              (validation, one change per call)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │Entity Codec │          │ Line Store  │
//!   │(lines/range)│          │(merge, lock)│
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  data file  │
//!                           │ + .lock file│
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use flatdb::{record, Config, Connection, Field, TableDef};
//!
//! # fn main() -> flatdb::Result<()> {
//! let conn = Connection::open(Config::builder().path("sales.txt").build())?;
//! conn.create_database("sales", "Sales data")?;
//! conn.create_table(
//!     "sales",
//!     &TableDef::new("orders").with_fields([Field::uuid("id"), Field::text("customer")]),
//! )?;
//! conn.insert_record("sales", "orders", "o1", record([("customer", "Acme")]))?;
//! let order = conn.read_record("sales", "orders", "o1")?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod store;
pub mod codec;
pub mod functions;
pub mod connection;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FlatError, Result};
pub use config::{Config, ConfigBuilder};
pub use connection::{Connection, ConnectionLock, LockLevel, LockTarget};
pub use schema::{
    record, DatabaseDef, Field, FieldType, FormatVersion, Record, StoreLocation, TableDef, Value, Wire,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of flatdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

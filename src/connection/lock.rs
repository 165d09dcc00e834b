//! Connection locks
//!
//! A lock is a row in the hidden locks table. It names a scope in the
//! entity hierarchy and the connection that owns it.
//!
//! ## Restriction
//! ```text
//!   Store            restricts everything
//!   Database  sales  restricts sales and everything inside it
//!   Table     sales:orders
//!   Record    sales:orders:o1
//! ```
//! Two locks restrict each other when either scope contains the other.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::error::{FlatError, Result};
use crate::schema::{record, Record, Value};

const ID_LENGTH: usize = 22;

/// Random identifier for connections and lock rows
pub fn short_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

// =============================================================================
// Lock Level
// =============================================================================

/// Lock granularity; `Store` is the highest level, `Record` the lowest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockLevel {
    Store,
    Database,
    Table,
    Record,
}

impl fmt::Display for LockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockLevel::Store => "store",
            LockLevel::Database => "database",
            LockLevel::Table => "table",
            LockLevel::Record => "record",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Lock Target
// =============================================================================

/// Scope of a lock: nothing, a database, a table or one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct LockTarget {
    pub database: Option<String>,
    pub table: Option<String>,
    pub record_key: Option<String>,
}

impl LockTarget {
    pub fn store() -> Self {
        Self::default()
    }

    pub fn database(db: impl Into<String>) -> Self {
        Self {
            database: Some(db.into()),
            ..Self::default()
        }
    }

    pub fn table(db: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: Some(db.into()),
            table: Some(table.into()),
            record_key: None,
        }
    }

    /// Record scope; the key is compared by its text form
    pub fn record(db: impl Into<String>, table: impl Into<String>, key: &Value) -> Self {
        Self {
            database: Some(db.into()),
            table: Some(table.into()),
            record_key: key.to_text(),
        }
    }

    /// Build from optional parts; a part may only be set if its parent is
    pub fn from_parts(
        database: Option<String>,
        table: Option<String>,
        record_key: Option<String>,
    ) -> Result<Self> {
        if (table.is_some() && database.is_none()) || (record_key.is_some() && table.is_none()) {
            return Err(FlatError::Format(format!(
                "lock scope {:?}:{:?}:{:?} skips a level",
                database, table, record_key
            )));
        }
        Ok(Self {
            database,
            table,
            record_key,
        })
    }

    pub fn level(&self) -> LockLevel {
        match (&self.database, &self.table, &self.record_key) {
            (None, _, _) => LockLevel::Store,
            (Some(_), None, _) => LockLevel::Database,
            (Some(_), Some(_), None) => LockLevel::Table,
            (Some(_), Some(_), Some(_)) => LockLevel::Record,
        }
    }

    fn path(&self) -> impl Iterator<Item = &str> {
        [&self.database, &self.table, &self.record_key]
            .into_iter()
            .map_while(|part| part.as_deref())
    }

    /// True if this scope contains `other` (or is the same scope)
    pub fn covers(&self, other: &LockTarget) -> bool {
        let mine: Vec<&str> = self.path().collect();
        let theirs: Vec<&str> = other.path().collect();
        mine.len() <= theirs.len() && mine.iter().zip(&theirs).all(|(a, b)| a == b)
    }
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.database.as_deref().unwrap_or(""),
            self.table.as_deref().unwrap_or(""),
            self.record_key.as_deref().unwrap_or("")
        )
    }
}

// =============================================================================
// Connection Lock
// =============================================================================

/// One row of the locks table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionLock {
    pub id: String,
    pub source: String,
    pub requester: String,
    pub connection_id: String,
    pub target: LockTarget,
}

impl ConnectionLock {
    // Locks table columns, key first
    pub const ID: &'static str = "lock_uuid";
    pub const SOURCE: &'static str = "lock_source";
    pub const REQUESTER: &'static str = "lock_requester";
    pub const CONNECTION: &'static str = "lock_conn_uuid";
    pub const DATABASE: &'static str = "lock_dbname";
    pub const TABLE: &'static str = "lock_tablename";
    pub const RECORD_KEY: &'static str = "lock_recordkey";

    /// New lock with a fresh id
    pub fn new(
        source: impl Into<String>,
        requester: impl Into<String>,
        connection_id: impl Into<String>,
        target: LockTarget,
    ) -> Self {
        Self {
            id: short_id(),
            source: source.into(),
            requester: requester.into(),
            connection_id: connection_id.into(),
            target,
        }
    }

    pub fn level(&self) -> LockLevel {
        self.target.level()
    }

    /// `source:requester:connection_id`
    pub fn signature(&self) -> String {
        format!("{}:{}:{}", self.source, self.requester, self.connection_id)
    }

    pub fn belongs_to(&self, signature: &str) -> bool {
        self.signature() == signature
    }

    /// True if `existing` blocks this lock from being taken by someone else
    pub fn is_restricted_by(&self, existing: &ConnectionLock) -> bool {
        existing.target.covers(&self.target) || self.target.covers(&existing.target)
    }

    /// Locks table row
    pub fn to_record(&self) -> Record {
        let mut row = record([
            (Self::ID, Value::from(&self.id)),
            (Self::SOURCE, Value::from(&self.source)),
            (Self::REQUESTER, Value::from(&self.requester)),
            (Self::CONNECTION, Value::from(&self.connection_id)),
        ]);
        row.insert(Self::DATABASE.to_string(), self.target.database.clone().into());
        row.insert(Self::TABLE.to_string(), self.target.table.clone().into());
        row.insert(Self::RECORD_KEY.to_string(), self.target.record_key.clone().into());
        row
    }

    pub fn from_record(row: &Record) -> Result<Self> {
        let text = |field: &str| row.get(field).and_then(Value::to_text);
        let required = |field: &str| {
            text(field).ok_or_else(|| FlatError::Format(format!("lock row has no {}", field)))
        };

        Ok(Self {
            id: required(Self::ID)?,
            source: required(Self::SOURCE)?,
            requester: required(Self::REQUESTER)?,
            connection_id: required(Self::CONNECTION)?,
            target: LockTarget::from_parts(
                text(Self::DATABASE),
                text(Self::TABLE),
                text(Self::RECORD_KEY),
            )?,
        })
    }
}

impl fmt::Display for ConnectionLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<ConnectionLock id:\"{}\" sig:\"{}\" locking:\"{}\">",
            self.id,
            self.signature(),
            self.target
        )
    }
}

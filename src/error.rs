//! Error types for flatdb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::connection::ConnectionLock;

/// Result type alias using FlatError
pub type Result<T> = std::result::Result<T, FlatError>;

/// Unified error type for flatdb operations
#[derive(Debug, Error)]
pub enum FlatError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout: {0}")]
    Timeout(String),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// The data file has no store header line.
    #[error("Datastore does not have a type definition")]
    MissingHeader,

    #[error("Format error: {0}")]
    Format(String),

    #[error("Requested datastore {requested} does not match existing {existing}")]
    Incompatible { requested: String, existing: String },

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    // -------------------------------------------------------------------------
    // Lock Conflicts
    // -------------------------------------------------------------------------
    /// Another connection holds a lock covering the requested scope.
    #[error("Access restricted: {requested} is restricted by {existing}")]
    AccessRestricted {
        requested: Box<ConnectionLock>,
        existing: Box<ConnectionLock>,
    },

    /// This connection already holds an unrelated lock.
    #[error("Access restricted: {requested} conflicts with this connection's lock {existing}")]
    AccessRestrictedByExistingLock {
        requested: Box<ConnectionLock>,
        existing: Box<ConnectionLock>,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlatError {
    /// True for both lock conflict variants
    pub fn is_lock_conflict(&self) -> bool {
        matches!(
            self,
            FlatError::AccessRestricted { .. } | FlatError::AccessRestrictedByExistingLock { .. }
        )
    }

    /// True for integrity failures (duplicates, missing entities)
    pub fn is_integrity(&self) -> bool {
        matches!(self, FlatError::Integrity(_))
    }
}

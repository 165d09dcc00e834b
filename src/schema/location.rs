//! Store identity
//!
//! Path, format version and encoding of a data file. Two stores are
//! compatible only when version and encoding match exactly.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::FlatError;

/// Store type name written into the header
pub const STORE_TYPE: &str = "txt";

/// `major.minor` format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for FormatVersion {
    type Err = FlatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FlatError::Format(format!("invalid format version \"{}\"", s));

        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// Identity of a data file
#[derive(Debug, Clone, Serialize)]
pub struct StoreLocation {
    path: PathBuf,
    version: FormatVersion,
    encoding: String,
}

impl StoreLocation {
    pub fn new(path: impl Into<PathBuf>, version: FormatVersion, encoding: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version,
            encoding: encoding.into().to_uppercase(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Sentinel lock file: `<stem>.lock` next to the data file
    pub fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Version and encoding match; the recorded path is informational
    pub fn is_compatible(&self, other: &StoreLocation) -> bool {
        self.version == other.version && self.encoding.eq_ignore_ascii_case(&other.encoding)
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<StoreLocation path:{} version:{} encoding:{}>",
            self.path.display(),
            self.version,
            self.encoding
        )
    }
}

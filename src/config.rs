//! Configuration for flatdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{FlatError, Result};
use crate::schema::{FormatVersion, StoreLocation};

/// The only text encoding the line store reads and writes
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Main configuration for a flatdb connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Data file holding every database, table and record.
    /// The sentinel lock file lives next to it:
    ///   {dir}/
    ///     ├── {stem}.txt       (data file)
    ///     └── {stem}.lock      (sentinel, exists only while locked)
    pub path: PathBuf,

    /// Format version written to (and expected in) the store header
    pub version: FormatVersion,

    /// Text encoding name written to (and expected in) the store header
    pub encoding: String,

    // -------------------------------------------------------------------------
    // Sentinel Lock Configuration
    // -------------------------------------------------------------------------
    /// Max time to wait on the sentinel or on file I/O (milliseconds)
    pub io_timeout_ms: u64,

    /// First sleep between sentinel polls (milliseconds)
    pub poll_interval_ms: u64,

    /// Upper bound for the doubling poll sleep (milliseconds)
    pub max_poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Connection Identity
    // -------------------------------------------------------------------------
    /// Requester recorded in lock rows
    pub requester: String,

    /// Source host recorded in lock rows
    pub source: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./flatdb.txt"),
            version: FormatVersion::default(),
            encoding: DEFAULT_ENCODING.to_string(),
            io_timeout_ms: 10_000,
            poll_interval_ms: 5,
            max_poll_interval_ms: 100,
            requester: "flatdb".to_string(),
            source: default_source(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Store identity used for header checks
    pub fn location(&self) -> StoreLocation {
        StoreLocation::new(self.path.clone(), self.version, self.encoding.clone())
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms))
    }

    /// Reject settings the store cannot honor
    pub fn validate(&self) -> Result<()> {
        if !self.encoding.eq_ignore_ascii_case(DEFAULT_ENCODING)
            && !self.encoding.eq_ignore_ascii_case("UTF8")
        {
            return Err(FlatError::Config(format!(
                "unsupported encoding \"{}\" (only {} is supported)",
                self.encoding, DEFAULT_ENCODING
            )));
        }
        if self.io_timeout_ms == 0 {
            return Err(FlatError::Config("io_timeout_ms must be greater than zero".to_string()));
        }
        if self.path.as_os_str().is_empty() {
            return Err(FlatError::Config("data file path is empty".to_string()));
        }
        if self.requester.trim().is_empty() {
            return Err(FlatError::Config("requester is empty".to_string()));
        }
        Ok(())
    }
}

/// Host name from the environment, lower-cased
fn default_source() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .map(|host| host.to_lowercase())
        .ok()
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the format version
    pub fn version(mut self, version: FormatVersion) -> Self {
        self.config.version = version;
        self
    }

    /// Set the text encoding name
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.config.encoding = encoding.into();
        self
    }

    /// Set the sentinel/I/O timeout (in milliseconds)
    pub fn io_timeout_ms(mut self, ms: u64) -> Self {
        self.config.io_timeout_ms = ms;
        self
    }

    /// Set the initial sentinel poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the maximum sentinel poll interval (in milliseconds)
    pub fn max_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.max_poll_interval_ms = ms;
        self
    }

    /// Set the requester name (stored lower-cased)
    pub fn requester(mut self, requester: impl Into<String>) -> Self {
        self.config.requester = requester.into().to_lowercase();
        self
    }

    /// Set the source host name (stored lower-cased)
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.config.source = source.into().to_lowercase();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

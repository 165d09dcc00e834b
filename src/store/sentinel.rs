//! Sentinel lock file
//!
//! A zero-byte file next to the data file. Its existence means some session
//! is reading-for-write or writing the data file; content is unused.
//! Creation uses `create_new`, so two processes can never both own it.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{FlatError, Result};

/// Timeout and backoff used while polling the filesystem
#[derive(Debug, Clone, Copy)]
pub struct PollTiming {
    pub timeout: Duration,
    pub initial: Duration,
    pub max: Duration,
}

impl PollTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.io_timeout(),
            initial: config.poll_interval(),
            max: config.max_poll_interval(),
        }
    }

    /// Retry `op` with doubling sleeps until it succeeds or the timeout elapses.
    ///
    /// Every error is treated as a transient I/O race; the last one is
    /// reported inside the timeout error.
    pub fn retry<T>(&self, what: &str, mut op: impl FnMut() -> std::io::Result<T>) -> Result<T> {
        let started = Instant::now();
        let mut delay = self.initial;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if started.elapsed() >= self.timeout {
                        warn!(what, error = %e, "giving up after {:?}", self.timeout);
                        return Err(FlatError::Timeout(format!("{} timeout: {}", what, e)));
                    }
                    thread::sleep(delay);
                    delay = (delay * 2).min(self.max);
                }
            }
        }
    }
}

impl Default for PollTiming {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Owned sentinel lock; removed on release or drop
#[derive(Debug)]
pub struct Sentinel {
    path: PathBuf,
    timing: PollTiming,
    released: bool,
}

impl Sentinel {
    /// Create the sentinel, polling while someone else owns it
    pub fn acquire(path: &Path, timing: PollTiming) -> Result<Self> {
        let started = Instant::now();
        let mut delay = timing.initial;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(_) => {
                    debug!(path = %path.display(), "+lock");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        timing,
                        released: false,
                    });
                }
                Err(e) => {
                    if started.elapsed() >= timing.timeout {
                        warn!(path = %path.display(), error = %e, "sentinel acquire timed out");
                        return Err(FlatError::Timeout(format!(
                            "could not acquire lock \"{}\" within {:?}",
                            path.display(),
                            timing.timeout
                        )));
                    }
                    if e.kind() != ErrorKind::AlreadyExists {
                        debug!(path = %path.display(), error = %e, "sentinel create failed, retrying");
                    }
                    thread::sleep(delay);
                    delay = (delay * 2).min(timing.max);
                }
            }
        }
    }

    /// Block until nobody owns the sentinel, without taking it
    pub fn wait_for_release(path: &Path, timing: PollTiming) -> Result<()> {
        let started = Instant::now();
        let mut delay = timing.initial;
        while path.exists() {
            if started.elapsed() >= timing.timeout {
                warn!(path = %path.display(), "wait for unlock timed out");
                return Err(FlatError::Timeout("Wait for unlock timeout.".to_string()));
            }
            thread::sleep(delay);
            delay = (delay * 2).min(timing.max);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the sentinel; a sentinel that already vanished counts as released
    pub fn release(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        let path = self.path.clone();
        self.timing.retry("release lock", || match fs::remove_file(&path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "? missing lock");
                Ok(())
            }
            other => other,
        })?;
        self.released = true;
        debug!(path = %self.path.display(), "-lock");
        Ok(())
    }
}

impl Drop for Sentinel {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            error!(path = %self.path.display(), error = %e, "failed to release sentinel lock");
        }
    }
}

//! Connection tests
//!
//! - crud: the public API end to end on one connection
//! - locks: lock rows, the restriction hierarchy and block transactions
//! - concurrency: several connections writing the same file

mod crud_tests;

use std::path::Path;

use flatdb::{Config, Connection};

/// Connection on `path` with short sentinel polling
pub fn connect(path: &Path) -> Connection {
    Connection::open(config(path)).unwrap()
}

pub fn config(path: &Path) -> Config {
    Config::builder()
        .path(path)
        .io_timeout_ms(5_000)
        .poll_interval_ms(1)
        .max_poll_interval_ms(10)
        .requester("tester")
        .source("testhost")
        .build()
}

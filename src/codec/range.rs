//! Line ranges
//!
//! Entities are stored contiguously: a store range covers every database
//! range, which covers its table ranges, which cover their records.
//! An entity's range starts at its own definition line and ends right before
//! the next definition line of the same kind (or the end of the enclosing
//! range).

use super::token::{find_token, split_key_value};
use super::escape::decode_value;
use crate::schema::STORE_TYPE;

/// Inclusive `[first, last]` window over the line list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRange {
    pub first: usize,
    pub last: usize,
    /// Total number of lines the range was computed over
    pub total: usize,
}

impl EntryRange {
    /// Range over all `total` lines; `None` when there are no lines
    pub fn full(total: usize) -> Option<Self> {
        (total > 0).then(|| Self {
            first: 0,
            last: total - 1,
            total,
        })
    }

    pub fn count(&self) -> usize {
        self.last - self.first + 1
    }

    /// Index right after the range, where new children are inserted
    pub fn end(&self) -> usize {
        self.last + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.first..=self.last).contains(&index)
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// Find the range of the entity whose `@tag(...)` payload satisfies `is_target`
fn extract_range<L: AsRef<str>>(
    lines: &[L],
    tag: &str,
    is_target: impl Fn(&str) -> bool,
    within: EntryRange,
) -> Option<EntryRange> {
    let mut first: Option<usize> = None;
    let mut last = within.first;

    for index in within.indices() {
        let line = lines.get(index)?.as_ref();
        match find_token(line, tag) {
            Some(payload) if first.is_none() && is_target(payload) => {
                first = Some(index);
                last = index;
            }
            // next entity of the same kind closes the range
            Some(_) if first.is_some() => break,
            _ => {
                if first.is_some() {
                    last = index;
                }
            }
        }
    }

    first.map(|first| EntryRange {
        first,
        last,
        total: lines.len(),
    })
}

/// Range from the store header line to the end of the file
pub fn store_range<L: AsRef<str>>(lines: &[L]) -> Option<EntryRange> {
    let all = EntryRange::full(lines.len())?;
    extract_range(lines, "datastore", |payload| decode_value(payload) == STORE_TYPE, all)
}

/// Range of database `db_name` inside the store range
pub fn database_range<L: AsRef<str>>(lines: &[L], db_name: &str) -> Option<EntryRange> {
    let store = store_range(lines)?;
    extract_range(lines, "db", |payload| split_key_value(payload).0 == db_name, store)
}

/// Range of table `table_name` inside database `db_name`
pub fn table_range<L: AsRef<str>>(lines: &[L], db_name: &str, table_name: &str) -> Option<EntryRange> {
    let db = database_range(lines, db_name)?;
    extract_range(lines, "table", |payload| split_key_value(payload).0 == table_name, db)
}

//! Line Store tests
//!
//! - merge: the commit-time decision table on in-memory lines
//! - line_store: sessions over a real data file and its sentinel

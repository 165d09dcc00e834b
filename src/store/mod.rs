//! Line Store Module
//!
//! The data file as an ordered list of tagged lines.
//!
//! ## Responsibilities
//! - Own the data file and its sentinel lock file
//! - Track how each line changed in the current session
//! - Reconcile session edits with the on-disk state at commit time
//!
//! ## Commit Sequence
//! ```text
//!   session lines (mine)          data file (base)
//!          │                            │
//!          │      acquire sentinel      │
//!          │ ◄──────── re-read ──────── │
//!          ▼                            │
//!      merge(base, mine) ──── write ──► │
//!                 release sentinel
//! ```
//!
//! Sessions opened exclusively hold the sentinel from open to commit, so
//! nobody else reads or writes in between. Non-exclusive sessions only wait
//! for the sentinel to disappear before reading and rely on the merge.

mod file;
mod line;
mod merge;
mod sentinel;

pub use file::LineStore;
pub use line::{CommitIntent, Line};
pub use merge::merge;
pub use sentinel::{PollTiming, Sentinel};

//! Tagged data lines

use std::fmt;

/// How a line changed in the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitIntent {
    /// Unchanged since load
    Read,
    /// New in this session
    Created,
    /// Replaces a line that was loaded
    Updated,
    /// Logically removed; omitted on the next write
    Dropped,
}

impl CommitIntent {
    /// Created or Updated
    pub fn is_edit(&self) -> bool {
        matches!(self, CommitIntent::Created | CommitIntent::Updated)
    }

    /// Read or Dropped
    pub fn is_passive(&self) -> bool {
        matches!(self, CommitIntent::Read | CommitIntent::Dropped)
    }

    fn marker(&self) -> char {
        match self {
            CommitIntent::Read => ' ',
            CommitIntent::Created => '+',
            CommitIntent::Updated => '*',
            CommitIntent::Dropped => '-',
        }
    }
}

/// One line of the data file plus its commit intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub contents: String,
    pub intent: CommitIntent,
    /// Text as loaded from disk, kept once the line is updated
    pub(crate) original: Option<String>,
}

impl Line {
    pub fn new(contents: impl Into<String>, intent: CommitIntent) -> Self {
        Self {
            contents: contents.into(),
            intent,
            original: None,
        }
    }

    /// A line as loaded from disk
    pub fn read(contents: impl Into<String>) -> Self {
        Self::new(contents, CommitIntent::Read)
    }

    pub fn created(contents: impl Into<String>) -> Self {
        Self::new(contents, CommitIntent::Created)
    }

    pub fn updated(contents: impl Into<String>) -> Self {
        Self::new(contents, CommitIntent::Updated)
    }

    pub fn dropped(contents: impl Into<String>) -> Self {
        Self::new(contents, CommitIntent::Dropped)
    }

    pub fn is_dropped(&self) -> bool {
        self.intent == CommitIntent::Dropped
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.contents
    }
}

impl fmt::Display for Line {
    /// Diff-style: `+ created`, `* updated`, `- dropped`, `  read`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.intent.marker(), self.contents)
    }
}

//! File-backed line store

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::schema::StoreLocation;

use super::{merge, CommitIntent, Line, PollTiming, Sentinel};

/// One session over the data file
///
/// Edits address lines by their index among the *live* lines (everything
/// not dropped in this session), which is the view the codec works on.
/// Nothing touches the disk until [`LineStore::commit`].
pub struct LineStore {
    location: StoreLocation,
    timing: PollTiming,
    lines: Vec<Line>,
    /// Held from open to commit for exclusive sessions, only during commit otherwise
    sentinel: Option<Sentinel>,
}

impl LineStore {
    /// Open a session, creating an empty data file if there is none
    ///
    /// - `exclusive`: take the sentinel now and hold it until commit
    /// - otherwise: wait until nobody holds the sentinel, then read
    pub fn open(location: &StoreLocation, timing: PollTiming, exclusive: bool) -> Result<Self> {
        ensure_file(location.path())?;

        let sentinel = if exclusive {
            debug!(path = %location.path().display(), "open exclusive");
            Some(Sentinel::acquire(&location.lock_path(), timing)?)
        } else {
            debug!(path = %location.path().display(), "open");
            Sentinel::wait_for_release(&location.lock_path(), timing)?;
            None
        };

        let lines = read_lines(location.path(), timing)?;

        Ok(Self {
            location: location.clone(),
            timing,
            lines,
            sentinel,
        })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn is_exclusive(&self) -> bool {
        self.sentinel.is_some()
    }

    /// All lines including the ones dropped in this session
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Contents of the lines that are not dropped, in file order
    pub fn live(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|line| !line.is_dropped())
            .map(|line| line.contents.as_str())
            .collect()
    }

    /// True if any line was created, updated or dropped
    pub fn is_modified(&self) -> bool {
        self.lines.iter().any(|line| line.intent != CommitIntent::Read)
    }

    /// Insert a new line before live line `index` (or at the end)
    pub fn insert(&mut self, index: usize, contents: impl Into<String>) {
        let at = self.physical_index(index).unwrap_or(self.lines.len());
        self.lines.insert(at, Line::created(contents));
    }

    /// Replace live line `index`; `false` if there is no such line
    pub fn replace(&mut self, index: usize, contents: impl Into<String>) -> bool {
        let Some(at) = self.physical_index(index) else {
            return false;
        };
        let line = &mut self.lines[at];
        match line.intent {
            // a line created in this session stays a creation
            CommitIntent::Created => line.contents = contents.into(),
            _ => {
                let loaded = std::mem::replace(&mut line.contents, contents.into());
                if line.original.is_none() {
                    line.original = Some(loaded);
                }
                line.intent = CommitIntent::Updated;
            }
        }
        true
    }

    /// Drop live line `index`; `false` if there is no such line
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(at) = self.physical_index(index) else {
            return false;
        };
        if self.lines[at].intent == CommitIntent::Created {
            // never reached the disk
            self.lines.remove(at);
        } else {
            // drop what the file holds, not the pending replacement
            let line = &mut self.lines[at];
            if let Some(loaded) = line.original.take() {
                line.contents = loaded;
            }
            line.intent = CommitIntent::Dropped;
        }
        true
    }

    /// Merge this session into the data file and release the sentinel
    ///
    /// Sessions without edits write nothing and never take the sentinel.
    pub fn commit(mut self) -> Result<()> {
        if !self.is_modified() {
            return self.discard();
        }
        debug!(path = %self.location.path().display(), "commit");

        let sentinel = match self.sentinel.take() {
            Some(sentinel) => sentinel,
            None => Sentinel::acquire(&self.location.lock_path(), self.timing)?,
        };

        let base = read_lines(self.location.path(), self.timing)?;
        let merged = merge(&base, &self.lines);
        debug!(
            base = base.len(),
            mine = self.lines.len(),
            merged = merged.len(),
            "auto resolve merge"
        );
        write_lines(self.location.path(), &merged, self.timing)?;

        sentinel.release()
    }

    /// End the session without writing; releases the sentinel if held
    pub fn discard(mut self) -> Result<()> {
        match self.sentinel.take() {
            Some(sentinel) => sentinel.release(),
            None => Ok(()),
        }
    }

    fn physical_index(&self, live_index: usize) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.is_dropped())
            .nth(live_index)
            .map(|(at, _)| at)
    }
}

fn ensure_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

fn read_lines(path: &Path, timing: PollTiming) -> Result<Vec<Line>> {
    debug!(path = %path.display(), "read");
    let contents = timing.retry("read", || fs::read_to_string(path))?;
    Ok(contents.lines().map(Line::read).collect())
}

/// Write through a temp file and rename over the data file
fn write_lines(path: &Path, lines: &[Line], timing: PollTiming) -> Result<()> {
    debug!(path = %path.display(), lines = lines.len(), "write");

    let contents = lines
        .iter()
        .map(|line| line.contents.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));

    timing.retry("write", || {
        let mut tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, path)
    })
}

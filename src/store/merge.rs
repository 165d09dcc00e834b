//! Commit-time merge
//!
//! Reconciles the data file as it is now (`base`) with the lines of a
//! session whose edits are tagged with their intent (`mine`). Pure: no I/O.
//!
//! ## Decision Table
//!
//! `M` is the current mine line, `B` the current base line, cursors advance
//! as `(mine, base)`.
//!
//! ```text
//!  M == B                          keep M once (unless M is dropped)  (+1, +1)
//!  M != B, M later in base         keep B as created                  ( 0, +1)
//!  M != B, B later in mine, M r/d  drop M                             (+1,  0)
//!  M != B, B later in mine, M c/u  keep M as created                  (+1,  0)
//!  M != B, M read/dropped          keep B, drop M                     (+1, +1)
//!  M != B, M created               keep B, keep M                     (+1, +1)
//!  M != B, M updated               drop B, keep M                     (+1, +1)
//! ```
//!
//! When base runs out, only created/updated mine lines survive. When mine
//! runs out, the rest of base is kept as-is.

use std::collections::HashMap;

use super::{CommitIntent, Line};

/// Multiset of the line contents still ahead of a cursor
struct Remaining<'a> {
    counts: HashMap<&'a str, usize>,
}

impl<'a> Remaining<'a> {
    fn new(lines: &'a [Line]) -> Self {
        let mut counts = HashMap::with_capacity(lines.len());
        for line in lines {
            *counts.entry(line.contents.as_str()).or_insert(0) += 1;
        }
        Self { counts }
    }

    fn contains(&self, contents: &str) -> bool {
        self.counts.get(contents).is_some_and(|&count| count > 0)
    }

    /// Called when the cursor moves past a line
    fn pass(&mut self, contents: &str) {
        if let Some(count) = self.counts.get_mut(contents) {
            *count = count.saturating_sub(1);
        }
    }
}

/// Merge `mine` into `base`; the result never contains dropped lines
pub fn merge(base: &[Line], mine: &[Line]) -> Vec<Line> {
    let mut merged: Vec<Line> = Vec::with_capacity(base.len().max(mine.len()));

    let mut base_ahead = Remaining::new(base);
    let mut mine_ahead = Remaining::new(mine);

    let (mut b, mut m) = (0usize, 0usize);

    loop {
        match (base.get(b), mine.get(m)) {
            (None, None) => break,

            // base ended: whatever mine did not create or update is gone on disk
            (None, Some(mine_line)) => {
                if mine_line.intent.is_edit() {
                    merged.push(mine_line.clone());
                }
                m += 1;
            }

            // mine ended: keep the rest of base
            (Some(base_line), None) => {
                merged.push(base_line.clone());
                b += 1;
            }

            (Some(base_line), Some(mine_line)) if base_line.contents == mine_line.contents => {
                let intent = match mine_line.intent {
                    CommitIntent::Dropped => CommitIntent::Dropped,
                    _ => CommitIntent::Read,
                };
                merged.push(Line::new(mine_line.contents.clone(), intent));
                base_ahead.pass(&base_line.contents);
                mine_ahead.pass(&mine_line.contents);
                b += 1;
                m += 1;
            }

            (Some(base_line), Some(mine_line)) => {
                let mine_in_base = base_ahead.contains(&mine_line.contents);
                let base_in_mine = mine_ahead.contains(&base_line.contents);

                if mine_in_base {
                    // someone else inserted the base line before ours
                    merged.push(Line::created(base_line.contents.clone()));
                    base_ahead.pass(&base_line.contents);
                    b += 1;
                } else if base_in_mine && mine_line.intent.is_passive() {
                    // someone else deleted our line
                    merged.push(Line::dropped(mine_line.contents.clone()));
                    mine_ahead.pass(&mine_line.contents);
                    m += 1;
                } else if base_in_mine && mine_line.intent.is_edit() {
                    merged.push(Line::created(mine_line.contents.clone()));
                    mine_ahead.pass(&mine_line.contents);
                    m += 1;
                } else {
                    match mine_line.intent {
                        CommitIntent::Read | CommitIntent::Dropped => {
                            merged.push(Line::dropped(mine_line.contents.clone()));
                            merged.push(Line::created(base_line.contents.clone()));
                        }
                        // concurrent unrelated inserts are both kept
                        CommitIntent::Created => {
                            merged.push(Line::created(base_line.contents.clone()));
                            merged.push(Line::created(mine_line.contents.clone()));
                        }
                        // update wins over whatever sits in its place on disk
                        CommitIntent::Updated => {
                            merged.push(Line::dropped(base_line.contents.clone()));
                            merged.push(Line::created(mine_line.contents.clone()));
                        }
                    }
                    base_ahead.pass(&base_line.contents);
                    mine_ahead.pass(&mine_line.contents);
                    b += 1;
                    m += 1;
                }
            }
        }
    }

    merged.retain(|line| !line.is_dropped());
    merged
}

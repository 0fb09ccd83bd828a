//! Segment writer: scoped accumulation of freshly fetched samples
//!
//! One writer lives for one gap fetch. Samples stream through `write`,
//! landing in a temp file inside the channel's cache directory; `finish`
//! renames and commits the file into the index, or deletes it if nothing
//! was ever written. The writer also decides, sample by sample, which
//! existing interval group the data belongs to.
//!
//! The merge policy is deliberately approximate: a writer never fuses two
//! pre-existing groups, even when one incoming stream spans both. It only
//! creates new groups or extends exactly one existing group over its
//! lifetime. Fusing would need index-level support and is out of scope.

use crate::cache::error::CacheResult;
use crate::cache::manager::RawCacheManager;
use crate::cache::types::IntervalGroup;
use crate::time::Timestamp;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;

/// What `write` did with a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The sample was new and appended to the current temp file.
    Appended,
    /// The sample already lies inside a cached group; nothing was written.
    Redundant,
}

/// Accumulates one fetch operation's output into durable storage.
pub struct SegmentWriter {
    file: Option<BufWriter<NamedTempFile>>,
    /// Existing group this writer's data folds into on commit, once one
    /// has been encountered.
    group: Option<IntervalGroup>,
    first: Option<Timestamp>,
    last: Option<Timestamp>,
}

impl SegmentWriter {
    /// Open a writer with a fresh temp file in the manager's cache dir.
    pub fn open(cm: &RawCacheManager) -> CacheResult<Self> {
        Ok(Self {
            file: Some(BufWriter::new(cm.create_temp_file()?)),
            group: None,
            first: None,
            last: None,
        })
    }

    /// Route one sample.
    ///
    /// - Not in any cached group: append it to the temp file.
    /// - In the group this writer already tracks: redundant, skip.
    /// - In a different group than tracked: commit the current file (if
    ///   non-empty), start a fresh one, and track the newly found group, so
    ///   a following truly-new stretch starts its own clean segment.
    pub fn write(
        &mut self,
        cm: &mut RawCacheManager,
        stamp: Timestamp,
        values: &[f64],
    ) -> CacheResult<WriteOutcome> {
        match cm.group_for(stamp) {
            None => {
                // The file is only ever absent mid-transition inside
                // commit_current, never across calls.
                let file = self.file.as_mut().expect("writer has an open file");
                let mut line = stamp.to_iso();
                for value in values {
                    line.push('\t');
                    line.push_str(&format!("{:.9}", value));
                }
                line.push('\n');
                file.write_all(line.as_bytes())?;
                if self.first.is_none() {
                    self.first = Some(stamp);
                }
                self.last = Some(stamp);
                Ok(WriteOutcome::Appended)
            }
            Some(found) => {
                let same = self
                    .group
                    .as_ref()
                    .map(|g| g.span() == found.span())
                    .unwrap_or(false);
                if !same {
                    if self.group.is_some() {
                        // Stream moved from one cached region to another:
                        // close out the data gathered so far against the
                        // old group before re-associating.
                        self.commit_current(cm)?;
                        self.file = Some(BufWriter::new(cm.create_temp_file()?));
                        self.first = None;
                        self.last = None;
                    }
                    self.group = Some(found);
                }
                Ok(WriteOutcome::Redundant)
            }
        }
    }

    /// Commit the current file if it holds samples, or drop it (deleting
    /// the temp file) if it is empty.
    fn commit_current(&mut self, cm: &mut RawCacheManager) -> CacheResult<()> {
        let file = match self.file.take() {
            Some(file) => file,
            None => return Ok(()),
        };
        let temp = file
            .into_inner()
            .map_err(|e| crate::cache::error::CacheError::Io(e.into_error()))?;

        match (self.first, self.last) {
            (Some(first), Some(last)) => {
                cm.commit_segment(temp, first, last, self.group.as_ref())
            }
            _ => {
                // Zero samples written: NamedTempFile removes itself on drop.
                drop(temp);
                Ok(())
            }
        }
    }

    /// Close the writer: commit or discard per the scoped-resource
    /// contract. Consumes the writer; there is nothing to reuse after.
    pub fn finish(mut self, cm: &mut RawCacheManager) -> CacheResult<()> {
        self.commit_current(cm)
    }
}

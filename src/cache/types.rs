//! Core data types for the raw cache
//!
//! - `Sample`: one archive measurement, timestamp plus value fields
//! - `SegmentEntry`: one immutable on-disk segment file
//! - `IntervalGroup`: a contiguous cached span backed by segment files

use crate::time::Timestamp;

/// A single archive sample: a nanosecond instant and one or more value
/// fields. Duplicate timestamps are permitted and never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub stamp: Timestamp,
    pub values: Vec<f64>,
}

impl Sample {
    pub fn new(stamp: Timestamp, values: Vec<f64>) -> Self {
        Self { stamp, values }
    }
}

/// One on-disk segment file: samples in strictly ascending time order,
/// bounded by the first and last sample timestamps. Immutable once
/// committed; the file is renamed exactly once (temp to final name) and
/// never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentEntry {
    // Field order drives the derived ordering: (start, end) first.
    pub start: Timestamp,
    pub end: Timestamp,
    pub name: String,
}

impl SegmentEntry {
    pub fn new(name: impl Into<String>, start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            name: name.into(),
        }
    }
}

/// One contiguous, gap-covered span of cached time, backed by one or more
/// segment files.
///
/// Invariants, maintained by the cache manager:
/// - `start`/`end` are the min/max over `files`
/// - files are sorted by `(start, end)` and assumed non-overlapping (an
///   assumption inherited from the committing path, not re-verified here)
/// - groups in an index are non-overlapping and sorted by `(start, end)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IntervalGroup {
    pub start: Timestamp,
    pub end: Timestamp,
    pub files: Vec<SegmentEntry>,
}

impl IntervalGroup {
    /// Build a group from its files, recomputing the span and sorting.
    /// Returns `None` for an empty file list, which has no span.
    pub fn from_files(mut files: Vec<SegmentEntry>) -> Option<Self> {
        if files.is_empty() {
            return None;
        }
        files.sort();
        let start = files.iter().map(|f| f.start).min()?;
        let end = files.iter().map(|f| f.end).max()?;
        Some(Self { start, end, files })
    }

    /// Whether this instant falls within the group's span (inclusive both
    /// ends, matching the sample timestamps that define the span).
    pub fn contains(&self, stamp: Timestamp) -> bool {
        self.start <= stamp && stamp <= self.end
    }

    /// The `(start, end)` pair that identifies this group within an index.
    pub fn span(&self) -> (Timestamp, Timestamp) {
        (self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(n: i64) -> Timestamp {
        Timestamp::from_nanos(n)
    }

    #[test]
    fn test_group_from_files_computes_span() {
        let group = IntervalGroup::from_files(vec![
            SegmentEntry::new("b", ts(50), ts(90)),
            SegmentEntry::new("a", ts(10), ts(40)),
        ])
        .unwrap();

        assert_eq!(group.start, ts(10));
        assert_eq!(group.end, ts(90));
        assert_eq!(group.files[0].name, "a");
        assert_eq!(group.files[1].name, "b");
    }

    #[test]
    fn test_group_from_empty_files() {
        assert!(IntervalGroup::from_files(vec![]).is_none());
    }

    #[test]
    fn test_group_contains_is_inclusive() {
        let group =
            IntervalGroup::from_files(vec![SegmentEntry::new("a", ts(10), ts(40))]).unwrap();

        assert!(group.contains(ts(10)));
        assert!(group.contains(ts(25)));
        assert!(group.contains(ts(40)));
        assert!(!group.contains(ts(9)));
        assert!(!group.contains(ts(41)));
    }
}

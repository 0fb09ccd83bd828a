//! External archive source contract
//!
//! The cache sits in front of an archive data source: a local export tool or
//! a remote archive server. Either way, the cache only needs one operation —
//! produce the samples for a channel over a time range, lazily and in
//! ascending time order. Everything protocol-specific stays behind this
//! trait.

use crate::cache::Sample;
use crate::time::Timestamp;
use thiserror::Error;

/// Errors produced by an archive source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The retrieval itself failed (server error, bad response, export tool
    /// failure)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// I/O failure talking to the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// A lazy, forward-only, finite run of samples. Not restartable: consuming
/// it is a one-way trip, and re-reading a range means calling
/// [`Source::retrieve`] again.
pub type SampleIter<'a> = Box<dyn Iterator<Item = SourceResult<Sample>> + 'a>;

/// An archive data source.
///
/// Implementations must yield samples in ascending time order covering the
/// requested `[start, end]` range. The cache assumes but does not re-verify
/// this ordering.
pub trait Source {
    /// The site this source serves. Used as the first component of the
    /// on-disk cache layout, so two sites never share cached data.
    fn site(&self) -> &str;

    /// Retrieve samples for `channel` in `database` over `[start, end]`.
    fn retrieve(
        &self,
        database: &str,
        channel: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> SourceResult<SampleIter<'_>>;
}

//! Local raw cache: interval index, segment storage, write-back
//!
//! Cached data for a channel lives as immutable segment files grouped into
//! contiguous interval groups, tracked by a JSON index per channel
//! directory. The submodules split along those lines:
//!
//! - `types`: samples, segment entries, interval groups
//! - `index`: pure intersection/difference algebra over a sorted index
//! - `manager`: on-disk layout, index persistence, segment commit, replay
//! - `writer`: scoped accumulation of one fetch into a segment file
//! - `error`: the cache error taxonomy

pub mod error;
pub mod index;
pub mod manager;
pub mod types;
pub mod writer;

pub use error::{CacheError, CacheResult};
pub use manager::{RawCacheManager, Replay};
pub use types::{IntervalGroup, Sample, SegmentEntry};
pub use writer::{SegmentWriter, WriteOutcome};

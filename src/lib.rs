//! # GEA Cache
//!
//! A local read-through cache for retrieving raw time series from a
//! telescope engineering archive. Queries go through [`DataManager`]:
//! time ranges already on disk replay from local segment files, uncovered
//! gaps are fetched from the configured [`Source`] and written back, and
//! the caller sees one lazy, time-ordered sample stream either way.
//!
//! ## Example
//!
//! ```no_run
//! use gea_cache::{CacheConfig, DataManager, GetDataOptions};
//! # use gea_cache::source::{SampleIter, Source, SourceResult};
//! # use gea_cache::Timestamp;
//! # struct Archive;
//! # impl Source for Archive {
//! #     fn site(&self) -> &str { "CP" }
//! #     fn retrieve(&self, _: &str, _: &str, _: Timestamp, _: Timestamp)
//! #         -> SourceResult<SampleIter<'_>> { Ok(Box::new(std::iter::empty())) }
//! # }
//! let manager = DataManager::new(Archive, CacheConfig::from_env());
//! let stream = manager.get_data(
//!     "mc:azDemandPos",
//!     1525392000.0,
//!     1525413600.0,
//!     GetDataOptions::default(),
//! )?;
//! for sample in stream {
//!     let sample = sample?;
//!     println!("{} {:?}", sample.stamp, sample.values);
//! }
//! # Ok::<(), gea_cache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod source;
pub mod time;

pub use cache::{CacheError, CacheResult, IntervalGroup, RawCacheManager, Sample, SegmentEntry};
pub use config::CacheConfig;
pub use data::{DataManager, DataStream, GetDataOptions};
pub use source::Source;
pub use time::Timestamp;

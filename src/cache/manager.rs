//! Raw cache manager
//!
//! Owns the on-disk layout and index persistence for one
//! `(root, site, database, channel)` key:
//!
//! ```text
//! root/
//!   <site>/
//!     <database>/
//!       <channel>/
//!         raw/
//!           index.txt                     persisted interval index (JSON)
//!           <iso-start>_<iso-end>         one segment file per committed fetch
//! ```
//!
//! The index is loaded lazily on first access, mutated in memory on every
//! segment commit, and rewritten in full to `index.txt` immediately after
//! each mutation. A single writer/reader per channel directory is assumed;
//! there is no cross-process locking.

use crate::cache::error::{CacheError, CacheResult};
use crate::cache::index;
use crate::cache::types::{IntervalGroup, Sample, SegmentEntry};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Name of the index document inside a channel's `raw/` directory.
const INDEX_FILE: &str = "index.txt";

/// Persisted timestamp: fixed-point decimal seconds as a string, or a plain
/// JSON number left behind by older float-writing producers.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PersistedStamp {
    Decimal(String),
    Float(f64),
}

impl PersistedStamp {
    fn to_timestamp(&self) -> CacheResult<Timestamp> {
        match self {
            PersistedStamp::Decimal(s) => Timestamp::parse_decimal_secs(s).ok_or_else(|| {
                CacheError::Timestamp(format!("unrepresentable index timestamp: {}", s))
            }),
            // Out-of-range floats saturate in from_secs_f64.
            PersistedStamp::Float(f) => Ok(Timestamp::from_secs_f64(*f)),
        }
    }
}

impl From<Timestamp> for PersistedStamp {
    fn from(ts: Timestamp) -> Self {
        PersistedStamp::Decimal(ts.to_decimal_secs())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedFile {
    name: String,
    start: PersistedStamp,
    end: PersistedStamp,
}

#[derive(Serialize, Deserialize)]
struct PersistedGroup {
    /// Human-readable annotation, ignored on load.
    #[serde(rename = "_comment", default)]
    comment: String,
    start: PersistedStamp,
    end: PersistedStamp,
    files: Vec<PersistedFile>,
}

impl PersistedGroup {
    fn from_group(group: &IntervalGroup) -> Self {
        Self {
            comment: format!("Data {} - {}", group.start.to_iso(), group.end.to_iso()),
            start: group.start.into(),
            end: group.end.into(),
            files: group
                .files
                .iter()
                .map(|f| PersistedFile {
                    name: f.name.clone(),
                    start: f.start.into(),
                    end: f.end.into(),
                })
                .collect(),
        }
    }

    fn into_group(self) -> CacheResult<IntervalGroup> {
        let files = self
            .files
            .into_iter()
            .map(|f| {
                Ok(SegmentEntry::new(
                    f.name,
                    f.start.to_timestamp()?,
                    f.end.to_timestamp()?,
                ))
            })
            .collect::<CacheResult<Vec<_>>>()?;
        // Span is recomputed from the files rather than trusted from disk.
        IntervalGroup::from_files(files)
            .ok_or_else(|| CacheError::Index("group entry with no files".to_string()))
    }
}

/// Manages the interval index and segment files for one channel's cache.
pub struct RawCacheManager {
    site: String,
    database: String,
    channel: String,
    cache_dir: PathBuf,
    /// Lazily loaded index. `None` until first access.
    intervals: Option<Vec<IntervalGroup>>,
}

impl RawCacheManager {
    pub fn new(root: &Path, site: &str, database: &str, channel: &str) -> Self {
        let cache_dir = root.join(site).join(database).join(channel).join("raw");
        Self {
            site: site.to_string(),
            database: database.to_string(),
            channel: channel.to_string(),
            cache_dir,
            intervals: None,
        }
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.cache_dir.join(INDEX_FILE)
    }

    /// The current index, loading it from disk on first access.
    pub fn intervals(&mut self, refresh: bool) -> &[IntervalGroup] {
        if self.intervals.is_none() || refresh {
            self.intervals = Some(self.load_index());
        }
        self.intervals.as_deref().unwrap_or(&[])
    }

    /// Read the persisted index. A missing file is the normal first-use
    /// state and yields an empty index; an unreadable or unparseable file
    /// is logged and likewise treated as empty.
    fn load_index(&self) -> Vec<IntervalGroup> {
        let path = self.index_path();
        if !path.exists() {
            return Vec::new();
        }
        match self.read_index_file(&path) {
            Ok(groups) => groups,
            Err(e) => {
                tracing::warn!("Unreadable cache index {:?}, treating as empty: {}", path, e);
                Vec::new()
            }
        }
    }

    fn read_index_file(&self, path: &Path) -> CacheResult<Vec<IntervalGroup>> {
        let content = std::fs::read_to_string(path)?;
        let persisted: Vec<PersistedGroup> = serde_json::from_str(&content)?;
        let mut groups = persisted
            .into_iter()
            .map(PersistedGroup::into_group)
            .collect::<CacheResult<Vec<_>>>()?;
        groups.sort();
        Ok(groups)
    }

    /// Rewrite the full index document. Called after every mutation; there
    /// is no incremental append.
    fn persist_index(&self) -> CacheResult<()> {
        let groups = self.intervals.as_deref().unwrap_or(&[]);
        let persisted: Vec<PersistedGroup> =
            groups.iter().map(PersistedGroup::from_group).collect();

        std::fs::create_dir_all(&self.cache_dir)?;
        let file = File::create(self.index_path())?;
        serde_json::to_writer_pretty(file, &persisted)?;
        Ok(())
    }

    /// Cached groups intersecting `[start, end]`, in time order.
    pub fn intersecting(&mut self, start: Timestamp, end: Timestamp) -> Vec<IntervalGroup> {
        index::intersection(self.intervals(false), start, end)
    }

    /// Sub-ranges of `[start, end]` not covered by the cache.
    pub fn difference(&mut self, start: Timestamp, end: Timestamp) -> Vec<(Timestamp, Timestamp)> {
        index::difference(self.intervals(false), start, end)
    }

    /// The cached group containing `stamp`, if any.
    pub fn group_for(&mut self, stamp: Timestamp) -> Option<IntervalGroup> {
        index::group_containing(self.intervals(false), stamp).cloned()
    }

    /// Whether `stamp` falls inside any cached group.
    pub fn contains(&mut self, stamp: Timestamp) -> bool {
        self.group_for(stamp).is_some()
    }

    /// Deterministic segment file name from its boundary timestamps. Two
    /// non-overlapping segments can only collide if their boundaries match
    /// to the nanosecond.
    pub fn segment_file_name(start: Timestamp, end: Timestamp) -> String {
        format!("{}_{}", start.to_iso(), end.to_iso())
    }

    /// Create a temp file inside the cache directory, so the later rename
    /// to the final segment name never crosses filesystems.
    pub(crate) fn create_temp_file(&self) -> CacheResult<NamedTempFile> {
        std::fs::create_dir_all(&self.cache_dir)?;
        Ok(NamedTempFile::new_in(&self.cache_dir)?)
    }

    /// Register a finished segment into the index.
    ///
    /// The temp file is renamed to its deterministic final name, folded
    /// into `merge_into` (span recomputed, files re-sorted, old group
    /// swapped for new) or wrapped in a new singleton group, and the index
    /// is persisted immediately. The caller guarantees the new segment does
    /// not bridge two existing groups; this is the committing path's
    /// documented assumption.
    pub fn commit_segment(
        &mut self,
        temp: NamedTempFile,
        start: Timestamp,
        end: Timestamp,
        merge_into: Option<&IntervalGroup>,
    ) -> CacheResult<()> {
        let name = Self::segment_file_name(start, end);
        let final_path = self.cache_dir.join(&name);
        temp.persist(&final_path).map_err(|e| CacheError::Io(e.error))?;

        let entry = SegmentEntry::new(name, start, end);
        let mut groups = self.intervals(false).to_vec();

        let new_group = match merge_into {
            Some(target) => {
                match groups.iter().position(|g| g.span() == target.span()) {
                    Some(pos) => {
                        let old = groups.remove(pos);
                        let mut files = old.files;
                        files.push(entry);
                        IntervalGroup::from_files(files).expect("non-empty file list")
                    }
                    None => {
                        // The target vanished from the live index. Single
                        // writer per channel makes this unexpected; keep the
                        // data as its own group rather than dropping it.
                        tracing::warn!(
                            "Merge target {} - {} not in index, committing as new group",
                            target.start,
                            target.end
                        );
                        IntervalGroup::from_files(vec![entry]).expect("non-empty file list")
                    }
                }
            }
            None => IntervalGroup::from_files(vec![entry]).expect("non-empty file list"),
        };

        groups.push(new_group);
        groups.sort();
        self.intervals = Some(groups);
        self.persist_index()?;

        tracing::debug!(
            "Committed segment {} - {} for {}/{}/{}",
            start,
            end,
            self.site,
            self.database,
            self.channel
        );
        Ok(())
    }

    /// Lazily replay a committed group's samples in time order, reading its
    /// segment files one after another. Finite and forward-only; replaying
    /// again means calling this again.
    pub fn replay(&self, group: &IntervalGroup) -> Replay {
        Replay {
            cache_dir: self.cache_dir.clone(),
            files: group.files.iter().cloned().collect(),
            current: None,
        }
    }
}

/// Iterator over a group's samples, file by file, line by line.
///
/// Malformed lines are skipped with a warning; I/O errors propagate and end
/// the iteration.
pub struct Replay {
    cache_dir: PathBuf,
    files: VecDeque<SegmentEntry>,
    current: Option<Lines<BufReader<File>>>,
}

impl Replay {
    fn fail(&mut self, err: CacheError) -> Option<CacheResult<Sample>> {
        self.current = None;
        self.files.clear();
        Some(Err(err))
    }
}

impl Iterator for Replay {
    type Item = CacheResult<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(lines) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match parse_segment_line(&line) {
                            Some(sample) => return Some(Ok(sample)),
                            None => {
                                tracing::warn!("Skipping malformed segment line: {:?}", line);
                                continue;
                            }
                        }
                    }
                    Some(Err(e)) => return self.fail(e.into()),
                    None => {
                        self.current = None;
                        continue;
                    }
                }
            }

            let entry = self.files.pop_front()?;
            match File::open(self.cache_dir.join(&entry.name)) {
                Ok(file) => self.current = Some(BufReader::new(file).lines()),
                Err(e) => return self.fail(e.into()),
            }
        }
    }
}

/// Parse one segment line: an ISO timestamp, then tab-separated values.
fn parse_segment_line(line: &str) -> Option<Sample> {
    let mut fields = line.split_whitespace();
    let stamp = Timestamp::parse_iso(fields.next()?)?;
    let values = fields
        .map(|f| f.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some(Sample::new(stamp, values))
}

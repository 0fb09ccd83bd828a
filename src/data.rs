//! Data manager: the public query facade
//!
//! `DataManager::get_data` answers "give me channel X over [start, end]"
//! by splitting the range into already-cached groups (replayed from disk)
//! and uncovered gaps (fetched from the external source), merged into one
//! lazy, time-ordered sample stream. Freshly fetched samples are teed
//! through a segment writer so the next overlapping query replays them
//! from disk instead of refetching.
//!
//! One `get_data` call runs: Planning → Merging → {Replaying | Fetching}*
//! → Done. No backward transitions; a source failure aborts the whole call
//! after committing whatever the in-flight writer already gathered.

use crate::cache::{
    CacheError, CacheResult, IntervalGroup, RawCacheManager, Replay, Sample, SegmentWriter,
    WriteOutcome,
};
use crate::config::CacheConfig;
use crate::source::{SampleIter, Source};
use crate::time::Timestamp;
use std::collections::VecDeque;

/// Per-query options for [`DataManager::get_data`].
#[derive(Debug, Clone)]
pub struct GetDataOptions {
    /// Database holding the channel's data. When absent, the channel
    /// prefix is resolved through the configured routing table; prefixes
    /// that map to several databases need this set explicitly.
    pub database: Option<String>,
    /// Whether freshly fetched data is written back into the cache.
    /// Queries overlapping cached data then never refetch in full.
    pub cache_writes: bool,
}

impl Default for GetDataOptions {
    fn default() -> Self {
        Self {
            database: None,
            cache_writes: true,
        }
    }
}

/// The query facade over one external source and one cache root.
pub struct DataManager<S: Source> {
    source: S,
    config: CacheConfig,
}

impl<S: Source> DataManager<S> {
    pub fn new(source: S, config: CacheConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Retrieve `channel` over `[start, end]` as a lazy, forward-only,
    /// time-ordered sample stream, merging cached and freshly fetched
    /// sub-ranges transparently.
    ///
    /// `start`/`end` accept anything convertible to [`Timestamp`]: a
    /// `chrono::DateTime<Utc>`, fractional seconds since the epoch, or a
    /// `Timestamp` itself. An inverted range yields an empty stream and no
    /// fetches.
    pub fn get_data(
        &self,
        channel: &str,
        start: impl Into<Timestamp>,
        end: impl Into<Timestamp>,
        options: GetDataOptions,
    ) -> CacheResult<DataStream<'_, S>> {
        let start = start.into();
        let end = end.into();

        let database = match options.database {
            Some(db) => db,
            None => self
                .config
                .resolve_database(channel)
                .ok_or_else(|| {
                    CacheError::UnknownChannelPrefix(
                        CacheConfig::channel_prefix(channel).to_string(),
                    )
                })?
                .to_string(),
        };

        let mut manager = RawCacheManager::new(
            &self.config.root_dir,
            self.source.site(),
            &database,
            channel,
        );

        // Plan: cached groups to replay and gaps to fetch, merged into one
        // sequence ordered by start boundary. A gap and a group partition
        // the range between them, so a merge by key interleaves correctly.
        let items = if start > end {
            VecDeque::new()
        } else {
            let groups = manager.intersecting(start, end);
            let gaps = manager.difference(start, end);
            merge_work_items(groups, gaps)
        };

        tracing::debug!(
            "Query {}/{} {} - {}: {} work items",
            database,
            channel,
            start,
            end,
            items.len()
        );

        Ok(DataStream {
            source: &self.source,
            manager,
            database,
            channel: channel.to_string(),
            start,
            end,
            cache_writes: options.cache_writes,
            items,
            state: StreamState::Idle,
        })
    }
}

/// One planned step of a query: replay a cached group or fetch a gap.
#[derive(Debug, Clone)]
enum WorkItem {
    Cached(IntervalGroup),
    Gap(Timestamp, Timestamp),
}

fn merge_work_items(
    groups: Vec<IntervalGroup>,
    gaps: Vec<(Timestamp, Timestamp)>,
) -> VecDeque<WorkItem> {
    let mut items = VecDeque::with_capacity(groups.len() + gaps.len());
    let mut groups = groups.into_iter().peekable();
    let mut gaps = gaps.into_iter().peekable();

    loop {
        let take_group = match (groups.peek(), gaps.peek()) {
            (Some(g), Some(d)) => g.start <= d.0,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_group {
            if let Some(g) = groups.next() {
                items.push_back(WorkItem::Cached(g));
            }
        } else if let Some((gs, ge)) = gaps.next() {
            items.push_back(WorkItem::Gap(gs, ge));
        }
    }
    items
}

enum StreamState<'a> {
    /// Between work items.
    Idle,
    /// Reading a cached group's segment files.
    Replaying(Replay),
    /// Pulling a gap from the source, teeing through the writer.
    Fetching {
        samples: SampleIter<'a>,
        writer: Option<SegmentWriter>,
    },
    /// Exhausted or aborted.
    Done,
}

/// Lazy output stream of one `get_data` call.
///
/// Pull-based: the source is only contacted as iteration reaches each gap,
/// so the consumer's own pace drives fetching. Forward-only and not
/// restartable; re-reading a range means calling `get_data` again.
/// Dropping the stream mid-iteration still closes the in-flight segment
/// writer, committing what it gathered or discarding an empty file.
pub struct DataStream<'a, S: Source> {
    source: &'a S,
    manager: RawCacheManager,
    database: String,
    channel: String,
    start: Timestamp,
    end: Timestamp,
    cache_writes: bool,
    items: VecDeque<WorkItem>,
    state: StreamState<'a>,
}

impl<S: Source> DataStream<'_, S> {
    /// Begin the next work item, or finish the stream.
    fn advance(&mut self) -> Option<CacheResult<()>> {
        match self.items.pop_front() {
            None => {
                self.state = StreamState::Done;
                None
            }
            Some(WorkItem::Cached(group)) => {
                self.state = StreamState::Replaying(self.manager.replay(&group));
                Some(Ok(()))
            }
            Some(WorkItem::Gap(gap_start, gap_end)) => {
                let writer = if self.cache_writes {
                    match SegmentWriter::open(&self.manager) {
                        Ok(w) => Some(w),
                        Err(e) => return Some(Err(e)),
                    }
                } else {
                    None
                };
                match self
                    .source
                    .retrieve(&self.database, &self.channel, gap_start, gap_end)
                {
                    Ok(samples) => {
                        self.state = StreamState::Fetching { samples, writer };
                        Some(Ok(()))
                    }
                    // Nothing written yet: the writer's temp file just
                    // evaporates on drop.
                    Err(e) => Some(Err(e.into())),
                }
            }
        }
    }
}

impl<S: Source> Iterator for DataStream<'_, S> {
    type Item = CacheResult<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, StreamState::Done) {
                StreamState::Done => return None,

                StreamState::Idle => match self.advance() {
                    None => return None,
                    Some(Ok(())) => continue,
                    Some(Err(e)) => return Some(Err(e)),
                },

                StreamState::Replaying(mut replay) => match replay.next() {
                    Some(Ok(sample)) => {
                        self.state = StreamState::Replaying(replay);
                        // Group boundaries may be looser than the request.
                        if self.start <= sample.stamp && sample.stamp <= self.end {
                            return Some(Ok(sample));
                        }
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.state = StreamState::Idle,
                },

                StreamState::Fetching {
                    mut samples,
                    mut writer,
                } => match samples.next() {
                    Some(Ok(sample)) => {
                        let outcome = match writer.as_mut() {
                            Some(w) => {
                                match w.write(&mut self.manager, sample.stamp, &sample.values) {
                                    Ok(outcome) => outcome,
                                    // Fatal cache I/O: no partial-write
                                    // recovery beyond dropping the temp file.
                                    Err(e) => return Some(Err(e)),
                                }
                            }
                            None => {
                                if self.manager.contains(sample.stamp) {
                                    WriteOutcome::Redundant
                                } else {
                                    WriteOutcome::Appended
                                }
                            }
                        };
                        self.state = StreamState::Fetching { samples, writer };
                        match outcome {
                            WriteOutcome::Appended => return Some(Ok(sample)),
                            // Already cached: the owning group's replay item
                            // yields it, which keeps boundary samples from
                            // coming out twice.
                            WriteOutcome::Redundant => continue,
                        }
                    }
                    Some(Err(e)) => {
                        // Scoped-exit cleanup before the error surfaces:
                        // partial data gathered so far still gets committed.
                        if let Some(w) = writer.take() {
                            if let Err(commit_err) = w.finish(&mut self.manager) {
                                tracing::warn!(
                                    "Commit of partial segment after source error failed: {}",
                                    commit_err
                                );
                            }
                        }
                        return Some(Err(e.into()));
                    }
                    None => {
                        if let Some(w) = writer.take() {
                            if let Err(e) = w.finish(&mut self.manager) {
                                return Some(Err(e));
                            }
                        }
                        self.state = StreamState::Idle;
                    }
                },
            }
        }
    }
}

impl<S: Source> Drop for DataStream<'_, S> {
    fn drop(&mut self) {
        // The caller may stop iterating at any point; the in-flight writer
        // still commits what it gathered (or discards an empty file).
        if let StreamState::Fetching { writer, .. } = &mut self.state {
            if let Some(w) = writer.take() {
                if let Err(e) = w.finish(&mut self.manager) {
                    tracing::warn!("Commit of in-flight segment on early stop failed: {}", e);
                }
            }
        }
    }
}

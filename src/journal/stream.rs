//! Pull-based streams of journal records and entries.
//!
//! [`RecordStream`] walks the segments of one group in index order and
//! yields raw records. [`RaftJournalEntryStream`] sits on top of it, keeps
//! only state-machine records, decodes each payload into a batch, and hands
//! out the batch's entries one at a time. Both are finite, single-pass and
//! not seekable; a new session is a new stream.
//!
//! Every stream implements [`EntryStream`], so a consumer cannot tell a raw
//! stream from a [`JournalDisruptor`](super::disruptor::JournalDisruptor)
//! wrapping one.

use super::codec::{BatchCodec, default_codec};
use super::entry::JournalEntry;
use super::error::JournalError;
use super::segment::{DEFAULT_GROUP_ID, LogSegment, RawLogRecord, SegmentReader, list_segments};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// A source of logical journal entries.
pub trait EntryStream {
    /// Return the next entry, or `Ok(None)` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError`] for fatal decode or I/O failures. The
    /// session should be abandoned after an error.
    fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError>;

    /// Adapt the stream into an [`Iterator`] that ends after the first
    /// error.
    fn entries(self) -> Entries<Self>
    where
        Self: Sized,
    {
        Entries {
            stream: self,
            done: false,
        }
    }
}

impl<S: EntryStream + ?Sized> EntryStream for Box<S> {
    fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        (**self).next_entry()
    }
}

impl<S: EntryStream + ?Sized> EntryStream for &mut S {
    fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        (**self).next_entry()
    }
}

/// Iterator returned by [`EntryStream::entries`].
#[derive(Debug)]
pub struct Entries<S> {
    stream: S,
    done: bool,
}

impl<S> Entries<S> {
    /// Recover the wrapped stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: EntryStream> Iterator for Entries<S> {
    type Item = Result<JournalEntry, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.stream.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Which part of which group a stream reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Group whose segments are read.
    pub group_id: Uuid,
    /// Records with a lower index are skipped.
    pub start_index: u64,
    /// The stream ends at the first record with this index or higher.
    pub end_index: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID,
            start_index: 0,
            end_index: None,
        }
    }
}

impl StreamConfig {
    /// Returns `true` if `index` lies in `[start_index, end_index)`.
    #[must_use]
    pub fn includes(&self, index: u64) -> bool {
        index >= self.start_index && self.end_index.is_none_or(|end| index < end)
    }
}

/// Counters kept by a stream while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamStats {
    /// Segment files opened.
    pub segments_opened: u64,
    /// Records returned by the segment readers inside the index range.
    pub records_read: u64,
    /// Records that were not state-machine data.
    pub records_skipped: u64,
    /// Batches decoded.
    pub batches_decoded: u64,
    /// Entries handed out.
    pub entries_emitted: u64,
}

// ─── Records ────────────────────────────────────────────────────────────────

/// Raw records of one group, across all of its segments, in index order.
///
/// At most one segment is open at a time; it is released as soon as it is
/// exhausted.
#[derive(Debug)]
pub struct RecordStream {
    segments: Vec<LogSegment>,
    segment_cursor: usize,
    reader: Option<SegmentReader>,
    config: StreamConfig,
    stats: StreamStats,
    done: bool,
}

impl RecordStream {
    /// Open the records of `config.group_id` under `journal_root`.
    ///
    /// Segments that lie entirely outside the configured index range are
    /// never opened.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory or group is missing.
    pub fn open<P: AsRef<Path>>(journal_root: P, config: StreamConfig) -> Result<Self, JournalError> {
        let mut segments = list_segments(journal_root.as_ref(), config.group_id)?;
        segments.retain(|s| {
            s.end_index.is_none_or(|end| end >= config.start_index)
                && config.end_index.is_none_or(|end| s.start_index < end)
        });
        debug!(
            group = %config.group_id,
            segments = segments.len(),
            start = config.start_index,
            end = ?config.end_index,
            "opened record stream"
        );
        Ok(Self::from_segments(segments, config))
    }

    /// Build a stream over an explicit, already ordered segment list.
    #[must_use]
    pub fn from_segments(segments: Vec<LogSegment>, config: StreamConfig) -> Self {
        Self {
            segments,
            segment_cursor: 0,
            reader: None,
            config,
            stats: StreamStats::default(),
            done: false,
        }
    }

    /// The segments this stream will visit.
    #[must_use]
    pub fn segments(&self) -> &[LogSegment] {
        &self.segments
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Return the next record in the configured range, or `Ok(None)` when
    /// the segments are exhausted or the end of the range is reached.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a segment cannot be opened and a decode
    /// error for malformed framing. Both end the stream.
    pub fn next_record(&mut self) -> Result<Option<RawLogRecord>, JournalError> {
        if self.done {
            return Ok(None);
        }
        match self.advance() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(e) => {
                self.finish();
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<Option<RawLogRecord>, JournalError> {
        loop {
            let reader = match self.reader.as_mut() {
                Some(reader) => reader,
                None => {
                    let Some(segment) = self.segments.get(self.segment_cursor) else {
                        return Ok(None);
                    };
                    let opened = SegmentReader::open(segment)?;
                    self.segment_cursor += 1;
                    self.stats.segments_opened = self.stats.segments_opened.saturating_add(1);
                    self.reader.insert(opened)
                }
            };

            match reader.next_record()? {
                Some(record) if record.index < self.config.start_index => continue,
                Some(record) if !self.config.includes(record.index) => return Ok(None),
                Some(record) => {
                    self.stats.records_read = self.stats.records_read.saturating_add(1);
                    return Ok(Some(record));
                }
                None => {
                    trace!(path = %reader.segment().path.display(), "segment exhausted");
                    self.reader = None;
                }
            }
        }
    }

    fn finish(&mut self) {
        self.done = true;
        self.reader = None;
    }
}

impl Iterator for RecordStream {
    type Item = Result<RawLogRecord, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

// ─── Entries ────────────────────────────────────────────────────────────────

/// Logical entries of a Raft journal, flattened out of their batches.
///
/// # Example
///
/// ```rust,no_run
/// use journal_disruptor::journal::{EntryStream, RaftJournalEntryStream};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut stream = RaftJournalEntryStream::open("/var/journal")?;
/// while let Some(entry) = stream.next_entry()? {
///     println!("{entry:?}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RaftJournalEntryStream {
    records: RecordStream,
    codec: Arc<dyn BatchCodec>,
    batch: Vec<JournalEntry>,
    batch_cursor: usize,
    stats: StreamStats,
    done: bool,
}

impl RaftJournalEntryStream {
    /// Open the default group with the default codec.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory or group is missing.
    pub fn open<P: AsRef<Path>>(journal_root: P) -> Result<Self, JournalError> {
        Self::open_with_config(journal_root, StreamConfig::default())
    }

    /// Open with an explicit group and index range.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory or group is missing.
    pub fn open_with_config<P: AsRef<Path>>(
        journal_root: P,
        config: StreamConfig,
    ) -> Result<Self, JournalError> {
        Self::open_with_codec(journal_root, config, default_codec())
    }

    /// Open with an explicit codec for batch payloads.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the directory or group is missing.
    pub fn open_with_codec<P: AsRef<Path>>(
        journal_root: P,
        config: StreamConfig,
        codec: Arc<dyn BatchCodec>,
    ) -> Result<Self, JournalError> {
        let records = RecordStream::open(journal_root, config)?;
        Ok(Self::from_records(records, codec))
    }

    /// Build an entry stream over an existing record stream.
    #[must_use]
    pub fn from_records(records: RecordStream, codec: Arc<dyn BatchCodec>) -> Self {
        Self {
            records,
            codec,
            batch: Vec::new(),
            batch_cursor: 0,
            stats: StreamStats::default(),
            done: false,
        }
    }

    /// Counters so far, including those of the underlying record stream.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        let records = self.records.stats();
        StreamStats {
            segments_opened: records.segments_opened,
            records_read: records.records_read,
            ..self.stats
        }
    }

    fn fail(&mut self, err: JournalError) -> JournalError {
        self.done = true;
        self.batch.clear();
        err
    }
}

impl EntryStream for RaftJournalEntryStream {
    fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        loop {
            if self.done {
                return Ok(None);
            }

            if let Some(slot) = self.batch.get_mut(self.batch_cursor) {
                let entry = std::mem::take(slot);
                self.batch_cursor += 1;
                self.stats.entries_emitted = self.stats.entries_emitted.saturating_add(1);
                return Ok(Some(entry));
            }

            let record = match self.records.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.done = true;
                    return Ok(None);
                }
                Err(e) => return Err(self.fail(e)),
            };

            if !record.is_state_machine_data() {
                trace!(index = record.index, kind = %record.kind, "skipping non state-machine record");
                self.stats.records_skipped = self.stats.records_skipped.saturating_add(1);
                continue;
            }

            match self.codec.decode_batch(&record.payload) {
                Ok(batch) => {
                    trace!(index = record.index, entries = batch.len(), "decoded entry batch");
                    self.batch = batch.entries;
                    self.batch_cursor = 0;
                    self.stats.batches_decoded = self.stats.batches_decoded.saturating_add(1);
                }
                Err(e) => {
                    let err = JournalError::DeserializationError {
                        index: record.index,
                        message: e.message,
                    };
                    return Err(self.fail(err));
                }
            }
        }
    }
}

/// An in-memory entry stream, for callers that already hold the entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStream {
    entries: VecDeque<JournalEntry>,
}

impl MemoryEntryStream {
    /// Create a stream that yields `entries` in order.
    #[must_use]
    pub fn new(entries: Vec<JournalEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Entries not yet pulled.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl From<Vec<JournalEntry>> for MemoryEntryStream {
    fn from(entries: Vec<JournalEntry>) -> Self {
        Self::new(entries)
    }
}

impl FromIterator<JournalEntry> for MemoryEntryStream {
    fn from_iter<I: IntoIterator<Item = JournalEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl EntryStream for MemoryEntryStream {
    fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self.entries.pop_front())
    }
}

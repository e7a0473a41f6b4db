//! Memory-mapped journal writer.
//!
//! [`JournalWriter`] produces segment files in the format documented in
//! [`segment`](super::segment). It is the downstream end of a disruption
//! session: entries coming out of a
//! [`JournalDisruptor`](super::disruptor::JournalDisruptor) are re-batched,
//! stamped with fresh sequence numbers, and written to a new journal that
//! the metadata service can replay.
//!
//! Each open segment is pre-allocated to `segment_size` bytes (default
//! 8 MiB) and memory-mapped. When the next record does not fit, the segment
//! is truncated to its written length, renamed from `log_inprogress_<start>`
//! to `log_<start>-<end>`, and a new open segment starts at the next index.

use super::codec::{BatchCodec, default_codec};
use super::entry::{JournalEntry, JournalEntryBatch};
use super::error::JournalError;
use super::segment::{
    DEFAULT_GROUP_ID, RecordKind, SEGMENT_HEADER, SEGMENT_HEADER_SIZE,
    closed_segment_name, encode_record, group_directory, list_segments_in, open_segment_name,
};
use memmap2::MmapMut;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Default segment size in bytes (8 MiB).
pub const DEFAULT_SEGMENT_SIZE: usize = 8 * 1024 * 1024;

/// Default number of entries packed into one state-machine record.
pub const DEFAULT_MAX_BATCH_ENTRIES: usize = 64;

/// Settings for a [`JournalWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Group whose directory receives the segments.
    pub group_id: Uuid,
    /// Pre-allocated size of each segment file in bytes.
    pub segment_size: usize,
    /// Entries buffered by [`JournalWriter::write_entry`] before a record is
    /// written. Values below 1 are treated as 1.
    pub max_batch_entries: usize,
    /// Term stamped on every record.
    pub term: u64,
    /// Log index of the first record.
    pub start_index: u64,
    /// Sequence number given to the first entry.
    pub start_sequence_number: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID,
            segment_size: DEFAULT_SEGMENT_SIZE,
            max_batch_entries: DEFAULT_MAX_BATCH_ENTRIES,
            term: 1,
            start_index: 0,
            start_sequence_number: 0,
        }
    }
}

/// Totals reported when a writer finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WriterSummary {
    /// Records written, of every kind.
    pub records: u64,
    /// Entries written inside state-machine records.
    pub entries: u64,
    /// Segment files produced.
    pub segments: u64,
    /// Index of the last record, if any was written.
    pub last_index: Option<u64>,
}

/// Manages writing to a single memory-mapped segment file.
struct SegmentWriter {
    /// The memory-mapped region for this segment.
    mmap: MmapMut,
    /// Current write position within the segment (bytes).
    write_pos: usize,
    /// Total capacity of the segment in bytes.
    capacity: usize,
    /// Path to the open segment file on disk.
    path: PathBuf,
    /// Index of the first record in the segment.
    start_index: u64,
    /// Index of the last record written, if any.
    last_index: Option<u64>,
}

impl SegmentWriter {
    /// Create a new open segment and memory-map it.
    ///
    /// The file is pre-allocated to `capacity` bytes and starts with the
    /// segment header.
    fn create(dir: &Path, start_index: u64, capacity: usize) -> Result<Self, JournalError> {
        let path = dir.join(open_segment_name(start_index));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| JournalError::io_at(e, &path))?;

        file.set_len(capacity as u64)
            .map_err(|e| JournalError::io_at(e, &path))?;

        // SAFETY: The file was just created by this writer and nothing else
        // modifies it while the mapping is alive.
        let mut mmap = unsafe { MmapMut::map_mut(&file).map_err(|e| JournalError::io_at(e, &path))? };

        mmap[..SEGMENT_HEADER_SIZE].copy_from_slice(SEGMENT_HEADER);
        mmap.flush_range(0, SEGMENT_HEADER_SIZE)
            .map_err(|e| JournalError::io_at(e, &path))?;

        debug!(path = %path.display(), start_index, capacity, "created journal segment");

        Ok(Self {
            mmap,
            write_pos: SEGMENT_HEADER_SIZE,
            capacity,
            path,
            start_index,
            last_index: None,
        })
    }

    /// Returns the remaining capacity in this segment.
    #[inline]
    fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.write_pos)
    }

    /// Write an encoded record at the current position and flush it.
    fn write_record(&mut self, index: u64, bytes: &[u8]) -> Result<(), JournalError> {
        let end = self
            .write_pos
            .checked_add(bytes.len())
            .filter(|end| *end <= self.capacity)
            .ok_or(JournalError::EntryTooLarge {
                entry_bytes: bytes.len(),
                segment_size: self.capacity,
            })?;

        self.mmap[self.write_pos..end].copy_from_slice(bytes);
        self.mmap
            .flush_range(self.write_pos, bytes.len())
            .map_err(|e| JournalError::io_at(e, &self.path))?;
        self.write_pos = end;
        self.last_index = Some(index);
        Ok(())
    }

    /// Truncate the segment to its written length and rename it to its
    /// closed name. A segment that never received a record is removed.
    ///
    /// Returns the closed path, or `None` if the segment was removed.
    fn close(self) -> Result<Option<PathBuf>, JournalError> {
        let SegmentWriter {
            mmap,
            write_pos,
            path,
            start_index,
            last_index,
            ..
        } = self;

        mmap.flush().map_err(|e| JournalError::io_at(e, &path))?;
        drop(mmap);

        let Some(end_index) = last_index else {
            fs::remove_file(&path).map_err(|e| JournalError::io_at(e, &path))?;
            return Ok(None);
        };

        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| JournalError::io_at(e, &path))?;
        file.set_len(write_pos as u64)
            .map_err(|e| JournalError::io_at(e, &path))?;
        file.sync_all().map_err(|e| JournalError::io_at(e, &path))?;

        let closed = path.with_file_name(closed_segment_name(start_index, end_index));
        fs::rename(&path, &closed).map_err(|e| JournalError::io_at(e, &path))?;
        debug!(path = %closed.display(), start_index, end_index, "closed journal segment");
        Ok(Some(closed))
    }
}

/// Writes records and entry batches into a fresh journal group directory.
///
/// A writer is owned by the single session feeding it.
///
/// # Example
///
/// ```rust,no_run
/// use journal_disruptor::journal::{
///     EntryPayload, JournalEntry, JournalWriter, NewBlockEntry, WriterConfig,
/// };
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut writer = JournalWriter::create("/tmp/journal", WriterConfig::default())?;
/// writer.write_entry(JournalEntry::new(EntryPayload::NewBlock(NewBlockEntry {
///     id: 1,
///     block_id: 16_777_216,
/// })))?;
/// let summary = writer.finish()?;
/// assert_eq!(summary.entries, 1);
/// # Ok(())
/// # }
/// ```
pub struct JournalWriter {
    dir: PathBuf,
    config: WriterConfig,
    codec: Arc<dyn BatchCodec>,
    current: Option<SegmentWriter>,
    next_index: u64,
    next_sequence_number: u64,
    pending: Vec<JournalEntry>,
    summary: WriterSummary,
}

impl JournalWriter {
    /// Create a writer using the default JSON codec.
    ///
    /// # Errors
    ///
    /// See [`create_with_codec`](Self::create_with_codec).
    pub fn create<P: AsRef<Path>>(
        journal_root: P,
        config: WriterConfig,
    ) -> Result<Self, JournalError> {
        Self::create_with_codec(journal_root, config, default_codec())
    }

    /// Create a writer for `config.group_id` under `journal_root`.
    ///
    /// The group directory is created if missing. No segment file is
    /// created until the first record is appended.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::SegmentsAlreadyExist`] if the group directory
    /// already holds segments, or an I/O error if it cannot be created.
    pub fn create_with_codec<P: AsRef<Path>>(
        journal_root: P,
        config: WriterConfig,
        codec: Arc<dyn BatchCodec>,
    ) -> Result<Self, JournalError> {
        let dir = group_directory(journal_root.as_ref(), config.group_id);
        fs::create_dir_all(&dir).map_err(|e| JournalError::io_at(e, &dir))?;

        if !list_segments_in(&dir)?.is_empty() {
            return Err(JournalError::SegmentsAlreadyExist { path: dir });
        }

        Ok(Self {
            dir,
            next_index: config.start_index,
            next_sequence_number: config.start_sequence_number,
            config,
            codec,
            current: None,
            pending: Vec::new(),
            summary: WriterSummary::default(),
        })
    }

    /// The group directory segments are written to.
    #[must_use]
    pub fn group_dir(&self) -> &Path {
        &self.dir
    }

    /// Index the next record will receive.
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Entries buffered and not yet written.
    #[must_use]
    pub fn pending_entries(&self) -> usize {
        self.pending.len()
    }

    /// Append one raw record and return the index it was given.
    ///
    /// Buffered entries are not flushed first; use [`flush`](Self::flush)
    /// when ordering against them matters.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::EntryTooLarge`] if the record cannot fit in an
    /// empty segment, or an I/O error from segment rotation.
    pub fn append_record(&mut self, kind: RecordKind, payload: &[u8]) -> Result<u64, JournalError> {
        let index = self.next_index;
        let bytes = encode_record(index, self.config.term, kind, payload)?;

        if bytes.len() > self.config.segment_size.saturating_sub(SEGMENT_HEADER_SIZE) {
            return Err(JournalError::EntryTooLarge {
                entry_bytes: bytes.len(),
                segment_size: self.config.segment_size,
            });
        }

        if self
            .current
            .as_ref()
            .is_some_and(|seg| seg.remaining() < bytes.len())
        {
            self.roll()?;
        }

        let segment = match self.current.take() {
            Some(seg) => seg,
            None => SegmentWriter::create(&self.dir, index, self.config.segment_size)?,
        };
        self.current.insert(segment).write_record(index, &bytes)?;

        self.next_index = self.next_index.saturating_add(1);
        self.summary.records = self.summary.records.saturating_add(1);
        self.summary.last_index = Some(index);
        Ok(index)
    }

    /// Buffer an entry, stamping it with the next sequence number.
    ///
    /// A state-machine record is written once `max_batch_entries` entries
    /// are buffered.
    ///
    /// # Errors
    ///
    /// Returns any error from [`flush`](Self::flush).
    pub fn write_entry(&mut self, entry: JournalEntry) -> Result<(), JournalError> {
        let sequence_number = self.next_sequence_number;
        self.next_sequence_number = self.next_sequence_number.saturating_add(1);
        self.pending.push(entry.with_sequence_number(sequence_number));

        if self.pending.len() >= self.config.max_batch_entries.max(1) {
            self.flush()?;
        }
        Ok(())
    }

    /// Write an explicit batch as one state-machine record, after any
    /// buffered entries. Sequence numbers in the batch are kept as given.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::SerializationError`] if the codec fails, or
    /// any error from [`append_record`](Self::append_record).
    pub fn append_batch(&mut self, batch: &JournalEntryBatch) -> Result<u64, JournalError> {
        self.flush()?;
        self.append_encoded_batch(batch)
    }

    /// Write buffered entries as one state-machine record.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::SerializationError`] if the codec fails, or
    /// any error from [`append_record`](Self::append_record).
    pub fn flush(&mut self) -> Result<(), JournalError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = JournalEntryBatch::new(std::mem::take(&mut self.pending));
        self.append_encoded_batch(&batch)?;
        Ok(())
    }

    fn append_encoded_batch(&mut self, batch: &JournalEntryBatch) -> Result<u64, JournalError> {
        let payload = self
            .codec
            .encode_batch(batch)
            .map_err(|e| JournalError::SerializationError { message: e.message })?;
        let index = self.append_record(RecordKind::StateMachineData, &payload)?;
        self.summary.entries = self.summary.entries.saturating_add(batch.len() as u64);
        Ok(index)
    }

    /// Close the current segment; the next record starts a new one.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the segment cannot be truncated or renamed.
    pub fn roll(&mut self) -> Result<(), JournalError> {
        if let Some(segment) = self.current.take()
            && segment.close()?.is_some()
        {
            self.summary.segments = self.summary.segments.saturating_add(1);
        }
        Ok(())
    }

    /// Flush buffered entries and close the last segment.
    ///
    /// # Errors
    ///
    /// Returns any error from [`flush`](Self::flush) or
    /// [`roll`](Self::roll).
    pub fn finish(mut self) -> Result<WriterSummary, JournalError> {
        self.flush()?;
        self.roll()?;
        info!(
            dir = %self.dir.display(),
            records = self.summary.records,
            entries = self.summary.entries,
            segments = self.summary.segments,
            "journal writer finished"
        );
        Ok(self.summary)
    }
}

impl std::fmt::Debug for JournalWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalWriter")
            .field("dir", &self.dir)
            .field("codec", &self.codec.content_type())
            .field("next_index", &self.next_index)
            .field("pending", &self.pending.len())
            .finish()
    }
}

//! Segment files of the Raft journal and their record framing.
//!
//! # Directory Layout
//!
//! ```text
//! <journal_root>/raft/<group-uuid>/current/
//!     log_0-99            closed segment, indices 0..=99
//!     log_100-180         closed segment, indices 100..=180
//!     log_inprogress_181  open segment, still being appended
//! ```
//!
//! Files that do not match either name are ignored.
//!
//! # On-Disk Format (little-endian)
//!
//! Every segment starts with the 8-byte header `RaftLog1`, followed by
//! records:
//!
//! ```text
//! [4 bytes: record_length][8 bytes: index][8 bytes: term][1 byte: kind]
//! [N bytes: payload][4 bytes: CRC32]
//! ```
//!
//! - `record_length`: bytes after itself (`21 + N`).
//! - CRC32 covers `index ‖ term ‖ kind ‖ payload`.
//! - A zero `record_length` marks the end of the written region; open
//!   segments are pre-allocated and zero filled past it.

use super::error::JournalError;
use memmap2::Mmap;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Magic bytes at the start of every segment file.
pub const SEGMENT_HEADER: &[u8; 8] = b"RaftLog1";

/// Size of the segment file header in bytes.
pub const SEGMENT_HEADER_SIZE: usize = SEGMENT_HEADER.len();

/// Size of the fixed-size record header in bytes.
///
/// Layout: `[4 bytes record_length][8 bytes index][8 bytes term][1 byte kind]`
pub const RECORD_HEADER_SIZE: usize = 4 + 8 + 8 + 1;

/// Size of the CRC32 trailer appended to each record in bytes.
pub const RECORD_CRC_SIZE: usize = 4;

/// Total overhead per record (header + CRC trailer) in bytes.
pub const RECORD_OVERHEAD: usize = RECORD_HEADER_SIZE + RECORD_CRC_SIZE;

/// Group id of the metadata service's journal.
pub const DEFAULT_GROUP_ID: Uuid = Uuid::from_u128(0x02511d47_d67c_49a3_9011_abb3109a44c1);

const OPEN_SEGMENT_PREFIX: &str = "log_inprogress_";
const CLOSED_SEGMENT_PREFIX: &str = "log_";

/// The kind of a raw log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Application payload: an encoded entry batch.
    StateMachineData,
    /// Cluster membership change written by the replication layer.
    Configuration,
    /// Replication bookkeeping such as commit markers.
    Metadata,
}

impl RecordKind {
    /// The byte stored on disk for this kind.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            RecordKind::StateMachineData => 1,
            RecordKind::Configuration => 2,
            RecordKind::Metadata => 3,
        }
    }

    /// Decode a kind byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(RecordKind::StateMachineData),
            2 => Some(RecordKind::Configuration),
            3 => Some(RecordKind::Metadata),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::StateMachineData => "state-machine-data",
            RecordKind::Configuration => "configuration",
            RecordKind::Metadata => "metadata",
        };
        f.write_str(name)
    }
}

/// One physical record of the Raft log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogRecord {
    /// Log index.
    pub index: u64,
    /// Term the record was written in.
    pub term: u64,
    /// What the payload is.
    pub kind: RecordKind,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl RawLogRecord {
    /// Returns `true` if the record carries application data.
    #[must_use]
    #[inline]
    pub fn is_state_machine_data(&self) -> bool {
        self.kind == RecordKind::StateMachineData
    }
}

/// A segment file and the index range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSegment {
    /// First index in the segment.
    pub start_index: u64,
    /// Last index in the segment, or `None` while the segment is open.
    pub end_index: Option<u64>,
    /// Path of the segment file.
    pub path: PathBuf,
}

impl LogSegment {
    /// Returns `true` if the segment is still being appended.
    #[must_use]
    #[inline]
    pub fn is_open(&self) -> bool {
        self.end_index.is_none()
    }

    /// Returns `true` if `index` belongs to the segment's range.
    #[must_use]
    pub fn contains(&self, index: u64) -> bool {
        index >= self.start_index && self.end_index.is_none_or(|end| index <= end)
    }
}

/// Directory holding the segments of `group_id` under `journal_root`.
#[must_use]
pub fn group_directory(journal_root: &Path, group_id: Uuid) -> PathBuf {
    journal_root
        .join("raft")
        .join(group_id.to_string())
        .join("current")
}

/// File name of a closed segment.
#[must_use]
pub fn closed_segment_name(start_index: u64, end_index: u64) -> String {
    format!("{CLOSED_SEGMENT_PREFIX}{start_index}-{end_index}")
}

/// File name of an open segment.
#[must_use]
pub fn open_segment_name(start_index: u64) -> String {
    format!("{OPEN_SEGMENT_PREFIX}{start_index}")
}

/// Parse a segment file name into `(start_index, end_index)`.
fn parse_segment_name(name: &str) -> Option<(u64, Option<u64>)> {
    if let Some(start) = name.strip_prefix(OPEN_SEGMENT_PREFIX) {
        return start.parse::<u64>().ok().map(|s| (s, None));
    }
    let range = name.strip_prefix(CLOSED_SEGMENT_PREFIX)?;
    let (start, end) = range.split_once('-')?;
    let start = start.parse::<u64>().ok()?;
    let end = end.parse::<u64>().ok()?;
    (start <= end).then_some((start, Some(end)))
}

/// List the segments of a group, ordered by start index.
///
/// # Errors
///
/// Returns [`JournalError::InvalidDirectory`] if `journal_root` is not a
/// directory, [`JournalError::GroupNotFound`] if the group has no segment
/// directory, or an I/O error if the directory cannot be read.
pub fn list_segments(journal_root: &Path, group_id: Uuid) -> Result<Vec<LogSegment>, JournalError> {
    if !journal_root.is_dir() {
        return Err(JournalError::InvalidDirectory {
            path: journal_root.to_path_buf(),
        });
    }
    let dir = group_directory(journal_root, group_id);
    if !dir.is_dir() {
        return Err(JournalError::GroupNotFound {
            group_id,
            path: dir,
        });
    }
    list_segments_in(&dir)
}

/// List the segments in a group directory, ordered by start index.
pub(crate) fn list_segments_in(dir: &Path) -> Result<Vec<LogSegment>, JournalError> {
    let mut segments = Vec::new();
    let entries = fs::read_dir(dir).map_err(|e| JournalError::io_at(e, dir))?;

    for entry in entries {
        let entry = entry.map_err(|e| JournalError::io_at(e, dir))?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if let Some((start_index, end_index)) = parse_segment_name(&name_str) {
            segments.push(LogSegment {
                start_index,
                end_index,
                path: entry.path(),
            });
        }
    }

    segments.sort_by_key(|s| (s.start_index, s.is_open()));
    debug!(dir = %dir.display(), count = segments.len(), "listed journal segments");
    Ok(segments)
}

/// Encode one record into the on-disk format.
///
/// # Errors
///
/// Returns [`JournalError::SerializationError`] if the payload is too large
/// for the 32-bit length field.
pub fn encode_record(
    index: u64,
    term: u64,
    kind: RecordKind,
    payload: &[u8],
) -> Result<Vec<u8>, JournalError> {
    let record_length = u32::try_from(payload.len())
        .ok()
        .and_then(|n| n.checked_add((RECORD_OVERHEAD - 4) as u32))
        .ok_or(JournalError::SerializationError {
            message: "record size overflow".to_string(),
        })?;

    let mut buf = Vec::with_capacity(payload.len() + RECORD_OVERHEAD);
    buf.extend_from_slice(&record_length.to_le_bytes());
    buf.extend_from_slice(&index.to_le_bytes());
    buf.extend_from_slice(&term.to_le_bytes());
    buf.push(kind.as_byte());
    buf.extend_from_slice(payload);

    // skip record_length
    let crc = crc32fast::hash(&buf[4..]);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

#[inline]
fn read_u32_le(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at.checked_add(4)?)?;
    bytes.try_into().ok().map(u32::from_le_bytes)
}

#[inline]
fn read_u64_le(data: &[u8], at: usize) -> Option<u64> {
    let bytes = data.get(at..at.checked_add(8)?)?;
    bytes.try_into().ok().map(u64::from_le_bytes)
}

// ─── Reading ────────────────────────────────────────────────────────────────

/// Lazily decodes the records of one segment file, in on-disk order.
///
/// The segment is memory-mapped read-only for the lifetime of the reader;
/// dropping the reader releases the mapping and the file handle.
pub struct SegmentReader {
    segment: LogSegment,
    mmap: Option<Mmap>,
    offset: usize,
    failed: bool,
}

impl SegmentReader {
    /// Open a segment for reading and validate its header.
    ///
    /// An open segment with no bytes yet is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is missing or cannot be mapped, and
    /// [`JournalError::InvalidSegmentHeader`] if it does not start with
    /// [`SEGMENT_HEADER`].
    pub fn open(segment: &LogSegment) -> Result<Self, JournalError> {
        let path = &segment.path;
        let file = File::open(path).map_err(|e| JournalError::io_at(e, path))?;
        let len = file
            .metadata()
            .map_err(|e| JournalError::io_at(e, path))?
            .len();

        if len == 0 {
            if segment.is_open() {
                debug!(path = %path.display(), "opened empty open segment");
                return Ok(Self {
                    segment: segment.clone(),
                    mmap: None,
                    offset: 0,
                    failed: false,
                });
            }
            return Err(JournalError::InvalidSegmentHeader {
                path: path.clone(),
                message: "closed segment is empty".to_string(),
            });
        }

        // SAFETY: Read-only mapping of a committed segment. The journal is a
        // static input for this tool and is not truncated while mapped.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| JournalError::io_at(e, path))? };

        match mmap.get(..SEGMENT_HEADER_SIZE) {
            Some(header) if header == SEGMENT_HEADER => {}
            Some(_) => {
                return Err(JournalError::InvalidSegmentHeader {
                    path: path.clone(),
                    message: "bad magic".to_string(),
                });
            }
            None => {
                return Err(JournalError::InvalidSegmentHeader {
                    path: path.clone(),
                    message: format!("file too short ({len} bytes)"),
                });
            }
        }

        debug!(
            path = %path.display(),
            start = segment.start_index,
            end = ?segment.end_index,
            bytes = len,
            "opened journal segment"
        );

        Ok(Self {
            segment: segment.clone(),
            mmap: Some(mmap),
            offset: SEGMENT_HEADER_SIZE,
            failed: false,
        })
    }

    /// The segment being read.
    #[must_use]
    pub fn segment(&self) -> &LogSegment {
        &self.segment
    }

    /// Decode the next record.
    ///
    /// Returns `Ok(None)` at the end of the written region.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidRecordHeader`] for truncated records,
    /// [`JournalError::CorruptRecord`] on CRC mismatch,
    /// [`JournalError::UnknownRecordKind`] for an unknown kind byte, and
    /// [`JournalError::IndexOutOfRange`] when the record's index does not
    /// belong to the segment.
    pub fn next_record(&mut self) -> Result<Option<RawLogRecord>, JournalError> {
        let Some(mmap) = self.mmap.as_ref() else {
            return Ok(None);
        };
        let data = &mmap[..];
        let path = &self.segment.path;
        let offset = self.offset;
        let remaining = data.get(offset..).unwrap_or_default();

        if remaining.len() < 4 {
            if remaining.iter().all(|b| *b == 0) {
                return Ok(None);
            }
            return Err(JournalError::InvalidRecordHeader {
                path: path.clone(),
                offset,
                message: "truncated record_length".to_string(),
            });
        }

        let record_length = read_u32_le(data, offset).unwrap_or(0) as usize;
        if record_length == 0 {
            return Ok(None);
        }
        if record_length < RECORD_OVERHEAD - 4 {
            return Err(JournalError::InvalidRecordHeader {
                path: path.clone(),
                offset,
                message: format!("record_length {record_length} smaller than header"),
            });
        }

        let record_end = match offset
            .checked_add(4)
            .and_then(|v| v.checked_add(record_length))
        {
            Some(end) if end <= data.len() => end,
            _ => {
                return Err(JournalError::InvalidRecordHeader {
                    path: path.clone(),
                    offset,
                    message: "truncated record (extends beyond segment data)".to_string(),
                });
            }
        };

        let body_start = offset + 4;
        let crc_start = record_end - RECORD_CRC_SIZE;
        let stored_crc = read_u32_le(data, crc_start).unwrap_or(0);
        let computed_crc = crc32fast::hash(&data[body_start..crc_start]);

        let index = read_u64_le(data, body_start).unwrap_or(0);
        if stored_crc != computed_crc {
            return Err(JournalError::CorruptRecord {
                path: path.clone(),
                index,
                expected_crc: stored_crc,
                actual_crc: computed_crc,
            });
        }

        let term = read_u64_le(data, body_start + 8).unwrap_or(0);
        let kind_byte = data[body_start + 16];
        let kind = RecordKind::from_byte(kind_byte).ok_or_else(|| JournalError::UnknownRecordKind {
            path: path.clone(),
            offset,
            kind: kind_byte,
        })?;

        if !self.segment.contains(index) {
            return Err(JournalError::IndexOutOfRange {
                path: path.clone(),
                index,
                start_index: self.segment.start_index,
                end_index: self.segment.end_index,
            });
        }

        let payload = data[body_start + 17..crc_start].to_vec();
        self.offset = record_end;

        Ok(Some(RawLogRecord {
            index,
            term,
            kind,
            payload,
        }))
    }
}

impl fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentReader")
            .field("segment", &self.segment)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Iterator for SegmentReader {
    type Item = Result<RawLogRecord, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

//! Error types for the journal subsystem.
//!
//! [`JournalError`] covers every fatal condition of a read or write session:
//! configuration problems (missing directory or group), I/O failures, and
//! decode failures (bad segment framing, corrupt records, malformed batch
//! payloads). Reaching the end of the journal is not an error; streams report
//! it as `Ok(None)`.

use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Errors that can occur within the journal subsystem.
#[derive(Debug)]
#[non_exhaustive]
pub enum JournalError {
    /// An I/O error occurred while reading or writing journal files.
    Io {
        /// The underlying I/O error message.
        message: String,
        /// The file path involved, if known.
        path: Option<PathBuf>,
    },

    /// The journal root directory does not exist or is not a directory.
    InvalidDirectory {
        /// The path that was expected to be a valid directory.
        path: PathBuf,
    },

    /// The journal root has no directory for the requested group.
    GroupNotFound {
        /// The group that was requested.
        group_id: Uuid,
        /// The directory that was expected to hold its segments.
        path: PathBuf,
    },

    /// A segment file does not start with the expected header.
    InvalidSegmentHeader {
        /// The segment file.
        path: PathBuf,
        /// Description of the header problem.
        message: String,
    },

    /// A record inside a segment has a truncated or malformed header.
    InvalidRecordHeader {
        /// The segment file.
        path: PathBuf,
        /// Byte offset within the segment where the error occurred.
        offset: usize,
        /// Description of the header problem.
        message: String,
    },

    /// A record failed CRC32 integrity verification.
    CorruptRecord {
        /// The segment file.
        path: PathBuf,
        /// The log index stored in the corrupt record.
        index: u64,
        /// The CRC32 checksum stored in the record trailer.
        expected_crc: u32,
        /// The CRC32 checksum computed from the record bytes.
        actual_crc: u32,
    },

    /// A record carries a kind byte this decoder does not know.
    UnknownRecordKind {
        /// The segment file.
        path: PathBuf,
        /// Byte offset of the record within the segment.
        offset: usize,
        /// The unrecognised kind byte.
        kind: u8,
    },

    /// A record's log index falls outside the range its segment covers.
    IndexOutOfRange {
        /// The segment file.
        path: PathBuf,
        /// The index found in the record.
        index: u64,
        /// First index of the segment.
        start_index: u64,
        /// Last index of the segment, `None` for an open segment.
        end_index: Option<u64>,
    },

    /// A state-machine payload could not be decoded as an entry batch.
    DeserializationError {
        /// The log index of the record that failed to decode.
        index: u64,
        /// The underlying deserialization error message.
        message: String,
    },

    /// An entry batch could not be serialized.
    SerializationError {
        /// The underlying serialization error message.
        message: String,
    },

    /// A segment is too small to hold the record being appended.
    EntryTooLarge {
        /// The size of the encoded record in bytes.
        entry_bytes: usize,
        /// The maximum segment size in bytes.
        segment_size: usize,
    },

    /// A writer was pointed at a group directory that already has segments.
    SegmentsAlreadyExist {
        /// The group directory.
        path: PathBuf,
    },
}

impl JournalError {
    /// Wrap an I/O error together with the path it happened on.
    #[cold]
    pub(crate) fn io_at(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        JournalError::Io {
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Returns `true` for errors caused by a bad directory or group, which
    /// are reported before any entry is produced.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            JournalError::InvalidDirectory { .. } | JournalError::GroupNotFound { .. }
        )
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalError::Io { message, path } => {
                if let Some(p) = path {
                    write!(f, "journal I/O error at {}: {message}", p.display())
                } else {
                    write!(f, "journal I/O error: {message}")
                }
            }
            JournalError::InvalidDirectory { path } => {
                write!(f, "invalid journal directory: {}", path.display())
            }
            JournalError::GroupNotFound { group_id, path } => {
                write!(
                    f,
                    "journal group {group_id} not found (expected {})",
                    path.display()
                )
            }
            JournalError::InvalidSegmentHeader { path, message } => {
                write!(
                    f,
                    "invalid segment header in {}: {message}",
                    path.display()
                )
            }
            JournalError::InvalidRecordHeader {
                path,
                offset,
                message,
            } => {
                write!(
                    f,
                    "invalid record header in {} at offset {offset}: {message}",
                    path.display()
                )
            }
            JournalError::CorruptRecord {
                path,
                index,
                expected_crc,
                actual_crc,
            } => {
                write!(
                    f,
                    "corrupt journal record at index {index} in {}: \
                     expected CRC {expected_crc:#010x}, got {actual_crc:#010x}",
                    path.display()
                )
            }
            JournalError::UnknownRecordKind { path, offset, kind } => {
                write!(
                    f,
                    "unknown record kind {kind} in {} at offset {offset}",
                    path.display()
                )
            }
            JournalError::IndexOutOfRange {
                path,
                index,
                start_index,
                end_index,
            } => match end_index {
                Some(end) => write!(
                    f,
                    "record index {index} outside segment range [{start_index}, {end}] in {}",
                    path.display()
                ),
                None => write!(
                    f,
                    "record index {index} below open segment start {start_index} in {}",
                    path.display()
                ),
            },
            JournalError::DeserializationError { index, message } => {
                write!(
                    f,
                    "journal deserialization error at index {index}: {message}"
                )
            }
            JournalError::SerializationError { message } => {
                write!(f, "journal serialization error: {message}")
            }
            JournalError::EntryTooLarge {
                entry_bytes,
                segment_size,
            } => {
                write!(
                    f,
                    "journal record too large: {entry_bytes} bytes exceeds \
                     segment size {segment_size} bytes"
                )
            }
            JournalError::SegmentsAlreadyExist { path } => {
                write!(
                    f,
                    "refusing to write into {}: segments already exist",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for JournalError {}

impl From<std::io::Error> for JournalError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        JournalError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

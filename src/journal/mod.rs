//! Journal reading, classification, disruption and writing.
//!
//! # Types
//!
//! - [`JournalEntry`]: a logical metadata mutation
//! - [`EntryType`]: the stable type code of an entry, see [`classify`]
//! - [`EntryStream`]: pull-based source of entries
//! - [`RaftJournalEntryStream`]: entries decoded from segment files
//! - [`JournalDisruptor`]: stream adapter that delays one entry type
//! - [`JournalWriter`]: writes entries back into segment files
//! - [`JournalError`]: error type for journal operations
//!
//! Data flows in one direction:
//!
//! ```text
//! segments ─► RecordStream ─► RaftJournalEntryStream ─► JournalDisruptor ─► JournalWriter
//! ```

pub mod classifier;
pub mod codec;
pub mod disruptor;
pub mod entry;
pub mod error;
pub mod segment;
pub mod stream;
pub mod writer;

pub use classifier::{EntryType, ParseEntryTypeError, classify};
#[cfg(feature = "bincode")]
pub use codec::BincodeBatchCodec;
pub use codec::{BatchCodec, JsonBatchCodec, SerializationError, default_codec};
pub use disruptor::{
    DisruptionSummary, DisruptorConfig, DisruptorError, DisruptorStats, JournalDisruptor,
};
pub use entry::*;
pub use error::JournalError;
pub use segment::{
    DEFAULT_GROUP_ID, LogSegment, RECORD_CRC_SIZE, RECORD_HEADER_SIZE, RECORD_OVERHEAD,
    RawLogRecord, RecordKind, SEGMENT_HEADER, SEGMENT_HEADER_SIZE, SegmentReader, encode_record,
    group_directory, list_segments,
};
pub use stream::{
    Entries, EntryStream, MemoryEntryStream, RaftJournalEntryStream, RecordStream, StreamConfig,
    StreamStats,
};
pub use writer::{
    DEFAULT_MAX_BATCH_ENTRIES, DEFAULT_SEGMENT_SIZE, JournalWriter, WriterConfig, WriterSummary,
};

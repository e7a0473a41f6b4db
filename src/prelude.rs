//! Prelude module that re-exports commonly used types and traits.
//!
//! Instead of importing each type individually, you can use:
//!
//! ```rust
//! use journal_disruptor::prelude::*;
//! ```

// Entries
pub use crate::journal::{EntryPayload, JournalEntry, JournalEntryBatch};

// Classification
pub use crate::journal::{EntryType, classify};

// Streams
pub use crate::journal::{
    EntryStream, MemoryEntryStream, RaftJournalEntryStream, RecordStream, StreamConfig,
};

// Disruption
pub use crate::journal::{DisruptionSummary, DisruptorConfig, DisruptorError, JournalDisruptor};

// Writing
pub use crate::journal::{JournalWriter, WriterConfig, WriterSummary};

// Codecs
pub use crate::journal::{BatchCodec, JsonBatchCodec};
#[cfg(feature = "bincode")]
pub use crate::journal::BincodeBatchCodec;

// Errors
pub use crate::journal::JournalError;

//! # Journal Disruptor
//!
//! Reads the write-ahead journal of a distributed metadata service, turns its
//! physical segment files back into the ordered sequence of logical metadata
//! mutations, and can deliberately delay one type of mutation to exercise
//! recovery and replay logic under test.
//!
//! ## Key Features
//!
//! - **Segment decoding**: Walks a Raft-style group directory
//!   (`log_<start>-<end>` and `log_inprogress_<start>` files) in index order,
//!   reading each segment through a read-only memory map and verifying a
//!   CRC32 on every record.
//!
//! - **Batch flattening**: State-machine records carry a batch of logical
//!   entries. The stream hands them out one at a time and skips protocol
//!   records (configuration changes, metadata) the state machine never sees.
//!
//! - **Stable classification**: Every entry maps to one of sixteen fixed
//!   type codes, usable from the command line by number or by name.
//!
//! - **Bounded disruption**: A [`JournalDisruptor`](journal::JournalDisruptor)
//!   holds each entry of a target type back for a fixed number of following
//!   entries, then releases it. The disrupted stream has the same shape as the
//!   raw one.
//!
//! - **Re-serialization**: A memory-mapped
//!   [`JournalWriter`](journal::JournalWriter) writes the (possibly disrupted)
//!   stream back into segment files with fresh sequence numbers.
//!
//! - **Pluggable codecs**: Batch payloads are JSON by default, or bincode
//!   with the `bincode` feature.
//!
//! ## Design
//!
//! Everything is single-threaded, synchronous and pull-based. Each
//! component's `next_entry()` returns before its caller proceeds, a stream
//! holds at most one open segment, and the disruptor owns nothing but its
//! wrapped stream and one held entry. Running out of entries is `Ok(None)`,
//! never an error; decode and I/O failures are fatal to the session.
//!
//! ## Segment Format
//!
//! ```text
//! ┌──────────────┐
//! │ "RaftLog1"   │ 8-byte segment header
//! ├──────────────┴─────────┬───────────┬──────────┬──────────┬─────────┬──────────┐
//! │ record_len (u32 LE)    │ index u64 │ term u64 │ kind u8  │ payload │ crc32 u32│
//! └────────────────────────┴───────────┴──────────┴──────────┴─────────┴──────────┘
//! ```
//!
//! `record_len` counts every byte after itself, CRC included, and the CRC
//! covers index, term, kind and payload. A zero `record_len` marks
//! the end of the written region of a pre-allocated segment.
//!
//! ## Example
//!
//! ```rust,no_run
//! use journal_disruptor::prelude::*;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = RaftJournalEntryStream::open("/var/journal")?;
//! let config = DisruptorConfig {
//!     target: EntryType::UpdateInode,
//!     step: 3,
//! };
//! let mut disruptor = JournalDisruptor::new(stream, config)?;
//!
//! let mut writer = JournalWriter::create("/tmp/disrupted", WriterConfig::default())?;
//! let summary = disruptor.disrupt_into(&mut writer)?;
//! writer.finish()?;
//! println!("{} entries, {} held", summary.entries_written, summary.stats.held);
//! # Ok(())
//! # }
//! ```
//!
//! ## Command Line
//!
//! The `demos` workspace member ships two binaries:
//!
//! - `journal_tool` prints (and optionally re-writes) a journal, with
//!   `--entry-type` and `--step` to disrupt it.
//! - `generate_journal` writes a small sample journal to try it on.
//!
//! ## Status
//! This project is a testing tool. It reads journals; it never modifies the
//! input directory.

pub mod journal;

pub mod prelude;

pub use journal::{
    DisruptorConfig, DisruptorError, EntryPayload, EntryStream, EntryType, JournalDisruptor,
    JournalEntry, JournalEntryBatch, JournalError, JournalWriter, RaftJournalEntryStream,
    StreamConfig, WriterConfig, classify,
};

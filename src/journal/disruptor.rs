//! Deliberate, bounded reordering of one entry type.
//!
//! A [`JournalDisruptor`] wraps an [`EntryStream`] and delays every entry of
//! the configured target type by `step` subsequent entries. Replaying the
//! result exercises the metadata service against entries applied later than
//! they were originally logged.
//!
//! The disruptor is itself an [`EntryStream`], so a writer or printer reads
//! a disrupted stream exactly like a raw one.
//!
//! ```text
//! input   A  B*  C  D  E        step = 2
//! output  A  C   D  B  E
//! ```
//!
//! At most one entry is held. A target entry pulled while another is held
//! is passed through like any other entry and counts towards the held
//! entry's release.

use super::classifier::{EntryType, classify};
use super::entry::JournalEntry;
use super::error::JournalError;
use super::stream::EntryStream;
use super::writer::JournalWriter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, trace};

/// Rejected disruptor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisruptorError {
    /// The step must be at least one entry.
    #[error("disrupt step must be positive, got {step}")]
    InvalidStep { step: u64 },

    /// The target code names no entry type.
    #[error("unknown entry type code: {code}")]
    UnknownEntryType { code: i32 },
}

/// What to delay and by how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptorConfig {
    /// Entries of this type are held back.
    pub target: EntryType,
    /// Number of entries emitted between a held entry and its release.
    pub step: u64,
}

impl Default for DisruptorConfig {
    fn default() -> Self {
        Self {
            target: EntryType::UpdateInode,
            step: 1,
        }
    }
}

impl DisruptorConfig {
    /// Build a config from a numeric type code.
    ///
    /// # Errors
    ///
    /// Returns [`DisruptorError::UnknownEntryType`] for codes outside the
    /// classifier's table and [`DisruptorError::InvalidStep`] for a zero
    /// step.
    pub fn from_code(code: i32, step: u64) -> Result<Self, DisruptorError> {
        let target = EntryType::from_code(code).ok_or(DisruptorError::UnknownEntryType { code })?;
        let config = Self { target, step };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`DisruptorError::InvalidStep`] if `step` is zero.
    pub fn validate(&self) -> Result<(), DisruptorError> {
        if self.step == 0 {
            return Err(DisruptorError::InvalidStep { step: self.step });
        }
        Ok(())
    }
}

/// Counters kept while disrupting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisruptorStats {
    /// Entries pulled from the wrapped stream.
    pub pulled: u64,
    /// Entries handed to the caller.
    pub emitted: u64,
    /// Hold events, one per delayed entry.
    pub held: u64,
    /// Held entries released because the wrapped stream ended.
    pub flushed_at_end: u64,
}

/// Result of [`JournalDisruptor::disrupt_into`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisruptionSummary {
    /// Entries handed to the writer.
    pub entries_written: u64,
    /// Disruptor counters at the end of the drain.
    pub stats: DisruptorStats,
}

#[derive(Debug)]
enum State {
    Idle,
    Holding {
        held: JournalEntry,
        steps_remaining: u64,
    },
}

/// Stream adapter that delays entries of one type.
#[derive(Debug)]
pub struct JournalDisruptor<S> {
    stream: S,
    config: DisruptorConfig,
    state: State,
    /// Pulled while releasing a held entry; emitted (or held) next.
    pending: Option<JournalEntry>,
    stats: DisruptorStats,
}

impl<S: EntryStream> JournalDisruptor<S> {
    /// Wrap `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`DisruptorError::InvalidStep`] if `config.step` is zero. No
    /// entry is pulled before the config is accepted.
    pub fn new(stream: S, config: DisruptorConfig) -> Result<Self, DisruptorError> {
        config.validate()?;
        Ok(Self {
            stream,
            config,
            state: State::Idle,
            pending: None,
            stats: DisruptorStats::default(),
        })
    }

    /// The configuration this disruptor was built with.
    #[must_use]
    pub fn config(&self) -> DisruptorConfig {
        self.config
    }

    /// Counters for the entries pulled so far.
    #[must_use]
    pub fn stats(&self) -> DisruptorStats {
        self.stats
    }

    /// Returns `true` while an entry is held back.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        matches!(self.state, State::Holding { .. })
    }

    /// Give back the wrapped stream. A held or pending entry is dropped.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Drain the disruptor into `writer`, which stamps fresh sequence
    /// numbers. Buffered entries are flushed before returning; the writer
    /// is not finished.
    ///
    /// # Errors
    ///
    /// Returns the first error from the wrapped stream or the writer.
    pub fn disrupt_into(&mut self, writer: &mut JournalWriter) -> Result<DisruptionSummary, JournalError> {
        let mut entries_written = 0u64;
        while let Some(entry) = self.next_entry()? {
            writer.write_entry(entry)?;
            entries_written += 1;
        }
        writer.flush()?;

        info!(
            target_type = %self.config.target,
            step = self.config.step,
            entries = entries_written,
            held = self.stats.held,
            "disruption drained into writer"
        );
        Ok(DisruptionSummary {
            entries_written,
            stats: self.stats,
        })
    }

    fn pull(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        if let Some(entry) = self.pending.take() {
            return Ok(Some(entry));
        }
        let entry = self.stream.next_entry()?;
        if entry.is_some() {
            self.stats.pulled += 1;
        }
        Ok(entry)
    }

    fn emit(&mut self, entry: JournalEntry) -> Option<JournalEntry> {
        self.stats.emitted += 1;
        Some(entry.without_sequence_number())
    }
}

impl<S: EntryStream> EntryStream for JournalDisruptor<S> {
    fn next_entry(&mut self) -> Result<Option<JournalEntry>, JournalError> {
        loop {
            let pulled = self.pull()?;
            match std::mem::replace(&mut self.state, State::Idle) {
                State::Idle => {
                    let Some(entry) = pulled else {
                        return Ok(None);
                    };
                    if classify(&entry) != self.config.target {
                        return Ok(self.emit(entry));
                    }
                    trace!(target_type = %self.config.target, step = self.config.step, "holding entry");
                    self.stats.held += 1;
                    self.state = State::Holding {
                        held: entry,
                        steps_remaining: self.config.step,
                    };
                }
                State::Holding {
                    held,
                    steps_remaining,
                } => match pulled {
                    None => {
                        trace!("stream ended, flushing held entry");
                        self.stats.flushed_at_end += 1;
                        return Ok(self.emit(held));
                    }
                    Some(entry) if steps_remaining > 0 => {
                        self.state = State::Holding {
                            held,
                            steps_remaining: steps_remaining - 1,
                        };
                        return Ok(self.emit(entry));
                    }
                    Some(entry) => {
                        trace!("releasing held entry");
                        self.pending = Some(entry);
                        return Ok(self.emit(held));
                    }
                },
            }
        }
    }
}

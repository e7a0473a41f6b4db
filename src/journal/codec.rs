//! Pluggable encoding of entry batches inside state-machine records.
//!
//! This module provides the [`BatchCodec`] trait and two built-in
//! implementations:
//!
//! - [`JsonBatchCodec`]: human-readable JSON (always available)
//! - `BincodeBatchCodec`: compact binary format (requires the `bincode`
//!   feature)
//!
//! Readers and writers hold an `Arc<dyn BatchCodec>`, so a journal written
//! with one codec must be read back with the same one.
//!
//! # Feature Gate
//!
//! ```toml
//! [dependencies]
//! journal-disruptor = { version = "0.1", features = ["bincode"] }
//! ```

use super::entry::JournalEntryBatch;
use std::sync::Arc;

/// Errors that can occur while encoding or decoding a batch.
#[derive(Debug)]
pub struct SerializationError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch serialization error: {}", self.message)
    }
}

impl std::error::Error for SerializationError {}

/// Converts [`JournalEntryBatch`] values to and from record payloads.
pub trait BatchCodec: Send + Sync + std::fmt::Debug {
    /// Serialize a batch into a payload.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the batch cannot be serialized.
    fn encode_batch(&self, batch: &JournalEntryBatch) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize a batch from a payload.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] if the bytes are malformed or were
    /// produced by a different codec.
    fn decode_batch(&self, data: &[u8]) -> Result<JournalEntryBatch, SerializationError>;

    /// Returns the MIME-like content type identifier for this format.
    #[must_use]
    fn content_type(&self) -> &'static str;
}

/// The codec used when none is configured.
#[must_use]
pub fn default_codec() -> Arc<dyn BatchCodec> {
    Arc::new(JsonBatchCodec::new())
}

// ─── JSON ───────────────────────────────────────────────────────────────────

/// JSON batch codec using `serde_json`.
///
/// # Content Type
///
/// `"application/json"`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBatchCodec;

impl JsonBatchCodec {
    /// Create a new JSON batch codec.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl BatchCodec for JsonBatchCodec {
    fn encode_batch(&self, batch: &JournalEntryBatch) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(batch).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    fn decode_batch(&self, data: &[u8]) -> Result<JournalEntryBatch, SerializationError> {
        serde_json::from_slice(data).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    #[inline]
    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

// ─── Bincode ────────────────────────────────────────────────────────────────

/// Bincode batch codec for compact binary payloads.
///
/// Uses the bincode standard configuration. Trailing bytes after a decoded
/// batch are rejected.
///
/// # Content Type
///
/// `"application/x-bincode"`
#[cfg(feature = "bincode")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeBatchCodec;

#[cfg(feature = "bincode")]
impl BincodeBatchCodec {
    /// Create a new Bincode batch codec.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "bincode")]
impl BatchCodec for BincodeBatchCodec {
    fn encode_batch(&self, batch: &JournalEntryBatch) -> Result<Vec<u8>, SerializationError> {
        bincode::serde::encode_to_vec(batch, bincode::config::standard()).map_err(|e| {
            SerializationError {
                message: e.to_string(),
            }
        })
    }

    fn decode_batch(&self, data: &[u8]) -> Result<JournalEntryBatch, SerializationError> {
        let (batch, read): (JournalEntryBatch, usize) =
            bincode::serde::decode_from_slice(data, bincode::config::standard()).map_err(
                |e| SerializationError {
                    message: e.to_string(),
                },
            )?;
        if read != data.len() {
            return Err(SerializationError {
                message: format!("{} trailing bytes after batch", data.len() - read),
            });
        }
        Ok(batch)
    }

    #[inline]
    fn content_type(&self) -> &'static str {
        "application/x-bincode"
    }
}

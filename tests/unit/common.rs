//! Fixtures shared by the integration tests.

use journal_disruptor::journal::{
    EntryPayload, EntryStream, JournalEntry, JournalEntryBatch, JournalWriter, NewBlockEntry,
    PersistDirectoryEntry, RaftJournalEntryStream, StreamConfig, UpdateInodeEntry, WriterConfig,
    WriterSummary,
};
use std::path::Path;

pub fn plain(id: u64) -> JournalEntry {
    JournalEntry::new(EntryPayload::PersistDirectory(PersistDirectoryEntry { id }))
}

pub fn update_inode(id: u64) -> JournalEntry {
    JournalEntry::new(EntryPayload::UpdateInode(UpdateInodeEntry {
        id,
        name: Some(format!("inode-{id}")),
        ..Default::default()
    }))
}

pub fn new_block(id: u64) -> JournalEntry {
    JournalEntry::new(EntryPayload::NewBlock(NewBlockEntry {
        id,
        block_id: id << 24,
    }))
}

pub fn ids(entries: &[JournalEntry]) -> Vec<u64> {
    entries
        .iter()
        .map(|e| e.payload.as_ref().and_then(|p| p.inode_id()).unwrap_or(u64::MAX))
        .collect()
}

/// Write each batch as one state-machine record into the default group.
pub fn write_batches(root: &Path, batches: &[Vec<JournalEntry>], segment_size: usize) -> WriterSummary {
    let config = WriterConfig {
        segment_size,
        ..Default::default()
    };
    let mut writer =
        JournalWriter::create(root, config).unwrap_or_else(|e| panic!("create writer: {e}"));
    for batch in batches {
        writer
            .append_batch(&JournalEntryBatch::new(batch.clone()))
            .unwrap_or_else(|e| panic!("append batch: {e}"));
    }
    writer.finish().unwrap_or_else(|e| panic!("finish: {e}"))
}

pub fn read_all(root: &Path, config: StreamConfig) -> Vec<JournalEntry> {
    let mut stream = RaftJournalEntryStream::open_with_config(root, config)
        .unwrap_or_else(|e| panic!("open stream: {e}"));
    let mut out = Vec::new();
    loop {
        match stream.next_entry() {
            Ok(Some(entry)) => out.push(entry),
            Ok(None) => break,
            Err(e) => panic!("read: {e}"),
        }
    }
    out
}

//! Write a small sample journal to try `journal_tool` on.
//!
//! The journal mimics a client creating files: each file gets an inode, a
//! few blocks, an inode update and a completion, with the occasional rename
//! and delete in between. A configuration record opens the log, as it does
//! in a freshly bootstrapped Raft group.

use clap::Parser;
use journal_disruptor::journal::{
    DEFAULT_GROUP_ID, DEFAULT_SEGMENT_SIZE, DeleteFileEntry, EntryPayload, InodeFileEntry,
    JournalEntry, JournalWriter, NewBlockEntry, RecordKind, RenameEntry, UpdateInodeEntry,
    UpdateInodeFileEntry, WriterConfig,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

const ROOT_INODE: u64 = 0;
const BLOCK_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "generate_journal")]
#[command(about = "Generate a sample Raft metadata journal")]
struct Cli {
    /// Directory the journal is written under
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Raft group to write
    #[arg(short, long, default_value_t = DEFAULT_GROUP_ID)]
    group_id: Uuid,

    /// Number of files to create
    #[arg(short, long, default_value_t = 20)]
    files: u64,

    /// Blocks written per file
    #[arg(short, long, default_value_t = 2)]
    blocks: u64,

    /// Entries per state-machine record
    #[arg(long, default_value_t = 8)]
    batch: usize,

    /// Segment size in bytes
    #[arg(long, default_value_t = DEFAULT_SEGMENT_SIZE)]
    segment_size: usize,
}

fn file_entries(file: u64, blocks: u64) -> Vec<JournalEntry> {
    let id = file + 1;
    let name = format!("file-{file:04}");
    let mut entries = vec![JournalEntry::new(EntryPayload::InodeFile(InodeFileEntry {
        id,
        parent_id: ROOT_INODE,
        name: name.clone(),
        block_size_bytes: BLOCK_SIZE,
        ..Default::default()
    }))];

    let block_ids: Vec<u64> = (0..blocks).map(|b| (id << 24) | b).collect();
    entries.extend(block_ids.iter().map(|&block_id| {
        JournalEntry::new(EntryPayload::NewBlock(NewBlockEntry { id, block_id }))
    }));

    entries.push(JournalEntry::new(EntryPayload::UpdateInode(UpdateInodeEntry {
        id,
        last_modification_time_ms: Some(1_700_000_000_000 + file as i64),
        ..Default::default()
    })));
    entries.push(JournalEntry::new(EntryPayload::UpdateInodeFile(
        UpdateInodeFileEntry {
            id,
            completed: Some(true),
            length: Some(BLOCK_SIZE * blocks),
            set_blocks: block_ids,
            ..Default::default()
        },
    )));

    if file % 5 == 3 {
        entries.push(JournalEntry::new(EntryPayload::Rename(RenameEntry {
            id,
            new_parent_id: ROOT_INODE,
            new_name: format!("{name}.renamed"),
            ..Default::default()
        })));
    }
    if file % 7 == 6 {
        entries.push(JournalEntry::new(EntryPayload::DeleteFile(DeleteFileEntry {
            id,
            op_time_ms: 1_700_000_000_000 + file as i64,
            ..Default::default()
        })));
    }
    entries
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let mut writer = JournalWriter::create(&cli.output_dir, WriterConfig {
        group_id: cli.group_id,
        segment_size: cli.segment_size,
        max_batch_entries: cli.batch,
        ..Default::default()
    })?;

    let peers = serde_json::json!({ "peers": ["localhost:19200"] });
    writer.append_record(RecordKind::Configuration, peers.to_string().as_bytes())?;

    for file in 0..cli.files {
        for entry in file_entries(file, cli.blocks) {
            writer.write_entry(entry)?;
        }
    }

    let summary = writer.finish()?;
    info!(
        records = summary.records,
        entries = summary.entries,
        segments = summary.segments,
        "sample journal written"
    );
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("generate_journal: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Print, disrupt and re-write a Raft metadata journal.
//!
//! ```text
//! journal_tool -i /var/journal                               # print every entry
//! journal_tool -i /var/journal -t update-inode -s 3 -o /tmp/out
//! journal_tool -i /var/journal --records --start 100 --end 200
//! ```
//!
//! Entries go to stdout as one JSON object per line, logs go to stderr. The
//! exit status is non-zero if the journal cannot be read to the end.

use clap::{ArgAction, Parser};
use journal_disruptor::journal::{
    DEFAULT_GROUP_ID, DisruptorConfig, EntryStream, EntryType, JournalDisruptor, JournalWriter,
    RaftJournalEntryStream, RecordStream, StreamConfig, WriterConfig,
};
use std::error::Error;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "journal_tool")]
#[command(about = "Read a Raft metadata journal, optionally delaying one entry type")]
struct Cli {
    /// Journal root directory (the one holding `raft/`)
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Raft group whose segments are read
    #[arg(short, long, default_value_t = DEFAULT_GROUP_ID)]
    group_id: Uuid,

    /// First log index to read
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Stop before this log index
    #[arg(long)]
    end: Option<u64>,

    /// Entry type to delay, by name or code (e.g. `update-inode`, `6`, `-1`)
    #[arg(short = 't', long, allow_hyphen_values = true)]
    entry_type: Option<EntryType>,

    /// Number of entries a delayed entry is held for
    #[arg(short, long, default_value_t = 1)]
    step: u64,

    /// Write the (disrupted) entries to a new journal under this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Print raw log records instead of entries
    #[arg(long, conflicts_with_all = ["entry_type", "output_dir"])]
    records: bool,

    /// Do not print entries
    #[arg(short, long)]
    quiet: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn setup_logger(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {e}");
    }
}

fn dump_records(cli: &Cli, config: StreamConfig) -> Result<u64, Box<dyn Error>> {
    let mut records = RecordStream::open(&cli.input_dir, config)?;
    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut count = 0u64;
    while let Some(record) = records.next_record()? {
        if !cli.quiet {
            let line = serde_json::json!({
                "index": record.index,
                "term": record.term,
                "kind": record.kind.to_string(),
                "payload_bytes": record.payload.len(),
            });
            writeln!(out, "{line}")?;
        }
        count += 1;
    }
    out.flush()?;
    info!(records = count, segments = records.stats().segments_opened, "records read");
    Ok(count)
}

fn dump_entries(cli: &Cli, config: StreamConfig) -> Result<u64, Box<dyn Error>> {
    let group_id = config.group_id;
    let stream = RaftJournalEntryStream::open_with_config(&cli.input_dir, config)?;

    let mut source: Box<dyn EntryStream> = match cli.entry_type {
        Some(target) => {
            let config = DisruptorConfig {
                target,
                step: cli.step,
            };
            info!(target_type = %target, code = target.code(), step = cli.step, "disrupting");
            Box::new(JournalDisruptor::new(stream, config)?)
        }
        None => {
            if cli.step != 1 {
                warn!(step = cli.step, "--step has no effect without --entry-type");
            }
            Box::new(stream)
        }
    };

    let mut writer = cli
        .output_dir
        .as_ref()
        .map(|dir| {
            JournalWriter::create(dir, WriterConfig {
                group_id,
                ..Default::default()
            })
        })
        .transpose()?;

    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut count = 0u64;
    while let Some(entry) = source.next_entry()? {
        if !cli.quiet {
            writeln!(out, "{}", serde_json::to_string(&entry)?)?;
        }
        if let Some(writer) = writer.as_mut() {
            writer.write_entry(entry)?;
        }
        count += 1;
    }
    out.flush()?;

    if let Some(writer) = writer {
        let summary = writer.finish()?;
        debug!(?summary, "output journal written");
    }
    info!(entries = count, "journal read to the end");
    Ok(count)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logger(cli.verbose);

    let config = StreamConfig {
        group_id: cli.group_id,
        start_index: cli.start,
        end_index: cli.end,
    };

    let result = if cli.records {
        dump_records(&cli, config)
    } else {
        dump_entries(&cli, config)
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("journal_tool: {e}");
            ExitCode::FAILURE
        }
    }
}

//! Streams over hand-built segment directories.

#[cfg(test)]
mod tests {
    use crate::common::{ids, plain, read_all};
    use journal_disruptor::journal::{
        BatchCodec, DEFAULT_GROUP_ID, JournalEntryBatch, JournalError, JsonBatchCodec, RecordKind,
        SEGMENT_HEADER, StreamConfig, encode_record, group_directory,
    };
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    fn batch_record(index: u64, ids: &[u64]) -> Vec<u8> {
        let batch = JournalEntryBatch::new(ids.iter().copied().map(plain).collect());
        let payload = JsonBatchCodec::new()
            .encode_batch(&batch)
            .unwrap_or_else(|e| panic!("encode batch: {e}"));
        encode_record(index, 3, RecordKind::StateMachineData, &payload)
            .unwrap_or_else(|e| panic!("encode record: {e}"))
    }

    fn group_dir(root: &Path) -> PathBuf {
        let dir = group_directory(root, DEFAULT_GROUP_ID);
        fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("mkdir: {e}"));
        dir
    }

    fn write_file(dir: &Path, name: &str, records: &[Vec<u8>], zero_tail: usize) {
        let mut file = fs::File::create(dir.join(name)).unwrap_or_else(|e| panic!("create: {e}"));
        file.write_all(SEGMENT_HEADER).unwrap_or_default();
        for record in records {
            file.write_all(record).unwrap_or_default();
        }
        file.write_all(&vec![0u8; zero_tail]).unwrap_or_default();
    }

    #[test]
    fn test_closed_then_open_segment_with_zero_tail() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let dir = group_dir(root.path());

        write_file(
            &dir,
            "log_0-1",
            &[
                encode_record(0, 3, RecordKind::Configuration, b"peers")
                    .unwrap_or_else(|e| panic!("encode: {e}")),
                batch_record(1, &[1, 2]),
            ],
            0,
        );
        write_file(
            &dir,
            "log_inprogress_2",
            &[batch_record(2, &[3]), batch_record(3, &[4, 5])],
            4096,
        );
        // not a segment
        fs::write(dir.join("raft-meta"), b"term=3").unwrap_or_default();

        let entries = read_all(root.path(), StreamConfig::default());
        assert_eq!(ids(&entries), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_empty_open_segment_ends_the_stream_quietly() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let dir = group_dir(root.path());
        write_file(&dir, "log_0-0", &[batch_record(0, &[7])], 0);
        fs::File::create(dir.join("log_inprogress_1")).unwrap_or_else(|e| panic!("create: {e}"));

        let entries = read_all(root.path(), StreamConfig::default());
        assert_eq!(ids(&entries), vec![7]);
    }

    #[test]
    fn test_record_outside_segment_range_is_rejected() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let dir = group_dir(root.path());
        write_file(&dir, "log_0-0", &[batch_record(0, &[1]), batch_record(1, &[2])], 0);

        let mut stream = journal_disruptor::RaftJournalEntryStream::open(root.path())
            .unwrap_or_else(|e| panic!("open: {e}"));
        let mut seen = Vec::new();
        let err = loop {
            match journal_disruptor::EntryStream::next_entry(&mut stream) {
                Ok(Some(entry)) => seen.push(entry),
                Ok(None) => panic!("expected an error"),
                Err(e) => break e,
            }
        };
        assert_eq!(ids(&seen), vec![1]);
        assert!(matches!(
            err,
            JournalError::IndexOutOfRange {
                index: 1,
                start_index: 0,
                end_index: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn test_group_directory_without_segments_is_empty() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        group_dir(root.path());
        assert!(read_all(root.path(), StreamConfig::default()).is_empty());
    }
}

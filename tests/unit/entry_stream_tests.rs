//! Entry stream behaviour over journals written to disk.

#[cfg(test)]
mod tests {
    use crate::common::{ids, new_block, plain, read_all, update_inode, write_batches};
    use journal_disruptor::journal::{
        DEFAULT_GROUP_ID, EntryStream, JournalError, JournalWriter, RaftJournalEntryStream,
        RecordKind, RecordStream, SEGMENT_HEADER_SIZE, RECORD_HEADER_SIZE, StreamConfig,
        WriterConfig, list_segments,
    };
    use uuid::Uuid;

    fn numbered_batches(batches: u64, per_batch: u64) -> Vec<Vec<journal_disruptor::JournalEntry>> {
        (0..batches)
            .map(|b| (0..per_batch).map(|i| plain(b * per_batch + i)).collect())
            .collect()
    }

    #[test]
    fn test_order_is_preserved_across_segments() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let summary = write_batches(root.path(), &numbered_batches(10, 3), 512);
        assert!(summary.segments > 1, "expected rotation, got {summary:?}");

        let segments = list_segments(root.path(), DEFAULT_GROUP_ID)
            .unwrap_or_else(|e| panic!("list: {e}"));
        assert_eq!(segments.len() as u64, summary.segments);
        assert!(segments.iter().all(|s| !s.is_open()));

        let entries = read_all(root.path(), StreamConfig::default());
        assert_eq!(ids(&entries), (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_segment_removed_after_open_ends_stream_with_io_error() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let summary = write_batches(root.path(), &numbered_batches(10, 3), 512);
        assert!(summary.segments > 1, "expected rotation, got {summary:?}");

        let mut stream =
            RaftJournalEntryStream::open(root.path()).unwrap_or_else(|e| panic!("open: {e}"));
        let segments = list_segments(root.path(), DEFAULT_GROUP_ID)
            .unwrap_or_else(|e| panic!("list: {e}"));
        std::fs::remove_file(&segments[1].path).unwrap_or_else(|e| panic!("remove: {e}"));

        let mut entries = Vec::new();
        let err = loop {
            match stream.next_entry() {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => panic!("stream ended without an error"),
                Err(e) => break e,
            }
        };
        match err {
            JournalError::Io { path, .. } => assert_eq!(path, Some(segments[1].path.clone())),
            other => panic!("unexpected error: {other}"),
        }

        let read = ids(&entries);
        assert!(!read.is_empty() && read.len() < 30);
        assert_eq!(read, (0..read.len() as u64).collect::<Vec<_>>());
        assert!(matches!(stream.next_entry(), Ok(None)));
    }

    #[test]
    fn test_entries_come_back_unchanged() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let batch = vec![
            update_inode(1),
            new_block(2),
            journal_disruptor::JournalEntry::unmatched(),
            plain(3).with_sequence_number(77),
        ];
        write_batches(root.path(), std::slice::from_ref(&batch), 4096);

        let entries = read_all(root.path(), StreamConfig::default());
        assert_eq!(entries, batch);
    }

    #[test]
    fn test_reading_twice_gives_the_same_sequence() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write_batches(root.path(), &numbered_batches(6, 4), 512);

        let first = read_all(root.path(), StreamConfig::default());
        let second = read_all(root.path(), StreamConfig::default());
        assert_eq!(first, second);
        assert_eq!(first.len(), 24);
    }

    #[test]
    fn test_start_index_skips_earlier_segments() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let summary = write_batches(root.path(), &numbered_batches(10, 3), 512);

        let config = StreamConfig {
            start_index: 6,
            ..Default::default()
        };
        let mut stream = RaftJournalEntryStream::open_with_config(root.path(), config)
            .unwrap_or_else(|e| panic!("open: {e}"));
        let mut entries = Vec::new();
        while let Ok(Some(entry)) = stream.next_entry() {
            entries.push(entry);
        }
        assert_eq!(ids(&entries), (18..30).collect::<Vec<_>>());
        assert!(stream.stats().segments_opened < summary.segments);
        assert_eq!(stream.stats().batches_decoded, 4);
    }

    #[test]
    fn test_end_index_stops_the_stream() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write_batches(root.path(), &numbered_batches(10, 3), 512);

        let config = StreamConfig {
            start_index: 2,
            end_index: Some(4),
            ..Default::default()
        };
        let entries = read_all(root.path(), config);
        assert_eq!(ids(&entries), (6..12).collect::<Vec<_>>());

        let empty = StreamConfig {
            start_index: 4,
            end_index: Some(4),
            ..Default::default()
        };
        assert!(read_all(root.path(), empty).is_empty());
    }

    #[test]
    fn test_missing_directory_and_group_are_configuration_errors() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));

        let missing = RaftJournalEntryStream::open(root.path().join("nope"));
        assert!(matches!(missing, Err(JournalError::InvalidDirectory { .. })));

        let no_group = RaftJournalEntryStream::open(root.path());
        match no_group {
            Err(err) => {
                assert!(err.is_configuration_error());
                assert!(matches!(err, JournalError::GroupNotFound { group_id, .. } if group_id == DEFAULT_GROUP_ID));
            }
            Ok(_) => panic!("expected GroupNotFound"),
        }
    }

    #[test]
    fn test_group_id_selects_the_directory() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let group_id = Uuid::new_v4();
        let mut writer = JournalWriter::create(root.path(), WriterConfig {
            group_id,
            ..Default::default()
        })
        .unwrap_or_else(|e| panic!("create: {e}"));
        assert!(writer.write_entry(plain(5)).is_ok());
        assert!(writer.finish().is_ok());

        assert!(RaftJournalEntryStream::open(root.path()).is_err());
        let entries = read_all(root.path(), StreamConfig {
            group_id,
            ..Default::default()
        });
        assert_eq!(ids(&entries), vec![5]);
        // writer stamps sequence numbers from zero
        assert_eq!(entries[0].sequence_number, Some(0));
    }

    #[test]
    fn test_corrupt_payload_fails_the_stream() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write_batches(root.path(), &numbered_batches(2, 2), 4096);

        let segments = list_segments(root.path(), DEFAULT_GROUP_ID)
            .unwrap_or_else(|e| panic!("list: {e}"));
        let path = &segments[0].path;
        let mut bytes = std::fs::read(path).unwrap_or_else(|e| panic!("read: {e}"));
        bytes[SEGMENT_HEADER_SIZE + RECORD_HEADER_SIZE] ^= 0xff;
        std::fs::write(path, &bytes).unwrap_or_else(|e| panic!("write: {e}"));

        let mut stream =
            RaftJournalEntryStream::open(root.path()).unwrap_or_else(|e| panic!("open: {e}"));
        assert!(matches!(
            stream.next_entry(),
            Err(JournalError::CorruptRecord { index: 0, .. })
        ));
        assert!(matches!(stream.next_entry(), Ok(None)));
    }

    #[test]
    fn test_record_stream_sees_protocol_records() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut writer = JournalWriter::create(root.path(), WriterConfig::default())
            .unwrap_or_else(|e| panic!("create: {e}"));
        assert!(writer.append_record(RecordKind::Configuration, b"conf").is_ok());
        assert!(writer.write_entry(plain(1)).is_ok());
        assert!(writer.flush().is_ok());
        assert!(writer.append_record(RecordKind::Metadata, b"meta").is_ok());
        assert!(writer.finish().is_ok());

        let records = RecordStream::open(root.path(), StreamConfig::default())
            .unwrap_or_else(|e| panic!("open: {e}"));
        let kinds: Vec<RecordKind> = records.filter_map(Result::ok).map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecordKind::Configuration,
                RecordKind::StateMachineData,
                RecordKind::Metadata
            ]
        );

        let entries = read_all(root.path(), StreamConfig::default());
        assert_eq!(ids(&entries), vec![1]);
    }
}

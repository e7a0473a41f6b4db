//! Disruption over real journals, plus ordering properties.

#[cfg(test)]
mod tests {
    use crate::common::{ids, new_block, plain, read_all, update_inode, write_batches};
    use journal_disruptor::journal::{
        DisruptorConfig, EntryStream, EntryType, JournalDisruptor, JournalEntry, JournalWriter,
        MemoryEntryStream, RaftJournalEntryStream, StreamConfig, WriterConfig,
    };
    use proptest::prelude::*;

    fn disrupt(input: Vec<JournalEntry>, target: EntryType, step: u64) -> Vec<JournalEntry> {
        let mut disruptor = JournalDisruptor::new(
            MemoryEntryStream::new(input),
            DisruptorConfig { target, step },
        )
        .unwrap_or_else(|e| panic!("disruptor: {e}"));
        let mut out = Vec::new();
        while let Ok(Some(entry)) = disruptor.next_entry() {
            out.push(entry);
        }
        out
    }

    fn pattern_entries(pattern: &[bool]) -> Vec<JournalEntry> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, &is_target)| {
                if is_target {
                    update_inode(i as u64)
                } else {
                    plain(i as u64)
                }
            })
            .collect()
    }

    #[test]
    fn test_disrupted_journal_round_trip() {
        let input = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let output = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write_batches(
            input.path(),
            &[
                vec![plain(1), update_inode(2)],
                vec![plain(3)],
                vec![new_block(4), plain(5)],
            ],
            4096,
        );

        let stream =
            RaftJournalEntryStream::open(input.path()).unwrap_or_else(|e| panic!("open: {e}"));
        let mut disruptor = JournalDisruptor::new(stream, DisruptorConfig {
            target: EntryType::UpdateInode,
            step: 2,
        })
        .unwrap_or_else(|e| panic!("disruptor: {e}"));

        let mut writer = JournalWriter::create(output.path(), WriterConfig {
            max_batch_entries: 2,
            ..Default::default()
        })
        .unwrap_or_else(|e| panic!("writer: {e}"));
        let summary = disruptor
            .disrupt_into(&mut writer)
            .unwrap_or_else(|e| panic!("disrupt: {e}"));
        let written = writer.finish().unwrap_or_else(|e| panic!("finish: {e}"));

        assert_eq!(summary.entries_written, 5);
        assert_eq!(summary.stats.held, 1);
        assert_eq!(written.entries, 5);
        assert_eq!(written.records, 3);

        let replayed = read_all(output.path(), StreamConfig::default());
        assert_eq!(ids(&replayed), vec![1, 3, 4, 2, 5]);
        let sequence: Vec<_> = replayed.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequence, (0..5).map(Some).collect::<Vec<_>>());

        // the input journal is left alone
        let original = read_all(input.path(), StreamConfig::default());
        assert_eq!(ids(&original), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_disrupted_stream_has_the_raw_stream_shape() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        write_batches(root.path(), &[vec![plain(1), new_block(2), plain(3)]], 4096);

        let raw: Box<dyn EntryStream> = Box::new(
            RaftJournalEntryStream::open(root.path()).unwrap_or_else(|e| panic!("open: {e}")),
        );
        let disrupted: Box<dyn EntryStream> = Box::new(
            JournalDisruptor::new(
                RaftJournalEntryStream::open(root.path()).unwrap_or_else(|e| panic!("open: {e}")),
                DisruptorConfig {
                    target: EntryType::NewBlock,
                    step: 1,
                },
            )
            .unwrap_or_else(|e| panic!("disruptor: {e}")),
        );

        let raw: Vec<_> = raw.entries().filter_map(Result::ok).collect();
        let disrupted: Vec<_> = disrupted.entries().filter_map(Result::ok).collect();
        assert_eq!(ids(&raw), vec![1, 2, 3]);
        assert_eq!(ids(&disrupted), vec![1, 3, 2]);
    }

    #[test]
    fn test_stream_errors_reach_the_caller() {
        let root = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut writer = JournalWriter::create(root.path(), WriterConfig::default())
            .unwrap_or_else(|e| panic!("create: {e}"));
        assert!(writer.write_entry(update_inode(1)).is_ok());
        assert!(writer.flush().is_ok());
        assert!(
            writer
                .append_record(
                    journal_disruptor::journal::RecordKind::StateMachineData,
                    b"not a batch"
                )
                .is_ok()
        );
        assert!(writer.finish().is_ok());

        let stream =
            RaftJournalEntryStream::open(root.path()).unwrap_or_else(|e| panic!("open: {e}"));
        let mut disruptor = JournalDisruptor::new(stream, DisruptorConfig::default())
            .unwrap_or_else(|e| panic!("disruptor: {e}"));
        assert!(disruptor.next_entry().is_err());
    }

    proptest! {
        #[test]
        fn disruption_is_a_permutation(
            pattern in proptest::collection::vec(any::<bool>(), 0..64),
            step in 1u64..8,
        ) {
            let out = disrupt(pattern_entries(&pattern), EntryType::UpdateInode, step);
            let mut sorted = ids(&out);
            sorted.sort_unstable();
            prop_assert_eq!(sorted, (0..pattern.len() as u64).collect::<Vec<_>>());
            prop_assert!(out.iter().all(|e| e.sequence_number.is_none()));
        }

        #[test]
        fn non_targets_keep_their_relative_order(
            pattern in proptest::collection::vec(any::<bool>(), 0..64),
            step in 1u64..8,
        ) {
            let out = disrupt(pattern_entries(&pattern), EntryType::UpdateInode, step);
            let non_targets: Vec<u64> = out
                .iter()
                .filter(|e| journal_disruptor::classify(e) != EntryType::UpdateInode)
                .filter_map(|e| e.payload.as_ref().and_then(|p| p.inode_id()))
                .collect();
            let expected: Vec<u64> = pattern
                .iter()
                .enumerate()
                .filter(|(_, is_target)| !**is_target)
                .map(|(i, _)| i as u64)
                .collect();
            prop_assert_eq!(non_targets, expected);
        }

        #[test]
        fn no_entry_moves_forward_more_than_step(
            pattern in proptest::collection::vec(any::<bool>(), 0..64),
            step in 1u64..8,
        ) {
            let out = disrupt(pattern_entries(&pattern), EntryType::UpdateInode, step);
            for (position, id) in ids(&out).into_iter().enumerate() {
                prop_assert!(position as u64 <= id + step);
                prop_assert!(position as u64 + 1 >= id);
            }
        }

        #[test]
        fn without_targets_the_stream_is_unchanged(
            len in 0u64..64,
            step in 1u64..8,
        ) {
            let input: Vec<_> = (0..len).map(plain).collect();
            let out = disrupt(input.clone(), EntryType::UpdateInode, step);
            prop_assert_eq!(out, input);
        }
    }
}

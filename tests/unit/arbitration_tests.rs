#[cfg(test)]
mod tests_arbitration {
    use marketfeed_rs::prelude::*;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::thread;

    /// Records every delivered sequence after checking each message body
    /// carries its own sequence number.
    #[derive(Default)]
    struct SequenceRecorder {
        delivered: Mutex<Vec<u64>>,
        corrupted: Mutex<Vec<u64>>,
    }

    impl SequenceRecorder {
        fn delivered(&self) -> Vec<u64> {
            self.delivered.lock().expect("delivered lock").clone()
        }

        fn corrupted(&self) -> Vec<u64> {
            self.corrupted.lock().expect("corrupted lock").clone()
        }
    }

    impl MarketDataPublisher for SequenceRecorder {
        fn publish(&self, _bytes: &[u8]) -> bool {
            true
        }

        fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, bytes: &[u8]) -> bool {
            assert!(gap_count <= 0, "delivery ahead of the stream: gap {gap_count}");
            let already_delivered = gap_count.unsigned_abs();
            let walker = LengthPrefixedWalker;
            let mut offset = walker.walk_to(bytes, 0, already_delivered as usize);

            let mut delivered = self.delivered.lock().expect("delivered lock");
            for current in seq + already_delivered..seq + u64::from(msg_count) {
                let length = walker.length(bytes, offset);
                let body = bytes
                    .get(offset..offset + length)
                    .and_then(LengthPrefixedWalker::payload);
                if body != Some(&current.to_le_bytes()[..]) {
                    self.corrupted.lock().expect("corrupted lock").push(current);
                }
                delivered.push(current);
                offset += length;
            }
            true
        }
    }

    fn batch(from_seq: u64, msg_count: u64) -> Vec<u8> {
        let mut bytes = Vec::new();
        for seq in from_seq..from_seq + msg_count {
            assert!(LengthPrefixedWalker::encode(&seq.to_le_bytes(), &mut bytes));
        }
        bytes
    }

    /// Batches of `batch_size` covering `[first, last]`.
    fn line(first: u64, last: u64, batch_size: u64) -> Vec<(u64, u32, Vec<u8>)> {
        (first..=last)
            .step_by(batch_size as usize)
            .map(|from| {
                let count = batch_size.min(last + 1 - from);
                (from, count as u32, batch(from, count))
            })
            .collect()
    }

    fn config(start_seq: u64, spool_capacity: usize) -> ArbitratorConfig {
        ArbitratorConfig::default()
            .with_channel_id(7)
            .with_start_seq(start_seq)
            .with_spool_capacity(spool_capacity)
            .with_max_message_length(16)
    }

    #[test]
    fn redundant_lines_deliver_every_message_once_in_order() {
        const LAST_SEQ: u64 = 20_000;
        let arbitrator = ChannelArbitrator::new(&config(1, 1 << 16), SequenceRecorder::default())
            .expect("arbitrator");

        // line A loses every seventh batch, line B reorders neighbouring
        // batches; together they still carry every message
        let line_a: Vec<_> = line(1, LAST_SEQ, 3)
            .into_iter()
            .enumerate()
            .filter(|(i, _)| i % 7 != 3)
            .map(|(_, b)| b)
            .collect();
        let mut line_b = line(1, LAST_SEQ, 2);
        for pair in line_b.chunks_mut(2) {
            pair.reverse();
        }

        thread::scope(|scope| {
            for batches in [&line_a, &line_b] {
                let arbitrator = &arbitrator;
                scope.spawn(move || {
                    for (from_seq, msg_count, bytes) in batches {
                        arbitrator
                            .publish(*from_seq, *msg_count, bytes)
                            .expect("publish");
                    }
                });
            }
        });

        let delivered = arbitrator.publisher().delivered();
        assert_eq!(delivered.len() as u64, LAST_SEQ);
        assert!(delivered.iter().copied().eq(1..=LAST_SEQ));
        assert!(arbitrator.publisher().corrupted().is_empty());
        assert_eq!(arbitrator.next_expected_seq(), LAST_SEQ + 1);
        assert_eq!(arbitrator.largest_received_seq(), LAST_SEQ);
        assert!(!arbitrator.spool().is_available(LAST_SEQ + 1));
    }

    #[test]
    fn many_producers_with_identical_streams() {
        const LAST_SEQ: u64 = 5_000;
        let arbitrator = ChannelArbitrator::new(&config(1, 1 << 13), SequenceRecorder::default())
            .expect("arbitrator");
        let batches = line(1, LAST_SEQ, 4);

        thread::scope(|scope| {
            for _ in 0..4 {
                let arbitrator = &arbitrator;
                let batches = &batches;
                scope.spawn(move || {
                    for (from_seq, msg_count, bytes) in batches {
                        arbitrator
                            .publish(*from_seq, *msg_count, bytes)
                            .expect("publish");
                    }
                });
            }
        });

        let delivered = arbitrator.publisher().delivered();
        assert!(delivered.iter().copied().eq(1..=LAST_SEQ));
        let stats = arbitrator.stats().snapshot();
        assert!(stats.stale_dropped > 0 || stats.spooled > 0);
    }

    #[test]
    fn channel_manager_routes_by_channel() {
        let manager: ChannelManager<SequenceRecorder> = ChannelManager::new();
        for channel_id in [1, 2] {
            let config = config(1, 64).with_channel_id(channel_id);
            manager
                .add_channel(&config, SequenceRecorder::default(), NullGapHandler)
                .expect("add channel");
        }

        manager.publish(1, 2, 1, &batch(2, 1)).expect("publish");
        manager.publish(1, 1, 1, &batch(1, 1)).expect("publish");
        manager.publish(2, 1, 3, &batch(1, 3)).expect("publish");

        let first = manager.get(1).expect("channel 1");
        let second = manager.get(2).expect("channel 2");
        assert_eq!(first.publisher().delivered(), vec![1, 2]);
        assert_eq!(second.publisher().delivered(), vec![1, 2, 3]);
        assert!(matches!(
            manager.publish(9, 1, 1, &batch(1, 1)),
            Err(FeedError::UnknownChannel { channel_id: 9 })
        ));
    }

    fn arrival_order() -> impl Strategy<Value = (u64, Vec<u64>)> {
        (1u64..60).prop_flat_map(|last| {
            let seqs: Vec<u64> = (1..=last).collect();
            (
                Just(last),
                Just(seqs).prop_shuffle(),
                prop::collection::vec((1..=last, any::<prop::sample::Index>()), 0..16),
            )
                .prop_map(|(last, mut order, duplicates)| {
                    for (seq, at) in duplicates {
                        let position = at.index(order.len() + 1);
                        order.insert(position, seq);
                    }
                    (last, order)
                })
        })
    }

    proptest! {
        #[test]
        fn any_arrival_order_is_delivered_in_sequence((last, order) in arrival_order()) {
            let arbitrator = ChannelArbitrator::new(&config(1, 64), SequenceRecorder::default())
                .expect("arbitrator");
            for seq in order {
                arbitrator.publish(seq, 1, &batch(seq, 1)).expect("publish");
            }
            let delivered = arbitrator.publisher().delivered();
            prop_assert!(delivered.iter().copied().eq(1..=last));
            prop_assert_eq!(arbitrator.next_expected_seq(), last + 1);
            prop_assert!(arbitrator.publisher().corrupted().is_empty());
        }
    }
}

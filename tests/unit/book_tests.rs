#[cfg(test)]
mod tests_book_refresh {
    use marketfeed_rs::prelude::*;
    use std::sync::{Arc, Mutex};

    const BID: u8 = 0;
    const ASK: u8 = 1;

    /// `sec_sid | side | level count | (price, quantity)*`, little endian.
    fn refresh(sec_sid: u64, side: u8, levels: &[(Price, u64)], out: &mut Vec<u8>) {
        let mut payload = Vec::with_capacity(10 + levels.len() * 16);
        payload.extend_from_slice(&sec_sid.to_le_bytes());
        payload.push(side);
        payload.push(levels.len() as u8);
        for (price, quantity) in levels {
            payload.extend_from_slice(&price.to_le_bytes());
            payload.extend_from_slice(&quantity.to_le_bytes());
        }
        assert!(LengthPrefixedWalker::encode(&payload, out));
    }

    fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
        bytes
            .get(at..at + 8)
            .and_then(|raw| raw.try_into().ok())
            .map(u64::from_le_bytes)
    }

    /// Applies side refreshes to the books of a [`BookManager`].
    struct BookRefresher {
        books: Mutex<BookManager>,
    }

    impl BookRefresher {
        fn apply(&self, seq: u64, payload: &[u8]) -> Option<()> {
            let sec_sid = read_u64(payload, 0)?;
            let side = *payload.get(8)?;
            let count = *payload.get(9)? as usize;

            let mut books = self.books.lock().ok()?;
            let book = books.get_book_mut(sec_sid)?;
            book.set_channel_seq_num(seq);
            match side {
                BID => book.bid_side_mut().clear(),
                _ => book.ask_side_mut().clear(),
            }
            for level in 0..count {
                let at = 10 + level * 16;
                let price = read_u64(payload, at)? as Price;
                let quantity = read_u64(payload, at + 8)?;
                let created = match side {
                    BID => book.bid_side_mut().create(price, quantity),
                    _ => book.ask_side_mut().create(price, quantity),
                };
                created.ok()?;
            }
            Some(())
        }
    }

    impl MarketDataPublisher for BookRefresher {
        fn publish(&self, _bytes: &[u8]) -> bool {
            false
        }

        fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, bytes: &[u8]) -> bool {
            let walker = LengthPrefixedWalker;
            let skip = gap_count.unsigned_abs() as usize;
            let mut offset = walker.walk_to(bytes, 0, skip);
            for current in seq + skip as u64..seq + u64::from(msg_count) {
                let length = walker.length(bytes, offset);
                let Some(payload) = bytes
                    .get(offset..offset + length)
                    .and_then(LengthPrefixedWalker::payload)
                else {
                    return false;
                };
                if self.apply(current, payload).is_none() {
                    return false;
                }
                offset += length;
            }
            true
        }
    }

    fn refresher() -> BookRefresher {
        let table = Arc::new(SpreadTable::hkex_securities(1).expect("hkex"));
        let mut books = BookManager::new(5, table);
        books.add_book(700);
        books.add_book(5);
        BookRefresher {
            books: Mutex::new(books),
        }
    }

    fn arbitrator() -> ChannelArbitrator<BookRefresher> {
        let config = ArbitratorConfig::default()
            .with_start_seq(1)
            .with_spool_capacity(16)
            .with_max_message_length(128);
        ChannelArbitrator::new(&config, refresher()).expect("arbitrator")
    }

    fn snapshot(arbitrator: &ChannelArbitrator<BookRefresher>, sec_sid: u64) -> BookSnapshot {
        let books = arbitrator.publisher().books.lock().expect("books lock");
        books.get_book(sec_sid).expect("book").snapshot()
    }

    #[test]
    fn refreshes_applied_in_sequence_after_gap_fill() {
        let arbitrator = arbitrator();

        let mut first = Vec::new();
        refresh(700, BID, &[(355_200, 1_000), (355_000, 2_000)], &mut first);
        let mut second = Vec::new();
        refresh(700, ASK, &[(355_400, 500), (355_600, 700)], &mut second);
        let mut third = Vec::new();
        refresh(700, BID, &[(355_400, 300)], &mut third);

        assert!(arbitrator.publish(3, 1, &third).expect("publish"));
        assert!(arbitrator.publish(2, 1, &second).expect("publish"));
        assert_eq!(snapshot(&arbitrator, 700).channel_seq_num, 0);

        assert!(!arbitrator.publish(1, 1, &first).expect("publish"));
        let book = snapshot(&arbitrator, 700);
        assert_eq!(book.channel_seq_num, 3);
        // the third refresh replaced the whole bid side
        assert_eq!(book.best_bid(), Some((355_400, 300)));
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.best_ask(), Some((355_400, 500)));
        assert_eq!(book.spread(), Some(0));
        assert_eq!(arbitrator.stats().snapshot().drained, 2);
    }

    #[test]
    fn batched_refreshes_for_two_securities() {
        let arbitrator = arbitrator();

        let mut batch = Vec::new();
        refresh(5, BID, &[(41_950, 10_000), (41_900, 20_000)], &mut batch);
        refresh(5, ASK, &[(42_000, 5_000), (42_050, 8_000)], &mut batch);
        refresh(700, ASK, &[(355_400, 100)], &mut batch);
        assert!(!arbitrator.publish(1, 3, &batch).expect("publish"));

        let five = snapshot(&arbitrator, 5);
        assert_eq!(five.channel_seq_num, 2);
        assert_eq!(five.best_bid(), Some((41_950, 10_000)));
        assert_eq!(five.best_ask(), Some((42_000, 5_000)));
        assert_eq!(five.spread(), Some(50));

        let json = five.to_json().expect("json");
        assert_eq!(BookSnapshot::from_json(&json).expect("snapshot"), five);

        let seven_hundred = snapshot(&arbitrator, 700);
        assert_eq!(seven_hundred.channel_seq_num, 3);
        assert!(seven_hundred.bids.is_empty());
    }

    #[test]
    fn overlapping_retransmission_applies_only_new_messages() {
        let arbitrator = arbitrator();

        let mut one = Vec::new();
        refresh(5, BID, &[(41_950, 10_000)], &mut one);
        arbitrator.publish(1, 1, &one).expect("publish");

        // seq 1 again plus seq 2; the repeated refresh must not be re-applied
        let mut retransmission = Vec::new();
        refresh(5, BID, &[(41_000, 1)], &mut retransmission);
        refresh(5, ASK, &[(42_000, 5_000)], &mut retransmission);
        arbitrator.publish(1, 2, &retransmission).expect("publish");

        let book = snapshot(&arbitrator, 5);
        assert_eq!(book.best_bid(), Some((41_950, 10_000)));
        assert_eq!(book.best_ask(), Some((42_000, 5_000)));
        assert_eq!(arbitrator.next_expected_seq(), 3);
    }

    #[test]
    fn unknown_security_is_rejected_by_publisher() {
        let arbitrator = arbitrator();
        let mut unknown = Vec::new();
        refresh(99, BID, &[(41_950, 10_000)], &mut unknown);
        arbitrator.publish(1, 1, &unknown).expect("publish");

        assert_eq!(arbitrator.next_expected_seq(), 2);
        assert_eq!(arbitrator.stats().snapshot().publish_rejected, 1);
    }
}

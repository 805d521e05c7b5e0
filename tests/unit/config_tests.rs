#[cfg(test)]
mod tests_config {
    use marketfeed_rs::prelude::*;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    const FEED: &str = r#"{
        "book_depth": 5,
        "channels": [
            { "channel_id": 1, "start_seq": 1, "spool_capacity": 64, "max_message_length": 64 },
            { "channel_id": 2, "start_seq": 100, "spool_capacity": 128, "gap_alert_threshold": 3 }
        ],
        "spread_tables": [
            {
                "id": 1,
                "name": "small",
                "decimal_place": 3,
                "hash_threshold": 500,
                "details": [
                    { "from_price": 250, "to_price_exclusive": 1000, "spread": 5 },
                    { "from_price": 10, "to_price_exclusive": 250, "spread": 1 }
                ]
            }
        ]
    }"#;

    #[derive(Default)]
    struct Counter(AtomicU64);

    impl MarketDataPublisher for Counter {
        fn publish(&self, _bytes: &[u8]) -> bool {
            self.0.fetch_add(1, Ordering::Relaxed);
            true
        }
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn load_feed_from_file() {
        let file = write_config(FEED);
        let config = FeedConfig::from_path(file.path()).expect("load config");

        assert_eq!(config.book_depth, 5);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].gap_alert_threshold, 3);
        // unspecified fields fall back to defaults
        assert_eq!(config.channels[1].max_message_length, 1500);

        let table = config.build_spread_table(1).expect("spread table");
        assert_eq!(table.name(), "small");
        assert_eq!(table.price_to_tick(255), Ok(242));
        assert_eq!(table.price_to_tick(500), Ok(291));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = FeedConfig::from_json_str(FEED).expect("parse");
        let json = config.to_json().expect("serialize");
        let file = write_config(&json);
        assert_eq!(FeedConfig::from_path(file.path()).expect("reload"), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        match FeedConfig::from_path(&path) {
            Err(FeedError::Io {
                path: Some(reported),
                ..
            }) => assert_eq!(reported, path),
            other => panic!("expected an io error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_file_is_a_serialization_error() {
        let file = write_config("{ \"book_depth\": ");
        assert!(matches!(
            FeedConfig::from_path(file.path()),
            Err(FeedError::Serialization { .. })
        ));
    }

    #[test]
    fn unknown_spread_table() {
        let config = FeedConfig::from_json_str(FEED).expect("parse");
        assert!(matches!(
            config.build_book_manager(7),
            Err(FeedError::UnknownSpreadTable { id: 7 })
        ));
    }

    #[test]
    fn configured_channels_and_books() {
        let config = FeedConfig::from_json_str(FEED).expect("parse");
        let manager: ChannelManager<Arc<Counter>> =
            ChannelManager::from_config(&config, |_| (Arc::new(Counter::default()), NullGapHandler))
                .expect("channels");
        assert_eq!(manager.channel_ids(), vec![1, 2]);

        let second = manager.get(2).expect("channel 2");
        assert_eq!(second.next_expected_seq(), 100);
        assert_eq!(second.gap_alert_threshold(), 3);
        assert_eq!(second.spool().capacity(), 128);

        let mut frame = Vec::new();
        assert!(LengthPrefixedWalker::encode(b"x", &mut frame));
        manager.publish(2, 100, 1, &frame).expect("publish");
        assert_eq!(second.publisher().0.load(Ordering::Relaxed), 1);

        let mut books = config.build_book_manager(1).expect("books");
        let book = books.add_book(42);
        assert_eq!(book.bid_side().depth(), 5);
        assert!(book.ask_side_mut().create(255, 10).expect("on tick"));
        assert_eq!(book.best_ask().map(Tick::tick_level), Some(242));
    }
}

//! Feed configuration.
//!
//! Everything is plain serde data so a feed can be described in one JSON
//! document:
//!
//! ```json
//! {
//!   "book_depth": 10,
//!   "channels": [
//!     { "channel_id": 1, "spool_capacity": 4096, "gap_alert_threshold": 100 }
//!   ],
//!   "spread_tables": [
//!     {
//!       "id": 1,
//!       "name": "example",
//!       "decimal_place": 3,
//!       "hash_threshold": 500,
//!       "details": [
//!         { "from_price": 10, "to_price_exclusive": 250, "spread": 1 },
//!         { "from_price": 250, "to_price_exclusive": 1000, "spread": 5 }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Missing fields take their defaults.

use crate::error::FeedError;
use crate::marketdata::{BookManager, Price, SpreadTable, SpreadTableDetails, SpreadTableError};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default number of slots in a channel's spool.
pub const DEFAULT_SPOOL_CAPACITY: usize = 4096;

/// Default largest message accepted into a spool, in bytes.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 1500;

/// Default gap width that triggers the gap handler.
pub const DEFAULT_GAP_ALERT_THRESHOLD: u64 = 100;

/// Default bound on the ring buffer commit wait, in milliseconds.
pub const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 1_000;

/// Default number of price levels per order book side.
pub const DEFAULT_BOOK_DEPTH: usize = 10;

/// Settings of one [`ChannelArbitrator`](crate::sequencer::ChannelArbitrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitratorConfig {
    /// Channel identifier, passed to the gap handler
    pub channel_id: u32,
    /// First sequence expected on the channel
    pub start_seq: u64,
    /// Number of spool slots, a power of two
    pub spool_capacity: usize,
    /// Largest single message, in bytes
    pub max_message_length: usize,
    /// Gap width above which the gap handler is notified
    pub gap_alert_threshold: u64,
    /// Bound on the ring buffer commit wait, in milliseconds
    pub commit_timeout_ms: u64,
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self {
            channel_id: 0,
            start_seq: 0,
            spool_capacity: DEFAULT_SPOOL_CAPACITY,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            gap_alert_threshold: DEFAULT_GAP_ALERT_THRESHOLD,
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
        }
    }
}

impl ArbitratorConfig {
    /// Sets the channel id.
    #[must_use]
    pub fn with_channel_id(mut self, channel_id: u32) -> Self {
        self.channel_id = channel_id;
        self
    }

    /// Sets the first expected sequence.
    #[must_use]
    pub fn with_start_seq(mut self, start_seq: u64) -> Self {
        self.start_seq = start_seq;
        self
    }

    /// Sets the number of spool slots.
    #[must_use]
    pub fn with_spool_capacity(mut self, spool_capacity: usize) -> Self {
        self.spool_capacity = spool_capacity;
        self
    }

    /// Sets the largest accepted message length.
    #[must_use]
    pub fn with_max_message_length(mut self, max_message_length: usize) -> Self {
        self.max_message_length = max_message_length;
        self
    }

    /// Sets the gap alert threshold.
    #[must_use]
    pub fn with_gap_alert_threshold(mut self, gap_alert_threshold: u64) -> Self {
        self.gap_alert_threshold = gap_alert_threshold;
        self
    }

    /// Sets the commit timeout.
    #[must_use]
    pub fn with_commit_timeout(mut self, commit_timeout: Duration) -> Self {
        self.commit_timeout_ms = commit_timeout.as_millis() as u64;
        self
    }

    /// Commit timeout as a [`Duration`].
    #[must_use]
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    /// Spool settings derived from this configuration.
    #[must_use]
    pub fn spool_config(&self) -> SpoolConfig {
        SpoolConfig {
            capacity: self.spool_capacity,
            max_message_length: self.max_message_length,
            commit_timeout: self.commit_timeout(),
        }
    }

    /// Checks the values without building anything.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), FeedError> {
        let invalid = |message: String| Err(FeedError::InvalidConfig { message });
        if self.spool_capacity == 0 || !self.spool_capacity.is_power_of_two() {
            return invalid(format!(
                "channel {}: spool_capacity must be a non-zero power of two, got {}",
                self.channel_id, self.spool_capacity
            ));
        }
        if self.max_message_length == 0 {
            return invalid(format!(
                "channel {}: max_message_length must be greater than zero",
                self.channel_id
            ));
        }
        if self.commit_timeout_ms == 0 {
            return invalid(format!(
                "channel {}: commit_timeout_ms must be greater than zero",
                self.channel_id
            ));
        }
        Ok(())
    }
}

/// Sizing of a [`Spool`](crate::sequencer::Spool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolConfig {
    /// Number of slots, a power of two
    pub capacity: usize,
    /// Largest single message, in bytes
    pub max_message_length: usize,
    /// Bound on the ring buffer commit wait
    pub commit_timeout: Duration,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        ArbitratorConfig::default().spool_config()
    }
}

/// Description of one [`SpreadTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadTableConfig {
    /// Table identifier
    pub id: u8,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    /// Number of implied decimal places in prices
    #[serde(default)]
    pub decimal_place: u32,
    /// First price served by the hash-backed converter
    pub hash_threshold: Price,
    /// Price bands, in any order
    pub details: Vec<SpreadTableDetails>,
}

impl SpreadTableConfig {
    /// Builds the table.
    ///
    /// # Errors
    ///
    /// Any [`SpreadTableError`] raised while validating the bands.
    pub fn build(&self) -> Result<SpreadTable, SpreadTableError> {
        SpreadTable::new(
            self.id,
            self.name.clone(),
            self.decimal_place,
            self.hash_threshold,
            self.details.iter().copied(),
        )
    }
}

/// Complete feed description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Price levels per order book side
    pub book_depth: usize,
    /// One entry per subscribed channel
    pub channels: Vec<ArbitratorConfig>,
    /// Spread tables referenced by the books
    pub spread_tables: Vec<SpreadTableConfig>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            book_depth: DEFAULT_BOOK_DEPTH,
            channels: Vec::new(),
            spread_tables: Vec::new(),
        }
    }
}

impl FeedConfig {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// [`FeedError::Serialization`] for malformed JSON, or any error of
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self, FeedError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// [`FeedError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| FeedError::Io {
            message: e.to_string(),
            path: Some(path.to_path_buf()),
        })?;
        let config = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            channels = config.channels.len(),
            spread_tables = config.spread_tables.len(),
            "feed configuration loaded"
        );
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`FeedError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, FeedError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks depth, channel settings and id uniqueness.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidConfig`] or [`FeedError::DuplicateChannel`].
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.book_depth == 0 {
            return Err(FeedError::InvalidConfig {
                message: "book_depth must be greater than zero".to_string(),
            });
        }

        let mut channel_ids = FxHashSet::default();
        for channel in &self.channels {
            channel.validate()?;
            if !channel_ids.insert(channel.channel_id) {
                return Err(FeedError::DuplicateChannel {
                    channel_id: channel.channel_id,
                });
            }
        }

        let mut table_ids = FxHashSet::default();
        for table in &self.spread_tables {
            if !table_ids.insert(table.id) {
                return Err(FeedError::InvalidConfig {
                    message: format!("spread table id {} is configured twice", table.id),
                });
            }
        }
        Ok(())
    }

    /// Builds the spread table configured with `id`.
    ///
    /// # Errors
    ///
    /// [`FeedError::UnknownSpreadTable`] if no table has that id, or
    /// [`FeedError::SpreadTable`] if its bands are invalid.
    pub fn build_spread_table(&self, id: u8) -> Result<SpreadTable, FeedError> {
        let table = self
            .spread_tables
            .iter()
            .find(|table| table.id == id)
            .ok_or(FeedError::UnknownSpreadTable { id })?;
        Ok(table.build()?)
    }

    /// Builds an empty [`BookManager`] quoting in the spread table `id`.
    ///
    /// # Errors
    ///
    /// As [`build_spread_table`](Self::build_spread_table).
    pub fn build_book_manager(&self, spread_table_id: u8) -> Result<BookManager, FeedError> {
        let table = self.build_spread_table(spread_table_id)?;
        Ok(BookManager::new(self.book_depth, Arc::new(table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbitrator_defaults() {
        let config = ArbitratorConfig::default();
        assert_eq!(config.spool_capacity, 4096);
        assert_eq!(config.max_message_length, 1500);
        assert_eq!(config.gap_alert_threshold, 100);
        assert_eq!(config.commit_timeout(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = ArbitratorConfig::default()
            .with_channel_id(9)
            .with_start_seq(500)
            .with_spool_capacity(64)
            .with_commit_timeout(Duration::from_millis(250));
        assert_eq!(config.channel_id, 9);
        assert_eq!(config.start_seq, 500);
        assert_eq!(config.spool_config().capacity, 64);
        assert_eq!(config.spool_config().commit_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_spool_capacity() {
        let config = ArbitratorConfig::default().with_spool_capacity(1000);
        assert!(matches!(
            config.validate(),
            Err(FeedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = FeedConfig::from_json_str(r#"{ "channels": [ { "channel_id": 2 } ] }"#).unwrap();
        assert_eq!(config.book_depth, 10);
        assert_eq!(config.channels[0].channel_id, 2);
        assert_eq!(config.channels[0].spool_capacity, 4096);
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let json = r#"{ "channels": [ { "channel_id": 2 }, { "channel_id": 2 } ] }"#;
        assert!(matches!(
            FeedConfig::from_json_str(json),
            Err(FeedError::DuplicateChannel { channel_id: 2 })
        ));
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(matches!(
            FeedConfig::from_json_str(r#"{ "book_depth": 0 }"#),
            Err(FeedError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_spread_table_build() {
        let json = r#"{
            "spread_tables": [{
                "id": 4,
                "name": "small",
                "decimal_place": 3,
                "hash_threshold": 15,
                "details": [
                    { "from_price": 15, "to_price_exclusive": 29, "spread": 5 },
                    { "from_price": 10, "to_price_exclusive": 15, "spread": 1 }
                ]
            }]
        }"#;
        let config = FeedConfig::from_json_str(json).unwrap();
        let table = config.build_spread_table(4).unwrap();
        assert_eq!(table.max_level(), 8);
        assert!(matches!(
            config.build_spread_table(5),
            Err(FeedError::UnknownSpreadTable { id: 5 })
        ));

        let manager = config.build_book_manager(4).unwrap();
        assert_eq!(manager.book_depth(), 10);
    }

    #[test]
    fn test_json_round_trip() {
        let config = FeedConfig {
            book_depth: 5,
            channels: vec![ArbitratorConfig::default().with_channel_id(1)],
            spread_tables: Vec::new(),
        };
        let json = config.to_json().unwrap();
        assert_eq!(FeedConfig::from_json_str(&json).unwrap(), config);
    }
}

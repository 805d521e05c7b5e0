//! Market order book: a bid side and an ask side plus feed metadata.

use super::side::{AskSide, BidSide};
use super::spread_table::SpreadTable;
use super::tick::{Price, Tick};
use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Fixed-depth order book for one security.
///
/// `channel_seq_num`, `transact_nano_of_day` and `is_recovery` are advisory
/// metadata written by whoever applies decoded updates to the book; the
/// sequencer never touches them.
#[derive(Debug, Clone)]
pub struct MarketOrderBook {
    sec_sid: u64,
    channel_seq_num: u64,
    transact_nano_of_day: u64,
    is_recovery: bool,
    bid: BidSide,
    ask: AskSide,
}

impl MarketOrderBook {
    /// Creates an empty book with `book_depth` levels per side.
    #[must_use]
    pub fn new(sec_sid: u64, book_depth: usize, spread_table: Arc<SpreadTable>) -> Self {
        Self {
            sec_sid,
            channel_seq_num: 0,
            transact_nano_of_day: 0,
            is_recovery: false,
            bid: BidSide::new(book_depth, Arc::clone(&spread_table)),
            ask: AskSide::new(book_depth, spread_table),
        }
    }

    /// Security identifier.
    #[must_use]
    pub fn sec_sid(&self) -> u64 {
        self.sec_sid
    }

    /// Reassigns the security identifier.
    pub fn set_sec_sid(&mut self, sec_sid: u64) {
        self.sec_sid = sec_sid;
    }

    /// Sequence number of the last message applied.
    #[must_use]
    pub fn channel_seq_num(&self) -> u64 {
        self.channel_seq_num
    }

    /// Records the sequence number of the last message applied.
    pub fn set_channel_seq_num(&mut self, channel_seq_num: u64) {
        self.channel_seq_num = channel_seq_num;
    }

    /// Exchange transaction time of the last update, in nanoseconds of day.
    #[must_use]
    pub fn transact_nano_of_day(&self) -> u64 {
        self.transact_nano_of_day
    }

    /// Records the exchange transaction time of the last update.
    pub fn set_transact_nano_of_day(&mut self, transact_nano_of_day: u64) {
        self.transact_nano_of_day = transact_nano_of_day;
    }

    /// Whether the last update came from a recovery snapshot.
    #[must_use]
    pub fn is_recovery(&self) -> bool {
        self.is_recovery
    }

    /// Marks whether the current content came from a recovery snapshot.
    pub fn set_is_recovery(&mut self, is_recovery: bool) {
        self.is_recovery = is_recovery;
    }

    /// Bid side.
    #[must_use]
    pub fn bid_side(&self) -> &BidSide {
        &self.bid
    }

    /// Mutable bid side.
    pub fn bid_side_mut(&mut self) -> &mut BidSide {
        &mut self.bid
    }

    /// Ask side.
    #[must_use]
    pub fn ask_side(&self) -> &AskSide {
        &self.ask
    }

    /// Mutable ask side.
    pub fn ask_side_mut(&mut self) -> &mut AskSide {
        &mut self.ask
    }

    /// Best bid level, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<&Tick> {
        self.bid.best()
    }

    /// Best ask level, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<&Tick> {
        self.ask.best()
    }

    /// Whether both sides are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bid.is_empty() && self.ask.is_empty()
    }

    /// Empties both sides. Metadata is kept.
    pub fn clear(&mut self) {
        self.bid.clear();
        self.ask.clear();
    }

    /// Value-copies `other` into this book, metadata included.
    pub fn copy_from(&mut self, other: &Self) {
        self.sec_sid = other.sec_sid;
        self.channel_seq_num = other.channel_seq_num;
        self.transact_nano_of_day = other.transact_nano_of_day;
        self.is_recovery = other.is_recovery;
        self.bid.copy_from(&other.bid);
        self.ask.copy_from(&other.ask);
        trace!(
            sec_sid = self.sec_sid,
            seq = self.channel_seq_num,
            "book copied"
        );
    }

    /// Owned, serializable view of the book.
    #[must_use]
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            sec_sid: self.sec_sid,
            channel_seq_num: self.channel_seq_num,
            transact_nano_of_day: self.transact_nano_of_day,
            is_recovery: self.is_recovery,
            bids: self.bid.iter_by_tick_level().copied().collect(),
            asks: self.ask.iter_by_tick_level().copied().collect(),
        }
    }
}

/// Point-in-time copy of a [`MarketOrderBook`], levels ordered best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Security identifier
    pub sec_sid: u64,
    /// Sequence number of the last message applied
    pub channel_seq_num: u64,
    /// Exchange transaction time in nanoseconds of day
    pub transact_nano_of_day: u64,
    /// Whether the content came from a recovery snapshot
    pub is_recovery: bool,
    /// Bid levels, best first
    pub bids: Vec<Tick>,
    /// Ask levels, best first
    pub asks: Vec<Tick>,
}

impl BookSnapshot {
    /// Best bid price and quantity.
    #[must_use]
    pub fn best_bid(&self) -> Option<(Price, u64)> {
        self.bids.first().map(|tick| (tick.price(), tick.quantity()))
    }

    /// Best ask price and quantity.
    #[must_use]
    pub fn best_ask(&self) -> Option<(Price, u64)> {
        self.asks.first().map(|tick| (tick.price(), tick.quantity()))
    }

    /// Best ask minus best bid.
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Serializes the snapshot to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, FeedError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Serialization`] if the input is not a valid snapshot.
    pub fn from_json(data: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(data)?)
    }
}

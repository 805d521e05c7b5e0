//! # Lock-Free Market Data Sequencing and Tick-Addressed Order Books
//!
//! `marketfeed-rs` ingests a sequenced, multicast-style exchange market-data
//! feed and reconstructs a consistent view of per-security order books even
//! when packets arrive out of order, are duplicated across redundant lines,
//! or go missing.
//!
//! ## Key Features
//!
//! - **Lock-Free Sequencing**: Any number of receiver threads hand byte ranges
//!   to a [`ChannelArbitrator`](sequencer::ChannelArbitrator), which delivers
//!   one gapless, strictly increasing stream to a single downstream
//!   [`MarketDataPublisher`](sequencer::MarketDataPublisher). All coordination
//!   is compare-and-swap; no mutex sits on the hot path.
//!
//! - **Zero-Copy In-Order Path**: A range that continues the stream is handed
//!   to the publisher as received. Only ranges that arrive ahead of a gap are
//!   copied, into a sequence-indexed [`Spool`](sequencer::Spool) backed by a
//!   multi-producer byte [`RingBuffer`](sequencer::RingBuffer).
//!
//! - **Exchange Spread Tables**: [`SpreadTable`](marketdata::SpreadTable)
//!   converts between prices and tick levels under non-uniform price-band
//!   rules, through dense arrays for the busy low price range and hash maps
//!   above a threshold.
//!
//! - **Allocation-Free Order Books**: [`MarketOrderBook`](marketdata::MarketOrderBook)
//!   pairs a bid and an ask [`OrderBookSide`](marketdata::OrderBookSide), each a
//!   fixed arena of ticks addressed by distance from the best tick level.
//!
//! - **Gap Alerts**: Gaps wider than a configurable threshold are reported to
//!   a [`GapHandler`](sequencer::GapHandler), leaving the recovery protocol
//!   to its owner.
//!
//! ## Architecture
//!
//! ```text
//!  line A ─┐                       ┌──────────────┐
//!          ├─ publish(seq, n, ..) ─┤  Arbitrator  ├─ in order ─▶ Publisher ─▶ MarketOrderBook
//!  line B ─┘                       │   ▲      │   │                             (SpreadTable)
//!                                  │ drain  store │
//!                                  │   │      ▼   │
//!                                  │    Spool     │
//!                                  │ (RingBuffer) │
//!                                  └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use marketfeed_rs::prelude::*;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! #[derive(Default)]
//! struct LastSeq(AtomicU64);
//!
//! impl MarketDataPublisher for LastSeq {
//!     fn publish(&self, _bytes: &[u8]) -> bool {
//!         true
//!     }
//!
//!     fn publish_sequenced(&self, seq: u64, msg_count: u32, _gap: i64, _bytes: &[u8]) -> bool {
//!         self.0.store(seq + u64::from(msg_count) - 1, Ordering::Relaxed);
//!         true
//!     }
//! }
//!
//! # fn main() -> Result<(), FeedError> {
//! let config = ArbitratorConfig::default().with_start_seq(101).with_spool_capacity(64);
//! let arbitrator = ChannelArbitrator::new(&config, Arc::new(LastSeq::default()))?;
//!
//! let mut b1 = Vec::new();
//! let mut b2 = Vec::new();
//! LengthPrefixedWalker::encode(b"first", &mut b1);
//! LengthPrefixedWalker::encode(b"second", &mut b2);
//!
//! assert!(arbitrator.publish(102, 1, &b2)?); // ahead of a gap: spooled
//! assert!(!arbitrator.publish(101, 1, &b1)?); // fills the gap, both delivered
//! assert_eq!(arbitrator.next_expected_seq(), 103);
//! assert_eq!(arbitrator.publisher().0.load(Ordering::Relaxed), 102);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Model
//!
//! Sequence gaps and stale or duplicate ranges are normal operation and never
//! errors. [`FeedError`] carries what is fatal for a channel (undersized
//! spool or ring buffer, a stalled producer) and configuration or
//! price-lookup mismatches that should be logged loudly by the caller.
//!
//! ## Logging and Metrics
//!
//! The crate logs through `tracing` and installs no subscriber. With the
//! `metrics` feature, per-channel arbitration counters are mirrored to the
//! `metrics` facade.

pub mod config;
pub mod error;
pub mod marketdata;
pub mod prelude;
pub mod sequencer;

pub use config::{ArbitratorConfig, FeedConfig, SpoolConfig, SpreadTableConfig};
pub use error::FeedError;
pub use marketdata::{
    AskSide, BidSide, BookManager, BookSnapshot, MarketOrderBook, OrderBookSide, Price,
    SpreadTable, SpreadTableDetails, SpreadTableError, Tick, TickLevel,
};
pub use sequencer::{
    ChannelArbitrator, ChannelManager, GapHandler, LengthPrefixedWalker, MarketDataPublisher,
    NullGapHandler, RawMessageWalker, RingBuffer, RingBufferError, Spool, SpoolError,
};

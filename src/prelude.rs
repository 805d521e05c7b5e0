//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use marketfeed_rs::prelude::*;
//! ```

// Configuration and errors
pub use crate::config::{ArbitratorConfig, FeedConfig, SpoolConfig, SpreadTableConfig};
pub use crate::error::FeedError;

// Tick addressing and books
pub use crate::marketdata::{
    AskSide, BidSide, BookManager, BookSnapshot, MarketOrderBook, OrderBookSide, Price,
    SPREAD_TABLE_MIN_LEVEL, SpreadTable, SpreadTableDetails, SpreadTableError, Tick, TickLevel,
};

// Sequencing
pub use crate::sequencer::{
    ArbitratorStatsSnapshot, ChannelArbitrator, ChannelManager, GapHandler, LengthPrefixedWalker,
    MarketDataPublisher, NullGapHandler, RawMessageWalker, RingBuffer, RingBufferError, Spool,
    SpoolError,
};

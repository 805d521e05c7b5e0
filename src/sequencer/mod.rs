//! Sequencing and gap recovery for multi-line market-data feeds.
//!
//! # Types
//!
//! - [`ChannelArbitrator`] - turns concurrently received, possibly
//!   reordered or duplicated ranges into one gapless ordered stream
//! - [`Spool`] - sequence-indexed store for messages received ahead of a gap
//! - [`RingBuffer`] - multi-producer byte ring backing the spool
//! - [`RawMessageWalker`] / [`LengthPrefixedWalker`] - batch demultiplexing
//! - [`MarketDataPublisher`] / [`GapHandler`] - downstream contracts
//! - [`ChannelManager`] - per-channel registry and router
//! - [`ArbitratorStats`] - per-channel counters

mod arbitrator;
mod error;
mod manager;
mod publisher;
mod ring_buffer;
mod spool;
mod stats;
mod walker;

pub use arbitrator::ChannelArbitrator;
pub use error::{RingBufferError, SpoolError};
pub use manager::ChannelManager;
pub use publisher::{GapHandler, MarketDataPublisher, NullGapHandler};
pub use ring_buffer::{DEFAULT_COMMIT_TIMEOUT, RingBuffer};
pub use spool::{Drained, Spool};
pub use stats::{ArbitratorStats, ArbitratorStatsSnapshot};
pub use walker::{LENGTH_PREFIX_SIZE, LengthPrefixedWalker, RawMessageWalker};

//! Market data error types

use super::tick::{Price, TickLevel};
use thiserror::Error;

/// Errors raised while building or querying a [`SpreadTable`](super::SpreadTable).
///
/// Construction variants are configuration errors and are never retried.
/// `PriceNotFound` and `TickNotFound` are raised per lookup and point at a
/// mismatch between the feed and the configured price bands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SpreadTableError {
    /// The table was given no price bands at all.
    #[error("there must be at least one spread table details entry")]
    EmptyDetails,

    /// A single price band is malformed.
    #[error("invalid spread table details: from {from_price} to {to_price_exclusive} with spread {spread}")]
    InvalidDetails {
        /// Inclusive start of the band
        from_price: Price,
        /// Exclusive end of the band
        to_price_exclusive: Price,
        /// Tick spacing of the band
        spread: Price,
    },

    /// Two consecutive bands do not meet.
    #[error("gap detected in spread table details entries; from ({expected}) to ({found})")]
    Gap {
        /// Where the next band was expected to start
        expected: Price,
        /// Where the next band actually starts
        found: Price,
    },

    /// A band's spread is not a multiple of the first band's spread.
    #[error("entry spread({spread}) is not divisible by smallest spread({smallest})")]
    IndivisibleSpread {
        /// The offending spread
        spread: Price,
        /// The spread of the first band
        smallest: Price,
    },

    /// A band in the dense region does not start on a multiple of the first
    /// band's spread.
    #[error("entry from price({from_price}) is not aligned to smallest spread({smallest})")]
    MisalignedBand {
        /// Start of the offending band
        from_price: Price,
        /// The spread of the first band
        smallest: Price,
    },

    /// Price outside every declared band, or off-tick in the sparse region.
    #[error("price({price}) not found in this spread table")]
    PriceNotFound {
        /// The price that was looked up
        price: Price,
    },

    /// Tick level outside `[1, max_level]`.
    #[error("tickLevel({tick_level}) not found in this spread table")]
    TickNotFound {
        /// The tick level that was looked up
        tick_level: TickLevel,
    },
}

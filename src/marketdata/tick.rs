//! Tick records held by an order book side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point price in the smallest unit of the spread table
/// (e.g. `12_340` for 12.340 with three decimal places).
pub type Price = i64;

/// Index of a discrete price step in a spread table.
pub type TickLevel = i32;

/// The first valid tick level of every spread table.
pub const SPREAD_TABLE_MIN_LEVEL: TickLevel = 1;

/// Tick level marking an empty slot. Never a valid level since levels start at 1.
pub const NULL_TICK_LEVEL: TickLevel = 0;

/// Price carried by an empty slot.
pub const NULL_PRICE: Price = 0;

/// One price level of an order book side.
///
/// Ticks live in a fixed arena owned by the side and are overwritten in place;
/// an empty slot holds the side's null tick rather than being absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub(crate) price: Price,
    pub(crate) quantity: u64,
    pub(crate) tick_level: TickLevel,
    pub(crate) price_level: u32,
    pub(crate) num_orders: u32,
}

impl Tick {
    /// Creates the sentinel tick for an empty slot.
    #[must_use]
    pub const fn null(null_tick_level: TickLevel, null_price: Price) -> Self {
        Self {
            price: null_price,
            quantity: 0,
            tick_level: null_tick_level,
            price_level: 0,
            num_orders: 0,
        }
    }

    /// Price of this level.
    #[must_use]
    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Aggregate quantity resting at this level.
    #[must_use]
    #[inline]
    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Spread table tick level of [`price`](Self::price).
    #[must_use]
    #[inline]
    pub fn tick_level(&self) -> TickLevel {
        self.tick_level
    }

    /// Zero-based arrival position of this level within the refresh cycle.
    #[must_use]
    #[inline]
    pub fn price_level(&self) -> u32 {
        self.price_level
    }

    /// Number of orders at this level.
    #[must_use]
    #[inline]
    pub fn num_orders(&self) -> u32 {
        self.num_orders
    }

    #[inline]
    pub(crate) fn set(
        &mut self,
        tick_level: TickLevel,
        price: Price,
        quantity: u64,
        price_level: u32,
        num_orders: u32,
    ) {
        self.tick_level = tick_level;
        self.price = price;
        self.quantity = quantity;
        self.price_level = price_level;
        self.num_orders = num_orders;
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}(t{}, n{})",
            self.quantity, self.price, self.tick_level, self.num_orders
        )
    }
}

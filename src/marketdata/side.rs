//! Fixed-depth, tick-addressed order book side.
//!
//! A side owns an arena of `book_depth` [`Tick`] records. The record for a
//! tick level lives at a fixed index computed as its distance from the current
//! best tick level, so applying one level of a snapshot refresh is a single
//! array write with no allocation. Bid and ask sides share the implementation
//! and differ only in the sign of that distance.

use super::error::SpreadTableError;
use super::spread_table::SpreadTable;
use super::tick::{NULL_PRICE, NULL_TICK_LEVEL, Price, SPREAD_TABLE_MIN_LEVEL, Tick, TickLevel};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// Direction of an order book side, resolved at compile time.
pub trait SideDirection: Send + Sync + 'static {
    /// `+1` when worse levels have higher tick levels, `-1` when lower.
    const SIGN: TickLevel;
    /// Short name used in logs.
    const NAME: &'static str;
}

/// Buy side: best is the highest price, worse levels descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bid;

/// Sell side: best is the lowest price, worse levels ascend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ask;

impl SideDirection for Bid {
    const SIGN: TickLevel = -1;
    const NAME: &'static str = "bid";
}

impl SideDirection for Ask {
    const SIGN: TickLevel = 1;
    const NAME: &'static str = "ask";
}

/// Order book side holding bids.
pub type BidSide = OrderBookSide<Bid>;

/// Order book side holding asks.
pub type AskSide = OrderBookSide<Ask>;

/// One side of a fixed-depth market order book.
///
/// Levels of a refresh cycle are expected best first, moving outward. Levels
/// farther than `book_depth` ticks from the best, or on the wrong side of it,
/// are ignored. A side is mutated by a single thread; use
/// [`copy_from`](Self::copy_from) to hand a stable copy to readers.
#[derive(Debug, Clone)]
pub struct OrderBookSide<D: SideDirection> {
    spread_table: Arc<SpreadTable>,
    null_tick: Tick,
    ticks: Box<[Tick]>,
    by_price_level: Box<[usize]>,
    num_price_levels: usize,
    best_tick_level: TickLevel,
    _direction: PhantomData<D>,
}

impl<D: SideDirection> OrderBookSide<D> {
    /// Creates an empty side with room for `book_depth` tick levels.
    #[must_use]
    pub fn new(book_depth: usize, spread_table: Arc<SpreadTable>) -> Self {
        Self::with_null(book_depth, spread_table, NULL_TICK_LEVEL, NULL_PRICE)
    }

    /// Creates an empty side with a custom sentinel for empty slots.
    #[must_use]
    pub fn with_null(
        book_depth: usize,
        spread_table: Arc<SpreadTable>,
        null_tick_level: TickLevel,
        null_price: Price,
    ) -> Self {
        let null_tick = Tick::null(null_tick_level, null_price);
        Self {
            spread_table,
            null_tick,
            ticks: vec![null_tick; book_depth].into_boxed_slice(),
            by_price_level: vec![0; book_depth].into_boxed_slice(),
            num_price_levels: 0,
            best_tick_level: null_tick_level,
            _direction: PhantomData,
        }
    }

    /// Adds the next price level of the current refresh cycle.
    ///
    /// Returns `Ok(true)` when the level was stored, `Ok(false)` when it was
    /// skipped (null price, beyond depth, or better than the current best).
    ///
    /// # Errors
    ///
    /// Propagates [`SpreadTableError::PriceNotFound`] when the price is not
    /// covered by the side's spread table.
    pub fn create(&mut self, price: Price, quantity: u64) -> Result<bool, SpreadTableError> {
        if price == self.null_tick.price {
            return Ok(false);
        }
        let tick_level = self.spread_table.price_to_tick(price)?;
        Ok(self.create_at_tick(tick_level, price, quantity, 1))
    }

    /// Adds a price level whose tick level is already known.
    ///
    /// A second call for an occupied tick level overwrites that level in
    /// place and keeps its original price level.
    pub fn create_at_tick(
        &mut self,
        tick_level: TickLevel,
        price: Price,
        quantity: u64,
        num_orders: u32,
    ) -> bool {
        if tick_level < SPREAD_TABLE_MIN_LEVEL || self.ticks.is_empty() {
            return false;
        }
        if self.num_price_levels == 0 {
            self.best_tick_level = tick_level;
        }

        let offset = (tick_level - self.best_tick_level) * D::SIGN;
        if offset < 0 || offset as usize >= self.ticks.len() {
            trace!(
                side = D::NAME,
                tick_level,
                best_tick_level = self.best_tick_level,
                depth = self.ticks.len(),
                "level outside book depth ignored"
            );
            return false;
        }

        let index = offset as usize;
        let slot = &mut self.ticks[index];
        if slot.tick_level == tick_level {
            slot.price = price;
            slot.quantity = quantity;
            slot.num_orders = num_orders;
            return true;
        }

        slot.set(
            tick_level,
            price,
            quantity,
            self.num_price_levels as u32,
            num_orders,
        );
        self.by_price_level[self.num_price_levels] = index;
        self.num_price_levels += 1;
        true
    }

    /// Empties the side.
    pub fn clear(&mut self) {
        for &index in &self.by_price_level[..self.num_price_levels] {
            self.ticks[index] = self.null_tick;
        }
        self.num_price_levels = 0;
        self.best_tick_level = self.null_tick.tick_level;
    }

    /// Replaces this side's content with a copy of `other`.
    ///
    /// At most `min(self.depth(), other.depth())` levels are copied; price
    /// levels are renumbered in tick order.
    pub fn copy_from(&mut self, other: &Self) {
        let copied = self.ticks.len().min(other.ticks.len());
        self.num_price_levels = 0;
        self.best_tick_level = self.null_tick.tick_level;

        for index in 0..self.ticks.len() {
            let source = if index < copied {
                &other.ticks[index]
            } else {
                &other.null_tick
            };
            if source.tick_level == other.null_tick.tick_level {
                self.ticks[index] = self.null_tick;
                continue;
            }
            if self.num_price_levels == 0 {
                self.best_tick_level = source.tick_level;
            }
            self.ticks[index].set(
                source.tick_level,
                source.price,
                source.quantity,
                self.num_price_levels as u32,
                source.num_orders,
            );
            self.by_price_level[self.num_price_levels] = index;
            self.num_price_levels += 1;
        }
    }

    /// The best level, or the null tick when the side is empty.
    #[must_use]
    #[inline]
    pub fn best_or_null_if_empty(&self) -> &Tick {
        if self.num_price_levels == 0 {
            &self.null_tick
        } else {
            &self.ticks[0]
        }
    }

    /// The best level, if any.
    #[must_use]
    #[inline]
    pub fn best(&self) -> Option<&Tick> {
        (self.num_price_levels > 0).then(|| &self.ticks[0])
    }

    /// Tick level of the best price, or the null tick level when empty.
    #[must_use]
    #[inline]
    pub fn best_tick_level(&self) -> TickLevel {
        self.best_tick_level
    }

    /// The stored level at `tick_level`, if any.
    #[must_use]
    pub fn tick_at(&self, tick_level: TickLevel) -> Option<&Tick> {
        if self.num_price_levels == 0 {
            return None;
        }
        let offset = (tick_level - self.best_tick_level) * D::SIGN;
        if offset < 0 {
            return None;
        }
        self.ticks
            .get(offset as usize)
            .filter(|tick| tick.tick_level == tick_level)
    }

    /// Number of stored price levels.
    #[must_use]
    #[inline]
    pub fn num_price_levels(&self) -> usize {
        self.num_price_levels
    }

    /// Whether the side holds no levels.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_price_levels == 0
    }

    /// Configured book depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ticks.len()
    }

    /// The sentinel stored in empty slots.
    #[must_use]
    pub fn null_tick(&self) -> &Tick {
        &self.null_tick
    }

    /// Spread table used to address levels.
    #[must_use]
    pub fn spread_table(&self) -> &Arc<SpreadTable> {
        &self.spread_table
    }

    /// Occupied levels from best outward.
    pub fn iter_by_tick_level(&self) -> impl Iterator<Item = &Tick> + '_ {
        let null_tick_level = self.null_tick.tick_level;
        self.ticks
            .iter()
            .filter(move |tick| tick.tick_level != null_tick_level)
    }

    /// Occupied levels in the order they were created.
    pub fn iter_by_price_level(&self) -> impl Iterator<Item = &Tick> + '_ {
        self.by_price_level[..self.num_price_levels]
            .iter()
            .map(|&index| &self.ticks[index])
    }
}

impl<D: SideDirection> fmt::Display for OrderBookSide<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tick) in self.iter_by_price_level().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{tick}")?;
        }
        Ok(())
    }
}

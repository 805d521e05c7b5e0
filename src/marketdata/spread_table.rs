//! Tick level <-> price conversion built from exchange price-band rules.
//!
//! A [`SpreadTable`] splits its price range at a configured threshold. Prices
//! below the threshold are resolved through dense arrays indexed by price
//! (O(1), no hashing); prices at or above it go through sparse hash maps that
//! hold only the valid tick prices of the upper bands. Tick levels are
//! numbered contiguously from [`SPREAD_TABLE_MIN_LEVEL`] across both regions.

use super::error::SpreadTableError;
use super::tick::{Price, SPREAD_TABLE_MIN_LEVEL, TickLevel};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of decimal places used by the HKEX securities table.
pub const HKEX_DECIMAL_PLACE: u32 = 3;

/// First price (20.000) resolved through the hash-backed converter in the
/// HKEX securities table.
pub const HKEX_HASH_THRESHOLD: Price = 20_000;

/// One price band: prices in `[from_price, to_price_exclusive)` move in steps
/// of `spread`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadTableDetails {
    /// Inclusive start of the band
    pub from_price: Price,
    /// Exclusive end of the band
    pub to_price_exclusive: Price,
    /// Tick spacing inside the band
    pub spread: Price,
}

impl SpreadTableDetails {
    /// Creates a validated price band.
    ///
    /// # Errors
    ///
    /// Returns [`SpreadTableError::InvalidDetails`] when the spread is not
    /// positive, the start is negative, or the band is empty.
    pub fn new(
        from_price: Price,
        to_price_exclusive: Price,
        spread: Price,
    ) -> Result<Self, SpreadTableError> {
        let details = Self {
            from_price,
            to_price_exclusive,
            spread,
        };
        details.validate()?;
        Ok(details)
    }

    /// Checks the band on its own, without looking at its neighbours.
    ///
    /// # Errors
    ///
    /// See [`SpreadTableDetails::new`].
    pub fn validate(&self) -> Result<(), SpreadTableError> {
        if self.spread <= 0 || self.from_price < 0 || self.from_price >= self.to_price_exclusive {
            return Err(SpreadTableError::InvalidDetails {
                from_price: self.from_price,
                to_price_exclusive: self.to_price_exclusive,
                spread: self.spread,
            });
        }
        Ok(())
    }

    /// Number of tick prices inside the band.
    #[must_use]
    pub fn num_ticks(&self) -> usize {
        ((self.to_price_exclusive - self.from_price + self.spread - 1) / self.spread) as usize
    }

    /// Whether `price` falls inside this band.
    #[must_use]
    #[inline]
    pub fn contains(&self, price: Price) -> bool {
        price >= self.from_price && price < self.to_price_exclusive
    }
}

/// Dense converter for `[first price, threshold)`.
///
/// Arrays are indexed by `(price - price_offset) / step`, where `step` is the
/// spread of the first band. Prices between two tick prices resolve to the
/// tick level at or below them.
#[derive(Debug)]
struct ArrayConverter {
    price_offset: Price,
    step: Price,
    price_to_tick_level: Box<[TickLevel]>,
    price_to_tick_size: Box<[Price]>,
    tick_level_to_price: Box<[Price]>,
    max_tick_level: TickLevel,
}

impl ArrayConverter {
    fn build(
        to_price_exclusive: Price,
        details: &[SpreadTableDetails],
    ) -> Result<Self, SpreadTableError> {
        let first = details[0];
        let step = first.spread;
        let price_offset = first.from_price;
        let end = to_price_exclusive.max(price_offset);
        let num_slots = ((end - price_offset + step - 1) / step) as usize;

        let mut price_to_tick_level = vec![0; num_slots];
        let mut price_to_tick_size = vec![0; num_slots];
        let mut tick_level: TickLevel = 0;

        'bands: for entry in details {
            if entry.from_price >= end {
                break;
            }
            if entry.spread % step != 0 {
                return Err(SpreadTableError::IndivisibleSpread {
                    spread: entry.spread,
                    smallest: step,
                });
            }
            if (entry.from_price - price_offset) % step != 0 {
                return Err(SpreadTableError::MisalignedBand {
                    from_price: entry.from_price,
                    smallest: step,
                });
            }

            let mut price = entry.from_price;
            while price < entry.to_price_exclusive {
                if price >= end {
                    break 'bands;
                }
                tick_level += 1;
                let stop = (price + entry.spread).min(end);
                let mut slot_price = price;
                while slot_price < stop {
                    let index = ((slot_price - price_offset) / step) as usize;
                    price_to_tick_level[index] = tick_level;
                    price_to_tick_size[index] = entry.spread;
                    slot_price += step;
                }
                price += entry.spread;
            }
        }

        let max_tick_level = tick_level;
        let mut tick_level_to_price = vec![0; max_tick_level as usize + 1];
        let mut current = 0;
        for (index, &level) in price_to_tick_level.iter().enumerate() {
            if level != 0 && level != current {
                current = level;
                tick_level_to_price[level as usize] = price_offset + index as Price * step;
            }
        }

        Ok(Self {
            price_offset,
            step,
            price_to_tick_level: price_to_tick_level.into_boxed_slice(),
            price_to_tick_size: price_to_tick_size.into_boxed_slice(),
            tick_level_to_price: tick_level_to_price.into_boxed_slice(),
            max_tick_level,
        })
    }

    #[inline]
    fn slot(&self, price: Price) -> Option<usize> {
        let relative = price - self.price_offset;
        if relative < 0 {
            return None;
        }
        let index = (relative / self.step) as usize;
        (index < self.price_to_tick_level.len() && self.price_to_tick_level[index] != 0)
            .then_some(index)
    }

    #[inline]
    fn price_to_tick(&self, price: Price) -> Result<TickLevel, SpreadTableError> {
        self.slot(price)
            .map(|index| self.price_to_tick_level[index])
            .ok_or(SpreadTableError::PriceNotFound { price })
    }

    #[inline]
    fn price_to_tick_size(&self, price: Price) -> Result<Price, SpreadTableError> {
        self.slot(price)
            .map(|index| self.price_to_tick_size[index])
            .ok_or(SpreadTableError::PriceNotFound { price })
    }

    #[inline]
    fn tick_level_to_price(&self, tick_level: TickLevel) -> Result<Price, SpreadTableError> {
        if tick_level < SPREAD_TABLE_MIN_LEVEL || tick_level > self.max_tick_level {
            return Err(SpreadTableError::TickNotFound { tick_level });
        }
        Ok(self.tick_level_to_price[tick_level as usize])
    }
}

/// Sparse converter for `[threshold, last price)`; only exact tick prices are
/// present.
#[derive(Debug)]
struct HashMapConverter {
    price_to_tick_level: FxHashMap<Price, TickLevel>,
    price_to_tick_size: FxHashMap<Price, Price>,
    tick_level_to_price: FxHashMap<TickLevel, Price>,
    max_tick_level: TickLevel,
}

impl HashMapConverter {
    fn build(
        expected_tick_count: usize,
        start_price: Price,
        initial_tick_level: TickLevel,
        details: &[SpreadTableDetails],
    ) -> Self {
        let mut price_to_tick_level =
            FxHashMap::with_capacity_and_hasher(expected_tick_count, Default::default());
        let mut price_to_tick_size =
            FxHashMap::with_capacity_and_hasher(expected_tick_count, Default::default());
        let mut tick_level_to_price =
            FxHashMap::with_capacity_and_hasher(expected_tick_count, Default::default());

        let mut tick_level = initial_tick_level;
        for entry in details {
            if entry.to_price_exclusive <= start_price {
                continue;
            }
            let mut price = entry.from_price;
            while price < entry.to_price_exclusive {
                if price >= start_price {
                    price_to_tick_level.insert(price, tick_level);
                    price_to_tick_size.insert(price, entry.spread);
                    tick_level_to_price.insert(tick_level, price);
                    tick_level += 1;
                }
                price += entry.spread;
            }
        }

        Self {
            price_to_tick_level,
            price_to_tick_size,
            tick_level_to_price,
            max_tick_level: tick_level - 1,
        }
    }

    #[inline]
    fn price_to_tick(&self, price: Price) -> Result<TickLevel, SpreadTableError> {
        self.price_to_tick_level
            .get(&price)
            .copied()
            .ok_or(SpreadTableError::PriceNotFound { price })
    }

    #[inline]
    fn price_to_tick_size(&self, price: Price) -> Result<Price, SpreadTableError> {
        self.price_to_tick_size
            .get(&price)
            .copied()
            .ok_or(SpreadTableError::PriceNotFound { price })
    }

    #[inline]
    fn tick_level_to_price(&self, tick_level: TickLevel) -> Result<Price, SpreadTableError> {
        self.tick_level_to_price
            .get(&tick_level)
            .copied()
            .ok_or(SpreadTableError::TickNotFound { tick_level })
    }
}

/// Immutable tick <-> price conversion table for one exchange/instrument class.
///
/// Built once at startup and shared (usually behind an `Arc`) by every order
/// book side quoting in it.
///
/// # Example
///
/// ```rust
/// use marketfeed_rs::marketdata::{SpreadTable, SpreadTableDetails};
///
/// # fn main() -> Result<(), marketfeed_rs::marketdata::SpreadTableError> {
/// let table = SpreadTable::new(
///     1,
///     "example",
///     3,
///     500,
///     vec![
///         SpreadTableDetails::new(10, 250, 1)?,
///         SpreadTableDetails::new(250, 1_000, 5)?,
///     ],
/// )?;
/// assert_eq!(table.price_to_tick(255)?, 242);
/// assert_eq!(table.tick_to_price(242)?, 255);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SpreadTable {
    id: u8,
    name: String,
    decimal_place: u32,
    scale: i64,
    details: Vec<SpreadTableDetails>,
    hash_threshold: Price,
    hash_start_tick_level: TickLevel,
    array: ArrayConverter,
    hash: HashMapConverter,
}

impl SpreadTable {
    /// Builds a spread table.
    ///
    /// `details` may arrive in any order; they are sorted by `from_price` and
    /// must then form one gapless, non-overlapping range. Prices below
    /// `hash_threshold` are served by the dense converter, the rest by the
    /// sparse one.
    ///
    /// # Errors
    ///
    /// Returns a [`SpreadTableError`] configuration variant when there are no
    /// bands, a band is malformed, consecutive bands leave a gap or overlap,
    /// or a dense-region band is not a multiple of the first band's spread.
    pub fn new(
        id: u8,
        name: impl Into<String>,
        decimal_place: u32,
        hash_threshold: Price,
        details: impl IntoIterator<Item = SpreadTableDetails>,
    ) -> Result<Self, SpreadTableError> {
        let mut details: Vec<SpreadTableDetails> = details.into_iter().collect();
        if details.is_empty() {
            return Err(SpreadTableError::EmptyDetails);
        }
        for entry in &details {
            entry.validate()?;
        }
        details.sort_by_key(|entry| entry.from_price);

        let mut current_price = details[0].from_price;
        let mut expected_tick_count = 0;
        for entry in &details {
            if entry.from_price != current_price {
                return Err(SpreadTableError::Gap {
                    expected: current_price,
                    found: entry.from_price,
                });
            }
            current_price = entry.to_price_exclusive;
            if entry.to_price_exclusive > hash_threshold {
                expected_tick_count += entry.num_ticks();
            }
        }

        let array = ArrayConverter::build(hash_threshold, &details)?;
        let hash_start_tick_level = array.max_tick_level + 1;
        let hash = HashMapConverter::build(
            expected_tick_count,
            hash_threshold,
            hash_start_tick_level,
            &details,
        );

        let table = Self {
            id,
            name: name.into(),
            decimal_place,
            scale: 10_i64.pow(decimal_place),
            details,
            hash_threshold,
            hash_start_tick_level,
            array,
            hash,
        };
        debug!(
            id = table.id,
            name = %table.name,
            max_level = table.max_level(),
            dense_levels = table.array.max_tick_level,
            "spread table built"
        );
        Ok(table)
    }

    /// The HKEX securities spread table (prices with three decimal places,
    /// 0.010 to 9,995.000).
    ///
    /// # Errors
    ///
    /// Never fails for the built-in bands; the `Result` mirrors [`SpreadTable::new`].
    pub fn hkex_securities(id: u8) -> Result<Self, SpreadTableError> {
        const BANDS: [(Price, Price, Price); 11] = [
            (10, 250, 1),
            (250, 500, 5),
            (500, 10_000, 10),
            (10_000, 20_000, 20),
            (20_000, 100_000, 50),
            (100_000, 200_000, 100),
            (200_000, 500_000, 200),
            (500_000, 1_000_000, 500),
            (1_000_000, 2_000_000, 1_000),
            (2_000_000, 5_000_000, 2_000),
            (5_000_000, 10_000_000, 5_000),
        ];
        let details = BANDS
            .iter()
            .map(|&(from, to, spread)| SpreadTableDetails::new(from, to, spread))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(
            id,
            "hkex-securities",
            HKEX_DECIMAL_PLACE,
            HKEX_HASH_THRESHOLD,
            details,
        )
    }

    /// Tick level of `price`.
    ///
    /// # Errors
    ///
    /// [`SpreadTableError::PriceNotFound`] if the price lies outside every
    /// band, or is not an exact tick price in the hash-backed region.
    #[inline]
    pub fn price_to_tick(&self, price: Price) -> Result<TickLevel, SpreadTableError> {
        if price < self.hash_threshold {
            self.array.price_to_tick(price)
        } else {
            self.hash.price_to_tick(price)
        }
    }

    /// Tick spacing in effect at `price`.
    ///
    /// # Errors
    ///
    /// Same as [`SpreadTable::price_to_tick`].
    #[inline]
    pub fn price_to_tick_size(&self, price: Price) -> Result<Price, SpreadTableError> {
        if price < self.hash_threshold {
            self.array.price_to_tick_size(price)
        } else {
            self.hash.price_to_tick_size(price)
        }
    }

    /// Price at `tick_level`.
    ///
    /// # Errors
    ///
    /// [`SpreadTableError::TickNotFound`] if the level is outside
    /// `[SPREAD_TABLE_MIN_LEVEL, max_level()]`.
    #[inline]
    pub fn tick_to_price(&self, tick_level: TickLevel) -> Result<Price, SpreadTableError> {
        if tick_level < self.hash_start_tick_level {
            self.array.tick_level_to_price(tick_level)
        } else {
            self.hash.tick_level_to_price(tick_level)
        }
    }

    /// Tick spacing at `tick_level`.
    ///
    /// # Errors
    ///
    /// Same as [`SpreadTable::tick_to_price`].
    pub fn tick_size_at(&self, tick_level: TickLevel) -> Result<Price, SpreadTableError> {
        let price = self.tick_to_price(tick_level)?;
        self.price_to_tick_size(price)
    }

    /// Highest valid tick level.
    #[must_use]
    pub fn max_level(&self) -> TickLevel {
        self.array.max_tick_level.max(self.hash.max_tick_level)
    }

    /// The band governing `price`, if any.
    #[must_use]
    pub fn details_at_price(&self, price: Price) -> Option<&SpreadTableDetails> {
        let index = self
            .details
            .partition_point(|entry| entry.from_price <= price);
        if index == 0 {
            return None;
        }
        let entry = &self.details[index - 1];
        entry.contains(price).then_some(entry)
    }

    /// All bands, sorted by `from_price`.
    #[must_use]
    pub fn details(&self) -> &[SpreadTableDetails] {
        &self.details
    }

    /// Table identifier.
    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Human readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of implied decimal places in every price.
    #[must_use]
    pub fn decimal_place(&self) -> u32 {
        self.decimal_place
    }

    /// `10^decimal_place`.
    #[must_use]
    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// First price served by the hash-backed converter.
    #[must_use]
    pub fn hash_threshold(&self) -> Price {
        self.hash_threshold
    }
}

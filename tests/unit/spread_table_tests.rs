#[cfg(test)]
mod tests_spread_table {
    use marketfeed_rs::marketdata::{SPREAD_TABLE_MIN_LEVEL, SpreadTable, SpreadTableDetails};
    use marketfeed_rs::{Price, SpreadTableError};
    use proptest::prelude::*;

    /// Contiguous bands starting at 10 whose spreads are multiples of the first.
    fn bands() -> impl Strategy<Value = Vec<SpreadTableDetails>> {
        (1i64..=4, prop::collection::vec((1i64..=5, 1i64..=40), 1..6)).prop_map(
            |(smallest, shape)| {
                let mut from = 10;
                shape
                    .into_iter()
                    .enumerate()
                    .map(|(i, (multiple, ticks))| {
                        let spread = if i == 0 { smallest } else { smallest * multiple };
                        let to = from + spread * ticks;
                        let band = SpreadTableDetails::new(from, to, spread).expect("band");
                        from = to;
                        band
                    })
                    .collect()
            },
        )
    }

    fn tick_prices(details: &[SpreadTableDetails]) -> Vec<Price> {
        details
            .iter()
            .flat_map(|d| (d.from_price..d.to_price_exclusive).step_by(d.spread as usize))
            .collect()
    }

    proptest! {
        #[test]
        fn round_trip_every_tick(details in bands(), threshold_offset in 0i64..2_000) {
            let threshold = threshold_offset.min(details.last().map_or(0, |d| d.to_price_exclusive) + 5);
            let table = SpreadTable::new(1, "generated", 2, threshold, details.clone())
                .expect("table");

            let prices = tick_prices(&details);
            prop_assert_eq!(table.max_level() as usize, prices.len());

            for (i, price) in prices.iter().enumerate() {
                let tick = SPREAD_TABLE_MIN_LEVEL + i as i32;
                prop_assert_eq!(table.tick_to_price(tick), Ok(*price));
                prop_assert_eq!(table.price_to_tick(*price), Ok(tick));
            }
        }

        #[test]
        fn off_tick_prices_resolve_down_or_fail(details in bands(), threshold_offset in 0i64..2_000) {
            let last = details.last().map_or(0, |d| d.to_price_exclusive);
            let threshold = threshold_offset.min(last + 5);
            let table = SpreadTable::new(1, "generated", 2, threshold, details.clone())
                .expect("table");

            for price in 10..last {
                match table.price_to_tick(price) {
                    Ok(tick) => {
                        let tick_price = table.tick_to_price(tick).expect("tick price");
                        prop_assert!(tick_price <= price);
                        prop_assert!(price < tick_price + table.price_to_tick_size(tick_price).expect("size"));
                    }
                    Err(SpreadTableError::PriceNotFound { .. }) => {
                        // only the hash-backed region rejects off-tick prices
                        prop_assert!(price >= threshold);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }
            }
        }
    }

    #[test]
    fn hkex_boundary_between_converters() {
        let table = SpreadTable::hkex_securities(1).expect("hkex");
        let below = table.price_to_tick(19_980).expect("dense region");
        let at = table.price_to_tick(20_000).expect("hash region");
        assert_eq!(at, below + 1);
        assert_eq!(table.tick_to_price(at), Ok(20_000));
        assert_eq!(table.price_to_tick_size(20_000), Ok(50));
        assert!(table.price_to_tick(20_010).is_err());
    }

    #[test]
    fn hkex_dense_region_floors_off_tick_prices() {
        let table = SpreadTable::hkex_securities(1).expect("hkex");
        // 1.003 lies between the 1.000 and 1.010 ticks
        assert_eq!(table.price_to_tick(1_003), table.price_to_tick(1_000));
        assert_eq!(table.details_at_price(1_003).map(|d| d.spread), Some(10));
    }

    #[test]
    fn gap_in_configuration_is_rejected() {
        let details = vec![
            SpreadTableDetails::new(10, 250, 1).expect("band"),
            SpreadTableDetails::new(260, 500, 5).expect("band"),
        ];
        assert!(matches!(
            SpreadTable::new(1, "gap", 3, 250, details),
            Err(SpreadTableError::Gap {
                expected: 250,
                found: 260
            })
        ));

        let contiguous = vec![
            SpreadTableDetails::new(10, 250, 1).expect("band"),
            SpreadTableDetails::new(250, 500, 5).expect("band"),
        ];
        assert!(SpreadTable::new(1, "contiguous", 3, 250, contiguous).is_ok());
    }
}

//! Example of tick level and price conversion with exchange spread tables
//!
//! This example shows how to:
//! 1. Use the built-in HKEX securities table
//! 2. Convert prices to tick levels in the dense and hash-backed regions
//! 3. Build a custom table from JSON configuration
//!
//! Run this example with:
//! cargo run --bin spread_table_walkthrough

use marketfeed_rs::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn describe(table: &SpreadTable, price: Price) {
    let scale = table.scale();
    let price_text = format!("{}.{:0width$}", price / scale, price % scale, width = table.decimal_place() as usize);
    match (table.price_to_tick(price), table.price_to_tick_size(price)) {
        (Ok(tick), Ok(size)) => info!(price = %price_text, tick, tick_size = size, "resolved"),
        (Err(e), _) | (_, Err(e)) => warn!(price = %price_text, error = %e, "not a valid price"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let hkex = SpreadTable::hkex_securities(1)?;
    info!(
        name = hkex.name(),
        max_level = hkex.max_level(),
        hash_threshold = hkex.hash_threshold(),
        "built-in table"
    );

    // 1.003 is off tick in the dense region and floors to 1.000;
    // 20.010 is off tick above the threshold and is rejected
    for price in [10, 1_003, 19_980, 20_000, 20_010, 355_400, 9_995_000] {
        describe(&hkex, price);
    }

    for tick in [1, 241, hkex.max_level()] {
        info!(tick, price = hkex.tick_to_price(tick)?, "tick to price");
    }

    let config = FeedConfig::from_json_str(
        r#"{
            "spread_tables": [
                {
                    "id": 2,
                    "name": "two-band",
                    "decimal_place": 2,
                    "hash_threshold": 500,
                    "details": [
                        { "from_price": 10, "to_price_exclusive": 250, "spread": 1 },
                        { "from_price": 250, "to_price_exclusive": 1000, "spread": 5 }
                    ]
                }
            ]
        }"#,
    )?;
    let custom = config.build_spread_table(2)?;
    for band in custom.details() {
        info!(
            from = band.from_price,
            to = band.to_price_exclusive,
            spread = band.spread,
            ticks = band.num_ticks(),
            "band"
        );
    }
    for price in [10, 252, 255, 500, 509] {
        describe(&custom, price);
    }
    Ok(())
}

//! Tick/price addressing and fixed-depth market order books.

mod book;
mod error;
mod manager;
mod side;
mod spread_table;
mod tick;

pub use book::{BookSnapshot, MarketOrderBook};
pub use error::SpreadTableError;
pub use manager::BookManager;
pub use side::{Ask, AskSide, Bid, BidSide, OrderBookSide, SideDirection};
pub use spread_table::{HKEX_DECIMAL_PLACE, HKEX_HASH_THRESHOLD, SpreadTable, SpreadTableDetails};
pub use tick::{NULL_PRICE, NULL_TICK_LEVEL, Price, SPREAD_TABLE_MIN_LEVEL, Tick, TickLevel};

//! Example of rebuilding order books from sequenced depth refreshes
//!
//! This example shows how to:
//! 1. Decode length-prefixed side refreshes in a `MarketDataPublisher`
//! 2. Apply them to fixed-depth books held by a `BookManager`
//! 3. Recover from an out-of-order arrival and print JSON snapshots
//!
//! Run this example with:
//! cargo run --bin book_refresh

use marketfeed_rs::prelude::*;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const BID: u8 = 0;
const ASK: u8 = 1;

/// Encodes `sec_sid | side | level count | (price, quantity)*`.
fn refresh(sec_sid: u64, side: u8, levels: &[(Price, u64)], out: &mut Vec<u8>) {
    let mut payload = Vec::with_capacity(10 + levels.len() * 16);
    payload.extend_from_slice(&sec_sid.to_le_bytes());
    payload.push(side);
    payload.push(levels.len() as u8);
    for (price, quantity) in levels {
        payload.extend_from_slice(&price.to_le_bytes());
        payload.extend_from_slice(&quantity.to_le_bytes());
    }
    LengthPrefixedWalker::encode(&payload, out);
}

fn read_u64(bytes: &[u8], at: usize) -> Option<u64> {
    bytes
        .get(at..at + 8)
        .and_then(|raw| raw.try_into().ok())
        .map(u64::from_le_bytes)
}

struct BookBuilder {
    books: Mutex<BookManager>,
}

impl BookBuilder {
    fn apply(&self, seq: u64, payload: &[u8]) -> Option<()> {
        let sec_sid = read_u64(payload, 0)?;
        let side = *payload.get(8)?;
        let count = *payload.get(9)? as usize;

        let mut books = self.books.lock().ok()?;
        let book = books.get_book_mut(sec_sid)?;
        book.set_channel_seq_num(seq);
        if side == BID {
            book.bid_side_mut().clear();
        } else {
            book.ask_side_mut().clear();
        }
        for level in 0..count {
            let at = 10 + level * 16;
            let price = read_u64(payload, at)? as Price;
            let quantity = read_u64(payload, at + 8)?;
            let result = if side == BID {
                book.bid_side_mut().create(price, quantity)
            } else {
                book.ask_side_mut().create(price, quantity)
            };
            if let Err(e) = result {
                warn!(sec_sid, seq, error = %e, "level dropped");
            }
        }
        Some(())
    }
}

impl MarketDataPublisher for BookBuilder {
    fn publish(&self, _bytes: &[u8]) -> bool {
        false
    }

    fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, bytes: &[u8]) -> bool {
        let walker = LengthPrefixedWalker;
        let skip = gap_count.unsigned_abs() as usize;
        let mut offset = walker.walk_to(bytes, 0, skip);
        for current in seq + skip as u64..seq + u64::from(msg_count) {
            let length = walker.length(bytes, offset);
            let applied = bytes
                .get(offset..offset + length)
                .and_then(LengthPrefixedWalker::payload)
                .and_then(|payload| self.apply(current, payload));
            if applied.is_none() {
                return false;
            }
            offset += length;
        }
        true
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let table = Arc::new(SpreadTable::hkex_securities(1)?);
    let mut books = BookManager::new(5, table);
    books.add_book(700);
    let config = ArbitratorConfig::default()
        .with_channel_id(10)
        .with_start_seq(1)
        .with_spool_capacity(64)
        .with_max_message_length(128);
    let arbitrator = ChannelArbitrator::new(
        &config,
        BookBuilder {
            books: Mutex::new(books),
        },
    )?;

    let mut bids = Vec::new();
    refresh(700, BID, &[(355_200, 12_000), (355_000, 8_000), (354_800, 4_000)], &mut bids);
    let mut asks = Vec::new();
    refresh(700, ASK, &[(355_400, 9_000), (355_600, 15_000)], &mut asks);
    let mut update = Vec::new();
    refresh(700, BID, &[(355_400, 1_000), (355_200, 12_000)], &mut update);

    // seq 3 and 2 overtake seq 1 on the wire
    for (seq, bytes) in [(3, &update), (2, &asks), (1, &bids)] {
        let behind_gap = arbitrator.publish(seq, 1, bytes)?;
        info!(seq, behind_gap, next_expected = arbitrator.next_expected_seq(), "packet received");
    }

    let books = arbitrator
        .publisher()
        .books
        .lock()
        .map_err(|_| "book lock poisoned")?;
    if let Some(book) = books.get_book(700) {
        info!(bid = %book.bid_side(), ask = %book.ask_side(), "sides");
        let snapshot = book.snapshot();
        info!(spread = ?snapshot.spread(), json = %snapshot.to_json()?, "book 700");
    }
    Ok(())
}

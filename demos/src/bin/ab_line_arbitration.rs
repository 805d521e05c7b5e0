//! Example of arbitrating two redundant multicast lines into one stream
//!
//! This example shows how to:
//! 1. Build a `ChannelManager` from a JSON feed configuration
//! 2. Feed the same sequenced messages from two receiver threads, each line
//!    losing or reordering some packets
//! 3. Observe gapless in-order delivery and the per-channel counters
//!
//! Run this example with:
//! cargo run --bin ab_line_arbitration

use marketfeed_rs::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const LAST_SEQ: u64 = 10_000;

/// Counts delivered messages and checks that they arrive in order.
#[derive(Default)]
struct OrderChecker {
    next: AtomicU64,
    out_of_order: AtomicU64,
}

impl MarketDataPublisher for OrderChecker {
    fn publish(&self, _bytes: &[u8]) -> bool {
        true
    }

    fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, _bytes: &[u8]) -> bool {
        let first_new = seq + gap_count.unsigned_abs();
        let expected = self.next.load(Ordering::Relaxed);
        if expected != 0 && first_new != expected {
            self.out_of_order.fetch_add(1, Ordering::Relaxed);
        }
        self.next
            .store(seq + u64::from(msg_count), Ordering::Relaxed);
        true
    }
}

/// Logs wide gaps; a real feed handler would request a retransmission here.
fn on_gap(channel_id: u32, first_missing_seq: u64, last_received_seq: u64) {
    warn!(
        channel_id,
        first_missing_seq, last_received_seq, "gap alert, retransmission would be requested"
    );
}

/// Length-prefixed batches of `batch_size` messages carrying their sequence.
fn packets(batch_size: u64) -> Vec<(u64, u32, Vec<u8>)> {
    (1..=LAST_SEQ)
        .step_by(batch_size as usize)
        .map(|from| {
            let count = batch_size.min(LAST_SEQ + 1 - from);
            let mut bytes = Vec::new();
            for seq in from..from + count {
                LengthPrefixedWalker::encode(&seq.to_le_bytes(), &mut bytes);
            }
            (from, count as u32, bytes)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = FeedConfig::from_json_str(
        r#"{
            "channels": [
                { "channel_id": 1, "start_seq": 1, "spool_capacity": 16384,
                  "max_message_length": 32, "gap_alert_threshold": 500 }
            ]
        }"#,
    )?;
    let manager = ChannelManager::from_config(&config, |_| {
        (
            Arc::new(OrderChecker::default()),
            on_gap as fn(u32, u64, u64),
        )
    })?;
    info!(channels = ?manager.channel_ids(), "feed configured");

    // line A drops every tenth packet, line B swaps neighbouring packets
    let line_a: Vec<_> = packets(4)
        .into_iter()
        .enumerate()
        .filter(|(i, _)| i % 10 != 9)
        .map(|(_, packet)| packet)
        .collect();
    let mut line_b = packets(4);
    for pair in line_b.chunks_mut(2) {
        pair.reverse();
    }

    thread::scope(|scope| {
        for (name, line) in [("A", &line_a), ("B", &line_b)] {
            let manager = &manager;
            scope.spawn(move || {
                for (from_seq, msg_count, bytes) in line {
                    if let Err(e) = manager.publish(1, *from_seq, *msg_count, bytes) {
                        warn!(line = name, error = %e, "publish failed");
                        return;
                    }
                }
                info!(line = name, packets = line.len(), "line finished");
            });
        }
    });

    let channel = manager.get(1).ok_or("channel 1 missing")?;
    let checker = channel.publisher();
    info!(
        next_expected_seq = channel.next_expected_seq(),
        delivered_up_to = checker.next.load(Ordering::Relaxed).saturating_sub(1),
        out_of_order = checker.out_of_order.load(Ordering::Relaxed),
        "arbitration complete"
    );
    for (channel_id, stats) in manager.stats() {
        info!(channel_id, stats = %serde_json::to_string(&stats)?, "channel counters");
    }
    Ok(())
}

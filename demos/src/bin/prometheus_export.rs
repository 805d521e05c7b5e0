//! Example of exporting arbitration counters through the `metrics` facade
//!
//! Installs a Prometheus recorder, runs a short sequence with a gap through a
//! channel arbitrator and prints the rendered exposition text.
//!
//! Run this example with:
//! cargo run --bin prometheus_export --features metrics

use marketfeed_rs::prelude::*;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Sink;

impl MarketDataPublisher for Sink {
    fn publish(&self, _bytes: &[u8]) -> bool {
        true
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let handle = PrometheusBuilder::new().install_recorder()?;

    let config = ArbitratorConfig::default()
        .with_channel_id(3)
        .with_start_seq(1)
        .with_spool_capacity(64)
        .with_gap_alert_threshold(2);
    let arbitrator = ChannelArbitrator::new(&config, Sink)?;

    let mut frame = Vec::new();
    LengthPrefixedWalker::encode(b"tick", &mut frame);
    for seq in [1, 2, 5, 6, 4, 3, 3, 7] {
        arbitrator.publish(seq, 1, &frame)?;
    }
    info!(next_expected = arbitrator.next_expected_seq(), "sequence done");

    println!("{}", handle.render());
    Ok(())
}

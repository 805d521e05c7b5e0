//! Per-channel arbitration counters.
//!
//! Counters are relaxed atomics bumped on the hot path. With the `metrics`
//! feature they are mirrored to the `metrics` facade, labelled by channel.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "metrics")]
use metrics::counter;

/// Live counters of one [`ChannelArbitrator`](super::ChannelArbitrator).
#[derive(Debug)]
pub struct ArbitratorStats {
    fast_path: AtomicU64,
    spooled: AtomicU64,
    drained: AtomicU64,
    stale_dropped: AtomicU64,
    gap_alerts: AtomicU64,
    publish_rejected: AtomicU64,
    #[cfg(feature = "metrics")]
    channel_label: String,
}

/// Point-in-time copy of [`ArbitratorStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitratorStatsSnapshot {
    /// Ranges delivered straight to the publisher
    pub fast_path: u64,
    /// Ranges stored into the spool
    pub spooled: u64,
    /// Messages delivered from the spool
    pub drained: u64,
    /// Ranges dropped because they were entirely already delivered
    pub stale_dropped: u64,
    /// Gap handler notifications
    pub gap_alerts: u64,
    /// Deliveries the publisher returned `false` for
    pub publish_rejected: u64,
}

#[cfg(feature = "metrics")]
macro_rules! mirror {
    ($self:ident, $name:literal, $value:expr) => {
        counter!($name, "channel" => $self.channel_label.clone()).increment($value)
    };
}

#[cfg(not(feature = "metrics"))]
macro_rules! mirror {
    ($self:ident, $name:literal, $value:expr) => {{
        let _ = &$self;
        let _ = $value;
    }};
}

impl ArbitratorStats {
    pub(crate) fn new(channel_id: u32) -> Self {
        #[cfg(not(feature = "metrics"))]
        let _ = channel_id;
        Self {
            fast_path: AtomicU64::new(0),
            spooled: AtomicU64::new(0),
            drained: AtomicU64::new(0),
            stale_dropped: AtomicU64::new(0),
            gap_alerts: AtomicU64::new(0),
            publish_rejected: AtomicU64::new(0),
            #[cfg(feature = "metrics")]
            channel_label: channel_id.to_string(),
        }
    }

    #[inline]
    pub(crate) fn record_fast_path(&self) {
        self.fast_path.fetch_add(1, Ordering::Relaxed);
        mirror!(self, "marketfeed_fast_path_total", 1);
    }

    #[inline]
    pub(crate) fn record_spooled(&self) {
        self.spooled.fetch_add(1, Ordering::Relaxed);
        mirror!(self, "marketfeed_spooled_total", 1);
    }

    #[inline]
    pub(crate) fn record_drained(&self, messages: u64) {
        self.drained.fetch_add(messages, Ordering::Relaxed);
        mirror!(self, "marketfeed_drained_messages_total", messages);
    }

    #[inline]
    pub(crate) fn record_stale_dropped(&self) {
        self.stale_dropped.fetch_add(1, Ordering::Relaxed);
        mirror!(self, "marketfeed_stale_dropped_total", 1);
    }

    #[inline]
    pub(crate) fn record_gap_alert(&self) {
        self.gap_alerts.fetch_add(1, Ordering::Relaxed);
        mirror!(self, "marketfeed_gap_alerts_total", 1);
    }

    #[inline]
    pub(crate) fn record_publish_rejected(&self, deliveries: u64) {
        self.publish_rejected.fetch_add(deliveries, Ordering::Relaxed);
        mirror!(self, "marketfeed_publish_rejected_total", deliveries);
    }

    /// Copies the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> ArbitratorStatsSnapshot {
        ArbitratorStatsSnapshot {
            fast_path: self.fast_path.load(Ordering::Relaxed),
            spooled: self.spooled.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            stale_dropped: self.stale_dropped.load(Ordering::Relaxed),
            gap_alerts: self.gap_alerts.load(Ordering::Relaxed),
            publish_rejected: self.publish_rejected.load(Ordering::Relaxed),
        }
    }

    /// Zeroes every counter.
    pub fn reset(&self) {
        for counter in [
            &self.fast_path,
            &self.spooled,
            &self.drained,
            &self.stale_dropped,
            &self.gap_alerts,
            &self.publish_rejected,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

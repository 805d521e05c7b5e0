//! Contracts between the arbitrator and its downstream collaborators.

use std::sync::Arc;

/// Consumer of the ordered byte stream produced by a
/// [`ChannelArbitrator`](super::ChannelArbitrator).
///
/// The arbitrator never calls a publisher from two threads at once, and the
/// sequences it hands over are strictly increasing.
pub trait MarketDataPublisher: Send + Sync {
    /// Delivers raw bytes with no sequencing information.
    ///
    /// Returns `false` if the publisher rejected the bytes.
    fn publish(&self, bytes: &[u8]) -> bool;

    /// Delivers `msg_count` messages starting at sequence `seq`.
    ///
    /// `gap_count` is `seq` minus the next sequence the arbitrator expected
    /// at delivery. It is `0` for a perfectly in-order batch and negative
    /// when the first `-gap_count` messages of the batch were already
    /// delivered and should be skipped.
    fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, bytes: &[u8]) -> bool {
        let _ = (seq, msg_count, gap_count);
        self.publish(bytes)
    }
}

impl<P: MarketDataPublisher + ?Sized> MarketDataPublisher for Arc<P> {
    fn publish(&self, bytes: &[u8]) -> bool {
        (**self).publish(bytes)
    }

    fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, bytes: &[u8]) -> bool {
        (**self).publish_sequenced(seq, msg_count, gap_count, bytes)
    }
}

/// Notification hook for gaps wider than the alert threshold.
///
/// Requesting and applying a recovery snapshot is up to the implementor;
/// once applied, the owner moves the arbitrator forward with
/// [`skip_to`](super::ChannelArbitrator::skip_to).
pub trait GapHandler: Send + Sync {
    /// Called with the first sequence still missing and the largest sequence
    /// received so far on `channel_id`.
    fn handle_detected(&self, channel_id: u32, first_missing_seq: u64, last_received_seq: u64);
}

/// Gap handler that ignores every notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullGapHandler;

impl GapHandler for NullGapHandler {
    #[inline]
    fn handle_detected(&self, _channel_id: u32, _first_missing_seq: u64, _last_received_seq: u64) {}
}

impl<F> GapHandler for F
where
    F: Fn(u32, u64, u64) + Send + Sync,
{
    fn handle_detected(&self, channel_id: u32, first_missing_seq: u64, last_received_seq: u64) {
        self(channel_id, first_missing_seq, last_received_seq)
    }
}

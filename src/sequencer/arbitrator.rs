//! Gapless, ordered delivery of a sequenced feed received out of order.
//!
//! Several producer threads (typically one per redundant network line) call
//! [`ChannelArbitrator::publish`] with byte ranges tagged by their first
//! sequence number and message count. Ranges that continue the stream are
//! handed to the publisher as they are, without copying. Ranges that arrive
//! ahead of a gap are spooled and replayed as soon as the gap fills.
//!
//! Coordination is lock-free:
//!
//! - `next_expected_seq` is the authoritative low-water mark. It only moves
//!   forward, through compare-and-swap loops that retry on contention and
//!   abandon a range that became entirely stale.
//! - A delivery guard, acquired only by compare-and-swap and never waited
//!   on, keeps the publisher single-threaded. A producer that finds the guard
//!   taken spools its range instead, or retries the guard with backoff when
//!   the range could not be spooled.
//! - Every call ends with a drain check that runs again after the guard is
//!   released, so a range spooled while another thread was delivering is
//!   never left behind.

use super::error::SpoolError;
use super::publisher::{GapHandler, MarketDataPublisher, NullGapHandler};
use super::spool::{Spool, range_end};
use super::stats::ArbitratorStats;
use super::walker::{LengthPrefixedWalker, RawMessageWalker};
use crate::config::ArbitratorConfig;
use crate::error::FeedError;
use crossbeam::utils::{Backoff, CachePadded};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Releases the delivery guard when dropped, including on unwind out of a
/// publisher.
struct DeliveryGuard<'a>(&'a AtomicBool);

impl<'a> DeliveryGuard<'a> {
    #[inline]
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for DeliveryGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Sequencer for one market-data channel.
pub struct ChannelArbitrator<P, G = NullGapHandler, W = LengthPrefixedWalker>
where
    P: MarketDataPublisher,
    G: GapHandler,
    W: RawMessageWalker,
{
    channel_id: u32,
    next_expected_seq: CachePadded<AtomicU64>,
    largest_received_seq: CachePadded<AtomicU64>,
    delivering: CachePadded<AtomicBool>,
    gap_alert_threshold: u64,
    spool: Spool<W>,
    publisher: P,
    gap_handler: G,
    stats: ArbitratorStats,
}

impl<P: MarketDataPublisher> ChannelArbitrator<P> {
    /// Creates an arbitrator for length-prefixed frames without gap alerts.
    ///
    /// # Errors
    ///
    /// [`SpoolError::InvalidConfig`] if the spool sizing is unusable.
    pub fn new(config: &ArbitratorConfig, publisher: P) -> Result<Self, SpoolError> {
        Self::with_parts(config, publisher, NullGapHandler, LengthPrefixedWalker)
    }
}

impl<P: MarketDataPublisher, G: GapHandler> ChannelArbitrator<P, G> {
    /// Creates an arbitrator for length-prefixed frames that reports wide
    /// gaps to `gap_handler`.
    ///
    /// # Errors
    ///
    /// See [`ChannelArbitrator::new`].
    pub fn with_gap_handler(
        config: &ArbitratorConfig,
        publisher: P,
        gap_handler: G,
    ) -> Result<Self, SpoolError> {
        Self::with_parts(config, publisher, gap_handler, LengthPrefixedWalker)
    }
}

impl<P, G, W> ChannelArbitrator<P, G, W>
where
    P: MarketDataPublisher,
    G: GapHandler,
    W: RawMessageWalker,
{
    /// Creates an arbitrator from all of its collaborators.
    ///
    /// # Errors
    ///
    /// See [`ChannelArbitrator::new`].
    pub fn with_parts(
        config: &ArbitratorConfig,
        publisher: P,
        gap_handler: G,
        walker: W,
    ) -> Result<Self, SpoolError> {
        let spool = Spool::with_walker(&config.spool_config(), walker)?;
        spool.reset(config.start_seq);
        debug!(
            channel_id = config.channel_id,
            start_seq = config.start_seq,
            spool_capacity = config.spool_capacity,
            gap_alert_threshold = config.gap_alert_threshold,
            "channel arbitrator created"
        );
        Ok(Self {
            channel_id: config.channel_id,
            next_expected_seq: CachePadded::new(AtomicU64::new(config.start_seq)),
            largest_received_seq: CachePadded::new(AtomicU64::new(
                config.start_seq.saturating_sub(1),
            )),
            delivering: CachePadded::new(AtomicBool::new(false)),
            gap_alert_threshold: config.gap_alert_threshold,
            spool,
            publisher,
            gap_handler,
            stats: ArbitratorStats::new(config.channel_id),
        })
    }

    /// Accepts the messages `[from_seq, from_seq + msg_count)` carried by
    /// `bytes`.
    ///
    /// Returns `Ok(true)` if the range starts beyond the next expected
    /// sequence and was spooled behind a gap. Stale or duplicate ranges are
    /// dropped silently. Safe to call from any number of threads.
    ///
    /// # Errors
    ///
    /// A [`FeedError`] wrapping [`SpoolError`] when the range cannot be
    /// spooled (gap wider than the spool, oversized or malformed messages,
    /// range past `u64::MAX`, ring buffer failure) or a spooled message could
    /// not be read back. These are fatal for the channel.
    pub fn publish(&self, from_seq: u64, msg_count: u32, bytes: &[u8]) -> Result<bool, FeedError> {
        if msg_count == 0 {
            return Ok(false);
        }
        let next_seq_after = range_end(from_seq, msg_count)?;
        self.largest_received_seq
            .fetch_max(next_seq_after - 1, Ordering::Relaxed);

        let mut gap_detected = false;
        let expected = self.next_expected_seq.load(Ordering::SeqCst);
        if next_seq_after <= expected {
            self.drop_stale(from_seq, msg_count, expected);
        } else if from_seq <= expected {
            self.publish_in_order(from_seq, msg_count, bytes, expected)?;
        } else {
            self.spool.store(expected, from_seq, msg_count, bytes)?;
            self.stats.record_spooled();
            gap_detected = true;
            trace!(
                channel_id = self.channel_id,
                from_seq,
                msg_count,
                expected,
                "range spooled behind gap"
            );
            self.check_gap_alert();
        }

        self.drain()?;
        Ok(gap_detected)
    }

    /// Delivers a range that continues the stream, or spools it while
    /// another thread holds the delivery guard.
    ///
    /// A range the spool would reject (wider than the slots, oversized or
    /// malformed messages) is never spooled on account of contention: the
    /// guard is retried with backoff until it is free or the range went
    /// stale, bounded by the ring buffer's commit timeout.
    fn publish_in_order(
        &self,
        from_seq: u64,
        msg_count: u32,
        bytes: &[u8],
        expected: u64,
    ) -> Result<(), FeedError> {
        if let Some(_guard) = DeliveryGuard::try_acquire(&self.delivering) {
            self.deliver_in_order(from_seq, msg_count, bytes, expected);
            return Ok(());
        }
        if self.spool.fits(expected, from_seq, msg_count, bytes) {
            self.spool.store(expected, from_seq, msg_count, bytes)?;
            self.stats.record_spooled();
            return Ok(());
        }

        let next_seq_after = range_end(from_seq, msg_count)?;
        let timeout = self.spool.ring_buffer().commit_timeout();
        let backoff = Backoff::new();
        let mut started: Option<Instant> = None;
        loop {
            let expected = self.next_expected_seq.load(Ordering::SeqCst);
            if next_seq_after <= expected {
                self.drop_stale(from_seq, msg_count, expected);
                return Ok(());
            }
            if let Some(_guard) = DeliveryGuard::try_acquire(&self.delivering) {
                self.deliver_in_order(from_seq, msg_count, bytes, expected);
                return Ok(());
            }
            if !backoff.is_completed() {
                backoff.snooze();
                continue;
            }
            let waited = started.get_or_insert_with(Instant::now).elapsed();
            if waited >= timeout {
                warn!(
                    channel_id = self.channel_id,
                    from_seq,
                    msg_count,
                    waited_ms = waited.as_millis() as u64,
                    "delivery guard still held, spooling in-order range"
                );
                self.spool.store(expected, from_seq, msg_count, bytes)?;
                self.stats.record_spooled();
                return Ok(());
            }
            std::thread::yield_now();
        }
    }

    /// Fast path. Runs with the delivery guard held.
    fn deliver_in_order(&self, from_seq: u64, msg_count: u32, bytes: &[u8], expected: u64) {
        let next_seq_after = from_seq + u64::from(msg_count);
        let mut expected = expected;
        loop {
            if next_seq_after <= expected {
                self.drop_stale(from_seq, msg_count, expected);
                return;
            }
            match self.next_expected_seq.compare_exchange(
                expected,
                next_seq_after,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(current) => expected = current,
            }
        }

        let gap_count = from_seq as i64 - expected as i64;
        self.stats.record_fast_path();
        if !self
            .publisher
            .publish_sequenced(from_seq, msg_count, gap_count, bytes)
        {
            self.stats.record_publish_rejected(1);
            warn!(
                channel_id = self.channel_id,
                seq = from_seq,
                msg_count,
                "publisher rejected in-order range"
            );
        }
    }

    fn drop_stale(&self, from_seq: u64, msg_count: u32, expected: u64) {
        self.stats.record_stale_dropped();
        trace!(
            channel_id = self.channel_id,
            from_seq,
            msg_count,
            expected,
            "stale range dropped"
        );
    }

    fn check_gap_alert(&self) {
        let first_missing_seq = self.next_expected_seq.load(Ordering::SeqCst);
        let last_received_seq = self.largest_received_seq.load(Ordering::Relaxed);
        if last_received_seq.saturating_sub(first_missing_seq) > self.gap_alert_threshold {
            self.stats.record_gap_alert();
            warn!(
                channel_id = self.channel_id,
                first_missing_seq,
                last_received_seq,
                threshold = self.gap_alert_threshold,
                "sequence gap above alert threshold"
            );
            self.gap_handler
                .handle_detected(self.channel_id, first_missing_seq, last_received_seq);
        }
    }

    /// Replays spooled messages while the next expected one is available and
    /// the delivery guard can be taken.
    fn drain(&self) -> Result<(), FeedError> {
        loop {
            let expected = self.next_expected_seq.load(Ordering::SeqCst);
            if !self.spool.is_available(expected) {
                return Ok(());
            }
            let Some(_guard) = DeliveryGuard::try_acquire(&self.delivering) else {
                return Ok(());
            };
            self.drain_locked()?;
        }
    }

    fn drain_locked(&self) -> Result<(), FeedError> {
        let expected = self.next_expected_seq.load(Ordering::SeqCst);
        let drained = self.spool.load_and_publish(expected, &self.publisher)?;
        if drained.published == 0 {
            return Ok(());
        }
        self.stats.record_drained(drained.published);
        if drained.rejected > 0 {
            self.stats.record_publish_rejected(drained.rejected);
            warn!(
                channel_id = self.channel_id,
                rejected = drained.rejected,
                "publisher rejected spooled messages"
            );
        }

        let mut current = expected;
        while drained.next_missing_seq > current {
            match self.next_expected_seq.compare_exchange(
                current,
                drained.next_missing_seq,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        trace!(
            channel_id = self.channel_id,
            from_seq = expected,
            next_expected_seq = drained.next_missing_seq,
            "spooled messages delivered"
        );
        Ok(())
    }

    /// Moves the low-water mark forward to `seq`, typically after a recovery
    /// snapshot covering everything below it was applied. Spooled messages
    /// below `seq` are discarded and those from `seq` on are delivered.
    ///
    /// Does nothing if `seq` is not ahead of the next expected sequence.
    ///
    /// # Errors
    ///
    /// Same as the drain step of [`publish`](Self::publish).
    pub fn skip_to(&self, seq: u64) -> Result<(), FeedError> {
        let previous = self.next_expected_seq.fetch_max(seq, Ordering::SeqCst);
        if seq <= previous {
            return Ok(());
        }
        self.spool.advance_min_allowable_seq(seq);
        debug!(channel_id = self.channel_id, from = previous, to = seq, "skipped ahead");
        self.drain()
    }

    /// Restarts the channel at `start_seq`, discarding everything spooled.
    ///
    /// Producers must be stopped while this runs.
    pub fn reset(&self, start_seq: u64) {
        self.next_expected_seq.store(start_seq, Ordering::SeqCst);
        self.largest_received_seq
            .store(start_seq.saturating_sub(1), Ordering::SeqCst);
        self.spool.reset(start_seq);
        debug!(channel_id = self.channel_id, start_seq, "channel arbitrator reset");
    }

    /// Channel this arbitrator sequences.
    #[must_use]
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Next sequence the publisher expects.
    #[must_use]
    pub fn next_expected_seq(&self) -> u64 {
        self.next_expected_seq.load(Ordering::SeqCst)
    }

    /// Largest sequence seen so far (best effort).
    #[must_use]
    pub fn largest_received_seq(&self) -> u64 {
        self.largest_received_seq.load(Ordering::Relaxed)
    }

    /// Gap width that triggers the gap handler.
    #[must_use]
    pub fn gap_alert_threshold(&self) -> u64 {
        self.gap_alert_threshold
    }

    /// Counters of this channel.
    #[must_use]
    pub fn stats(&self) -> &ArbitratorStats {
        &self.stats
    }

    /// The spool holding out-of-order messages.
    #[must_use]
    pub fn spool(&self) -> &Spool<W> {
        &self.spool
    }

    /// The downstream publisher.
    #[must_use]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<P, G, W> std::fmt::Debug for ChannelArbitrator<P, G, W>
where
    P: MarketDataPublisher,
    G: GapHandler,
    W: RawMessageWalker,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelArbitrator")
            .field("channel_id", &self.channel_id)
            .field("next_expected_seq", &self.next_expected_seq())
            .field("largest_received_seq", &self.largest_received_seq())
            .field("gap_alert_threshold", &self.gap_alert_threshold)
            .field("spool", &self.spool)
            .finish()
    }
}

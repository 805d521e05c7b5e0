//! Sequence-indexed storage for messages that arrived ahead of a gap.
//!
//! The spool has a power-of-two number of slots; sequence `seq` lives in
//! slot `seq & (capacity - 1)`. A slot carries its sequence and state packed
//! into one atomic word and moves through `EMPTY -> WRITING -> READY -> EMPTY`:
//! a producer claims it with a CAS to `WRITING`, copies the message bytes into
//! the spool's ring buffer, then publishes it as `READY`. Only the drainer
//! moves a `READY` slot back to `EMPTY`, except for slots whose sequence fell
//! below the minimum allowable sequence, which any producer may evict.

use super::error::SpoolError;
use super::publisher::MarketDataPublisher;
use super::ring_buffer::RingBuffer;
use super::walker::{LengthPrefixedWalker, RawMessageWalker};
use crate::config::SpoolConfig;
use crossbeam::utils::Backoff;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, trace};

const EMPTY: u64 = 0;
const WRITING: u64 = 1;
const READY: u64 = 2;
const STATE_BITS: u32 = 2;
const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

#[inline]
const fn pack(seq: u64, state: u64) -> u64 {
    (seq << STATE_BITS) | state
}

#[inline]
const fn unpack(word: u64) -> (u64, u64) {
    (word >> STATE_BITS, word & STATE_MASK)
}

/// One past the last sequence of `[from_seq, from_seq + msg_count)`.
///
/// # Errors
///
/// [`SpoolError::SequenceOverflow`] if the range does not fit in `u64`.
#[inline]
pub(crate) fn range_end(from_seq: u64, msg_count: u32) -> Result<u64, SpoolError> {
    from_seq
        .checked_add(u64::from(msg_count))
        .ok_or(SpoolError::SequenceOverflow { from_seq, msg_count })
}

#[derive(Debug, Default)]
struct Slot {
    state: AtomicU64,
    position: AtomicU64,
    length: AtomicU32,
}

/// Outcome of [`Spool::load_and_publish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    /// First sequence that was not available.
    pub next_missing_seq: u64,
    /// Messages handed to the publisher.
    pub published: u64,
    /// Messages the publisher returned `false` for.
    pub rejected: u64,
}

/// Out-of-order message spool backed by a multi-producer ring buffer.
pub struct Spool<W: RawMessageWalker = LengthPrefixedWalker> {
    slots: Box<[Slot]>,
    mask: u64,
    max_message_length: usize,
    min_allowable_seq: AtomicU64,
    ring: RingBuffer,
    walker: W,
}

impl Spool<LengthPrefixedWalker> {
    /// Creates a spool for length-prefixed frames.
    ///
    /// # Errors
    ///
    /// See [`Spool::with_walker`].
    pub fn new(config: &SpoolConfig) -> Result<Self, SpoolError> {
        Self::with_walker(config, LengthPrefixedWalker)
    }
}

impl<W: RawMessageWalker> Spool<W> {
    /// Creates a spool that splits batches with `walker`.
    ///
    /// The ring buffer is sized to the next power of two of
    /// `2 * capacity * max_message_length` bytes so live spooled bytes are
    /// never lapped by newer writes.
    ///
    /// # Errors
    ///
    /// [`SpoolError::InvalidConfig`] if the capacity is not a non-zero power
    /// of two, the maximum message length or commit timeout is zero, or the
    /// ring buffer size overflows.
    pub fn with_walker(config: &SpoolConfig, walker: W) -> Result<Self, SpoolError> {
        let capacity = config.capacity;
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(SpoolError::InvalidConfig {
                reason: format!("capacity must be a non-zero power of two, got {capacity}"),
            });
        }
        if config.max_message_length == 0 {
            return Err(SpoolError::InvalidConfig {
                reason: "max_message_length must be greater than zero".to_string(),
            });
        }
        if config.commit_timeout.is_zero() {
            return Err(SpoolError::InvalidConfig {
                reason: "commit_timeout must be greater than zero".to_string(),
            });
        }
        let ring_capacity = capacity
            .checked_mul(config.max_message_length)
            .and_then(|bytes| bytes.checked_mul(2))
            .and_then(usize::checked_next_power_of_two)
            .ok_or_else(|| SpoolError::InvalidConfig {
                reason: format!(
                    "ring buffer for {capacity} slots of {} bytes overflows",
                    config.max_message_length
                ),
            })?;
        let ring = RingBuffer::with_commit_timeout(ring_capacity, config.commit_timeout)?;
        let slots = (0..capacity).map(|_| Slot::default()).collect();

        debug!(
            capacity,
            max_message_length = config.max_message_length,
            ring_capacity,
            "spool created"
        );
        Ok(Self {
            slots,
            mask: capacity as u64 - 1,
            max_message_length: config.max_message_length,
            min_allowable_seq: AtomicU64::new(0),
            ring,
            walker,
        })
    }

    #[inline]
    fn slot(&self, seq: u64) -> &Slot {
        &self.slots[(seq & self.mask) as usize]
    }

    /// Stores the messages `[from_seq, from_seq + msg_count)` of `bytes`,
    /// skipping those below `min_allowable_seq` and those already spooled.
    ///
    /// Returns how many messages were newly stored.
    ///
    /// # Errors
    ///
    /// - [`SpoolError::CapacityExceeded`] if `[min_allowable_seq, end)` is
    ///   wider than the spool; nothing is stored.
    /// - [`SpoolError::MalformedBatch`] or [`SpoolError::MessageTooLarge`] if
    ///   the walker output does not fit the batch or the size limit.
    /// - [`SpoolError::SequenceOverflow`] if the range runs past `u64::MAX`.
    /// - [`SpoolError::RingBuffer`] if the ring buffer write failed.
    pub fn store(
        &self,
        min_allowable_seq: u64,
        from_seq: u64,
        msg_count: u32,
        bytes: &[u8],
    ) -> Result<usize, SpoolError> {
        let end_seq = range_end(from_seq, msg_count)?;
        if end_seq <= min_allowable_seq {
            return Ok(0);
        }
        if end_seq - min_allowable_seq > self.slots.len() as u64 {
            return Err(SpoolError::CapacityExceeded {
                min_allowable_seq,
                end_seq,
                capacity: self.slots.len(),
            });
        }
        self.advance_min_allowable_seq(min_allowable_seq);

        let first_seq = from_seq.max(min_allowable_seq);
        let mut offset = self
            .walker
            .walk_to(bytes, 0, (first_seq - from_seq) as usize);
        let mut stored = 0;
        for seq in first_seq..end_seq {
            let length = self.walker.length(bytes, offset);
            if length == 0 || offset.checked_add(length).is_none_or(|end| end > bytes.len()) {
                return Err(SpoolError::MalformedBatch {
                    seq,
                    offset,
                    batch_length: bytes.len(),
                });
            }
            if length > self.max_message_length {
                return Err(SpoolError::MessageTooLarge {
                    seq,
                    length,
                    max: self.max_message_length,
                });
            }

            if self.claim(seq) {
                let slot = self.slot(seq);
                match self.ring.write(&bytes[offset..offset + length]) {
                    Ok(position) => {
                        slot.position.store(position, Ordering::Release);
                        slot.length.store(length as u32, Ordering::Release);
                        slot.state.store(pack(seq, READY), Ordering::SeqCst);
                        stored += 1;
                    }
                    Err(e) => {
                        slot.state.store(pack(seq, EMPTY), Ordering::SeqCst);
                        return Err(e.into());
                    }
                }
            }
            offset = self.walker.next_offset(bytes, offset);
        }
        Ok(stored)
    }

    /// Whether [`store`](Self::store) would accept the whole range without
    /// error: `[min_allowable_seq, end)` fits the slots and every message
    /// still needed is well formed and within the size limit.
    pub fn fits(&self, min_allowable_seq: u64, from_seq: u64, msg_count: u32, bytes: &[u8]) -> bool {
        let Ok(end_seq) = range_end(from_seq, msg_count) else {
            return false;
        };
        if end_seq <= min_allowable_seq {
            return true;
        }
        if end_seq - min_allowable_seq > self.slots.len() as u64 {
            return false;
        }
        let first_seq = from_seq.max(min_allowable_seq);
        let mut offset = self
            .walker
            .walk_to(bytes, 0, (first_seq - from_seq) as usize);
        for _ in first_seq..end_seq {
            let length = self.walker.length(bytes, offset);
            if length == 0
                || length > self.max_message_length
                || offset.checked_add(length).is_none_or(|end| end > bytes.len())
            {
                return false;
            }
            offset = self.walker.next_offset(bytes, offset);
        }
        true
    }

    /// Moves the slot of `seq` to `WRITING` for this producer.
    ///
    /// Returns `false` when `seq` is already spooled or no longer needed.
    fn claim(&self, seq: u64) -> bool {
        let slot = self.slot(seq);
        let backoff = Backoff::new();
        loop {
            let min = self.min_allowable_seq.load(Ordering::SeqCst);
            if seq < min {
                return false;
            }
            let current = slot.state.load(Ordering::SeqCst);
            let (slot_seq, state) = unpack(current);
            let claimable = state == EMPTY || (state == READY && slot_seq < min);
            if claimable {
                if slot
                    .state
                    .compare_exchange(current, pack(seq, WRITING), Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    if state == READY {
                        trace!(evicted = slot_seq, seq, "stale spool slot reclaimed");
                    }
                    return true;
                }
                continue;
            }
            if slot_seq == seq {
                trace!(seq, "duplicate message already spooled");
                return false;
            }
            if state == WRITING && slot_seq < min {
                // a producer is still copying a message nobody needs anymore
                backoff.snooze();
                continue;
            }
            trace!(seq, slot_seq, "spool slot held by another sequence");
            return false;
        }
    }

    /// Raises the minimum allowable sequence and empties spooled slots below
    /// it. Lowering it has no effect.
    pub fn advance_min_allowable_seq(&self, min_allowable_seq: u64) {
        let previous = self
            .min_allowable_seq
            .fetch_max(min_allowable_seq, Ordering::SeqCst);
        if min_allowable_seq <= previous {
            return;
        }
        let from = previous.max(min_allowable_seq.saturating_sub(self.slots.len() as u64));
        let mut evicted = 0;
        for seq in from..min_allowable_seq {
            let slot = self.slot(seq);
            let current = slot.state.load(Ordering::SeqCst);
            let (slot_seq, state) = unpack(current);
            if state == READY
                && slot_seq < min_allowable_seq
                && slot
                    .state
                    .compare_exchange(current, pack(slot_seq, EMPTY), Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                evicted += 1;
            }
        }
        if evicted > 0 {
            trace!(evicted, min_allowable_seq, "stale spool slots evicted");
        }
    }

    /// Whether message `seq` is spooled and fully written.
    #[inline]
    pub fn is_available(&self, seq: u64) -> bool {
        self.slot(seq).state.load(Ordering::SeqCst) == pack(seq, READY)
    }

    /// Publishes spooled messages in order from `from_seq` until the first
    /// missing one, emptying each slot after it is handed over.
    ///
    /// Each message is delivered through
    /// [`publish_sequenced`](MarketDataPublisher::publish_sequenced) with a
    /// message count of one and a gap count of zero. Must not run on two
    /// threads at once.
    ///
    /// # Errors
    ///
    /// [`SpoolError::RingBuffer`] if the bytes of a spooled message were
    /// overwritten; the slot is left untouched.
    pub fn load_and_publish<P>(&self, from_seq: u64, publisher: &P) -> Result<Drained, SpoolError>
    where
        P: MarketDataPublisher + ?Sized,
    {
        let mut drained = Drained {
            next_missing_seq: from_seq,
            ..Drained::default()
        };
        loop {
            let seq = drained.next_missing_seq;
            let slot = self.slot(seq);
            let ready = pack(seq, READY);
            if slot.state.load(Ordering::SeqCst) != ready {
                break;
            }
            let position = slot.position.load(Ordering::Acquire);
            let length = slot.length.load(Ordering::Acquire) as usize;
            // a producer may have evicted and reclaimed the slot in between
            if slot.state.load(Ordering::SeqCst) != ready {
                break;
            }
            let accepted = self.ring.read_by_seq(position, length, |bytes| {
                publisher.publish_sequenced(seq, 1, 0, bytes)
            })?;
            let _ = slot.state.compare_exchange(
                ready,
                pack(seq, EMPTY),
                Ordering::SeqCst,
                Ordering::SeqCst,
            );

            drained.published += 1;
            if !accepted {
                drained.rejected += 1;
            }
            drained.next_missing_seq += 1;
        }
        if drained.published > 0 {
            trace!(
                from_seq,
                next_missing_seq = drained.next_missing_seq,
                published = drained.published,
                "spool drained"
            );
        }
        Ok(drained)
    }

    /// Empties every slot and sets the minimum allowable sequence.
    ///
    /// Must not race with `store` or `load_and_publish`.
    pub fn reset(&self, start_seq: u64) {
        for slot in self.slots.iter() {
            slot.state.store(pack(0, EMPTY), Ordering::SeqCst);
        }
        self.min_allowable_seq.store(start_seq, Ordering::SeqCst);
        debug!(start_seq, "spool reset");
    }

    /// Number of slots holding a message.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| unpack(slot.state.load(Ordering::Relaxed)).1 == READY)
            .count()
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Largest message accepted by [`store`](Self::store).
    #[must_use]
    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Highest minimum allowable sequence seen so far.
    #[must_use]
    pub fn min_allowable_seq(&self) -> u64 {
        self.min_allowable_seq.load(Ordering::SeqCst)
    }

    /// The walker used to split batches.
    #[must_use]
    pub fn walker(&self) -> &W {
        &self.walker
    }

    /// The backing ring buffer.
    #[must_use]
    pub fn ring_buffer(&self) -> &RingBuffer {
        &self.ring
    }
}

impl<W: RawMessageWalker> std::fmt::Debug for Spool<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spool")
            .field("capacity", &self.slots.len())
            .field("max_message_length", &self.max_message_length)
            .field("min_allowable_seq", &self.min_allowable_seq())
            .field("ring", &self.ring)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct Collector {
        received: Mutex<Vec<(u64, Vec<u8>)>>,
    }

    impl Collector {
        fn seqs(&self) -> Vec<u64> {
            self.received.lock().unwrap().iter().map(|(s, _)| *s).collect()
        }
    }

    impl MarketDataPublisher for Collector {
        fn publish(&self, _bytes: &[u8]) -> bool {
            unreachable!("spool always publishes with a sequence")
        }

        fn publish_sequenced(&self, seq: u64, msg_count: u32, gap_count: i64, bytes: &[u8]) -> bool {
            assert_eq!(msg_count, 1);
            assert_eq!(gap_count, 0);
            self.received.lock().unwrap().push((seq, bytes.to_vec()));
            true
        }
    }

    fn config(capacity: usize) -> SpoolConfig {
        SpoolConfig {
            capacity,
            max_message_length: 64,
            commit_timeout: Duration::from_secs(1),
        }
    }

    fn frames(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for payload in payloads {
            LengthPrefixedWalker::encode(payload, &mut out);
        }
        out
    }

    #[test]
    fn test_invalid_sizing() {
        assert!(matches!(
            Spool::new(&config(6)),
            Err(SpoolError::InvalidConfig { .. })
        ));
        let mut zero_length = config(8);
        zero_length.max_message_length = 0;
        assert!(matches!(
            Spool::new(&zero_length),
            Err(SpoolError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_zero_commit_timeout_rejected() {
        let mut no_timeout = config(8);
        no_timeout.commit_timeout = Duration::ZERO;
        assert!(matches!(
            Spool::new(&no_timeout),
            Err(SpoolError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_ring_sized_for_twice_the_slots() {
        let spool = Spool::new(&config(16)).unwrap();
        assert_eq!(spool.ring_buffer().capacity(), 2_048);
    }

    #[test]
    fn test_store_batch_and_drain() {
        let spool = Spool::new(&config(16)).unwrap();
        let batch = frames(&[b"five", b"six", b"seven"]);
        assert_eq!(spool.store(0, 5, 3, &batch).unwrap(), 3);
        assert!(spool.is_available(5));
        assert!(spool.is_available(7));
        assert!(!spool.is_available(8));
        assert_eq!(spool.pending(), 3);

        let collector = Collector::default();
        let drained = spool.load_and_publish(5, &collector).unwrap();
        assert_eq!(drained.next_missing_seq, 8);
        assert_eq!(drained.published, 3);

        let received = collector.received.lock().unwrap();
        assert_eq!(received[0], (5, frames(&[b"five"])));
        assert_eq!(received[2], (7, frames(&[b"seven"])));
        drop(received);
        assert_eq!(spool.pending(), 0);
        assert!(!spool.is_available(5));
    }

    #[test]
    fn test_drain_stops_at_first_missing() {
        let spool = Spool::new(&config(16)).unwrap();
        spool.store(0, 5, 1, &frames(&[b"a"])).unwrap();
        spool.store(0, 7, 1, &frames(&[b"c"])).unwrap();

        let collector = Collector::default();
        let drained = spool.load_and_publish(5, &collector).unwrap();
        assert_eq!(drained.next_missing_seq, 6);
        assert_eq!(collector.seqs(), vec![5]);
        assert!(spool.is_available(7));
    }

    #[test]
    fn test_nothing_available_drains_nothing() {
        let spool = Spool::new(&config(8)).unwrap();
        let collector = Collector::default();
        assert_eq!(
            spool.load_and_publish(3, &collector).unwrap(),
            Drained {
                next_missing_seq: 3,
                published: 0,
                rejected: 0
            }
        );
    }

    #[test]
    fn test_duplicate_store_skipped() {
        let spool = Spool::new(&config(16)).unwrap();
        let batch = frames(&[b"x", b"y"]);
        assert_eq!(spool.store(0, 3, 2, &batch).unwrap(), 2);
        assert_eq!(spool.store(0, 3, 2, &batch).unwrap(), 0);
        assert_eq!(spool.pending(), 2);
    }

    #[test]
    fn test_leading_stale_messages_skipped() {
        let spool = Spool::new(&config(16)).unwrap();
        let batch = frames(&[b"five", b"six", b"seven"]);
        assert_eq!(spool.store(6, 5, 3, &batch).unwrap(), 2);
        assert!(!spool.is_available(5));

        let collector = Collector::default();
        spool.load_and_publish(6, &collector).unwrap();
        let received = collector.received.lock().unwrap();
        assert_eq!(received[0], (6, frames(&[b"six"])));
    }

    #[test]
    fn test_fully_stale_batch_ignored() {
        let spool = Spool::new(&config(16)).unwrap();
        assert_eq!(spool.store(10, 5, 3, &frames(&[b"a", b"b", b"c"])).unwrap(), 0);
        assert_eq!(spool.pending(), 0);
    }

    #[test]
    fn test_capacity_exceeded() {
        let spool = Spool::new(&config(4)).unwrap();
        let result = spool.store(0, 3, 2, &frames(&[b"a", b"b"]));
        assert_eq!(
            result,
            Err(SpoolError::CapacityExceeded {
                min_allowable_seq: 0,
                end_seq: 5,
                capacity: 4
            })
        );
        assert_eq!(spool.pending(), 0);
    }

    #[test]
    fn test_message_too_large() {
        let spool = Spool::new(&config(4)).unwrap();
        let result = spool.store(0, 1, 1, &frames(&[&[0u8; 100][..]]));
        assert!(matches!(
            result,
            Err(SpoolError::MessageTooLarge { seq: 1, length: 102, max: 64 })
        ));
    }

    #[test]
    fn test_malformed_batch() {
        let spool = Spool::new(&config(8)).unwrap();
        let result = spool.store(0, 1, 3, &frames(&[b"a", b"b"]));
        assert!(matches!(
            result,
            Err(SpoolError::MalformedBatch { seq: 3, offset: 6, batch_length: 6 })
        ));
        // the complete leading messages were kept
        assert!(spool.is_available(1));
        assert!(spool.is_available(2));
    }

    #[test]
    fn test_range_past_sequence_space() {
        let spool = Spool::new(&config(8)).unwrap();
        let batch = frames(&[b"a", b"b"]);
        assert_eq!(
            spool.store(u64::MAX - 1, u64::MAX, 2, &batch),
            Err(SpoolError::SequenceOverflow {
                from_seq: u64::MAX,
                msg_count: 2
            })
        );
        assert!(!spool.fits(u64::MAX - 1, u64::MAX, 2, &batch));
        assert_eq!(spool.pending(), 0);
    }

    #[test]
    fn test_fits_matches_store() {
        let spool = Spool::new(&config(4)).unwrap();
        let two = frames(&[b"a", b"b"]);
        assert!(spool.fits(0, 1, 2, &two));
        assert!(!spool.fits(0, 3, 2, &two));
        assert!(spool.fits(3, 3, 2, &two));
        assert!(!spool.fits(0, 1, 3, &two));
        assert!(!spool.fits(0, 1, 1, &frames(&[&[0u8; 100][..]])));
        // messages below the minimum are not checked
        let mut leading_oversized = frames(&[&[0u8; 100][..]]);
        leading_oversized.extend(frames(&[b"ok"]));
        assert!(spool.fits(2, 1, 2, &leading_oversized));
        assert_eq!(spool.store(2, 1, 2, &leading_oversized).unwrap(), 1);
    }

    #[test]
    fn test_reclaimed_slot_not_drained_as_evicted_sequence() {
        let spool = Spool::new(&config(8)).unwrap();
        spool.store(0, 2, 1, &frames(&[b"old"])).unwrap();
        // sequence 10 maps to the slot that held 2
        spool.store(3, 10, 1, &frames(&[b"new"])).unwrap();

        let collector = Collector::default();
        assert_eq!(spool.load_and_publish(2, &collector).unwrap().published, 0);
        assert!(collector.seqs().is_empty());

        let drained = spool.load_and_publish(10, &collector).unwrap();
        assert_eq!(drained.published, 1);
        assert_eq!(collector.received.lock().unwrap()[0], (10, frames(&[b"new"])));
    }

    #[test]
    fn test_advancing_minimum_evicts_stale_slots() {
        let spool = Spool::new(&config(8)).unwrap();
        spool.store(0, 2, 1, &frames(&[b"old"])).unwrap();
        spool.store(3, 4, 1, &frames(&[b"new"])).unwrap();

        assert!(!spool.is_available(2));
        assert!(spool.is_available(4));
        assert_eq!(spool.pending(), 1);
        assert_eq!(spool.min_allowable_seq(), 3);
    }

    #[test]
    fn test_slot_reused_after_wrap() {
        let spool = Spool::new(&config(4)).unwrap();
        let collector = Collector::default();
        spool.store(0, 1, 1, &frames(&[b"one"])).unwrap();
        spool.load_and_publish(1, &collector).unwrap();
        spool.store(2, 5, 1, &frames(&[b"five"])).unwrap();
        assert!(spool.is_available(5));
        assert!(!spool.is_available(1));
    }

    #[test]
    fn test_reset() {
        let spool = Spool::new(&config(8)).unwrap();
        spool.store(0, 2, 1, &frames(&[b"a"])).unwrap();
        spool.reset(100);
        assert_eq!(spool.pending(), 0);
        assert_eq!(spool.min_allowable_seq(), 100);
        assert_eq!(spool.store(100, 101, 1, &frames(&[b"b"])).unwrap(), 1);
    }

    #[test]
    fn test_concurrent_stores_then_drain() {
        let spool = Arc::new(Spool::new(&config(1_024)).unwrap());
        let mut handles = Vec::new();
        for producer in 0..4u64 {
            let spool = Arc::clone(&spool);
            handles.push(thread::spawn(move || {
                // both lines carry every message, offset by producer parity
                for seq in (producer % 2..1_000).step_by(2) {
                    let payload = seq.to_le_bytes();
                    spool.store(0, seq, 1, &frames(&[&payload])).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let collector = Collector::default();
        let drained = spool.load_and_publish(0, &collector).unwrap();
        assert_eq!(drained.next_missing_seq, 1_000);
        let received = collector.received.lock().unwrap();
        for (seq, bytes) in received.iter() {
            assert_eq!(LengthPrefixedWalker::payload(bytes), Some(&seq.to_le_bytes()[..]));
        }
    }
}

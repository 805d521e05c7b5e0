//! Multi-producer, byte-based ring buffer.
//!
//! Producers claim a byte range on a monotonically increasing `claimed`
//! cursor, copy their bytes in (wrapping at capacity), then make them visible
//! by advancing a separate `committed` cursor from exactly the start of their
//! range to its end. Ranges may be claimed by several producers at once but
//! are committed strictly in claim order, so a producer whose predecessor has
//! not committed yet spins. That wait is bounded by a deadline; passing it
//! means a producer stalled while holding the commit cursor, and is reported
//! as an error rather than retried.
//!
//! Positions are absolute byte offsets (`u64`) that never wrap; the buffer
//! index of a position is `position & (capacity - 1)`.

use super::error::RingBufferError;
use crossbeam::utils::{Backoff, CachePadded};
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::error;

/// Default bound on the commit wait.
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Lock-free multi-producer byte ring buffer.
pub struct RingBuffer {
    buffer: Box<[UnsafeCell<u8>]>,
    mask: u64,
    claimed: CachePadded<AtomicU64>,
    committed: CachePadded<AtomicU64>,
    commit_timeout: Duration,
}

// SAFETY: producers only write inside the byte range they exclusively claimed
// through `claimed`, and readers only read ranges below `committed`, which
// is published with Release after the bytes are copied. Bytes of a committed
// range are rewritten only once `claimed` has moved a full capacity past
// them; `read_by_seq` rejects such ranges, and callers that keep live data
// within one capacity of the claim cursor (as `Spool` does through its
// sizing) never read memory that is being written.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Creates a buffer of `capacity` bytes with the default commit timeout.
    ///
    /// # Errors
    ///
    /// [`RingBufferError::InvalidCapacity`] unless `capacity` is a non-zero
    /// power of two.
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        Self::with_commit_timeout(capacity, DEFAULT_COMMIT_TIMEOUT)
    }

    /// Creates a buffer of `capacity` bytes with a custom commit timeout.
    ///
    /// # Errors
    ///
    /// See [`RingBuffer::new`].
    pub fn with_commit_timeout(
        capacity: usize,
        commit_timeout: Duration,
    ) -> Result<Self, RingBufferError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(RingBufferError::InvalidCapacity { capacity });
        }
        let buffer = (0..capacity).map(|_| UnsafeCell::new(0u8)).collect();
        Ok(Self {
            buffer,
            mask: capacity as u64 - 1,
            claimed: CachePadded::new(AtomicU64::new(0)),
            committed: CachePadded::new(AtomicU64::new(0)),
            commit_timeout,
        })
    }

    /// Copies `bytes` into the buffer and returns the position they start at.
    ///
    /// The claim is a single `fetch_add` on the claim cursor, which is the
    /// uncontended form of the claim CAS loop. The bytes are visible to
    /// readers once this returns `Ok`.
    ///
    /// # Errors
    ///
    /// - [`RingBufferError::CapacityExceeded`] if `bytes` is longer than the
    ///   buffer; nothing is claimed.
    /// - [`RingBufferError::CommitTimeout`] if the preceding claim was not
    ///   committed in time. The buffer cannot make progress after this and
    ///   must be discarded together with its channel.
    pub fn write(&self, bytes: &[u8]) -> Result<u64, RingBufferError> {
        let length = bytes.len();
        if length > self.buffer.len() {
            return Err(RingBufferError::CapacityExceeded {
                length,
                capacity: self.buffer.len(),
            });
        }
        if length == 0 {
            return Ok(self.claimed.load(Ordering::Acquire));
        }

        let start = self.claimed.fetch_add(length as u64, Ordering::AcqRel);
        let index = (start & self.mask) as usize;
        let first = length.min(self.buffer.len() - index);
        let base = UnsafeCell::raw_get(self.buffer.as_ptr());
        // SAFETY: [start, start + length) is claimed by this call only, both
        // copies stay inside the buffer, and `bytes` cannot alias it.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), base.add(index), first);
            if first < length {
                ptr::copy_nonoverlapping(bytes.as_ptr().add(first), base, length - first);
            }
        }

        self.commit(start, start + length as u64)?;
        Ok(start)
    }

    fn commit(&self, start: u64, end: u64) -> Result<(), RingBufferError> {
        let backoff = Backoff::new();
        let mut started: Option<Instant> = None;
        loop {
            match self.committed.compare_exchange_weak(
                start,
                end,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(()),
                Err(_) if !backoff.is_completed() => backoff.snooze(),
                Err(committed) => {
                    let since = *started.get_or_insert_with(Instant::now);
                    let waited = since.elapsed();
                    if waited >= self.commit_timeout {
                        error!(
                            expected = start,
                            committed,
                            waited_ms = waited.as_millis() as u64,
                            "ring buffer commit timed out, a producer stalled"
                        );
                        return Err(RingBufferError::CommitTimeout {
                            expected: start,
                            committed,
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Hands the committed bytes `[position, position + length)` to `sink`.
    ///
    /// Contiguous ranges are passed without copying; a range that wraps the
    /// end of the buffer is copied into a temporary first.
    ///
    /// # Errors
    ///
    /// - [`RingBufferError::NotCommitted`] if any byte is beyond the committed
    ///   cursor.
    /// - [`RingBufferError::Overwritten`] if newer writes have lapped the
    ///   range, checked before and after `sink` runs.
    pub fn read_by_seq<R>(
        &self,
        position: u64,
        length: usize,
        sink: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, RingBufferError> {
        let end = position + length as u64;
        let committed = self.committed.load(Ordering::Acquire);
        if end > committed {
            return Err(RingBufferError::NotCommitted {
                position,
                end,
                committed,
            });
        }
        self.check_not_lapped(position)?;

        let index = (position & self.mask) as usize;
        let first = length.min(self.buffer.len() - index);
        let base = UnsafeCell::raw_get(self.buffer.as_ptr());
        let result = if first == length {
            // SAFETY: the range is committed (Acquire above) and not lapped.
            let bytes = unsafe { std::slice::from_raw_parts(base.add(index), length) };
            sink(bytes)
        } else {
            let mut copy = Vec::with_capacity(length);
            // SAFETY: as above; the two parts are the tail and head of the buffer.
            unsafe {
                copy.extend_from_slice(std::slice::from_raw_parts(base.add(index), first));
                copy.extend_from_slice(std::slice::from_raw_parts(base, length - first));
            }
            sink(&copy)
        };

        self.check_not_lapped(position)?;
        Ok(result)
    }

    #[inline]
    fn check_not_lapped(&self, position: u64) -> Result<(), RingBufferError> {
        let claimed = self.claimed.load(Ordering::Acquire);
        if claimed > position + self.buffer.len() as u64 {
            error!(position, claimed, capacity = self.buffer.len(), "ring buffer read overwritten");
            return Err(RingBufferError::Overwritten {
                position,
                claimed,
                capacity: self.buffer.len(),
            });
        }
        Ok(())
    }

    /// Buffer size in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// End of the last committed range.
    #[must_use]
    pub fn committed_position(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }

    /// End of the last claimed range.
    #[must_use]
    pub fn claimed_position(&self) -> u64 {
        self.claimed.load(Ordering::Acquire)
    }

    /// Bound on the commit wait.
    #[must_use]
    pub fn commit_timeout(&self) -> Duration {
        self.commit_timeout
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.buffer.len())
            .field("claimed", &self.claimed_position())
            .field("committed", &self.committed_position())
            .field("commit_timeout", &self.commit_timeout)
            .finish()
    }
}

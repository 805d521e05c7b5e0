//! Sequencer error types.
//!
//! Every variant here is fatal for the channel that raised it: it means the
//! buffers are undersized for the observed burst or gap, or a producer
//! stalled. Sequence gaps are never errors.

use thiserror::Error;

/// Errors raised by [`RingBuffer`](super::RingBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RingBufferError {
    /// A single write is larger than the whole buffer.
    #[error("write of {length} bytes exceeds ring buffer capacity of {capacity} bytes")]
    CapacityExceeded {
        /// Requested write length
        length: usize,
        /// Buffer capacity
        capacity: usize,
    },

    /// A producer waited too long for its predecessor to commit.
    #[error("timed out after {waited_ms} ms waiting for commit position {expected} (committed {committed})")]
    CommitTimeout {
        /// The committed position this producer was waiting for
        expected: u64,
        /// The committed position when the wait was abandoned
        committed: u64,
        /// How long the producer waited
        waited_ms: u64,
    },

    /// Read of a range that has not been committed yet.
    #[error("read of [{position}, {end}) is beyond committed position {committed}")]
    NotCommitted {
        /// Start of the requested range
        position: u64,
        /// End of the requested range
        end: u64,
        /// Current committed position
        committed: u64,
    },

    /// Read of a range that newer writes have already lapped.
    #[error("read at {position} was overwritten (claimed {claimed}, capacity {capacity})")]
    Overwritten {
        /// Start of the requested range
        position: u64,
        /// Current claimed position
        claimed: u64,
        /// Buffer capacity
        capacity: usize,
    },

    /// Buffer created with a capacity that is zero or not a power of two.
    #[error("ring buffer capacity must be a non-zero power of two, got {capacity}")]
    InvalidCapacity {
        /// Requested capacity
        capacity: usize,
    },
}

/// Errors raised by [`Spool`](super::Spool).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SpoolError {
    /// The range to keep spooled is wider than the number of slots.
    #[error("spool range [{min_allowable_seq}, {end_seq}) exceeds capacity of {capacity} slots")]
    CapacityExceeded {
        /// Lowest sequence still needed by the reader
        min_allowable_seq: u64,
        /// One past the last sequence of the batch
        end_seq: u64,
        /// Number of slots
        capacity: usize,
    },

    /// A single message is larger than the configured maximum.
    #[error("message {seq} of {length} bytes exceeds maximum message length {max}")]
    MessageTooLarge {
        /// Sequence of the message
        seq: u64,
        /// Message length
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// The walker produced a length or offset outside the batch.
    #[error("malformed batch at message {seq}: offset {offset}, batch length {batch_length}")]
    MalformedBatch {
        /// Sequence of the message being located
        seq: u64,
        /// Offset reported by the walker
        offset: usize,
        /// Total batch length
        batch_length: usize,
    },

    /// The range runs past the largest representable sequence.
    #[error("range of {msg_count} messages from {from_seq} overflows the sequence space")]
    SequenceOverflow {
        /// First sequence of the range
        from_seq: u64,
        /// Messages in the range
        msg_count: u32,
    },

    /// Spool sizing parameters are unusable.
    #[error("invalid spool configuration: {reason}")]
    InvalidConfig {
        /// What is wrong
        reason: String,
    },

    /// The backing ring buffer failed.
    #[error(transparent)]
    RingBuffer(#[from] RingBufferError),
}

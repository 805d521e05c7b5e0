//! Demultiplexing of multi-message batches without knowledge of the schema.

/// Locates individual messages inside a batch of raw bytes.
///
/// Implemented by the wire-schema layer. `buffer` is the whole batch and
/// `offset` the start of a message within it. Implementations must not
/// panic on truncated input; callers validate every returned length and
/// offset against the batch.
pub trait RawMessageWalker: Send + Sync {
    /// Length in bytes of the message starting at `offset`, or `0` when no
    /// complete message header is available there.
    fn length(&self, buffer: &[u8], offset: usize) -> usize;

    /// Offset of the message following the one at `offset`.
    fn next_offset(&self, buffer: &[u8], offset: usize) -> usize {
        offset + self.length(buffer, offset)
    }

    /// Offset of the message `message_index` messages after `offset`.
    fn walk_to(&self, buffer: &[u8], offset: usize, message_index: usize) -> usize {
        let mut offset = offset;
        for _ in 0..message_index {
            if offset >= buffer.len() {
                break;
            }
            offset = self.next_offset(buffer, offset);
        }
        offset
    }
}

/// Size of the length prefix read by [`LengthPrefixedWalker`].
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Walker for frames that start with a little-endian `u16` length covering
/// the whole frame, prefix included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthPrefixedWalker;

impl LengthPrefixedWalker {
    /// Appends `payload` to `out` as one length-prefixed frame.
    ///
    /// Returns `false`, leaving `out` untouched, if the frame would not fit
    /// a `u16` length.
    pub fn encode(payload: &[u8], out: &mut Vec<u8>) -> bool {
        let Ok(length) = u16::try_from(payload.len() + LENGTH_PREFIX_SIZE) else {
            return false;
        };
        out.extend_from_slice(&length.to_le_bytes());
        out.extend_from_slice(payload);
        true
    }

    /// Payload of the frame at the start of `frame`, if complete.
    #[must_use]
    pub fn payload(frame: &[u8]) -> Option<&[u8]> {
        let length = Self.length(frame, 0);
        (length >= LENGTH_PREFIX_SIZE && length <= frame.len())
            .then(|| &frame[LENGTH_PREFIX_SIZE..length])
    }
}

impl RawMessageWalker for LengthPrefixedWalker {
    #[inline]
    fn length(&self, buffer: &[u8], offset: usize) -> usize {
        match buffer.get(offset..offset + LENGTH_PREFIX_SIZE) {
            Some(&[lo, hi]) => u16::from_le_bytes([lo, hi]) as usize,
            _ => 0,
        }
    }
}

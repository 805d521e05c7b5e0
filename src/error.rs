//! Crate-level error type.

use crate::marketdata::SpreadTableError;
use crate::sequencer::{RingBufferError, SpoolError};
use std::fmt;
use std::path::PathBuf;

/// Errors surfaced to whoever owns a feed: configuration problems, channel
/// failures and lookup mismatches.
///
/// Sequence gaps and stale ranges are normal operation and never show up
/// here.
#[derive(Debug)]
#[non_exhaustive]
pub enum FeedError {
    /// A spread table could not be built or a price/tick lookup failed.
    SpreadTable(SpreadTableError),

    /// A ring buffer failed outside of a spool.
    RingBuffer(RingBufferError),

    /// A spool rejected a range or could not replay a message.
    Spool(SpoolError),

    /// No arbitrator is registered for the channel.
    UnknownChannel {
        /// The requested channel
        channel_id: u32,
    },

    /// An arbitrator is already registered for the channel.
    DuplicateChannel {
        /// The conflicting channel
        channel_id: u32,
    },

    /// No spread table is configured with the id.
    UnknownSpreadTable {
        /// The requested spread table id
        id: u8,
    },

    /// Configuration values are inconsistent or out of range.
    InvalidConfig {
        /// What is wrong
        message: String,
    },

    /// Reading configuration from disk failed.
    Io {
        /// The underlying I/O error message
        message: String,
        /// The file involved, if known
        path: Option<PathBuf>,
    },

    /// JSON encoding or decoding failed.
    Serialization {
        /// The underlying serde error message
        message: String,
    },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::SpreadTable(e) => write!(f, "spread table error: {e}"),
            FeedError::RingBuffer(e) => write!(f, "ring buffer error: {e}"),
            FeedError::Spool(e) => write!(f, "spool error: {e}"),
            FeedError::UnknownChannel { channel_id } => {
                write!(f, "no arbitrator registered for channel {channel_id}")
            }
            FeedError::DuplicateChannel { channel_id } => {
                write!(f, "channel {channel_id} is already registered")
            }
            FeedError::UnknownSpreadTable { id } => {
                write!(f, "no spread table configured with id {id}")
            }
            FeedError::InvalidConfig { message } => write!(f, "invalid configuration: {message}"),
            FeedError::Io { message, path } => {
                if let Some(p) = path {
                    write!(f, "I/O error at {}: {message}", p.display())
                } else {
                    write!(f, "I/O error: {message}")
                }
            }
            FeedError::Serialization { message } => write!(f, "serialization error: {message}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::SpreadTable(e) => Some(e),
            FeedError::RingBuffer(e) => Some(e),
            FeedError::Spool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpreadTableError> for FeedError {
    #[cold]
    fn from(err: SpreadTableError) -> Self {
        FeedError::SpreadTable(err)
    }
}

impl From<RingBufferError> for FeedError {
    #[cold]
    fn from(err: RingBufferError) -> Self {
        FeedError::RingBuffer(err)
    }
}

impl From<SpoolError> for FeedError {
    #[cold]
    fn from(err: SpoolError) -> Self {
        FeedError::Spool(err)
    }
}

impl From<std::io::Error> for FeedError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        FeedError::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for FeedError {
    #[cold]
    fn from(err: serde_json::Error) -> Self {
        FeedError::Serialization {
            message: err.to_string(),
        }
    }
}

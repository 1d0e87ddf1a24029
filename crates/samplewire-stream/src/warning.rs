use std::collections::VecDeque;
use std::fmt;

use samplewire_codec::{CodecError, DecodeWarning, WarningSink};

/// Transfer direction, used when a format lacks a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Send,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Send => f.write_str("send"),
            Direction::Receive => f.write_str("receive"),
        }
    }
}

/// Non-fatal problems recorded by a [`Protocol`](crate::Protocol).
///
/// None of these abort the session: the current receive or send ends early
/// and the residue is left as it was.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolWarning {
    /// Malformed input found while decoding.
    #[error(transparent)]
    Decode(#[from] DecodeWarning),

    /// Reading from the source failed.
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Writing to the sink failed.
    #[error("write failed after {written} bytes: {source}")]
    Write {
        written: usize,
        source: std::io::Error,
    },

    /// The sink accepted no more bytes.
    #[error("sink closed after {written} of {total} bytes")]
    SinkClosed { written: usize, total: usize },

    /// Flushing the sink failed.
    #[error("flush failed: {0}")]
    Flush(#[source] std::io::Error),

    /// The samples could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),

    /// The bound format does not support this direction.
    #[error("{format} does not support {direction}")]
    Unsupported {
        format: &'static str,
        direction: Direction,
    },
}

/// Bounded queue of pending warnings; the oldest is dropped when full.
#[derive(Debug)]
pub(crate) struct WarningQueue {
    pending: VecDeque<ProtocolWarning>,
    capacity: usize,
    dropped: u64,
}

impl WarningQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            dropped: 0,
        }
    }

    pub(crate) fn record(&mut self, warning: ProtocolWarning) {
        tracing::warn!(%warning, "protocol warning");
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.pending.len() == self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
        }
        self.pending.push_back(warning);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ProtocolWarning> {
        self.pending.iter()
    }

    pub(crate) fn take(&mut self) -> Vec<ProtocolWarning> {
        self.pending.drain(..).collect()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl WarningSink for WarningQueue {
    fn warn(&mut self, warning: DecodeWarning) {
        self.record(warning.into());
    }
}

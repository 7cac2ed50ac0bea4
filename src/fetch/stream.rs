//! Per-request body accumulator enforcing the size cap and wall-clock budget.

use std::time::{Duration, Instant};

/// Why a body stream was cut off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamLimit {
    TooLarge { limit_bytes: u64 },
    TimedOut,
}

/// Buffer for one in-flight response body.
///
/// Owned by a single fetch and dropped with it; a violation leaves nothing
/// behind for the caller.
#[derive(Debug)]
pub(crate) struct StreamState {
    buffer: Vec<u8>,
    bytes_written: u64,
    started_at: Instant,
    max_bytes: u64,
    budget: Duration,
}

impl StreamState {
    pub(crate) fn new(started_at: Instant, max_bytes: u64, budget: Duration) -> Self {
        Self {
            buffer: Vec::new(),
            bytes_written: 0,
            started_at,
            max_bytes,
            budget,
        }
    }

    /// Checks the size cap, appends the chunk, then checks elapsed time.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Result<(), StreamLimit> {
        let total = self.bytes_written.saturating_add(chunk.len() as u64);
        if total > self.max_bytes {
            return Err(StreamLimit::TooLarge {
                limit_bytes: self.max_bytes,
            });
        }
        self.buffer.extend_from_slice(chunk);
        self.bytes_written = total;

        if self.started_at.elapsed() > self.budget {
            return Err(StreamLimit::TimedOut);
        }
        Ok(())
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

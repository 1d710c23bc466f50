//! Monotonic request numbering for overlapping poll cycles.
//!
//! Every fetch gets a sequence number when it is issued. A completed fetch
//! may only be applied if no later-issued fetch has been applied already,
//! which discards responses that complete out of order.

use std::sync::atomic::{AtomicU64, Ordering};

/// Issues request numbers and tracks the newest applied one.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl RequestSequencer {
    /// Creates a sequencer that has issued nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next sequence number, starting at 1.
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Most recently issued number, 0 if none.
    #[must_use]
    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Most recently applied number, 0 if none.
    #[must_use]
    pub fn latest_applied(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }

    /// Marks `seq` as applied if it is newer than every applied request.
    ///
    /// Returns `false` for stale completions, which must be dropped.
    pub fn try_apply(&self, seq: u64) -> bool {
        self.applied.fetch_max(seq, Ordering::SeqCst) < seq
    }
}

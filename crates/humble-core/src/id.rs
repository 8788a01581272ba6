//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`BlockId`] allocation.
static BLOCK_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a memory block.
///
/// Allocated from a monotonic atomic counter via [`BlockId::next`]. Two
/// blocks never share an ID within a process, even when a block is dropped
/// and its replacement lands at the same address. Adapters compare and
/// report block identity through this type rather than raw addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    /// Allocate a fresh, unique block ID. Thread-safe.
    pub fn next() -> Self {
        Self(BLOCK_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

//! Allocation event counters for memory blocks.
//!
//! [`BlockStats`] is a point-in-time snapshot; the live counters sit inside
//! each block and are bumped with relaxed atomics on every call, so reading
//! them never contends with the allocation lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Occupancy and event counts of one memory block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Total capacity of the block in bytes.
    pub capacity_bytes: usize,
    /// Bytes below the high-water mark (handed out at least once).
    pub reserved_bytes: usize,
    /// Bytes currently held by callers.
    pub occupied_bytes: usize,
    /// Successful allocate calls.
    pub allocations: u64,
    /// Successful deallocate calls.
    pub deallocations: u64,
    /// Allocate calls that did not fit.
    pub failed_allocations: u64,
    /// Deallocate calls naming memory the block does not own.
    pub rejected_deallocations: u64,
}

impl BlockStats {
    /// Bytes released by callers but not reusable until teardown.
    pub fn forfeited_bytes(&self) -> usize {
        self.reserved_bytes - self.occupied_bytes
    }

    /// Bytes above the high-water mark.
    pub fn remaining_bytes(&self) -> usize {
        self.capacity_bytes - self.reserved_bytes
    }
}

#[derive(Debug, Default)]
pub(crate) struct BlockCounters {
    allocations: AtomicU64,
    deallocations: AtomicU64,
    failed_allocations: AtomicU64,
    rejected_deallocations: AtomicU64,
}

impl BlockCounters {
    pub(crate) fn record_allocation(&self, ok: bool) {
        let counter = if ok {
            &self.allocations
        } else {
            &self.failed_allocations
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deallocation(&self, ok: bool) {
        let counter = if ok {
            &self.deallocations
        } else {
            &self.rejected_deallocations
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fill the event fields of `stats`.
    pub(crate) fn fill(&self, stats: &mut BlockStats) {
        stats.allocations = self.allocations.load(Ordering::Relaxed);
        stats.deallocations = self.deallocations.load(Ordering::Relaxed);
        stats.failed_allocations = self.failed_allocations.load(Ordering::Relaxed);
        stats.rejected_deallocations = self.rejected_deallocations.load(Ordering::Relaxed);
    }
}

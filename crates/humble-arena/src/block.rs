//! Fixed-capacity, thread-safe bump-allocated memory blocks.
//!
//! A [`MemoryBlock`] owns one contiguous byte region obtained from the
//! system allocator at construction. Allocation advances a high-water mark;
//! deallocation only decrements the occupancy counter. Released ranges are
//! forfeited until the whole block is dropped. There is no free list and no
//! compaction.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};

use humble_core::{AllocError, BlockId};
use parking_lot::Mutex;

use crate::config::BlockConfig;
use crate::stats::{BlockCounters, BlockStats};
use crate::upstream::Upstream;

/// A contiguous byte region with bump allocation.
///
/// The block knows nothing about element types: callers ask for byte
/// counts and get back byte pointers. All mutating calls hold the internal
/// lock for O(1) work, so any number of threads may share a block through
/// `&MemoryBlock` or `Arc<MemoryBlock>`.
///
/// Dropping a block while bytes are still occupied is permitted. Values
/// living in those bytes are never dropped; the caller must have destroyed
/// them first.
pub struct MemoryBlock {
    id: BlockId,
    /// Start of the region. Dangling (but aligned) when `layout.size() == 0`.
    storage: NonNull<u8>,
    layout: Layout,
    /// Source of `storage`; `None` is the global allocator.
    upstream: Option<Upstream>,
    /// High-water mark as a byte offset from `storage`.
    cursor: Mutex<usize>,
    /// Bytes currently held by callers. Written only under `cursor`.
    occupied: AtomicUsize,
    counters: BlockCounters,
}

// SAFETY: `storage` is owned exclusively by the block and freed once in
// `Drop`. The block never reads or writes through it; the cursor and
// occupancy it hands out are guarded by `cursor` and atomics.
unsafe impl Send for MemoryBlock {}

// SAFETY: see `Send`. Every `&self` method either takes the lock or reads
// an atomic.
unsafe impl Sync for MemoryBlock {}

impl MemoryBlock {
    /// Acquire storage for a block described by `config` from the global
    /// allocator.
    ///
    /// Fails with [`AllocError::OutOfMemory`] if the layout is invalid or
    /// the system allocator cannot supply the bytes.
    pub fn new(config: BlockConfig) -> Result<Self, AllocError> {
        Self::acquire(config, None)
    }

    /// Acquire storage for a block described by `config` from `upstream`.
    ///
    /// The region goes back to the same upstream when the block is
    /// dropped. A zero-capacity block never calls it.
    pub fn new_in(config: BlockConfig, upstream: Upstream) -> Result<Self, AllocError> {
        Self::acquire(config, Some(upstream))
    }

    fn acquire(config: BlockConfig, upstream: Option<Upstream>) -> Result<Self, AllocError> {
        let layout = config.layout()?;
        let storage = if layout.size() == 0 {
            NonNull::new(ptr::without_provenance_mut::<u8>(layout.align())).ok_or(
                AllocError::OutOfMemory {
                    requested: 0,
                    available: 0,
                },
            )?
        } else {
            // SAFETY: `layout` has a non-zero size.
            let raw = unsafe {
                match &upstream {
                    Some(upstream) => upstream.alloc(layout),
                    None => alloc::alloc(layout),
                }
            };
            NonNull::new(raw).ok_or(AllocError::OutOfMemory {
                requested: layout.size(),
                available: 0,
            })?
        };
        let id = BlockId::next();
        tracing::trace!(
            block = %id,
            bytes = layout.size(),
            align = layout.align(),
            upstream = upstream.is_some(),
            "memory block created"
        );
        Ok(Self {
            id,
            storage,
            layout,
            upstream,
            cursor: Mutex::new(0),
            occupied: AtomicUsize::new(0),
            counters: BlockCounters::default(),
        })
    }

    /// Acquire a byte-aligned block of `bytes` capacity.
    pub fn with_capacity(bytes: usize) -> Result<Self, AllocError> {
        Self::new(BlockConfig::new(bytes))
    }

    /// Stable identity of this block.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Bump-allocate `bytes` bytes.
    ///
    /// Returns the address at the current high-water mark and advances it,
    /// or `None` if the request does not fit in the remaining capacity. A
    /// zero-byte request returns the high-water address without advancing.
    pub fn allocate(&self, bytes: usize) -> Option<NonNull<u8>> {
        let mut cursor = self.cursor.lock();
        let next = cursor.checked_add(bytes).filter(|&end| end <= self.layout.size());
        let Some(next) = next else {
            let available = self.layout.size() - *cursor;
            drop(cursor);
            self.counters.record_allocation(false);
            tracing::debug!(
                block = %self.id,
                requested = bytes,
                available,
                "no room in memory block"
            );
            return None;
        };
        // SAFETY: `*cursor <= layout.size()`, so the offset stays inside
        // (or one past the end of) the allocation.
        let ptr = unsafe { self.storage.add(*cursor) };
        *cursor = next;
        self.occupied.fetch_add(bytes, Ordering::Relaxed);
        drop(cursor);
        self.counters.record_allocation(true);
        Some(ptr)
    }

    /// Release `bytes` bytes at `ptr`.
    ///
    /// Succeeds only if `ptr` lies in `[start, high_water)` and no more
    /// bytes are released than are occupied. A zero-byte release may also
    /// name the high-water address itself. On success the occupancy drops
    /// by `bytes`; the high-water mark never moves back.
    ///
    /// The block keeps no per-allocation record. A range released twice is
    /// rejected only once the occupancy can no longer cover it; while other
    /// bytes are still occupied the repeat is accepted and the occupancy
    /// falls below the true live count.
    pub fn deallocate(&self, ptr: NonNull<u8>, bytes: usize) -> bool {
        let address = ptr.as_ptr() as usize;
        let start = self.start();
        let accepted = {
            let cursor = self.cursor.lock();
            let high_water = start + *cursor;
            let in_range = if bytes == 0 {
                start <= address && address <= high_water
            } else {
                start <= address && address < high_water
            };
            let occupied = self.occupied.load(Ordering::Relaxed);
            if in_range && bytes <= occupied {
                self.occupied.store(occupied - bytes, Ordering::Relaxed);
                true
            } else {
                false
            }
        };
        self.counters.record_deallocation(accepted);
        if !accepted {
            tracing::warn!(
                block = %self.id,
                address = format_args!("{address:#x}"),
                len = bytes,
                "deallocation outside the storage"
            );
        }
        accepted
    }

    /// Whether `[ptr, ptr + size)` lies inside the block's storage.
    ///
    /// With `size == 0` only the first byte is checked.
    pub fn contains(&self, ptr: *const u8, size: usize) -> bool {
        let address = ptr as usize;
        let start = self.start();
        let end = start + self.layout.size();
        if !(start <= address && address < end) {
            return false;
        }
        size == 0 || address.checked_add(size).is_some_and(|last| last <= end)
    }

    /// Whether no bytes are currently occupied.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Bytes currently occupied by callers.
    pub fn size(&self) -> usize {
        self.occupied.load(Ordering::Relaxed)
    }

    /// Bytes below the high-water mark, occupied or forfeited.
    pub fn reserved(&self) -> usize {
        *self.cursor.lock()
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    /// Bytes above the high-water mark.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.reserved()
    }

    /// Snapshot of occupancy and event counters.
    pub fn stats(&self) -> BlockStats {
        let (reserved, occupied) = {
            let cursor = self.cursor.lock();
            (*cursor, self.occupied.load(Ordering::Relaxed))
        };
        let mut stats = BlockStats {
            capacity_bytes: self.layout.size(),
            reserved_bytes: reserved,
            occupied_bytes: occupied,
            ..Default::default()
        };
        self.counters.fill(&mut stats);
        stats
    }

    fn start(&self) -> usize {
        self.storage.as_ptr() as usize
    }
}

impl Drop for MemoryBlock {
    fn drop(&mut self) {
        let occupied = *self.occupied.get_mut();
        if occupied > 0 {
            tracing::debug!(block = %self.id, occupied, "memory block dropped while occupied");
        }
        if self.layout.size() > 0 {
            // SAFETY: `storage` was obtained for `self.layout` from this
            // same upstream in `acquire` and is released only here.
            unsafe {
                match &self.upstream {
                    Some(upstream) => upstream.dealloc(self.storage.as_ptr(), self.layout),
                    None => alloc::dealloc(self.storage.as_ptr(), self.layout),
                }
            }
        }
        tracing::trace!(block = %self.id, "memory block released");
    }
}

impl std::fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("reserved", &self.reserved())
            .field("occupied", &self.size())
            .finish()
    }
}

//! Where memory blocks get their storage from.
//!
//! A block acquires its whole region once, at construction, and returns it
//! once, on drop. By default that goes to the process-wide global
//! allocator; [`MemoryBlock::new_in`](crate::MemoryBlock::new_in) and
//! [`HumbleAllocator::with_upstream`](crate::HumbleAllocator::with_upstream)
//! take any [`GlobalAlloc`] instead.

#![allow(unsafe_code)]

use std::alloc::{self, GlobalAlloc, Layout};
use std::sync::Arc;

/// Shared handle to the allocator a block draws its region from.
pub type Upstream = Arc<dyn GlobalAlloc + Send + Sync>;

/// The registered global allocator, usable as an explicit [`Upstream`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalHeap;

impl GlobalHeap {
    /// A shared handle to the global allocator.
    pub fn shared() -> Upstream {
        Arc::new(Self)
    }
}

// SAFETY: forwards to the registered global allocator unchanged.
unsafe impl GlobalAlloc for GlobalHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { alloc::alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { alloc::dealloc(ptr, layout) }
    }
}

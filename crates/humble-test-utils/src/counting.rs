//! Allocator wrapper that counts calls through the container contract.
//!
//! Wrap any [`ElementAllocator`] in a [`CountingAllocator`] to assert how
//! often a container allocates, constructs, destroys and deallocates. All
//! clones and rebinds of one wrapper report into the same [`CallCounts`].
//!
//! [`CountingUpstream`] does the same one level down, for the region a
//! memory block takes from its upstream.

#![allow(unsafe_code)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use humble_core::{AllocError, ElementAllocator};

/// Shared call tally.
#[derive(Debug, Default)]
pub struct CallCounts {
    allocate: AtomicUsize,
    deallocate: AtomicUsize,
    construct: AtomicUsize,
    destroy: AtomicUsize,
}

impl CallCounts {
    pub fn allocate(&self) -> usize {
        self.allocate.load(Ordering::SeqCst)
    }

    pub fn deallocate(&self) -> usize {
        self.deallocate.load(Ordering::SeqCst)
    }

    pub fn construct(&self) -> usize {
        self.construct.load(Ordering::SeqCst)
    }

    pub fn destroy(&self) -> usize {
        self.destroy.load(Ordering::SeqCst)
    }

    /// Sum of all four counters.
    pub fn total(&self) -> usize {
        self.allocate() + self.deallocate() + self.construct() + self.destroy()
    }
}

/// Forwards to `A` and counts every contract call.
#[derive(Debug)]
pub struct CountingAllocator<A> {
    inner: A,
    counts: Arc<CallCounts>,
}

impl<A> CountingAllocator<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            counts: Arc::new(CallCounts::default()),
        }
    }

    pub fn counts(&self) -> Arc<CallCounts> {
        Arc::clone(&self.counts)
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Default> Default for CountingAllocator<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

impl<A: Clone> Clone for CountingAllocator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            counts: Arc::clone(&self.counts),
        }
    }
}

// SAFETY: every storage-producing call is forwarded unchanged to `A`.
unsafe impl<T, A: ElementAllocator<T>> ElementAllocator<T> for CountingAllocator<A> {
    type Rebind<U> = CountingAllocator<A::Rebind<U>>;

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        self.counts.allocate.fetch_add(1, Ordering::SeqCst);
        self.inner.allocate(n)
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), AllocError> {
        self.counts.deallocate.fetch_add(1, Ordering::SeqCst);
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { self.inner.deallocate(ptr, n) }
    }

    fn max_size(&self) -> usize {
        self.inner.max_size()
    }

    fn rebind<U>(&self) -> Self::Rebind<U> {
        CountingAllocator {
            inner: self.inner.rebind(),
            counts: Arc::clone(&self.counts),
        }
    }

    fn for_container_copy(&self) -> Self {
        Self {
            inner: self.inner.for_container_copy(),
            counts: Arc::clone(&self.counts),
        }
    }

    unsafe fn construct(&self, ptr: NonNull<T>, value: T) {
        self.counts.construct.fetch_add(1, Ordering::SeqCst);
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { self.inner.construct(ptr, value) }
    }

    unsafe fn destroy(&self, ptr: NonNull<T>) {
        self.counts.destroy.fetch_add(1, Ordering::SeqCst);
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { self.inner.destroy(ptr) }
    }
}

/// A [`GlobalAlloc`] over [`System`] that counts the regions it hands out.
#[derive(Debug, Default)]
pub struct CountingUpstream {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    bytes_requested: AtomicUsize,
}

impl CountingUpstream {
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }

    /// Bytes requested over the upstream's lifetime.
    pub fn bytes_requested(&self) -> usize {
        self.bytes_requested.load(Ordering::SeqCst)
    }
}

// SAFETY: every call is forwarded unchanged to `System`.
unsafe impl GlobalAlloc for CountingUpstream {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.bytes_requested.fetch_add(layout.size(), Ordering::SeqCst);
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        // SAFETY: forwarded under the caller's guarantee.
        unsafe { System.dealloc(ptr, layout) }
    }
}

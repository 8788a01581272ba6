//! General-purpose heap allocator implementing the container contract.
//!
//! [`HeapAllocator<T>`] forwards every request to the global allocator. It
//! is the default allocator of the containers in this workspace and the
//! baseline the block allocator is benchmarked against.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use humble_core::{AllocError, ElementAllocator};

/// Stateless allocator over the global heap.
pub struct HeapAllocator<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> HeapAllocator<T> {
    /// A new handle. All handles are interchangeable.
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for HeapAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for HeapAllocator<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HeapAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HeapAllocator")
    }
}

/// Heap handles of one element type always compare equal: storage from
/// any of them can be released through any other.
impl<T> PartialEq for HeapAllocator<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for HeapAllocator<T> {}

// SAFETY: storage comes from the global allocator with `Layout::array::<T>`,
// which is aligned for `T` and never overlaps other live allocations.
unsafe impl<T> ElementAllocator<T> for HeapAllocator<T> {
    type Rebind<U> = HeapAllocator<U>;

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(n).map_err(|_| AllocError::OutOfMemory {
            requested: usize::MAX,
            available: 0,
        })?;
        if layout.size() == 0 {
            return Ok(NonNull::dangling());
        }
        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        NonNull::new(raw.cast::<T>()).ok_or(AllocError::OutOfMemory {
            requested: layout.size(),
            available: 0,
        })
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), AllocError> {
        let layout = Layout::array::<T>(n).map_err(|_| AllocError::OutOfRange {
            address: ptr.as_ptr() as usize,
            len: usize::MAX,
        })?;
        if layout.size() > 0 {
            // SAFETY: caller guarantees `ptr` came from `allocate(n)`, which
            // used this same layout.
            unsafe { alloc::dealloc(ptr.as_ptr().cast(), layout) };
        }
        Ok(())
    }

    fn max_size(&self) -> usize {
        isize::MAX as usize / mem::size_of::<T>().max(1)
    }

    fn rebind<U>(&self) -> HeapAllocator<U> {
        HeapAllocator::new()
    }
}

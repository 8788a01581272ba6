//! The allocation capability contract consumed by containers.
//!
//! Containers never talk to a memory block directly. They hold an
//! [`ElementAllocator`] by value and drive it through four calls:
//! `allocate`, `construct`, `destroy`, `deallocate`.

#![allow(unsafe_code)]

use std::ptr::{self, NonNull};

use crate::error::AllocError;

/// Typed allocation contract for containers of `T`.
///
/// `allocate(n)` hands out uninitialised storage for `n` contiguous values;
/// the container then `construct`s values in place, `destroy`s them when
/// removing, and finally returns the storage with `deallocate(ptr, n)` using
/// the same `n`.
///
/// # Safety
///
/// Implementors must guarantee that a pointer returned by `allocate(n)` is
/// aligned for `T`, valid for reads and writes of `n` values, and does not
/// overlap any other live allocation handed out by this allocator or any
/// clone of it. The storage must stay valid until it is deallocated or the
/// last clone sharing it is dropped.
pub unsafe trait ElementAllocator<T>: Clone {
    /// The same allocator family specialised for another element type.
    type Rebind<U>: ElementAllocator<U>;

    /// Obtain storage for `n` values of `T`.
    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError>;

    /// Return storage previously obtained with `allocate(n)`.
    ///
    /// Allocators that can recognise foreign pointers report them as
    /// [`AllocError::OutOfRange`]; others may not detect them at all.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate(n)` on this allocator or a clone of
    /// it, with the same `n`, and must not have been deallocated already.
    /// Values stored there must already have been destroyed or moved out.
    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), AllocError>;

    /// Upper bound on the number of values a single allocator can serve.
    fn max_size(&self) -> usize;

    /// An allocator for `U` in the same family. Never shares state with
    /// `self`: storage capacity depends on the element size.
    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// The allocator a container clone should use.
    ///
    /// Defaults to `self.clone()`. Allocators whose clones share a
    /// fixed-capacity region override this so a cloned container does not
    /// compete with its source for capacity.
    fn for_container_copy(&self) -> Self {
        self.clone()
    }

    /// Move `value` into the storage at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator (or a clone) and
    /// must not hold a live value.
    unsafe fn construct(&self, ptr: NonNull<T>, value: T) {
        // SAFETY: caller guarantees `ptr` is valid, aligned and vacant.
        unsafe { ptr.as_ptr().write(value) }
    }

    /// Run the destructor of the value at `ptr` without releasing storage.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live value that is not used afterwards.
    unsafe fn destroy(&self, ptr: NonNull<T>) {
        // SAFETY: caller guarantees `ptr` holds a live, unaliased value.
        unsafe { ptr::drop_in_place(ptr.as_ptr()) }
    }
}

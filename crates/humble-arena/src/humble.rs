//! Typed, shareable allocator handle over a [`MemoryBlock`].
//!
//! [`HumbleAllocator<T, N>`] is what containers hold. It creates its block
//! lazily on the first `allocate`, sized for exactly `N` values of `T`, and
//! shares it with every clone through an `Arc`. The block is torn down when
//! the last handle referencing it is dropped.
//!
//! Each value takes [`BlockConfig::element_stride`] bytes, so zero-sized
//! types count against `N` like any other.
//!
//! # Sharing policy
//!
//! Clones share; rebinding and container copies start fresh. Capacity is
//! never reclaimed while any handle keeps the block alive: a block that
//! has served `N` values refuses further requests even if every value has
//! since been deallocated.

#![allow(unsafe_code)]

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use humble_core::{AllocError, BlockId, ElementAllocator};

use crate::block::MemoryBlock;
use crate::config::BlockConfig;
use crate::stats::BlockStats;
use crate::upstream::Upstream;

/// Allocator handle for up to `N` values of `T` from one shared block.
///
/// Handles are cheap to clone and `Send + Sync`; clones of an instantiated
/// handle may be moved to other threads and allocate concurrently from the
/// same block.
pub struct HumbleAllocator<T, const N: usize> {
    block: Option<Arc<MemoryBlock>>,
    /// Where a block created by this handle gets its storage.
    upstream: Option<Upstream>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, const N: usize> HumbleAllocator<T, N> {
    /// Declared element capacity.
    pub const CAPACITY: usize = N;

    /// An unassociated handle. No storage is acquired until first use.
    pub const fn new() -> Self {
        Self {
            block: None,
            upstream: None,
            _marker: PhantomData,
        }
    }

    /// An unassociated handle whose block will be carved from `upstream`.
    ///
    /// Rebound handles and container copies inherit the upstream.
    pub fn with_upstream(upstream: Upstream) -> Self {
        Self {
            block: None,
            upstream: Some(upstream),
            _marker: PhantomData,
        }
    }

    /// The upstream a new block would be taken from, if not the global
    /// allocator.
    pub fn upstream(&self) -> Option<&Upstream> {
        self.upstream.as_ref()
    }

    /// Block configuration for `N` values of `T`.
    pub fn block_config() -> Result<BlockConfig, AllocError> {
        BlockConfig::for_elements::<T>(N)
    }

    /// The referenced block, creating it if this handle has none yet.
    ///
    /// Calling this before cloning lets every clone share one block from
    /// the start.
    pub fn instantiate(&mut self) -> Result<&MemoryBlock, AllocError> {
        let block = match self.block.take() {
            Some(block) => block,
            None => {
                let config = Self::block_config()?;
                let block = match &self.upstream {
                    Some(upstream) => MemoryBlock::new_in(config, Arc::clone(upstream))?,
                    None => MemoryBlock::new(config)?,
                };
                Arc::new(block)
            }
        };
        Ok(&**self.block.insert(block))
    }

    /// Whether a block is referenced.
    pub fn is_instantiated(&self) -> bool {
        self.block.is_some()
    }

    /// The referenced block, if any.
    pub fn block(&self) -> Option<&MemoryBlock> {
        self.block.as_deref()
    }

    /// Identity of the referenced block, if any.
    pub fn block_id(&self) -> Option<BlockId> {
        self.block().map(MemoryBlock::id)
    }

    /// Number of handles referencing this handle's block (0 if none).
    pub fn share_count(&self) -> usize {
        self.block.as_ref().map_or(0, Arc::strong_count)
    }

    /// Occupied bytes in the referenced block (0 if none).
    pub fn size(&self) -> usize {
        self.block().map_or(0, MemoryBlock::size)
    }

    /// Counters of the referenced block, if any.
    pub fn stats(&self) -> Option<BlockStats> {
        self.block().map(MemoryBlock::stats)
    }

    /// Whether `n` values at `ptr` lie inside the referenced block.
    pub fn owns(&self, ptr: NonNull<T>, n: usize) -> bool {
        let Some(bytes) = Self::bytes_for(n) else {
            return false;
        };
        self.block()
            .is_some_and(|block| block.contains(ptr.as_ptr().cast_const().cast(), bytes))
    }

    /// Move the block reference out, leaving this handle unassociated.
    ///
    /// The share count is unchanged: the reference is transferred, not
    /// copied.
    pub fn take(&mut self) -> Self {
        Self {
            block: self.block.take(),
            upstream: self.upstream.clone(),
            _marker: PhantomData,
        }
    }

    /// Return `n` values' worth of storage at `ptr` to the block.
    ///
    /// Never dereferences `ptr`, so foreign or stale pointers are safe to
    /// pass and are reported as [`AllocError::OutOfRange`]. Released bytes
    /// are not reused.
    pub fn release(&self, ptr: NonNull<T>, n: usize) -> Result<(), AllocError> {
        let address = ptr.as_ptr() as usize;
        let out_of_range = |len| AllocError::OutOfRange { address, len };
        let bytes = Self::bytes_for(n).ok_or_else(|| out_of_range(usize::MAX))?;
        let Some(block) = self.block() else {
            return Err(out_of_range(bytes));
        };
        if block.deallocate(ptr.cast(), bytes) {
            Ok(())
        } else {
            Err(out_of_range(bytes))
        }
    }
}

impl<T, const N: usize> HumbleAllocator<T, N> {
    fn bytes_for(n: usize) -> Option<usize> {
        n.checked_mul(BlockConfig::element_stride::<T>())
    }

    fn fresh<U>(&self) -> HumbleAllocator<U, N> {
        HumbleAllocator {
            block: None,
            upstream: self.upstream.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, const N: usize> Default for HumbleAllocator<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Clone for HumbleAllocator<T, N> {
    /// Share the referenced block (if any).
    fn clone(&self) -> Self {
        Self {
            block: self.block.clone(),
            upstream: self.upstream.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, const N: usize> fmt::Debug for HumbleAllocator<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HumbleAllocator")
            .field("capacity", &N)
            .field("block", &self.block_id())
            .finish()
    }
}

/// Handles are equal iff both reference the same live block. Handles of
/// different element type or capacity are never equal, and neither are two
/// unassociated handles.
impl<T: 'static, U: 'static, const N: usize, const M: usize> PartialEq<HumbleAllocator<U, M>>
    for HumbleAllocator<T, N>
{
    fn eq(&self, other: &HumbleAllocator<U, M>) -> bool {
        if N != M || TypeId::of::<T>() != TypeId::of::<U>() {
            return false;
        }
        match (&self.block, &other.block) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// SAFETY: pointers come from a block sized and aligned for `T` (see
// `BlockConfig::for_elements`); every request is a multiple of
// the element stride so bumps stay aligned, and the bump cursor never hands
// out a byte twice. The `Arc` keeps the storage alive for every clone.
unsafe impl<T, const N: usize> ElementAllocator<T> for HumbleAllocator<T, N> {
    type Rebind<U> = HumbleAllocator<U, N>;

    fn allocate(&mut self, n: usize) -> Result<NonNull<T>, AllocError> {
        let bytes = Self::bytes_for(n).ok_or(AllocError::OutOfMemory {
            requested: usize::MAX,
            available: self.block().map_or(0, MemoryBlock::remaining),
        })?;
        let block = self.instantiate()?;
        match block.allocate(bytes) {
            Some(ptr) => Ok(ptr.cast()),
            None => Err(AllocError::OutOfMemory {
                requested: bytes,
                available: block.remaining(),
            }),
        }
    }

    unsafe fn deallocate(&mut self, ptr: NonNull<T>, n: usize) -> Result<(), AllocError> {
        self.release(ptr, n)
    }

    fn max_size(&self) -> usize {
        N
    }

    fn rebind<U>(&self) -> HumbleAllocator<U, N> {
        self.fresh()
    }

    fn for_container_copy(&self) -> Self {
        self.fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    type Alloc = HumbleAllocator<i32, 10>;

    #[test]
    fn lazily_instantiated() {
        let mut a = Alloc::new();
        assert!(!a.is_instantiated());
        assert_eq!(a.share_count(), 0);
        let p = a.allocate(1).unwrap();
        assert!(a.is_instantiated());
        assert!(a.owns(p, 1));
        assert_eq!(a.size(), mem::size_of::<i32>());
    }

    #[test]
    fn block_sized_for_declared_capacity() {
        let mut a = Alloc::new();
        a.allocate(1).unwrap();
        assert_eq!(a.block().unwrap().capacity(), 10 * mem::size_of::<i32>());
        assert_eq!(a.max_size(), 10);
    }

    #[test]
    fn eleventh_element_is_out_of_memory() {
        let mut a = Alloc::new();
        for _ in 0..10 {
            a.allocate(1).unwrap();
        }
        let err = a.allocate(1).unwrap_err();
        assert_eq!(
            err,
            AllocError::OutOfMemory {
                requested: 4,
                available: 0
            }
        );
    }

    #[test]
    fn request_larger_than_capacity_fails() {
        let mut a = Alloc::new();
        assert!(a.allocate(11).unwrap_err().is_out_of_memory());
        // The failed request did not consume anything.
        assert!(a.allocate(10).is_ok());
    }

    #[test]
    fn freed_element_is_forfeited() {
        let mut a = Alloc::new();
        let ptrs: Vec<_> = (0..10).map(|_| a.allocate(1).unwrap()).collect();
        unsafe { a.deallocate(ptrs[3], 1) }.unwrap();
        assert!(a.allocate(1).unwrap_err().is_out_of_memory());

        for (i, &p) in ptrs.iter().enumerate() {
            if i != 3 {
                unsafe { a.deallocate(p, 1) }.unwrap();
            }
        }
        // Empty, but the block is still referenced: no reclaim.
        assert!(a.block().unwrap().is_empty());
        assert!(a.allocate(1).unwrap_err().is_out_of_memory());
    }

    #[test]
    fn clone_shares_block() {
        let mut a = Alloc::new();
        a.instantiate().unwrap();
        let b = a.clone();
        assert_eq!(a.share_count(), 2);
        assert_eq!(a.block_id(), b.block_id());
        assert!(a == b);
        drop(b);
        assert_eq!(a.share_count(), 1);
    }

    #[test]
    fn clones_draw_from_one_capacity() {
        let mut a = Alloc::new();
        a.instantiate().unwrap();
        let mut b = a.clone();
        for _ in 0..5 {
            a.allocate(1).unwrap();
            b.allocate(1).unwrap();
        }
        assert!(a.allocate(1).is_err());
        assert!(b.allocate(1).is_err());
    }

    #[test]
    fn clone_of_unassociated_handle_is_independent() {
        let mut a = Alloc::new();
        let mut b = a.clone();
        a.allocate(1).unwrap();
        b.allocate(1).unwrap();
        assert_ne!(a.block_id(), b.block_id());
        assert!(a != b);
    }

    #[test]
    fn fresh_handles_never_equal() {
        let a = Alloc::new();
        let b = Alloc::new();
        assert!(a != b);
        assert!(a != a.clone());
    }

    #[test]
    fn different_types_or_capacities_never_equal() {
        let mut a = Alloc::new();
        a.instantiate().unwrap();
        let other_type: HumbleAllocator<u32, 10> = a.rebind();
        let other_cap = HumbleAllocator::<i32, 11>::new();
        assert!(a != other_type);
        assert!(a != other_cap);
    }

    #[test]
    fn take_transfers_without_touching_count() {
        let mut a = Alloc::new();
        a.instantiate().unwrap();
        let id = a.block_id();
        let b = a.take();
        assert!(!a.is_instantiated());
        assert_eq!(b.block_id(), id);
        assert_eq!(b.share_count(), 1);
    }

    #[test]
    fn rebind_is_fresh() {
        let mut a = Alloc::new();
        a.allocate(1).unwrap();
        let r: HumbleAllocator<u64, 10> = a.rebind();
        assert!(!r.is_instantiated());
        assert_eq!(r.max_size(), 10);
    }

    #[test]
    fn container_copy_is_fresh() {
        let mut a = Alloc::new();
        a.instantiate().unwrap();
        let c = a.for_container_copy();
        assert!(!c.is_instantiated());
        assert_eq!(a.share_count(), 1);
    }

    #[test]
    fn deallocate_without_block_is_out_of_range() {
        let mut a = Alloc::new();
        let mut x = 5i32;
        let err = a.release(NonNull::from(&mut x), 1).unwrap_err();
        assert!(err.is_out_of_range());
    }

    #[test]
    fn deallocate_foreign_pointer_is_out_of_range() {
        let mut a = Alloc::new();
        let mut b = Alloc::new();
        a.allocate(1).unwrap();
        let foreign = b.allocate(1).unwrap();
        assert!(!a.owns(foreign, 1));
        let err = a.release(foreign, 1).unwrap_err();
        assert_eq!(
            err,
            AllocError::OutOfRange {
                address: foreign.as_ptr() as usize,
                len: 4
            }
        );
        assert_eq!(a.stats().unwrap().rejected_deallocations, 1);
    }

    #[test]
    fn construct_and_destroy_in_place() {
        let mut a: HumbleAllocator<String, 2> = HumbleAllocator::new();
        let p = a.allocate(1).unwrap();
        unsafe {
            a.construct(p, String::from("humble"));
            assert_eq!(p.as_ref(), "humble");
            a.destroy(p);
            a.deallocate(p, 1).unwrap();
        }
        assert_eq!(a.size(), 0);
    }

    #[test]
    fn pointers_are_aligned_and_disjoint() {
        let mut a: HumbleAllocator<u64, 8> = HumbleAllocator::new();
        let p1 = a.allocate(3).unwrap();
        let p2 = a.allocate(5).unwrap();
        assert_eq!(p1.as_ptr() as usize % mem::align_of::<u64>(), 0);
        assert_eq!(p2.as_ptr() as usize - p1.as_ptr() as usize, 3 * 8);
    }

    #[test]
    fn zero_sized_elements_count_against_capacity() {
        let mut a: HumbleAllocator<(), 4> = HumbleAllocator::new();
        let ptrs: Vec<_> = (0..4).map(|_| a.allocate(1).unwrap()).collect();
        assert!(a.allocate(1).unwrap_err().is_out_of_memory());

        let mut addresses: Vec<_> = ptrs.iter().map(|p| p.as_ptr() as usize).collect();
        addresses.dedup();
        assert_eq!(addresses.len(), 4);

        unsafe { a.deallocate(ptrs[0], 1) }.unwrap();
        assert!(a.allocate(1).is_err());
    }

    #[test]
    fn oversized_zero_sized_request_is_refused() {
        let mut a: HumbleAllocator<(), 4> = HumbleAllocator::new();
        assert!(a.allocate(5).unwrap_err().is_out_of_memory());
        assert!(a.allocate(4).is_ok());
    }

    #[test]
    fn over_aligned_zero_sized_elements_stay_aligned() {
        let mut a: HumbleAllocator<[u64; 0], 3> = HumbleAllocator::new();
        let p1 = a.allocate(1).unwrap();
        let p2 = a.allocate(2).unwrap();
        assert_eq!(p1.as_ptr() as usize % mem::align_of::<u64>(), 0);
        assert_eq!(p2.as_ptr() as usize - p1.as_ptr() as usize, mem::align_of::<u64>());
        assert!(a.allocate(1).is_err());
    }

    #[test]
    fn upstream_supplies_the_block_and_propagates() {
        let upstream = Arc::new(humble_test_utils::CountingUpstream::default());
        let mut a: Alloc = HumbleAllocator::with_upstream(upstream.clone());
        a.allocate(1).unwrap();
        assert_eq!(upstream.allocations(), 1);
        assert_eq!(upstream.bytes_requested(), 10 * mem::size_of::<i32>());

        let mut rebound: HumbleAllocator<u8, 10> = a.rebind();
        assert!(rebound.upstream().is_some());
        rebound.allocate(1).unwrap();
        let mut copy = a.for_container_copy();
        copy.allocate(1).unwrap();
        assert_eq!(upstream.allocations(), 3);

        drop((a, rebound, copy));
        assert_eq!(upstream.deallocations(), 3);
    }

    #[test]
    fn handle_is_send_and_sync() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<HumbleAllocator<*mut u8, 4>>();
        assert_send_sync::<MemoryBlock>();
    }
}

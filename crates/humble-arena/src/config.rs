//! Memory block configuration parameters.

use std::alloc::Layout;
use std::mem;

use humble_core::AllocError;

/// Configuration for a single [`MemoryBlock`](crate::MemoryBlock).
///
/// Adapters derive this from their compile-time element type and count;
/// direct block users build it by hand. Validated into a [`Layout`] when
/// the block is created; immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockConfig {
    /// Capacity of the block in bytes. Zero is allowed and yields a block
    /// that only serves zero-byte requests.
    pub bytes: usize,

    /// Alignment of the block's first byte. Must be a power of two.
    ///
    /// Default: [`BlockConfig::MIN_ALIGN`]. Adapters use `align_of::<T>()`
    /// so every element-sized bump stays aligned.
    pub align: usize,
}

impl BlockConfig {
    /// Smallest permitted alignment.
    pub const MIN_ALIGN: usize = 1;

    /// A byte-aligned block of `bytes` capacity.
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes,
            align: Self::MIN_ALIGN,
        }
    }

    /// Override the alignment.
    pub fn with_align(mut self, align: usize) -> Self {
        self.align = align;
        self
    }

    /// Bytes one value of `T` occupies in a block.
    ///
    /// This is `size_of::<T>()`, except that zero-sized types take one
    /// alignment unit so that every value still consumes capacity and gets
    /// a distinct, aligned address.
    pub fn element_stride<T>() -> usize {
        match mem::size_of::<T>() {
            0 => mem::align_of::<T>(),
            size => size,
        }
    }

    /// A block holding exactly `count` values of `T`.
    ///
    /// Fails with [`AllocError::OutOfMemory`] if `count` times the
    /// [element stride](Self::element_stride) overflows.
    pub fn for_elements<T>(count: usize) -> Result<Self, AllocError> {
        let bytes = count
            .checked_mul(Self::element_stride::<T>())
            .ok_or(AllocError::OutOfMemory {
                requested: usize::MAX,
                available: 0,
            })?;
        Ok(Self::new(bytes).with_align(mem::align_of::<T>()))
    }

    /// Validate into a [`Layout`].
    ///
    /// A non-power-of-two alignment or a size that overflows `isize` once
    /// rounded up is reported as [`AllocError::OutOfMemory`]: no storage
    /// can ever be obtained for it.
    pub fn layout(&self) -> Result<Layout, AllocError> {
        Layout::from_size_align(self.bytes, self.align).map_err(|_| AllocError::OutOfMemory {
            requested: self.bytes,
            available: 0,
        })
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

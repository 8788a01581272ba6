//! Fixed-capacity block allocation for Humble containers.
//!
//! Provides a thread-safe bump-allocated [`MemoryBlock`] and the typed
//! [`HumbleAllocator`] handle that containers hold. `unsafe` code is
//! confined to the modules that opt in with `#![allow(unsafe_code)]`.
//!
//! # Architecture
//!
//! ```text
//! HumbleAllocator<T, N> (per container, cheap to clone)
//! └── Option<Arc<MemoryBlock>> (created on first allocate, shared by clones)
//!     ├── storage: N * stride(T) bytes, aligned for T, from an upstream
//!     ├── Mutex<cursor> (high-water mark, only moves forward)
//!     ├── occupied: AtomicUsize
//!     └── BlockCounters (allocation / deallocation events)
//! ```
//!
//! # Capacity
//!
//! A block never grows and never reuses released bytes. Once `N` values
//! have been handed out, further requests fail with
//! [`AllocError::OutOfMemory`] until every handle referencing the block is
//! dropped and a fresh handle starts a new block.
//!
//! ```rust
//! use humble_arena::HumbleAllocator;
//! use humble_core::ElementAllocator;
//!
//! let mut alloc = HumbleAllocator::<u32, 2>::new();
//! let a = alloc.allocate(1).unwrap();
//! let _b = alloc.allocate(1).unwrap();
//! unsafe { alloc.deallocate(a, 1).unwrap() };
//! assert!(alloc.allocate(1).unwrap_err().is_out_of_memory());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod block;
pub mod config;
pub mod heap;
pub mod humble;
pub mod stats;
pub mod upstream;

// Public re-exports for the primary API surface.
pub use block::MemoryBlock;
pub use config::BlockConfig;
pub use heap::HeapAllocator;
pub use humble::HumbleAllocator;
pub use humble_core::AllocError;
pub use stats::BlockStats;
pub use upstream::{GlobalHeap, Upstream};

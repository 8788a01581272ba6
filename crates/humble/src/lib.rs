//! Humble: fixed-capacity block allocation for containers.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Humble sub-crates. For most users, adding `humble` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use humble::prelude::*;
//!
//! // A list whose nodes come from one block sized for ten nodes.
//! let mut list: ForwardList<u32, HumbleAllocator<u32, 10>> =
//!     ForwardList::new_in(HumbleAllocator::new());
//! for i in 0..10 {
//!     list.push_back(i).unwrap();
//! }
//!
//! // The block never reuses released nodes.
//! list.pop_front();
//! let err = list.push_back(10).unwrap_err();
//! assert!(err.is_out_of_memory());
//!
//! // A copy gets a block of its own.
//! let copy = list.try_clone().unwrap();
//! assert_eq!(list, copy);
//! assert_ne!(list.allocator(), copy.allocator());
//!
//! // Maps count entries the same way; replacing a value needs no room.
//! let mut squares: TreeMap<u32, u32, HumbleAllocator<(u32, u32), 3>> =
//!     TreeMap::new_in(HumbleAllocator::new());
//! for i in 0..3 {
//!     squares.try_insert(i, i * i).unwrap();
//! }
//! assert!(squares.try_insert(3, 9).is_err());
//! assert_eq!(squares.try_insert(2, 5), Ok(Some(4)));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `humble-core` | Errors, block IDs, the `ElementAllocator` contract |
//! | [`arena`] | `humble-arena` | Memory blocks, block configuration, allocator handles |
//! | [`list`] | `humble-list` | Singly-linked list generic over allocators |
//! | [`tree`] | `humble-tree` | Ordered map generic over allocators |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Memory blocks and allocator handles (`humble-arena`).
///
/// [`arena::MemoryBlock`] is the raw byte arena; [`arena::HumbleAllocator`]
/// is the typed handle containers hold.
pub use humble_arena as arena;

/// Core types and the allocator contract (`humble-core`).
///
/// Contains [`types::AllocError`], [`types::BlockId`], and the
/// [`types::ElementAllocator`] trait.
pub use humble_core as types;

/// Allocator-generic singly-linked list (`humble-list`).
pub use humble_list as list;

/// Allocator-generic ordered map (`humble-tree`).
pub use humble_tree as tree;

/// Common imports for typical Humble usage.
///
/// ```rust
/// use humble::prelude::*;
/// ```
pub mod prelude {
    // Allocators
    pub use humble_arena::{
        BlockConfig, BlockStats, GlobalHeap, HeapAllocator, HumbleAllocator, MemoryBlock, Upstream,
    };

    // Contract and errors
    pub use humble_core::{AllocError, BlockId, ElementAllocator};

    // Containers
    pub use humble_list::ForwardList;
    pub use humble_tree::TreeMap;
}

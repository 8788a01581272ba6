//! Ordered map generic over element allocators.
//!
//! [`TreeMap`] keeps its entries in a balanced binary search tree (an AA
//! tree) and, like `humble_list::ForwardList`, is a plain
//! client of the [`ElementAllocator`](humble_core::ElementAllocator)
//! contract. Each entry lives in one [`TreeNode`] obtained with
//! `allocate(1)`, so a [`HumbleAllocator`](humble_arena::HumbleAllocator)
//! with capacity `N` holds at most `N` entries over its lifetime.
//!
//! Replacing the value of an existing key never allocates.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod iter;
pub mod map;

pub use iter::{IntoIter, Iter, IterMut, Keys, Values};
pub use map::{TreeMap, TreeNode};

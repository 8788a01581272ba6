//! Singly-linked list generic over element allocators.
//!
//! [`ForwardList`] is a plain client of the
//! [`ElementAllocator`](humble_core::ElementAllocator) contract: every node
//! is obtained with `allocate(1)`, filled with `construct`, and returned
//! with `destroy` + `deallocate(1)`. It has no knowledge of how the
//! allocator manages memory, so it runs equally on the global heap
//! ([`HeapAllocator`](humble_arena::HeapAllocator), the default) or on a
//! fixed-capacity [`HumbleAllocator`](humble_arena::HumbleAllocator).
//!
//! The end of the chain is an explicit `None` link; there is no
//! self-referential sentinel node.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod iter;
pub mod list;

pub use iter::{IntoIter, Iter, IterMut};
pub use list::{ForwardList, Node};

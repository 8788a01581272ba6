//! Core types and traits for the Humble block allocator.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the allocator and its consumers: block identity,
//! the allocation error taxonomy, and the [`ElementAllocator`] capability
//! trait that containers are written against.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod error;
pub mod id;
pub mod traits;

pub use error::AllocError;
pub use id::BlockId;
pub use traits::ElementAllocator;

//! Test utilities and fixture types for Humble development.
//!
//! Provides values that report their own lifecycle ([`Tracked`]), a
//! non-clonable payload ([`Unclonable`]), an allocator wrapper that counts
//! contract calls ([`CountingAllocator`]), an upstream that counts block
//! regions ([`CountingUpstream`]), log capture ([`capture_logs`]), and
//! address-range assertions.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod counting;
pub mod fixtures;
pub mod logs;

pub use counting::{CallCounts, CountingAllocator, CountingUpstream};
pub use fixtures::{assert_disjoint, Lifecycle, Tracked, Unclonable};
pub use logs::capture_logs;

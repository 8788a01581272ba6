//! Error types for the Humble block allocator.
//!
//! Two conditions exist and both are terminal for the failing call:
//! running out of capacity and releasing memory the allocator does not own.

use std::error::Error;
use std::fmt;

/// Errors from allocation and deallocation requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// Backing storage could not be obtained, or a bump request does not
    /// fit in the block's remaining capacity. Never retried and never
    /// partially satisfied.
    OutOfMemory {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes that were still available when the request failed.
        available: usize,
    },
    /// A deallocation named an address outside the block's handed-out
    /// range (double free through an unassociated adapter, cross-block
    /// free, or a pointer never returned by this allocator).
    OutOfRange {
        /// The offending address.
        address: usize,
        /// Length of the release in bytes.
        len: usize,
    },
}

impl AllocError {
    /// Whether this is an [`AllocError::OutOfMemory`].
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. })
    }

    /// Whether this is an [`AllocError::OutOfRange`].
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, {available} bytes available"
                )
            }
            Self::OutOfRange { address, len } => {
                write!(
                    f,
                    "deallocation outside the storage: {len} bytes at {address:#x}"
                )
            }
        }
    }
}

impl Error for AllocError {}

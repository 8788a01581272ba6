//! Workloads shared by the Humble benchmarks and demos.
//!
//! - [`factorial_pairs`]: the `(i, i!)` sequence used by the demo
//! - [`fill_list`]: build a list on any allocator, stopping at refusal
//! - [`churn_block`]: deterministic allocate/release cycle on one block

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use humble_arena::MemoryBlock;
use humble_core::{AllocError, ElementAllocator};
use humble_list::ForwardList;

/// Yield `(i, i!)` for `i` in `0..count`.
///
/// Values saturate at `u64::MAX` rather than wrapping.
pub fn factorial_pairs(count: u32) -> impl Iterator<Item = (u32, u64)> {
    (0..count).scan(1u64, |acc, i| {
        if i > 0 {
            *acc = acc.saturating_mul(u64::from(i));
        }
        Some((i, *acc))
    })
}

/// Build a list of `values` on `alloc`.
///
/// Returns the list together with the first refusal, if any; items pushed
/// before the refusal are kept.
pub fn fill_list<T, A, I>(values: I, alloc: A) -> (ForwardList<T, A>, Option<AllocError>)
where
    A: ElementAllocator<T>,
    I: IntoIterator<Item = T>,
{
    let mut list = ForwardList::new_in(alloc);
    let err = list.try_extend(values).err();
    (list, err)
}

/// Allocate `chunk` bytes `rounds` times, releasing every other chunk.
///
/// Returns the number of successful allocations. Stops early once the
/// block refuses.
pub fn churn_block(block: &MemoryBlock, chunk: usize, rounds: usize) -> usize {
    let mut served = 0;
    for round in 0..rounds {
        let Some(ptr) = block.allocate(chunk) else {
            break;
        };
        served += 1;
        if round % 2 == 1 {
            let released = block.deallocate(ptr, chunk);
            debug_assert!(released, "block rejected its own {chunk}-byte chunk");
        }
    }
    served
}

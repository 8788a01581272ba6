//! Reusable element fixtures.
//!
//! - [`Tracked`] counts clones and drops through a shared [`Lifecycle`].
//! - [`Unclonable`] can only be built in place.
//! - [`assert_disjoint`] checks that live address ranges never overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared clone/drop tally for a family of [`Tracked`] values.
#[derive(Debug, Default)]
pub struct Lifecycle {
    clones: AtomicUsize,
    drops: AtomicUsize,
}

impl Lifecycle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clones(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// A value that reports clones and drops to its [`Lifecycle`].
#[derive(Debug)]
pub struct Tracked {
    pub value: i32,
    lifecycle: Arc<Lifecycle>,
}

impl Tracked {
    pub fn new(value: i32, lifecycle: &Arc<Lifecycle>) -> Self {
        Self {
            value,
            lifecycle: Arc::clone(lifecycle),
        }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.lifecycle.clones.fetch_add(1, Ordering::SeqCst);
        Self {
            value: self.value,
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.lifecycle.drops.fetch_add(1, Ordering::SeqCst);
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

/// A payload without `Clone`, for emplace-style construction tests.
#[derive(Debug, PartialEq, Eq)]
pub struct Unclonable {
    pub label: &'static str,
    pub num: usize,
}

impl Unclonable {
    pub fn new(label: &'static str, num: usize) -> Self {
        Self { label, num }
    }
}

/// Panic if any two `(start, len)` byte ranges overlap.
///
/// Zero-length ranges never overlap anything.
pub fn assert_disjoint(ranges: &[(usize, usize)]) {
    let mut sorted: Vec<_> = ranges.iter().copied().filter(|&(_, len)| len > 0).collect();
    sorted.sort_unstable();
    for pair in sorted.windows(2) {
        let (a_start, a_len) = pair[0];
        let (b_start, _) = pair[1];
        assert!(
            a_start + a_len <= b_start,
            "ranges overlap: {a_start:#x}+{a_len} and {b_start:#x}"
        );
    }
}

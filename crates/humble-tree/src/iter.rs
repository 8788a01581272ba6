//! Borrowing and owning iterators over a [`TreeMap`].
//!
//! The borrowing iterators walk the tree in order with an explicit stack of
//! pending ancestors, so no node needs a parent link.

#![allow(unsafe_code)]

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

use humble_core::ElementAllocator;

use crate::map::{Link, TreeMap, TreeNode};

/// In-order walk shared by [`Iter`] and [`IterMut`].
struct Path<K, V> {
    pending: Vec<NonNull<TreeNode<K, V>>>,
    remaining: usize,
}

impl<K, V> Path<K, V> {
    fn new(root: Link<K, V>, len: usize) -> Self {
        let mut path = Self {
            pending: Vec::new(),
            remaining: len,
        };
        path.descend_left(root);
        path
    }

    fn descend_left(&mut self, mut link: Link<K, V>) {
        while let Some(node) = link {
            self.pending.push(node);
            // SAFETY: the map outlives the walk and is not restructured
            // during it.
            link = unsafe { (*node.as_ptr()).left };
        }
    }

    fn advance(&mut self) -> Option<NonNull<TreeNode<K, V>>> {
        let node = self.pending.pop()?;
        // SAFETY: as `descend_left`.
        self.descend_left(unsafe { (*node.as_ptr()).right });
        self.remaining -= 1;
        Some(node)
    }
}

impl<K, V> Clone for Path<K, V> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
            remaining: self.remaining,
        }
    }
}

/// Shared iterator in ascending key order.
pub struct Iter<'a, K, V> {
    path: Path<K, V>,
    _map: PhantomData<&'a TreeNode<K, V>>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: Link<K, V>, len: usize) -> Self {
        Self {
            path: Path::new(root, len),
            _map: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let node = self.path.advance()?;
        // SAFETY: the map is borrowed for `'a`, so its nodes stay live and
        // are not mutated.
        let node = unsafe { &*node.as_ptr() };
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.path.remaining, Some(self.path.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

// SAFETY: behaves like `(&'a K, &'a V)` for every yielded entry.
unsafe impl<K: Sync, V: Sync> Send for Iter<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _map: PhantomData,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator in ascending key order with mutable access to values.
pub struct IterMut<'a, K, V> {
    path: Path<K, V>,
    _map: PhantomData<&'a mut TreeNode<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(root: Link<K, V>, len: usize) -> Self {
        Self {
            path: Path::new(root, len),
            _map: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<(&'a K, &'a mut V)> {
        // The walk reads the node's links before its value is handed out.
        let node = self.path.advance()?;
        // SAFETY: the map is mutably borrowed for `'a` and each node is
        // yielded at most once.
        let node = unsafe { &mut *node.as_ptr() };
        Some((&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.path.remaining, Some(self.path.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

// SAFETY: behaves like `(&'a K, &'a mut V)` for every yielded entry.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

/// Keys in ascending order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Values in ascending key order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Owning iterator in ascending key order; each entry is moved out and its
/// node returned to the allocator as it is yielded.
pub struct IntoIter<K, V, A: ElementAllocator<(K, V)>> {
    map: TreeMap<K, V, A>,
}

impl<K, V, A: ElementAllocator<(K, V)>> IntoIter<K, V, A> {
    pub(crate) fn new(map: TreeMap<K, V, A>) -> Self {
        Self { map }
    }
}

impl<K, V, A: ElementAllocator<(K, V)>> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.map.pop_first()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.map.len(), Some(self.map.len()))
    }
}

impl<K, V, A: ElementAllocator<(K, V)>> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.map.pop_last()
    }
}

impl<K, V, A: ElementAllocator<(K, V)>> ExactSizeIterator for IntoIter<K, V, A> {}
impl<K, V, A: ElementAllocator<(K, V)>> FusedIterator for IntoIter<K, V, A> {}

impl<K: fmt::Debug, V: fmt::Debug, A: ElementAllocator<(K, V)>> fmt::Debug for IntoIter<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.map).finish()
    }
}

//! The map container and its balancing routines.

#![allow(unsafe_code)]

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use humble_arena::HeapAllocator;
use humble_core::{AllocError, ElementAllocator};

use crate::iter::{IntoIter, Iter, IterMut, Keys, Values};

pub(crate) type Link<K, V> = Option<NonNull<TreeNode<K, V>>>;

/// One map entry. Opaque; exposed only so allocator types can be named
/// (e.g. `HumbleAllocator<TreeNode<u32, u64>, 10>`).
pub struct TreeNode<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    level: usize,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
}

/// An ordered map whose nodes come from `A`.
///
/// The map holds `A` rebound to [`TreeNode<K, V>`], so the capacity of a
/// fixed-size allocator counts entries. Lookup, insertion and removal are
/// O(log n).
///
/// Moving a map (including [`std::mem::take`]) transfers its tree in O(1)
/// without touching entries or the allocator.
pub struct TreeMap<K, V, A: ElementAllocator<(K, V)> = HeapAllocator<(K, V)>> {
    root: Link<K, V>,
    len: usize,
    alloc: A::Rebind<TreeNode<K, V>>,
    _owns: PhantomData<Box<TreeNode<K, V>>>,
}

// SAFETY: the map exclusively owns its nodes; sending it sends the entries
// and the allocator handle.
unsafe impl<K: Send, V: Send, A: ElementAllocator<(K, V)>> Send for TreeMap<K, V, A> where
    A::Rebind<TreeNode<K, V>>: Send
{
}

// SAFETY: shared access only hands out `&K` and `&V`.
unsafe impl<K: Sync, V: Sync, A: ElementAllocator<(K, V)>> Sync for TreeMap<K, V, A> where
    A::Rebind<TreeNode<K, V>>: Sync
{
}

impl<K, V> TreeMap<K, V> {
    /// An empty map on the global heap.
    pub fn new() -> Self {
        Self::new_in(HeapAllocator::new())
    }
}

impl<K, V, A: ElementAllocator<(K, V)>> TreeMap<K, V, A> {
    /// An empty map whose nodes come from `alloc` rebound to
    /// [`TreeNode<K, V>`].
    pub fn new_in(alloc: A) -> Self {
        Self::with_node_allocator(alloc.rebind())
    }

    /// An empty map using an already node-typed allocator as is.
    pub fn with_node_allocator(alloc: A::Rebind<TreeNode<K, V>>) -> Self {
        Self {
            root: None,
            len: 0,
            alloc,
            _owns: PhantomData,
        }
    }

    /// An empty map sharing this map's node allocator (a clone of it).
    pub fn new_sharing(&self) -> Self {
        Self::with_node_allocator(self.alloc.clone())
    }

    /// The node allocator.
    pub fn allocator(&self) -> &A::Rebind<TreeNode<K, V>> {
        &self.alloc
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Node capacity reported by the allocator.
    pub fn max_size(&self) -> usize {
        self.alloc.max_size()
    }

    /// Entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut node = self.root?;
        // SAFETY: linked nodes are live and owned by `self`.
        unsafe {
            while let Some(left) = (*node.as_ptr()).left {
                node = left;
            }
            let node = &*node.as_ptr();
            Some((&node.key, &node.value))
        }
    }

    /// Entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut node = self.root?;
        // SAFETY: linked nodes are live and owned by `self`.
        unsafe {
            while let Some(right) = (*node.as_ptr()).right {
                node = right;
            }
            let node = &*node.as_ptr();
            Some((&node.key, &node.value))
        }
    }

    /// Remove and return the entry with the smallest key.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.remove_where(|node| match node.left {
            Some(_) => Ordering::Less,
            None => Ordering::Equal,
        })
    }

    /// Remove and return the entry with the largest key.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.remove_where(|node| match node.right {
            Some(_) => Ordering::Greater,
            None => Ordering::Equal,
        })
    }

    /// Destroy every entry and return all nodes to the allocator.
    pub fn clear(&mut self) {
        let mut pending: Vec<NonNull<TreeNode<K, V>>> = self.root.take().into_iter().collect();
        self.len = 0;
        while let Some(node) = pending.pop() {
            // SAFETY: `node` is live and unreachable from `self`; its links
            // are read before it is destroyed and it is never touched again.
            unsafe {
                let links = &*node.as_ptr();
                pending.extend(links.left);
                pending.extend(links.right);
                self.alloc.destroy(node);
            }
            self.return_storage(node);
        }
    }

    /// Iterate in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root, self.len)
    }

    /// Iterate in ascending key order with mutable access to values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.root, self.len)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Values in ascending key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    fn remove_where<F>(&mut self, mut direction: F) -> Option<(K, V)>
    where
        F: FnMut(&TreeNode<K, V>) -> Ordering,
    {
        let mut removed = None;
        // SAFETY: `root` and every node below it are live and owned by
        // `self`; the unlinked node is handed back through `removed`.
        self.root = unsafe { remove_node(self.root, &mut direction, &mut removed) };
        let node = removed?;
        self.len -= 1;
        // SAFETY: `node` is unlinked; reading moves the entry out and the
        // storage is not read again.
        let TreeNode { key, value, .. } = unsafe { node.as_ptr().read() };
        self.return_storage(node);
        Some((key, value))
    }

    fn return_storage(&mut self, node: NonNull<TreeNode<K, V>>) {
        // SAFETY: `node` came from `self.alloc.allocate(1)` and holds no
        // live entry any more.
        if let Err(err) = unsafe { self.alloc.deallocate(node, 1) } {
            tracing::warn!(%err, len = self.len, "map node rejected by its allocator");
        }
    }

    fn find<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = self.root;
        while let Some(node) = cursor {
            // SAFETY: linked nodes are live and owned by `self`.
            let node_ref = unsafe { &*node.as_ptr() };
            cursor = match key.cmp(node_ref.key.borrow()) {
                Ordering::Less => node_ref.left,
                Ordering::Greater => node_ref.right,
                Ordering::Equal => return Some(node),
            };
        }
        None
    }
}

impl<K: Ord, V, A: ElementAllocator<(K, V)>> TreeMap<K, V, A> {
    /// Build a map from `iter`, allocating from `alloc`.
    ///
    /// Later duplicates replace earlier values.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> Result<Self, AllocError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new_in(alloc);
        map.try_extend(iter)?;
        Ok(map)
    }

    /// Insert `value` under `key`.
    ///
    /// Returns the previous value if the key was present; that case only
    /// swaps the value and never asks the allocator for storage. A refused
    /// allocation drops `key` and `value` and leaves the map unchanged.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, AllocError> {
        if let Some(slot) = self.get_mut(&key) {
            return Ok(Some(mem::replace(slot, value)));
        }
        let node = self.alloc.allocate(1)?;
        let fresh = TreeNode {
            key,
            value,
            level: 1,
            left: None,
            right: None,
        };
        // SAFETY: `node` is fresh storage for one `TreeNode`; once
        // constructed it is linked under the root exactly once.
        unsafe {
            self.alloc.construct(node, fresh);
            self.root = Some(insert_node(self.root, node));
        }
        self.len += 1;
        Ok(None)
    }

    /// Insert every pair of `iter`, stopping at the first refusal.
    ///
    /// Pairs inserted before the failure stay in the map.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<(), AllocError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in iter {
            self.try_insert(key, value)?;
        }
        Ok(())
    }

    /// Value stored under `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // SAFETY: found nodes are live and owned by `self`.
        self.find(key).map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Value stored under `key`, mutably.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // SAFETY: as `get`; `&mut self` makes the borrow unique.
        self.find(key).map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|node| {
            // SAFETY: found nodes are live and owned by `self`.
            let node = unsafe { &*node.as_ptr() };
            (&node.key, &node.value)
        })
    }

    /// Whether `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Remove `key`, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove `key`, returning the stored key and its value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_where(|node| key.cmp(node.key.borrow()))
    }

    /// Copy every entry into a new map that uses
    /// [`for_container_copy`](ElementAllocator::for_container_copy) of this
    /// map's allocator.
    pub fn try_clone(&self) -> Result<Self, AllocError>
    where
        K: Clone,
        V: Clone,
    {
        let mut map = Self::with_node_allocator(self.alloc.for_container_copy());
        map.try_extend(self.iter().map(|(k, v)| (k.clone(), v.clone())))?;
        Ok(map)
    }

    /// Copy every entry into a new map allocating from `alloc`.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError>
    where
        K: Clone,
        V: Clone,
    {
        Self::try_from_iter_in(self.iter().map(|(k, v)| (k.clone(), v.clone())), alloc)
    }
}

fn level<K, V>(link: Link<K, V>) -> usize {
    // SAFETY: callers only pass links into a live tree.
    link.map_or(0, |node| unsafe { (*node.as_ptr()).level })
}

/// Rotate right when the left child sits on the same level.
///
/// # Safety
///
/// `link` and everything below it must be live nodes of one tree.
unsafe fn skew<K, V>(link: Link<K, V>) -> Link<K, V> {
    let node = link?;
    // SAFETY: caller guarantees the subtree is live.
    let top = unsafe { &mut *node.as_ptr() };
    match top.left {
        Some(left) if level(Some(left)) == top.level => {
            // SAFETY: `left` is a live child, distinct from `node`.
            let pivot = unsafe { &mut *left.as_ptr() };
            top.left = pivot.right;
            pivot.right = Some(node);
            Some(left)
        }
        _ => Some(node),
    }
}

/// Rotate left and raise the pivot when two right links share a level.
///
/// # Safety
///
/// As [`skew`].
unsafe fn split<K, V>(link: Link<K, V>) -> Link<K, V> {
    let node = link?;
    // SAFETY: caller guarantees the subtree is live.
    let top = unsafe { &mut *node.as_ptr() };
    let Some(right) = top.right else {
        return Some(node);
    };
    // SAFETY: `right` is a live child, distinct from `node`.
    let pivot = unsafe { &mut *right.as_ptr() };
    if level(pivot.right) == top.level {
        top.right = pivot.left;
        pivot.left = Some(node);
        pivot.level += 1;
        Some(right)
    } else {
        Some(node)
    }
}

/// Link `fresh` (a constructed, unlinked level-1 node) below `link` and
/// return the new subtree root. The key must not already be present.
///
/// # Safety
///
/// As [`skew`]; `fresh` must not be reachable from `link`.
unsafe fn insert_node<K: Ord, V>(link: Link<K, V>, fresh: NonNull<TreeNode<K, V>>) -> NonNull<TreeNode<K, V>> {
    let Some(node) = link else {
        return fresh;
    };
    // SAFETY: caller guarantees both nodes are live and distinct.
    unsafe {
        let top = &mut *node.as_ptr();
        if (*fresh.as_ptr()).key < top.key {
            top.left = Some(insert_node(top.left, fresh));
        } else {
            top.right = Some(insert_node(top.right, fresh));
        }
        match split(skew(Some(node))) {
            Some(root) => root,
            None => node,
        }
    }
}

/// Unlink the node `direction` leads to and rebalance on the way up.
///
/// `direction` answers where the wanted entry lies relative to a node.
/// An inner match trades its entry with the neighbouring leaf-side node and
/// keeps descending, so the node finally unlinked always has at most one
/// child; it is stored in `removed`.
///
/// # Safety
///
/// As [`skew`].
unsafe fn remove_node<K, V, F>(link: Link<K, V>, direction: &mut F, removed: &mut Link<K, V>) -> Link<K, V>
where
    F: FnMut(&TreeNode<K, V>) -> Ordering,
{
    let node = link?;
    // SAFETY: caller guarantees the subtree is live; children are distinct
    // from `node`.
    unsafe {
        let top = &mut *node.as_ptr();
        match direction(top) {
            Ordering::Less => top.left = remove_node(top.left, direction, removed),
            Ordering::Greater => top.right = remove_node(top.right, direction, removed),
            Ordering::Equal => match (top.left, top.right) {
                (None, None) => {
                    *removed = Some(node);
                    return None;
                }
                (None, Some(right)) => {
                    let next = &mut *leftmost(right).as_ptr();
                    mem::swap(&mut top.key, &mut next.key);
                    mem::swap(&mut top.value, &mut next.value);
                    top.right = remove_node(top.right, direction, removed);
                }
                (Some(left), _) => {
                    let prev = &mut *rightmost(left).as_ptr();
                    mem::swap(&mut top.key, &mut prev.key);
                    mem::swap(&mut top.value, &mut prev.value);
                    top.left = remove_node(top.left, direction, removed);
                }
            },
        }
        rebalance(node)
    }
}

/// # Safety
///
/// As [`skew`].
unsafe fn rebalance<K, V>(node: NonNull<TreeNode<K, V>>) -> Link<K, V> {
    // SAFETY: caller guarantees the subtree is live.
    unsafe {
        let top = &mut *node.as_ptr();
        let expected = level(top.left).min(level(top.right)) + 1;
        if expected < top.level {
            top.level = expected;
            if let Some(right) = top.right {
                let right = &mut *right.as_ptr();
                right.level = right.level.min(expected);
            }
        }

        let node = skew(Some(node))?;
        let top = &mut *node.as_ptr();
        top.right = skew(top.right);
        if let Some(right) = top.right {
            let right = &mut *right.as_ptr();
            right.right = skew(right.right);
        }
        let node = split(Some(node))?;
        let top = &mut *node.as_ptr();
        top.right = split(top.right);
        Some(node)
    }
}

/// # Safety
///
/// `node` and its left spine must be live.
unsafe fn leftmost<K, V>(mut node: NonNull<TreeNode<K, V>>) -> NonNull<TreeNode<K, V>> {
    // SAFETY: caller guarantees the spine is live.
    while let Some(left) = unsafe { (*node.as_ptr()).left } {
        node = left;
    }
    node
}

/// # Safety
///
/// `node` and its right spine must be live.
unsafe fn rightmost<K, V>(mut node: NonNull<TreeNode<K, V>>) -> NonNull<TreeNode<K, V>> {
    // SAFETY: caller guarantees the spine is live.
    while let Some(right) = unsafe { (*node.as_ptr()).right } {
        node = right;
    }
    node
}

impl<K, V, A: ElementAllocator<(K, V)>> Drop for TreeMap<K, V, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, A: ElementAllocator<(K, V)> + Default> Default for TreeMap<K, V, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<K: Ord + Clone, V: Clone, A: ElementAllocator<(K, V)>> Clone for TreeMap<K, V, A> {
    /// # Panics
    ///
    /// Panics if the copy's allocator refuses a node; use
    /// [`TreeMap::try_clone`] to handle that case.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(map) => map,
            Err(err) => panic!("failed to clone map: {err}"),
        }
    }
}

impl<K, V, A, B> PartialEq<TreeMap<K, V, B>> for TreeMap<K, V, A>
where
    K: PartialEq,
    V: PartialEq,
    A: ElementAllocator<(K, V)>,
    B: ElementAllocator<(K, V)>,
{
    fn eq(&self, other: &TreeMap<K, V, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, A: ElementAllocator<(K, V)>> Eq for TreeMap<K, V, A> {}

impl<K: fmt::Debug, V: fmt::Debug, A: ElementAllocator<(K, V)>> fmt::Debug for TreeMap<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, A: ElementAllocator<(K, V)>> IntoIterator for TreeMap<K, V, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> IntoIter<K, V, A> {
        IntoIter::new(self)
    }
}

impl<'a, K, V, A: ElementAllocator<(K, V)>> IntoIterator for &'a TreeMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, A: ElementAllocator<(K, V)>> IntoIterator for &'a mut TreeMap<K, V, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use humble_test_utils::{CountingAllocator, Lifecycle, Tracked};

    fn map_of(keys: &[i32]) -> TreeMap<i32, i32> {
        TreeMap::try_from_iter_in(keys.iter().map(|&k| (k, k * 10)), HeapAllocator::new()).unwrap()
    }

    fn keys<A: ElementAllocator<(i32, i32)>>(map: &TreeMap<i32, i32, A>) -> Vec<i32> {
        map.keys().copied().collect()
    }

    /// Walk the tree checking key order and the AA level rules; returns the
    /// number of nodes.
    fn check_shape<K: Ord, V, A: ElementAllocator<(K, V)>>(map: &TreeMap<K, V, A>) -> usize {
        fn walk<K: Ord, V>(link: Link<K, V>, low: Option<&K>, high: Option<&K>) -> usize {
            let Some(node) = link else { return 0 };
            let node = unsafe { &*node.as_ptr() };
            assert!(low.is_none_or(|low| *low < node.key), "key below its bound");
            assert!(high.is_none_or(|high| node.key < *high), "key above its bound");
            assert_eq!(level(node.left), node.level - 1, "left child one level down");
            let right = level(node.right);
            assert!(right == node.level || right + 1 == node.level, "right child level");
            if let Some(right) = node.right {
                assert!(level(unsafe { (*right.as_ptr()).right }) < node.level, "two right links on one level");
            }
            if node.left.is_none() && node.right.is_none() {
                assert_eq!(node.level, 1, "leaves sit on level one");
            }
            1 + walk(node.left, low, Some(&node.key)) + walk(node.right, Some(&node.key), high)
        }
        walk(map.root, None, None)
    }

    #[test]
    fn starts_empty() {
        let map: TreeMap<i32, i32> = TreeMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.first_key_value(), None);
        assert_eq!(map.iter().next(), None);
    }

    #[test]
    fn iterates_in_key_order() {
        let map = map_of(&[5, 1, 9, 3, 7, 2, 8]);
        assert_eq!(keys(&map), vec![1, 2, 3, 5, 7, 8, 9]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![10, 20, 30, 50, 70, 80, 90]);
        assert_eq!(map.iter().len(), 7);
        assert_eq!(check_shape(&map), 7);
    }

    #[test]
    fn replacing_a_value_keeps_the_node() {
        let alloc = CountingAllocator::new(HeapAllocator::<(i32, i32)>::new());
        let counts = alloc.counts();
        let mut map = TreeMap::new_in(alloc);
        assert_eq!(map.try_insert(4, 40), Ok(None));
        assert_eq!(map.try_insert(4, 41), Ok(Some(40)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&4), Some(&41));
        assert_eq!(counts.allocate(), 1);
    }

    #[test]
    fn lookup_by_borrowed_key() {
        let mut map: TreeMap<String, usize> = TreeMap::new();
        map.try_insert("alpha".to_owned(), 1).unwrap();
        map.try_insert("beta".to_owned(), 2).unwrap();
        assert_eq!(map.get("beta"), Some(&2));
        assert!(map.contains_key("alpha"));
        assert!(!map.contains_key("gamma"));
        *map.get_mut("alpha").unwrap() += 10;
        assert_eq!(map.get_key_value("alpha"), Some((&"alpha".to_owned(), &11)));
        assert_eq!(map.remove("alpha"), Some(11));
        assert_eq!(map.remove("alpha"), None);
    }

    #[test]
    fn removes_leaves_inner_nodes_and_root() {
        let mut map = map_of(&(0..32).collect::<Vec<_>>());
        let root_key = unsafe { (*map.root.unwrap().as_ptr()).key };
        assert_eq!(map.remove(&root_key), Some(root_key * 10));
        assert_eq!(map.remove_entry(&0), Some((0, 0)));
        assert_eq!(map.remove(&31), Some(310));
        assert_eq!(map.remove(&100), None);
        assert_eq!(map.len(), 29);
        assert_eq!(check_shape(&map), 29);
        assert!(!map.contains_key(&root_key));
        assert_eq!(map.first_key_value(), Some((&1, &10)));
        assert_eq!(map.last_key_value(), Some((&30, &300)));
    }

    #[test]
    fn stays_balanced_through_churn() {
        let mut map: TreeMap<i32, i32> = TreeMap::new();
        for i in 0..500 {
            map.try_insert((i * 37) % 500, i).unwrap();
        }
        assert_eq!(check_shape(&map), 500);
        for i in (0..500).step_by(3) {
            assert!(map.remove(&i).is_some());
        }
        assert_eq!(check_shape(&map), map.len());
        assert_eq!(map.len(), 500 - 167);
        let root_level = level(map.root);
        assert!(root_level <= 2 * (usize::BITS - map.len().leading_zeros()) as usize);
    }

    #[test]
    fn pops_from_both_ends() {
        let mut map = map_of(&[3, 1, 4, 5, 9, 2, 6]);
        assert_eq!(map.pop_first(), Some((1, 10)));
        assert_eq!(map.pop_last(), Some((9, 90)));
        assert_eq!(map.pop_first(), Some((2, 20)));
        assert_eq!(keys(&map), vec![3, 4, 5, 6]);
        assert_eq!(check_shape(&map), 4);

        let mut one = map_of(&[7]);
        assert_eq!(one.pop_last(), Some((7, 70)));
        assert_eq!(one.pop_first(), None);
    }

    #[test]
    fn clear_returns_every_node() {
        let alloc = CountingAllocator::new(HeapAllocator::<(i32, i32)>::new());
        let counts = alloc.counts();
        let mut map = TreeMap::try_from_iter_in((0..20).map(|i| (i, i)), alloc).unwrap();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(counts.allocate(), 20);
        assert_eq!(counts.construct(), 20);
        assert_eq!(counts.destroy(), 20);
        assert_eq!(counts.deallocate(), 20);
    }

    #[test]
    fn every_value_dropped_once() {
        let life = Lifecycle::new();
        {
            let mut map: TreeMap<i32, Tracked> = TreeMap::new();
            for i in 0..10 {
                map.try_insert(i, Tracked::new(i, &life)).unwrap();
            }
            // Replaced value comes back to the caller and drops here.
            drop(map.try_insert(3, Tracked::new(33, &life)));
            assert_eq!(life.drops(), 1);
            drop(map.remove(&4));
            assert_eq!(life.drops(), 2);
        }
        assert_eq!(life.drops(), 11);
        assert_eq!(life.clones(), 0);
    }

    #[test]
    fn into_iter_yields_ascending_and_frees_the_rest() {
        let life = Lifecycle::new();
        let mut map: TreeMap<i32, Tracked> = TreeMap::new();
        for i in [4, 2, 6, 1, 3] {
            map.try_insert(i, Tracked::new(i, &life)).unwrap();
        }
        let mut iter = map.into_iter();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next().map(|(k, _)| k), Some(1));
        assert_eq!(iter.next_back().map(|(k, _)| k), Some(6));
        assert_eq!(life.drops(), 2);
        drop(iter);
        assert_eq!(life.drops(), 5);
    }

    #[test]
    fn iter_mut_updates_values() {
        let mut map = map_of(&[1, 2, 3]);
        for (k, v) in &mut map {
            *v += *k;
        }
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec![11, 22, 33]);
    }

    #[test]
    fn clone_is_equal_and_independent() {
        let map = map_of(&[8, 6, 7, 5, 3, 0, 9]);
        let mut copy = map.clone();
        assert_eq!(map, copy);
        copy.remove(&5);
        assert_ne!(map, copy);
        assert_eq!(map.len(), 7);

        let heap_copy = map.try_clone_in(HeapAllocator::new()).unwrap();
        assert_eq!(heap_copy, map);
    }

    #[test]
    fn equality_ignores_the_allocator() {
        let heap = map_of(&[1, 2]);
        let counted = TreeMap::try_from_iter_in(
            [(2, 20), (1, 10)],
            CountingAllocator::new(HeapAllocator::<(i32, i32)>::new()),
        )
        .unwrap();
        assert!(heap == counted);
    }

    #[test]
    fn debug_lists_entries() {
        let map = map_of(&[2, 1]);
        assert_eq!(format!("{map:?}"), "{1: 10, 2: 20}");
    }

    #[test]
    fn take_leaves_an_empty_map() {
        let mut map = map_of(&[1, 2, 3]);
        let taken = mem::take(&mut map);
        assert!(map.is_empty());
        assert_eq!(keys(&taken), vec![1, 2, 3]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        #[derive(Clone, Debug)]
        enum Op {
            Insert(u8, i32),
            Remove(u8),
            PopFirst,
            PopLast,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => (any::<u8>(), any::<i32>()).prop_map(|(k, v)| Op::Insert(k, v)),
                2 => any::<u8>().prop_map(Op::Remove),
                1 => Just(Op::PopFirst),
                1 => Just(Op::PopLast),
            ]
        }

        proptest! {
            #[test]
            fn behaves_like_btreemap(ops in proptest::collection::vec(op(), 1..200)) {
                let mut map: TreeMap<u8, i32> = TreeMap::new();
                let mut model = BTreeMap::new();
                for op in ops {
                    match op {
                        Op::Insert(k, v) => prop_assert_eq!(map.try_insert(k, v).unwrap(), model.insert(k, v)),
                        Op::Remove(k) => prop_assert_eq!(map.remove(&k), model.remove(&k)),
                        Op::PopFirst => prop_assert_eq!(map.pop_first(), model.pop_first()),
                        Op::PopLast => prop_assert_eq!(map.pop_last(), model.pop_last()),
                    }
                    prop_assert_eq!(map.len(), model.len());
                }
                prop_assert_eq!(check_shape(&map), model.len());
                prop_assert!(map.iter().eq(model.iter()));
            }
        }
    }
}

//! The list container and its node type.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use humble_arena::HeapAllocator;
use humble_core::{AllocError, ElementAllocator};

use crate::iter::{IntoIter, Iter, IterMut};

pub(crate) type Link<T> = Option<NonNull<Node<T>>>;

/// One list cell. Opaque; exposed only so allocator types can be named
/// (e.g. `HumbleAllocator<Node<i32>, 10>`).
pub struct Node<T> {
    pub(crate) value: T,
    pub(crate) next: Link<T>,
}

/// A singly-linked list whose nodes come from `A`.
///
/// The list holds `A` rebound to [`Node<T>`], so the capacity of a
/// fixed-size allocator counts nodes. Appending is O(1) (a tail link is
/// kept); removing from the back is O(n).
///
/// Moving a list (including [`std::mem::take`] and [`std::mem::swap`])
/// transfers its chain in O(1) without touching elements or the allocator.
pub struct ForwardList<T, A: ElementAllocator<T> = HeapAllocator<T>> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    alloc: A::Rebind<Node<T>>,
    _owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: the list exclusively owns its nodes; sending it sends the values
// and the allocator handle.
unsafe impl<T: Send, A: ElementAllocator<T>> Send for ForwardList<T, A> where
    A::Rebind<Node<T>>: Send
{
}

// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync, A: ElementAllocator<T>> Sync for ForwardList<T, A> where
    A::Rebind<Node<T>>: Sync
{
}

impl<T> ForwardList<T> {
    /// An empty list on the global heap.
    pub fn new() -> Self {
        Self::new_in(HeapAllocator::new())
    }
}

impl<T, A: ElementAllocator<T>> ForwardList<T, A> {
    /// An empty list whose nodes come from `alloc` rebound to [`Node<T>`].
    pub fn new_in(alloc: A) -> Self {
        Self::with_node_allocator(alloc.rebind())
    }

    /// An empty list using an already node-typed allocator as is.
    pub fn with_node_allocator(alloc: A::Rebind<Node<T>>) -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            alloc,
            _owns: PhantomData,
        }
    }

    /// An empty list sharing this list's node allocator (a clone of it).
    ///
    /// With a shared-block allocator both lists then draw from one block.
    pub fn new_sharing(&self) -> Self {
        Self::with_node_allocator(self.alloc.clone())
    }

    /// Build a list from `iter`, allocating from `alloc`.
    pub fn try_from_iter_in<I>(iter: I, alloc: A) -> Result<Self, AllocError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut list = Self::new_in(alloc);
        list.try_extend(iter)?;
        Ok(list)
    }

    /// The node allocator.
    pub fn allocator(&self) -> &A::Rebind<Node<T>> {
        &self.alloc
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Node capacity reported by the allocator.
    pub fn max_size(&self) -> usize {
        self.alloc.max_size()
    }

    /// First element.
    pub fn front(&self) -> Option<&T> {
        // SAFETY: linked nodes are live and owned by `self`.
        self.head.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// First element, mutably.
    pub fn front_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as `front`; `&mut self` makes the borrow unique.
        self.head.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Last element.
    pub fn back(&self) -> Option<&T> {
        // SAFETY: linked nodes are live and owned by `self`.
        self.tail.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    /// Last element, mutably.
    pub fn back_mut(&mut self) -> Option<&mut T> {
        // SAFETY: as `back`; `&mut self` makes the borrow unique.
        self.tail.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Append `value`.
    pub fn push_back(&mut self, value: T) -> Result<(), AllocError> {
        self.emplace_back_with(|| value)
    }

    /// Append the value produced by `make`, built after the node storage
    /// has been obtained.
    ///
    /// If the allocator refuses, `make` is never called. If `make` panics,
    /// the node storage is returned before the panic propagates.
    pub fn emplace_back_with<F>(&mut self, make: F) -> Result<(), AllocError>
    where
        F: FnOnce() -> T,
    {
        let node = self.create_node(make)?;
        match self.tail {
            // SAFETY: `tail` is a live node owned by `self`.
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Prepend `value`.
    pub fn push_front(&mut self, value: T) -> Result<(), AllocError> {
        let node = self.create_node(|| value)?;
        // SAFETY: `node` was just constructed and is not yet linked.
        unsafe { (*node.as_ptr()).next = self.head };
        if self.tail.is_none() {
            self.tail = Some(node);
        }
        self.head = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Remove and return the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head?;
        // SAFETY: `head` is a live node owned by `self`.
        self.head = unsafe { (*head.as_ptr()).next };
        if self.head.is_none() {
            self.tail = None;
        }
        self.len -= 1;
        Some(self.release_node(head))
    }

    /// Remove and return the last element. O(n).
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        if self.head == Some(tail) {
            return self.pop_front();
        }
        let before = self.node_before(tail)?;
        // SAFETY: `before` is a live node owned by `self`.
        unsafe { (*before.as_ptr()).next = None };
        self.tail = Some(before);
        self.len -= 1;
        Some(self.release_node(tail))
    }

    /// Remove and return the element at `index`, or `None` if out of
    /// bounds. O(index).
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        if index == 0 {
            return self.pop_front();
        }
        let before = self.node_at(index - 1)?;
        // SAFETY: `before` and its successor are live nodes owned by `self`
        // (`index < len`).
        let target = unsafe { (*before.as_ptr()).next }?;
        unsafe { (*before.as_ptr()).next = (*target.as_ptr()).next };
        if self.tail == Some(target) {
            self.tail = Some(before);
        }
        self.len -= 1;
        Some(self.release_node(target))
    }

    /// Destroy every element and return all nodes to the allocator.
    pub fn clear(&mut self) {
        let mut cursor = self.head.take();
        self.tail = None;
        self.len = 0;
        while let Some(node) = cursor {
            // SAFETY: `node` is live and unlinked from `self`; it is read
            // before being destroyed and never touched afterwards.
            unsafe {
                cursor = (*node.as_ptr()).next;
                self.alloc.destroy(node);
            }
            self.return_storage(node);
        }
    }

    /// Append every item of `iter`, stopping at the first refusal.
    ///
    /// Items appended before the failure stay in the list.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<(), AllocError>
    where
        I: IntoIterator<Item = T>,
    {
        for value in iter {
            self.push_back(value)?;
        }
        Ok(())
    }

    /// Iterate front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.head, self.len)
    }

    /// Iterate front to back with mutable access.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.head, self.len)
    }

    /// Copy every element into a new list that uses
    /// [`for_container_copy`](ElementAllocator::for_container_copy) of this
    /// list's allocator.
    pub fn try_clone(&self) -> Result<Self, AllocError>
    where
        T: Clone,
    {
        let mut list = Self::with_node_allocator(self.alloc.for_container_copy());
        list.try_extend(self.iter().cloned())?;
        Ok(list)
    }

    /// Copy every element into a new list allocating from `alloc`.
    pub fn try_clone_in(&self, alloc: A) -> Result<Self, AllocError>
    where
        T: Clone,
    {
        Self::try_from_iter_in(self.iter().cloned(), alloc)
    }

    fn create_node<F>(&mut self, make: F) -> Result<NonNull<Node<T>>, AllocError>
    where
        F: FnOnce() -> T,
    {
        let node = self.alloc.allocate(1)?;
        let guard = ReleaseOnUnwind {
            alloc: &mut self.alloc,
            node,
        };
        let value = make();
        mem::forget(guard);
        // SAFETY: `node` is fresh storage for one `Node<T>`.
        unsafe { self.alloc.construct(node, Node { value, next: None }) };
        Ok(node)
    }

    /// Move the value out of an unlinked node and return its storage.
    fn release_node(&mut self, node: NonNull<Node<T>>) -> T {
        // SAFETY: `node` is live and already unlinked; reading moves the
        // value out and the storage is not read again.
        let Node { value, .. } = unsafe { node.as_ptr().read() };
        self.return_storage(node);
        value
    }

    fn return_storage(&mut self, node: NonNull<Node<T>>) {
        // SAFETY: `node` came from `self.alloc.allocate(1)` and holds no
        // live value any more.
        if let Err(err) = unsafe { self.alloc.deallocate(node, 1) } {
            tracing::warn!(%err, len = self.len, "list node rejected by its allocator");
        }
    }

    fn node_before(&self, target: NonNull<Node<T>>) -> Link<T> {
        let mut cursor = self.head;
        while let Some(node) = cursor {
            // SAFETY: linked nodes are live and owned by `self`.
            let next = unsafe { (*node.as_ptr()).next };
            if next == Some(target) {
                return Some(node);
            }
            cursor = next;
        }
        None
    }

    fn node_at(&self, index: usize) -> Link<T> {
        let mut cursor = self.head;
        for _ in 0..index {
            // SAFETY: linked nodes are live and owned by `self`.
            cursor = unsafe { (*cursor?.as_ptr()).next };
        }
        cursor
    }
}

/// Returns node storage if the value constructor unwinds.
struct ReleaseOnUnwind<'a, N, R: ElementAllocator<N>> {
    alloc: &'a mut R,
    node: NonNull<N>,
}

impl<N, R: ElementAllocator<N>> Drop for ReleaseOnUnwind<'_, N, R> {
    fn drop(&mut self) {
        // SAFETY: `node` came from `alloc.allocate(1)` and was never
        // constructed.
        if let Err(err) = unsafe { self.alloc.deallocate(self.node, 1) } {
            tracing::warn!(%err, "unconstructed list node rejected by its allocator");
        }
    }
}

impl<T, A: ElementAllocator<T>> Drop for ForwardList<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A: ElementAllocator<T> + Default> Default for ForwardList<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, A: ElementAllocator<T>> Clone for ForwardList<T, A> {
    /// # Panics
    ///
    /// Panics if the copy's allocator refuses a node; use
    /// [`ForwardList::try_clone`] to handle that case.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(list) => list,
            Err(err) => panic!("failed to clone list: {err}"),
        }
    }
}

impl<T, A, B> PartialEq<ForwardList<T, B>> for ForwardList<T, A>
where
    T: PartialEq,
    A: ElementAllocator<T>,
    B: ElementAllocator<T>,
{
    fn eq(&self, other: &ForwardList<T, B>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: ElementAllocator<T>> Eq for ForwardList<T, A> {}

impl<T: fmt::Debug, A: ElementAllocator<T>> fmt::Debug for ForwardList<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, A: ElementAllocator<T>> IntoIterator for ForwardList<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter::new(self)
    }
}

impl<'a, T, A: ElementAllocator<T>> IntoIterator for &'a ForwardList<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: ElementAllocator<T>> IntoIterator for &'a mut ForwardList<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

//! Doubly linked intrusive list.
//!
//! Nodes embed their own prev/next links, allowing O(1) insertion and removal
//! anywhere without the list owning the data.

use core::marker::PhantomData;

use super::admit;
use crate::error::{Attached, Violation, ViolationKind};
use crate::lock::{ContainerLock, NoLock, ReadGuard};
use crate::{ContainerId, Index, Storage};

/// Link block for a doubly linked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DListLink<Idx: Index> {
    pub(crate) owner: Option<ContainerId>,
    pub(crate) prev: Idx,
    pub(crate) next: Idx,
}

impl<Idx: Index> DListLink<Idx> {
    /// Creates a detached link.
    #[inline]
    pub const fn new() -> Self {
        Self {
            owner: None,
            prev: Idx::NONE,
            next: Idx::NONE,
        }
    }

    #[inline]
    pub const fn owner(&self) -> Option<ContainerId> {
        self.owner
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    /// Returns the previous node's index, or `Idx::NONE` at the head.
    #[inline]
    pub const fn prev(&self) -> Idx {
        self.prev
    }

    /// Returns the next node's index, or `Idx::NONE` at the tail.
    #[inline]
    pub const fn next(&self) -> Idx {
        self.next
    }
}

impl<Idx: Index> Default for DListLink<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Locates a [`DListLink`] inside a node.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{DListAdapter, DListLink};
///
/// struct Order {
///     id: u64,
///     queue: DListLink<u32>,
/// }
///
/// struct Queue;
///
/// impl DListAdapter for Queue {
///     type Node = Order;
///     type Index = u32;
///
///     fn link(node: &Order) -> &DListLink<u32> { &node.queue }
///     fn link_mut(node: &mut Order) -> &mut DListLink<u32> { &mut node.queue }
/// }
/// ```
pub trait DListAdapter {
    type Node: 'static;
    type Index: Index;

    fn link(node: &Self::Node) -> &DListLink<Self::Index>;

    fn link_mut(node: &mut Self::Node) -> &mut DListLink<Self::Index>;
}

pub(crate) trait DNav: DListAdapter {
    #[inline]
    fn node<S>(storage: &S, idx: Self::Index) -> &Self::Node
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        storage.get(idx).expect("invalid index")
    }

    #[inline]
    fn at<S>(storage: &S, idx: Self::Index) -> &DListLink<Self::Index>
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        Self::link(Self::node(storage, idx))
    }

    #[inline]
    fn at_mut<S>(storage: &mut S, idx: Self::Index) -> &mut DListLink<Self::Index>
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        Self::link_mut(storage.get_mut(idx).expect("invalid index"))
    }

    #[inline]
    fn is_member<S>(storage: &S, idx: Self::Index, id: ContainerId) -> bool
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        storage
            .get(idx)
            .is_some_and(|node| Self::link(node).owner == Some(id))
    }
}

impl<A: DListAdapter> DNav for A {}

/// Head, tail and length of a doubly linked chain, with the unlocked
/// relinking primitives every doubly linked container builds on.
pub(super) struct Chain<A: DListAdapter> {
    pub(super) head: A::Index,
    pub(super) tail: A::Index,
    pub(super) len: usize,
    _adapter: PhantomData<fn() -> A>,
}

impl<A: DListAdapter> Chain<A> {
    const fn new() -> Self {
        Self {
            head: A::Index::NONE,
            tail: A::Index::NONE,
            len: 0,
            _adapter: PhantomData,
        }
    }

    /// Links a detached node between `prev` and `next`, either of which may
    /// be `NONE` at the ends.
    pub(super) fn link_between<S>(
        &mut self,
        storage: &mut S,
        id: ContainerId,
        prev: A::Index,
        next: A::Index,
        idx: A::Index,
    ) where
        S: Storage<A::Node, Index = A::Index>,
    {
        *A::at_mut(storage, idx) = DListLink {
            owner: Some(id),
            prev,
            next,
        };

        if prev.is_some() {
            A::at_mut(storage, prev).next = idx;
        } else {
            self.head = idx;
        }

        if next.is_some() {
            A::at_mut(storage, next).prev = idx;
        } else {
            self.tail = idx;
        }

        self.len += 1;
    }

    /// Unlinks a member node and resets its link.
    pub(super) fn unlink<S>(&mut self, storage: &mut S, idx: A::Index)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let (prev, next) = {
            let link = A::at(storage, idx);
            (link.prev, link.next)
        };

        if prev.is_some() {
            A::at_mut(storage, prev).next = next;
        } else {
            self.head = next;
        }

        if next.is_some() {
            A::at_mut(storage, next).prev = prev;
        } else {
            self.tail = prev;
        }

        *A::at_mut(storage, idx) = DListLink::new();
        self.len -= 1;
    }

    pub(super) fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut idx = self.head;
        while idx.is_some() {
            let link = A::at_mut(storage, idx);
            let next = link.next;
            *link = DListLink::new();
            idx = next;
        }

        self.head = A::Index::NONE;
        self.tail = A::Index::NONE;
        self.len = 0;
    }

    pub(super) fn validate<S>(&self, storage: &S, id: ContainerId) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if self.head.is_none() || self.tail.is_none() {
            return if self.head.is_none() && self.tail.is_none() && self.len == 0 {
                Ok(())
            } else {
                Err(Violation::container(ViolationKind::Ends))
            };
        }

        let mut count = 0;
        let mut prev = A::Index::NONE;
        let mut idx = self.head;
        while idx.is_some() {
            count += 1;
            if count > self.len {
                return Err(Violation::container(ViolationKind::Length));
            }

            let node = storage
                .get(idx)
                .ok_or(Violation::at(idx.as_usize(), ViolationKind::Vacant))?;
            let link = A::link(node);
            if link.owner != Some(id) {
                return Err(Violation::at(idx.as_usize(), ViolationKind::NotMember));
            }
            if link.prev != prev {
                return Err(Violation::at(idx.as_usize(), ViolationKind::SiblingLink));
            }

            prev = idx;
            idx = link.next;
        }

        if prev != self.tail {
            return Err(Violation::container(ViolationKind::Ends));
        }
        if count != self.len {
            return Err(Violation::container(ViolationKind::Length));
        }
        Ok(())
    }
}

/// A doubly linked list over external storage.
///
/// The list itself only stores head, tail, length and its id. Nodes live in
/// user-provided storage and embed a [`DListLink`] located by the adapter.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{DList, DListAdapter, DListLink};
///
/// struct Node {
///     value: u64,
///     link: DListLink<usize>,
/// }
///
/// struct Fifo;
///
/// impl DListAdapter for Fifo {
///     type Node = Node;
///     type Index = usize;
///     fn link(node: &Node) -> &DListLink<usize> { &node.link }
///     fn link_mut(node: &mut Node) -> &mut DListLink<usize> { &mut node.link }
/// }
///
/// let mut storage = slab::Slab::new();
/// let mut list: DList<Fifo> = DList::new(Fifo);
///
/// let a = storage.insert(Node { value: 1, link: DListLink::new() });
/// let b = storage.insert(Node { value: 2, link: DListLink::new() });
/// let c = storage.insert(Node { value: 3, link: DListLink::new() });
///
/// list.push_back(&mut storage, a).unwrap();
/// list.push_back(&mut storage, b).unwrap();
/// list.push_back(&mut storage, c).unwrap();
///
/// // Remove from middle - O(1)
/// assert!(list.remove(&mut storage, b));
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.pop_front(&mut storage), Some(a));
/// ```
pub struct DList<A: DListAdapter, L: ContainerLock = NoLock> {
    pub(super) id: ContainerId,
    pub(super) chain: Chain<A>,
    pub(super) adapter: A,
    pub(super) lock: L,
}

impl<A, L> DList<A, L>
where
    A: DListAdapter,
    L: ContainerLock,
{
    /// Creates an empty list with the default lock.
    pub fn new(adapter: A) -> Self {
        Self::with_lock(adapter, L::default())
    }

    /// Creates an empty list guarded by `lock`.
    pub fn with_lock(adapter: A, lock: L) -> Self {
        Self {
            id: ContainerId::next(),
            chain: Chain::new(),
            adapter,
            lock,
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Returns the number of nodes in the list.
    #[inline]
    pub fn len(&self) -> usize {
        self.chain.len
    }

    /// Returns `true` if the list is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chain.len == 0
    }

    #[inline]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Returns the head node's index.
    #[inline]
    pub fn first(&self) -> Option<A::Index> {
        let _r = self.lock.read();
        self.chain.head.into_option()
    }

    /// Returns the tail node's index.
    #[inline]
    pub fn last(&self) -> Option<A::Index> {
        let _r = self.lock.read();
        self.chain.tail.into_option()
    }

    pub fn contains<S>(&self, storage: &S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        A::is_member(storage, idx, self.id)
    }

    /// Returns the node after `idx`, or `None` at the tail or if `idx` is
    /// not in this list.
    pub fn next<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        if !A::is_member(storage, idx, self.id) {
            return None;
        }
        A::at(storage, idx).next.into_option()
    }

    /// Returns the node before `idx`, or `None` at the head or if `idx` is
    /// not in this list.
    pub fn prev<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        if !A::is_member(storage, idx, self.id) {
            return None;
        }
        A::at(storage, idx).prev.into_option()
    }

    /// Pushes a node to the back of the list.
    ///
    /// Returns `Ok(false)` if the node is already in this list.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not valid in storage.
    pub fn push_back<S>(&mut self, storage: &mut S, idx: A::Index) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !admit(A::at(storage, idx).owner, self.id)? {
            return Ok(false);
        }

        {
            let _w = guard.write();
            let tail = self.chain.tail;
            self.chain
                .link_between(storage, self.id, tail, A::Index::NONE, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Pushes a node to the front of the list.
    ///
    /// Returns `Ok(false)` if the node is already in this list.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    pub fn push_front<S>(&mut self, storage: &mut S, idx: A::Index) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !admit(A::at(storage, idx).owner, self.id)? {
            return Ok(false);
        }

        {
            let _w = guard.write();
            let head = self.chain.head;
            self.chain
                .link_between(storage, self.id, A::Index::NONE, head, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Inserts a node after an existing member.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    ///
    /// # Panics
    ///
    /// Panics if `after` is not in this list.
    pub fn insert_after<S>(
        &mut self,
        storage: &mut S,
        after: A::Index,
        idx: A::Index,
    ) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        assert!(
            A::is_member(storage, after, self.id),
            "anchor is not in this list"
        );
        if !admit(A::at(storage, idx).owner, self.id)? {
            return Ok(false);
        }

        {
            let _w = guard.write();
            let next = A::at(storage, after).next;
            self.chain.link_between(storage, self.id, after, next, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Inserts a node before an existing member.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    ///
    /// # Panics
    ///
    /// Panics if `before` is not in this list.
    pub fn insert_before<S>(
        &mut self,
        storage: &mut S,
        before: A::Index,
        idx: A::Index,
    ) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        assert!(
            A::is_member(storage, before, self.id),
            "anchor is not in this list"
        );
        if !admit(A::at(storage, idx).owner, self.id)? {
            return Ok(false);
        }

        {
            let _w = guard.write();
            let prev = A::at(storage, before).prev;
            self.chain.link_between(storage, self.id, prev, before, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Removes a node from the list in O(1).
    ///
    /// Returns `false` if the node is not in this list. The node remains in
    /// storage; only its links are cleared.
    pub fn remove<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !A::is_member(storage, idx, self.id) {
            return false;
        }

        {
            let _w = guard.write();
            self.chain.unlink(storage, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        true
    }

    /// Removes and returns the head node's index.
    pub fn pop_front<S>(&mut self, storage: &mut S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _w = self.lock.write();
        let idx = self.chain.head.into_option()?;
        self.chain.unlink(storage, idx);
        Some(idx)
    }

    /// Removes and returns the tail node's index.
    pub fn pop_back<S>(&mut self, storage: &mut S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _w = self.lock.write();
        let idx = self.chain.tail.into_option()?;
        self.chain.unlink(storage, idx);
        Some(idx)
    }

    /// Clears the list, resetting all nodes' links.
    ///
    /// Nodes remain in storage; only their links are cleared.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _w = self.lock.write();
        tracing::debug!(list = %self.id, len = self.chain.len, "cleared list");
        self.chain.clear(storage);
    }

    /// Iterates nodes from head to tail.
    pub fn iter<'a, S>(&'a self, storage: &'a S) -> DListIter<'a, A, S, L>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let guard = self.lock.read();
        DListIter {
            storage,
            front: self.chain.head,
            back: self.chain.tail,
            remaining: self.chain.len,
            _guard: guard,
        }
    }

    /// Walks the list and reports the first broken invariant.
    pub fn validate<S>(&self, storage: &S) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        self.chain.validate(storage, self.id)
    }

    /// Returns `true` if the list is intact. Logs the first violation found.
    pub fn check<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        match self.validate(storage) {
            Ok(()) => true,
            Err(violation) => {
                tracing::warn!(list = %self.id, %violation, "list check failed");
                false
            }
        }
    }

    #[cfg(feature = "checked")]
    pub(super) fn assert_valid<S>(&self, storage: &S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if let Err(violation) = self.chain.validate(storage, self.id) {
            panic!("list {}: {}", self.id, violation);
        }
    }
}

/// Head-to-tail iterator over a [`DList`], yielding `(index, &node)` pairs.
pub struct DListIter<'a, A: DListAdapter, S, L: ContainerLock> {
    storage: &'a S,
    front: A::Index,
    back: A::Index,
    remaining: usize,
    _guard: ReadGuard<'a, L>,
}

impl<'a, A, S, L> Iterator for DListIter<'a, A, S, L>
where
    A: DListAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
    type Item = (A::Index, &'a A::Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.front;
        let node = A::node(self.storage, idx);
        self.front = A::link(node).next;
        self.remaining -= 1;
        Some((idx, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A, S, L> DoubleEndedIterator for DListIter<'_, A, S, L>
where
    A: DListAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.back;
        let node = A::node(self.storage, idx);
        self.back = A::link(node).prev;
        self.remaining -= 1;
        Some((idx, node))
    }
}

impl<A, S, L> ExactSizeIterator for DListIter<'_, A, S, L>
where
    A: DListAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
}

//! Singly linked intrusive list.
//!
//! One forward link per node. Pushing to the front is O(1); anything that
//! needs a node's predecessor (remove, push to the back) walks from the head.

use core::marker::PhantomData;

use super::admit;
use crate::error::{Attached, Violation, ViolationKind};
use crate::lock::{ContainerLock, NoLock, ReadGuard};
use crate::{ContainerId, Index, Storage};

/// Link block for a singly linked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SListLink<Idx: Index> {
    pub(crate) owner: Option<ContainerId>,
    pub(crate) next: Idx,
}

impl<Idx: Index> SListLink<Idx> {
    /// Creates a detached link.
    #[inline]
    pub const fn new() -> Self {
        Self {
            owner: None,
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

    #[inline]
    pub const fn next(&self) -> Idx {
        self.next
    }
}

impl<Idx: Index> Default for SListLink<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Locates an [`SListLink`] inside a node.
pub trait SListAdapter {
    type Node: 'static;
    type Index: Index;

    fn link(node: &Self::Node) -> &SListLink<Self::Index>;

    fn link_mut(node: &mut Self::Node) -> &mut SListLink<Self::Index>;
}

pub(crate) trait SNav: SListAdapter {
    #[inline]
    fn node<S>(storage: &S, idx: Self::Index) -> &Self::Node
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        storage.get(idx).expect("invalid index")
    }

    #[inline]
    fn at<S>(storage: &S, idx: Self::Index) -> &SListLink<Self::Index>
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        Self::link(Self::node(storage, idx))
    }

    #[inline]
    fn at_mut<S>(storage: &mut S, idx: Self::Index) -> &mut SListLink<Self::Index>
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

impl<A: SListAdapter> SNav for A {}

/// Head and length of a singly linked chain.
pub(super) struct Chain<A: SListAdapter> {
    pub(super) head: A::Index,
    pub(super) len: usize,
    _adapter: PhantomData<fn() -> A>,
}

impl<A: SListAdapter> Chain<A> {
    const fn new() -> Self {
        Self {
            head: A::Index::NONE,
            len: 0,
            _adapter: PhantomData,
        }
    }

    /// Links a detached node after `prev`, or at the head when `prev` is
    /// `NONE`.
    pub(super) fn link_after<S>(
        &mut self,
        storage: &mut S,
        id: ContainerId,
        prev: A::Index,
        idx: A::Index,
    ) where
        S: Storage<A::Node, Index = A::Index>,
    {
        let next = if prev.is_some() {
            let link = A::at_mut(storage, prev);
            let next = link.next;
            link.next = idx;
            next
        } else {
            let next = self.head;
            self.head = idx;
            next
        };

        *A::at_mut(storage, idx) = SListLink {
            owner: Some(id),
            next,
        };
        self.len += 1;
    }

    /// Unlinks `idx`, whose predecessor is `prev` (`NONE` at the head), and
    /// resets its link.
    pub(super) fn unlink_after<S>(&mut self, storage: &mut S, prev: A::Index, idx: A::Index)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let next = A::at(storage, idx).next;
        if prev.is_some() {
            A::at_mut(storage, prev).next = next;
        } else {
            self.head = next;
        }
        *A::at_mut(storage, idx) = SListLink::new();
        self.len -= 1;
    }

    /// Returns the member before `idx`, `NONE` if `idx` is the head.
    pub(super) fn predecessor<S>(&self, storage: &S, idx: A::Index) -> A::Index
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut prev = A::Index::NONE;
        let mut cursor = self.head;
        while cursor.is_some() && cursor != idx {
            prev = cursor;
            cursor = A::at(storage, cursor).next;
        }
        prev
    }

    /// Returns the last member, `NONE` if empty.
    pub(super) fn tail<S>(&self, storage: &S) -> A::Index
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut cursor = self.head;
        while cursor.is_some() {
            let next = A::at(storage, cursor).next;
            if next.is_none() {
                break;
            }
            cursor = next;
        }
        cursor
    }

    pub(super) fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut idx = self.head;
        while idx.is_some() {
            let link = A::at_mut(storage, idx);
            let next = link.next;
            *link = SListLink::new();
            idx = next;
        }
        self.head = A::Index::NONE;
        self.len = 0;
    }

    pub(super) fn validate<S>(&self, storage: &S, id: ContainerId) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut count = 0;
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
            idx = link.next;
        }

        if count != self.len {
            return Err(Violation::container(ViolationKind::Length));
        }
        Ok(())
    }
}

/// A singly linked list over external storage.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{SList, SListAdapter, SListLink};
///
/// struct Job {
///     id: u32,
///     link: SListLink<usize>,
/// }
///
/// struct Stack;
///
/// impl SListAdapter for Stack {
///     type Node = Job;
///     type Index = usize;
///     fn link(node: &Job) -> &SListLink<usize> { &node.link }
///     fn link_mut(node: &mut Job) -> &mut SListLink<usize> { &mut node.link }
/// }
///
/// let mut storage = slab::Slab::new();
/// let mut stack: SList<Stack> = SList::new(Stack);
///
/// let a = storage.insert(Job { id: 1, link: SListLink::new() });
/// let b = storage.insert(Job { id: 2, link: SListLink::new() });
/// stack.push_front(&mut storage, a).unwrap();
/// stack.push_front(&mut storage, b).unwrap();
///
/// assert_eq!(stack.pop_front(&mut storage), Some(b));
/// ```
pub struct SList<A: SListAdapter, L: ContainerLock = NoLock> {
    pub(super) id: ContainerId,
    pub(super) chain: Chain<A>,
    pub(super) adapter: A,
    pub(super) lock: L,
}

impl<A, L> SList<A, L>
where
    A: SListAdapter,
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

    #[inline]
    pub fn len(&self) -> usize {
        self.chain.len
    }

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

    pub fn contains<S>(&self, storage: &S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        A::is_member(storage, idx, self.id)
    }

    /// Returns the node after `idx`, or `None` at the end or if `idx` is not
    /// in this list.
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

    /// Pushes a node to the front of the list in O(1).
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
            self.chain
                .link_after(storage, self.id, A::Index::NONE, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Appends a node in O(n).
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    pub fn push_back<S>(&mut self, storage: &mut S, idx: A::Index) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !admit(A::at(storage, idx).owner, self.id)? {
            return Ok(false);
        }

        let tail = self.chain.tail(storage);
        {
            let _w = guard.write();
            self.chain.link_after(storage, self.id, tail, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Inserts a node after an existing member in O(1).
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
            self.chain.link_after(storage, self.id, after, idx);
        }

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Removes a node in O(n).
    ///
    /// Returns `false` if the node is not in this list.
    pub fn remove<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !A::is_member(storage, idx, self.id) {
            return false;
        }

        let prev = self.chain.predecessor(storage, idx);
        {
            let _w = guard.write();
            self.chain.unlink_after(storage, prev, idx);
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
        self.chain.unlink_after(storage, A::Index::NONE, idx);
        Some(idx)
    }

    /// Clears the list, resetting all nodes' links.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _w = self.lock.write();
        tracing::debug!(list = %self.id, len = self.chain.len, "cleared list");
        self.chain.clear(storage);
    }

    /// Iterates nodes from head to tail.
    pub fn iter<'a, S>(&'a self, storage: &'a S) -> SListIter<'a, A, S, L>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let guard = self.lock.read();
        SListIter {
            storage,
            cursor: self.chain.head,
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

/// Head-to-tail iterator over an [`SList`], yielding `(index, &node)` pairs.
pub struct SListIter<'a, A: SListAdapter, S, L: ContainerLock> {
    storage: &'a S,
    cursor: A::Index,
    remaining: usize,
    _guard: ReadGuard<'a, L>,
}

impl<'a, A, S, L> Iterator for SListIter<'a, A, S, L>
where
    A: SListAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
    type Item = (A::Index, &'a A::Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.cursor;
        let node = A::node(self.storage, idx);
        self.cursor = A::link(node).next;
        self.remaining -= 1;
        Some((idx, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A, S, L> ExactSizeIterator for SListIter<'_, A, S, L>
where
    A: SListAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
}

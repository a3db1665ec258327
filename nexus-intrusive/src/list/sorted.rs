//! Lists that keep their nodes ordered.
//!
//! Insertion scans from the head and links the node after every node that
//! compares less than or equal to it, so equal nodes stay in insertion order.
//! Re-inserting a member removes it first, which re-sorts it after its key
//! changed.

use core::cmp::Ordering;

use super::admit;
use super::dlist::{DList, DListAdapter, DListIter, DNav};
use super::slist::{SList, SListAdapter, SListIter, SNav};
use crate::error::{Attached, Violation, ViolationKind};
use crate::lock::{ContainerLock, NoLock};
use crate::{ContainerId, Index, Storage};

/// Ordering for a sorted list, implemented by its adapter.
pub trait ListOrder<N> {
    fn compare(&self, a: &N, b: &N) -> Ordering;
}

// =============================================================================
// SortedDList
// =============================================================================

/// A doubly linked list kept in ascending order.
pub struct SortedDList<A: DListAdapter, L: ContainerLock = NoLock> {
    list: DList<A, L>,
}

impl<A, L> SortedDList<A, L>
where
    A: DListAdapter + ListOrder<A::Node>,
    L: ContainerLock,
{
    pub fn new(adapter: A) -> Self {
        Self {
            list: DList::new(adapter),
        }
    }

    pub fn with_lock(adapter: A, lock: L) -> Self {
        Self {
            list: DList::with_lock(adapter, lock),
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.list.id()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns the smallest node.
    #[inline]
    pub fn first(&self) -> Option<A::Index> {
        self.list.first()
    }

    /// Returns the largest node.
    #[inline]
    pub fn last(&self) -> Option<A::Index> {
        self.list.last()
    }

    pub fn contains<S>(&self, storage: &S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.contains(storage, idx)
    }

    pub fn next<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.next(storage, idx)
    }

    pub fn prev<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.prev(storage, idx)
    }

    /// Links a node at its sorted position.
    ///
    /// Returns `Ok(true)` if the node was newly linked, `Ok(false)` if it was
    /// already a member and has been moved to its current sorted position.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    pub fn insert<S>(&mut self, storage: &mut S, idx: A::Index) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let list = &mut self.list;
        let mut guard = list.lock.upgradable();
        let fresh = admit(A::at(storage, idx).owner, list.id)?;

        let _w = guard.write();
        if !fresh {
            list.chain.unlink(storage, idx);
        }

        // Scan from the tail: the common case is appending in order.
        let mut prev = list.chain.tail;
        {
            let node = A::node(storage, idx);
            while prev.is_some() {
                let other = A::node(storage, prev);
                if list.adapter.compare(other, node) != Ordering::Greater {
                    break;
                }
                prev = A::link(other).prev;
            }
        }
        let next = if prev.is_some() {
            A::at(storage, prev).next
        } else {
            list.chain.head
        };
        list.chain.link_between(storage, list.id, prev, next, idx);

        #[cfg(feature = "checked")]
        if let Err(violation) = validate_dlist(list, storage) {
            panic!("sorted list {}: {}", list.id, violation);
        }

        Ok(fresh)
    }

    /// Moves a member to its current sorted position after its key changed.
    ///
    /// Returns `false` if the node is not in this list.
    pub fn resort<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if !self.list.contains(storage, idx) {
            return false;
        }
        matches!(self.insert(storage, idx), Ok(false))
    }

    pub fn remove<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.remove(storage, idx)
    }

    pub fn pop_front<S>(&mut self, storage: &mut S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.pop_front(storage)
    }

    pub fn pop_back<S>(&mut self, storage: &mut S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.pop_back(storage)
    }

    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.clear(storage);
    }

    /// Iterates nodes in ascending order.
    pub fn iter<'a, S>(&'a self, storage: &'a S) -> DListIter<'a, A, S, L>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.iter(storage)
    }

    /// Checks the links and that every adjacent pair is in order.
    pub fn validate<S>(&self, storage: &S) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.list.lock.read();
        validate_dlist(&self.list, storage)
    }

    pub fn check<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        match self.validate(storage) {
            Ok(()) => true,
            Err(violation) => {
                tracing::warn!(list = %self.id(), %violation, "sorted list check failed");
                false
            }
        }
    }
}

fn validate_dlist<A, L, S>(list: &DList<A, L>, storage: &S) -> Result<(), Violation>
where
    A: DListAdapter + ListOrder<A::Node>,
    L: ContainerLock,
    S: Storage<A::Node, Index = A::Index>,
{
    list.chain.validate(storage, list.id)?;

    let mut prev = list.chain.head;
    if prev.is_none() {
        return Ok(());
    }
    let mut idx = A::at(storage, prev).next;
    while idx.is_some() {
        if list.adapter.compare(A::node(storage, prev), A::node(storage, idx)) == Ordering::Greater {
            return Err(Violation::at(idx.as_usize(), ViolationKind::Order));
        }
        prev = idx;
        idx = A::at(storage, idx).next;
    }
    Ok(())
}

// =============================================================================
// SortedSList
// =============================================================================

/// A singly linked list kept in ascending order.
pub struct SortedSList<A: SListAdapter, L: ContainerLock = NoLock> {
    list: SList<A, L>,
}

impl<A, L> SortedSList<A, L>
where
    A: SListAdapter + ListOrder<A::Node>,
    L: ContainerLock,
{
    pub fn new(adapter: A) -> Self {
        Self {
            list: SList::new(adapter),
        }
    }

    pub fn with_lock(adapter: A, lock: L) -> Self {
        Self {
            list: SList::with_lock(adapter, lock),
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.list.id()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns the smallest node.
    #[inline]
    pub fn first(&self) -> Option<A::Index> {
        self.list.first()
    }

    pub fn contains<S>(&self, storage: &S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.contains(storage, idx)
    }

    pub fn next<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.next(storage, idx)
    }

    /// Links a node at its sorted position, or re-sorts a member.
    ///
    /// Returns `Ok(true)` if the node was newly linked, `Ok(false)` if it was
    /// already a member.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container.
    pub fn insert<S>(&mut self, storage: &mut S, idx: A::Index) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let list = &mut self.list;
        let mut guard = list.lock.upgradable();
        let fresh = admit(A::at(storage, idx).owner, list.id)?;

        let _w = guard.write();
        if !fresh {
            let before = list.chain.predecessor(storage, idx);
            list.chain.unlink_after(storage, before, idx);
        }

        let mut prev = A::Index::NONE;
        {
            let node = A::node(storage, idx);
            let mut cursor = list.chain.head;
            while cursor.is_some() {
                let other = A::node(storage, cursor);
                if list.adapter.compare(other, node) == Ordering::Greater {
                    break;
                }
                prev = cursor;
                cursor = A::link(other).next;
            }
        }
        list.chain.link_after(storage, list.id, prev, idx);

        #[cfg(feature = "checked")]
        if let Err(violation) = validate_slist(list, storage) {
            panic!("sorted list {}: {}", list.id, violation);
        }

        Ok(fresh)
    }

    /// Moves a member to its current sorted position after its key changed.
    ///
    /// Returns `false` if the node is not in this list.
    pub fn resort<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if !self.list.contains(storage, idx) {
            return false;
        }
        matches!(self.insert(storage, idx), Ok(false))
    }

    pub fn remove<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.remove(storage, idx)
    }

    pub fn pop_front<S>(&mut self, storage: &mut S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.pop_front(storage)
    }

    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.clear(storage);
    }

    /// Iterates nodes in ascending order.
    pub fn iter<'a, S>(&'a self, storage: &'a S) -> SListIter<'a, A, S, L>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        self.list.iter(storage)
    }

    /// Checks the links and that every adjacent pair is in order.
    pub fn validate<S>(&self, storage: &S) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.list.lock.read();
        validate_slist(&self.list, storage)
    }

    pub fn check<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        match self.validate(storage) {
            Ok(()) => true,
            Err(violation) => {
                tracing::warn!(list = %self.id(), %violation, "sorted list check failed");
                false
            }
        }
    }
}

fn validate_slist<A, L, S>(list: &SList<A, L>, storage: &S) -> Result<(), Violation>
where
    A: SListAdapter + ListOrder<A::Node>,
    L: ContainerLock,
    S: Storage<A::Node, Index = A::Index>,
{
    list.chain.validate(storage, list.id)?;

    let mut prev = list.chain.head;
    if prev.is_none() {
        return Ok(());
    }
    let mut idx = A::at(storage, prev).next;
    while idx.is_some() {
        if list.adapter.compare(A::node(storage, prev), A::node(storage, idx)) == Ordering::Greater {
            return Err(Violation::at(idx.as_usize(), ViolationKind::Order));
        }
        prev = idx;
        idx = A::at(storage, idx).next;
    }
    Ok(())
}

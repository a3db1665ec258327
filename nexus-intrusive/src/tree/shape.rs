//! Structural views of a tree handed to balancers.
//!
//! [`Probe`] reads links. [`Shape`] additionally relinks: it is the only type
//! that edits parent/child pointers, and it promotes the caller's upgradable
//! lock to exclusive for each edit.

use core::marker::PhantomData;

use super::link::{Nav, TreeAdapter, TreeLink};
use crate::lock::{ContainerLock, UpgradableGuard};
use crate::{ContainerId, Index, Storage};

/// Read-only view of a tree's links.
pub struct Probe<'a, A, S> {
    storage: &'a S,
    _adapter: PhantomData<fn() -> A>,
}

impl<'a, A, S> Probe<'a, A, S>
where
    A: TreeAdapter,
    S: Storage<A::Node, Index = A::Index>,
{
    #[inline]
    pub(crate) fn new(storage: &'a S) -> Self {
        Self {
            storage,
            _adapter: PhantomData,
        }
    }

    /// Returns the node's link block.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not occupied in storage.
    #[inline]
    pub fn link(&self, idx: A::Index) -> &'a TreeLink<A::Index> {
        A::at(&*self.storage, idx)
    }

    #[inline]
    pub fn parent(&self, idx: A::Index) -> A::Index {
        self.link(idx).parent
    }

    #[inline]
    pub fn left(&self, idx: A::Index) -> A::Index {
        self.link(idx).left
    }

    #[inline]
    pub fn right(&self, idx: A::Index) -> A::Index {
        self.link(idx).right
    }

    /// Returns the node's level, or 0 for an absent node.
    #[inline]
    pub fn level(&self, idx: A::Index) -> u32 {
        if idx.is_none() { 0 } else { self.link(idx).level }
    }
}

/// Mutation context for one insert or remove.
///
/// Borrows the tree's base slot, its storage and the upgradable guard taken
/// by the operation. Every edit briefly promotes that guard to exclusive.
pub struct Shape<'a, 'g, A: TreeAdapter, S, L: ContainerLock> {
    id: ContainerId,
    storage: &'a mut S,
    base: &'a mut A::Index,
    guard: &'a mut UpgradableGuard<'g, L>,
}

impl<'a, 'g, A, S, L> Shape<'a, 'g, A, S, L>
where
    A: TreeAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
    #[inline]
    pub(crate) fn new(
        id: ContainerId,
        storage: &'a mut S,
        base: &'a mut A::Index,
        guard: &'a mut UpgradableGuard<'g, L>,
    ) -> Self {
        Self {
            id,
            storage,
            base,
            guard,
        }
    }

    /// Returns a read-only view over the same storage.
    #[inline]
    pub fn probe(&self) -> Probe<'_, A, S> {
        Probe::new(&*self.storage)
    }

    /// Returns the tree's topmost node, or `NONE` if empty.
    #[inline]
    pub fn base(&self) -> A::Index {
        *self.base
    }

    /// Returns `true` if `idx` is linked into the tree being edited.
    #[inline]
    pub fn is_member(&self, idx: A::Index) -> bool {
        A::is_member(&*self.storage, idx, self.id)
    }

    #[inline]
    pub fn parent(&self, idx: A::Index) -> A::Index {
        A::at(&*self.storage, idx).parent
    }

    #[inline]
    pub fn left(&self, idx: A::Index) -> A::Index {
        A::at(&*self.storage, idx).left
    }

    #[inline]
    pub fn right(&self, idx: A::Index) -> A::Index {
        A::at(&*self.storage, idx).right
    }

    /// Returns the node's level, or 0 for an absent node.
    #[inline]
    pub fn level(&self, idx: A::Index) -> u32 {
        if idx.is_none() { 0 } else { A::at(&*self.storage, idx).level }
    }

    #[inline]
    pub fn set_level(&mut self, idx: A::Index, level: u32) {
        let _w = self.guard.write();
        A::at_mut(self.storage, idx).level = level;
    }

    /// Rotates left at `idx`: its right child takes its place and `idx`
    /// becomes that child's left child. Returns the new subtree top.
    ///
    /// # Panics
    ///
    /// Panics if `idx` has no right child.
    pub fn rotate_left(&mut self, idx: A::Index) -> A::Index {
        let _w = self.guard.write();
        let storage = &mut *self.storage;

        let (pivot, parent) = {
            let link = A::at(storage, idx);
            (link.right, link.parent)
        };
        let middle = A::at(storage, pivot).left;

        A::at_mut(storage, idx).right = middle;
        if middle.is_some() {
            A::at_mut(storage, middle).parent = idx;
        }

        A::at_mut(storage, pivot).parent = parent;
        replace_child::<A, S>(storage, self.base, parent, idx, pivot);

        A::at_mut(storage, pivot).left = idx;
        A::at_mut(storage, idx).parent = pivot;
        pivot
    }

    /// Rotates right at `idx`, the mirror of [`rotate_left`](Self::rotate_left).
    ///
    /// # Panics
    ///
    /// Panics if `idx` has no left child.
    pub fn rotate_right(&mut self, idx: A::Index) -> A::Index {
        let _w = self.guard.write();
        let storage = &mut *self.storage;

        let (pivot, parent) = {
            let link = A::at(storage, idx);
            (link.left, link.parent)
        };
        let middle = A::at(storage, pivot).right;

        A::at_mut(storage, idx).left = middle;
        if middle.is_some() {
            A::at_mut(storage, middle).parent = idx;
        }

        A::at_mut(storage, pivot).parent = parent;
        replace_child::<A, S>(storage, self.base, parent, idx, pivot);

        A::at_mut(storage, pivot).right = idx;
        A::at_mut(storage, idx).parent = pivot;
        pivot
    }

    /// Links a detached node as a leaf under `parent` (or as the base when
    /// `parent` is `NONE`).
    pub(crate) fn attach_leaf(&mut self, idx: A::Index, parent: A::Index, left: bool) {
        let _w = self.guard.write();
        let storage = &mut *self.storage;

        *A::at_mut(storage, idx) = TreeLink {
            owner: Some(self.id),
            parent,
            ..TreeLink::new()
        };

        if parent.is_none() {
            *self.base = idx;
        } else if left {
            A::at_mut(storage, parent).left = idx;
        } else {
            A::at_mut(storage, parent).right = idx;
        }
    }

    /// Unlinks a member node and resets its link. Returns the deepest node
    /// whose child links changed, where rebalancing has to start.
    ///
    /// A node with two children is replaced by its in-order predecessor.
    pub(crate) fn detach(&mut self, idx: A::Index) -> A::Index {
        let _w = self.guard.write();
        let storage = &mut *self.storage;

        let (parent, left, right) = {
            let link = A::at(storage, idx);
            (link.parent, link.left, link.right)
        };

        let (replacement, start) = if left.is_none() && right.is_none() {
            (A::Index::NONE, parent)
        } else if left.is_none() {
            (right, right)
        } else if right.is_none() {
            (left, left)
        } else {
            let pred = A::rightmost(storage, left);
            let start = if pred == left {
                pred
            } else {
                let (pred_parent, pred_left) = {
                    let link = A::at(storage, pred);
                    (link.parent, link.left)
                };
                A::at_mut(storage, pred_parent).right = pred_left;
                if pred_left.is_some() {
                    A::at_mut(storage, pred_left).parent = pred_parent;
                }
                A::at_mut(storage, pred).left = left;
                A::at_mut(storage, left).parent = pred;
                pred_parent
            };
            A::at_mut(storage, pred).right = right;
            A::at_mut(storage, right).parent = pred;
            (pred, start)
        };

        if replacement.is_some() {
            A::at_mut(storage, replacement).parent = parent;
        }
        replace_child::<A, S>(storage, self.base, parent, idx, replacement);

        *A::at_mut(storage, idx) = TreeLink::new();
        start
    }
}

/// Points whichever link referred to `old` at `new`: the parent's matching
/// child slot, or the base when `parent` is absent.
fn replace_child<A, S>(
    storage: &mut S,
    base: &mut A::Index,
    parent: A::Index,
    old: A::Index,
    new: A::Index,
) where
    A: TreeAdapter,
    S: Storage<A::Node, Index = A::Index>,
{
    if parent.is_none() {
        *base = new;
        return;
    }
    let link = A::at_mut(storage, parent);
    if link.left == old {
        link.left = new;
    } else {
        link.right = new;
    }
}

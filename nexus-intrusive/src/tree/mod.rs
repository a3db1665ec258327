//! Intrusive binary search tree over caller-owned storage.
//!
//! The tree stores only its base (topmost) index, its length and an id.
//! Nodes live in user storage and embed a [`TreeLink`] per tree they can
//! join. Balancing is a type parameter: [`Unbalanced`] gives a plain binary
//! search tree, [`AaBalance`] an AA tree ([`AaTree`]).
//!
//! # Example
//!
//! ```
//! use core::cmp::Ordering;
//! use nexus_intrusive::{AaTree, TreeAdapter, TreeLink};
//!
//! struct Level {
//!     price: u64,
//!     link: TreeLink<usize>,
//! }
//!
//! struct ByPrice;
//!
//! impl TreeAdapter for ByPrice {
//!     type Node = Level;
//!     type Index = usize;
//!     type Key = u64;
//!
//!     fn link(node: &Level) -> &TreeLink<usize> { &node.link }
//!     fn link_mut(node: &mut Level) -> &mut TreeLink<usize> { &mut node.link }
//!     fn compare(&self, a: &Level, b: &Level) -> Ordering { a.price.cmp(&b.price) }
//!     fn compare_key(&self, node: &Level, key: &u64) -> Ordering { node.price.cmp(key) }
//! }
//!
//! let mut storage = slab::Slab::new();
//! let mut tree: AaTree<ByPrice> = AaTree::new(ByPrice);
//!
//! for price in [105, 101, 103] {
//!     let idx = storage.insert(Level { price, link: TreeLink::new() });
//!     tree.insert(&mut storage, idx).unwrap();
//! }
//!
//! let best = tree.first(&storage).unwrap();
//! assert_eq!(storage[best].price, 101);
//!
//! let at_or_below = tree.find_floor(&storage, &104).unwrap();
//! assert_eq!(storage[at_or_below].price, 103);
//! ```

mod aa;
mod balance;
mod check;
mod iter;
mod link;
mod shape;

pub use aa::AaBalance;
pub use balance::{Balance, Unbalanced};
pub use iter::Iter;
pub use link::{TreeAdapter, TreeLink};
pub use shape::{Probe, Shape};

use core::cmp::Ordering;

use link::Nav;

use crate::error::Attached;
use crate::list::admit;
use crate::lock::{ContainerLock, NoLock};
use crate::{ContainerId, Index, Storage};

/// A tree balanced with the AA algorithm.
pub type AaTree<A, L = NoLock> = Tree<A, AaBalance, L>;

/// An intrusive binary search tree.
///
/// Every operation takes the node storage explicitly. All calls on one tree
/// must use the same storage instance.
///
/// Nodes that compare equal are kept in insertion order: ties descend to the
/// right, so a later equal node sorts after an earlier one.
///
/// # Dropping
///
/// A tree does not own its storage, so dropping it cannot reach the nodes it
/// links. Members keep their links and still name the dropped tree as their
/// owner, and every other container will refuse them. Call
/// [`clear`](Self::clear) before dropping a tree whose nodes outlive it.
#[derive(Debug)]
pub struct Tree<A: TreeAdapter, B: Balance = Unbalanced, L: ContainerLock = NoLock> {
    id: ContainerId,
    base: A::Index,
    len: usize,
    adapter: A,
    balance: B,
    lock: L,
}

impl<A, B, L> Tree<A, B, L>
where
    A: TreeAdapter,
    B: Balance,
    L: ContainerLock,
{
    /// Creates an empty tree with the default lock.
    pub fn new(adapter: A) -> Self {
        Self::with_lock(adapter, L::default())
    }

    /// Creates an empty tree guarded by `lock`.
    pub fn with_lock(adapter: A, lock: L) -> Self {
        Self {
            id: ContainerId::next(),
            base: A::Index::NONE,
            len: 0,
            adapter,
            balance: B::default(),
            lock,
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the topmost node.
    #[inline]
    pub fn base(&self) -> Option<A::Index> {
        self.base.into_option()
    }

    #[inline]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    #[inline]
    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Returns `true` if `idx` is linked into this tree. Vacant indices are
    /// not members.
    pub fn contains<S>(&self, storage: &S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        A::is_member(storage, idx, self.id)
    }

    /// Links a node into the tree.
    ///
    /// Returns `Ok(true)` if the node was linked, `Ok(false)` if it was
    /// already in this tree (nothing changes).
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to another container. The
    /// node cannot be detached from here: the other tree's base and length
    /// are only reachable through that tree. Remove it there first, or use
    /// [`transfer`](Self::transfer), which does both steps.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not occupied in storage.
    pub fn insert<S>(&mut self, storage: &mut S, idx: A::Index) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !admit(A::at(storage, idx).owner, self.id)? {
            return Ok(false);
        }

        let mut parent = A::Index::NONE;
        let mut left = false;
        {
            let node = A::node(storage, idx);
            let mut cursor = self.base;
            while cursor.is_some() {
                let visited = A::node(storage, cursor);
                parent = cursor;
                left = self.adapter.compare(node, visited) == Ordering::Less;
                let link = A::link(visited);
                cursor = if left { link.left } else { link.right };
            }
        }

        let mut shape = Shape::<A, S, L>::new(self.id, storage, &mut self.base, &mut guard);
        shape.attach_leaf(idx, parent, left);
        self.balance.rebalance(&mut shape, idx);
        self.len += 1;

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        Ok(true)
    }

    /// Moves a node from `source` into this tree.
    ///
    /// The node is unlinked from `source` (rebalancing it) and then linked
    /// here, as two separate locked sections. A node that is not in `source`
    /// is simply inserted.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if the node belongs to a third container.
    pub fn transfer<S>(
        &mut self,
        source: &mut Self,
        storage: &mut S,
        idx: A::Index,
    ) -> Result<bool, Attached>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if source.remove(storage, idx) {
            tracing::debug!(from = %source.id, to = %self.id, "transferring tree node");
        }
        self.insert(storage, idx)
    }

    /// Unlinks a node from the tree.
    ///
    /// Returns `false` (and does nothing) if the node is not in this tree.
    /// The node stays in storage with a detached link.
    pub fn remove<S>(&mut self, storage: &mut S, idx: A::Index) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();

        if !A::is_member(storage, idx, self.id) {
            return false;
        }

        let mut shape = Shape::<A, S, L>::new(self.id, storage, &mut self.base, &mut guard);
        let start = shape.detach(idx);
        self.balance.rebalance(&mut shape, start);
        self.len -= 1;

        #[cfg(feature = "checked")]
        self.assert_valid(storage);

        true
    }

    /// Unlinks every node without rebalancing, in O(n).
    ///
    /// Nodes stay in storage with detached links.
    pub fn clear<S>(&mut self, storage: &mut S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _w = self.lock.write();

        // Post-order sweep: descend to a leaf, detach it, resume at its
        // parent. Each node is entered at most three times.
        let mut cursor = self.base;
        while cursor.is_some() {
            let link = A::at(storage, cursor);
            if link.left.is_some() {
                cursor = link.left;
                continue;
            }
            if link.right.is_some() {
                cursor = link.right;
                continue;
            }

            let parent = link.parent;
            if parent.is_some() {
                let up = A::at_mut(storage, parent);
                if up.left == cursor {
                    up.left = A::Index::NONE;
                } else {
                    up.right = A::Index::NONE;
                }
            }
            *A::at_mut(storage, cursor) = TreeLink::new();
            cursor = parent;
        }

        tracing::debug!(tree = %self.id, len = self.len, "cleared tree");
        self.base = A::Index::NONE;
        self.len = 0;
    }

    /// Finds a node whose key compares equal to `key`.
    ///
    /// With duplicate keys, any one of the equal nodes may be returned.
    pub fn find<S>(&self, storage: &S, key: &A::Key) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        let mut cursor = self.base;
        while cursor.is_some() {
            let node = A::node(storage, cursor);
            match self.adapter.compare_key(node, key) {
                Ordering::Greater => cursor = A::link(node).left,
                Ordering::Less => cursor = A::link(node).right,
                Ordering::Equal => return Some(cursor),
            }
        }
        None
    }

    /// Finds the node with the largest key `<= key`.
    pub fn find_floor<S>(&self, storage: &S, key: &A::Key) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        let mut best = A::Index::NONE;
        let mut cursor = self.base;
        while cursor.is_some() {
            let node = A::node(storage, cursor);
            match self.adapter.compare_key(node, key) {
                Ordering::Greater => cursor = A::link(node).left,
                Ordering::Less => {
                    best = cursor;
                    cursor = A::link(node).right;
                }
                Ordering::Equal => return Some(cursor),
            }
        }
        best.into_option()
    }

    /// Finds the node with the smallest key `>= key`.
    pub fn find_ceiling<S>(&self, storage: &S, key: &A::Key) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        let mut best = A::Index::NONE;
        let mut cursor = self.base;
        while cursor.is_some() {
            let node = A::node(storage, cursor);
            match self.adapter.compare_key(node, key) {
                Ordering::Greater => {
                    best = cursor;
                    cursor = A::link(node).left;
                }
                Ordering::Less => cursor = A::link(node).right,
                Ordering::Equal => return Some(cursor),
            }
        }
        best.into_option()
    }

    /// Returns the smallest node.
    pub fn first<S>(&self, storage: &S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        A::leftmost(storage, self.base).into_option()
    }

    /// Returns the largest node.
    pub fn last<S>(&self, storage: &S) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        A::rightmost(storage, self.base).into_option()
    }

    /// Returns the in-order successor of `idx`, or `None` if `idx` is the
    /// last node or not in this tree.
    pub fn next<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        if !A::is_member(storage, idx, self.id) {
            return None;
        }
        A::successor(storage, idx).into_option()
    }

    /// Returns the in-order predecessor of `idx`, or `None` if `idx` is the
    /// first node or not in this tree.
    pub fn prev<S>(&self, storage: &S, idx: A::Index) -> Option<A::Index>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        if !A::is_member(storage, idx, self.id) {
            return None;
        }
        A::predecessor(storage, idx).into_option()
    }

    /// Returns the number of nodes on the longest base-to-leaf path.
    pub fn height<S>(&self, storage: &S) -> usize
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        if self.base.is_none() {
            return 0;
        }

        let mut height = 0;
        let mut stack = vec![(self.base, 1usize)];
        while let Some((idx, depth)) = stack.pop() {
            height = height.max(depth);
            let link = A::at(storage, idx);
            if link.left.is_some() {
                stack.push((link.left, depth + 1));
            }
            if link.right.is_some() {
                stack.push((link.right, depth + 1));
            }
        }
        height
    }

    #[cfg(feature = "checked")]
    fn assert_valid<S>(&self, storage: &S)
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if let Err(violation) = self.validate_unlocked(storage) {
            panic!("tree {}: {}", self.id, violation);
        }
    }
}

#[cfg(test)]
mod tests;

//! Tree link fields and the adapter that locates them inside a node.

use core::cmp::Ordering;

use crate::{ContainerId, Index, Storage};

/// Link block embedded in every node that can join a tree.
///
/// A record that participates in several trees embeds one `TreeLink` per
/// relationship, each reached through its own [`TreeAdapter`].
///
/// All fields are maintained by the tree. A freshly constructed link is
/// detached: no owner, all neighbours absent, level 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeLink<Idx: Index> {
    pub(crate) owner: Option<ContainerId>,
    pub(crate) parent: Idx,
    pub(crate) left: Idx,
    pub(crate) right: Idx,
    pub(crate) level: u32,
}

impl<Idx: Index> TreeLink<Idx> {
    /// Creates a detached link.
    #[inline]
    pub const fn new() -> Self {
        Self {
            owner: None,
            parent: Idx::NONE,
            left: Idx::NONE,
            right: Idx::NONE,
            level: 0,
        }
    }

    /// Returns the tree this node is linked into.
    #[inline]
    pub const fn owner(&self) -> Option<ContainerId> {
        self.owner
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    #[inline]
    pub const fn parent(&self) -> Idx {
        self.parent
    }

    #[inline]
    pub const fn left(&self) -> Idx {
        self.left
    }

    #[inline]
    pub const fn right(&self) -> Idx {
        self.right
    }

    /// Returns the balancing level. Always 0 for detached nodes and for
    /// trees that do not balance.
    #[inline]
    pub const fn level(&self) -> u32 {
        self.level
    }
}

impl<Idx: Index> Default for TreeLink<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Describes how a tree finds its link inside a node and how nodes order.
///
/// `compare` orders two nodes; `compare_key` orders a node against a search
/// key (which need not be a node). Both must agree: if a node's key is `k`,
/// `compare_key(node, k)` must equal `Ordering::Equal`, and the orderings must
/// be total and must not change while the node is linked.
///
/// Nodes are owned data (`'static`): storage hands out references to them for
/// as long as it is borrowed.
///
/// # Example
///
/// ```
/// use core::cmp::Ordering;
/// use nexus_intrusive::{TreeAdapter, TreeLink};
///
/// struct Order {
///     price: u64,
///     by_price: TreeLink<usize>,
/// }
///
/// struct ByPrice;
///
/// impl TreeAdapter for ByPrice {
///     type Node = Order;
///     type Index = usize;
///     type Key = u64;
///
///     fn link(node: &Order) -> &TreeLink<usize> { &node.by_price }
///     fn link_mut(node: &mut Order) -> &mut TreeLink<usize> { &mut node.by_price }
///
///     fn compare(&self, a: &Order, b: &Order) -> Ordering { a.price.cmp(&b.price) }
///     fn compare_key(&self, node: &Order, key: &u64) -> Ordering { node.price.cmp(key) }
/// }
/// ```
pub trait TreeAdapter {
    type Node: 'static;
    type Index: Index;
    type Key: ?Sized;

    fn link(node: &Self::Node) -> &TreeLink<Self::Index>;

    fn link_mut(node: &mut Self::Node) -> &mut TreeLink<Self::Index>;

    /// Orders `a` relative to `b`. Ties insert to the right.
    fn compare(&self, a: &Self::Node, b: &Self::Node) -> Ordering;

    /// Orders `node` relative to the search key.
    fn compare_key(&self, node: &Self::Node, key: &Self::Key) -> Ordering;
}

/// Storage navigation shared by the tree internals.
pub(crate) trait Nav: TreeAdapter {
    #[inline]
    fn node<S>(storage: &S, idx: Self::Index) -> &Self::Node
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        storage.get(idx).expect("invalid index")
    }

    #[inline]
    fn at<S>(storage: &S, idx: Self::Index) -> &TreeLink<Self::Index>
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        Self::link(Self::node(storage, idx))
    }

    #[inline]
    fn at_mut<S>(storage: &mut S, idx: Self::Index) -> &mut TreeLink<Self::Index>
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        Self::link_mut(storage.get_mut(idx).expect("invalid index"))
    }

    /// Returns `true` if `idx` is occupied and linked into `id`. Vacant
    /// indices are simply not members.
    #[inline]
    fn is_member<S>(storage: &S, idx: Self::Index, id: ContainerId) -> bool
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        storage
            .get(idx)
            .is_some_and(|node| Self::link(node).owner == Some(id))
    }

    fn leftmost<S>(storage: &S, mut idx: Self::Index) -> Self::Index
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        if idx.is_none() {
            return idx;
        }
        loop {
            let left = Self::at(storage, idx).left;
            if left.is_none() {
                return idx;
            }
            idx = left;
        }
    }

    fn rightmost<S>(storage: &S, mut idx: Self::Index) -> Self::Index
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        if idx.is_none() {
            return idx;
        }
        loop {
            let right = Self::at(storage, idx).right;
            if right.is_none() {
                return idx;
            }
            idx = right;
        }
    }

    /// In-order successor: leftmost of the right subtree, else the first
    /// ancestor reached by climbing out of a left subtree.
    fn successor<S>(storage: &S, idx: Self::Index) -> Self::Index
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        let link = Self::at(storage, idx);
        if link.right.is_some() {
            return Self::leftmost(storage, link.right);
        }
        let mut child = idx;
        let mut parent = link.parent;
        while parent.is_some() {
            let up = Self::at(storage, parent);
            if up.left == child {
                return parent;
            }
            child = parent;
            parent = up.parent;
        }
        Self::Index::NONE
    }

    /// In-order predecessor, the mirror of [`successor`](Nav::successor).
    fn predecessor<S>(storage: &S, idx: Self::Index) -> Self::Index
    where
        S: Storage<Self::Node, Index = Self::Index>,
    {
        let link = Self::at(storage, idx);
        if link.left.is_some() {
            return Self::rightmost(storage, link.left);
        }
        let mut child = idx;
        let mut parent = link.parent;
        while parent.is_some() {
            let up = Self::at(storage, parent);
            if up.right == child {
                return parent;
            }
            child = parent;
            parent = up.parent;
        }
        Self::Index::NONE
    }
}

impl<A: TreeAdapter> Nav for A {}

//! An ordered collection that owns its values.
//!
//! [`OwnedTree`] pairs a `Slab` with an [`AaTree`] threaded through it. Values
//! are handed in by value and come back out on removal; the `usize` handle
//! returned by [`insert`](OwnedTree::insert) stays valid until then.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;

use slab::Slab;

use crate::error::Violation;
use crate::lock::{ContainerLock, NoLock};
use crate::tree::{AaTree, Iter, Tree, TreeAdapter, TreeLink};

struct Entry<T> {
    value: T,
    link: TreeLink<usize>,
}

struct ByValue<T>(PhantomData<fn() -> T>);

impl<T: Ord + 'static> TreeAdapter for ByValue<T> {
    type Node = Entry<T>;
    type Index = usize;
    type Key = T;

    fn link(node: &Entry<T>) -> &TreeLink<usize> {
        &node.link
    }

    fn link_mut(node: &mut Entry<T>) -> &mut TreeLink<usize> {
        &mut node.link
    }

    fn compare(&self, a: &Entry<T>, b: &Entry<T>) -> Ordering {
        a.value.cmp(&b.value)
    }

    fn compare_key(&self, node: &Entry<T>, key: &T) -> Ordering {
        node.value.cmp(key)
    }
}

/// An AA-balanced ordered multiset with stable handles.
///
/// Equal values are kept in insertion order.
///
/// # Example
///
/// ```
/// use nexus_intrusive::OwnedTree;
///
/// let mut deadlines: OwnedTree<u64> = OwnedTree::new();
/// let late = deadlines.insert(300);
/// deadlines.insert(100);
/// deadlines.insert(200);
///
/// assert_eq!(deadlines.first(), Some((1, &100)));
/// assert_eq!(deadlines.remove(late), Some(300));
/// assert_eq!(deadlines.pop_first(), Some(100));
/// assert_eq!(deadlines.len(), 1);
/// ```
pub struct OwnedTree<T: Ord + 'static, L: ContainerLock = NoLock> {
    slab: Slab<Entry<T>>,
    tree: AaTree<ByValue<T>, L>,
}

impl<T: Ord + 'static, L: ContainerLock> OwnedTree<T, L> {
    pub fn new() -> Self {
        Self::with_lock(L::default())
    }

    pub fn with_lock(lock: L) -> Self {
        Self {
            slab: Slab::new(),
            tree: Tree::with_lock(ByValue(PhantomData), lock),
        }
    }

    /// Creates an empty tree with room for `capacity` values before the slab
    /// reallocates.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slab: Slab::with_capacity(capacity),
            tree: Tree::new(ByValue(PhantomData)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Inserts a value and returns its handle.
    pub fn insert(&mut self, value: T) -> usize {
        let idx = self.slab.insert(Entry {
            value,
            link: TreeLink::new(),
        });
        let linked = self.tree.insert(&mut self.slab, idx);
        debug_assert_eq!(linked, Ok(true));
        idx
    }

    /// Removes the value behind `handle`.
    pub fn remove(&mut self, handle: usize) -> Option<T> {
        if !self.tree.remove(&mut self.slab, handle) {
            return None;
        }
        Some(self.slab.remove(handle).value)
    }

    pub fn contains(&self, handle: usize) -> bool {
        self.tree.contains(&self.slab, handle)
    }

    pub fn get(&self, handle: usize) -> Option<&T> {
        self.slab.get(handle).map(|entry| &entry.value)
    }

    /// Finds a value equal to `key`.
    pub fn find(&self, key: &T) -> Option<(usize, &T)> {
        self.tree.find(&self.slab, key).map(|idx| self.entry(idx))
    }

    /// Finds the largest value `<= key`.
    pub fn find_floor(&self, key: &T) -> Option<(usize, &T)> {
        self.tree.find_floor(&self.slab, key).map(|idx| self.entry(idx))
    }

    /// Finds the smallest value `>= key`.
    pub fn find_ceiling(&self, key: &T) -> Option<(usize, &T)> {
        self.tree.find_ceiling(&self.slab, key).map(|idx| self.entry(idx))
    }

    pub fn first(&self) -> Option<(usize, &T)> {
        self.tree.first(&self.slab).map(|idx| self.entry(idx))
    }

    pub fn last(&self) -> Option<(usize, &T)> {
        self.tree.last(&self.slab).map(|idx| self.entry(idx))
    }

    /// Removes and returns the smallest value.
    pub fn pop_first(&mut self) -> Option<T> {
        let idx = self.tree.first(&self.slab)?;
        self.remove(idx)
    }

    /// Removes and returns the largest value.
    pub fn pop_last(&mut self) -> Option<T> {
        let idx = self.tree.last(&self.slab)?;
        self.remove(idx)
    }

    /// Iterates `(handle, &value)` pairs in ascending order.
    pub fn iter(&self) -> OwnedIter<'_, T, L> {
        OwnedIter {
            inner: self.tree.iter(&self.slab),
        }
    }

    /// Drops every value.
    pub fn clear(&mut self) {
        self.tree.clear(&mut self.slab);
        self.slab.clear();
    }

    /// Returns the number of levels on the longest path from the base.
    pub fn height(&self) -> usize {
        self.tree.height(&self.slab)
    }

    pub fn validate(&self) -> Result<(), Violation> {
        self.tree.validate(&self.slab)
    }

    /// Returns `true` if the tree is intact. Logs the first violation found.
    pub fn check(&self) -> bool {
        self.tree.check(&self.slab)
    }

    #[inline]
    fn entry(&self, idx: usize) -> (usize, &T) {
        (idx, &self.slab[idx].value)
    }
}

impl<T: Ord + 'static, L: ContainerLock> Default for OwnedTree<T, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + fmt::Debug + 'static, L: ContainerLock> fmt::Debug for OwnedTree<T, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, v)| v)).finish()
    }
}

impl<'a, T: Ord + 'static, L: ContainerLock> IntoIterator for &'a OwnedTree<T, L> {
    type Item = (usize, &'a T);
    type IntoIter = OwnedIter<'a, T, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over an [`OwnedTree`].
pub struct OwnedIter<'a, T: Ord + 'static, L: ContainerLock> {
    inner: Iter<'a, ByValue<T>, Slab<Entry<T>>, L>,
}

impl<'a, T: Ord + 'static, L: ContainerLock> Iterator for OwnedIter<'a, T, L> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(idx, entry)| (idx, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Ord + 'static, L: ContainerLock> DoubleEndedIterator for OwnedIter<'_, T, L> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(idx, entry)| (idx, &entry.value))
    }
}

impl<T: Ord + 'static, L: ContainerLock> ExactSizeIterator for OwnedIter<'_, T, L> {}

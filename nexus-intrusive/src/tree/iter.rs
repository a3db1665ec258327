use super::balance::Balance;
use super::link::{Nav, TreeAdapter};
use super::Tree;
use crate::lock::{ContainerLock, ReadGuard};
use crate::Storage;

/// In-order iterator over a tree, yielding `(index, &node)` pairs.
///
/// Holds a shared lock on the tree until dropped.
pub struct Iter<'a, A: TreeAdapter, S, L: ContainerLock> {
    storage: &'a S,
    front: A::Index,
    back: A::Index,
    remaining: usize,
    _guard: ReadGuard<'a, L>,
}

impl<'a, A, S, L> Iterator for Iter<'a, A, S, L>
where
    A: TreeAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
    type Item = (A::Index, &'a A::Node);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.front;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.front = A::successor(self.storage, idx);
        }
        Some((idx, A::node(self.storage, idx)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A, S, L> DoubleEndedIterator for Iter<'_, A, S, L>
where
    A: TreeAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.back;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.back = A::predecessor(self.storage, idx);
        }
        Some((idx, A::node(self.storage, idx)))
    }
}

impl<A, S, L> ExactSizeIterator for Iter<'_, A, S, L>
where
    A: TreeAdapter,
    S: Storage<A::Node, Index = A::Index>,
    L: ContainerLock,
{
}

impl<A, B, L> Tree<A, B, L>
where
    A: TreeAdapter,
    B: Balance,
    L: ContainerLock,
{
    /// Iterates nodes in ascending order.
    pub fn iter<'a, S>(&'a self, storage: &'a S) -> Iter<'a, A, S, L>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let guard = self.lock.read();
        Iter {
            storage,
            front: A::leftmost(storage, self.base),
            back: A::rightmost(storage, self.base),
            remaining: self.len,
            _guard: guard,
        }
    }
}

//! Structural validation.

use core::cmp::Ordering;

use super::balance::Balance;
use super::link::{Nav, TreeAdapter};
use super::shape::Probe;
use super::Tree;
use crate::error::{Violation, ViolationKind};
use crate::lock::ContainerLock;
use crate::{Index, Storage};

impl<A, B, L> Tree<A, B, L>
where
    A: TreeAdapter,
    B: Balance,
    L: ContainerLock,
{
    /// Returns `true` if every node satisfies the tree invariants. Logs the
    /// first violation found.
    pub fn check<S>(&self, storage: &S) -> bool
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        match self.validate(storage) {
            Ok(()) => true,
            Err(violation) => {
                tracing::warn!(tree = %self.id, %violation, "tree check failed");
                false
            }
        }
    }

    /// Walks the whole tree and reports the first broken invariant.
    ///
    /// Checks membership, parent/child back-links, base consistency, local
    /// ordering, in-order ordering, the balancer's per-node rules and the
    /// stored length.
    pub fn validate<S>(&self, storage: &S) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        self.validate_unlocked(storage)
    }

    /// Checks the invariants local to one node.
    pub fn check_node<S>(&self, storage: &S, idx: A::Index) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let _r = self.lock.read();
        self.check_node_unlocked(storage, idx)
    }

    pub(super) fn validate_unlocked<S>(&self, storage: &S) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        if self.base.is_none() {
            return if self.len == 0 {
                Ok(())
            } else {
                Err(Violation::container(ViolationKind::Length))
            };
        }
        if !storage.contains(self.base) {
            return Err(Violation::at(self.base.as_usize(), ViolationKind::Vacant));
        }

        // In-order walk bounded by the stored length, so a damaged parent
        // chain cannot loop forever.
        let mut count = 0;
        let mut prev = A::Index::NONE;
        let mut cursor = A::leftmost(storage, self.base);
        while cursor.is_some() {
            count += 1;
            if count > self.len {
                return Err(Violation::container(ViolationKind::Length));
            }
            self.check_node_unlocked(storage, cursor)?;

            if prev.is_some()
                && self
                    .adapter
                    .compare(A::node(storage, prev), A::node(storage, cursor))
                    == Ordering::Greater
            {
                return Err(Violation::at(cursor.as_usize(), ViolationKind::Order));
            }

            prev = cursor;
            cursor = A::successor(storage, cursor);
        }

        if count != self.len {
            return Err(Violation::container(ViolationKind::Length));
        }
        Ok(())
    }

    fn check_node_unlocked<S>(&self, storage: &S, idx: A::Index) -> Result<(), Violation>
    where
        S: Storage<A::Node, Index = A::Index>,
    {
        let at = |kind| Violation::at(idx.as_usize(), kind);

        let node = storage.get(idx).ok_or_else(|| at(ViolationKind::Vacant))?;
        let link = A::link(node);
        if link.owner != Some(self.id) {
            return Err(at(ViolationKind::NotMember));
        }

        if link.parent.is_none() != (self.base == idx) {
            return Err(at(ViolationKind::Base));
        }
        if link.parent.is_some() {
            let up = storage
                .get(link.parent)
                .map(A::link)
                .ok_or_else(|| at(ViolationKind::ParentLink))?;
            if up.left != idx && up.right != idx {
                return Err(at(ViolationKind::ParentLink));
            }
        }

        for (child, is_left) in [(link.left, true), (link.right, false)] {
            if child.is_none() {
                continue;
            }
            let child_node = storage.get(child).ok_or_else(|| at(ViolationKind::ChildLink))?;
            let child_link = A::link(child_node);
            if child_link.parent != idx {
                return Err(at(ViolationKind::ChildLink));
            }
            if child_link.owner != Some(self.id) {
                return Err(Violation::at(child.as_usize(), ViolationKind::NotMember));
            }

            let ordered = if is_left {
                self.adapter.compare(child_node, node) != Ordering::Greater
                    && self.adapter.compare(node, child_node) != Ordering::Less
            } else {
                self.adapter.compare(child_node, node) != Ordering::Less
                    && self.adapter.compare(node, child_node) != Ordering::Greater
            };
            if !ordered {
                return Err(Violation::at(child.as_usize(), ViolationKind::Order));
            }
        }

        self.balance
            .check_node(&Probe::<A, S>::new(storage), idx)
            .map_err(at)
    }
}

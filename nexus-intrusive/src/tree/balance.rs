//! Rebalancing policy hook.

use super::link::TreeAdapter;
use super::shape::{Probe, Shape};
use crate::error::ViolationKind;
use crate::lock::ContainerLock;
use crate::{Index, Storage};

/// Restores a tree's shape after a structural change.
///
/// The tree calls [`rebalance`](Balance::rebalance) once per insert and once
/// per remove, after the pointer relinking and before returning. `start` is
/// the freshly linked node on insert; on remove it is the deepest surviving
/// node whose child links changed (`NONE` when the tree became empty).
pub trait Balance: Default {
    fn rebalance<A, S, L>(&self, shape: &mut Shape<'_, '_, A, S, L>, start: A::Index)
    where
        A: TreeAdapter,
        S: Storage<A::Node, Index = A::Index>,
        L: ContainerLock;

    /// Checks the policy's per-node invariants.
    fn check_node<A, S>(&self, probe: &Probe<'_, A, S>, idx: A::Index) -> Result<(), ViolationKind>
    where
        A: TreeAdapter,
        S: Storage<A::Node, Index = A::Index>;
}

/// Plain binary search tree: no rebalancing, levels stay 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbalanced;

impl Balance for Unbalanced {
    #[inline]
    fn rebalance<A, S, L>(&self, _shape: &mut Shape<'_, '_, A, S, L>, _start: A::Index)
    where
        A: TreeAdapter,
        S: Storage<A::Node, Index = A::Index>,
        L: ContainerLock,
    {
    }

    fn check_node<A, S>(&self, probe: &Probe<'_, A, S>, idx: A::Index) -> Result<(), ViolationKind>
    where
        A: TreeAdapter,
        S: Storage<A::Node, Index = A::Index>,
    {
        debug_assert!(idx.is_some());
        if probe.level(idx) != 0 {
            return Err(ViolationKind::StrayLevel);
        }
        Ok(())
    }
}

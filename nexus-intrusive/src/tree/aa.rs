//! AA-tree balancing.
//!
//! Every node carries a level. The shape rules, with an absent node at
//! level 0:
//!
//! ```text
//! leaf                    level 1
//! left child              exactly one level below its parent
//! right child             same level as its parent, or one below
//! right-right grandchild  strictly below the node
//! level > 1               both children present
//! ```
//!
//! A right child on the parent's own level is a horizontal link; the rules
//! forbid left horizontal links and two horizontal links in a row, which
//! keeps the height within `2 * log2(n + 1)`.
//!
//! # Rebalance walk
//!
//! One upward walk handles both insert and remove. At each node with left
//! level `L`, right level `R` and right-right level `G`:
//!
//! ```text
//! L > R            rotate right, stay on the node
//! L == R || L == G level = L + 1, move to the parent
//! otherwise        rotate left, stay on the node
//! ```
//!
//! A rotation demotes the node one position below the pivot, so staying on
//! it re-examines its new neighbourhood; the pivot is revisited on a later
//! upward step.

use super::balance::Balance;
use super::link::TreeAdapter;
use super::shape::{Probe, Shape};
use crate::error::ViolationKind;
use crate::lock::ContainerLock;
use crate::{Index, Storage};

/// The AA-tree balancing policy.
#[derive(Debug, Default, Clone, Copy)]
pub struct AaBalance;

impl Balance for AaBalance {
    fn rebalance<A, S, L>(&self, shape: &mut Shape<'_, '_, A, S, L>, start: A::Index)
    where
        A: TreeAdapter,
        S: Storage<A::Node, Index = A::Index>,
        L: ContainerLock,
    {
        if start.is_some() && !shape.is_member(start) {
            return;
        }

        let mut node = start;
        while node.is_some() {
            let left = shape.left(node);
            let right = shape.right(node);
            let l = shape.level(left);
            let r = shape.level(right);
            let g = if right.is_some() {
                shape.level(shape.right(right))
            } else {
                0
            };

            if l > r {
                shape.rotate_right(node);
            } else if l == r || l == g {
                shape.set_level(node, l + 1);
                node = shape.parent(node);
            } else {
                shape.rotate_left(node);
            }
        }
    }

    fn check_node<A, S>(&self, probe: &Probe<'_, A, S>, idx: A::Index) -> Result<(), ViolationKind>
    where
        A: TreeAdapter,
        S: Storage<A::Node, Index = A::Index>,
    {
        let level = probe.level(idx);
        let left = probe.left(idx);
        let right = probe.right(idx);

        // Covers "leaf is level 1" and "level > 1 needs a left child".
        if probe.level(left) + 1 != level {
            return Err(ViolationKind::LeftLevel);
        }

        let r = probe.level(right);
        if r != level && r + 1 != level {
            return Err(ViolationKind::RightLevel);
        }

        if right.is_some() {
            let right_right = probe.right(right);
            if right_right.is_some() && probe.level(right_right) >= level {
                return Err(ViolationKind::RightRightLevel);
            }
        }

        Ok(())
    }
}

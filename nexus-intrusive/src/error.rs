//! Error types shared by every container.

use core::fmt;

use crate::ContainerId;

/// Error returned when linking a node that already belongs to another
/// container.
///
/// A container can only edit its own root state, so it cannot detach a node
/// from a foreign container on the caller's behalf. Remove it from `owner`
/// first, or use the destination's `transfer` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attached {
    /// The container the node is currently linked into.
    pub owner: ContainerId,
}

impl fmt::Display for Attached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node is already linked into container {}", self.owner)
    }
}

impl std::error::Error for Attached {}

/// The kind of structural damage found by a container check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// The index does not name an occupied storage slot.
    Vacant,
    /// The node's owner is not the container being checked.
    NotMember,
    /// A node with no parent is not the container's base, or the base has a
    /// parent.
    Base,
    /// The parent does not point back at the node.
    ParentLink,
    /// A child does not point back at the node.
    ChildLink,
    /// A neighbour in a list does not point back at the node.
    SiblingLink,
    /// A web link does not point back at the record whose chain holds it.
    Endpoint,
    /// Two adjacent nodes are out of order.
    Order,
    /// Left child level is not one below its parent.
    LeftLevel,
    /// Right child level is neither equal to nor one below its parent.
    RightLevel,
    /// Right-right grandchild level is not strictly below the node.
    RightRightLevel,
    /// A level is set on a tree that does not balance.
    StrayLevel,
    /// The number of reachable nodes disagrees with the stored length.
    Length,
    /// The container's head, tail or end-point bookkeeping is inconsistent.
    Ends,
}

impl ViolationKind {
    fn describe(self) -> &'static str {
        match self {
            Self::Vacant => "index does not name a stored node",
            Self::NotMember => "node belongs to a different container",
            Self::Base => "parentless node and base disagree",
            Self::ParentLink => "parent does not link back to node",
            Self::ChildLink => "child does not link back to node",
            Self::SiblingLink => "neighbour does not link back to node",
            Self::Endpoint => "link does not point back at its record",
            Self::Order => "nodes out of order",
            Self::LeftLevel => "left child level is not one below node",
            Self::RightLevel => "right child level out of range",
            Self::RightRightLevel => "right-right grandchild level not below node",
            Self::StrayLevel => "level set on an unbalanced tree",
            Self::Length => "reachable node count does not match length",
            Self::Ends => "container end points are inconsistent",
        }
    }
}

/// A broken container invariant, reported by `validate` and `check_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    /// The offending node, if the damage is attributable to one.
    pub node: Option<usize>,
    pub kind: ViolationKind,
}

impl Violation {
    pub(crate) fn at(node: usize, kind: ViolationKind) -> Self {
        Self {
            node: Some(node),
            kind,
        }
    }

    pub(crate) fn container(kind: ViolationKind) -> Self {
        Self { node: None, kind }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "invariant violated at node {}: {}", node, self.kind.describe()),
            None => write!(f, "invariant violated: {}", self.kind.describe()),
        }
    }
}

impl std::error::Error for Violation {}

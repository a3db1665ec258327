//! Intrusive linked lists over caller-owned storage.
//!
//! | List              | Link           | Natural add      | Remove |
//! |-------------------|----------------|------------------|--------|
//! | [`SList`]         | [`SListLink`]  | `push_front`     | O(n)   |
//! | [`DList`]         | [`DListLink`]  | `push_back`      | O(1)   |
//! | [`SortedSList`]   | [`SListLink`]  | `insert` by order | O(n)  |
//! | [`SortedDList`]   | [`DListLink`]  | `insert` by order | O(1)  |
//!
//! Like the trees, lists store only their end points, length and id. A
//! record joins several lists by embedding one link per relationship, each
//! reached through its own adapter.

mod dlist;
mod slist;
mod sorted;

pub use dlist::{DList, DListAdapter, DListIter, DListLink};
pub use slist::{SList, SListAdapter, SListIter, SListLink};
pub use sorted::{ListOrder, SortedDList, SortedSList};

use crate::ContainerId;
use crate::error::Attached;

/// Decides whether a node with `owner` may be linked into container `id`:
/// `Ok(true)` if detached, `Ok(false)` if already a member.
#[inline]
pub(crate) fn admit(owner: Option<ContainerId>, id: ContainerId) -> Result<bool, Attached> {
    match owner {
        None => Ok(true),
        Some(owner) if owner == id => Ok(false),
        Some(owner) => Err(Attached { owner }),
    }
}

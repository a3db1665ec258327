//! Intrusive containers over caller-owned storage.
//!
//! Records carry their own link fields; containers hold only a handful of
//! indices into storage the caller owns. One record can sit in several
//! containers at once by embedding one link per relationship:
//!
//! ```text
//! Storage (Slab, Arena) - owns the records, hands out stable indices
//! Tree / List / Web     - thread the records together through their links
//! ```
//!
//! Benefits:
//! - **No allocation on link/unlink**: moving a record between containers
//!   touches only link fields
//! - **Many relationships per record**: an order can be in a price tree and
//!   a per-account list at the same time
//! - **Stable indices**: unlinking never moves a record
//!
//! # Quick Start
//!
//! ```
//! use core::cmp::Ordering;
//! use nexus_intrusive::{AaTree, DList, DListAdapter, DListLink, TreeAdapter, TreeLink};
//!
//! struct Order {
//!     price: u64,
//!     by_price: TreeLink<usize>,
//!     by_account: DListLink<usize>,
//! }
//!
//! struct ByPrice;
//!
//! impl TreeAdapter for ByPrice {
//!     type Node = Order;
//!     type Index = usize;
//!     type Key = u64;
//!
//!     fn link(o: &Order) -> &TreeLink<usize> { &o.by_price }
//!     fn link_mut(o: &mut Order) -> &mut TreeLink<usize> { &mut o.by_price }
//!     fn compare(&self, a: &Order, b: &Order) -> Ordering { a.price.cmp(&b.price) }
//!     fn compare_key(&self, o: &Order, price: &u64) -> Ordering { o.price.cmp(price) }
//! }
//!
//! struct ByAccount;
//!
//! impl DListAdapter for ByAccount {
//!     type Node = Order;
//!     type Index = usize;
//!
//!     fn link(o: &Order) -> &DListLink<usize> { &o.by_account }
//!     fn link_mut(o: &mut Order) -> &mut DListLink<usize> { &mut o.by_account }
//! }
//!
//! let mut orders = slab::Slab::new();
//! let mut book: AaTree<ByPrice> = AaTree::new(ByPrice);
//! let mut account: DList<ByAccount> = DList::new(ByAccount);
//!
//! for price in [101, 99, 100] {
//!     let idx = orders.insert(Order {
//!         price,
//!         by_price: TreeLink::new(),
//!         by_account: DListLink::new(),
//!     });
//!     book.insert(&mut orders, idx).unwrap();
//!     account.push_back(&mut orders, idx).unwrap();
//! }
//!
//! let best = book.first(&orders).unwrap();
//! assert_eq!(orders[best].price, 99);
//!
//! // Cancel: unlink from both, then free the record.
//! book.remove(&mut orders, best);
//! account.remove(&mut orders, best);
//! orders.remove(best);
//! assert_eq!(book.len(), 2);
//! assert_eq!(account.len(), 2);
//! ```
//!
//! # Same Storage Instance
//!
//! All calls on one container must pass the same storage instance, and a
//! record must be unlinked from every container before it is removed from
//! storage. Breaking either rule cannot cause undefined behaviour, but the
//! container will follow stale indices: expect panics on vacant slots or
//! silently wrong answers. `check` and `validate` find the damage.
//!
//! # Containers
//!
//! | Container | Link | Ordered | Remove |
//! |-----------|------|---------|--------|
//! | [`Tree`] | [`TreeLink`] | yes, unbalanced | O(depth) |
//! | [`AaTree`] | [`TreeLink`] | yes, O(log n) height | O(log n) |
//! | [`SList`] | [`SListLink`] | no | O(n) |
//! | [`DList`] | [`DListLink`] | no | O(1) |
//! | [`SortedSList`] / [`SortedDList`] | list links | yes, O(n) insert | as above |
//! | [`Web`] | [`WebEnds`] + [`WebLink`] | no | O(1) per link |
//! | [`OwnedTree`] | internal | yes | O(log n) |
//!
//! # Locking
//!
//! Every container takes a [`ContainerLock`] type parameter, [`NoLock`] by
//! default. See [`lock`] for the available strategies.
//!
//! # Feature Flags
//!
//! - `checked` - validate the whole container after every mutation and panic
//!   on the first broken invariant

pub mod error;
pub mod id;
pub mod index;
pub mod list;
pub mod lock;
pub mod owned;
pub mod storage;
pub mod tree;
pub mod web;

pub use error::{Attached, Violation, ViolationKind};
pub use id::ContainerId;
pub use index::Index;
pub use list::{
    DList, DListAdapter, DListIter, DListLink, ListOrder, SList, SListAdapter, SListIter,
    SListLink, SortedDList, SortedSList,
};
pub use lock::{ContainerLock, MutexLock, NoLock, RwLock, SpinLock};
pub use owned::{OwnedIter, OwnedTree};
pub use storage::{Arena, Storage};
pub use tree::{
    AaBalance, AaTree, Balance, Iter, Probe, Shape, Tree, TreeAdapter, TreeLink, Unbalanced,
};
pub use web::{Strand, Web, WebAdapter, WebEnds, WebIter, WebLink};

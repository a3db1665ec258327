//! Many-to-many relationships between two record types.
//!
//! A [`Web`] joins "left" records to "right" records through caller-allocated
//! link records. Every left and right record embeds a [`WebEnds`] holding the
//! ends of its chain of links; every link record embeds a [`WebLink`] that
//! sits in two doubly linked chains at once, one per side.
//!
//! ```text
//!   left A ──► link ──► link           (A's chain)
//!               │        │
//!   right X ◄───┘        └──► right Y   (each link is also in X's or Y's chain)
//! ```
//!
//! Left, right and link records may live in three different storages, all
//! addressed by the same index type.

use core::marker::PhantomData;

use crate::error::{Attached, Violation, ViolationKind};
use crate::list::admit;
use crate::lock::{ContainerLock, NoLock, ReadGuard};
use crate::{ContainerId, Index, Storage};

/// Chain ends embedded in every left and right record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebEnds<Idx: Index> {
    first: Idx,
    last: Idx,
    len: usize,
}

impl<Idx: Index> WebEnds<Idx> {
    pub const fn new() -> Self {
        Self {
            first: Idx::NONE,
            last: Idx::NONE,
            len: 0,
        }
    }

    #[inline]
    pub const fn first(&self) -> Idx {
        self.first
    }

    #[inline]
    pub const fn last(&self) -> Idx {
        self.last
    }

    /// Number of links attached to the record.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<Idx: Index> Default for WebEnds<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

/// One side of a [`WebLink`]: the record it joins and its neighbours in that
/// record's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strand<Idx: Index> {
    record: Idx,
    prev: Idx,
    next: Idx,
}

impl<Idx: Index> Strand<Idx> {
    const DETACHED: Self = Self {
        record: Idx::NONE,
        prev: Idx::NONE,
        next: Idx::NONE,
    };

    #[inline]
    pub const fn record(&self) -> Idx {
        self.record
    }

    #[inline]
    pub const fn prev(&self) -> Idx {
        self.prev
    }

    #[inline]
    pub const fn next(&self) -> Idx {
        self.next
    }
}

/// Link block embedded in every link record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebLink<Idx: Index> {
    owner: Option<ContainerId>,
    left: Strand<Idx>,
    right: Strand<Idx>,
}

impl<Idx: Index> WebLink<Idx> {
    pub const fn new() -> Self {
        Self {
            owner: None,
            left: Strand::DETACHED,
            right: Strand::DETACHED,
        }
    }

    #[inline]
    pub const fn owner(&self) -> Option<ContainerId> {
        self.owner
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.owner.is_some()
    }

    /// Position in the left record's chain.
    #[inline]
    pub const fn left(&self) -> &Strand<Idx> {
        &self.left
    }

    /// Position in the right record's chain.
    #[inline]
    pub const fn right(&self) -> &Strand<Idx> {
        &self.right
    }
}

impl<Idx: Index> Default for WebLink<Idx> {
    fn default() -> Self {
        Self::new()
    }
}

/// Locates the web fields inside the three record types.
pub trait WebAdapter {
    type Left: 'static;
    type Right: 'static;
    type Link: 'static;
    type Index: Index;

    fn left_ends(left: &Self::Left) -> &WebEnds<Self::Index>;

    fn left_ends_mut(left: &mut Self::Left) -> &mut WebEnds<Self::Index>;

    fn right_ends(right: &Self::Right) -> &WebEnds<Self::Index>;

    fn right_ends_mut(right: &mut Self::Right) -> &mut WebEnds<Self::Index>;

    fn link(link: &Self::Link) -> &WebLink<Self::Index>;

    fn link_mut(link: &mut Self::Link) -> &mut WebLink<Self::Index>;
}

// =============================================================================
// Side-generic chain primitives
// =============================================================================

/// Selects one side of the web: which record type holds the chain ends and
/// which strand of a link threads that chain.
trait Side<A: WebAdapter> {
    type Record;

    fn ends(record: &Self::Record) -> &WebEnds<A::Index>;

    fn ends_mut(record: &mut Self::Record) -> &mut WebEnds<A::Index>;

    fn strand(link: &WebLink<A::Index>) -> &Strand<A::Index>;

    fn strand_mut(link: &mut WebLink<A::Index>) -> &mut Strand<A::Index>;
}

struct LeftSide;
struct RightSide;

impl<A: WebAdapter> Side<A> for LeftSide {
    type Record = A::Left;

    fn ends(record: &A::Left) -> &WebEnds<A::Index> {
        A::left_ends(record)
    }

    fn ends_mut(record: &mut A::Left) -> &mut WebEnds<A::Index> {
        A::left_ends_mut(record)
    }

    fn strand(link: &WebLink<A::Index>) -> &Strand<A::Index> {
        &link.left
    }

    fn strand_mut(link: &mut WebLink<A::Index>) -> &mut Strand<A::Index> {
        &mut link.left
    }
}

impl<A: WebAdapter> Side<A> for RightSide {
    type Record = A::Right;

    fn ends(record: &A::Right) -> &WebEnds<A::Index> {
        A::right_ends(record)
    }

    fn ends_mut(record: &mut A::Right) -> &mut WebEnds<A::Index> {
        A::right_ends_mut(record)
    }

    fn strand(link: &WebLink<A::Index>) -> &Strand<A::Index> {
        &link.right
    }

    fn strand_mut(link: &mut WebLink<A::Index>) -> &mut Strand<A::Index> {
        &mut link.right
    }
}

#[inline]
fn web_link<A, K>(links: &K, idx: A::Index) -> &WebLink<A::Index>
where
    A: WebAdapter,
    K: Storage<A::Link, Index = A::Index>,
{
    A::link(links.get(idx).expect("invalid index"))
}

#[inline]
fn web_link_mut<A, K>(links: &mut K, idx: A::Index) -> &mut WebLink<A::Index>
where
    A: WebAdapter,
    K: Storage<A::Link, Index = A::Index>,
{
    A::link_mut(links.get_mut(idx).expect("invalid index"))
}

/// Threads `link` onto one end of `record`'s chain.
fn thread<A, E, R, K>(records: &mut R, links: &mut K, record: A::Index, link: A::Index, front: bool)
where
    A: WebAdapter,
    E: Side<A>,
    R: Storage<E::Record, Index = A::Index>,
    K: Storage<A::Link, Index = A::Index>,
{
    let ends = E::ends_mut(records.get_mut(record).expect("invalid index"));
    let (prev, next) = if front {
        (A::Index::NONE, ends.first)
    } else {
        (ends.last, A::Index::NONE)
    };
    if prev.is_none() {
        ends.first = link;
    }
    if next.is_none() {
        ends.last = link;
    }
    ends.len += 1;

    *E::strand_mut(web_link_mut::<A, K>(links, link)) = Strand { record, prev, next };
    if prev.is_some() {
        E::strand_mut(web_link_mut::<A, K>(links, prev)).next = link;
    }
    if next.is_some() {
        E::strand_mut(web_link_mut::<A, K>(links, next)).prev = link;
    }
}

/// Takes `link` out of the chain it threads on side `E`.
fn unthread<A, E, R, K>(records: &mut R, links: &mut K, link: A::Index)
where
    A: WebAdapter,
    E: Side<A>,
    R: Storage<E::Record, Index = A::Index>,
    K: Storage<A::Link, Index = A::Index>,
{
    let strand = *E::strand(web_link::<A, K>(links, link));
    let ends = E::ends_mut(records.get_mut(strand.record).expect("invalid index"));

    if strand.prev.is_some() {
        E::strand_mut(web_link_mut::<A, K>(links, strand.prev)).next = strand.next;
    } else {
        ends.first = strand.next;
    }
    if strand.next.is_some() {
        E::strand_mut(web_link_mut::<A, K>(links, strand.next)).prev = strand.prev;
    } else {
        ends.last = strand.prev;
    }
    ends.len -= 1;

    *E::strand_mut(web_link_mut::<A, K>(links, link)) = Strand::DETACHED;
}

fn validate_chain<A, E, R, K>(
    id: ContainerId,
    records: &R,
    links: &K,
    record: A::Index,
) -> Result<(), Violation>
where
    A: WebAdapter,
    E: Side<A>,
    R: Storage<E::Record, Index = A::Index>,
    K: Storage<A::Link, Index = A::Index>,
{
    let ends = E::ends(
        records
            .get(record)
            .ok_or(Violation::at(record.as_usize(), ViolationKind::Vacant))?,
    );
    if ends.first.is_none() || ends.last.is_none() {
        return if ends.first.is_none() && ends.last.is_none() && ends.len == 0 {
            Ok(())
        } else {
            Err(Violation::at(record.as_usize(), ViolationKind::Ends))
        };
    }

    let mut count = 0;
    let mut prev = A::Index::NONE;
    let mut idx = ends.first;
    while idx.is_some() {
        count += 1;
        if count > ends.len {
            return Err(Violation::at(record.as_usize(), ViolationKind::Length));
        }

        let link = A::link(
            links
                .get(idx)
                .ok_or(Violation::at(idx.as_usize(), ViolationKind::Vacant))?,
        );
        if link.owner != Some(id) {
            return Err(Violation::at(idx.as_usize(), ViolationKind::NotMember));
        }
        let strand = E::strand(link);
        if strand.record != record {
            return Err(Violation::at(idx.as_usize(), ViolationKind::Endpoint));
        }
        if strand.prev != prev {
            return Err(Violation::at(idx.as_usize(), ViolationKind::SiblingLink));
        }

        prev = idx;
        idx = strand.next;
    }

    if prev != ends.last {
        return Err(Violation::at(record.as_usize(), ViolationKind::Ends));
    }
    if count != ends.len {
        return Err(Violation::at(record.as_usize(), ViolationKind::Length));
    }
    Ok(())
}

// =============================================================================
// Web
// =============================================================================

/// A many-to-many relationship over external storage.
///
/// The web itself only stores its id and the total number of links.
///
/// # Example
///
/// ```
/// use nexus_intrusive::{Web, WebAdapter, WebEnds, WebLink};
/// use slab::Slab;
///
/// struct Student { name: &'static str, ends: WebEnds<usize> }
/// struct Course { code: u32, ends: WebEnds<usize> }
/// struct Seat { link: WebLink<usize> }
///
/// struct Enrolment;
///
/// impl WebAdapter for Enrolment {
///     type Left = Student;
///     type Right = Course;
///     type Link = Seat;
///     type Index = usize;
///
///     fn left_ends(s: &Student) -> &WebEnds<usize> { &s.ends }
///     fn left_ends_mut(s: &mut Student) -> &mut WebEnds<usize> { &mut s.ends }
///     fn right_ends(c: &Course) -> &WebEnds<usize> { &c.ends }
///     fn right_ends_mut(c: &mut Course) -> &mut WebEnds<usize> { &mut c.ends }
///     fn link(s: &Seat) -> &WebLink<usize> { &s.link }
///     fn link_mut(s: &mut Seat) -> &mut WebLink<usize> { &mut s.link }
/// }
///
/// let mut students = Slab::new();
/// let mut courses = Slab::new();
/// let mut seats = Slab::new();
/// let mut web: Web<Enrolment> = Web::new(Enrolment);
///
/// let ada = students.insert(Student { name: "ada", ends: WebEnds::new() });
/// let maths = courses.insert(Course { code: 101, ends: WebEnds::new() });
/// let seat = seats.insert(Seat { link: WebLink::new() });
///
/// web.connect(&mut students, &mut courses, &mut seats, ada, maths, seat).unwrap();
/// assert!(web.is_connected(&students, &seats, ada, maths));
///
/// let codes: Vec<u32> = web
///     .links_of_left(&students, &seats, ada)
///     .map(|(_, seat)| courses[seat.link.right().record()].code)
///     .collect();
/// assert_eq!(codes, vec![101]);
/// ```
pub struct Web<A: WebAdapter, L: ContainerLock = NoLock> {
    id: ContainerId,
    len: usize,
    adapter: A,
    lock: L,
}

impl<A, L> Web<A, L>
where
    A: WebAdapter,
    L: ContainerLock,
{
    pub fn new(adapter: A) -> Self {
        Self::with_lock(adapter, L::default())
    }

    pub fn with_lock(adapter: A, lock: L) -> Self {
        Self {
            id: ContainerId::next(),
            len: 0,
            adapter,
            lock,
        }
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// Returns the total number of links in the web.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Joins `left` and `right` through `link`, appending the link to the end
    /// of both records' chains.
    ///
    /// Returns `Ok(false)` without changes if `link` is already in this web.
    ///
    /// # Errors
    ///
    /// Returns [`Attached`] if `link` belongs to another web.
    pub fn connect<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        left: A::Index,
        right: A::Index,
        link: A::Index,
    ) -> Result<bool, Attached>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        self.join(lefts, rights, links, left, right, link, false)
    }

    /// Like [`connect`](Self::connect), but puts the link at the front of both
    /// chains.
    pub fn connect_front<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        left: A::Index,
        right: A::Index,
        link: A::Index,
    ) -> Result<bool, Attached>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        self.join(lefts, rights, links, left, right, link, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn join<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        left: A::Index,
        right: A::Index,
        link: A::Index,
        front: bool,
    ) -> Result<bool, Attached>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !admit(web_link::<A, SK>(links, link).owner, self.id)? {
            return Ok(false);
        }

        let _w = guard.write();
        thread::<A, LeftSide, _, _>(lefts, links, left, link, front);
        thread::<A, RightSide, _, _>(rights, links, right, link, front);
        web_link_mut::<A, SK>(links, link).owner = Some(self.id);
        self.len += 1;

        tracing::trace!(web = %self.id, ?left, ?right, ?link, "connected");
        Ok(true)
    }

    /// Removes the first link joining `left` to `right` and returns it.
    pub fn disconnect<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        left: A::Index,
        right: A::Index,
    ) -> Option<A::Index>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        let link = self.find_link(lefts, links, left, right)?;

        let _w = guard.write();
        Self::sever(lefts, rights, links, link);
        self.len -= 1;
        tracing::trace!(web = %self.id, ?left, ?right, ?link, "disconnected");
        Some(link)
    }

    /// Removes `link` from the web.
    ///
    /// Returns `false` if the link is not in this web.
    pub fn unlink<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        link: A::Index,
    ) -> bool
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let mut guard = self.lock.upgradable();
        if !self.owns(links, link) {
            return false;
        }

        let _w = guard.write();
        Self::sever(lefts, rights, links, link);
        self.len -= 1;
        tracing::trace!(web = %self.id, ?link, "unlinked");
        true
    }

    /// Returns `true` if some link joins `left` to `right`.
    pub fn is_connected<SL, SK>(&self, lefts: &SL, links: &SK, left: A::Index, right: A::Index) -> bool
    where
        SL: Storage<A::Left, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let _r = self.lock.read();
        self.find_link(lefts, links, left, right).is_some()
    }

    /// Returns `true` if `link` is in this web.
    pub fn contains<SK>(&self, links: &SK, link: A::Index) -> bool
    where
        SK: Storage<A::Link, Index = A::Index>,
    {
        let _r = self.lock.read();
        self.owns(links, link)
    }

    /// Iterates the links of a left record, in chain order.
    pub fn links_of_left<'a, SL, SK>(&'a self, lefts: &SL, links: &'a SK, left: A::Index) -> WebIter<'a, A, SK, L>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let guard = self.lock.read();
        let ends = *A::left_ends(lefts.get(left).expect("invalid index"));
        WebIter {
            links,
            cursor: ends.first,
            remaining: ends.len,
            strand: WebLink::left,
            _guard: guard,
            _adapter: PhantomData,
        }
    }

    /// Iterates the links of a right record, in chain order.
    pub fn links_of_right<'a, SR, SK>(&'a self, rights: &SR, links: &'a SK, right: A::Index) -> WebIter<'a, A, SK, L>
    where
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let guard = self.lock.read();
        let ends = *A::right_ends(rights.get(right).expect("invalid index"));
        WebIter {
            links,
            cursor: ends.first,
            remaining: ends.len,
            strand: WebLink::right,
            _guard: guard,
            _adapter: PhantomData,
        }
    }

    /// Removes every link of a left record. Returns how many were removed.
    pub fn clear_left<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        left: A::Index,
    ) -> usize
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let _w = self.lock.write();
        let mut removed = 0;
        loop {
            let link = A::left_ends(lefts.get(left).expect("invalid index")).first;
            if link.is_none() {
                break;
            }
            Self::sever(lefts, rights, links, link);
            removed += 1;
        }
        self.len -= removed;
        tracing::debug!(web = %self.id, ?left, removed, "cleared left record");
        removed
    }

    /// Removes every link of a right record. Returns how many were removed.
    pub fn clear_right<SL, SR, SK>(
        &mut self,
        lefts: &mut SL,
        rights: &mut SR,
        links: &mut SK,
        right: A::Index,
    ) -> usize
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let _w = self.lock.write();
        let mut removed = 0;
        loop {
            let link = A::right_ends(rights.get(right).expect("invalid index")).first;
            if link.is_none() {
                break;
            }
            Self::sever(lefts, rights, links, link);
            removed += 1;
        }
        self.len -= removed;
        tracing::debug!(web = %self.id, ?right, removed, "cleared right record");
        removed
    }

    /// Walks a left record's chain and reports the first broken invariant.
    pub fn validate_left<SL, SK>(&self, lefts: &SL, links: &SK, left: A::Index) -> Result<(), Violation>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let _r = self.lock.read();
        validate_chain::<A, LeftSide, _, _>(self.id, lefts, links, left)
    }

    /// Walks a right record's chain and reports the first broken invariant.
    pub fn validate_right<SR, SK>(&self, rights: &SR, links: &SK, right: A::Index) -> Result<(), Violation>
    where
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let _r = self.lock.read();
        validate_chain::<A, RightSide, _, _>(self.id, rights, links, right)
    }

    #[inline]
    fn owns<SK>(&self, links: &SK, link: A::Index) -> bool
    where
        SK: Storage<A::Link, Index = A::Index>,
    {
        links
            .get(link)
            .is_some_and(|l| A::link(l).owner == Some(self.id))
    }

    fn find_link<SL, SK>(&self, lefts: &SL, links: &SK, left: A::Index, right: A::Index) -> Option<A::Index>
    where
        SL: Storage<A::Left, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        let mut idx = A::left_ends(lefts.get(left)?).first;
        while idx.is_some() {
            let link = web_link::<A, SK>(links, idx);
            if link.owner == Some(self.id) && link.right.record == right {
                return Some(idx);
            }
            idx = link.left.next;
        }
        None
    }

    /// Unthreads a member link from both chains and resets it.
    fn sever<SL, SR, SK>(lefts: &mut SL, rights: &mut SR, links: &mut SK, link: A::Index)
    where
        SL: Storage<A::Left, Index = A::Index>,
        SR: Storage<A::Right, Index = A::Index>,
        SK: Storage<A::Link, Index = A::Index>,
    {
        unthread::<A, LeftSide, _, _>(lefts, links, link);
        unthread::<A, RightSide, _, _>(rights, links, link);
        web_link_mut::<A, SK>(links, link).owner = None;
    }
}

/// Iterator over one record's links, yielding `(index, &link_record)` pairs.
pub struct WebIter<'a, A: WebAdapter, K, L: ContainerLock> {
    links: &'a K,
    cursor: A::Index,
    remaining: usize,
    strand: fn(&WebLink<A::Index>) -> &Strand<A::Index>,
    _guard: ReadGuard<'a, L>,
    _adapter: PhantomData<fn() -> A>,
}

impl<'a, A, K, L> Iterator for WebIter<'a, A, K, L>
where
    A: WebAdapter,
    K: Storage<A::Link, Index = A::Index>,
    L: ContainerLock,
{
    type Item = (A::Index, &'a A::Link);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let idx = self.cursor;
        let record = self.links.get(idx).expect("invalid index");
        self.cursor = (self.strand)(A::link(record)).next;
        self.remaining -= 1;
        Some((idx, record))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<A, K, L> ExactSizeIterator for WebIter<'_, A, K, L>
where
    A: WebAdapter,
    K: Storage<A::Link, Index = A::Index>,
    L: ContainerLock,
{
}

//! Caller-owned node storage addressed by stable indices.
//!
//! Containers in this crate never own or allocate nodes. They borrow the
//! storage for the duration of each call and follow the link fields embedded
//! in the records it holds. Any arena whose indices stay valid while a node is
//! linked can back a container.

use core::marker::PhantomData;
use core::ops;

use crate::Index;

/// Index-addressed storage for node records.
///
/// # Requirements
///
/// Implementations must provide:
/// - **Stable indices**: an index keeps naming the same record until the
///   caller removes it
/// - **O(1)** lookup
/// - `get(Index::NONE)` returning `None`
///
/// # Implementations
///
/// - `slab::Slab<T>` - growable, slot reuse
/// - `Vec<T>` - append-only, `usize` indices
/// - [`Arena<T, Idx>`] - append-only, any [`Index`] width
///
/// Removing a record from storage while it is still linked into a container
/// leaves that container with a dangling index. Unlink first.
pub trait Storage<T> {
    /// Index type for this storage.
    type Index: Index;

    /// Returns a reference to the record at `index`, if present.
    fn get(&self, index: Self::Index) -> Option<&T>;

    /// Returns a mutable reference to the record at `index`, if present.
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T>;

    /// Returns `true` if `index` names an occupied slot.
    #[inline]
    fn contains(&self, index: Self::Index) -> bool {
        self.get(index).is_some()
    }
}

// =============================================================================
// slab::Slab implementation
// =============================================================================

impl<T> Storage<T> for slab::Slab<T> {
    type Index = usize;

    #[inline]
    fn get(&self, index: Self::Index) -> Option<&T> {
        slab::Slab::get(self, index)
    }

    #[inline]
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T> {
        slab::Slab::get_mut(self, index)
    }
}

// =============================================================================
// Vec implementation
// =============================================================================

impl<T> Storage<T> for Vec<T> {
    type Index = usize;

    #[inline]
    fn get(&self, index: Self::Index) -> Option<&T> {
        self.as_slice().get(index)
    }

    #[inline]
    fn get_mut(&mut self, index: Self::Index) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }
}

// =============================================================================
// Arena
// =============================================================================

/// Append-only storage addressed by a narrow index type.
///
/// Records are never removed, so every index handed out by [`push`] stays
/// valid for the arena's lifetime. Useful when nodes are preallocated at
/// startup and links should stay small (`u16`/`u32` indices).
///
/// [`push`]: Arena::push
#[derive(Debug, Clone)]
pub struct Arena<T, Idx: Index = u32> {
    items: Vec<T>,
    _idx: PhantomData<Idx>,
}

impl<T, Idx: Index> Arena<T, Idx> {
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            _idx: PhantomData,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            _idx: PhantomData,
        }
    }

    /// Appends a record and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if the index type cannot address another record.
    pub fn push(&mut self, value: T) -> Idx {
        let Some(idx) = Idx::try_from_usize(self.items.len()) else {
            panic!("arena index space exhausted");
        };
        self.items.push(value);
        idx
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates `(index, &record)` pairs in push order.
    pub fn iter(&self) -> impl Iterator<Item = (Idx, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| (Idx::from_usize(i), item))
    }
}

impl<T, Idx: Index> Default for Arena<T, Idx> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Idx: Index> FromIterator<T> for Arena<T, Idx> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut arena = Self::new();
        for item in iter {
            arena.push(item);
        }
        arena
    }
}

impl<T, Idx: Index> Storage<T> for Arena<T, Idx> {
    type Index = Idx;

    #[inline]
    fn get(&self, index: Idx) -> Option<&T> {
        if index.is_none() {
            return None;
        }
        self.items.get(index.as_usize())
    }

    #[inline]
    fn get_mut(&mut self, index: Idx) -> Option<&mut T> {
        if index.is_none() {
            return None;
        }
        self.items.get_mut(index.as_usize())
    }
}

impl<T, Idx: Index> ops::Index<Idx> for Arena<T, Idx> {
    type Output = T;

    #[inline]
    fn index(&self, index: Idx) -> &T {
        Storage::get(self, index).expect("invalid index")
    }
}

impl<T, Idx: Index> ops::IndexMut<Idx> for Arena<T, Idx> {
    #[inline]
    fn index_mut(&mut self, index: Idx) -> &mut T {
        Storage::get_mut(self, index).expect("invalid index")
    }
}

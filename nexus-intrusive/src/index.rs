//! Node indices with a reserved "absent" value.
//!
//! Link fields store a bare index instead of `Option<Idx>`. The largest value
//! of each unsigned type is reserved to mean "no node", so a `TreeLink<u16>`
//! costs eight bytes plus its owner id, and a storage slot at that position
//! can never be linked.

/// A copyable node index whose maximum value means "no node".
///
/// # Example
///
/// ```
/// use nexus_intrusive::Index;
///
/// let idx: u32 = 5;
/// assert!(idx.is_some());
/// assert_eq!(u32::NONE.into_option(), None);
///
/// // 255 is the u8 sentinel, 256 does not fit at all.
/// assert_eq!(u8::try_from_usize(254), Some(254));
/// assert_eq!(u8::try_from_usize(255), None);
/// assert_eq!(u8::try_from_usize(256), None);
/// ```
pub trait Index: Copy + Eq + core::fmt::Debug {
    /// The reserved "no node" value.
    const NONE: Self;

    fn as_usize(self) -> usize;

    /// Converts a storage position, or `None` if it is not addressable:
    /// out of range for the type, or equal to [`NONE`](Self::NONE).
    fn try_from_usize(val: usize) -> Option<Self>;

    /// Like [`try_from_usize`](Self::try_from_usize), collapsing
    /// unaddressable positions to `NONE`.
    #[inline]
    fn from_usize(val: usize) -> Self {
        Self::try_from_usize(val).unwrap_or(Self::NONE)
    }

    #[inline]
    fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    fn is_some(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    fn into_option(self) -> Option<Self> {
        self.is_some().then_some(self)
    }
}

macro_rules! unsigned_index {
    ($($ty:ty),*) => {$(
        impl Index for $ty {
            const NONE: Self = <$ty>::MAX;

            #[inline]
            fn as_usize(self) -> usize {
                self as usize
            }

            #[inline]
            fn try_from_usize(val: usize) -> Option<Self> {
                <$ty>::try_from(val).ok().filter(|&idx| idx != Self::NONE)
            }
        }
    )*};
}

unsigned_index!(u8, u16, u32, u64, usize);

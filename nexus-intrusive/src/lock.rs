//! Pluggable container locking.
//!
//! Every container is generic over a [`ContainerLock`] strategy and takes
//! its lock in one of three tiers:
//!
//! ```text
//! shared      - searches and iteration; any number at once
//! upgradable  - insert/remove while they walk and validate; coexists with
//!               shared holders, excludes other upgradable and exclusive
//! exclusive   - the pointer relinking itself; promoted from upgradable for
//!               as short a window as possible, then demoted back
//! ```
//!
//! The default strategy is [`NoLock`], which compiles to nothing. Mutation
//! already requires `&mut` access to the container and its storage, so the
//! locked strategies matter only to embedders that share a container through
//! their own synchronization and want readers and writers to honour the same
//! protocol.
//!
//! | Strategy      | Backing                               | Tiers                      |
//! |---------------|---------------------------------------|----------------------------|
//! | [`NoLock`]    | none                                  | all no-ops                 |
//! | [`RwLock`]    | `parking_lot::RawRwLock`              | shared/upgradable/exclusive |
//! | [`MutexLock`] | `parking_lot::RawMutex`               | every tier exclusive        |
//! | [`SpinLock`]  | atomic word + `crossbeam_utils::Backoff` | shared/upgradable/exclusive |
//!
//! Locks are not re-entrant. Containers take exactly one tier per public
//! call and never call back into their own public API while holding it.

use core::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::lock_api::{
    RawMutex as _, RawRwLock as _, RawRwLockUpgrade as _, RawRwLockUpgradeDowngrade as _,
};

/// A three-tier lock strategy for a container.
///
/// While an exclusive lock (taken directly or by `upgrade`) is held, no other
/// lock may be granted, and at most one upgradable lock may be held at a
/// time. [`NoLock`] grants everything; containers never depend on the lock
/// for memory safety, only for the protocol they expose to embedders.
pub trait ContainerLock: Default {
    fn lock_shared(&self);

    /// # Safety
    ///
    /// The caller must hold a shared lock.
    unsafe fn unlock_shared(&self);

    fn lock_upgradable(&self);

    /// # Safety
    ///
    /// The caller must hold the upgradable lock.
    unsafe fn unlock_upgradable(&self);

    /// Promotes the held upgradable lock to exclusive, waiting for shared
    /// holders to drain.
    ///
    /// # Safety
    ///
    /// The caller must hold the upgradable lock.
    unsafe fn upgrade(&self);

    /// Demotes an exclusive lock obtained through [`upgrade`](Self::upgrade)
    /// back to upgradable.
    ///
    /// # Safety
    ///
    /// The caller must hold an exclusive lock obtained through `upgrade`.
    unsafe fn downgrade_to_upgradable(&self);

    fn lock_exclusive(&self);

    /// # Safety
    ///
    /// The caller must hold an exclusive lock taken with `lock_exclusive`.
    unsafe fn unlock_exclusive(&self);

    /// Takes a shared lock for the lifetime of the returned guard.
    #[inline]
    fn read(&self) -> ReadGuard<'_, Self> {
        self.lock_shared();
        ReadGuard { lock: self }
    }

    /// Takes the upgradable lock for the lifetime of the returned guard.
    #[inline]
    fn upgradable(&self) -> UpgradableGuard<'_, Self> {
        self.lock_upgradable();
        UpgradableGuard { lock: self }
    }

    /// Takes an exclusive lock for the lifetime of the returned guard.
    #[inline]
    fn write(&self) -> WriteGuard<'_, Self> {
        self.lock_exclusive();
        WriteGuard { lock: self }
    }
}

// =============================================================================
// Guards
// =============================================================================

/// Shared lock guard.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct ReadGuard<'a, L: ContainerLock> {
    lock: &'a L,
}

impl<L: ContainerLock> Drop for ReadGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        // Safety: constructed only by `ContainerLock::read`.
        unsafe { self.lock.unlock_shared() }
    }
}

/// Upgradable lock guard.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct UpgradableGuard<'a, L: ContainerLock> {
    lock: &'a L,
}

impl<'a, L: ContainerLock> UpgradableGuard<'a, L> {
    /// Promotes to exclusive until the returned guard drops, then demotes
    /// back to upgradable.
    #[inline]
    pub fn write(&mut self) -> UpgradedGuard<'_, L> {
        // Safety: this guard holds the upgradable lock, and the `&mut`
        // borrow keeps a second promotion from overlapping.
        unsafe { self.lock.upgrade() };
        UpgradedGuard { lock: self.lock }
    }
}

impl<L: ContainerLock> Drop for UpgradableGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        // Safety: constructed only by `ContainerLock::upgradable`, and any
        // promotion has been demoted by the time the borrow ends.
        unsafe { self.lock.unlock_upgradable() }
    }
}

/// Exclusive lock obtained by promoting an [`UpgradableGuard`].
#[must_use = "the lock is demoted as soon as the guard is dropped"]
pub struct UpgradedGuard<'g, L: ContainerLock> {
    lock: &'g L,
}

impl<L: ContainerLock> Drop for UpgradedGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        // Safety: constructed only by `UpgradableGuard::write`.
        unsafe { self.lock.downgrade_to_upgradable() }
    }
}

/// Exclusive lock guard.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct WriteGuard<'a, L: ContainerLock> {
    lock: &'a L,
}

impl<L: ContainerLock> Drop for WriteGuard<'_, L> {
    #[inline]
    fn drop(&mut self) {
        // Safety: constructed only by `ContainerLock::write`.
        unsafe { self.lock.unlock_exclusive() }
    }
}

// =============================================================================
// NoLock
// =============================================================================

/// The default strategy: every tier is a no-op.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoLock;

impl ContainerLock for NoLock {
    #[inline(always)]
    fn lock_shared(&self) {}
    #[inline(always)]
    unsafe fn unlock_shared(&self) {}
    #[inline(always)]
    fn lock_upgradable(&self) {}
    #[inline(always)]
    unsafe fn unlock_upgradable(&self) {}
    #[inline(always)]
    unsafe fn upgrade(&self) {}
    #[inline(always)]
    unsafe fn downgrade_to_upgradable(&self) {}
    #[inline(always)]
    fn lock_exclusive(&self) {}
    #[inline(always)]
    unsafe fn unlock_exclusive(&self) {}
}

// =============================================================================
// RwLock
// =============================================================================

/// Reader-writer strategy backed by `parking_lot::RawRwLock`.
pub struct RwLock {
    raw: parking_lot::RawRwLock,
}

impl Default for RwLock {
    fn default() -> Self {
        Self {
            raw: <parking_lot::RawRwLock as parking_lot::lock_api::RawRwLock>::INIT,
        }
    }
}

impl fmt::Debug for RwLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLock")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}

impl ContainerLock for RwLock {
    #[inline]
    fn lock_shared(&self) {
        self.raw.lock_shared();
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        unsafe { self.raw.unlock_shared() }
    }

    #[inline]
    fn lock_upgradable(&self) {
        self.raw.lock_upgradable();
    }

    #[inline]
    unsafe fn unlock_upgradable(&self) {
        unsafe { self.raw.unlock_upgradable() }
    }

    #[inline]
    unsafe fn upgrade(&self) {
        unsafe { self.raw.upgrade() }
    }

    #[inline]
    unsafe fn downgrade_to_upgradable(&self) {
        unsafe { self.raw.downgrade_to_upgradable() }
    }

    #[inline]
    fn lock_exclusive(&self) {
        self.raw.lock_exclusive();
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        unsafe { self.raw.unlock_exclusive() }
    }
}

// =============================================================================
// MutexLock
// =============================================================================

/// Mutual-exclusion strategy backed by `parking_lot::RawMutex`.
///
/// Every tier takes the mutex. Promotion and demotion are no-ops because the
/// upgradable holder is already exclusive.
pub struct MutexLock {
    raw: parking_lot::RawMutex,
}

impl Default for MutexLock {
    fn default() -> Self {
        Self {
            raw: <parking_lot::RawMutex as parking_lot::lock_api::RawMutex>::INIT,
        }
    }
}

impl fmt::Debug for MutexLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexLock")
            .field("locked", &self.raw.is_locked())
            .finish()
    }
}

impl ContainerLock for MutexLock {
    #[inline]
    fn lock_shared(&self) {
        self.raw.lock();
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        unsafe { self.raw.unlock() }
    }

    #[inline]
    fn lock_upgradable(&self) {
        self.raw.lock();
    }

    #[inline]
    unsafe fn unlock_upgradable(&self) {
        unsafe { self.raw.unlock() }
    }

    #[inline]
    unsafe fn upgrade(&self) {}

    #[inline]
    unsafe fn downgrade_to_upgradable(&self) {}

    #[inline]
    fn lock_exclusive(&self) {
        self.raw.lock();
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        unsafe { self.raw.unlock() }
    }
}

// =============================================================================
// SpinLock
// =============================================================================

const WRITER: usize = 1;
const UPGRADABLE: usize = 1 << 1;
const READER: usize = 1 << 2;

/// Reader-writer spin lock on a single cache-padded word.
///
/// Waiters spin then yield through `crossbeam_utils::Backoff::snooze()`.
/// Upgrading sets the writer bit before waiting for readers to drain, so new
/// readers cannot starve a promotion. Plain `lock_exclusive` callers have no
/// such priority.
pub struct SpinLock {
    state: CachePadded<AtomicUsize>,
}

impl Default for SpinLock {
    fn default() -> Self {
        Self {
            state: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

impl fmt::Debug for SpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load(Ordering::Relaxed);
        f.debug_struct("SpinLock")
            .field("readers", &(state / READER))
            .field("upgradable", &(state & UPGRADABLE != 0))
            .field("writer", &(state & WRITER != 0))
            .finish()
    }
}

impl ContainerLock for SpinLock {
    fn lock_shared(&self) {
        let backoff = Backoff::new();
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state & WRITER == 0
                && self
                    .state
                    .compare_exchange_weak(state, state + READER, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return;
            }
            backoff.snooze();
        }
    }

    #[inline]
    unsafe fn unlock_shared(&self) {
        self.state.fetch_sub(READER, Ordering::Release);
    }

    fn lock_upgradable(&self) {
        let backoff = Backoff::new();
        loop {
            let state = self.state.load(Ordering::Relaxed);
            if state & (WRITER | UPGRADABLE) == 0
                && self
                    .state
                    .compare_exchange_weak(
                        state,
                        state | UPGRADABLE,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return;
            }
            backoff.snooze();
        }
    }

    #[inline]
    unsafe fn unlock_upgradable(&self) {
        self.state.fetch_and(!UPGRADABLE, Ordering::Release);
    }

    unsafe fn upgrade(&self) {
        // The upgradable bit keeps every other writer out, so the writer bit
        // is ours to set; it also stops new readers.
        self.state.fetch_or(WRITER, Ordering::Acquire);
        let backoff = Backoff::new();
        while self.state.load(Ordering::Acquire) >= READER {
            backoff.snooze();
        }
    }

    #[inline]
    unsafe fn downgrade_to_upgradable(&self) {
        self.state.fetch_and(!WRITER, Ordering::Release);
    }

    fn lock_exclusive(&self) {
        let backoff = Backoff::new();
        while self
            .state
            .compare_exchange_weak(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }
    }

    #[inline]
    unsafe fn unlock_exclusive(&self) {
        self.state.fetch_and(!WRITER, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::lock_api::RawMutex as _;
    use std::cell::UnsafeCell;
    use std::sync::Arc;
    use std::thread;

    struct Guarded<L> {
        lock: L,
        value: UnsafeCell<u64>,
    }

    unsafe impl<L: Sync> Sync for Guarded<L> {}

    fn hammer<L: ContainerLock + Send + Sync + 'static>() {
        const THREADS: usize = 4;
        const ITERS: u64 = 10_000;

        let shared = Arc::new(Guarded {
            lock: L::default(),
            value: UnsafeCell::new(0),
        });

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for i in 0..ITERS {
                        if (i + t as u64) % 2 == 0 {
                            let _w = shared.lock.write();
                            unsafe { *shared.value.get() += 1 };
                        } else {
                            let mut up = shared.lock.upgradable();
                            let seen = unsafe { *shared.value.get() };
                            let _w = up.write();
                            unsafe { *shared.value.get() = seen + 1 };
                        }
                        let _r = shared.lock.read();
                        let _ = unsafe { *shared.value.get() };
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let _r = shared.lock.read();
        assert_eq!(unsafe { *shared.value.get() }, THREADS as u64 * ITERS);
    }

    #[test]
    fn no_lock_guards_are_inert() {
        let lock = NoLock;
        let _r1 = lock.read();
        let _r2 = lock.read();
        let mut up = lock.upgradable();
        let _w = up.write();
    }

    #[test]
    fn rw_lock_readers_share_with_upgradable() {
        let lock = RwLock::default();
        let r1 = lock.read();
        let r2 = lock.read();
        let mut up = lock.upgradable();
        drop(r1);
        drop(r2);
        {
            let _w = up.write();
        }
        // Demoted back to upgradable: readers allowed again.
        let _r3 = lock.read();
    }

    #[test]
    fn spin_lock_state_transitions() {
        let lock = SpinLock::default();
        {
            let _r1 = lock.read();
            let _r2 = lock.read();
            assert_eq!(lock.state.load(Ordering::Relaxed), 2 * READER);
        }
        {
            let mut up = lock.upgradable();
            assert_eq!(lock.state.load(Ordering::Relaxed), UPGRADABLE);
            {
                let _w = up.write();
                assert_eq!(lock.state.load(Ordering::Relaxed), UPGRADABLE | WRITER);
            }
            assert_eq!(lock.state.load(Ordering::Relaxed), UPGRADABLE);
        }
        {
            let _w = lock.write();
            assert_eq!(lock.state.load(Ordering::Relaxed), WRITER);
        }
        assert_eq!(lock.state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn mutex_lock_upgrade_is_noop() {
        let lock = MutexLock::default();
        let mut up = lock.upgradable();
        assert!(lock.raw.is_locked());
        {
            let _w = up.write();
            assert!(lock.raw.is_locked());
        }
        drop(up);
        assert!(!lock.raw.is_locked());
    }

    #[test]
    fn rw_lock_excludes_writers() {
        hammer::<RwLock>();
    }

    #[test]
    fn mutex_lock_excludes_writers() {
        hammer::<MutexLock>();
    }

    #[test]
    fn spin_lock_excludes_writers() {
        hammer::<SpinLock>();
    }
}

//! Read/write lock with optimistic reads
//!
//! A sequence counter sits next to a `parking_lot::RwLock<()>`. Writers make
//! the counter odd for the duration of the write. An optimistic reader takes
//! the even counter value as its stamp, reads without blocking, then
//! [`validate`](StampedLock::validate)s the stamp; if a writer ran in between
//! the reader retries under the shared lock.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicU64, Ordering, fence};

/// First stamp handed out (never 0, which means "no stamp")
const ORIGIN: u64 = 2;

/// Stamped lock
pub struct StampedLock {
    seq: AtomicU64,
    lock: RwLock<()>,
}

/// Shared lock held for reading
pub struct StampedReadGuard<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

/// Exclusive lock held for writing
pub struct StampedWriteGuard<'a> {
    seq: &'a AtomicU64,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl StampedLock {
    /// Unlocked lock
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(ORIGIN),
            lock: RwLock::new(()),
        }
    }

    /// Stamp for an optimistic read, or 0 while a writer holds the lock
    #[inline]
    pub fn try_optimistic_read(&self) -> u64 {
        let stamp = self.seq.load(Ordering::Acquire);
        if stamp & 1 == 1 { 0 } else { stamp }
    }

    /// True if no writer ran since `stamp` was issued
    #[inline]
    pub fn validate(&self, stamp: u64) -> bool {
        fence(Ordering::Acquire);
        stamp != 0 && self.seq.load(Ordering::Relaxed) == stamp
    }

    /// Block until the shared lock is held
    pub fn read(&self) -> StampedReadGuard<'_> {
        StampedReadGuard {
            _guard: self.lock.read(),
        }
    }

    /// Block until the exclusive lock is held
    pub fn write(&self) -> StampedWriteGuard<'_> {
        let guard = self.lock.write();
        self.seq.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        StampedWriteGuard {
            seq: &self.seq,
            _guard: guard,
        }
    }

    /// Whether a writer currently holds the lock
    pub fn is_write_locked(&self) -> bool {
        self.lock.is_locked_exclusive()
    }

    /// Run `read` optimistically, falling back to the shared lock
    pub fn optimistic<T>(&self, read: impl Fn() -> T) -> T {
        let stamp = self.try_optimistic_read();
        if stamp != 0 {
            let value = read();
            if self.validate(stamp) {
                return value;
            }
        }
        let _guard = self.read();
        read()
    }
}

impl Default for StampedLock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StampedWriteGuard<'_> {
    fn drop(&mut self) {
        self.seq.fetch_add(1, Ordering::Release);
    }
}

impl std::fmt::Debug for StampedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampedLock")
            .field("stamp", &self.seq.load(Ordering::Relaxed))
            .field("write_locked", &self.is_write_locked())
            .finish()
    }
}

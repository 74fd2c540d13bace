//! Slot map container for objects shared between threads
//!
//! Wraps a [`SlotMapContainer`] in a [`StampedLock`]. `size`, `is_empty` and
//! `query` try an optimistic read first and fall back to the shared lock if a
//! writer interfered. Every mutation, including the large-object migration
//! check, runs under the exclusive lock.
//!
//! Iterating requires the guard from [`SlotMap::read_lock`], which holds the
//! shared lock until dropped. Mutating this container while holding that
//! guard on the same thread deadlocks.

use std::sync::Arc;

use crate::config::SlotMapConfig;
use crate::container::SlotMapContainer;
use crate::context::ExecutionContext;
use crate::error::VmResult;
use crate::key::PropertyKey;
use crate::slot::Slot;
use crate::slot_map::{SlotAccess, SlotIter, SlotMap, SlotReadGuard};
use crate::stamped_lock::StampedLock;

/// Container guarded by a stamped lock
pub struct ThreadSafeSlotMapContainer {
    inner: SlotMapContainer,
    lock: StampedLock,
}

impl ThreadSafeSlotMapContainer {
    /// Container with the default configuration
    pub fn new() -> Self {
        Self::with_config(&SlotMapConfig::thread_safe())
    }

    /// Container sized by `config`
    pub fn with_config(config: &SlotMapConfig) -> Self {
        Self {
            inner: SlotMapContainer::with_config(config),
            lock: StampedLock::new(),
        }
    }

    /// Whether the balanced map has taken over
    pub fn is_large_object_mode(&self) -> bool {
        self.lock.optimistic(|| self.inner.is_large_object_mode())
    }

    fn check_map_size(&self) {
        debug_assert!(
            self.lock.is_write_locked(),
            "slot map migration requires the write lock"
        );
        self.inner.check_map_size();
    }
}

impl SlotMap for ThreadSafeSlotMapContainer {
    fn size(&self) -> usize {
        self.lock.optimistic(|| self.inner.size())
    }

    fn is_empty(&self) -> bool {
        self.lock.optimistic(|| self.inner.is_empty())
    }

    fn query(&self, key: &PropertyKey) -> Option<Arc<Slot>> {
        self.lock.optimistic(|| self.inner.query(key))
    }

    fn get(&self, key: &PropertyKey, access: SlotAccess) -> Option<Arc<Slot>> {
        if access == SlotAccess::Query {
            return self.query(key);
        }
        let _guard = self.lock.write();
        self.check_map_size();
        self.inner.get(key, access)
    }

    fn add(&self, slot: Arc<Slot>) {
        let _guard = self.lock.write();
        self.check_map_size();
        self.inner.add(slot);
    }

    fn remove(&self, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<bool> {
        let _guard = self.lock.write();
        self.inner.remove(cx, key)
    }

    fn read_lock(&self) -> SlotReadGuard<'_> {
        SlotReadGuard::locked(self.lock.read())
    }

    fn iter(&self, guard: &SlotReadGuard<'_>) -> SlotIter {
        self.inner.iter(guard)
    }
}

impl Default for ThreadSafeSlotMapContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThreadSafeSlotMapContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadSafeSlotMapContainer")
            .field("size", &self.size())
            .field("lock", &self.lock)
            .finish()
    }
}

//! Slot map container
//!
//! Each object owns one container. The container starts with an
//! [`EmbeddedSlotMap`] and, once the object reaches the large-object
//! threshold, copies every slot in creation order into a [`BalancedSlotMap`]
//! and swaps it in. The switch happens at most once and never reverses.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::config::SlotMapConfig;
use crate::context::ExecutionContext;
use crate::error::VmResult;
use crate::key::PropertyKey;
use crate::slot::Slot;
use crate::slot_map::{
    BalancedSlotMap, EmbeddedSlotMap, SlotAccess, SlotIter, SlotMap, SlotReadGuard,
};

/// The map currently behind a container
pub(crate) enum MapKind {
    Embedded(EmbeddedSlotMap),
    Balanced(BalancedSlotMap),
}

impl MapKind {
    #[inline]
    fn as_map(&self) -> &dyn SlotMap {
        match self {
            Self::Embedded(map) => map,
            Self::Balanced(map) => map,
        }
    }
}

/// Container that upgrades its map as the object grows.
///
/// Mutations are not synchronized against each other; objects shared between
/// threads use [`ThreadSafeSlotMapContainer`](crate::ThreadSafeSlotMapContainer).
pub struct SlotMapContainer {
    map: ArcSwap<MapKind>,
    threshold: usize,
}

impl SlotMapContainer {
    /// Container with the default configuration
    pub fn new() -> Self {
        Self::with_config(&SlotMapConfig::default())
    }

    /// Container sized by `config`
    pub fn with_config(config: &SlotMapConfig) -> Self {
        Self {
            map: ArcSwap::from_pointee(MapKind::Embedded(EmbeddedSlotMap::with_capacity(
                config.table_capacity(),
            ))),
            threshold: config.large_object_threshold,
        }
    }

    /// Whether the balanced map has taken over
    pub fn is_large_object_mode(&self) -> bool {
        matches!(**self.map.load(), MapKind::Balanced(_))
    }

    /// Migrate to the balanced map if the embedded map is full.
    ///
    /// Runs before every mutating operation.
    pub(crate) fn check_map_size(&self) {
        let current = self.map.load_full();
        let MapKind::Embedded(embedded) = &*current else {
            return;
        };
        let size = embedded.size();
        if size < self.threshold {
            return;
        }
        let balanced = {
            let guard = embedded.read_lock();
            BalancedSlotMap::from_slots(embedded.iter(&guard))
        };
        debug_assert_eq!(balanced.size(), size);
        self.map.store(Arc::new(MapKind::Balanced(balanced)));
        tracing::debug!(
            target: "otter::slots",
            size,
            threshold = self.threshold,
            "switched to balanced slot map"
        );
    }
}

impl SlotMap for SlotMapContainer {
    fn size(&self) -> usize {
        self.map.load().as_map().size()
    }

    fn is_empty(&self) -> bool {
        self.map.load().as_map().is_empty()
    }

    fn query(&self, key: &PropertyKey) -> Option<Arc<Slot>> {
        self.map.load().as_map().query(key)
    }

    fn get(&self, key: &PropertyKey, access: SlotAccess) -> Option<Arc<Slot>> {
        if access != SlotAccess::Query {
            self.check_map_size();
        }
        self.map.load().as_map().get(key, access)
    }

    fn add(&self, slot: Arc<Slot>) {
        self.check_map_size();
        self.map.load().as_map().add(slot);
    }

    fn remove(&self, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<bool> {
        self.map.load().as_map().remove(cx, key)
    }

    fn read_lock(&self) -> SlotReadGuard<'_> {
        SlotReadGuard::unlocked()
    }

    fn iter(&self, guard: &SlotReadGuard<'_>) -> SlotIter {
        self.map.load().as_map().iter(guard)
    }
}

impl Default for SlotMapContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SlotMapContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotMapContainer")
            .field("size", &self.size())
            .field("large", &self.is_large_object_mode())
            .finish()
    }
}

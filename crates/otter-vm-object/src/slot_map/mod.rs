//! Slot storage backends
//!
//! [`SlotMap`] is the interface every property store exposes: the two map
//! implementations ([`EmbeddedSlotMap`], [`BalancedSlotMap`]) and the two
//! containers that switch between them.
//!
//! Iteration needs a [`SlotReadGuard`] obtained from [`SlotMap::read_lock`].
//! For unsynchronized stores the guard is an empty token; the thread-safe
//! container hands out a real read lock. Do not call a mutating operation on
//! the same store while holding its guard: on the thread-safe container that
//! deadlocks.

pub mod balanced;
pub mod embedded;

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::VmResult;
use crate::key::PropertyKey;
use crate::slot::{Attributes, Slot};
use crate::stamped_lock::StampedReadGuard;

pub use balanced::BalancedSlotMap;
pub use embedded::EmbeddedSlotMap;

/// How [`SlotMap::get`] treats a missing or mismatched slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotAccess {
    /// Read only, never creates
    Query,
    /// Create a plain slot if absent
    Modify,
    /// Create a const slot if absent; refuse (None) if the key exists
    ModifyConst,
    /// Create an accessor slot, or replace a data slot with one
    ModifyGetterSetter,
    /// Create a data slot, or replace an accessor slot with one
    ConvertAccessorToData,
}

/// Property storage interface
pub trait SlotMap: Send + Sync {
    /// Number of live slots
    fn size(&self) -> usize;

    /// True when no slots are stored
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Look up a slot without creating one
    fn query(&self, key: &PropertyKey) -> Option<Arc<Slot>>;

    /// Look up, create or replace a slot according to `access`
    fn get(&self, key: &PropertyKey, access: SlotAccess) -> Option<Arc<Slot>>;

    /// Insert a slot whose key is known to be absent
    fn add(&self, slot: Arc<Slot>);

    /// Remove a slot.
    ///
    /// Returns `Ok(true)` when no slot remains under `key` and `Ok(false)`
    /// when a non-configurable slot refused deletion outside strict mode.
    fn remove(&self, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<bool>;

    /// Acquire the token required for iteration
    fn read_lock(&self) -> SlotReadGuard<'_>;

    /// Slots in creation order
    fn iter(&self, guard: &SlotReadGuard<'_>) -> SlotIter;
}

/// Proof that the caller holds the store's read lock (if it has one)
#[must_use = "iteration is only valid while the guard is held"]
pub struct SlotReadGuard<'a> {
    _lock: Option<StampedReadGuard<'a>>,
}

impl<'a> SlotReadGuard<'a> {
    /// Token for stores without a lock
    pub(crate) fn unlocked() -> Self {
        Self { _lock: None }
    }

    pub(crate) fn locked(lock: StampedReadGuard<'a>) -> Self {
        Self { _lock: Some(lock) }
    }
}

/// Iterator over a snapshot of slots in creation order
pub struct SlotIter {
    slots: std::vec::IntoIter<Arc<Slot>>,
}

impl SlotIter {
    pub(crate) fn new(slots: Vec<Arc<Slot>>) -> Self {
        Self {
            slots: slots.into_iter(),
        }
    }
}

impl Iterator for SlotIter {
    type Item = Arc<Slot>;

    fn next(&mut self) -> Option<Self::Item> {
        self.slots.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for SlotIter {}

/// Outcome of matching an access type against the current slot
pub(crate) enum Resolution {
    /// Hand back the existing slot
    Found(Arc<Slot>),
    /// Return nothing (query miss or const re-declaration)
    Nothing,
    /// Swap the existing slot for this one in place
    Replace(Arc<Slot>),
    /// Insert a brand new slot
    Create(Arc<Slot>),
}

/// Shared access-type rules for every map
pub(crate) fn resolve(
    key: &PropertyKey,
    existing: Option<&Arc<Slot>>,
    access: SlotAccess,
) -> Resolution {
    match (existing, access) {
        (Some(slot), SlotAccess::Query | SlotAccess::Modify) => Resolution::Found(slot.clone()),
        (Some(_), SlotAccess::ModifyConst) => Resolution::Nothing,
        (Some(slot), SlotAccess::ModifyGetterSetter) if slot.is_value_slot() => {
            Resolution::Replace(Arc::new(slot.converted(true)))
        }
        (Some(slot), SlotAccess::ConvertAccessorToData) if !slot.is_value_slot() => {
            Resolution::Replace(Arc::new(slot.converted(false)))
        }
        (Some(slot), _) => Resolution::Found(slot.clone()),
        (None, SlotAccess::Query) => Resolution::Nothing,
        (None, SlotAccess::ModifyGetterSetter) => {
            Resolution::Create(Arc::new(Slot::accessor(key.clone(), Attributes::empty())))
        }
        (None, SlotAccess::ModifyConst) => {
            Resolution::Create(Arc::new(Slot::data(key.clone(), Attributes::CONST)))
        }
        (None, SlotAccess::Modify | SlotAccess::ConvertAccessorToData) => {
            Resolution::Create(Arc::new(Slot::data(key.clone(), Attributes::empty())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_const_refusal() {
        let key = PropertyKey::from("c");
        let created = match resolve(&key, None, SlotAccess::ModifyConst) {
            Resolution::Create(slot) => slot,
            _ => panic!("expected a new slot"),
        };
        assert_eq!(created.attributes(), Attributes::CONST);
        assert!(matches!(
            resolve(&key, Some(&created), SlotAccess::ModifyConst),
            Resolution::Nothing
        ));
    }

    #[test]
    fn test_resolve_conversions() {
        let key = PropertyKey::from("p");
        let data = Arc::new(Slot::data(key.clone(), Attributes::DONTENUM));
        match resolve(&key, Some(&data), SlotAccess::ModifyGetterSetter) {
            Resolution::Replace(slot) => {
                assert!(!slot.is_value_slot());
                assert_eq!(slot.attributes(), Attributes::DONTENUM);
            }
            _ => panic!("expected replacement"),
        }
        assert!(matches!(
            resolve(&key, Some(&data), SlotAccess::ConvertAccessorToData),
            Resolution::Found(_)
        ));
        assert!(matches!(resolve(&key, None, SlotAccess::Query), Resolution::Nothing));
    }
}

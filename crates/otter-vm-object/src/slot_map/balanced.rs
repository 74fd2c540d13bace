//! Slot map for large objects
//!
//! An insertion-ordered hash map behind one map-wide mutex. Keys are
//! [`PropertyKey`]s, which are canonical on construction (numeric strings are
//! already index keys), so `"7"` and `7` share an entry.

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

use super::{Resolution, SlotAccess, SlotIter, SlotMap, SlotReadGuard, resolve};
use crate::context::ExecutionContext;
use crate::error::{VmError, VmResult};
use crate::key::PropertyKey;
use crate::slot::Slot;

type Entries = IndexMap<PropertyKey, Arc<Slot>, FxBuildHasher>;

/// Slot map backed by an ordered hash map
pub struct BalancedSlotMap {
    entries: Mutex<Entries>,
}

impl BalancedSlotMap {
    /// Empty map
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Map holding `slots` in the given order
    pub fn from_slots(slots: impl IntoIterator<Item = Arc<Slot>>) -> Self {
        let iter = slots.into_iter();
        let mut entries = Entries::with_capacity_and_hasher(iter.size_hint().0, FxBuildHasher);
        for slot in iter {
            entries.insert(slot.key().clone(), slot);
        }
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl SlotMap for BalancedSlotMap {
    fn size(&self) -> usize {
        self.entries.lock().len()
    }

    fn query(&self, key: &PropertyKey) -> Option<Arc<Slot>> {
        self.entries.lock().get(key).cloned()
    }

    fn get(&self, key: &PropertyKey, access: SlotAccess) -> Option<Arc<Slot>> {
        let mut entries = self.entries.lock();
        match resolve(key, entries.get(key), access) {
            Resolution::Found(slot) => Some(slot),
            Resolution::Nothing => None,
            Resolution::Replace(slot) => {
                if let Some(entry) = entries.get_mut(key) {
                    std::mem::replace(entry, slot.clone()).mark_deleted();
                }
                Some(slot)
            }
            Resolution::Create(slot) => {
                entries.insert(key.clone(), slot.clone());
                Some(slot)
            }
        }
    }

    fn add(&self, slot: Arc<Slot>) {
        let previous = self.entries.lock().insert(slot.key().clone(), slot);
        debug_assert!(previous.is_none(), "added slot already present");
    }

    fn remove(&self, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<bool> {
        let mut entries = self.entries.lock();
        let Some(slot) = entries.get(key) else {
            return Ok(true);
        };
        if !slot.attributes().is_configurable() {
            if cx.is_strict() {
                return Err(VmError::type_error(format!(
                    "Cannot delete property '{}'",
                    key
                )));
            }
            tracing::trace!(target: "otter::slots", %key, "refused delete of non-configurable property");
            return Ok(false);
        }
        if let Some(slot) = entries.shift_remove(key) {
            slot.mark_deleted();
        }
        Ok(true)
    }

    fn read_lock(&self) -> SlotReadGuard<'_> {
        SlotReadGuard::unlocked()
    }

    fn iter(&self, _guard: &SlotReadGuard<'_>) -> SlotIter {
        SlotIter::new(self.entries.lock().values().cloned().collect())
    }
}

impl Default for BalancedSlotMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BalancedSlotMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalancedSlotMap")
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::Attributes;

    #[test]
    fn test_numeric_string_and_index_share_entry() {
        let map = BalancedSlotMap::new();
        let slot = map.get(&PropertyKey::from("7"), SlotAccess::Modify).unwrap();
        let same = map.get(&PropertyKey::index(7), SlotAccess::Modify).unwrap();
        assert!(Arc::ptr_eq(&slot, &same));
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn test_order_survives_removal_and_replacement() {
        let cx = ExecutionContext::new();
        let map = BalancedSlotMap::new();
        for name in ["a", "b", "c", "d"] {
            map.get(&PropertyKey::from(name), SlotAccess::Modify).unwrap();
        }
        map.remove(&cx, &PropertyKey::from("b")).unwrap();
        map.get(&PropertyKey::from("c"), SlotAccess::ModifyGetterSetter).unwrap();
        let guard = map.read_lock();
        let keys: Vec<String> = map.iter(&guard).map(|s| s.key().to_string()).collect();
        assert_eq!(keys, ["a", "c", "d"]);
    }

    #[test]
    fn test_const_and_permanent_rules() {
        let map = BalancedSlotMap::new();
        let key = PropertyKey::from("k");
        assert!(map.get(&key, SlotAccess::ModifyConst).is_some());
        assert!(map.get(&key, SlotAccess::ModifyConst).is_none());

        assert!(!map.remove(&ExecutionContext::new(), &key).unwrap());
        assert!(map.remove(&ExecutionContext::strict(), &key).is_err());
        assert_eq!(map.query(&key).unwrap().attributes(), Attributes::CONST);
    }
}

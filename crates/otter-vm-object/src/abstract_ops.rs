//! Abstract object operations: integrity levels
//!
//! `set_integrity_level` updates every own property first and prevents
//! extensions last. The end state is the same as preventing extensions
//! first; only a trap observing the intermediate steps could tell.

use crate::descriptor::PropertyDescriptor;
use crate::error::VmResult;
use crate::key::PropertyKey;
use crate::object::JsObject;

/// Integrity level for `Object.seal` / `Object.freeze`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrityLevel {
    /// No additions, removals or reconfiguration
    Sealed,
    /// Sealed, and data properties are read-only
    Frozen,
}

/// TestIntegrityLevel (`Object.isSealed` / `Object.isFrozen`)
pub fn test_integrity_level(obj: &JsObject, level: IntegrityLevel) -> bool {
    if obj.is_extensible() {
        return false;
    }
    for key in obj.own_keys(true, true) {
        let Some(slot) = obj.get_own_slot(&key) else {
            continue;
        };
        let attributes = slot.attributes();
        if attributes.is_configurable() {
            return false;
        }
        if level == IntegrityLevel::Frozen && slot.is_value_slot() && attributes.is_writable() {
            return false;
        }
    }
    true
}

/// SetIntegrityLevel (`Object.seal` / `Object.freeze`)
pub fn set_integrity_level(obj: &JsObject, level: IntegrityLevel) -> VmResult<bool> {
    for key in obj.own_keys(true, true) {
        let Some(slot) = obj.get_own_slot(&key) else {
            continue;
        };
        let mut desc = PropertyDescriptor {
            configurable: Some(false),
            ..PropertyDescriptor::default()
        };
        if level == IntegrityLevel::Frozen && slot.is_value_slot() {
            desc.writable = Some(false);
        }
        obj.define_own_property(&key, &desc)?;
    }
    tracing::trace!(target: "otter::slots", ?level, "integrity level applied");
    Ok(obj.prevent_extensions())
}

/// HasOwnProperty
pub fn has_own_property(obj: &JsObject, key: &PropertyKey) -> bool {
    obj.has_own(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::slot::Attributes;
    use crate::value::Value;
    use std::sync::Arc;

    fn sample() -> Arc<JsObject> {
        let cx = ExecutionContext::new();
        let obj = Arc::new(JsObject::new(None));
        obj.define_property(&cx, "a".into(), Value::int32(1), Attributes::empty()).unwrap();
        obj.define_property(&cx, "hidden".into(), Value::int32(2), Attributes::DONTENUM).unwrap();
        obj.define_accessor_property(&cx, "acc".into(), None, None, Attributes::empty())
            .unwrap();
        obj
    }

    #[test]
    fn test_extensible_object_is_never_sealed() {
        let obj = Arc::new(JsObject::new(None));
        assert!(!test_integrity_level(&obj, IntegrityLevel::Sealed));
        obj.prevent_extensions();
        assert!(test_integrity_level(&obj, IntegrityLevel::Sealed));
        assert!(test_integrity_level(&obj, IntegrityLevel::Frozen));
    }

    #[test]
    fn test_seal_keeps_values_writable() {
        let cx = ExecutionContext::new();
        let obj = sample();
        assert!(set_integrity_level(&obj, IntegrityLevel::Sealed).unwrap());
        assert!(test_integrity_level(&obj, IntegrityLevel::Sealed));
        assert!(!test_integrity_level(&obj, IntegrityLevel::Frozen));

        obj.put(&cx, &"a".into(), Value::int32(5)).unwrap();
        assert_eq!(obj.get(&cx, &"a".into()).unwrap(), Value::int32(5));
        assert!(!obj.delete(&cx, &"a".into()).unwrap());
        obj.put(&cx, &"new".into(), Value::int32(1)).unwrap();
        assert!(!has_own_property(&obj, &"new".into()));
    }

    #[test]
    fn test_freeze_exempts_accessors_from_writability() {
        let obj = sample();
        set_integrity_level(&obj, IntegrityLevel::Frozen).unwrap();
        assert!(test_integrity_level(&obj, IntegrityLevel::Frozen));
        assert!(test_integrity_level(&obj, IntegrityLevel::Sealed));
        let hidden = obj.get_attributes(&"hidden".into()).unwrap();
        assert!(!hidden.is_writable());
        assert!(!hidden.is_enumerable());
        assert!(!obj.get_own_slot(&"acc".into()).unwrap().is_value_slot());
    }

    #[test]
    fn test_writable_property_breaks_frozen() {
        let obj = sample();
        set_integrity_level(&obj, IntegrityLevel::Sealed).unwrap();
        let slot = obj.get_own_slot(&"a".into()).unwrap();
        assert!(slot.attributes().is_writable());
        assert!(!test_integrity_level(&obj, IntegrityLevel::Frozen));
    }
}

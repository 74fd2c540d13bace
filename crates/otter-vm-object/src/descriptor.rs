//! Property descriptors
//!
//! [`PropertyDescriptor`] is the typed record passed to
//! [`JsObject::define_own_property`]; absent fields are `None`. The free
//! functions convert between that record and descriptor objects and
//! implement the redefinition checks of `[[DefineOwnProperty]]`.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::convert::same_value;
use crate::error::{VmError, VmResult};
use crate::key::PropertyKey;
use crate::object::JsObject;
use crate::slot::{Attributes, Slot, SlotKind};
use crate::value::Value;

/// A (possibly partial) property descriptor
#[derive(Clone, Debug, Default)]
pub struct PropertyDescriptor {
    /// `[[Value]]`
    pub value: Option<Value>,
    /// `[[Writable]]`
    pub writable: Option<bool>,
    /// `[[Get]]` (a callable or `undefined`)
    pub get: Option<Value>,
    /// `[[Set]]` (a callable or `undefined`)
    pub set: Option<Value>,
    /// `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// `[[Configurable]]`
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// Complete data descriptor
    pub fn data(value: Value, attributes: Attributes) -> Self {
        Self {
            value: Some(value),
            writable: Some(attributes.is_writable()),
            enumerable: Some(attributes.is_enumerable()),
            configurable: Some(attributes.is_configurable()),
            ..Self::default()
        }
    }

    /// Complete accessor descriptor (`None` halves become `undefined`)
    pub fn accessor(get: Option<Value>, set: Option<Value>, attributes: Attributes) -> Self {
        Self {
            get: Some(get.unwrap_or_default()),
            set: Some(set.unwrap_or_default()),
            enumerable: Some(attributes.is_enumerable()),
            configurable: Some(attributes.is_configurable()),
            ..Self::default()
        }
    }

    /// Complete descriptor describing `slot`
    pub fn from_slot(slot: &Slot) -> Self {
        let attributes = slot.attributes();
        match slot.kind() {
            SlotKind::Data => Self::data(slot.value(), attributes),
            SlotKind::Accessor(pair) => {
                let pair = pair.read();
                Self::accessor(
                    pair.getter.as_ref().and_then(|g| g.as_function()),
                    pair.setter.as_ref().and_then(|s| s.as_function()),
                    attributes,
                )
            }
        }
    }

    /// Has `value` or `writable`
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// Has `get` or `set`
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// Neither data nor accessor
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }
}

/// Overlay the descriptor's boolean fields on an attribute set
pub fn apply_descriptor_to_attributes(mut attributes: Attributes, desc: &PropertyDescriptor) -> Attributes {
    if let Some(enumerable) = desc.enumerable {
        attributes.set(Attributes::DONTENUM, !enumerable);
    }
    if let Some(writable) = desc.writable {
        attributes.set(Attributes::READONLY, !writable);
    }
    if let Some(configurable) = desc.configurable {
        attributes.set(Attributes::PERMANENT, !configurable);
    }
    attributes
}

/// FromPropertyDescriptor: build a descriptor object holding the present fields
pub fn from_property_descriptor(cx: &ExecutionContext, desc: &PropertyDescriptor) -> VmResult<Arc<JsObject>> {
    let obj = cx.new_object();
    let fields = [
        ("value", desc.value.clone()),
        ("writable", desc.writable.map(Value::boolean)),
        ("get", desc.get.clone()),
        ("set", desc.set.clone()),
        ("enumerable", desc.enumerable.map(Value::boolean)),
        ("configurable", desc.configurable.map(Value::boolean)),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            obj.define_property(cx, PropertyKey::from(name), value, Attributes::empty())?;
        }
    }
    Ok(obj)
}

/// ToPropertyDescriptor: read a descriptor object (prototype chain included)
pub fn to_property_descriptor(cx: &ExecutionContext, value: &Value) -> VmResult<PropertyDescriptor> {
    let Some(obj) = value.as_object() else {
        return Err(VmError::type_error(format!(
            "Property description must be an object: {}",
            value.to_display_string()
        )));
    };

    let field = |name: &str| -> VmResult<Option<Value>> {
        let key = PropertyKey::from(name);
        if obj.has(&key) {
            Ok(Some(obj.get(cx, &key)?))
        } else {
            Ok(None)
        }
    };

    let desc = PropertyDescriptor {
        enumerable: field("enumerable")?.map(|v| v.to_boolean()),
        configurable: field("configurable")?.map(|v| v.to_boolean()),
        value: field("value")?,
        writable: field("writable")?.map(|v| v.to_boolean()),
        get: field("get")?,
        set: field("set")?,
    };

    for (name, accessor) in [("getter", &desc.get), ("setter", &desc.set)] {
        if let Some(f) = accessor
            && !f.is_undefined()
            && !f.is_callable()
        {
            return Err(VmError::type_error(format!(
                "{} must be a function: {}",
                name,
                f.to_display_string()
            )));
        }
    }
    if desc.is_data_descriptor() && desc.is_accessor_descriptor() {
        return Err(VmError::type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

/// Reject a redefinition that `[[DefineOwnProperty]]` forbids.
///
/// `current` is the complete descriptor of the existing property, if any.
pub fn check_property_change(
    key: &PropertyKey,
    current: Option<&PropertyDescriptor>,
    desc: &PropertyDescriptor,
    extensible: bool,
) -> VmResult<()> {
    let Some(current) = current else {
        if extensible {
            return Ok(());
        }
        return Err(VmError::type_error(format!(
            "Cannot define property {}, object is not extensible",
            key
        )));
    };

    if current.configurable != Some(false) {
        return Ok(());
    }
    let redefine = |what: &str| {
        Err(VmError::type_error(format!(
            "Cannot redefine property: {} ({})",
            key, what
        )))
    };

    if desc.configurable == Some(true) {
        return redefine("configurable");
    }
    if desc.enumerable.is_some() && desc.enumerable != current.enumerable {
        return redefine("enumerable");
    }
    if desc.is_generic_descriptor() {
        return Ok(());
    }

    match (current.is_data_descriptor(), desc.is_data_descriptor()) {
        (true, true) => {
            if current.writable == Some(false) {
                if desc.writable == Some(true) {
                    return redefine("writable");
                }
                if let (Some(new), Some(old)) = (&desc.value, &current.value)
                    && !same_value(new, old)
                {
                    return redefine("value");
                }
            }
            Ok(())
        }
        (false, false) => {
            let changed = |new: &Option<Value>, old: &Option<Value>| match (new, old) {
                (Some(new), Some(old)) => !same_value(new, old),
                _ => false,
            };
            if changed(&desc.set, &current.set) {
                return redefine("set");
            }
            if changed(&desc.get, &current.get) {
                return redefine("get");
            }
            Ok(())
        }
        (true, false) => redefine("data to accessor"),
        (false, true) => redefine("accessor to data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::JsFunction;

    fn key() -> PropertyKey {
        PropertyKey::from("p")
    }

    #[test]
    fn test_descriptor_kinds() {
        let generic = PropertyDescriptor {
            enumerable: Some(true),
            ..Default::default()
        };
        assert!(generic.is_generic_descriptor());
        assert!(PropertyDescriptor::data(Value::null(), Attributes::empty()).is_data_descriptor());
        let accessor = PropertyDescriptor::accessor(None, None, Attributes::empty());
        assert!(accessor.is_accessor_descriptor());
        assert!(!accessor.is_data_descriptor());
    }

    #[test]
    fn test_apply_descriptor_to_attributes() {
        let desc = PropertyDescriptor {
            writable: Some(false),
            enumerable: Some(true),
            ..Default::default()
        };
        let attrs = apply_descriptor_to_attributes(Attributes::DONTENUM | Attributes::PERMANENT, &desc);
        assert_eq!(attrs, Attributes::READONLY | Attributes::PERMANENT);
        let unchanged = apply_descriptor_to_attributes(Attributes::CONST, &PropertyDescriptor::default());
        assert_eq!(unchanged, Attributes::CONST);
    }

    #[test]
    fn test_round_trip_through_object() {
        let cx = ExecutionContext::new();
        let desc = PropertyDescriptor::data(Value::int32(3), Attributes::READONLY);
        let obj = from_property_descriptor(&cx, &desc).unwrap();
        let keys: Vec<String> = obj.own_keys(true, false).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["value", "writable", "enumerable", "configurable"]);

        let back = to_property_descriptor(&cx, &Value::object(obj)).unwrap();
        assert_eq!(back.value, Some(Value::int32(3)));
        assert_eq!(back.writable, Some(false));
        assert_eq!(back.enumerable, Some(true));
        assert_eq!(back.configurable, Some(true));
        assert!(back.get.is_none());
    }

    #[test]
    fn test_to_property_descriptor_rejects_bad_input() {
        let cx = ExecutionContext::new();
        assert!(to_property_descriptor(&cx, &Value::int32(1)).is_err());

        let obj = cx.new_object();
        obj.define_property(&cx, "get".into(), Value::int32(1), Attributes::empty())
            .unwrap();
        assert!(to_property_descriptor(&cx, &Value::object(obj)).is_err());

        let mixed = cx.new_object();
        let f = JsFunction::new("g", 0, |_, _, _| Ok(Value::undefined()));
        mixed
            .define_property(&cx, "get".into(), Value::function(f), Attributes::empty())
            .unwrap();
        mixed
            .define_property(&cx, "value".into(), Value::int32(1), Attributes::empty())
            .unwrap();
        assert!(to_property_descriptor(&cx, &Value::object(mixed)).is_err());
    }

    #[test]
    fn test_to_property_descriptor_reads_inherited_fields() {
        let cx = ExecutionContext::new();
        let proto = cx.new_object();
        proto
            .define_property(&cx, "enumerable".into(), Value::boolean(true), Attributes::empty())
            .unwrap();
        let obj = Arc::new(JsObject::new(Some(proto)));
        let desc = to_property_descriptor(&cx, &Value::object(obj)).unwrap();
        assert_eq!(desc.enumerable, Some(true));
        assert!(desc.is_generic_descriptor());
    }

    #[test]
    fn test_non_configurable_changes() {
        let current = PropertyDescriptor::data(Value::int32(1), Attributes::READONLY | Attributes::PERMANENT);
        let same = PropertyDescriptor {
            value: Some(Value::int32(1)),
            ..Default::default()
        };
        assert!(check_property_change(&key(), Some(&current), &same, true).is_ok());

        let other_value = PropertyDescriptor {
            value: Some(Value::int32(2)),
            ..Default::default()
        };
        assert!(check_property_change(&key(), Some(&current), &other_value, true).is_err());

        let make_writable = PropertyDescriptor {
            writable: Some(true),
            ..Default::default()
        };
        assert!(check_property_change(&key(), Some(&current), &make_writable, true).is_err());

        let to_accessor = PropertyDescriptor::accessor(None, None, Attributes::PERMANENT);
        assert!(check_property_change(&key(), Some(&current), &to_accessor, true).is_err());

        let configurable = PropertyDescriptor {
            configurable: Some(true),
            ..Default::default()
        };
        assert!(check_property_change(&key(), Some(&current), &configurable, true).is_err());
    }

    #[test]
    fn test_new_property_requires_extensible() {
        let desc = PropertyDescriptor::data(Value::null(), Attributes::empty());
        assert!(check_property_change(&key(), None, &desc, true).is_ok());
        assert!(check_property_change(&key(), None, &desc, false).unwrap_err().is_type_error());
    }
}

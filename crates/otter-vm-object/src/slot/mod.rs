//! Property slots
//!
//! A slot is one property: its key, attribute bits, stored value and kind
//! (plain data or accessor). Slots are handed out as `Arc<Slot>`; the map that
//! indexes a slot is the only structure linking it, so readers may keep a
//! handle after the slot has been replaced or removed (it is then marked
//! deleted).
//!
//! A slot never changes kind in place. Converting between data and accessor
//! builds a new slot with [`Slot::converted`] that inherits the value and
//! attributes, and the map swaps it into the old slot's positions.

pub mod accessor;

use bitflags::bitflags;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::context::{ExecutionContext, Feature};
use crate::error::{VmError, VmResult};
use crate::key::PropertyKey;
use crate::object::JsObject;
use crate::value::Value;

pub use accessor::{AccessorPair, Getter, HostError, HostMember, Setter};

bitflags! {
    /// Property attribute bits
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Attributes: u8 {
        /// Not writable
        const READONLY = 1;
        /// Not enumerable
        const DONTENUM = 2;
        /// Not configurable
        const PERMANENT = 4;
        /// Const declared but not yet initialized
        const UNINITIALIZED_CONST = 8;
        /// Const declaration
        const CONST = Self::READONLY.bits() | Self::PERMANENT.bits() | Self::UNINITIALIZED_CONST.bits();
    }
}

impl Attributes {
    /// Validate a raw attribute bit pattern
    pub fn check_valid(bits: u32) -> VmResult<Self> {
        u8::try_from(bits)
            .ok()
            .and_then(Self::from_bits)
            .ok_or_else(|| VmError::range_error(format!("Invalid property attributes: {:#x}", bits)))
    }

    /// `[[Writable]]`
    #[inline]
    pub fn is_writable(self) -> bool {
        !self.contains(Self::READONLY)
    }

    /// `[[Enumerable]]`
    #[inline]
    pub fn is_enumerable(self) -> bool {
        !self.contains(Self::DONTENUM)
    }

    /// `[[Configurable]]`
    #[inline]
    pub fn is_configurable(self) -> bool {
        !self.contains(Self::PERMANENT)
    }

    /// Whether a property carrying these attributes may be given `requested`.
    /// A non-configurable property can only drop its writability.
    #[inline]
    pub fn permits_change_to(self, requested: Self) -> bool {
        self.is_configurable() || requested == self || requested == self | Self::READONLY
    }
}

/// What a slot holds
pub enum SlotKind {
    /// Plain value slot
    Data,
    /// Getter/setter pair
    Accessor(RwLock<AccessorPair>),
}

/// A single property
pub struct Slot {
    key: PropertyKey,
    index_or_hash: u32,
    attributes: Mutex<Attributes>,
    value: RwLock<Value>,
    kind: SlotKind,
    deleted: AtomicBool,
}

impl Slot {
    fn build(key: PropertyKey, value: Value, attributes: Attributes, kind: SlotKind) -> Self {
        let index_or_hash = key.index_or_hash();
        Self {
            key,
            index_or_hash,
            attributes: Mutex::new(attributes),
            value: RwLock::new(value),
            kind,
            deleted: AtomicBool::new(false),
        }
    }

    /// Plain data slot holding `undefined`
    pub fn data(key: PropertyKey, attributes: Attributes) -> Self {
        Self::build(key, Value::undefined(), attributes, SlotKind::Data)
    }

    /// Plain data slot holding `value`
    pub fn with_value(key: PropertyKey, value: Value, attributes: Attributes) -> Self {
        Self::build(key, value, attributes, SlotKind::Data)
    }

    /// Accessor slot with neither getter nor setter
    pub fn accessor(key: PropertyKey, attributes: Attributes) -> Self {
        Self::build(
            key,
            Value::undefined(),
            attributes,
            SlotKind::Accessor(RwLock::new(AccessorPair::default())),
        )
    }

    /// Replacement slot of the other kind, inheriting value and attributes
    pub(crate) fn converted(&self, to_accessor: bool) -> Self {
        let kind = if to_accessor {
            SlotKind::Accessor(RwLock::new(AccessorPair::default()))
        } else {
            SlotKind::Data
        };
        Self::build(self.key.clone(), self.value.read().clone(), self.attributes(), kind)
    }

    /// Property key
    #[inline]
    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    /// Bucket placement hash
    #[inline]
    pub fn index_or_hash(&self) -> u32 {
        self.index_or_hash
    }

    /// Whether this slot indexes `key`: hash first, then identity, then equality
    #[inline]
    pub(crate) fn matches(&self, index_or_hash: u32, key: &PropertyKey) -> bool {
        self.index_or_hash == index_or_hash && (self.key.same_identity(key) || self.key == *key)
    }

    /// Current attributes
    pub fn attributes(&self) -> Attributes {
        *self.attributes.lock()
    }

    /// Replace the attributes
    pub fn set_attributes(&self, attributes: Attributes) {
        *self.attributes.lock() = attributes;
    }

    /// Atomically update the attributes
    pub(crate) fn update_attributes(&self, f: impl FnOnce(Attributes) -> Attributes) -> Attributes {
        let mut attrs = self.attributes.lock();
        *attrs = f(*attrs);
        *attrs
    }

    /// True for plain data slots
    #[inline]
    pub fn is_value_slot(&self) -> bool {
        matches!(self.kind, SlotKind::Data)
    }

    /// Slot kind
    pub fn kind(&self) -> &SlotKind {
        &self.kind
    }

    /// Snapshot of the accessor pair (None for data slots)
    pub fn accessor_pair(&self) -> Option<AccessorPair> {
        match &self.kind {
            SlotKind::Accessor(pair) => Some(pair.read().clone()),
            SlotKind::Data => None,
        }
    }

    /// Mutate the accessor pair in place (no-op for data slots)
    pub(crate) fn update_accessor(&self, f: impl FnOnce(&mut AccessorPair)) {
        if let SlotKind::Accessor(pair) = &self.kind {
            f(&mut pair.write());
        }
    }

    /// Stored value, bypassing any getter
    pub fn value(&self) -> Value {
        self.value.read().clone()
    }

    /// Store a value, bypassing attributes and setters
    pub fn set_raw_value(&self, value: Value) {
        *self.value.write() = value;
    }

    /// Whether the slot has been replaced or removed from its map
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }

    /// Read the property with `receiver` as the target object.
    ///
    /// Accessors without a getter fall back to the stored value.
    pub fn get_value(&self, cx: &ExecutionContext, receiver: &Value) -> VmResult<Value> {
        if let SlotKind::Accessor(pair) = &self.kind {
            let getter = pair.read().getter.clone();
            if let Some(getter) = getter {
                return getter.get_value(cx, receiver);
            }
        }
        Ok(self.value())
    }

    /// Write the property.
    ///
    /// `owner` is the object holding this slot, `receiver` the object the
    /// assignment targets. Returns `Ok(false)` when the write was not handled:
    /// a data slot found on a prototype, where the caller must create an own
    /// property on the receiver instead.
    pub fn set_value(
        &self,
        cx: &ExecutionContext,
        value: Value,
        owner: &Arc<JsObject>,
        receiver: &Value,
    ) -> VmResult<bool> {
        if let SlotKind::Accessor(pair) = &self.kind {
            let (getter_present, setter) = {
                let pair = pair.read();
                (pair.getter.is_some(), pair.setter.clone())
            };
            if let Some(setter) = setter {
                setter.set_value(cx, value, receiver)?;
                return Ok(true);
            }
            if getter_present {
                if cx.is_strict() || cx.has_feature(Feature::StrictMode) {
                    return Err(VmError::type_error(format!(
                        "Cannot set property {} which has only a getter",
                        self.key
                    )));
                }
                tracing::trace!(target: "otter::slots", key = %self.key, "ignored write to getter-only accessor");
                return Ok(true);
            }
        }

        if !self.attributes().is_writable() {
            if cx.is_strict() {
                return Err(VmError::type_error(format!(
                    "Cannot assign to read only property '{}'",
                    self.key
                )));
            }
            tracing::trace!(target: "otter::slots", key = %self.key, "ignored write to read-only property");
            return Ok(true);
        }

        if receiver.as_object().is_some_and(|r| Arc::ptr_eq(r, owner)) {
            self.set_raw_value(value);
            return Ok(true);
        }
        Ok(false)
    }

    /// Build a descriptor object for this property.
    ///
    /// Data slots yield `value, writable, enumerable, configurable`; accessors
    /// yield `get, set, enumerable, configurable` with `undefined` for an
    /// absent half.
    pub fn get_property_descriptor(&self, cx: &ExecutionContext) -> VmResult<Arc<JsObject>> {
        let desc = cx.new_object();
        let attrs = self.attributes();
        match &self.kind {
            SlotKind::Data => {
                desc.define_property(cx, "value".into(), self.value(), Attributes::empty())?;
                desc.define_property(
                    cx,
                    "writable".into(),
                    Value::boolean(attrs.is_writable()),
                    Attributes::empty(),
                )?;
            }
            SlotKind::Accessor(pair) => {
                let pair = pair.read().clone();
                let get = pair.getter.as_ref().and_then(Getter::as_function).unwrap_or_default();
                let set = pair.setter.as_ref().and_then(Setter::as_function).unwrap_or_default();
                desc.define_property(cx, "get".into(), get, Attributes::empty())?;
                desc.define_property(cx, "set".into(), set, Attributes::empty())?;
            }
        }
        desc.define_property(
            cx,
            "enumerable".into(),
            Value::boolean(attrs.is_enumerable()),
            Attributes::empty(),
        )?;
        desc.define_property(
            cx,
            "configurable".into(),
            Value::boolean(attrs.is_configurable()),
            Attributes::empty(),
        )?;
        Ok(desc)
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("key", &self.key)
            .field("attributes", &self.attributes())
            .field("accessor", &!self.is_value_slot())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::JsFunction;

    fn owner() -> (Arc<JsObject>, Value) {
        let obj = Arc::new(JsObject::new(None));
        let receiver = Value::object(obj.clone());
        (obj, receiver)
    }

    #[test]
    fn test_attribute_validation() {
        assert_eq!(Attributes::check_valid(0).unwrap(), Attributes::empty());
        assert_eq!(Attributes::check_valid(13).unwrap(), Attributes::CONST);
        assert!(matches!(Attributes::check_valid(16), Err(VmError::RangeError(_))));
        assert!(Attributes::check_valid(0x1_0001).is_err());
    }

    #[test]
    fn test_non_configurable_attributes_only_gain_readonly() {
        let fixed = Attributes::PERMANENT;
        assert!(fixed.permits_change_to(fixed));
        assert!(fixed.permits_change_to(Attributes::PERMANENT | Attributes::READONLY));
        assert!(!fixed.permits_change_to(Attributes::empty()));
        assert!(!fixed.permits_change_to(Attributes::PERMANENT | Attributes::DONTENUM));
        assert!(!Attributes::CONST.permits_change_to(Attributes::READONLY | Attributes::PERMANENT));
        assert!(Attributes::DONTENUM.permits_change_to(Attributes::empty()));
    }

    #[test]
    fn test_readonly_write_is_silent_outside_strict_mode() {
        let cx = ExecutionContext::new();
        let (obj, receiver) = owner();
        let slot = Slot::with_value(PropertyKey::from("x"), Value::int32(1), Attributes::READONLY);
        assert!(slot.set_value(&cx, Value::int32(2), &obj, &receiver).unwrap());
        assert_eq!(slot.value(), Value::int32(1));
    }

    #[test]
    fn test_readonly_write_throws_in_strict_mode() {
        let cx = ExecutionContext::strict();
        let (obj, receiver) = owner();
        let slot = Slot::with_value(PropertyKey::from("x"), Value::int32(1), Attributes::READONLY);
        let err = slot.set_value(&cx, Value::int32(2), &obj, &receiver).unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(slot.value(), Value::int32(1));
    }

    #[test]
    fn test_write_through_prototype_is_not_handled() {
        let cx = ExecutionContext::new();
        let (proto, _) = owner();
        let (_, receiver) = owner();
        let slot = Slot::data(PropertyKey::from("x"), Attributes::empty());
        assert!(!slot.set_value(&cx, Value::int32(2), &proto, &receiver).unwrap());
        assert!(slot.value().is_undefined());
    }

    #[test]
    fn test_getter_only_accessor() {
        let (obj, receiver) = owner();
        let slot = Slot::accessor(PropertyKey::from("x"), Attributes::empty());
        slot.update_accessor(|pair| pair.getter = Some(Getter::native("x", |_, _| Ok(Value::int32(7)))));

        let cx = ExecutionContext::new();
        assert_eq!(slot.get_value(&cx, &receiver).unwrap(), Value::int32(7));
        assert!(slot.set_value(&cx, Value::int32(1), &obj, &receiver).unwrap());

        let strict = ExecutionContext::strict();
        assert!(slot.set_value(&strict, Value::int32(1), &obj, &receiver).is_err());

        let flagged = ExecutionContext::new().with_feature(Feature::StrictMode);
        assert!(slot.set_value(&flagged, Value::int32(1), &obj, &receiver).is_err());
    }

    #[test]
    fn test_empty_accessor_behaves_like_data() {
        let cx = ExecutionContext::new();
        let (obj, receiver) = owner();
        let slot = Slot::accessor(PropertyKey::from("x"), Attributes::empty());
        assert!(slot.set_value(&cx, Value::int32(3), &obj, &receiver).unwrap());
        assert_eq!(slot.get_value(&cx, &receiver).unwrap(), Value::int32(3));
    }

    #[test]
    fn test_setter_receives_receiver_and_value() {
        let cx = ExecutionContext::new();
        let (obj, receiver) = owner();
        let f = JsFunction::new("set", 1, |cx, this, args| {
            let target = this.as_object().unwrap();
            target.define_property(cx, "seen".into(), args[0].clone(), Attributes::empty())?;
            Ok(Value::undefined())
        });
        let slot = Slot::accessor(PropertyKey::from("x"), Attributes::empty());
        slot.update_accessor(|pair| pair.setter = Some(Setter::function(Value::function(f))));
        assert!(slot.set_value(&cx, Value::int32(9), &obj, &receiver).unwrap());
        assert_eq!(obj.get(&cx, &"seen".into()).unwrap(), Value::int32(9));
    }

    #[test]
    fn test_conversion_inherits_value_and_attributes() {
        let slot = Slot::with_value(PropertyKey::from("x"), Value::int32(4), Attributes::DONTENUM);
        let accessor = slot.converted(true);
        assert!(!accessor.is_value_slot());
        assert_eq!(accessor.value(), Value::int32(4));
        assert_eq!(accessor.attributes(), Attributes::DONTENUM);
        assert!(accessor.converted(false).is_value_slot());
    }

    #[test]
    fn test_data_descriptor_key_order() {
        let cx = ExecutionContext::new();
        let slot = Slot::with_value(PropertyKey::from("x"), Value::int32(1), Attributes::READONLY);
        let desc = slot.get_property_descriptor(&cx).unwrap();
        let keys: Vec<String> = desc.own_keys(true, false).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["value", "writable", "enumerable", "configurable"]);
        assert_eq!(desc.get(&cx, &"writable".into()).unwrap(), Value::boolean(false));
    }

    #[test]
    fn test_accessor_descriptor_key_order() {
        let cx = ExecutionContext::new();
        let slot = Slot::accessor(PropertyKey::from("x"), Attributes::empty());
        slot.update_accessor(|pair| {
            pair.getter = Some(Getter::native("x", |_, _| Ok(Value::undefined())));
        });
        let desc = slot.get_property_descriptor(&cx).unwrap();
        let keys: Vec<String> = desc.own_keys(true, false).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["get", "set", "enumerable", "configurable"]);
        assert!(desc.get(&cx, &"set".into()).unwrap().is_undefined());

        let empty = Slot::accessor(PropertyKey::from("y"), Attributes::empty());
        let desc = empty.get_property_descriptor(&cx).unwrap();
        let keys: Vec<String> = desc.own_keys(true, false).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["get", "set", "enumerable", "configurable"]);
    }
}

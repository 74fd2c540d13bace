//! Ordinary objects
//!
//! A `JsObject` owns one slot container and an optional prototype. The
//! operations here implement property access on top of the container:
//! prototype-walking `get`/`put`, definition with descriptor validation,
//! deletion, enumeration and extensibility.
//!
//! Operations that may call getters or setters, or need the receiver as a
//! value, take `self: &Arc<Self>`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SlotMapConfig;
use crate::container::SlotMapContainer;
use crate::context::ExecutionContext;
use crate::convert::same_value;
use crate::descriptor::{PropertyDescriptor, apply_descriptor_to_attributes, check_property_change};
use crate::error::{VmError, VmResult};
use crate::key::PropertyKey;
use crate::slot::{Attributes, Getter, HostMember, Setter, Slot};
use crate::slot_map::{SlotAccess, SlotMap};
use crate::thread_safe::ThreadSafeSlotMapContainer;
use crate::value::Value;

/// Slot storage chosen at object creation
enum SlotStorage {
    Local(SlotMapContainer),
    Shared(ThreadSafeSlotMapContainer),
}

impl SlotStorage {
    #[inline]
    fn map(&self) -> &dyn SlotMap {
        match self {
            Self::Local(container) => container,
            Self::Shared(container) => container,
        }
    }
}

/// A JavaScript object
pub struct JsObject {
    slots: SlotStorage,
    prototype: Option<Arc<JsObject>>,
    extensible: AtomicBool,
}

impl JsObject {
    /// Extensible object with default storage
    pub fn new(prototype: Option<Arc<JsObject>>) -> Self {
        Self::with_config(prototype, &SlotMapConfig::default())
    }

    /// Extensible object with storage chosen by `config`
    pub fn with_config(prototype: Option<Arc<JsObject>>, config: &SlotMapConfig) -> Self {
        let slots = if config.thread_safe {
            SlotStorage::Shared(ThreadSafeSlotMapContainer::with_config(config))
        } else {
            SlotStorage::Local(SlotMapContainer::with_config(config))
        };
        Self {
            slots,
            prototype,
            extensible: AtomicBool::new(true),
        }
    }

    /// `[[Prototype]]`
    pub fn prototype(&self) -> Option<&Arc<JsObject>> {
        self.prototype.as_ref()
    }

    /// Whether the slots sit behind a stamped lock
    pub fn is_thread_safe(&self) -> bool {
        matches!(self.slots, SlotStorage::Shared(_))
    }

    /// The slot container
    pub fn slots(&self) -> &dyn SlotMap {
        self.slots.map()
    }

    /// Number of own properties
    pub fn slot_count(&self) -> usize {
        self.slots().size()
    }

    /// Whether the container switched to the balanced map
    pub fn is_large_object_mode(&self) -> bool {
        match &self.slots {
            SlotStorage::Local(container) => container.is_large_object_mode(),
            SlotStorage::Shared(container) => container.is_large_object_mode(),
        }
    }

    /// Own slot for `key`
    pub fn get_own_slot(&self, key: &PropertyKey) -> Option<Arc<Slot>> {
        self.slots().query(key)
    }

    fn modify_slot(&self, key: &PropertyKey, access: SlotAccess) -> VmResult<Arc<Slot>> {
        self.slots()
            .get(key, access)
            .ok_or_else(|| VmError::internal(format!("no slot created for {}", key)))
    }

    fn find_attribute_slot(&self, key: &PropertyKey) -> VmResult<Arc<Slot>> {
        self.get_own_slot(key)
            .ok_or_else(|| VmError::reference_error(format!("Property {} not found.", key)))
    }

    fn not_extensible(key: &PropertyKey) -> VmError {
        VmError::type_error(format!(
            "Cannot add property {}, object is not extensible",
            key
        ))
    }

    /// Turn down a definition the property does not allow: `TypeError` in
    /// strict mode, otherwise a silent no-op
    fn refuse_redefinition(cx: &ExecutionContext, key: &PropertyKey, change: &str) -> VmResult<()> {
        if cx.is_strict() {
            return Err(VmError::type_error(format!("Cannot redefine property: {}", key)));
        }
        tracing::trace!(target: "otter::slots", %key, change, "refused change of non-configurable property");
        Ok(())
    }

    fn refuse_addition(cx: &ExecutionContext, key: &PropertyKey) -> VmResult<()> {
        if cx.is_strict() {
            return Err(Self::not_extensible(key));
        }
        tracing::trace!(target: "otter::slots", %key, "refused addition to non-extensible object");
        Ok(())
    }

    /// Apply `requested` unless the slot's current attributes forbid it
    fn change_attributes(
        cx: &ExecutionContext,
        key: &PropertyKey,
        slot: &Slot,
        requested: Attributes,
    ) -> VmResult<()> {
        let mut refused = false;
        slot.update_attributes(|current| {
            if current.permits_change_to(requested) {
                requested
            } else {
                refused = true;
                current
            }
        });
        if refused {
            return Self::refuse_redefinition(cx, key, "attributes");
        }
        Ok(())
    }

    // ---- lookup ----

    /// `[[Get]]` with this object as the receiver
    pub fn get(self: &Arc<Self>, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<Value> {
        self.get_with_receiver(cx, key, &Value::object(self.clone()))
    }

    /// `[[Get]]` with an explicit receiver
    pub fn get_with_receiver(
        &self,
        cx: &ExecutionContext,
        key: &PropertyKey,
        receiver: &Value,
    ) -> VmResult<Value> {
        let mut current = self;
        loop {
            if let Some(slot) = current.get_own_slot(key) {
                return slot.get_value(cx, receiver);
            }
            match &current.prototype {
                Some(proto) => current = proto,
                None => return Ok(Value::undefined()),
            }
        }
    }

    /// `[[HasProperty]]`
    pub fn has(&self, key: &PropertyKey) -> bool {
        let mut current = self;
        loop {
            if current.has_own(key) {
                return true;
            }
            match &current.prototype {
                Some(proto) => current = proto,
                None => return false,
            }
        }
    }

    /// Own property check
    pub fn has_own(&self, key: &PropertyKey) -> bool {
        self.get_own_slot(key).is_some()
    }

    // ---- assignment ----

    /// `[[Set]]` with this object as the receiver.
    ///
    /// The write goes to the object in the prototype chain that holds `key`;
    /// if that is a data property on a prototype, an own property is created
    /// here instead.
    pub fn put(self: &Arc<Self>, cx: &ExecutionContext, key: &PropertyKey, value: Value) -> VmResult<()> {
        let receiver = Value::object(self.clone());
        let mut base = self;
        let mut cursor = Some(self);
        while let Some(obj) = cursor {
            if obj.has_own(key) {
                base = obj;
                break;
            }
            cursor = obj.prototype.as_ref();
        }

        if base.put_impl(cx, key, value.clone(), &receiver)? {
            return Ok(());
        }
        if !Arc::ptr_eq(base, self) && self.put_impl(cx, key, value, &receiver)? {
            return Ok(());
        }
        Err(VmError::internal(format!("unhandled assignment to {}", key)))
    }

    fn put_impl(
        self: &Arc<Self>,
        cx: &ExecutionContext,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> VmResult<bool> {
        let is_receiver = receiver.as_object().is_some_and(|r| Arc::ptr_eq(r, self));
        let slot = if is_receiver && self.is_extensible() {
            self.modify_slot(key, SlotAccess::Modify)?
        } else {
            match self.get_own_slot(key) {
                Some(slot) => slot,
                None if !self.is_extensible() && cx.is_strict() => {
                    return Err(Self::not_extensible(key));
                }
                None => return Ok(is_receiver),
            }
        };
        slot.set_value(cx, value, self, receiver)
    }

    // ---- definition ----

    /// Define or overwrite a data property with raw attributes.
    ///
    /// A non-configurable property still takes a new value while writable,
    /// and may become read-only. Any other change to it, or an addition to a
    /// non-extensible object, is ignored outside strict mode and a
    /// `TypeError` in strict mode.
    pub fn define_property(
        &self,
        cx: &ExecutionContext,
        key: PropertyKey,
        value: Value,
        attributes: Attributes,
    ) -> VmResult<()> {
        match self.get_own_slot(&key) {
            Some(slot) if !slot.attributes().is_configurable() => {
                let current = slot.attributes();
                if !slot.is_value_slot() {
                    return Self::refuse_redefinition(cx, &key, "accessor to data");
                }
                if !current.permits_change_to(attributes) {
                    return Self::refuse_redefinition(cx, &key, "attributes");
                }
                if current.is_writable() {
                    slot.set_raw_value(value);
                } else if !same_value(&slot.value(), &value) {
                    return Self::refuse_redefinition(cx, &key, "value");
                }
                return Self::change_attributes(cx, &key, &slot, attributes);
            }
            None if !self.is_extensible() => return Self::refuse_addition(cx, &key),
            _ => {}
        }
        let slot = self.modify_slot(&key, SlotAccess::ConvertAccessorToData)?;
        slot.set_raw_value(value);
        slot.set_attributes(attributes);
        Ok(())
    }

    /// `[[DefineOwnProperty]]`: validate `desc` against the current property, then apply it
    pub fn define_own_property(&self, key: &PropertyKey, desc: &PropertyDescriptor) -> VmResult<()> {
        if desc.is_data_descriptor() && desc.is_accessor_descriptor() {
            return Err(VmError::type_error(format!(
                "Invalid property descriptor for {}: both accessor and data fields",
                key
            )));
        }

        let existing = self.get_own_slot(key);
        let current = existing.as_deref().map(PropertyDescriptor::from_slot);
        check_property_change(key, current.as_ref(), desc, self.is_extensible())?;

        let is_accessor = desc.is_accessor_descriptor();
        let (slot, base) = match existing {
            Some(slot) => {
                let attributes = slot.attributes();
                (slot, attributes)
            }
            None => {
                let access = if is_accessor {
                    SlotAccess::ModifyGetterSetter
                } else {
                    SlotAccess::Modify
                };
                (
                    self.modify_slot(key, access)?,
                    Attributes::READONLY | Attributes::DONTENUM | Attributes::PERMANENT,
                )
            }
        };
        let mut attributes = apply_descriptor_to_attributes(base, desc);

        if is_accessor {
            let slot = if slot.is_value_slot() {
                self.modify_slot(key, SlotAccess::ModifyGetterSetter)?
            } else {
                slot
            };
            slot.update_accessor(|pair| {
                if let Some(get) = &desc.get {
                    pair.getter = Some(Getter::function(get.clone()));
                }
                if let Some(set) = &desc.set {
                    pair.setter = Some(Setter::function(set.clone()));
                }
            });
            slot.set_raw_value(Value::undefined());
            attributes.remove(Attributes::READONLY);
            slot.set_attributes(attributes);
        } else {
            let slot = if !slot.is_value_slot() && desc.is_data_descriptor() {
                if desc.writable.is_none() {
                    attributes.insert(Attributes::READONLY);
                }
                let slot = self.modify_slot(key, SlotAccess::ConvertAccessorToData)?;
                slot.set_raw_value(Value::undefined());
                slot
            } else {
                slot
            };
            if let Some(value) = &desc.value {
                slot.set_raw_value(value.clone());
            }
            slot.set_attributes(attributes);
        }
        Ok(())
    }

    /// Install an accessor property, keeping a half that is passed as `None`.
    ///
    /// Refused like [`define_property`](Self::define_property) when the
    /// property is non-configurable or the object is not extensible.
    pub fn define_accessor(
        &self,
        cx: &ExecutionContext,
        key: PropertyKey,
        getter: Option<Getter>,
        setter: Option<Setter>,
        attributes: Attributes,
    ) -> VmResult<()> {
        match self.get_own_slot(&key) {
            Some(slot) if !slot.attributes().is_configurable() => {
                return Self::refuse_redefinition(cx, &key, "accessor");
            }
            None if !self.is_extensible() => return Self::refuse_addition(cx, &key),
            _ => {}
        }
        let slot = self.modify_slot(&key, SlotAccess::ModifyGetterSetter)?;
        slot.update_accessor(|pair| {
            if getter.is_some() {
                pair.getter = getter;
            }
            if setter.is_some() {
                pair.setter = setter;
            }
        });
        slot.set_attributes(attributes);
        Ok(())
    }

    /// Accessor backed by script functions
    pub fn define_accessor_property(
        &self,
        cx: &ExecutionContext,
        key: PropertyKey,
        getter: Option<Value>,
        setter: Option<Value>,
        attributes: Attributes,
    ) -> VmResult<()> {
        self.define_accessor(
            cx,
            key,
            getter.map(Getter::function),
            setter.map(Setter::function),
            attributes,
        )
    }

    /// Read-only accessor backed by a host closure
    pub fn define_native_accessor<G>(
        &self,
        cx: &ExecutionContext,
        key: PropertyKey,
        getter: G,
        attributes: Attributes,
    ) -> VmResult<()>
    where
        G: Fn(&ExecutionContext, &Value) -> VmResult<Value> + Send + Sync + 'static,
    {
        let getter = Getter::native(&key.display_name(), getter);
        self.define_accessor(cx, key, Some(getter), None, attributes)
    }

    /// Read/write accessor backed by host closures
    pub fn define_native_accessor_with_setter<G, S>(
        &self,
        cx: &ExecutionContext,
        key: PropertyKey,
        getter: G,
        setter: S,
        attributes: Attributes,
    ) -> VmResult<()>
    where
        G: Fn(&ExecutionContext, &Value) -> VmResult<Value> + Send + Sync + 'static,
        S: Fn(&ExecutionContext, &Value, Value) -> VmResult<()> + Send + Sync + 'static,
    {
        let name = key.display_name();
        let getter = Getter::native(&name, getter);
        let setter = Setter::native(&name, setter);
        self.define_accessor(cx, key, Some(getter), Some(setter), attributes)
    }

    /// Accessor backed by host members
    pub fn define_member_accessor(
        &self,
        cx: &ExecutionContext,
        key: PropertyKey,
        getter: Option<Arc<HostMember>>,
        setter: Option<Arc<HostMember>>,
        attributes: Attributes,
    ) -> VmResult<()> {
        let getter = getter.map(|member| Getter::member(member.name(), member.clone()));
        let setter = setter.map(|member| Setter::member(member.name(), member.clone()));
        self.define_accessor(cx, key, getter, setter, attributes)
    }

    // ---- const declarations ----

    /// Declare an uninitialized const binding
    pub fn define_const(self: &Arc<Self>, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<()> {
        self.put_const_impl(cx, key, Value::undefined(), false)
    }

    /// Initialize a const binding; later assignments leave it unchanged
    pub fn put_const(self: &Arc<Self>, cx: &ExecutionContext, key: &PropertyKey, value: Value) -> VmResult<()> {
        self.put_const_impl(cx, key, value, true)
    }

    fn put_const_impl(
        self: &Arc<Self>,
        cx: &ExecutionContext,
        key: &PropertyKey,
        value: Value,
        initialize: bool,
    ) -> VmResult<()> {
        if !self.is_extensible() {
            if cx.is_strict() {
                return Err(Self::not_extensible(key));
            }
            if let Some(slot) = self.get_own_slot(key) {
                slot.set_value(cx, value, self, &Value::object(self.clone()))?;
            }
            return Ok(());
        }

        let slot = match self.slots().get(key, SlotAccess::ModifyConst) {
            Some(created) => created,
            None => self.find_attribute_slot(key)?,
        };
        let attributes = slot.attributes();
        if attributes.is_writable() {
            return Err(VmError::type_error(format!("redeclaration of var {}", key)));
        }
        if attributes.contains(Attributes::UNINITIALIZED_CONST) {
            slot.set_raw_value(value);
            if initialize {
                slot.update_attributes(|attrs| attrs - Attributes::UNINITIALIZED_CONST);
            }
        }
        Ok(())
    }

    // ---- attributes and descriptors ----

    /// Attributes of an own property
    pub fn get_attributes(&self, key: &PropertyKey) -> VmResult<Attributes> {
        Ok(self.find_attribute_slot(key)?.attributes())
    }

    /// Replace the attributes of an own property from a raw bit pattern.
    ///
    /// A non-configurable property (const bindings included) only accepts
    /// gaining `READONLY`; other patterns are refused like a redefinition.
    pub fn set_attributes(&self, cx: &ExecutionContext, key: &PropertyKey, bits: u32) -> VmResult<()> {
        let attributes = Attributes::check_valid(bits)?;
        let slot = self.find_attribute_slot(key)?;
        Self::change_attributes(cx, key, &slot, attributes)
    }

    /// Typed descriptor of an own property
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.get_own_slot(key)
            .map(|slot| PropertyDescriptor::from_slot(&slot))
    }

    /// `Object.getOwnPropertyDescriptor`
    pub fn get_own_property_descriptor(
        &self,
        cx: &ExecutionContext,
        key: &PropertyKey,
    ) -> VmResult<Option<Arc<JsObject>>> {
        self.get_own_slot(key)
            .map(|slot| slot.get_property_descriptor(cx))
            .transpose()
    }

    // ---- deletion and enumeration ----

    /// `[[Delete]]`: false when a non-configurable property refused outside strict mode
    pub fn delete(&self, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<bool> {
        self.slots().remove(cx, key)
    }

    /// Own property keys: integer indices ascending, then strings, then
    /// symbols, each group in creation order
    pub fn own_keys(&self, include_non_enumerable: bool, include_symbols: bool) -> Vec<PropertyKey> {
        let slots = self.slots();
        let guard = slots.read_lock();
        let mut indices = Vec::new();
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for slot in slots.iter(&guard) {
            if !include_non_enumerable && !slot.attributes().is_enumerable() {
                continue;
            }
            match slot.key() {
                PropertyKey::Index(i) => indices.push(*i),
                key @ PropertyKey::String(_) => strings.push(key.clone()),
                key @ PropertyKey::Symbol(_) if include_symbols => symbols.push(key.clone()),
                PropertyKey::Symbol(_) => {}
            }
        }
        drop(guard);

        indices.sort_unstable();
        indices
            .into_iter()
            .map(PropertyKey::Index)
            .chain(strings)
            .chain(symbols)
            .collect()
    }

    // ---- extensibility ----

    /// `[[IsExtensible]]`
    pub fn is_extensible(&self) -> bool {
        self.extensible.load(Ordering::Acquire)
    }

    /// `[[PreventExtensions]]`; never fails for ordinary objects
    pub fn prevent_extensions(&self) -> bool {
        self.extensible.store(false, Ordering::Release);
        true
    }
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObject")
            .field("slots", &self.slot_count())
            .field("extensible", &self.is_extensible())
            .field("thread_safe", &self.is_thread_safe())
            .finish()
    }
}

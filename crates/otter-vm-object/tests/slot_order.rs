//! Creation-order iteration across table growth, deletion and the
//! switch to the balanced map.

use std::sync::Arc;

use otter_vm_object::{
    Attributes, EmbeddedSlotMap, ExecutionContext, JsObject, PropertyKey, Slot, SlotAccess, SlotMap,
    SlotMapConfig, Value,
};
use proptest::prelude::*;
use tracing_subscriber::filter::EnvFilter;

/// `RUST_LOG=otter::slots=trace` shows growth and migration events
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn iter_keys(map: &dyn SlotMap) -> Vec<PropertyKey> {
    let guard = map.read_lock();
    map.iter(&guard).map(|slot| slot.key().clone()).collect()
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u8),
    Remove(u8),
    ToAccessor(u8),
    ToData(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16).prop_map(Op::Insert),
        2 => (0u8..16).prop_map(Op::Remove),
        1 => (0u8..16).prop_map(Op::ToAccessor),
        1 => (0u8..16).prop_map(Op::ToData),
    ]
}

fn name(n: u8) -> PropertyKey {
    PropertyKey::from(format!("k{}", n).as_str())
}

proptest! {
    /// Iteration order equals first-insertion order of the surviving keys
    #[test]
    fn prop_iteration_follows_creation_order(ops in prop::collection::vec(op_strategy(), 0..64)) {
        let cx = ExecutionContext::new();
        let map = EmbeddedSlotMap::with_capacity(4);
        let mut model: Vec<PropertyKey> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(n) => {
                    let key = name(n);
                    prop_assert!(map.get(&key, SlotAccess::Modify).is_some());
                    if !model.contains(&key) {
                        model.push(key);
                    }
                }
                Op::Remove(n) => {
                    let key = name(n);
                    prop_assert!(map.remove(&cx, &key).unwrap());
                    model.retain(|k| k != &key);
                }
                Op::ToAccessor(n) => {
                    let key = name(n);
                    if model.contains(&key) {
                        let slot = map.get(&key, SlotAccess::ModifyGetterSetter).unwrap();
                        prop_assert!(!slot.is_value_slot());
                    }
                }
                Op::ToData(n) => {
                    let key = name(n);
                    if model.contains(&key) {
                        let slot = map.get(&key, SlotAccess::ConvertAccessorToData).unwrap();
                        prop_assert!(slot.is_value_slot());
                    }
                }
            }
            prop_assert_eq!(map.size(), model.len());
        }

        prop_assert_eq!(iter_keys(&map), model);
    }

    /// Every inserted key stays reachable through any number of rehashes
    #[test]
    fn prop_lookup_survives_growth(count in 1usize..200) {
        let map = EmbeddedSlotMap::with_capacity(4);
        for i in 0..count {
            let key = PropertyKey::from(format!("p{}", i).as_str());
            let slot = map.get(&key, SlotAccess::Modify).unwrap();
            slot.set_raw_value(Value::int32(i as i32));
        }
        for i in 0..count {
            let key = PropertyKey::from(format!("p{}", i).as_str());
            let slot = map.query(&key).unwrap();
            prop_assert_eq!(slot.value(), Value::int32(i as i32));
        }
        prop_assert!(map.capacity().is_power_of_two());
        prop_assert!(4 * map.size() <= 3 * map.capacity());
    }
}

#[test]
fn test_ten_keys_keep_order_through_growth() {
    init_tracing();
    let map = EmbeddedSlotMap::with_capacity(4);
    let keys: Vec<PropertyKey> = (0..10)
        .map(|i| PropertyKey::from(format!("key{}", i).as_str()))
        .collect();
    for key in &keys {
        map.add(Arc::new(Slot::data(key.clone(), Attributes::empty())));
    }
    assert!(map.capacity() >= 16);
    assert_eq!(iter_keys(&map), keys);
}

#[test]
fn test_large_object_switch_happens_once_at_threshold() {
    init_tracing();
    let cx = ExecutionContext::new();
    let obj = Arc::new(JsObject::new(None));
    for i in 0..2000u32 {
        obj.define_property(&cx, PropertyKey::index(i), Value::int32(i as i32), Attributes::empty())
            .unwrap();
    }
    assert_eq!(obj.slot_count(), 2000);
    assert!(!obj.is_large_object_mode());

    obj.define_property(&cx, PropertyKey::index(2000), Value::int32(2000), Attributes::empty())
        .unwrap();
    assert_eq!(obj.slot_count(), 2001);
    assert!(obj.is_large_object_mode());

    for i in (0..2001u32).step_by(97) {
        assert_eq!(
            obj.get(&cx, &PropertyKey::index(i)).unwrap(),
            Value::int32(i as i32)
        );
    }

    // Shrinking below the threshold does not switch back
    for i in 0..1500u32 {
        assert!(obj.delete(&cx, &PropertyKey::index(i)).unwrap());
    }
    assert_eq!(obj.slot_count(), 501);
    assert!(obj.is_large_object_mode());
}

#[test]
fn test_migration_preserves_creation_order() {
    let cx = ExecutionContext::new();
    let config = SlotMapConfig {
        large_object_threshold: 8,
        ..SlotMapConfig::default()
    };
    let obj = Arc::new(JsObject::with_config(None, &config));
    let names: Vec<String> = (0..12).rev().map(|i| format!("m{}", i)).collect();
    for name in &names {
        obj.define_property(&cx, PropertyKey::from(name.as_str()), Value::null(), Attributes::empty())
            .unwrap();
    }
    assert!(obj.is_large_object_mode());

    let listed: Vec<String> = obj.own_keys(true, false).iter().map(|k| k.to_string()).collect();
    assert_eq!(listed, names);

    // Conversion in the balanced map keeps the position too
    obj.define_accessor_property(&cx, PropertyKey::from("m5"), None, None, Attributes::empty())
        .unwrap();
    let listed: Vec<String> = iter_keys(obj.slots()).iter().map(|k| k.to_string()).collect();
    assert_eq!(listed, names);
}

#[test]
fn test_const_slot_is_not_handed_out_twice() {
    let map = EmbeddedSlotMap::new();
    let key = PropertyKey::from("c");
    let first = map.get(&key, SlotAccess::ModifyConst).unwrap();
    assert_eq!(first.attributes(), Attributes::CONST);
    assert!(map.get(&key, SlotAccess::ModifyConst).is_none());
    assert_eq!(map.size(), 1);
}

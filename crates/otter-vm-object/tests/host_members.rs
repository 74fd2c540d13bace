//! Accessor properties backed by host members

use std::sync::Arc;

use parking_lot::Mutex;

use otter_vm_object::convert::TypeTag;
use otter_vm_object::error::ContinuationPending;
use otter_vm_object::{
    Attributes, ExecutionContext, HostError, HostMember, JsObject, PropertyKey, Value, VmError,
};

fn key(name: &str) -> PropertyKey {
    PropertyKey::from(name)
}

/// A host-side record exposing `count` through a getter/setter pair
fn counter_object(store: Arc<Mutex<i32>>) -> Arc<JsObject> {
    let read = store.clone();
    let getter = HostMember::new("getCount", vec![], move |_, _| {
        Ok(Value::int32(*read.lock()))
    });
    let write = store;
    let setter = HostMember::new("setCount", vec![TypeTag::Int], move |_, args| {
        let n = args.first().and_then(|v| v.as_int32()).unwrap_or_default();
        *write.lock() = n;
        Ok(Value::undefined())
    });

    let obj = Arc::new(JsObject::new(None));
    obj.define_member_accessor(
        &ExecutionContext::new(),
        key("count"),
        Some(Arc::new(getter)),
        Some(Arc::new(setter)),
        Attributes::empty(),
    )
    .unwrap();
    obj
}

#[test]
fn test_member_getter_and_setter() {
    let cx = ExecutionContext::new();
    let store = Arc::new(Mutex::new(3));
    let obj = counter_object(store.clone());

    assert_eq!(obj.get(&cx, &key("count")).unwrap(), Value::int32(3));
    obj.put(&cx, &key("count"), Value::int32(11)).unwrap();
    assert_eq!(*store.lock(), 11);
    assert_eq!(obj.get(&cx, &key("count")).unwrap(), Value::int32(11));
}

#[test]
fn test_setter_argument_is_coerced_by_declared_type() {
    let cx = ExecutionContext::new();
    let store = Arc::new(Mutex::new(0));
    let obj = counter_object(store.clone());

    obj.put(&cx, &key("count"), Value::string("42")).unwrap();
    assert_eq!(*store.lock(), 42);

    obj.put(&cx, &key("count"), Value::number(7.9)).unwrap();
    assert_eq!(*store.lock(), 7);

    obj.put(&cx, &key("count"), Value::boolean(true)).unwrap();
    assert_eq!(*store.lock(), 1);
}

#[test]
fn test_delegated_member_receives_receiver_as_argument() {
    let cx = ExecutionContext::new();
    let target = Arc::new(JsObject::new(None));
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));

    let target_value = Value::object(target.clone());
    let record = seen.clone();
    let getter = HostMember::new("label", vec![TypeTag::Object], move |this, args| {
        record.lock().push(this.clone());
        Ok(args.first().cloned().unwrap_or_default())
    })
    .with_delegate(target_value.clone());

    let record = seen.clone();
    let setter = HostMember::new(
        "setLabel",
        vec![TypeTag::Object, TypeTag::String],
        move |this, args| {
            record.lock().push(this.clone());
            record.lock().extend(args.iter().cloned());
            Ok(Value::undefined())
        },
    )
    .with_delegate(target_value.clone());

    let obj = Arc::new(JsObject::new(None));
    obj.define_member_accessor(
        &cx,
        key("label"),
        Some(Arc::new(getter)),
        Some(Arc::new(setter)),
        Attributes::empty(),
    )
    .unwrap();
    let receiver = Value::object(obj.clone());

    // Getter: invoked on the delegate with the receiver as its only argument
    let got = obj.get(&cx, &key("label")).unwrap();
    assert!(got.same_object(&receiver));
    assert!(seen.lock()[0].same_object(&target_value));

    // Setter: (receiver, coerced value), coerced by the last parameter type
    seen.lock().clear();
    obj.put(&cx, &key("label"), Value::int32(5)).unwrap();
    let calls = seen.lock().clone();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].same_object(&target_value));
    assert!(calls[1].same_object(&receiver));
    assert_eq!(calls[2], Value::string("5"));
}

#[test]
fn test_host_failure_becomes_script_error() {
    let cx = ExecutionContext::new();
    let getter = HostMember::new("explode", vec![], |_, _| {
        Err(HostError::Failure("device unavailable".into()))
    });
    let obj = Arc::new(JsObject::new(None));
    obj.define_member_accessor(&cx, key("device"), Some(Arc::new(getter)), None, Attributes::empty())
        .unwrap();

    match obj.get(&cx, &key("device")).unwrap_err() {
        VmError::HostError { member, message } => {
            assert_eq!(member, "explode");
            assert_eq!(message, "device unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_continuation_passes_through_untouched() {
    let cx = ExecutionContext::new();
    let setter = HostMember::new("suspend", vec![TypeTag::Value], |_, _| {
        Err(HostError::Continuation(ContinuationPending {
            id: 17,
            application_state: Value::string("paused"),
        }))
    });
    let obj = Arc::new(JsObject::new(None));
    obj.define_member_accessor(&cx, key("yield"), None, Some(Arc::new(setter)), Attributes::empty())
        .unwrap();

    let err = obj.put(&cx, &key("yield"), Value::null()).unwrap_err();
    assert!(err.is_continuation());
    let VmError::ContinuationPending(pending) = err else {
        unreachable!();
    };
    assert_eq!(pending.id, 17);
    assert_eq!(pending.application_state, Value::string("paused"));
}

#[test]
fn test_member_descriptor_reports_functions() {
    let cx = ExecutionContext::new();
    let obj = counter_object(Arc::new(Mutex::new(0)));
    let desc = obj.get_own_property_descriptor(&cx, &key("count")).unwrap().unwrap();

    let get = desc.get(&cx, &key("get")).unwrap();
    let set = desc.get(&cx, &key("set")).unwrap();
    assert_eq!(get.as_function().unwrap().name(), "getCount");
    assert_eq!(set.as_function().unwrap().name(), "setCount");

    // The reported setter function drives the same member
    set.as_function()
        .unwrap()
        .call(&cx, &Value::object(obj.clone()), &[Value::int32(9)])
        .unwrap();
    assert_eq!(obj.get(&cx, &key("count")).unwrap(), Value::int32(9));
}

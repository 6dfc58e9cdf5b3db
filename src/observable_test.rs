use super::*;
use std::cell::RefCell;

use serde_json::json;

fn data(bus: &EventBus, model: &str, value: Value) -> ObservableData {
    let Value::Object(map) = value else {
        panic!("test data must be an object");
    };
    ObservableData::new(bus, model, map)
}

fn recorder(bus: &EventBus, event: &str) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let _sub = bus.subscribe(event, move |v: &Value| {
        sink.borrow_mut().push(v.clone());
        Ok(())
    });
    seen
}

#[test]
fn change_event_uses_model_dot_property_suffix() {
    assert_eq!(change_event("testModel", "property0"), "testModel.property0:change");
    assert_eq!(change_event("", "name"), ".name:change");
}

#[test]
fn install_keeps_initial_values() {
    let bus = EventBus::new();
    let d = data(&bus, "m", json!({ "greeting": "hi", "age": 30 }));

    assert_eq!(d.get("greeting"), Some(json!("hi")));
    assert_eq!(d.get("age"), Some(json!(30)));
    assert_eq!(d.observed_keys(), vec!["age", "greeting"]);
}

#[test]
fn write_publishes_change_with_new_value() {
    let bus = EventBus::new();
    let seen0 = recorder(&bus, "testModel.property0:change");
    let seen1 = recorder(&bus, "testModel.property1:change");
    let d = data(&bus, "testModel", json!({ "property0": "value0", "property1": "value1" }));

    d.set("property0", "value2").unwrap();
    d.set("property1", "value3").unwrap();

    assert_eq!(*seen0.borrow(), vec![json!("value2")]);
    assert_eq!(*seen1.borrow(), vec![json!("value3")]);
    assert_eq!(d.get("property0"), Some(json!("value2")));
    assert_eq!(d.get("property1"), Some(json!("value3")));
}

#[test]
fn listener_reads_fresh_value_during_publish() {
    let bus = EventBus::new();
    let d = data(&bus, "m", json!({ "count": 1 }));
    let observed = Rc::new(RefCell::new(None));

    let reader = d.clone();
    let sink = Rc::clone(&observed);
    let _sub = bus.subscribe("m.count:change", move |_: &Value| {
        *sink.borrow_mut() = reader.get("count");
        Ok(())
    });

    d.set("count", 2).unwrap();
    assert_eq!(*observed.borrow(), Some(json!(2)));
}

#[test]
fn equal_value_still_publishes_once_per_write() {
    let bus = EventBus::new();
    let seen = recorder(&bus, "m.flag:change");
    let d = data(&bus, "m", json!({ "flag": true }));

    d.set("flag", true).unwrap();
    d.set("flag", true).unwrap();

    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn keys_added_later_are_plain() {
    let bus = EventBus::new();
    let seen = recorder(&bus, "m.extra:change");
    let d = data(&bus, "m", json!({ "name": "a" }));

    d.set("extra", 1).unwrap();

    assert!(seen.borrow().is_empty());
    assert!(d.contains("extra"));
    assert!(!d.is_observed("extra"));
    assert!(d.property("extra").is_none());
    assert_eq!(d.get("extra"), Some(json!(1)));
}

#[test]
fn empty_model_prefix_is_allowed() {
    let bus = EventBus::new();
    let seen = recorder(&bus, ".name:change");
    let d = data(&bus, "", json!({ "name": "a" }));

    d.set("name", "b").unwrap();
    assert_eq!(*seen.borrow(), vec![json!("b")]);
}

#[test]
fn same_model_name_shares_channels() {
    let bus = EventBus::new();
    let seen = recorder(&bus, "shared.name:change");
    let first = data(&bus, "shared", json!({ "name": "a" }));
    let second = data(&bus, "shared", json!({ "name": "b" }));

    first.set("name", "x").unwrap();
    second.set("name", "y").unwrap();

    assert_eq!(*seen.borrow(), vec![json!("x"), json!("y")]);
}

#[test]
fn property_wrapper_reads_and_writes_through() {
    let bus = EventBus::new();
    let seen = recorder(&bus, "m.age:change");
    let d = data(&bus, "m", json!({ "age": 30 }));

    let age = d.property("age").unwrap();
    assert_eq!(age.name(), "age");
    assert_eq!(age.event(), "m.age:change");
    assert_eq!(age.get(), json!(30));

    age.set(31).unwrap();
    assert_eq!(d.get("age"), Some(json!(31)));
    assert_eq!(*seen.borrow(), vec![json!(31)]);
}

#[test]
fn write_stores_value_even_when_delivery_fails() {
    let bus = EventBus::new();
    let d = data(&bus, "m", json!({ "a": 0 }));
    let writer = d.clone();
    let _sub = bus.subscribe("m.a:change", move |v: &Value| writer.set("a", v.clone()));

    let err = d.set("a", 5).unwrap_err();
    assert!(matches!(err, BusError::Cycle { .. }));
    assert_eq!(d.get("a"), Some(json!(5)));
}

#[test]
fn snapshot_copies_current_state() {
    let bus = EventBus::new();
    let d = data(&bus, "m", json!({ "a": 1 }));
    let before = d.snapshot();
    d.set("a", 2).unwrap();

    assert_eq!(before.get("a"), Some(&json!(1)));
    assert_eq!(d.snapshot().get("a"), Some(&json!(2)));
}

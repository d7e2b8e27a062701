//! Integration tests for values and property masks.

use rulebook_foundation::{Object, PropertyMask, Value};

fn person(name: &str, age: i64) -> Value {
    Object::new("org.test.Person")
        .with("name", name)
        .with("age", age)
        .into()
}

// =============================================================================
// Equality
// =============================================================================

#[test]
fn numbers_order_across_kinds() {
    assert_ne!(Value::Int(2), Value::Float(2.0));
    assert!(Value::Int(2) < Value::Float(2.5));
    assert_eq!(Value::Float(3.0).index_key(), Value::Int(3).index_key());
    assert_ne!(Value::Float(3.5).index_key(), Value::Int(3).index_key());
}

#[test]
fn objects_compare_structurally() {
    assert_eq!(person("Ann", 30), person("Ann", 30));
    assert_ne!(person("Ann", 30), person("Ann", 31));
}

// =============================================================================
// Objects
// =============================================================================

#[test]
fn set_returns_a_new_object() {
    let Value::Object(original) = person("Ann", 30) else {
        panic!("expected object");
    };
    let older = original.set("age", Value::Int(31));
    assert_eq!(original.get("age"), Some(&Value::Int(30)));
    assert_eq!(older.get("age"), Some(&Value::Int(31)));
}

#[test]
fn display_uses_simple_type_name() {
    assert_eq!(person("Ann", 30).to_string(), "Person(age=30, name=\"Ann\")");
    assert_eq!(Value::Nil.to_string(), "null");
    assert_eq!(Value::Float(1.0).to_string(), "1.0");
}

#[test]
fn type_names() {
    assert_eq!(Value::Int(1).type_name(), "Integer");
    assert_eq!(Value::Float(1.5).type_name(), "Double");
    assert_eq!(Value::from("x").type_name(), "String");
    assert_eq!(person("Ann", 1).type_name(), "org.test.Person");
}

// =============================================================================
// Change Masks
// =============================================================================

#[test]
fn full_masks_meet_every_watched_field() {
    let watched = PropertyMask::of(["age"]);
    assert!(PropertyMask::all().intersects(&watched));
    assert!(!PropertyMask::of(["name"]).intersects(&watched));
    assert!(!PropertyMask::all().intersects(&PropertyMask::empty()));
}

#[test]
fn masks_union_up_to_all() {
    let mut mask = PropertyMask::of(["age"]);
    mask.union_with(&PropertyMask::of(["name"]));
    assert_eq!(mask, PropertyMask::of(["age", "name"]));
    mask.union_with(&PropertyMask::all());
    assert!(mask.is_all());
}

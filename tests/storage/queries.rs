//! Integration tests for filtered queries.

use rulebook_foundation::{FactType, FieldType, Object, TypeRegistry, Value};
use rulebook_storage::{FactStore, ObjectFilter};

fn store() -> FactStore {
    let mut store = FactStore::new();
    store.insert(Object::new("org.test.Person").with("age", 30).into());
    store.insert(Value::Int(47));
    store.insert(Object::new("org.test.Student").with("age", 20).into());
    store.insert(Value::from("Hello World"));
    store
}

#[test]
fn query_by_type_follows_insertion_order() {
    let store = store();
    let filter = ObjectFilter::of_type("Integer");
    let found: Vec<_> = store.query(&filter).map(|(_, v)| v.clone()).collect();
    assert_eq!(found, vec![Value::Int(47)]);
}

#[test]
fn simple_and_qualified_names_match() {
    let store = store();
    assert_eq!(store.query(&ObjectFilter::of_type("Person")).count(), 1);
    assert_eq!(store.query(&ObjectFilter::of_type("org.test.Person")).count(), 1);
    assert_eq!(store.query(&ObjectFilter::of_type("other.Person")).count(), 0);
}

#[test]
fn registry_aware_filters_include_subtypes() {
    let mut registry = TypeRegistry::new();
    registry
        .register(FactType::new("org.test.Person").with_field("age", FieldType::Int))
        .unwrap();
    registry
        .register(FactType::new("org.test.Student").with_supertype("org.test.Person"))
        .unwrap();

    let store = store();
    let filter = ObjectFilter::of_type("Person");
    let people = store
        .iter()
        .filter(|(_, v)| filter.accepts_in(v, &registry))
        .count();
    assert_eq!(people, 2);
}

#[test]
fn predicate_and_all_filters() {
    let store = store();
    assert_eq!(store.query(&ObjectFilter::All).count(), 4);
    let adults = ObjectFilter::matching(|v| {
        v.field("age").and_then(Value::as_int).is_some_and(|age| age >= 21)
    });
    assert_eq!(store.query(&adults).count(), 1);
}

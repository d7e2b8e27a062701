//! Integration tests for fact store mutations.

use rulebook_foundation::{ErrorKind, FactHandle, Object, PropertyMask, Value};
use rulebook_storage::{Delta, FactStore};

fn person(name: &str, age: i64) -> Value {
    Object::new("org.test.Person")
        .with("name", name)
        .with("age", age)
        .into()
}

#[test]
fn insert_update_retract_deltas() {
    let mut store = FactStore::new();
    let (handle, delta) = store.insert(person("Ann", 30));
    assert_eq!(delta.handle(), handle);
    assert_eq!(delta.current(), Some(&person("Ann", 30)));

    let delta = store.update(handle, person("Ann", 31), None).unwrap();
    let Delta::Update { old, new, mask, .. } = &delta else {
        panic!("expected update");
    };
    assert_eq!(old, &person("Ann", 30));
    assert_eq!(new, &person("Ann", 31));
    assert_eq!(mask, &PropertyMask::all());

    let delta = store.retract(handle).unwrap();
    assert!(matches!(delta, Delta::Retract { .. }));
    assert_eq!(delta.current(), None);
    assert!(store.is_empty());
}

#[test]
fn stale_handles_fail() {
    let mut store = FactStore::new();
    let (handle, _) = store.insert(Value::Int(1));
    store.retract(handle).unwrap();

    let err = store.retract(handle).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownHandle(h) if h == handle));
    let err = store.update(handle, Value::Int(2), None).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownHandle(_)));
    assert!(store.get(FactHandle::new(99)).is_none());
}

#[test]
fn identical_values_get_distinct_handles() {
    let mut store = FactStore::new();
    let (a, _) = store.insert(Value::from("x"));
    let (b, _) = store.insert(Value::from("x"));
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);
}

#[test]
fn snapshot_survives_later_changes() {
    let mut store = FactStore::new();
    let (a, _) = store.insert(person("Ann", 30));
    let snapshot = store.snapshot();

    store.update(a, person("Ann", 40), None).unwrap();
    store.insert(Value::Int(5));

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get(&a), Some(&person("Ann", 30)));
    assert_eq!(store.get(a), Some(&person("Ann", 40)));
}

//! Integration tests for fact types and the type registry.

use rulebook_foundation::{ErrorKind, FactType, FieldType, TypeRegistry, Value};

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register(
            FactType::new("org.test.Person")
                .with_field("name", FieldType::String)
                .with_field("age", FieldType::Int),
        )
        .unwrap();
    registry
        .register(
            FactType::new("org.test.Student")
                .with_supertype("org.test.Person")
                .with_field("school", FieldType::String),
        )
        .unwrap();
    registry
}

#[test]
fn resolution_order() {
    let registry = registry();
    let none: &[String] = &[];
    assert!(registry.resolve("org.test.Person", "", none).is_some());
    assert!(registry.resolve("Person", "org.test", none).is_some());
    assert!(registry.resolve("Person", "other", none).is_none());
    let wildcard = vec!["org.test.*".to_string()];
    assert!(registry.resolve("Student", "other", &wildcard).is_some());
    let single = vec!["org.test.Person".to_string()];
    assert!(registry.resolve("Person", "other", &single).is_some());
    assert!(registry.resolve("Integer", "other", none).is_some());
}

#[test]
fn subtypes_and_builtins() {
    let registry = registry();
    assert!(registry.is_assignable("org.test.Student", "org.test.Person"));
    assert!(!registry.is_assignable("org.test.Person", "org.test.Student"));
    assert!(registry.is_assignable("Integer", "Number"));
    assert!(registry.is_assignable("Double", "Number"));
    assert!(registry.is_assignable("Long", "Integer"));
    assert!(registry.is_assignable("String", "Object"));
}

#[test]
fn inherited_fields_come_first() {
    let registry = registry();
    let names: Vec<_> = registry
        .all_fields("org.test.Student")
        .into_iter()
        .map(|f| f.name.to_string())
        .collect();
    assert_eq!(names, vec!["name", "age", "school"]);
}

#[test]
fn instantiate_fills_defaults_and_coerces() {
    let registry = registry();
    let student = registry
        .instantiate("org.test.Student", vec![Value::from("Ann")])
        .unwrap();
    assert_eq!(student.field("age"), Some(&Value::Int(0)));
    assert_eq!(student.field("school"), Some(&Value::Nil));

    let err = registry
        .instantiate("org.test.Person", vec![Value::Int(1)])
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));

    let err = registry
        .instantiate("org.test.Person", vec![Value::Nil, Value::Int(1), Value::Int(2)])
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ArityMismatch { .. }));
}

#[test]
fn duplicate_types_are_rejected() {
    let mut registry = registry();
    let err = registry
        .register(FactType::new("org.test.Person"))
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DuplicateType(_)));
}

#[test]
fn find_by_simple_name() {
    let registry = registry();
    assert_eq!(registry.find("Student").unwrap().name(), "org.test.Student");
    assert!(registry.find("Nobody").is_none());
}

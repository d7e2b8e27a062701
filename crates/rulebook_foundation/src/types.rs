//! Fact type descriptors and type resolution.
//!
//! Every fact has a runtime type name (see [`Value::type_name`]). Patterns
//! filter facts by type, and `new T(..)` expressions construct objects from a
//! type's ordered field list. The [`TypeRegistry`] resolves the names that
//! appear in rule source and answers assignability questions for the network.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, ErrorKind};
use crate::value::{Object, Value};
use crate::Result;

/// Built-in type names, always visible without imports.
pub const BUILTIN_TYPES: &[&str] = &[
    "Object", "Number", "Integer", "Long", "Short", "Double", "Float", "String", "Boolean",
];

/// Declared type of a fact field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Integral number.
    Int,
    /// Floating-point number.
    Float,
    /// String.
    String,
    /// Boolean.
    Bool,
    /// Instance of another fact type (qualified name).
    Object(Arc<str>),
    /// Any value.
    Any,
}

impl FieldType {
    /// Parses a field type from its source spelling (`int`, `String`, ...).
    ///
    /// Unknown names are treated as object type references.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "int" | "long" | "short" | "Integer" | "Long" | "Short" => Self::Int,
            "double" | "float" | "Double" | "Float" => Self::Float,
            "String" => Self::String,
            "boolean" | "Boolean" => Self::Bool,
            "Object" => Self::Any,
            other => Self::Object(other.into()),
        }
    }

    /// Returns the default value of a field of this type.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::String | Self::Object(_) | Self::Any => Value::Nil,
        }
    }

    /// Coerces a value into this field type.
    ///
    /// Integers widen to floats; null is accepted by reference types.
    ///
    /// # Errors
    /// Returns a type mismatch if the value cannot be stored in the field.
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match (self, value) {
            (Self::Any, v)
            | (Self::Int, v @ Value::Int(_))
            | (Self::Float, v @ Value::Float(_))
            | (Self::Bool, v @ Value::Bool(_))
            | (Self::String, v @ (Value::String(_) | Value::Nil))
            | (Self::Object(_), v @ (Value::Object(_) | Value::Nil)) => Ok(v),
            (Self::Float, Value::Int(n)) => Ok(Value::Float(n as f64)),
            (ty, v) => Err(Error::type_mismatch(ty.to_string(), v.type_name())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "double"),
            Self::String => write!(f, "String"),
            Self::Bool => write!(f, "boolean"),
            Self::Object(name) => write!(f, "{name}"),
            Self::Any => write!(f, "Object"),
        }
    }
}

/// A field of a fact type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldDef {
    /// Field name.
    pub name: Arc<str>,
    /// Field type.
    pub ty: FieldType,
}

/// Descriptor of a fact type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FactType {
    name: Arc<str>,
    supertype: Option<Arc<str>>,
    fields: Vec<FieldDef>,
}

impl FactType {
    /// Creates a fact type with the given qualified name and no fields.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            supertype: None,
            fields: Vec::new(),
        }
    }

    /// Builder method to add a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<Arc<str>>, ty: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Builder method to set the supertype.
    #[must_use]
    pub fn with_supertype(mut self, supertype: impl Into<Arc<str>>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    /// Returns the qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the qualified name as a shared string.
    #[must_use]
    pub fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Returns the name without its package.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Returns the package part of the qualified name (empty if none).
    #[must_use]
    pub fn package(&self) -> &str {
        self.name
            .rfind('.')
            .map_or("", |idx| &self.name[..idx])
    }

    /// Returns the declared supertype, if any.
    #[must_use]
    pub fn supertype(&self) -> Option<&str> {
        self.supertype.as_deref()
    }

    /// Returns the fields declared directly on this type.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Returns true if the type is one of the built-in scalar types.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        BUILTIN_TYPES.contains(&self.name())
    }
}

/// Registry of fact types.
///
/// Built-in types are always present. User types are registered by qualified
/// name, either programmatically or from `declare` blocks in rule source.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: BTreeMap<Arc<str>, Arc<FactType>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry containing only the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let mut types = BTreeMap::new();
        for name in BUILTIN_TYPES {
            let ty = match *name {
                "Object" => FactType::new(*name),
                "Integer" | "Long" | "Short" | "Double" | "Float" => {
                    FactType::new(*name).with_supertype("Number")
                }
                _ => FactType::new(*name).with_supertype("Object"),
            };
            types.insert(Arc::from(*name), Arc::new(ty));
        }
        Self { types }
    }

    /// Registers a user type.
    ///
    /// # Errors
    /// Returns an error if a type with the same qualified name exists.
    pub fn register(&mut self, ty: FactType) -> Result<()> {
        if self.types.contains_key(ty.name()) {
            return Err(Error::new(ErrorKind::DuplicateType(ty.name().to_string())));
        }
        self.types.insert(ty.name_arc(), Arc::new(ty));
        Ok(())
    }

    /// Looks up a type by qualified name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<FactType>> {
        self.types.get(name)
    }

    /// Iterates over all registered types, built-ins included.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FactType>> {
        self.types.values()
    }

    /// Resolves a type name as written in rule source.
    ///
    /// Resolution order: qualified name, built-in, a type in `package`,
    /// an explicit import (`a.b.Person`), then a wildcard import (`a.b.*`).
    #[must_use]
    pub fn resolve(&self, name: &str, package: &str, imports: &[String]) -> Option<Arc<FactType>> {
        if let Some(ty) = self.types.get(name) {
            return Some(ty.clone());
        }
        if name.contains('.') {
            return None;
        }
        if !package.is_empty() {
            if let Some(ty) = self.types.get(format!("{package}.{name}").as_str()) {
                return Some(ty.clone());
            }
        }
        for import in imports {
            if import.ends_with(".*") {
                continue;
            }
            let simple = import.rsplit('.').next().unwrap_or(import);
            if simple == name {
                if let Some(ty) = self.types.get(import.as_str()) {
                    return Some(ty.clone());
                }
            }
        }
        for import in imports {
            if let Some(prefix) = import.strip_suffix(".*") {
                if let Some(ty) = self.types.get(format!("{prefix}.{name}").as_str()) {
                    return Some(ty.clone());
                }
            }
        }
        None
    }

    /// Returns true if values of type `sub` are instances of `sup`.
    ///
    /// `Long`/`Short` alias `Integer` and `Float` aliases `Double`.
    #[must_use]
    pub fn is_assignable(&self, sub: &str, sup: &str) -> bool {
        let sup = canonical_builtin(sup);
        if sup == "Object" {
            return true;
        }
        let mut current = Some(canonical_builtin(sub));
        let mut depth = 0;
        while let Some(name) = current {
            if name == sup {
                return true;
            }
            depth += 1;
            if depth > 64 {
                return false;
            }
            current = self
                .types
                .get(name)
                .and_then(|ty| ty.supertype())
                .map(canonical_builtin);
        }
        false
    }

    /// Returns a field definition, searching supertypes.
    #[must_use]
    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldDef> {
        let mut current = self.types.get(type_name);
        while let Some(ty) = current {
            if let Some(def) = ty.fields.iter().find(|f| &*f.name == field) {
                return Some(def);
            }
            current = ty.supertype().and_then(|s| self.types.get(s));
        }
        None
    }

    /// Returns all fields of a type in constructor order (supertype fields first).
    #[must_use]
    pub fn all_fields(&self, type_name: &str) -> Vec<FieldDef> {
        let mut chain = Vec::new();
        let mut current = self.types.get(type_name);
        while let Some(ty) = current {
            chain.push(ty.clone());
            if chain.len() > 64 {
                break;
            }
            current = ty.supertype().and_then(|s| self.types.get(s));
        }
        chain
            .iter()
            .rev()
            .flat_map(|ty| ty.fields.iter().cloned())
            .collect()
    }

    /// Constructs an object from positional arguments.
    ///
    /// Arguments fill fields in constructor order; remaining fields take
    /// their type's default.
    ///
    /// # Errors
    /// Returns an error if the type is unknown, built-in, given too many
    /// arguments, or an argument does not fit its field.
    pub fn instantiate(&self, type_name: &str, args: Vec<Value>) -> Result<Value> {
        let ty = self
            .types
            .get(type_name)
            .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_name.to_string())))?;
        if ty.is_builtin() {
            return Err(Error::evaluation(format!(
                "cannot construct built-in type {type_name}"
            )));
        }
        construct(ty.name_arc(), &self.all_fields(type_name), args)
    }

    /// Finds a type by qualified name, or by simple name when unambiguous.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Arc<FactType>> {
        if let Some(ty) = self.types.get(name) {
            return Some(ty);
        }
        let mut matches = self.types.values().filter(|ty| ty.simple_name() == name);
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }
}

/// Builds an object of `type_name` from positional arguments.
///
/// # Errors
/// Returns an arity mismatch for surplus arguments, or a type mismatch when
/// an argument does not fit its field.
pub fn construct(type_name: Arc<str>, fields: &[FieldDef], args: Vec<Value>) -> Result<Value> {
    if args.len() > fields.len() {
        return Err(Error::arity_mismatch(
            format!("at most {} for {type_name}", fields.len()),
            args.len(),
        ));
    }
    let mut obj = Object::new(type_name);
    let mut args = args.into_iter();
    for def in fields {
        let value = match args.next() {
            Some(arg) => def.ty.coerce(arg)?,
            None => def.ty.default_value(),
        };
        obj = obj.with(def.name.clone(), value);
    }
    Ok(Value::Object(obj))
}

fn canonical_builtin(name: &str) -> &str {
    match name {
        "Long" | "Short" | "int" | "long" => "Integer",
        "Float" | "double" | "float" => "Double",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        reg.register(
            FactType::new("org.example.Person")
                .with_field("name", FieldType::String)
                .with_field("age", FieldType::Int),
        )
        .unwrap();
        reg.register(
            FactType::new("org.example.Student")
                .with_supertype("org.example.Person")
                .with_field("school", FieldType::String),
        )
        .unwrap();
        reg
    }

    #[test]
    fn builtins_resolve_without_imports() {
        let reg = registry();
        assert!(reg.resolve("Integer", "", &[]).is_some());
        assert!(reg.resolve("String", "any.pkg", &[]).is_some());
    }

    #[test]
    fn user_types_need_import_or_package() {
        let reg = registry();
        assert!(reg.resolve("Person", "", &[]).is_none());
        assert!(reg.resolve("Person", "org.example", &[]).is_some());
        assert!(
            reg.resolve("Person", "", &["org.example.Person".to_string()])
                .is_some()
        );
        assert!(reg.resolve("Person", "", &["org.example.*".to_string()]).is_some());
        assert!(reg.resolve("org.example.Person", "", &[]).is_some());
    }

    #[test]
    fn assignability() {
        let reg = registry();
        assert!(reg.is_assignable("Integer", "Number"));
        assert!(reg.is_assignable("Integer", "Long"));
        assert!(reg.is_assignable("Double", "Number"));
        assert!(reg.is_assignable("String", "Object"));
        assert!(!reg.is_assignable("String", "Number"));
        assert!(reg.is_assignable("org.example.Student", "org.example.Person"));
        assert!(!reg.is_assignable("org.example.Person", "org.example.Student"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut reg = registry();
        let err = reg.register(FactType::new("org.example.Person")).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateType(_)));
    }

    #[test]
    fn instantiate_positional() {
        let reg = registry();
        let p = reg
            .instantiate("org.example.Person", vec!["Matteo".into(), Value::Int(47)])
            .unwrap();
        assert_eq!(p.field("name"), Some(&Value::from("Matteo")));
        assert_eq!(p.field("age"), Some(&Value::Int(47)));

        let partial = reg
            .instantiate("org.example.Person", vec!["Mario".into()])
            .unwrap();
        assert_eq!(partial.field("age"), Some(&Value::Int(0)));
    }

    #[test]
    fn instantiate_subtype_includes_inherited_fields() {
        let reg = registry();
        let s = reg
            .instantiate(
                "org.example.Student",
                vec!["Ann".into(), Value::Int(20), "MIT".into()],
            )
            .unwrap();
        assert_eq!(s.field("school"), Some(&Value::from("MIT")));
        assert_eq!(s.field("age"), Some(&Value::Int(20)));
    }

    #[test]
    fn instantiate_rejects_bad_arguments() {
        let reg = registry();
        assert!(
            reg.instantiate("org.example.Person", vec![Value::Int(1)])
                .is_err()
        );
        assert!(
            reg.instantiate(
                "org.example.Person",
                vec!["a".into(), Value::Int(1), Value::Int(2)]
            )
            .is_err()
        );
        assert!(reg.instantiate("Integer", vec![]).is_err());
    }

    #[test]
    fn find_by_simple_name() {
        let reg = registry();
        assert_eq!(reg.find("Person").map(|t| t.name()), Some("org.example.Person"));
        assert!(reg.find("Nope").is_none());
        assert!(reg.find("Integer").is_some());
    }

    #[test]
    fn field_lookup_walks_supertypes() {
        let reg = registry();
        assert!(reg.field("org.example.Student", "age").is_some());
        assert!(reg.field("org.example.Person", "school").is_none());
    }

    #[test]
    fn coerce_widens_ints() {
        assert_eq!(
            FieldType::Float.coerce(Value::Int(2)).unwrap(),
            Value::Float(2.0)
        );
        assert!(FieldType::Int.coerce(Value::Float(2.5)).is_err());
        assert_eq!(FieldType::String.coerce(Value::Nil).unwrap(), Value::Nil);
    }
}

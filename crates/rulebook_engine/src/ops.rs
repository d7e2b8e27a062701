//! Primitive operations shared by the interpreter and the closure compiler.
//!
//! Every operator and built-in method is implemented once here so both build
//! modes produce identical values and identical errors.

use std::cmp::Ordering;
use std::sync::Arc;

use rulebook_foundation::{Error, FieldDef, PropertyMask, Result, Value, construct};
use rulebook_language::{BinaryOp, UnaryOp};

use crate::ir::{FieldAssign, Method};

/// Applies a unary operator.
///
/// # Errors
/// Returns a type mismatch for non-numeric negation or non-boolean `!`.
pub fn unary(op: UnaryOp, value: &Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, v) => Err(Error::type_mismatch("Number", v.type_name())),
        (UnaryOp::Not, v) => Err(Error::type_mismatch("Boolean", v.type_name())),
    }
}

/// Applies a strict binary operator (everything except `&&` and `||`).
///
/// # Errors
/// Returns a type mismatch for unsupported operand types and an evaluation
/// error for integer division by zero.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equals(lhs, rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(lhs, rhs))),
        BinaryOp::Lt => Ok(Value::Bool(compare(lhs, rhs) == Some(Ordering::Less))),
        BinaryOp::Le => Ok(Value::Bool(matches!(
            compare(lhs, rhs),
            Some(Ordering::Less | Ordering::Equal)
        ))),
        BinaryOp::Gt => Ok(Value::Bool(compare(lhs, rhs) == Some(Ordering::Greater))),
        BinaryOp::Ge => Ok(Value::Bool(matches!(
            compare(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ))),
        BinaryOp::Add if lhs.as_str().is_some() || rhs.as_str().is_some() => {
            Ok(Value::String(format!("{lhs}{rhs}").into()))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::And | BinaryOp::Or => {
            let a = condition(lhs)?;
            let b = condition(rhs)?;
            Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b }))
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let (a, b) = (*a, *b);
        return match op {
            BinaryOp::Add => Ok(Value::Int(a.wrapping_add(b))),
            BinaryOp::Sub => Ok(Value::Int(a.wrapping_sub(b))),
            BinaryOp::Mul => Ok(Value::Int(a.wrapping_mul(b))),
            BinaryOp::Div if b == 0 => Err(Error::evaluation("division by zero")),
            BinaryOp::Rem if b == 0 => Err(Error::evaluation("division by zero")),
            BinaryOp::Div => Ok(Value::Int(a.wrapping_div(b))),
            _ => Ok(Value::Int(a.wrapping_rem(b))),
        };
    }
    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        let culprit = if lhs.as_number().is_none() { lhs } else { rhs };
        return Err(Error::type_mismatch("Number", culprit.type_name()));
    };
    Ok(Value::Float(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    }))
}

/// Java-style equality: numbers compare by value across integer and float.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
pub fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Float(a), Value::Float(b)) => a == b,
        _ => lhs == rhs,
    }
}

/// Orders comparable values; `None` for mixed or unordered types.
#[must_use]
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(_), Value::Bool(_)) => None,
        _ => lhs.partial_cmp(rhs),
    }
}

/// Interprets a value as a condition.
///
/// # Errors
/// Returns a type mismatch if the value is not a boolean.
pub fn condition(value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::type_mismatch("Boolean", value.type_name()))
}

/// Reads a field. Fields missing from an object read as null.
///
/// # Errors
/// Returns an evaluation error when dereferencing null and a type mismatch
/// for non-object values.
pub fn field(target: &Value, name: &str) -> Result<Value> {
    match target {
        Value::Object(obj) => Ok(obj.get(name).cloned().unwrap_or(Value::Nil)),
        Value::Nil => Err(Error::evaluation(format!(
            "null dereference reading field '{name}'"
        ))),
        other => Err(Error::unknown_field(other.type_name(), name)),
    }
}

/// Returns a copy of `target` with one field assigned.
///
/// # Errors
/// Returns an error if the target is not an object or the value does not fit.
pub fn assign(target: &Value, assign: &FieldAssign, value: Value) -> Result<Value> {
    let value = assign.ty.coerce(value)?;
    match target {
        Value::Object(obj) => Ok(Value::Object(obj.set(assign.field.clone(), value))),
        Value::Nil => Err(Error::evaluation(format!(
            "null dereference assigning field '{}'",
            assign.field
        ))),
        other => Err(Error::unknown_field(other.type_name(), &*assign.field)),
    }
}

/// Returns the property mask of a sequence of assignments.
#[must_use]
pub fn assigned_mask(assigns: &[FieldAssign]) -> PropertyMask {
    PropertyMask::of(assigns.iter().map(|a| a.field.clone()))
}

/// Calls a built-in method.
///
/// # Errors
/// Returns an error when the receiver or arguments have the wrong type.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn method(target: &Value, method: Method, args: &[Value]) -> Result<Value> {
    if target.is_nil() && method != Method::ToString {
        return Err(Error::evaluation(format!(
            "null dereference calling {method:?}"
        )));
    }
    let arg = |i: usize| args.get(i).unwrap_or(&Value::Nil);
    let text = || {
        target
            .as_str()
            .ok_or_else(|| Error::type_mismatch("String", target.type_name()))
    };
    let text_arg = |i: usize| {
        arg(i)
            .as_str()
            .ok_or_else(|| Error::type_mismatch("String", arg(i).type_name()))
    };
    Ok(match method {
        Method::Length => Value::Int(text()?.chars().count() as i64),
        Method::IsEmpty => Value::Bool(text()?.is_empty()),
        Method::StartsWith => Value::Bool(text()?.starts_with(text_arg(0)?)),
        Method::EndsWith => Value::Bool(text()?.ends_with(text_arg(0)?)),
        Method::Contains => Value::Bool(text()?.contains(text_arg(0)?)),
        Method::ToUpperCase => Value::String(text()?.to_uppercase().into()),
        Method::ToLowerCase => Value::String(text()?.to_lowercase().into()),
        Method::Trim => Value::String(Arc::from(text()?.trim())),
        Method::Equals => Value::Bool(equals(target, arg(0))),
        Method::ToString => Value::String(target.to_string().into()),
        Method::IntValue => match target {
            Value::Int(n) => Value::Int(*n),
            Value::Float(n) => Value::Int(*n as i64),
            other => return Err(Error::type_mismatch("Number", other.type_name())),
        },
        Method::DoubleValue => Value::Float(
            target
                .as_number()
                .ok_or_else(|| Error::type_mismatch("Number", target.type_name()))?,
        ),
    })
}

/// Constructs an object.
///
/// # Errors
/// Returns an error if an argument does not fit its field.
pub fn new_object(type_name: &Arc<str>, fields: &[FieldDef], args: Vec<Value>) -> Result<Value> {
    construct(type_name.clone(), fields, args)
}

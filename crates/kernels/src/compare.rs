//! Comparison and logic kernels
//!
//! All of these produce `Bool` singles, typically consumed as branch
//! conditions.

use std::sync::Arc;

use cascade_engine::{Kernel, Value};

use crate::closure;

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(v) => *v as f64,
        Value::Float(v) => *v,
        other => panic!("expected a number, got {:?}", other.kind()),
    }
}

fn as_bool(value: &Value) -> bool {
    value
        .as_bool()
        .unwrap_or_else(|| panic!("expected a boolean, got {:?}", value.kind()))
}

/// `a < b` over numbers.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::compare::less_than_values;
///
/// assert_eq!(less_than_values(&Value::Int(1), &Value::Float(1.5)), Value::Bool(true));
/// ```
pub fn less_than_values(a: &Value, b: &Value) -> Value {
    Value::Bool(as_f64(a) < as_f64(b))
}

/// Structural equality.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::compare::equals_values;
///
/// assert_eq!(equals_values(&Value::Int(2), &Value::Int(2)), Value::Bool(true));
/// assert_eq!(equals_values(&Value::Int(2), &Value::Float(2.0)), Value::Bool(false));
/// ```
pub fn equals_values(a: &Value, b: &Value) -> Value {
    Value::Bool(a == b)
}

/// Whether an `Int` is even.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::compare::is_even_value;
///
/// assert_eq!(is_even_value(&Value::Int(4)), Value::Bool(true));
/// assert_eq!(is_even_value(&Value::Int(3)), Value::Bool(false));
/// ```
pub fn is_even_value(value: &Value) -> Value {
    let v = value
        .as_int()
        .unwrap_or_else(|| panic!("expected an int, got {:?}", value.kind()));
    Value::Bool(v % 2 == 0)
}

/// Kernel `(a, b) -> (out)`: numeric less-than
pub fn less_than() -> Arc<dyn Kernel> {
    closure::binary("less_than", less_than_values)
}

/// Kernel `(a, b) -> (out)`: structural equality
pub fn equals() -> Arc<dyn Kernel> {
    closure::binary("equals", equals_values)
}

/// Kernel `(in) -> (out)`: whether each int is even
pub fn is_even() -> Arc<dyn Kernel> {
    closure::unary("is_even", is_even_value)
}

/// Kernel `(a, b) -> (out)`: boolean and
pub fn and() -> Arc<dyn Kernel> {
    closure::binary("and", |a, b| Value::Bool(as_bool(a) && as_bool(b)))
}

/// Kernel `(a, b) -> (out)`: boolean or
pub fn or() -> Arc<dyn Kernel> {
    closure::binary("or", |a, b| Value::Bool(as_bool(a) || as_bool(b)))
}

/// Kernel `(in) -> (out)`: boolean not
pub fn not() -> Arc<dyn Kernel> {
    closure::unary("not", |v| Value::Bool(!as_bool(v)))
}

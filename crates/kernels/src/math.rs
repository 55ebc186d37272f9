//! Arithmetic kernels
//!
//! Numeric rules: `Int` op `Int` stays `Int`, anything involving a `Float`
//! widens to `Float`, `Vec3` combines componentwise with `Vec3` and scales
//! by scalars. Non-numeric operands are a contract violation and panic.

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

/// Adds two values.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::math::add_values;
///
/// assert_eq!(add_values(&Value::Int(2), &Value::Int(3)), Value::Int(5));
/// assert_eq!(add_values(&Value::Int(2), &Value::Float(0.5)), Value::Float(2.5));
/// ```
pub fn add_values(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
        (Value::Vec3(a), Value::Vec3(b)) => {
            Value::Vec3([a[0] + b[0], a[1] + b[1], a[2] + b[2]])
        }
        (a, b) => Value::Float(as_f64(a) + as_f64(b)),
    }
}

/// Subtracts `b` from `a`.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::math::sub_values;
///
/// assert_eq!(sub_values(&Value::Int(5), &Value::Int(3)), Value::Int(2));
/// ```
pub fn sub_values(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a - b),
        (Value::Vec3(a), Value::Vec3(b)) => {
            Value::Vec3([a[0] - b[0], a[1] - b[1], a[2] - b[2]])
        }
        (a, b) => Value::Float(as_f64(a) - as_f64(b)),
    }
}

/// Multiplies two values. A `Vec3` may be scaled by a scalar on either side.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::math::mul_values;
///
/// assert_eq!(mul_values(&Value::Int(4), &Value::Int(3)), Value::Int(12));
/// assert_eq!(
///     mul_values(&Value::Vec3([1.0, 2.0, 3.0]), &Value::Float(2.0)),
///     Value::Vec3([2.0, 4.0, 6.0]),
/// );
/// ```
pub fn mul_values(a: &Value, b: &Value) -> Value {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a * b),
        (Value::Vec3(v), scalar) => {
            let s = as_f64(scalar);
            Value::Vec3([v[0] * s, v[1] * s, v[2] * s])
        }
        (scalar, Value::Vec3(v)) => {
            let s = as_f64(scalar);
            Value::Vec3([v[0] * s, v[1] * s, v[2] * s])
        }
        (a, b) => Value::Float(as_f64(a) * as_f64(b)),
    }
}

/// Divides `a` by `b` as floats.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::math::div_values;
///
/// assert_eq!(div_values(&Value::Int(7), &Value::Int(2)), Value::Float(3.5));
/// ```
pub fn div_values(a: &Value, b: &Value) -> Value {
    Value::Float(as_f64(a) / as_f64(b))
}

/// Negates a value.
///
/// ```
/// use cascade_engine::Value;
/// use cascade_kernels::math::negate_value;
///
/// assert_eq!(negate_value(&Value::Int(3)), Value::Int(-3));
/// assert_eq!(negate_value(&Value::Float(1.5)), Value::Float(-1.5));
/// ```
pub fn negate_value(value: &Value) -> Value {
    match value {
        Value::Int(v) => Value::Int(-v),
        Value::Float(v) => Value::Float(-v),
        Value::Vec3(v) => Value::Vec3([-v[0], -v[1], -v[2]]),
        other => panic!("expected a number, got {:?}", other.kind()),
    }
}

/// Kernel `(a, b) -> (out)`: elementwise addition
pub fn add() -> Arc<dyn Kernel> {
    closure::binary("add", add_values)
}

/// Kernel `(a, b) -> (out)`: elementwise subtraction
pub fn sub() -> Arc<dyn Kernel> {
    closure::binary("sub", sub_values)
}

/// Kernel `(a, b) -> (out)`: elementwise multiplication
pub fn mul() -> Arc<dyn Kernel> {
    closure::binary("mul", mul_values)
}

/// Kernel `(a, b) -> (out)`: elementwise float division
pub fn div() -> Arc<dyn Kernel> {
    closure::binary("div", div_values)
}

/// Kernel `(inout)`: negates every masked element in place
pub fn negate() -> Arc<dyn Kernel> {
    closure::in_place("negate", negate_value)
}

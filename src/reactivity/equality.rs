// ============================================================================
// spark-view - Equality
// The change test applied by reactive writes and watchers
// ============================================================================

use crate::store::value::Value;

// =============================================================================
// SAFE EQUALITY
// =============================================================================

/// Safe equality for f64 values.
/// Handles NaN correctly: NaN == NaN returns true.
///
/// # Example
/// ```
/// use spark_view::reactivity::equality::safe_equals_f64;
///
/// assert!(safe_equals_f64(1.0, 1.0));
/// assert!(!safe_equals_f64(1.0, 2.0));
/// assert!(safe_equals_f64(f64::NAN, f64::NAN));
/// ```
pub fn safe_equals_f64(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Whether a write of `b` over `a` counts as "no change".
///
/// Scalars compare structurally (NaN equals NaN, `0.0` equals `-0.0`),
/// containers compare by identity.
///
/// # Example
/// ```
/// use spark_view::{same_value, Object, Value};
///
/// assert!(same_value(&Value::from(1), &Value::from(1.0)));
/// assert!(same_value(&Value::from(f64::NAN), &Value::from(f64::NAN)));
///
/// let a = Object::new();
/// let b = Object::new();
/// assert!(same_value(&Value::from(a.clone()), &Value::from(a)));
/// assert!(!same_value(&Value::from(b), &Value::from(Object::new())));
/// ```
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => safe_equals_f64(*x, *y),
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        (Value::Array(x), Value::Array(y)) => x.ptr_eq(y),
        _ => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================

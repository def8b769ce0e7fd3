// ============================================================================
// spark-view - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of manually cloning `Rc` or `Object`
/// handles before moving them into a closure.
///
/// # Usage
///
/// ```rust
/// use spark_view::{cloned, computed, object, observe, Value};
///
/// let state = object! { "a" => 1, "b" => 2 };
/// observe(&Value::from(state.clone()));
///
/// let sum = computed(cloned!(state => move || {
///     state.get("a").as_f64().unwrap_or(0.0) + state.get("b").as_f64().unwrap_or(0.0)
/// }));
/// assert_eq!(sum.get(), Value::from(3));
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build an [`Object`](crate::Object) from `key => value` pairs.
///
/// ```rust
/// use spark_view::{object, Value};
///
/// let user = object! { "name" => "ada", "age" => 36 };
/// assert_eq!(user.get("name"), Value::from("ada"));
/// ```
#[macro_export]
macro_rules! object {
    () => {
        $crate::Object::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Object::from_pairs([$(($key, $crate::Value::from($value))),+])
    };
}

/// Build an [`Array`](crate::Array) from values.
///
/// ```rust
/// use spark_view::{array, Value};
///
/// let list = array![1, "two", true];
/// assert_eq!(list.len(), 3);
/// assert_eq!(list.get(1), Value::from("two"));
/// ```
#[macro_export]
macro_rules! array {
    () => {
        $crate::Array::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Array::from_values(vec![$($crate::Value::from($value)),+])
    };
}

//! Equality and relational comparison (ES3 Sections 11.8.5 and 11.9.3).

use std::cmp::Ordering;

use crate::runtime::value::Value;

/// Abstract equality comparison (ES3 Section 11.9.3)
///
/// The Abstract Equality Comparison Algorithm with type coercion.
pub fn abstract_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        // 1. Same type: strict equality
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(_), Value::Boolean(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Function(_), Value::Function(_)) => a == b,

        // 2. null == undefined is true
        (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => true,

        // 3. Number and string compare numerically
        (Value::Number(n), Value::String(_)) => *n == b.to_number(),
        (Value::String(_), Value::Number(n)) => a.to_number() == *n,

        // 4. Booleans compare as numbers
        (Value::Boolean(_), other) => abstract_equals(&Value::Number(a.to_number()), other),
        (other, Value::Boolean(_)) => abstract_equals(other, &Value::Number(b.to_number())),

        // 5. Objects against primitives compare through their string form
        (Value::Number(_) | Value::String(_), Value::Object(_) | Value::Function(_)) => {
            abstract_equals(a, &Value::String(b.to_string()))
        }
        (Value::Object(_) | Value::Function(_), Value::Number(_) | Value::String(_)) => {
            abstract_equals(&Value::String(a.to_string()), b)
        }

        _ => false,
    }
}

/// Abstract relational comparison (ES3 Section 11.8.5).
///
/// `None` when either side converts to NaN, which makes every relational
/// operator false.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let a = to_primitive(a);
    let b = to_primitive(b);
    match (&a, &b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => a.to_number().partial_cmp(&b.to_number()),
    }
}

/// Objects take part in comparison through their string form.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Function(_) => Value::String(value.to_string()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abstract_equals_same_type() {
        assert!(abstract_equals(&Value::Undefined, &Value::Undefined));
        assert!(abstract_equals(&Value::Null, &Value::Null));
        assert!(abstract_equals(&Value::Boolean(true), &Value::Boolean(true)));
        assert!(!abstract_equals(&Value::Boolean(true), &Value::Boolean(false)));
        assert!(abstract_equals(&Value::Number(42.0), &Value::Number(42.0)));
        assert!(abstract_equals(&Value::from("foo"), &Value::from("foo")));
    }

    #[test]
    fn test_abstract_equals_null_undefined() {
        assert!(abstract_equals(&Value::Null, &Value::Undefined));
        assert!(abstract_equals(&Value::Undefined, &Value::Null));
        assert!(!abstract_equals(&Value::Null, &Value::Number(0.0)));
    }

    #[test]
    fn test_abstract_equals_number_string() {
        assert!(abstract_equals(&Value::Number(42.0), &Value::from("42")));
        assert!(abstract_equals(&Value::from("42"), &Value::Number(42.0)));
        assert!(!abstract_equals(&Value::Number(42.0), &Value::from("43")));
        assert!(abstract_equals(&Value::Number(0.0), &Value::from("")));
    }

    #[test]
    fn test_abstract_equals_boolean_coercion() {
        assert!(abstract_equals(&Value::Boolean(true), &Value::Number(1.0)));
        assert!(abstract_equals(&Value::Boolean(false), &Value::Number(0.0)));
        assert!(abstract_equals(&Value::Number(1.0), &Value::Boolean(true)));
        assert!(abstract_equals(&Value::from("1"), &Value::Boolean(true)));
    }

    #[test]
    fn test_abstract_equals_nan() {
        assert!(!abstract_equals(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&Value::Number(1.0), &Value::Number(2.0)), Some(Ordering::Less));
        assert_eq!(compare(&Value::from("b"), &Value::from("a")), Some(Ordering::Greater));
        assert_eq!(compare(&Value::from("10"), &Value::Number(9.0)), Some(Ordering::Greater));
        assert_eq!(compare(&Value::Undefined, &Value::Number(0.0)), None);
    }
}

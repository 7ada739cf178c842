//! JavaScript value representation.

use super::function::Callable;
use super::object::{ObjectClass, ObjectRef};
use std::fmt;
use std::sync::Arc;

/// A JavaScript value.
///
/// Values are designed to be thread-safe and can be safely shared
/// between async tasks.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Object reference
    Object(ObjectRef),
    /// Function reference (Arc for thread safety)
    Function(Arc<Callable>),
}

impl PartialEq for Value {
    /// Strict equality (`===`).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN is unequal to itself, IEEE comparison already does that
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl Value {
    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is nullish (null or undefined).
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns true for objects and functions.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Function(_))
    }

    /// Converts the value to a boolean (ToBoolean).
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Converts the value to a number (ToNumber).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) | Value::Function(_) => string_to_number(&self.to_string()),
        }
    }

    /// ToInt32: wraps the number modulo 2^32 into the signed range.
    pub fn to_int32(&self) -> i32 {
        self.to_uint32() as i32
    }

    /// ToUint32: wraps the number modulo 2^32.
    pub fn to_uint32(&self) -> u32 {
        let n = self.to_number();
        if !n.is_finite() || n == 0.0 {
            return 0;
        }
        let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
        wrapped as u32
    }

    /// Converts the value to a property key.
    pub fn to_property_key(&self) -> String {
        self.to_string()
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object", // Historical quirk
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Reads a property, yielding undefined for anything missing.
    pub fn get_property(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::String(s) => match key {
                "length" => Value::Number(s.chars().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined),
            },
            Value::Function(callable) => match key {
                "name" => Value::String(callable.name().to_string()),
                "length" => Value::Number(callable.arity() as f64),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        }
    }
}

/// Formats a number the way the engine prints it: integral values without a
/// fractional part, everything else with Rust's shortest round-trip form.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// ToNumber applied to a string.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    // Rust accepts "inf" and "nan"; JavaScript does not.
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(obj) => match obj.class() {
                ObjectClass::Array => {
                    let length = obj.get("length").to_number() as usize;
                    let parts: Vec<String> = (0..length)
                        .map(|i| match obj.get(&i.to_string()) {
                            v if v.is_nullish() => String::new(),
                            v => v.to_string(),
                        })
                        .collect();
                    write!(f, "{}", parts.join(","))
                }
                ObjectClass::Error => {
                    let name = obj.get("name");
                    let message = obj.get("message");
                    if message.is_undefined() || message.to_string().is_empty() {
                        write!(f, "{}", name)
                    } else {
                        write!(f, "{}: {}", name, message)
                    }
                }
                ObjectClass::Object => write!(f, "[object Object]"),
            },
            Value::Function(callable) => match callable.as_ref() {
                Callable::Function(closure) => match &closure.code.name {
                    Some(name) => write!(f, "[Function: {}]", name),
                    None => write!(f, "[Function (anonymous)]"),
                },
                Callable::Native { name, .. } => {
                    write!(f, "[Function: {} (native)]", name)
                }
            },
        }
    }
}

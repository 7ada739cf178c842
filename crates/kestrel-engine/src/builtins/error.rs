//! Error built-in objects (ES3 Section 15.11).
//!
//! The constructors build plain error objects carrying `name` and
//! `message`. Called with or without `new`, they always return a fresh
//! object that `instanceof` links back to the constructor.

use crate::Error;
use crate::runtime::value::Value;
use crate::vm::Interpreter;

/// Error type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error
    Error,
    /// RangeError
    RangeError,
    /// ReferenceError
    ReferenceError,
    /// SyntaxError
    SyntaxError,
    /// TypeError
    TypeError,
}

impl ErrorKind {
    /// Every kind, in registration order.
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Error,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::TypeError,
    ];

    /// The constructor's global name.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
        }
    }

    /// The native constructor for this kind.
    pub fn constructor(&self) -> crate::runtime::function::NativeFunction {
        match self {
            ErrorKind::Error => error_constructor,
            ErrorKind::RangeError => range_error_constructor,
            ErrorKind::ReferenceError => reference_error_constructor,
            ErrorKind::SyntaxError => syntax_error_constructor,
            ErrorKind::TypeError => type_error_constructor,
        }
    }
}

// ============================================================================
// Error Constructors (ES3 Section 15.11.1-2)
// ============================================================================

/// Error(message) constructor - creates a generic Error.
pub fn error_constructor(vm: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, Error> {
    Ok(create_error(vm, ErrorKind::Error, args))
}

/// RangeError(message) constructor.
pub fn range_error_constructor(
    vm: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> Result<Value, Error> {
    Ok(create_error(vm, ErrorKind::RangeError, args))
}

/// ReferenceError(message) constructor.
pub fn reference_error_constructor(
    vm: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> Result<Value, Error> {
    Ok(create_error(vm, ErrorKind::ReferenceError, args))
}

/// SyntaxError(message) constructor.
pub fn syntax_error_constructor(
    vm: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> Result<Value, Error> {
    Ok(create_error(vm, ErrorKind::SyntaxError, args))
}

/// TypeError(message) constructor.
pub fn type_error_constructor(
    vm: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> Result<Value, Error> {
    Ok(create_error(vm, ErrorKind::TypeError, args))
}

/// Helper to create error objects.
fn create_error(vm: &Interpreter, kind: ErrorKind, args: &[Value]) -> Value {
    let message = args
        .first()
        .filter(|v| !v.is_undefined())
        .map(|v| v.to_string())
        .unwrap_or_default();
    vm.error_object(kind, &message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;

    #[test]
    fn test_error_kind_names() {
        let names: Vec<&str> = ErrorKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            vec!["Error", "RangeError", "ReferenceError", "SyntaxError", "TypeError"]
        );
    }

    #[test]
    fn test_constructor_builds_error_object() {
        let mut vm = Interpreter::new(EngineOptions::default());
        let value = type_error_constructor(&mut vm, &Value::Undefined, &[Value::from("bad")]).unwrap();
        let Value::Object(obj) = value else {
            panic!("expected an object");
        };
        assert_eq!(obj.get("name"), Value::from("TypeError"));
        assert_eq!(obj.get("message"), Value::from("bad"));
    }

    #[test]
    fn test_missing_message_is_empty() {
        let vm = Interpreter::new(EngineOptions::default());
        let value = create_error(&vm, ErrorKind::Error, &[]);
        assert_eq!(value.to_string(), "Error");
    }

    #[test]
    fn test_called_without_new_still_links_constructor() {
        let mut vm = Interpreter::new(EngineOptions::default());
        let value = range_error_constructor(&mut vm, &Value::Undefined, &[]).unwrap();
        let (Value::Object(obj), Some(Value::Function(ctor))) = (value, vm.global().get_value("RangeError")) else {
            panic!("expected an object and a constructor");
        };
        assert!(obj.constructed_by(&ctor));
    }
}

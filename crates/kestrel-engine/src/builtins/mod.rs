//! Built-in global bindings.
//!
//! The engine ships a deliberately small global environment:
//! - `eval`
//! - `Error`, `RangeError`, `ReferenceError`, `SyntaxError`, `TypeError`
//! - `print`
//! - `NaN`, `Infinity`, `undefined`

pub mod console;
pub mod error;
pub mod global;

use std::sync::Arc;

use crate::runtime::environment::Environment;
use crate::runtime::function::{Callable, NativeFunction};
use crate::runtime::value::Value;

use error::ErrorKind;

/// All built-in globals.
pub fn register_builtins() -> Vec<(&'static str, Value)> {
    let mut globals = vec![
        ("eval", make_native("eval", 1, false, global::eval)),
        ("print", make_native("print", 0, false, console::print)),
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
        ("undefined", Value::Undefined),
    ];
    for kind in ErrorKind::ALL {
        globals.push((kind.name(), make_native(kind.name(), 1, true, kind.constructor())));
    }
    globals
}

/// Declares every built-in as a non-deletable binding of `global`.
pub fn install(global: &Arc<Environment>) {
    for (name, value) in register_builtins() {
        global.declare(name, false);
        global.set_value(name, value);
    }
}

/// Create a native function value.
fn make_native(name: &'static str, arity: usize, constructor: bool, func: NativeFunction) -> Value {
    Value::Function(Arc::new(Callable::Native {
        name,
        arity,
        constructor,
        func,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_declares_globals() {
        let global = Environment::global();
        install(&global);
        assert!(global.get_value("eval").is_some_and(|v| v.is_function()));
        assert!(global.get_value("TypeError").is_some_and(|v| v.is_function()));
        assert!(global.get_value("NaN").is_some_and(|v| v.to_number().is_nan()));
        // Built-ins survive `delete`.
        assert!(!global.delete_binding("print"));
    }
}

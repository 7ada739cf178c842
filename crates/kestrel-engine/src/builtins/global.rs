//! Global built-in functions (ES3 Section 15.1).

use crate::Error;
use crate::runtime::value::Value;
use crate::vm::Interpreter;

/// eval(x) called indirectly (ES3 Section 15.1.2.1).
///
/// Direct calls never reach this function: the interpreter runs them in the
/// caller's scope. Here the code runs in the global environment.
pub fn eval(vm: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, Error> {
    match args.first() {
        Some(Value::String(source)) => vm.eval_global(source),
        Some(other) => Ok(other.clone()),
        None => Ok(Value::Undefined),
    }
}

//! Output built-ins.

use crate::Error;
use crate::runtime::value::Value;
use crate::vm::Interpreter;

/// Joins the arguments the way `print` writes them.
pub fn format_args(args: &[Value]) -> String {
    let output: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    output.join(" ")
}

/// print(...) - prints to stdout
pub fn print(_vm: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, Error> {
    println!("{}", format_args(args));
    Ok(Value::Undefined)
}

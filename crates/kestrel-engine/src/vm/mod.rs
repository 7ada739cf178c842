//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - Executes compiled units: one [`CallFrame`] per call,
//!   with its own operand stack, active scope and exception handlers
//! - `comparison` - Abstract equality and relational comparison
//!
//! [`CallFrame`]: crate::runtime::CallFrame

pub mod comparison;
mod interpreter;

pub use interpreter::Interpreter;

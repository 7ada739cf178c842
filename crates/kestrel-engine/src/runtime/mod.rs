//! JavaScript runtime types: values, objects, functions and environments.

pub mod environment;
pub mod function;
pub mod object;
pub mod value;

pub use environment::Environment;
pub use function::{CallFrame, Callable, Closure, CodeKind, FunctionCode};
pub use object::{Object, ObjectClass, ObjectRef};

//! JavaScript function representation.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::environment::Environment;
use super::value::Value;
use crate::Error;
use crate::compiler::Bytecode;
use crate::compiler::scope::Storage;
use crate::vm::Interpreter;

/// Which kind of compilation unit a [`FunctionCode`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// Script code; declarations go to the global environment
    Global,
    /// eval code; declarations go to the caller's variable environment
    Eval,
    /// A function body
    Function,
}

/// The lowered form of one compilation unit.
///
/// Produced once per function body and shared by every closure created
/// from it.
#[derive(Debug, Clone)]
pub struct FunctionCode {
    /// The function name (if any)
    pub name: Option<String>,
    /// Script, eval or function code
    pub kind: CodeKind,
    /// The parameter names
    pub params: Vec<String>,
    /// How the unit's own variables are stored
    pub storage: Storage,
    /// Declared variables in slot order, parameters first
    pub bindings: Arc<[String]>,
    /// The compiled bytecode
    pub bytecode: Bytecode,
    /// Number of frame-local temporaries
    pub local_count: usize,
    /// Whether the unit runs with strict undeclared-assignment rules
    pub strict: bool,
    /// A named function expression sees its own name in an extra scope
    pub binds_own_name: bool,
}

impl FunctionCode {
    /// Returns the arity (number of parameters).
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A function value: code plus the environment it closed over.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The shared code
    pub code: Arc<FunctionCode>,
    /// The captured scope
    pub scope: Arc<Environment>,
}

/// A native (Rust) function. Receives `this` and the arguments.
pub type NativeFunction = fn(&mut Interpreter, &Value, &[Value]) -> Result<Value, Error>;

/// A callable value - either a JS function or a native function.
#[derive(Clone)]
pub enum Callable {
    /// A JavaScript function
    Function(Closure),
    /// A native Rust function
    Native {
        /// The function name
        name: &'static str,
        /// Declared parameter count
        arity: usize,
        /// Whether `new` may be applied to it
        constructor: bool,
        /// The native function pointer
        func: NativeFunction,
    },
}

impl Callable {
    /// The function's name, empty for anonymous functions.
    pub fn name(&self) -> &str {
        match self {
            Callable::Function(closure) => closure.code.name.as_deref().unwrap_or(""),
            Callable::Native { name, .. } => name,
        }
    }

    /// Declared parameter count.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(closure) => closure.code.arity(),
            Callable::Native { arity, .. } => *arity,
        }
    }

    /// Whether `new` may be applied.
    pub fn is_constructor(&self) -> bool {
        match self {
            Callable::Function(_) => true,
            Callable::Native { constructor, .. } => *constructor,
        }
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callable::Function(closure) => write!(f, "Function({:?})", closure.code.name),
            Callable::Native { name, .. } => write!(f, "NativeFunction({})", name),
        }
    }
}

/// An active exception handler.
#[derive(Debug, Clone)]
pub struct Handler {
    /// Where execution resumes with the exception on the stack
    pub target: usize,
    /// Operand stack height to restore
    pub stack_depth: usize,
    /// The scope that was active when the region was entered
    pub scope: Arc<Environment>,
}

/// A call frame for function execution.
#[derive(Debug)]
pub struct CallFrame {
    /// The code being executed
    pub code: Arc<FunctionCode>,
    /// Instruction pointer within this function
    pub ip: usize,
    /// Operand stack
    pub stack: Vec<Value>,
    /// The active scope
    pub scope: Arc<Environment>,
    /// The `this` value
    pub this: Value,
    /// Frame-local temporaries
    pub locals: Vec<Value>,
    /// Snapshotted for-in keys, keyed by temporary index
    pub key_iterators: FxHashMap<usize, VecDeque<String>>,
    /// Active exception handlers, innermost last
    pub handlers: Vec<Handler>,
}

impl CallFrame {
    /// Creates a new call frame.
    pub fn new(code: Arc<FunctionCode>, scope: Arc<Environment>, this: Value) -> Self {
        let local_count = code.local_count;
        Self {
            code,
            ip: 0,
            stack: Vec::with_capacity(16),
            scope,
            this,
            locals: vec![Value::Undefined; local_count],
            key_iterators: FxHashMap::default(),
            handlers: Vec::new(),
        }
    }

    /// Gets a local variable.
    pub fn get_local(&self, index: usize) -> Value {
        self.locals.get(index).cloned().unwrap_or(Value::Undefined)
    }

    /// Sets a local variable.
    pub fn set_local(&mut self, index: usize, value: Value) {
        if index >= self.locals.len() {
            self.locals.resize(index + 1, Value::Undefined);
        }
        self.locals[index] = value;
    }

    /// Pushes onto the operand stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    /// Pops the operand stack.
    pub fn pop(&mut self) -> Result<Value, Error> {
        self.stack
            .pop()
            .ok_or_else(|| Error::InternalError("Stack underflow".into()))
    }

    /// Pops two operands, returning them in push order.
    pub fn pop2(&mut self) -> Result<(Value, Value), Error> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    /// Pops the top `n` operands, returning them in push order.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Error> {
        let len = self.stack.len();
        if n > len {
            return Err(Error::InternalError("Stack underflow".into()));
        }
        Ok(self.stack.split_off(len - n))
    }

    /// The top operand.
    pub fn peek(&self) -> Result<&Value, Error> {
        self.stack
            .last()
            .ok_or_else(|| Error::InternalError("Stack underflow".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_code(name: Option<&str>, params: Vec<&str>, local_count: usize) -> Arc<FunctionCode> {
        let params: Vec<String> = params.into_iter().map(|s| s.to_string()).collect();
        Arc::new(FunctionCode {
            name: name.map(|s| s.to_string()),
            kind: CodeKind::Function,
            bindings: params.clone().into(),
            params,
            storage: Storage::Static,
            bytecode: Bytecode::new(),
            local_count,
            strict: false,
            binds_own_name: false,
        })
    }

    fn native_identity(_vm: &mut Interpreter, _this: &Value, args: &[Value]) -> Result<Value, Error> {
        Ok(args.first().cloned().unwrap_or_default())
    }

    #[test]
    fn test_callable_function() {
        let callable = Callable::Function(Closure {
            code: make_code(Some("myFunc"), vec!["a", "b"], 0),
            scope: Environment::global(),
        });

        assert_eq!(callable.name(), "myFunc");
        assert_eq!(callable.arity(), 2);
        assert!(callable.is_constructor());
        assert!(format!("{:?}", callable).contains("myFunc"));
    }

    #[test]
    fn test_callable_native() {
        let callable = Callable::Native {
            name: "identity",
            arity: 1,
            constructor: false,
            func: native_identity,
        };

        assert_eq!(callable.name(), "identity");
        assert!(!callable.is_constructor());
        assert!(format!("{:?}", callable).contains("identity"));
    }

    #[test]
    fn test_call_frame_locals() {
        let mut frame = CallFrame::new(make_code(None, vec![], 2), Environment::global(), Value::Undefined);

        assert_eq!(frame.locals.len(), 2);
        assert_eq!(frame.get_local(100), Value::Undefined);

        frame.set_local(5, Value::Boolean(true));
        assert_eq!(frame.get_local(5), Value::Boolean(true));
        assert_eq!(frame.get_local(3), Value::Undefined);
    }

    #[test]
    fn test_call_frame_operand_stack() {
        let mut frame = CallFrame::new(make_code(None, vec![], 0), Environment::global(), Value::Undefined);
        frame.push(Value::Number(1.0));
        frame.push(Value::Number(2.0));
        frame.push(Value::Number(3.0));

        assert_eq!(frame.peek().unwrap(), &Value::Number(3.0));
        assert_eq!(frame.pop_n(2).unwrap(), vec![Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(frame.pop().unwrap(), Value::Number(1.0));
        assert!(matches!(frame.pop(), Err(Error::InternalError(_))));
        assert!(frame.pop_n(1).is_err());
    }
}

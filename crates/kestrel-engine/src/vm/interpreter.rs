//! The bytecode interpreter.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use tracing::trace;

use super::comparison::{abstract_equals, compare};
use crate::Error;
use crate::builtins::{self, error::ErrorKind};
use crate::compiler::{Compiler, Instruction, OpCode, Operand};
use crate::compiler::scope::Storage;
use crate::config::EngineOptions;
use crate::parser::Parser;
use crate::runtime::environment::Environment;
use crate::runtime::function::{CallFrame, Callable, Closure, FunctionCode, Handler};
use crate::runtime::object::{Object, ObjectRef};
use crate::runtime::value::Value;

const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 4 * 1024 * 1024;

/// Executes compiled units against a global environment.
pub struct Interpreter {
    /// The outermost environment, holding built-ins and script globals
    global: Arc<Environment>,
    options: EngineOptions,
    /// Nesting of script function calls
    depth: usize,
}

impl Interpreter {
    /// Creates an interpreter with the built-ins installed.
    pub fn new(options: EngineOptions) -> Self {
        let global = Environment::global();
        builtins::install(&global);
        Self {
            global,
            options,
            depth: 0,
        }
    }

    /// The global environment.
    pub fn global(&self) -> &Arc<Environment> {
        &self.global
    }

    /// The options in effect.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Runs script code in the global environment.
    pub fn run_script(&mut self, code: Arc<FunctionCode>) -> Result<Value, Error> {
        for name in code.bindings.iter() {
            self.global.declare(name, false);
        }
        let scope = self.global.clone();
        self.execute(CallFrame::new(code, scope, Value::Undefined))
    }

    /// Runs eval code in `scope`. Its declarations land in the nearest
    /// dynamic environment and stay deletable.
    pub fn run_eval(
        &mut self,
        code: Arc<FunctionCode>,
        scope: Arc<Environment>,
        this: Value,
    ) -> Result<Value, Error> {
        let variables = scope.variable_environment();
        for name in code.bindings.iter() {
            variables.declare(name, true);
        }
        self.execute(CallFrame::new(code, scope, this))
    }

    /// Compiles and runs `source` as eval code in the global environment.
    pub fn eval_global(&mut self, source: &str) -> Result<Value, Error> {
        let scope = self.global.clone();
        self.eval_in(source, scope, Value::Undefined, false)
    }

    fn eval_in(
        &mut self,
        source: &str,
        scope: Arc<Environment>,
        this: Value,
        strict: bool,
    ) -> Result<Value, Error> {
        let program = Parser::new(source).parse_program()?;
        let code = Compiler::new(self.options.compiler.clone()).compile_eval(&program, strict)?;
        self.run_eval(code, scope, this)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Calls `callee` with the given receiver and arguments.
    pub fn call(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> Result<Value, Error> {
        self.call_described(callee, this, args, &callee.to_string())
    }

    fn call_described(
        &mut self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
        description: &str,
    ) -> Result<Value, Error> {
        let Value::Function(callable) = callee else {
            return Err(Error::TypeError(format!("{} is not a function", description)));
        };
        trace!(callee = callable.name(), args = args.len(), "call");
        match callable.as_ref() {
            Callable::Native { func, .. } => func(self, &this, &args),
            Callable::Function(closure) => self.call_closure(closure, this, args),
        }
    }

    /// Applies `new` to `constructor`.
    pub fn construct(&mut self, constructor: &Value, args: Vec<Value>) -> Result<Value, Error> {
        let callable = match constructor {
            Value::Function(callable) if callable.is_constructor() => callable.clone(),
            other => return Err(Error::TypeError(format!("{} is not a constructor", other))),
        };
        trace!(constructor = callable.name(), args = args.len(), "construct");

        match callable.as_ref() {
            Callable::Native { func, .. } => {
                let result = func(self, &Value::Undefined, &args)?;
                if let Value::Object(obj) = &result {
                    obj.set_constructor(callable.clone());
                }
                Ok(result)
            }
            Callable::Function(closure) => {
                let obj = ObjectRef::new(Object::new());
                obj.set_constructor(callable.clone());
                let result = self.call_closure(closure, Value::Object(obj.clone()), args)?;
                if result.is_object() {
                    Ok(result)
                } else {
                    Ok(Value::Object(obj))
                }
            }
        }
    }

    fn call_closure(&mut self, closure: &Closure, this: Value, args: Vec<Value>) -> Result<Value, Error> {
        if self.depth >= self.options.max_call_depth {
            return Err(Error::RangeError("Maximum call stack size exceeded".into()));
        }

        let code = closure.code.clone();
        let parent = Some(closure.scope.clone());
        let scope = match code.storage {
            Storage::Static => Environment::declarative(code.bindings.clone(), parent),
            Storage::Dynamic => {
                let env = Environment::dynamic(parent);
                for name in code.bindings.iter() {
                    env.declare(name, false);
                }
                env
            }
        };
        // A repeated parameter name binds the last matching argument.
        for (param, arg) in code.params.iter().zip(args) {
            scope.set_value(param, arg);
        }

        self.depth += 1;
        let result = self.execute(CallFrame::new(code, scope, this));
        self.depth -= 1;
        result
    }

    // ========================================================================
    // Execution loop
    // ========================================================================

    /// Runs a frame, growing the native stack when it runs low. Script
    /// calls recurse through here, so `max_call_depth` alone does not
    /// bound native stack use.
    fn execute(&mut self, frame: CallFrame) -> Result<Value, Error> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.run_frame(frame))
    }

    fn run_frame(&mut self, mut frame: CallFrame) -> Result<Value, Error> {
        let code = frame.code.clone();
        loop {
            let error = match self.step(&code, &mut frame) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => continue,
                Err(error) => error,
            };

            let Some(handler) = frame.handlers.pop() else {
                return Err(error);
            };
            let exception = self.exception_value(error)?;
            trace!(exception = %exception, target = handler.target, "caught");
            frame.stack.truncate(handler.stack_depth);
            frame.scope = handler.scope;
            frame.push(exception);
            frame.ip = handler.target;
        }
    }

    /// Executes one instruction. `Some` carries the unit's return value.
    fn step(&mut self, code: &FunctionCode, frame: &mut CallFrame) -> Result<Option<Value>, Error> {
        let Some(&Instruction { opcode, operand }) = code.bytecode.instructions.get(frame.ip) else {
            return Ok(Some(Value::Undefined));
        };
        frame.ip += 1;

        match opcode {
            // Stack operations
            OpCode::LoadConst => {
                let index = constant_index(opcode, operand)?;
                let value = code.bytecode.constants.get(index).cloned().ok_or_else(|| {
                    Error::InternalError(format!("constant {} out of range", index))
                })?;
                frame.push(value);
            }
            OpCode::LoadUndefined => frame.push(Value::Undefined),
            OpCode::LoadNull => frame.push(Value::Null),
            OpCode::LoadTrue => frame.push(Value::Boolean(true)),
            OpCode::LoadFalse => frame.push(Value::Boolean(false)),
            OpCode::Pop => {
                frame.pop()?;
            }
            OpCode::Dup => {
                let top = frame.peek()?.clone();
                frame.push(top);
            }
            OpCode::Dup2 => {
                let (a, b) = frame.pop2()?;
                frame.push(a.clone());
                frame.push(b.clone());
                frame.push(a);
                frame.push(b);
            }
            OpCode::Swap => {
                let (a, b) = frame.pop2()?;
                frame.push(b);
                frame.push(a);
            }

            // Arithmetic
            OpCode::Add => {
                let (a, b) = frame.pop2()?;
                frame.push(add(&a, &b));
            }
            OpCode::Sub => numeric(frame, |a, b| a - b)?,
            OpCode::Mul => numeric(frame, |a, b| a * b)?,
            OpCode::Div => numeric(frame, |a, b| a / b)?,
            OpCode::Mod => numeric(frame, |a, b| a % b)?,
            OpCode::Neg => {
                let value = frame.pop()?;
                frame.push(Value::Number(-value.to_number()));
            }
            OpCode::ToNumber => {
                let value = frame.pop()?;
                frame.push(Value::Number(value.to_number()));
            }

            // Comparison
            OpCode::Eq => {
                let (a, b) = frame.pop2()?;
                frame.push(Value::Boolean(abstract_equals(&a, &b)));
            }
            OpCode::Ne => {
                let (a, b) = frame.pop2()?;
                frame.push(Value::Boolean(!abstract_equals(&a, &b)));
            }
            OpCode::StrictEq => {
                let (a, b) = frame.pop2()?;
                frame.push(Value::Boolean(a == b));
            }
            OpCode::StrictNe => {
                let (a, b) = frame.pop2()?;
                frame.push(Value::Boolean(a != b));
            }
            OpCode::Lt => relational(frame, |o| o == Ordering::Less)?,
            OpCode::Le => relational(frame, |o| o != Ordering::Greater)?,
            OpCode::Gt => relational(frame, |o| o == Ordering::Greater)?,
            OpCode::Ge => relational(frame, |o| o != Ordering::Less)?,

            // Logical and bitwise
            OpCode::Not => {
                let value = frame.pop()?;
                frame.push(Value::Boolean(!value.to_boolean()));
            }
            OpCode::BitAnd => bitwise(frame, |a, b| a & b)?,
            OpCode::BitOr => bitwise(frame, |a, b| a | b)?,
            OpCode::BitXor => bitwise(frame, |a, b| a ^ b)?,
            OpCode::BitNot => {
                let value = frame.pop()?;
                frame.push(Value::Number(f64::from(!value.to_int32())));
            }
            OpCode::Shl => {
                let (a, b) = frame.pop2()?;
                let shifted = a.to_int32().wrapping_shl(b.to_uint32() & 31);
                frame.push(Value::Number(f64::from(shifted)));
            }
            OpCode::Shr => {
                let (a, b) = frame.pop2()?;
                let shifted = a.to_int32() >> (b.to_uint32() & 31);
                frame.push(Value::Number(f64::from(shifted)));
            }
            OpCode::Ushr => {
                let (a, b) = frame.pop2()?;
                let shifted = a.to_uint32() >> (b.to_uint32() & 31);
                frame.push(Value::Number(f64::from(shifted)));
            }

            // Temporaries
            OpCode::LoadLocal => {
                let index = local_index(opcode, operand)?;
                let value = frame.get_local(index);
                frame.push(value);
            }
            OpCode::StoreLocal => {
                let index = local_index(opcode, operand)?;
                let value = frame.pop()?;
                frame.set_local(index, value);
            }

            // Variables
            OpCode::LoadSlot => {
                let (depth, index) = slot(opcode, operand)?;
                let value = frame
                    .scope
                    .ancestor(depth)
                    .and_then(|env| env.get_slot(index))
                    .ok_or_else(|| Error::InternalError(format!("no slot {} at depth {}", index, depth)))?;
                frame.push(value);
            }
            OpCode::StoreSlot => {
                let (depth, index) = slot(opcode, operand)?;
                let value = frame.peek()?.clone();
                let stored = frame
                    .scope
                    .ancestor(depth)
                    .is_some_and(|env| env.set_slot(index, value));
                if !stored {
                    return Err(Error::InternalError(format!(
                        "no slot {} at depth {}",
                        index, depth
                    )));
                }
            }
            OpCode::LoadName => {
                let name = constant_name(code, opcode, operand)?;
                let found = frame.scope.lookup(name).ok_or_else(|| not_defined(name))?;
                frame.push(found.value);
            }
            OpCode::LoadNameOrUndefined => {
                let name = constant_name(code, opcode, operand)?;
                let value = frame.scope.lookup(name).map(|l| l.value).unwrap_or_default();
                frame.push(value);
            }
            OpCode::LoadNameWithThis => {
                let name = constant_name(code, opcode, operand)?;
                let found = frame.scope.lookup(name).ok_or_else(|| not_defined(name))?;
                frame.push(found.value);
                frame.push(found.this);
            }
            OpCode::StoreName => {
                let name = constant_name(code, opcode, operand)?;
                let value = frame.peek()?.clone();
                if !frame.scope.assign(name, value.clone()) {
                    frame.scope.assign_global(name, value);
                }
            }
            OpCode::StoreNameStrict => {
                let name = constant_name(code, opcode, operand)?;
                let value = frame.peek()?.clone();
                if !frame.scope.assign(name, value) {
                    return Err(not_defined(name));
                }
            }
            OpCode::DeleteName => {
                let name = constant_name(code, opcode, operand)?;
                let deleted = frame.scope.delete_binding(name);
                frame.push(Value::Boolean(deleted));
            }

            // Properties
            OpCode::GetProperty => {
                let (object, key) = frame.pop2()?;
                let key = key.to_property_key();
                if object.is_nullish() {
                    return Err(Error::TypeError(format!(
                        "Cannot read property '{}' of {}",
                        key, object
                    )));
                }
                frame.push(object.get_property(&key));
            }
            OpCode::SetProperty => {
                let value = frame.pop()?;
                let (object, key) = frame.pop2()?;
                let key = key.to_property_key();
                match &object {
                    Value::Object(obj) => obj.set(&key, value.clone()),
                    v if v.is_nullish() => {
                        return Err(Error::TypeError(format!(
                            "Cannot set property '{}' of {}",
                            key, object
                        )));
                    }
                    // Primitives drop the write.
                    _ => {}
                }
                frame.push(value);
            }
            OpCode::DeleteProperty => {
                let (object, key) = frame.pop2()?;
                let key = key.to_property_key();
                let deleted = match &object {
                    Value::Object(obj) => obj.delete(&key),
                    v if v.is_nullish() => {
                        return Err(Error::TypeError(format!(
                            "Cannot delete property '{}' of {}",
                            key, object
                        )));
                    }
                    _ => true,
                };
                frame.push(Value::Boolean(deleted));
            }
            OpCode::DefineProperty => {
                let key = constant_name(code, opcode, operand)?;
                let value = frame.pop()?;
                if let Value::Object(obj) = frame.peek()? {
                    obj.set(key, value);
                }
            }
            OpCode::NewObject => frame.push(Value::Object(ObjectRef::new(Object::new()))),
            OpCode::NewArray => {
                let length = arg_count(opcode, operand)?;
                frame.push(Value::Object(ObjectRef::new(Object::array(length))));
            }

            // Control flow
            OpCode::Jump => frame.ip = jump_target(opcode, operand)?,
            OpCode::JumpIfFalse => {
                let target = jump_target(opcode, operand)?;
                if !frame.pop()?.to_boolean() {
                    frame.ip = target;
                }
            }
            OpCode::JumpIfTrue => {
                let target = jump_target(opcode, operand)?;
                if frame.pop()?.to_boolean() {
                    frame.ip = target;
                }
            }
            OpCode::LogicalAnd | OpCode::LogicalOr => {
                let target = jump_target(opcode, operand)?;
                let truthy = frame.peek()?.to_boolean();
                if truthy == (opcode == OpCode::LogicalOr) {
                    frame.ip = target;
                } else {
                    frame.pop()?;
                }
            }

            // Functions
            OpCode::Call | OpCode::CallEval => {
                let Some(Operand::Call { args, callee }) = operand else {
                    return Err(bad_operand(opcode));
                };
                let args = frame.pop_n(usize::from(args))?;
                let (function, this) = frame.pop2()?;

                let result = if opcode == OpCode::CallEval && is_builtin_eval(&function) {
                    match args.into_iter().next() {
                        Some(Value::String(source)) => {
                            let scope = frame.scope.clone();
                            let this = frame.this.clone();
                            self.eval_in(&source, scope, this, code.strict)?
                        }
                        Some(other) => other,
                        None => Value::Undefined,
                    }
                } else {
                    let description = constant_name(code, opcode, Some(Operand::Property(callee)))?;
                    self.call_described(&function, this, args, description)?
                };
                frame.push(result);
            }
            OpCode::New => {
                let count = arg_count(opcode, operand)?;
                let args = frame.pop_n(count)?;
                let constructor = frame.pop()?;
                let result = self.construct(&constructor, args)?;
                frame.push(result);
            }
            OpCode::Return => return frame.pop().map(Some),
            OpCode::Closure => {
                let Some(Operand::Function(index)) = operand else {
                    return Err(bad_operand(opcode));
                };
                let function = code.bytecode.functions.get(usize::from(index)).cloned().ok_or_else(|| {
                    Error::InternalError(format!("function {} out of range", index))
                })?;
                frame.push(make_closure(function, frame.scope.clone()));
            }

            // Objects
            OpCode::TypeOf => {
                let value = frame.pop()?;
                frame.push(Value::from(value.type_of()));
            }
            OpCode::InstanceOf => {
                let (value, constructor) = frame.pop2()?;
                let Value::Function(constructor) = constructor else {
                    return Err(Error::TypeError(
                        "Right-hand side of 'instanceof' is not callable".into(),
                    ));
                };
                let result = matches!(&value, Value::Object(obj) if obj.constructed_by(&constructor));
                frame.push(Value::Boolean(result));
            }
            OpCode::In => {
                let (key, object) = frame.pop2()?;
                let key = key.to_property_key();
                let Value::Object(obj) = &object else {
                    return Err(Error::TypeError(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        key, object
                    )));
                };
                frame.push(Value::Boolean(obj.has(&key)));
            }

            // Iteration
            OpCode::ForInPrepare => {
                let index = local_index(opcode, operand)?;
                let keys = match frame.pop()? {
                    Value::Object(obj) => obj.enumerable_keys(),
                    Value::String(s) => (0..s.chars().count()).map(|i| i.to_string()).collect(),
                    _ => Vec::new(),
                };
                frame.key_iterators.insert(index, VecDeque::from(keys));
            }
            OpCode::ForInHasNext => {
                let index = local_index(opcode, operand)?;
                let has_next = frame.key_iterators.get(&index).is_some_and(|keys| !keys.is_empty());
                frame.push(Value::Boolean(has_next));
            }
            OpCode::ForInNext => {
                let index = local_index(opcode, operand)?;
                let key = frame
                    .key_iterators
                    .get_mut(&index)
                    .and_then(VecDeque::pop_front)
                    .map(Value::String)
                    .unwrap_or_default();
                frame.push(key);
            }

            // Exceptions and scopes
            OpCode::EnterTry => {
                let target = jump_target(opcode, operand)?;
                frame.handlers.push(Handler {
                    target,
                    stack_depth: frame.stack.len(),
                    scope: frame.scope.clone(),
                });
            }
            OpCode::LeaveTry => {
                frame.handlers.pop();
            }
            OpCode::PushCatchScope => {
                let name = constant_name(code, opcode, operand)?;
                let exception = frame.pop()?;
                let names: Arc<[String]> = Arc::from(vec![name.to_string()]);
                let env = Environment::declarative(names, Some(frame.scope.clone()));
                env.set_slot(0, exception);
                frame.scope = env;
            }
            OpCode::PushWithScope => {
                let object = match frame.pop()? {
                    Value::Object(obj) => obj,
                    other => {
                        return Err(Error::TypeError(format!(
                            "Cannot use {} as a with-statement object",
                            other
                        )));
                    }
                };
                frame.scope = Environment::object(object, frame.scope.clone());
            }
            OpCode::PopScope => {
                let parent = frame
                    .scope
                    .parent()
                    .cloned()
                    .ok_or_else(|| Error::InternalError("PopScope at the outermost scope".into()))?;
                frame.scope = parent;
            }
            OpCode::Throw => {
                let exception = frame.pop()?;
                trace!(exception = %exception, "throw");
                return Err(Error::Thrown(exception));
            }

            OpCode::LoadThis => {
                let this = frame.this.clone();
                frame.push(this);
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// The script value a handler receives for `error`. Engine failures
    /// that scripts cannot observe are passed through as errors.
    fn exception_value(&self, error: Error) -> Result<Value, Error> {
        let (kind, message) = match error {
            Error::Thrown(value) => return Ok(value),
            Error::TypeError(message) => (ErrorKind::TypeError, message),
            Error::ReferenceError(message) => (ErrorKind::ReferenceError, message),
            Error::RangeError(message) => (ErrorKind::RangeError, message),
            Error::SyntaxError(message) => (ErrorKind::SyntaxError, message),
            fatal @ (Error::InternalError(_) | Error::Io(_)) => return Err(fatal),
        };
        Ok(self.error_object(kind, &message))
    }

    /// Builds an error object as the matching constructor would.
    pub fn error_object(&self, kind: ErrorKind, message: &str) -> Value {
        let obj = ObjectRef::new(Object::error(kind.name(), message));
        if let Some(Value::Function(constructor)) = self.global.get_value(kind.name()) {
            obj.set_constructor(constructor);
        }
        Value::Object(obj)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

/// Creates a function value closing over `scope`. A named function
/// expression gets an extra one-slot scope holding itself.
fn make_closure(code: Arc<FunctionCode>, scope: Arc<Environment>) -> Value {
    if !code.binds_own_name {
        return Value::Function(Arc::new(Callable::Function(Closure { code, scope })));
    }

    let name = code.name.clone().unwrap_or_default();
    let own_scope = Environment::declarative(Arc::from(vec![name]), Some(scope));
    let function = Value::Function(Arc::new(Callable::Function(Closure {
        code,
        scope: own_scope.clone(),
    })));
    own_scope.set_slot(0, function.clone());
    function
}

fn is_builtin_eval(value: &Value) -> bool {
    matches!(value, Value::Function(f) if matches!(f.as_ref(), Callable::Native { name: "eval", .. }))
}

fn add(a: &Value, b: &Value) -> Value {
    let stringish = |v: &Value| matches!(v, Value::String(_) | Value::Object(_) | Value::Function(_));
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
        _ if stringish(a) || stringish(b) => Value::String(format!("{}{}", a, b)),
        _ => Value::Number(a.to_number() + b.to_number()),
    }
}

fn numeric<F>(frame: &mut CallFrame, op: F) -> Result<(), Error>
where
    F: Fn(f64, f64) -> f64,
{
    let (a, b) = frame.pop2()?;
    frame.push(Value::Number(op(a.to_number(), b.to_number())));
    Ok(())
}

fn relational<F>(frame: &mut CallFrame, test: F) -> Result<(), Error>
where
    F: Fn(Ordering) -> bool,
{
    let (a, b) = frame.pop2()?;
    let result = compare(&a, &b).is_some_and(test);
    frame.push(Value::Boolean(result));
    Ok(())
}

fn bitwise<F>(frame: &mut CallFrame, op: F) -> Result<(), Error>
where
    F: Fn(i32, i32) -> i32,
{
    let (a, b) = frame.pop2()?;
    frame.push(Value::Number(f64::from(op(a.to_int32(), b.to_int32()))));
    Ok(())
}

fn not_defined(name: &str) -> Error {
    Error::ReferenceError(format!("{} is not defined", name))
}

// Operand decoding

fn bad_operand(opcode: OpCode) -> Error {
    Error::InternalError(format!("{:?} with a missing or mismatched operand", opcode))
}

fn constant_index(opcode: OpCode, operand: Option<Operand>) -> Result<usize, Error> {
    match operand {
        Some(Operand::Constant(index)) => Ok(usize::from(index)),
        _ => Err(bad_operand(opcode)),
    }
}

fn local_index(opcode: OpCode, operand: Option<Operand>) -> Result<usize, Error> {
    match operand {
        Some(Operand::Local(index)) => Ok(usize::from(index)),
        _ => Err(bad_operand(opcode)),
    }
}

fn jump_target(opcode: OpCode, operand: Option<Operand>) -> Result<usize, Error> {
    match operand {
        Some(Operand::Jump(target)) => Ok(target),
        _ => Err(bad_operand(opcode)),
    }
}

fn arg_count(opcode: OpCode, operand: Option<Operand>) -> Result<usize, Error> {
    match operand {
        Some(Operand::ArgCount(count)) => Ok(usize::from(count)),
        _ => Err(bad_operand(opcode)),
    }
}

fn slot(opcode: OpCode, operand: Option<Operand>) -> Result<(usize, usize), Error> {
    match operand {
        Some(Operand::Slot { depth, index }) => Ok((usize::from(depth), usize::from(index))),
        _ => Err(bad_operand(opcode)),
    }
}

/// The string constant a name or property operand points at.
fn constant_name(code: &FunctionCode, opcode: OpCode, operand: Option<Operand>) -> Result<&str, Error> {
    let Some(Operand::Property(index)) = operand else {
        return Err(bad_operand(opcode));
    };
    match code.bytecode.constants.get(usize::from(index)) {
        Some(Value::String(name)) => Ok(name),
        _ => Err(bad_operand(opcode)),
    }
}

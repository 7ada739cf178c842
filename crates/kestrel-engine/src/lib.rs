// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # kestrel-engine
//!
//! A compact ES3-subset JavaScript engine: a parser, a scope-resolving
//! bytecode compiler and a stack interpreter.
//!
//! ## Overview
//!
//! - Lexer and precedence-climbing parser
//! - Compile-time scope chain that turns most variable accesses into
//!   `(depth, index)` slot operands, falling back to by-name lookup under
//!   `eval` and `with`
//! - Statement and expression lowering with loop rotation, labeled
//!   `break`/`continue` and inlined `finally` blocks
//! - A small interpreter with a minimal global environment
//!
//! ## Quick Start
//!
//! ```rust
//! use kestrel_engine::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("var a = 5; a + 3;").unwrap();
//! assert_eq!(result, Value::Number(8.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

#[cfg(feature = "async")]
pub mod async_engine;

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

pub use config::{CompilerOptions, EngineOptions, UndeclaredAssignment};
pub use runtime::function::FunctionCode;
pub use runtime::object::ObjectClass;
pub use runtime::value::Value;
pub use vm::Interpreter;

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;
#[cfg(all(feature = "async", feature = "parallel"))]
pub use async_engine::ParallelCompiler;

/// The main JavaScript engine instance.
///
/// Owns the global environment; successive calls to [`Engine::eval`] see
/// each other's globals.
pub struct Engine {
    interpreter: Interpreter,
}

impl Engine {
    /// Creates a new JavaScript engine instance with default configuration.
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    /// Creates an engine with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        Self {
            interpreter: Interpreter::new(options),
        }
    }

    /// The options this engine runs with.
    pub fn options(&self) -> &EngineOptions {
        self.interpreter.options()
    }

    /// Parses and compiles `source` as script code without running it.
    pub fn compile(&self, source: &str) -> Result<Arc<FunctionCode>, Error> {
        let program = parser::Parser::new(source).parse_program()?;
        let code = compiler::Compiler::new(self.options().compiler.clone()).compile(&program)?;
        debug!(
            instructions = code.bytecode.instructions.len(),
            bindings = code.bindings.len(),
            "compiled script"
        );
        Ok(code)
    }

    /// Evaluates JavaScript source code and returns the completion value
    /// of the last expression statement.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use kestrel_engine::{Engine, Value};
    /// let mut engine = Engine::new();
    /// assert_eq!(engine.eval("2 + 2;").unwrap(), Value::Number(4.0));
    /// ```
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let code = self.compile(source)?;
        self.interpreter.run_script(code).map_err(Error::from_thrown)
    }

    /// Evaluates JavaScript source code from a file.
    pub fn eval_file(&mut self, path: &Path) -> Result<Value, Error> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        self.eval(&source)
    }

    /// Reads a global binding.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.interpreter.global().get_value(name)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during JavaScript execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Syntax error during parsing, or an illegal jump found while compiling
    #[error("SyntaxError: {0}")]
    SyntaxError(String),
    /// Type error during execution
    #[error("TypeError: {0}")]
    TypeError(String),
    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),
    /// Range error (call depth exceeded)
    #[error("RangeError: {0}")]
    RangeError(String),
    /// Internal engine error
    #[error("InternalError: {0}")]
    InternalError(String),
    /// I/O error
    #[error("IOError: {0}")]
    Io(String),
    /// A value thrown by script code and never caught
    #[error("Uncaught {0}")]
    Thrown(Value),
}

impl Error {
    /// Maps an uncaught error object built by one of the typed error
    /// constructors back to the matching variant.
    pub fn from_thrown(self) -> Self {
        let Error::Thrown(Value::Object(obj)) = &self else {
            return self;
        };
        if obj.class() != ObjectClass::Error {
            return self;
        }
        let message = match obj.get("message") {
            Value::Undefined => String::new(),
            other => other.to_string(),
        };
        match obj.get("name").to_string().as_str() {
            "TypeError" => Error::TypeError(message),
            "ReferenceError" => Error::ReferenceError(message),
            "RangeError" => Error::RangeError(message),
            "SyntaxError" => Error::SyntaxError(message),
            _ => self,
        }
    }
}

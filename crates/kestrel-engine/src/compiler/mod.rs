//! Bytecode compiler for JavaScript.
//!
//! Transforms AST into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `scope`: Compile-time scope chain and name resolution
//! - `bytecode`: Bytecode definitions and the builder lowering emits into
//! - `codegen`: Statement and expression lowering

pub mod bytecode;
pub mod codegen;
pub mod scope;

pub use bytecode::{Bytecode, BytecodeBuilder, Instruction, Label, OpCode, Operand};
pub use codegen::Compiler;
pub use scope::{Resolution, ScopeChain, ScopeId, ScopeKind, Storage};

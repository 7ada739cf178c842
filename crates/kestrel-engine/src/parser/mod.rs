//! Parser for JavaScript source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//!
//! ## Structure
//!
//! - `parser` - Statement parsing and precedence climbing over expressions
//! - `operator` - Operator table and the arity-checked node builder every
//!   composite expression is assembled with
//!
//! ## Usage
//!
//! ```rust
//! use kestrel_engine::parser::Parser;
//!
//! let mut parser = Parser::new("var x = 1 + 2;");
//! let program = parser.parse_program().expect("Should parse");
//! assert_eq!(program.body.len(), 1);
//! ```

pub mod operator;
mod parser;

pub use operator::{Operator, OperatorFlags, OperatorKind, OperatorNode};
pub use parser::Parser;

//! Code generation from AST to bytecode.
//!
//! This module contains the [`Compiler`], which lowers a parsed program into
//! one [`FunctionCode`] per compilation unit. Statement lowering lives in
//! `statements.rs`, expression lowering in `expressions.rs`.
//!
//! Lowering keeps two explicit stacks per unit instead of mutable "current"
//! slots that have to be restored on every exit path:
//!
//! - the compile-time scope, held as a [`ScopeId`] and swapped around the
//!   constructs that introduce a scope (`catch`, `with`);
//! - the region stack, recording every enclosing breakable construct,
//!   exception region and runtime scope push, which is what `break`,
//!   `continue` and `return` unwind through.

mod expressions;
mod statements;


use std::sync::Arc;

use tracing::debug;

use crate::Error;
use crate::ast::*;
use crate::compiler::bytecode::{BytecodeBuilder, Label, OpCode, Operand};
use crate::compiler::scope::{
    Resolution, ScopeChain, ScopeId, ScopeKind, Storage, needs_dynamic_storage,
};
use crate::config::{CompilerOptions, UndeclaredAssignment};
use crate::runtime::function::{CodeKind, FunctionCode};

/// What a breakable region was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BreakableKind {
    /// Any loop; the only valid `continue` target
    Loop,
    /// A switch; the default target of an unlabeled `break`
    Switch,
    /// Any other labeled statement; reachable only by `break label`
    Labeled,
}

/// An entry of the region stack.
#[derive(Debug, Clone, Copy)]
enum Region<'a> {
    /// A construct `break` / `continue` can target
    Breakable {
        labels: &'a [String],
        kind: BreakableKind,
        break_label: Label,
        continue_label: Option<Label>,
    },
    /// An open exception region; leaving it runs `finally` inline
    Try {
        finally: Option<&'a BlockStatement>,
        scope: ScopeId,
    },
    /// A runtime scope push (`catch` or `with`)
    Scope,
}

/// Per-unit lowering state.
struct Unit<'a> {
    kind: CodeKind,
    name: Option<String>,
    /// The function, global or eval scope owning the unit's declarations
    root: ScopeId,
    /// The scope the code being emitted runs in
    scope: ScopeId,
    builder: BytecodeBuilder,
    regions: Vec<Region<'a>>,
    strict: bool,
    /// Holds the last expression statement's value in global and eval code
    completion: Option<u16>,
}

impl<'a> Unit<'a> {
    fn new(kind: CodeKind, name: Option<String>, root: ScopeId, strict: bool) -> Result<Self, Error> {
        let mut builder = BytecodeBuilder::new();
        let completion = match kind {
            CodeKind::Function => None,
            CodeKind::Global | CodeKind::Eval => Some(builder.declare_local()?),
        };
        Ok(Self {
            kind,
            name,
            root,
            scope: root,
            builder,
            regions: Vec::new(),
            strict,
            completion,
        })
    }
}

/// Compiles AST to bytecode.
pub struct Compiler<'a> {
    options: CompilerOptions,
    scopes: ScopeChain<'a>,
    /// Units being lowered, innermost last
    units: Vec<Unit<'a>>,
}

impl<'a> Compiler<'a> {
    /// Creates a new compiler.
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            scopes: ScopeChain::new(),
            units: Vec::new(),
        }
    }

    /// The options this compiler lowers with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compiles a script.
    pub fn compile(&mut self, program: &'a Program) -> Result<Arc<FunctionCode>, Error> {
        let root = self.scopes.push(None, ScopeKind::Global, Storage::Dynamic);
        let strict = self.options.undeclared_assignment == UndeclaredAssignment::Throw
            || has_use_strict(&program.body);
        self.compile_unit(Unit::new(CodeKind::Global, None, root, strict)?, &program.body, Vec::new(), false)
    }

    /// Compiles eval code. `strict` is inherited from the calling code.
    pub fn compile_eval(
        &mut self,
        program: &'a Program,
        strict: bool,
    ) -> Result<Arc<FunctionCode>, Error> {
        let root = self.scopes.push(None, ScopeKind::Eval, Storage::Dynamic);
        let strict = strict
            || self.options.undeclared_assignment == UndeclaredAssignment::Throw
            || has_use_strict(&program.body);
        let code = self.compile_unit(
            Unit::new(CodeKind::Eval, None, root, strict)?,
            &program.body,
            Vec::new(),
            false,
        )?;
        debug!(instructions = code.bytecode.instructions.len(), "compiled eval code");
        Ok(code)
    }

    // ========================================================================
    // Units
    // ========================================================================

    /// Lowers one unit's body and packages the result.
    fn compile_unit(
        &mut self,
        unit: Unit<'a>,
        body: &'a [Statement],
        params: Vec<String>,
        binds_own_name: bool,
    ) -> Result<Arc<FunctionCode>, Error> {
        self.units.push(unit);
        let lowered = self.lower_unit_body(body);
        let unit = self
            .units
            .pop()
            .ok_or_else(|| Error::InternalError("unit stack underflow".into()))?;
        lowered?;

        let scope = self.scopes.get(unit.root);
        let storage = scope.storage();
        let bindings: Arc<[String]> = scope.bindings().names().into();
        let (bytecode, local_count) = unit.builder.finish()?;

        Ok(Arc::new(FunctionCode {
            name: unit.name,
            kind: unit.kind,
            params,
            storage,
            bindings,
            bytecode,
            local_count,
            strict: unit.strict,
            binds_own_name,
        }))
    }

    fn lower_unit_body(&mut self, body: &'a [Statement]) -> Result<(), Error> {
        let root = self.unit().root;
        for stmt in body {
            self.hoist_statement(root, stmt)?;
        }
        self.materialize_functions()?;

        for stmt in body {
            self.compile_statement(stmt)?;
        }

        match self.unit().completion {
            Some(completion) => {
                self.emit_with(OpCode::LoadLocal, Operand::Local(completion));
            }
            None => {
                self.emit(OpCode::LoadUndefined);
            }
        }
        self.emit(OpCode::Return);
        Ok(())
    }

    /// Lowers a function declaration or expression into its own unit and
    /// returns its index in the enclosing unit's function table.
    fn compile_function(&mut self, func: &'a FunctionNode, is_expression: bool) -> Result<u16, Error> {
        let mut parent = self.unit().scope;
        let own_name = func.id.as_ref().filter(|_| is_expression);
        if let Some(id) = own_name {
            parent = self.scopes.push(Some(parent), ScopeKind::Callee, Storage::Static);
            self.scopes.declare_catch_variable(parent, &id.name, id.span)?;
        }

        let storage = if needs_dynamic_storage(&func.body) {
            Storage::Dynamic
        } else {
            Storage::Static
        };
        let scope = self.scopes.push(Some(parent), ScopeKind::Function, storage);
        for param in &func.params {
            self.scopes.declare(scope, &param.name, None, param.span)?;
        }

        let name = func.id.as_ref().map(|id| id.name.clone());
        let strict = self.unit().strict || has_use_strict(&func.body);
        let params = func.params.iter().map(|p| p.name.clone()).collect();
        let unit = Unit::new(CodeKind::Function, name, scope, strict)?;
        let code = self.compile_unit(unit, &func.body, params, own_name.is_some())?;

        debug!(
            name = code.name.as_deref().unwrap_or("<anonymous>"),
            instructions = code.bytecode.instructions.len(),
            storage = ?code.storage,
            "lowered function"
        );
        self.builder().add_function(code)
    }

    // ========================================================================
    // Hoisting (ES3 Section 10.1.3)
    // ========================================================================

    /// Declares the `var` names and function declarations of a statement in
    /// the unit scope. Nested function bodies are left to their own unit.
    fn hoist_statement(&mut self, root: ScopeId, stmt: &'a Statement) -> Result<(), Error> {
        match &stmt.kind {
            StatementKind::Var(decl) => self.hoist_declaration(root, decl)?,
            StatementKind::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    self.scopes.declare(root, &id.name, Some(func), id.span)?;
                }
            }
            StatementKind::Block(block) => self.hoist_all(root, &block.body)?,
            StatementKind::If(stmt) => {
                self.hoist_statement(root, &stmt.consequent)?;
                if let Some(alternate) = &stmt.alternate {
                    self.hoist_statement(root, alternate)?;
                }
            }
            StatementKind::Loop(stmt) => {
                match &stmt.head {
                    LoopHead::Counted {
                        init: Some(ForInit::Declaration(decl)),
                        ..
                    } => self.hoist_declaration(root, decl)?,
                    LoopHead::Enumerate {
                        target: ForInTarget::Declaration(d),
                        ..
                    } => {
                        self.scopes.declare(root, &d.id.name, None, d.id.span)?;
                    }
                    _ => {}
                }
                self.hoist_statement(root, &stmt.body)?;
            }
            StatementKind::Switch(stmt) => {
                for case in &stmt.cases {
                    self.hoist_all(root, &case.consequent)?;
                }
            }
            StatementKind::Try(stmt) => {
                self.hoist_all(root, &stmt.block.body)?;
                if let Some(handler) = &stmt.handler {
                    self.hoist_all(root, &handler.body.body)?;
                }
                if let Some(finalizer) = &stmt.finalizer {
                    self.hoist_all(root, &finalizer.body)?;
                }
            }
            StatementKind::With(stmt) => self.hoist_statement(root, &stmt.body)?,
            StatementKind::Expression(_)
            | StatementKind::Return(_)
            | StatementKind::Break(_)
            | StatementKind::Continue(_)
            | StatementKind::Throw(_)
            | StatementKind::Empty => {}
        }
        Ok(())
    }

    fn hoist_all(&mut self, root: ScopeId, body: &'a [Statement]) -> Result<(), Error> {
        for stmt in body {
            self.hoist_statement(root, stmt)?;
        }
        Ok(())
    }

    fn hoist_declaration(&mut self, root: ScopeId, decl: &'a VariableDeclaration) -> Result<(), Error> {
        for d in &decl.declarations {
            self.scopes.declare(root, &d.id.name, None, d.id.span)?;
        }
        Ok(())
    }

    /// Stores a closure for every hoisted function declaration at unit entry.
    fn materialize_functions(&mut self) -> Result<(), Error> {
        let root = self.unit().root;
        let functions: Vec<(String, &'a FunctionNode)> = self
            .scopes
            .get(root)
            .bindings()
            .variables()
            .iter()
            .filter_map(|v| v.initializer.map(|f| (v.name.clone(), f)))
            .collect();

        for (name, func) in functions {
            let index = self.compile_function(func, false)?;
            self.emit_with(OpCode::Closure, Operand::Function(index));
            self.emit_store(&name)?;
            self.emit(OpCode::Pop);
        }
        Ok(())
    }

    // ========================================================================
    // Name access
    // ========================================================================

    fn resolve(&self, name: &str) -> Resolution {
        self.scopes.resolve(self.current_unit().scope, name)
    }

    /// Pushes the value of `name`; unresolvable names throw at runtime.
    fn emit_load(&mut self, name: &str) -> Result<(), Error> {
        match self.resolve(name) {
            Resolution::Slot { depth, index } => {
                self.emit_with(OpCode::LoadSlot, slot_operand(depth, index)?);
            }
            Resolution::Name => {
                let key = self.builder().string_constant(name)?;
                self.emit_with(OpCode::LoadName, Operand::Property(key));
            }
        }
        Ok(())
    }

    /// Stores the top of the stack into `name`, leaving the value in place.
    fn emit_store(&mut self, name: &str) -> Result<(), Error> {
        match self.resolve(name) {
            Resolution::Slot { depth, index } => {
                self.emit_with(OpCode::StoreSlot, slot_operand(depth, index)?);
            }
            Resolution::Name => {
                let key = self.builder().string_constant(name)?;
                let opcode = if self.unit().strict {
                    OpCode::StoreNameStrict
                } else {
                    OpCode::StoreName
                };
                self.emit_with(opcode, Operand::Property(key));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn current_unit(&self) -> &Unit<'a> {
        &self.units[self.units.len() - 1]
    }

    fn unit(&mut self) -> &mut Unit<'a> {
        let last = self.units.len() - 1;
        &mut self.units[last]
    }

    fn builder(&mut self) -> &mut BytecodeBuilder {
        &mut self.unit().builder
    }

    fn emit(&mut self, opcode: OpCode) -> usize {
        self.builder().emit(opcode)
    }

    fn emit_with(&mut self, opcode: OpCode, operand: Operand) -> usize {
        self.builder().emit_with(opcode, operand)
    }

    fn emit_jump(&mut self, opcode: OpCode, label: Label) {
        self.builder().emit_jump(opcode, label);
    }

    fn new_label(&mut self) -> Label {
        self.builder().new_label()
    }

    fn mark_label(&mut self, label: Label) {
        self.builder().mark_label(label);
    }

    fn declare_local(&mut self) -> Result<u16, Error> {
        self.builder().declare_local()
    }
}

impl Default for Compiler<'_> {
    fn default() -> Self {
        Self::new(CompilerOptions::default())
    }
}

fn slot_operand(depth: usize, index: usize) -> Result<Operand, Error> {
    let overflow = |_| Error::RangeError("Too many locals".into());
    Ok(Operand::Slot {
        depth: u16::try_from(depth).map_err(overflow)?,
        index: u16::try_from(index).map_err(overflow)?,
    })
}

/// Whether a body starts with a `"use strict"` directive.
fn has_use_strict(body: &[Statement]) -> bool {
    body.iter()
        .map_while(|stmt| match &stmt.kind {
            StatementKind::Expression(Expression::Literal(Literal::String(s))) => Some(s),
            _ => None,
        })
        .any(|s| s == "use strict")
}

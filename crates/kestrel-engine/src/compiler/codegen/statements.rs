//! Statement lowering.
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `var` | `StoreSlot` / `StoreName` | Names hoisted, initializers stay in place |
//! | `if/else` | `JumpIfFalse`, `Jump` | Conditional branching |
//! | loops | `JumpIfFalse`, `Jump` (back) | Rotated: test and body emitted twice |
//! | `for-in` | `ForInPrepare`, `ForInHasNext`, `ForInNext` | Keys snapshotted up front |
//! | `switch` | `StrictEq`, `JumpIfTrue` | Discriminant kept in a temporary |
//! | `try/catch/finally` | `EnterTry`, `LeaveTry`, `PushCatchScope` | `finally` inlined on every exit |
//! | `with` | `PushWithScope`, `PopScope` | Names inside resolve at runtime |
//! | `break/continue/return` | `Jump`, `Return` | Unwind enclosing regions first |
//!
//! ## Rotated loops
//!
//! ```text
//! for (init; test; incr) body
//!
//!   init
//!   test; JumpIfFalse -> end        (omitted for do-while)
//!   body                            (break -> end, continue -> cont1)
//! cont1:
//!   incr; Pop
//! loop:
//!   test; JumpIfFalse -> end2
//!   body                            (break -> end2, continue -> cont2)
//! cont2:
//!   incr; Pop
//!   Jump -> loop
//! end2:
//! end:
//! ```
//!
//! ## Try-Catch-Finally
//!
//! ```text
//!   EnterTry -> catch
//!   [try block]
//!   LeaveTry
//!   Jump -> after
//! catch:
//!   EnterTry -> rethrow             (only with finally)
//!   PushCatchScope e
//!   [handler]
//!   PopScope
//!   LeaveTry                        (only with finally)
//! after:
//!   [finally]
//!   Jump -> end
//! rethrow:
//!   StoreLocal t; [finally]; LoadLocal t; Throw
//! end:
//! ```

use super::{BreakableKind, Compiler, Region};
use crate::Error;
use crate::ast::*;
use crate::compiler::bytecode::{Label, OpCode, Operand};
use crate::compiler::scope::{ScopeKind, Storage};
use crate::runtime::function::CodeKind;

impl<'a> Compiler<'a> {
    /// Lowers one statement, including its labels.
    pub(super) fn compile_statement(&mut self, stmt: &'a Statement) -> Result<(), Error> {
        let depth = self.builder().stack_depth();

        if stmt.labels.is_empty() {
            self.compile_statement_kind(stmt)?;
        } else {
            let exit = self.new_label();
            let region = Region::Breakable {
                labels: &stmt.labels,
                kind: BreakableKind::Labeled,
                break_label: exit,
                continue_label: None,
            };
            self.with_region(region, |this| this.compile_statement_kind(stmt))?;
            self.mark_label(exit);
        }

        if self.options.check_stack_balance && self.builder().stack_depth() != depth {
            return Err(Error::InternalError(format!(
                "statement at {}..{} left the operand stack at {} (expected {})",
                stmt.span.start,
                stmt.span.end,
                self.builder().stack_depth(),
                depth
            )));
        }
        Ok(())
    }

    fn compile_statement_kind(&mut self, stmt: &'a Statement) -> Result<(), Error> {
        match &stmt.kind {
            StatementKind::Var(decl) => self.compile_var_declaration(decl),
            // Materialized at unit entry.
            StatementKind::FunctionDeclaration(_) => Ok(()),
            StatementKind::Expression(expr) => {
                self.compile_expression(expr)?;
                match self.unit().completion {
                    Some(completion) => {
                        self.emit_with(OpCode::StoreLocal, Operand::Local(completion));
                    }
                    None => {
                        self.emit(OpCode::Pop);
                    }
                }
                Ok(())
            }
            StatementKind::Block(block) => self.compile_block(block),
            StatementKind::If(stmt) => self.compile_if(stmt),
            StatementKind::Loop(loop_stmt) => self.compile_loop(loop_stmt, &stmt.labels),
            StatementKind::Switch(switch) => self.compile_switch(switch, &stmt.labels),
            StatementKind::Return(arg) => self.compile_return(arg.as_ref()),
            StatementKind::Break(label) => self.compile_break(label.as_ref()),
            StatementKind::Continue(label) => self.compile_continue(label.as_ref()),
            StatementKind::Throw(arg) => {
                self.compile_expression(arg)?;
                self.emit(OpCode::Throw);
                Ok(())
            }
            StatementKind::Try(stmt) => self.compile_try(stmt),
            StatementKind::With(stmt) => self.compile_with(stmt),
            StatementKind::Empty => Ok(()),
        }
    }

    pub(super) fn compile_block(&mut self, block: &'a BlockStatement) -> Result<(), Error> {
        for stmt in &block.body {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_var_declaration(&mut self, decl: &'a VariableDeclaration) -> Result<(), Error> {
        for declarator in &decl.declarations {
            if let Some(init) = &declarator.init {
                self.compile_expression(init)?;
                self.emit_store(&declarator.id.name)?;
                self.emit(OpCode::Pop);
            }
        }
        Ok(())
    }

    fn compile_if(&mut self, stmt: &'a IfStatement) -> Result<(), Error> {
        let else_label = self.new_label();
        self.compile_expression(&stmt.test)?;
        self.emit_jump(OpCode::JumpIfFalse, else_label);
        self.compile_statement(&stmt.consequent)?;

        match &stmt.alternate {
            Some(alternate) => {
                let end = self.new_label();
                self.emit_jump(OpCode::Jump, end);
                self.mark_label(else_label);
                self.compile_statement(alternate)?;
                self.mark_label(end);
            }
            None => self.mark_label(else_label),
        }
        Ok(())
    }

    // ========================================================================
    // Loops
    // ========================================================================

    fn compile_loop(&mut self, stmt: &'a LoopStatement, labels: &'a [String]) -> Result<(), Error> {
        // for-in keeps its key snapshot in a temporary
        let keys = match &stmt.head {
            LoopHead::Enumerate { .. } => Some(self.declare_local()?),
            LoopHead::Counted { .. } => None,
        };
        self.compile_loop_init(&stmt.head, keys)?;

        if self.options.loop_rotation {
            self.compile_rotated_loop(stmt, labels, keys)
        } else {
            self.compile_simple_loop(stmt, labels, keys)
        }
    }

    fn compile_rotated_loop(
        &mut self,
        stmt: &'a LoopStatement,
        labels: &'a [String],
        keys: Option<u16>,
    ) -> Result<(), Error> {
        let end = self.new_label();
        let first_continue = self.new_label();
        if !stmt.check_at_end() {
            self.compile_loop_test(&stmt.head, keys, end)?;
        }
        self.compile_loop_body(stmt, labels, keys, end, first_continue)?;
        self.mark_label(first_continue);
        self.compile_loop_increment(&stmt.head)?;

        let top = self.new_label();
        let second_end = self.new_label();
        let second_continue = self.new_label();
        self.mark_label(top);
        self.compile_loop_test(&stmt.head, keys, second_end)?;
        self.compile_loop_body(stmt, labels, keys, second_end, second_continue)?;
        self.mark_label(second_continue);
        self.compile_loop_increment(&stmt.head)?;
        self.emit_jump(OpCode::Jump, top);

        self.mark_label(second_end);
        self.mark_label(end);
        Ok(())
    }

    fn compile_simple_loop(
        &mut self,
        stmt: &'a LoopStatement,
        labels: &'a [String],
        keys: Option<u16>,
    ) -> Result<(), Error> {
        let top = self.new_label();
        let body = self.new_label();
        let cont = self.new_label();
        let end = self.new_label();

        self.mark_label(top);
        if !stmt.check_at_end() {
            self.compile_loop_test(&stmt.head, keys, end)?;
        }
        self.mark_label(body);
        self.compile_loop_body(stmt, labels, keys, end, cont)?;
        self.mark_label(cont);
        self.compile_loop_increment(&stmt.head)?;

        if stmt.check_at_end() {
            self.compile_loop_condition(&stmt.head, keys)?;
            self.emit_jump(OpCode::JumpIfTrue, body);
        } else {
            self.emit_jump(OpCode::Jump, top);
        }
        self.mark_label(end);
        Ok(())
    }

    fn compile_loop_init(&mut self, head: &'a LoopHead, keys: Option<u16>) -> Result<(), Error> {
        match head {
            LoopHead::Counted { init, .. } => match init {
                Some(ForInit::Declaration(decl)) => self.compile_var_declaration(decl)?,
                Some(ForInit::Expression(expr)) => {
                    self.compile_expression(expr)?;
                    self.emit(OpCode::Pop);
                }
                None => {}
            },
            LoopHead::Enumerate { target, object } => {
                if let ForInTarget::Declaration(VariableDeclarator { id, init: Some(init) }) = target {
                    self.compile_expression(init)?;
                    self.emit_store(&id.name)?;
                    self.emit(OpCode::Pop);
                }
                self.compile_expression(object)?;
                self.emit_with(OpCode::ForInPrepare, for_in_operand(keys)?);
            }
        }
        Ok(())
    }

    /// Pushes the loop condition; a missing condition is `true`.
    fn compile_loop_condition(&mut self, head: &'a LoopHead, keys: Option<u16>) -> Result<(), Error> {
        match head {
            LoopHead::Counted { condition: Some(test), .. } => self.compile_expression(test)?,
            LoopHead::Counted { condition: None, .. } => {
                self.emit(OpCode::LoadTrue);
            }
            LoopHead::Enumerate { .. } => {
                self.emit_with(OpCode::ForInHasNext, for_in_operand(keys)?);
            }
        }
        Ok(())
    }

    fn compile_loop_test(&mut self, head: &'a LoopHead, keys: Option<u16>, exit: Label) -> Result<(), Error> {
        if let LoopHead::Counted { condition: None, .. } = head {
            return Ok(());
        }
        self.compile_loop_condition(head, keys)?;
        self.emit_jump(OpCode::JumpIfFalse, exit);
        Ok(())
    }

    fn compile_loop_body(
        &mut self,
        stmt: &'a LoopStatement,
        labels: &'a [String],
        keys: Option<u16>,
        break_label: Label,
        continue_label: Label,
    ) -> Result<(), Error> {
        if let LoopHead::Enumerate { target, .. } = &stmt.head {
            self.emit_with(OpCode::ForInNext, for_in_operand(keys)?);
            match target {
                ForInTarget::Declaration(d) => self.emit_store(&d.id.name)?,
                ForInTarget::Expression(expr) => self.assign_stack_value(expr)?,
            }
            self.emit(OpCode::Pop);
        }

        let region = Region::Breakable {
            labels,
            kind: BreakableKind::Loop,
            break_label,
            continue_label: Some(continue_label),
        };
        self.with_region(region, |this| this.compile_statement(&stmt.body))
    }

    fn compile_loop_increment(&mut self, head: &'a LoopHead) -> Result<(), Error> {
        if let LoopHead::Counted { increment: Some(incr), .. } = head {
            self.compile_expression(incr)?;
            self.emit(OpCode::Pop);
        }
        Ok(())
    }

    // ========================================================================
    // Switch
    // ========================================================================

    fn compile_switch(&mut self, stmt: &'a SwitchStatement, labels: &'a [String]) -> Result<(), Error> {
        let discriminant = self.declare_local()?;
        self.compile_expression(&stmt.discriminant)?;
        self.emit_with(OpCode::StoreLocal, Operand::Local(discriminant));

        let end = self.new_label();
        let case_labels: Vec<Label> = stmt.cases.iter().map(|_| self.new_label()).collect();
        let mut default = None;

        for (case, &label) in stmt.cases.iter().zip(&case_labels) {
            match &case.test {
                Some(test) => {
                    self.emit_with(OpCode::LoadLocal, Operand::Local(discriminant));
                    self.compile_expression(test)?;
                    self.emit(OpCode::StrictEq);
                    self.emit_jump(OpCode::JumpIfTrue, label);
                }
                None => default = Some(label),
            }
        }
        self.emit_jump(OpCode::Jump, default.unwrap_or(end));

        let region = Region::Breakable {
            labels,
            kind: BreakableKind::Switch,
            break_label: end,
            continue_label: None,
        };
        self.with_region(region, |this| {
            for (case, &label) in stmt.cases.iter().zip(&case_labels) {
                this.mark_label(label);
                for s in &case.consequent {
                    this.compile_statement(s)?;
                }
            }
            Ok(())
        })?;

        self.mark_label(end);
        Ok(())
    }

    // ========================================================================
    // Jumps
    // ========================================================================

    fn compile_return(&mut self, arg: Option<&'a Expression>) -> Result<(), Error> {
        if self.unit().kind != CodeKind::Function {
            return Err(Error::SyntaxError("Illegal return statement".into()));
        }
        match arg {
            Some(expr) => self.compile_expression(expr)?,
            None => {
                self.emit(OpCode::LoadUndefined);
            }
        }

        let through_finally = self
            .unit()
            .regions
            .iter()
            .any(|r| matches!(r, Region::Try { finally: Some(_), .. }));
        if through_finally {
            let value = self.declare_local()?;
            self.emit_with(OpCode::StoreLocal, Operand::Local(value));
            self.unwind_to(0)?;
            self.emit_with(OpCode::LoadLocal, Operand::Local(value));
        }
        self.emit(OpCode::Return);
        Ok(())
    }

    fn compile_break(&mut self, label: Option<&Identifier>) -> Result<(), Error> {
        let (index, target) = self.find_jump_target(label, false)?;
        self.unwind_to(index + 1)?;
        self.emit_jump(OpCode::Jump, target);
        Ok(())
    }

    fn compile_continue(&mut self, label: Option<&Identifier>) -> Result<(), Error> {
        let (index, target) = self.find_jump_target(label, true)?;
        self.unwind_to(index + 1)?;
        self.emit_jump(OpCode::Jump, target);
        Ok(())
    }

    /// Finds the region a `break` or `continue` leaves to.
    fn find_jump_target(
        &self,
        label: Option<&Identifier>,
        is_continue: bool,
    ) -> Result<(usize, Label), Error> {
        let regions = &self.current_unit().regions;
        for (index, region) in regions.iter().enumerate().rev() {
            let Region::Breakable {
                labels,
                kind,
                break_label,
                continue_label,
            } = *region
            else {
                continue;
            };

            let matches = match label {
                Some(name) => labels.iter().any(|l| *l == name.name),
                None if is_continue => kind == BreakableKind::Loop,
                None => kind != BreakableKind::Labeled,
            };
            if !matches {
                continue;
            }

            if !is_continue {
                return Ok((index, break_label));
            }
            return match continue_label {
                Some(target) => Ok((index, target)),
                None => Err(Error::SyntaxError(format!(
                    "Illegal continue statement: '{}' does not denote an iteration statement",
                    label.map(|l| l.name.as_str()).unwrap_or_default()
                ))),
            };
        }

        Err(match (label, is_continue) {
            (Some(name), _) => Error::SyntaxError(format!("Undefined label '{}'", name.name)),
            (None, true) => Error::SyntaxError("Illegal continue statement".into()),
            (None, false) => Error::SyntaxError("Illegal break statement".into()),
        })
    }

    /// Emits the exits for every region above `depth`, innermost first:
    /// pops runtime scopes, leaves exception regions and runs their
    /// `finally` blocks.
    fn unwind_to(&mut self, depth: usize) -> Result<(), Error> {
        let mut index = self.unit().regions.len();
        while index > depth {
            index -= 1;
            match self.unit().regions[index] {
                Region::Breakable { .. } => {}
                Region::Scope => {
                    self.emit(OpCode::PopScope);
                }
                Region::Try { finally, scope } => {
                    self.emit(OpCode::LeaveTry);
                    if let Some(block) = finally {
                        // The finally block sees only the regions outside its try.
                        let inner = self.unit().regions.split_off(index);
                        let saved_scope = std::mem::replace(&mut self.unit().scope, scope);
                        let result = self.compile_block(block);
                        self.unit().scope = saved_scope;
                        self.unit().regions.extend(inner);
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Exceptions and scopes
    // ========================================================================

    fn compile_try(&mut self, stmt: &'a TryStatement) -> Result<(), Error> {
        let pre_try_scope = self.unit().scope;
        let finally = stmt.finalizer.as_ref();
        let end = self.new_label();
        let rethrow = self.new_label();
        let handler = self.new_label();

        let first_handler = if stmt.handler.is_some() { handler } else { rethrow };
        self.emit_jump(OpCode::EnterTry, first_handler);
        self.with_region(Region::Try { finally, scope: pre_try_scope }, |this| {
            this.compile_block(&stmt.block)
        })?;
        self.emit(OpCode::LeaveTry);

        let after = self.new_label();
        self.emit_jump(OpCode::Jump, after);

        if let Some(clause) = &stmt.handler {
            self.mark_label(handler);
            if finally.is_some() {
                self.emit_jump(OpCode::EnterTry, rethrow);
                self.with_region(Region::Try { finally, scope: pre_try_scope }, |this| {
                    this.compile_catch(clause)
                })?;
                self.emit(OpCode::LeaveTry);
            } else {
                self.compile_catch(clause)?;
            }
        }

        self.mark_label(after);
        if let Some(block) = finally {
            self.compile_block(block)?;
            self.emit_jump(OpCode::Jump, end);

            self.mark_label(rethrow);
            let exception = self.declare_local()?;
            self.emit_with(OpCode::StoreLocal, Operand::Local(exception));
            self.compile_block(block)?;
            self.emit_with(OpCode::LoadLocal, Operand::Local(exception));
            self.emit(OpCode::Throw);
        }
        self.mark_label(end);
        Ok(())
    }

    /// Binds the exception (on the stack) in a fresh catch scope and runs
    /// the handler body in it.
    fn compile_catch(&mut self, clause: &'a CatchClause) -> Result<(), Error> {
        let outer = self.unit().scope;
        let catch_scope = self.scopes.push(Some(outer), ScopeKind::Catch, Storage::Static);
        self.scopes
            .declare_catch_variable(catch_scope, &clause.param.name, clause.param.span)?;

        let name = self.builder().string_constant(&clause.param.name)?;
        self.emit_with(OpCode::PushCatchScope, Operand::Property(name));
        self.unit().scope = catch_scope;
        let result = self.with_region(Region::Scope, |this| this.compile_block(&clause.body));
        self.unit().scope = outer;
        result?;
        self.emit(OpCode::PopScope);
        Ok(())
    }

    fn compile_with(&mut self, stmt: &'a WithStatement) -> Result<(), Error> {
        self.compile_expression(&stmt.object)?;
        self.emit(OpCode::PushWithScope);

        let outer = self.unit().scope;
        self.unit().scope = self.scopes.push(Some(outer), ScopeKind::With, Storage::Dynamic);
        let result = self.with_region(Region::Scope, |this| this.compile_statement(&stmt.body));
        self.unit().scope = outer;
        result?;

        self.emit(OpCode::PopScope);
        Ok(())
    }

    /// Runs `f` with `region` pushed on the region stack.
    fn with_region<F>(&mut self, region: Region<'a>, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Self) -> Result<(), Error>,
    {
        self.unit().regions.push(region);
        let result = f(self);
        self.unit().regions.pop();
        result
    }
}

fn for_in_operand(keys: Option<u16>) -> Result<Operand, Error> {
    keys.map(Operand::Local)
        .ok_or_else(|| Error::InternalError("for-in loop without a key temporary".into()))
}

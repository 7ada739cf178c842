//! Expression lowering.
//!
//! Every expression leaves exactly one value on the operand stack.
//!
//! ## References
//!
//! Bare identifiers go through the scope chain: a static slot becomes
//! `LoadSlot`/`StoreSlot`, anything else a by-name access. Member
//! expressions push `[object, key]` and use the property opcodes.
//!
//! ## Calls
//!
//! ```text
//! f(a, b)      LoadNameWithThis f          -> [f, this]
//! o.m(a)       o; Dup; "m"; GetProperty; Swap  -> [m, o]
//! (expr)(a)    expr; LoadUndefined         -> [value, undefined]
//!              args...; Call argc
//! ```

use super::Compiler;
use crate::Error;
use crate::ast::*;
use crate::compiler::bytecode::{OpCode, Operand};
use crate::compiler::scope::Resolution;

impl<'a> Compiler<'a> {
    /// Lowers an expression, leaving its value on the stack.
    pub(super) fn compile_expression(&mut self, expr: &'a Expression) -> Result<(), Error> {
        match expr {
            Expression::Literal(lit) => self.compile_literal(lit)?,
            Expression::Identifier(id) => self.emit_load(&id.name)?,
            Expression::This => {
                self.emit(OpCode::LoadThis);
            }
            Expression::Array(arr) => self.compile_array(arr)?,
            Expression::Object(obj) => self.compile_object(obj)?,
            Expression::Function(func) => {
                let index = self.compile_function(func, true)?;
                self.emit_with(OpCode::Closure, Operand::Function(index));
            }
            Expression::Grouping(inner) => self.compile_expression(inner)?,
            Expression::Unary(unary) => self.compile_unary(unary)?,
            Expression::Update(update) => self.compile_update(update)?,
            Expression::Binary(binary) => {
                self.compile_expression(&binary.left)?;
                self.compile_expression(&binary.right)?;
                self.emit(binary_opcode(binary.operator));
            }
            Expression::Logical(logical) => {
                let end = self.new_label();
                self.compile_expression(&logical.left)?;
                let opcode = match logical.operator {
                    LogicalOperator::And => OpCode::LogicalAnd,
                    LogicalOperator::Or => OpCode::LogicalOr,
                };
                self.emit_jump(opcode, end);
                self.compile_expression(&logical.right)?;
                self.mark_label(end);
            }
            Expression::Assignment(assign) => self.compile_assignment(assign)?,
            Expression::Conditional(cond) => {
                let else_label = self.new_label();
                let end = self.new_label();
                self.compile_expression(&cond.test)?;
                self.emit_jump(OpCode::JumpIfFalse, else_label);
                self.compile_expression(&cond.consequent)?;
                self.emit_jump(OpCode::Jump, end);
                self.mark_label(else_label);
                self.compile_expression(&cond.alternate)?;
                self.mark_label(end);
            }
            Expression::Sequence(seq) => {
                let Some((last, rest)) = seq.expressions.split_last() else {
                    return Err(Error::SyntaxError("Empty comma expression".into()));
                };
                for expr in rest {
                    self.compile_expression(expr)?;
                    self.emit(OpCode::Pop);
                }
                self.compile_expression(last)?;
            }
            Expression::Call(call) => self.compile_call(call)?,
            Expression::Member(member) => {
                self.compile_member_reference(member)?;
                self.emit(OpCode::GetProperty);
            }
            Expression::New(new) => self.compile_new(new)?,
        }
        Ok(())
    }

    fn compile_literal(&mut self, lit: &Literal) -> Result<(), Error> {
        match lit {
            Literal::Number(n) => {
                let index = self.builder().number_constant(*n)?;
                self.emit_with(OpCode::LoadConst, Operand::Constant(index));
            }
            Literal::String(s) => {
                let index = self.builder().string_constant(s)?;
                self.emit_with(OpCode::LoadConst, Operand::Constant(index));
            }
            Literal::Boolean(true) => {
                self.emit(OpCode::LoadTrue);
            }
            Literal::Boolean(false) => {
                self.emit(OpCode::LoadFalse);
            }
            Literal::Null => {
                self.emit(OpCode::LoadNull);
            }
        }
        Ok(())
    }

    fn compile_array(&mut self, arr: &'a ArrayExpression) -> Result<(), Error> {
        let len = u16::try_from(arr.elements.len())
            .map_err(|_| Error::RangeError("Array literal too large".into()))?;
        self.emit_with(OpCode::NewArray, Operand::ArgCount(len));
        for (index, element) in arr.elements.iter().enumerate() {
            // Holes stay absent.
            if let Some(element) = element {
                self.compile_expression(element)?;
                let key = self.builder().string_constant(&index.to_string())?;
                self.emit_with(OpCode::DefineProperty, Operand::Property(key));
            }
        }
        Ok(())
    }

    fn compile_object(&mut self, obj: &'a ObjectExpression) -> Result<(), Error> {
        self.emit(OpCode::NewObject);
        for property in &obj.properties {
            self.compile_expression(&property.value)?;
            let key = self.builder().string_constant(&property.key)?;
            self.emit_with(OpCode::DefineProperty, Operand::Property(key));
        }
        Ok(())
    }

    /// Pushes `[object, key]` for a member expression.
    fn compile_member_reference(&mut self, member: &'a MemberExpression) -> Result<(), Error> {
        self.compile_expression(&member.object)?;
        match &member.property {
            MemberProperty::Named(name) => {
                let key = self.builder().string_constant(&name.name)?;
                self.emit_with(OpCode::LoadConst, Operand::Constant(key));
            }
            MemberProperty::Computed(key) => self.compile_expression(key)?,
        }
        Ok(())
    }

    // ========================================================================
    // Unary and update
    // ========================================================================

    fn compile_unary(&mut self, unary: &'a UnaryExpression) -> Result<(), Error> {
        match unary.operator {
            UnaryOperator::Typeof => {
                match unary.argument.unwrap_grouping() {
                    Expression::Identifier(id) => match self.resolve(&id.name) {
                        Resolution::Slot { .. } => self.emit_load(&id.name)?,
                        Resolution::Name => {
                            let key = self.builder().string_constant(&id.name)?;
                            self.emit_with(OpCode::LoadNameOrUndefined, Operand::Property(key));
                        }
                    },
                    other => self.compile_expression(other)?,
                }
                self.emit(OpCode::TypeOf);
            }
            UnaryOperator::Delete => match unary.argument.unwrap_grouping() {
                Expression::Identifier(id) => match self.resolve(&id.name) {
                    // Declared variables never go away.
                    Resolution::Slot { .. } => {
                        self.emit(OpCode::LoadFalse);
                    }
                    Resolution::Name => {
                        let key = self.builder().string_constant(&id.name)?;
                        self.emit_with(OpCode::DeleteName, Operand::Property(key));
                    }
                },
                Expression::Member(member) => {
                    self.compile_member_reference(member)?;
                    self.emit(OpCode::DeleteProperty);
                }
                other => {
                    self.compile_expression(other)?;
                    self.emit(OpCode::Pop);
                    self.emit(OpCode::LoadTrue);
                }
            },
            UnaryOperator::Void => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::Pop);
                self.emit(OpCode::LoadUndefined);
            }
            UnaryOperator::Minus => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::Neg);
            }
            UnaryOperator::Plus => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::ToNumber);
            }
            UnaryOperator::LogicalNot => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::Not);
            }
            UnaryOperator::BitwiseNot => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::BitNot);
            }
        }
        Ok(())
    }

    fn compile_update(&mut self, update: &'a UpdateExpression) -> Result<(), Error> {
        let step = match update.operator {
            UpdateOperator::Increment => OpCode::Add,
            UpdateOperator::Decrement => OpCode::Sub,
        };
        let one = self.builder().number_constant(1.0)?;

        match update.argument.unwrap_grouping() {
            Expression::Identifier(id) => {
                self.emit_load(&id.name)?;
                self.emit(OpCode::ToNumber);
                if !update.prefix {
                    self.emit(OpCode::Dup);
                }
                self.emit_with(OpCode::LoadConst, Operand::Constant(one));
                self.emit(step);
                self.emit_store(&id.name)?;
                if !update.prefix {
                    self.emit(OpCode::Pop);
                }
            }
            Expression::Member(member) => {
                self.compile_member_reference(member)?;
                self.emit(OpCode::Dup2);
                self.emit(OpCode::GetProperty);
                self.emit(OpCode::ToNumber);
                let old = if update.prefix {
                    None
                } else {
                    let old = self.declare_local()?;
                    self.emit(OpCode::Dup);
                    self.emit_with(OpCode::StoreLocal, Operand::Local(old));
                    Some(old)
                };
                self.emit_with(OpCode::LoadConst, Operand::Constant(one));
                self.emit(step);
                self.emit(OpCode::SetProperty);
                if let Some(old) = old {
                    self.emit(OpCode::Pop);
                    self.emit_with(OpCode::LoadLocal, Operand::Local(old));
                }
            }
            _ => return Err(invalid_target("update")),
        }
        Ok(())
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    fn compile_assignment(&mut self, assign: &'a AssignmentExpression) -> Result<(), Error> {
        match assign.target.unwrap_grouping() {
            Expression::Identifier(id) => {
                if let Some(op) = assign.operator {
                    self.emit_load(&id.name)?;
                    self.compile_expression(&assign.value)?;
                    self.emit(binary_opcode(op));
                } else {
                    self.compile_expression(&assign.value)?;
                }
                self.emit_store(&id.name)?;
            }
            Expression::Member(member) => {
                self.compile_member_reference(member)?;
                if let Some(op) = assign.operator {
                    self.emit(OpCode::Dup2);
                    self.emit(OpCode::GetProperty);
                    self.compile_expression(&assign.value)?;
                    self.emit(binary_opcode(op));
                } else {
                    self.compile_expression(&assign.value)?;
                }
                self.emit(OpCode::SetProperty);
            }
            _ => return Err(invalid_target("assignment")),
        }
        Ok(())
    }

    /// Assigns the value on top of the stack to `target`, leaving it there.
    pub(super) fn assign_stack_value(&mut self, target: &'a Expression) -> Result<(), Error> {
        match target.unwrap_grouping() {
            Expression::Identifier(id) => {
                self.emit_store(&id.name)?;
                Ok(())
            }
            Expression::Member(member) => {
                let value = self.declare_local()?;
                self.emit_with(OpCode::StoreLocal, Operand::Local(value));
                self.compile_member_reference(member)?;
                self.emit_with(OpCode::LoadLocal, Operand::Local(value));
                self.emit(OpCode::SetProperty);
                Ok(())
            }
            _ => Err(invalid_target("for-in")),
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn compile_call(&mut self, call: &'a CallExpression) -> Result<(), Error> {
        let opcode = if call.is_direct_eval() {
            OpCode::CallEval
        } else {
            OpCode::Call
        };

        // Push [callee, this].
        match call.callee.unwrap_grouping() {
            Expression::Identifier(id) => {
                match self.resolve(&id.name) {
                    Resolution::Slot { .. } => {
                        self.emit_load(&id.name)?;
                        self.emit(OpCode::LoadUndefined);
                    }
                    Resolution::Name => {
                        let key = self.builder().string_constant(&id.name)?;
                        self.emit_with(OpCode::LoadNameWithThis, Operand::Property(key));
                    }
                }
            }
            Expression::Member(member) => {
                self.compile_expression(&member.object)?;
                self.emit(OpCode::Dup);
                match &member.property {
                    MemberProperty::Named(name) => {
                        let key = self.builder().string_constant(&name.name)?;
                        self.emit_with(OpCode::LoadConst, Operand::Constant(key));
                    }
                    MemberProperty::Computed(key) => self.compile_expression(key)?,
                }
                self.emit(OpCode::GetProperty);
                self.emit(OpCode::Swap);
            }
            other => {
                self.compile_expression(other)?;
                self.emit(OpCode::LoadUndefined);
            }
        }

        let args = self.compile_arguments(&call.argument_list())?;
        let callee = self.builder().string_constant(&call.callee.describe())?;
        self.emit_with(opcode, Operand::Call { args, callee });
        Ok(())
    }

    fn compile_new(&mut self, new: &'a NewExpression) -> Result<(), Error> {
        let (constructor, arguments) = new.constructor_and_arguments();
        self.compile_expression(constructor)?;
        let args = self.compile_arguments(&arguments)?;
        self.emit_with(OpCode::New, Operand::ArgCount(args));
        Ok(())
    }

    fn compile_arguments(&mut self, arguments: &[&'a Expression]) -> Result<u16, Error> {
        for arg in arguments {
            self.compile_expression(arg)?;
        }
        u16::try_from(arguments.len()).map_err(|_| Error::RangeError("Too many arguments".into()))
    }
}

fn binary_opcode(op: BinaryOperator) -> OpCode {
    match op {
        BinaryOperator::Add => OpCode::Add,
        BinaryOperator::Subtract => OpCode::Sub,
        BinaryOperator::Multiply => OpCode::Mul,
        BinaryOperator::Divide => OpCode::Div,
        BinaryOperator::Modulo => OpCode::Mod,
        BinaryOperator::Equal => OpCode::Eq,
        BinaryOperator::NotEqual => OpCode::Ne,
        BinaryOperator::StrictEqual => OpCode::StrictEq,
        BinaryOperator::StrictNotEqual => OpCode::StrictNe,
        BinaryOperator::LessThan => OpCode::Lt,
        BinaryOperator::LessThanEqual => OpCode::Le,
        BinaryOperator::GreaterThan => OpCode::Gt,
        BinaryOperator::GreaterThanEqual => OpCode::Ge,
        BinaryOperator::BitwiseAnd => OpCode::BitAnd,
        BinaryOperator::BitwiseOr => OpCode::BitOr,
        BinaryOperator::BitwiseXor => OpCode::BitXor,
        BinaryOperator::LeftShift => OpCode::Shl,
        BinaryOperator::RightShift => OpCode::Shr,
        BinaryOperator::UnsignedRightShift => OpCode::Ushr,
        BinaryOperator::In => OpCode::In,
        BinaryOperator::InstanceOf => OpCode::InstanceOf,
    }
}

fn invalid_target(context: &str) -> Error {
    Error::SyntaxError(format!("Invalid left-hand side in {}", context))
}

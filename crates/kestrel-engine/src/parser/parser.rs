//! The main parser implementation.

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Span, Token, TokenKind};
use crate::runtime::value::number_to_string;

use super::operator::{Operator, OperatorKind, OperatorNode, precedence};

/// A precedence-climbing parser for ES3 JavaScript.
pub struct Parser<'a> {
    source: &'a str,
    scanner: Scanner<'a>,
    current: Token,
    previous: Token,
    /// Set while parsing a for-loop head, where `in` starts a for-in.
    no_in: bool,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            source,
            scanner,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            no_in: false,
        }
    }

    /// Parses the source code into a Program AST node.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    /// Parses a single statement, including any leading labels.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        let start = self.current.span;
        let kind = match &self.current.kind {
            TokenKind::Var => {
                self.advance();
                let decl = self.parse_variable_declarators()?;
                self.consume_semicolon()?;
                StatementKind::Var(decl)
            }
            TokenKind::Let | TokenKind::Const => {
                return Err(Error::SyntaxError(format!(
                    "Lexical declarations are not supported at {}; use 'var'",
                    start
                )));
            }
            TokenKind::Function => StatementKind::FunctionDeclaration(self.parse_function(true)?),
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::Switch => self.parse_switch_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Do => self.parse_do_while_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Break => {
                self.advance(); // consume 'break'
                StatementKind::Break(self.parse_jump_label()?)
            }
            TokenKind::Continue => {
                self.advance(); // consume 'continue'
                StatementKind::Continue(self.parse_jump_label()?)
            }
            TokenKind::Throw => self.parse_throw_statement()?,
            TokenKind::Try => self.parse_try_statement()?,
            TokenKind::With => self.parse_with_statement()?,
            TokenKind::Debugger => {
                self.advance();
                self.consume_semicolon()?;
                StatementKind::Empty
            }
            TokenKind::LeftBrace => StatementKind::Block(self.parse_block()?),
            TokenKind::Semicolon => {
                self.advance();
                StatementKind::Empty
            }
            _ => {
                let expr = self.parse_expression()?;

                // `ident :` introduces a label for the statement that follows.
                if let Expression::Identifier(label) = &expr {
                    if self.check(&TokenKind::Colon) {
                        self.advance();
                        let mut stmt = self.parse_statement()?;
                        if stmt.labels.contains(&label.name) {
                            return Err(Error::SyntaxError(format!(
                                "Label '{}' has already been declared",
                                label.name
                            )));
                        }
                        stmt.labels.insert(0, label.name.clone());
                        stmt.span = start.to(stmt.span);
                        return Ok(stmt);
                    }
                }

                self.consume_semicolon()?;
                StatementKind::Expression(expr)
            }
        };

        Ok(Statement::new(kind, start.to(self.previous.span)))
    }

    /// Optional label after `break` / `continue`, then the terminator.
    fn parse_jump_label(&mut self) -> Result<Option<Identifier>, Error> {
        let label = match &self.current.kind {
            TokenKind::Identifier(_) if !self.current.newline_before => {
                Some(self.expect_identifier()?)
            }
            _ => None,
        };
        self.consume_semicolon()?;
        Ok(label)
    }

    /// Parse with statement (ES3 Section 12.10).
    fn parse_with_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'with'
        self.expect(&TokenKind::LeftParen)?;
        let object = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_statement()?;
        Ok(StatementKind::With(WithStatement {
            object,
            body: Box::new(body),
        }))
    }

    /// Declarator list after `var`, without the terminator.
    fn parse_variable_declarators(&mut self) -> Result<VariableDeclaration, Error> {
        let mut declarations = Vec::new();

        loop {
            let id = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_assignment()?)
            } else {
                None
            };

            declarations.push(VariableDeclarator { id, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VariableDeclaration { declarations })
    }

    /// Parses `function name? (params) { body }`.
    fn parse_function(&mut self, require_name: bool) -> Result<FunctionNode, Error> {
        let start = self.current.span;
        self.advance(); // consume 'function'

        let id = if require_name || matches!(self.current.kind, TokenKind::Identifier(_)) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        self.expect(&TokenKind::LeftParen)?;
        let params = self.parse_parameters()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let body = self.with_in_allowed(|p| {
            let mut body = Vec::new();
            while !p.check(&TokenKind::RightBrace) && !p.is_at_end() {
                body.push(p.parse_statement()?);
            }
            Ok(body)
        })?;

        self.expect(&TokenKind::RightBrace)?;

        Ok(FunctionNode {
            id,
            params,
            body,
            span: start.to(self.previous.span),
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Identifier>, Error> {
        let mut params = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        Ok(params)
    }

    fn parse_if_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(StatementKind::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'switch'
        self.expect(&TokenKind::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::LeftBrace)?;

        let mut cases: Vec<SwitchCase> = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let test = if self.check(&TokenKind::Case) {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Colon)?;
                Some(expr)
            } else if self.check(&TokenKind::Default) {
                self.advance();
                self.expect(&TokenKind::Colon)?;
                if cases.iter().any(|case| case.test.is_none()) {
                    return Err(Error::SyntaxError(
                        "More than one default clause in switch statement".into(),
                    ));
                }
                None
            } else {
                return Err(Error::SyntaxError("Expected 'case' or 'default'".into()));
            };

            let mut consequent = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RightBrace)
                && !self.is_at_end()
            {
                consequent.push(self.parse_statement()?);
            }

            cases.push(SwitchCase { test, consequent });
        }

        self.expect(&TokenKind::RightBrace)?;

        Ok(StatementKind::Switch(SwitchStatement {
            discriminant,
            cases,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(StatementKind::Loop(LoopStatement {
            kind: LoopKind::While,
            head: LoopHead::Counted {
                init: None,
                condition: Some(test),
                increment: None,
            },
            body,
        }))
    }

    fn parse_do_while_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'do'
        let body = Box::new(self.parse_statement()?);
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let test = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        // The semicolon after do-while is always optional.
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }

        Ok(StatementKind::Loop(LoopStatement {
            kind: LoopKind::DoWhile,
            head: LoopHead::Counted {
                init: None,
                condition: Some(test),
                increment: None,
            },
            body,
        }))
    }

    fn parse_for_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        let init = match &self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Let | TokenKind::Const => {
                return Err(Error::SyntaxError(
                    "Lexical declarations are not supported; use 'var'".into(),
                ));
            }
            TokenKind::Var => {
                self.advance();
                let mut decl = self.without_in(|p| p.parse_variable_declarators())?;

                if decl.declarations.len() == 1 && self.check(&TokenKind::In) {
                    if let Some(declarator) = decl.declarations.pop() {
                        return self.parse_for_in_rest(ForInTarget::Declaration(declarator));
                    }
                }
                Some(ForInit::Declaration(decl))
            }
            _ => {
                let expr = self.without_in(|p| p.parse_expression())?;

                if self.check(&TokenKind::In) {
                    if !expr.is_reference() {
                        return Err(Error::SyntaxError(
                            "Invalid left-hand side in for-in loop".into(),
                        ));
                    }
                    return self.parse_for_in_rest(ForInTarget::Expression(expr));
                }
                Some(ForInit::Expression(expr))
            }
        };

        self.expect(&TokenKind::Semicolon)?;
        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let increment = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(StatementKind::Loop(LoopStatement {
            kind: LoopKind::For,
            head: LoopHead::Counted {
                init,
                condition,
                increment,
            },
            body,
        }))
    }

    /// Everything after the target of `for (target in ...`.
    fn parse_for_in_rest(&mut self, target: ForInTarget) -> Result<StatementKind, Error> {
        self.expect(&TokenKind::In)?;
        let object = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(StatementKind::Loop(LoopStatement {
            kind: LoopKind::ForIn,
            head: LoopHead::Enumerate { target, object },
            body,
        }))
    }

    fn parse_throw_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'throw'
        if self.current.newline_before {
            return Err(Error::SyntaxError("Illegal newline after throw".into()));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(StatementKind::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'try'
        let block = self.parse_block()?;

        let handler = if self.check(&TokenKind::Catch) {
            self.advance();
            self.expect(&TokenKind::LeftParen)?;
            let param = self.expect_identifier()?;
            self.expect(&TokenKind::RightParen)?;
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(Error::SyntaxError(
                "Missing catch or finally after try".into(),
            ));
        }

        Ok(StatementKind::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_block(&mut self) -> Result<BlockStatement, Error> {
        self.expect(&TokenKind::LeftBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;
        Ok(BlockStatement { body })
    }

    fn parse_return_statement(&mut self) -> Result<StatementKind, Error> {
        self.advance(); // consume 'return'
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(StatementKind::Return(argument))
    }

    // Expressions

    /// Parses a full expression, including the comma operator.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_operator_expression(precedence::COMMA)
    }

    /// Parses an expression that cannot contain a top-level comma.
    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        self.parse_operator_expression(precedence::ASSIGNMENT)
    }

    /// Precedence climbing over the infix operator table.
    ///
    /// Only operators whose primary precedence is at least `min_precedence`
    /// are folded into the result; the right operand is parsed with the
    /// operator's secondary tier, the third operand of `?:` with its tertiary.
    fn parse_operator_expression(&mut self, min_precedence: u8) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;

        while let Some(operator) = Operator::infix(&self.current.kind) {
            if operator.primary < min_precedence {
                break;
            }
            if self.no_in && operator.kind == OperatorKind::Binary(BinaryOperator::In) {
                break;
            }
            self.advance();

            let mut node = OperatorNode::new(operator);
            node.push(left)?;

            if operator.kind == OperatorKind::Conditional {
                let consequent =
                    self.with_in_allowed(|p| p.parse_operator_expression(operator.secondary))?;
                node.push(consequent)?;
                self.expect(&TokenKind::Colon)?;
                node.see_second_token();
                node.push(self.parse_operator_expression(operator.tertiary)?)?;
            } else {
                node.push(self.parse_operator_expression(operator.secondary)?)?;
            }

            left = node.finish()?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        if let Some(operator) = Operator::prefix(&self.current.kind) {
            self.advance();
            let mut node = OperatorNode::new(operator);
            node.push(self.parse_unary()?)?;
            return node.finish();
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let operand = self.parse_left_hand_side()?;

        let update = match self.current.kind {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return Ok(operand),
        };
        // A line break before ++/-- ends the expression.
        if self.current.newline_before {
            return Ok(operand);
        }
        self.advance();

        let mut node = OperatorNode::new(Operator::postfix_update(update));
        node.push(operand)?;
        node.finish()
    }

    /// Member access, calls and `new`.
    fn parse_left_hand_side(&mut self) -> Result<Expression, Error> {
        let (mut expr, binding) = if self.check(&TokenKind::New) {
            let node = self.parse_new()?;
            let binding = node.effective_precedence();
            (node.finish()?, binding)
        } else {
            (self.parse_primary()?, precedence::MAX)
        };

        // `new f` without an argument list cannot be the base of a call or member.
        if binding < precedence::MEMBER {
            return Ok(expr);
        }

        loop {
            expr = match self.current.kind {
                TokenKind::Dot | TokenKind::LeftBracket => self.parse_member_suffix(expr)?,
                TokenKind::LeftParen => self.parse_call_suffix(expr)?,
                _ => break,
            };
        }

        Ok(expr)
    }

    /// Builds the `new` node: constructor member chain plus an optional
    /// argument list, which becomes a call operand.
    fn parse_new(&mut self) -> Result<OperatorNode, Error> {
        self.advance(); // consume 'new'

        let mut target = if self.check(&TokenKind::New) {
            self.parse_new()?.finish()?
        } else {
            self.parse_primary()?
        };

        while matches!(self.current.kind, TokenKind::Dot | TokenKind::LeftBracket) {
            target = self.parse_member_suffix(target)?;
        }

        if self.check(&TokenKind::LeftParen) {
            target = self.parse_call_suffix(target)?;
        }

        let mut node = OperatorNode::new(Operator::new_expression());
        node.push(target)?;
        Ok(node)
    }

    fn parse_member_suffix(&mut self, object: Expression) -> Result<Expression, Error> {
        if self.check(&TokenKind::Dot) {
            self.advance();
            let mut node = OperatorNode::new(Operator::member());
            node.push(object)?;
            let name = self.expect_property_name()?;
            node.push(Expression::Identifier(name))?;
            return node.finish();
        }

        self.expect(&TokenKind::LeftBracket)?;
        let mut node = OperatorNode::new(Operator::index());
        node.push(object)?;
        node.push(self.with_in_allowed(|p| p.parse_expression())?)?;
        self.expect(&TokenKind::RightBracket)?;
        node.see_second_token();
        node.finish()
    }

    /// `callee( ... )`; the argument list is kept as one comma expression.
    fn parse_call_suffix(&mut self, callee: Expression) -> Result<Expression, Error> {
        self.expect(&TokenKind::LeftParen)?;

        let mut node = if self.check(&TokenKind::RightParen) {
            let mut node = OperatorNode::new(Operator::function_call(false));
            node.push(callee)?;
            node
        } else {
            let mut node = OperatorNode::new(Operator::function_call(true));
            node.push(callee)?;
            node.push(self.with_in_allowed(|p| p.parse_expression())?)?;
            node
        };

        self.expect(&TokenKind::RightParen)?;
        node.see_second_token();
        node.finish()
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let token = self.current.clone();
        let expr = match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Expression::Literal(Literal::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Expression::Literal(Literal::String(s))
            }
            TokenKind::True => {
                self.advance();
                Expression::Literal(Literal::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Expression::Literal(Literal::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Expression::Literal(Literal::Null)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Expression::Identifier(Identifier::new(name, token.span))
            }
            TokenKind::This => {
                self.advance();
                Expression::This
            }
            TokenKind::LeftParen => {
                self.advance();
                let mut node = OperatorNode::new(Operator::grouping());
                node.push(self.with_in_allowed(|p| p.parse_expression())?)?;
                self.expect(&TokenKind::RightParen)?;
                node.see_second_token();
                node.finish()?
            }
            TokenKind::LeftBracket => self.parse_array_literal()?,
            TokenKind::LeftBrace => self.parse_object_literal()?,
            TokenKind::Function => Expression::Function(Box::new(self.parse_function(false)?)),
            TokenKind::Invalid(message) => {
                return Err(Error::SyntaxError(format!("{} at {}", message, token.span)));
            }
            other => {
                return Err(Error::SyntaxError(format!(
                    "Unexpected token {:?} at {}",
                    other, token.span
                )));
            }
        };
        Ok(expr)
    }

    fn parse_array_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '['
        let mut elements = Vec::new();

        self.with_in_allowed(|p| {
            while !p.check(&TokenKind::RightBracket) && !p.is_at_end() {
                if p.check(&TokenKind::Comma) {
                    p.advance();
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_assignment()?));
                if !p.check(&TokenKind::RightBracket) {
                    p.expect(&TokenKind::Comma)?;
                }
            }
            Ok(())
        })?;

        self.expect(&TokenKind::RightBracket)?;
        Ok(Expression::Array(ArrayExpression { elements }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        self.with_in_allowed(|p| {
            while !p.check(&TokenKind::RightBrace) && !p.is_at_end() {
                let key = match &p.current.kind {
                    TokenKind::String(s) => {
                        let key = s.clone();
                        p.advance();
                        key
                    }
                    TokenKind::Number(n) => {
                        let key = number_to_string(*n);
                        p.advance();
                        key
                    }
                    _ => p.expect_property_name()?.name,
                };
                p.expect(&TokenKind::Colon)?;
                let value = p.parse_assignment()?;
                properties.push(Property { key, value });

                if !p.check(&TokenKind::RightBrace) {
                    p.expect(&TokenKind::Comma)?;
                }
            }
            Ok(())
        })?;

        self.expect(&TokenKind::RightBrace)?;
        Ok(Expression::Object(ObjectExpression { properties }))
    }

    // Helper methods

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.scanner.next_token());
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(Error::SyntaxError(format!(
                "Expected {:?}, found {:?} at {}",
                kind, self.current.kind, self.current.span
            )))
        }
    }

    /// Accepts `;`, or inserts one before `}`, end of input or a line break.
    fn consume_semicolon(&mut self) -> Result<(), Error> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Ok(());
        }
        if self.check(&TokenKind::RightBrace) || self.is_at_end() || self.current.newline_before {
            return Ok(());
        }
        Err(Error::SyntaxError(format!(
            "Expected ';', found {:?} at {}",
            self.current.kind, self.current.span
        )))
    }

    fn expect_identifier(&mut self) -> Result<Identifier, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let id = Identifier::new(name.clone(), self.current.span);
            self.advance();
            Ok(id)
        } else {
            Err(Error::SyntaxError(format!(
                "Expected identifier, found {:?} at {}",
                self.current.kind, self.current.span
            )))
        }
    }

    /// Identifier or reserved word, as allowed after `.` and as object keys.
    fn expect_property_name(&mut self) -> Result<Identifier, Error> {
        let span = self.current.span;
        if self.current.kind.is_keyword()
            || matches!(
                self.current.kind,
                TokenKind::True | TokenKind::False | TokenKind::Null
            )
        {
            let name = self.source.get(span.start..span.end).unwrap_or_default();
            self.advance();
            return Ok(Identifier::new(name, span));
        }
        self.expect_identifier()
    }

    fn with_in_allowed<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn without_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        let saved = std::mem::replace(&mut self.no_in, true);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to parse and get first statement
    fn parse_stmt(src: &str) -> Statement {
        let mut parser = Parser::new(src);
        let program = parser.parse_program().unwrap();
        program.body.into_iter().next().unwrap()
    }

    fn parse_expr(src: &str) -> Expression {
        match parse_stmt(src).kind {
            StatementKind::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    // Helper to parse and check it succeeds
    fn parse_ok(src: &str) -> Program {
        let mut parser = Parser::new(src);
        parser.parse_program().unwrap()
    }

    // Helper to parse and check it fails
    fn parse_err(src: &str) -> Error {
        let mut parser = Parser::new(src);
        parser.parse_program().unwrap_err()
    }

    #[test]
    fn test_parse_variable_declaration() {
        match parse_stmt("var a = 1, b;").kind {
            StatementKind::Var(decl) => {
                assert_eq!(decl.declarations.len(), 2);
                assert!(decl.declarations[1].init.is_none());
            }
            other => panic!("expected var, got {:?}", other),
        }
    }

    #[test]
    fn test_let_and_const_rejected() {
        assert!(matches!(parse_err("let y = 2;"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("const z = 3;"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("for (let i = 0;;) {}"), Error::SyntaxError(_)));
    }

    #[test]
    fn test_parse_function_declaration() {
        match parse_stmt("function add(a, b) { return a + b; }").kind {
            StatementKind::FunctionDeclaration(func) => {
                assert_eq!(func.id.map(|id| id.name), Some("add".to_string()));
                assert_eq!(func.params.len(), 2);
                assert_eq!(func.body.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_operator_precedence() {
        match parse_expr("1 + 2 * 3;") {
            Expression::Binary(bin) => {
                assert_eq!(bin.operator, BinaryOperator::Add);
                assert!(matches!(*bin.right, Expression::Binary(_)));
            }
            other => panic!("expected binary, got {:?}", other),
        }

        match parse_expr("a - b - c;") {
            Expression::Binary(bin) => assert!(matches!(*bin.left, Expression::Binary(_))),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match parse_expr("a = b = c;") {
            Expression::Assignment(assign) => {
                assert!(matches!(*assign.value, Expression::Assignment(_)))
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ternary_operator() {
        match parse_expr("a ? b : c ? d : e;") {
            Expression::Conditional(cond) => {
                assert!(matches!(*cond.alternate, Expression::Conditional(_)))
            }
            other => panic!("expected conditional, got {:?}", other),
        }
        assert!(parse_ok("x = a ? b = 1 : c = 2;").body.len() == 1);
        assert!(matches!(parse_err("a ? b;"), Error::SyntaxError(_)));
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(matches!(parse_err("a + b = c;"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("f() = 1;"), Error::SyntaxError(_)));
        assert!(matches!(parse_err("1++;"), Error::SyntaxError(_)));
        parse_ok("(a) = 1;");
    }

    #[test]
    fn test_call_arguments_kept_as_one_operand() {
        match parse_expr("f(a, b, c);") {
            Expression::Call(call) => assert_eq!(call.argument_list().len(), 3),
            other => panic!("expected call, got {:?}", other),
        }
        match parse_expr("f((a, b), c);") {
            Expression::Call(call) => assert_eq!(call.argument_list().len(), 2),
            other => panic!("expected call, got {:?}", other),
        }
        match parse_expr("f();") {
            Expression::Call(call) => assert!(call.arguments.is_none()),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_new_with_arguments_binds_tighter_than_member() {
        // new f().m()  ==  (new f()).m()
        match parse_expr("new f().m();") {
            Expression::Call(call) => match *call.callee {
                Expression::Member(member) => {
                    assert!(matches!(*member.object, Expression::New(_)))
                }
                other => panic!("expected member callee, got {:?}", other),
            },
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_new_of_parenthesized_call_constructs_member() {
        // new (f()).m()  constructs f().m
        match parse_expr("new (f()).m();") {
            Expression::New(new) => match *new.operand {
                Expression::Call(call) => match *call.callee {
                    Expression::Member(member) => {
                        assert!(matches!(*member.object, Expression::Grouping(_)))
                    }
                    other => panic!("expected member, got {:?}", other),
                },
                other => panic!("expected call operand, got {:?}", other),
            },
            other => panic!("expected new, got {:?}", other),
        }
    }

    #[test]
    fn test_new_without_arguments() {
        match parse_expr("new F;") {
            Expression::New(new) => assert!(matches!(*new.operand, Expression::Identifier(_))),
            other => panic!("expected new, got {:?}", other),
        }
    }

    #[test]
    fn test_grouping_retained() {
        assert!(matches!(parse_expr("(a);"), Expression::Grouping(_)));
    }

    #[test]
    fn test_parse_loops() {
        for src in [
            "for (var i = 0; i < 10; i++) { }",
            "for (;;) break;",
            "while (x) x--;",
            "do { x++; } while (x < 10)",
            "for (var k in o) {}",
            "for (o.k in p) {}",
        ] {
            assert!(parse_stmt(src).is_loop(), "{}", src);
        }
    }

    #[test]
    fn test_for_in_heads() {
        match parse_stmt("for (var k = 0 in o) ;").kind {
            StatementKind::Loop(stmt) => {
                assert_eq!(stmt.kind, LoopKind::ForIn);
                assert!(matches!(
                    stmt.head,
                    LoopHead::Enumerate {
                        target: ForInTarget::Declaration(_),
                        ..
                    }
                ));
            }
            other => panic!("expected loop, got {:?}", other),
        }
        // `in` inside parentheses is an operator even in the init clause
        match parse_stmt("for (var b = ('x' in o); b; b = false) ;").kind {
            StatementKind::Loop(stmt) => assert_eq!(stmt.kind, LoopKind::For),
            other => panic!("expected loop, got {:?}", other),
        }
        assert!(parse_err("for (f() in o) ;").to_string().contains("for-in"));
    }

    #[test]
    fn test_labels_collected_outermost_first() {
        let stmt = parse_stmt("a: b: while (true) break a;");
        assert_eq!(stmt.labels, vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(parse_err("a: a: ;"), Error::SyntaxError(_)));
    }

    #[test]
    fn test_parse_switch_statement() {
        parse_ok("switch (x) { case 1: break; case 2: y = 2; break; default: z = 0; }");
        assert!(matches!(
            parse_err("switch (x) { default: ; default: ; }"),
            Error::SyntaxError(_)
        ));
    }

    #[test]
    fn test_parse_try_catch_finally() {
        parse_ok("try { x = 1; } catch (e) { }");
        parse_ok("try { } finally { cleanup(); }");
        parse_ok("try { } catch (e) { } finally { }");
        assert!(matches!(parse_err("try { }"), Error::SyntaxError(_)));
    }

    #[test]
    fn test_automatic_semicolon_insertion() {
        assert_eq!(parse_ok("a = 1\nb = 2").body.len(), 2);
        assert_eq!(parse_ok("{ a = 1 }").body.len(), 1);
        assert!(matches!(parse_err("a = 1 b = 2"), Error::SyntaxError(_)));
    }

    #[test]
    fn test_return_line_break_ends_statement() {
        let program = parse_ok("function f() { return\n1; }");
        match &program.body[0].kind {
            StatementKind::FunctionDeclaration(func) => {
                assert!(matches!(func.body[0].kind, StatementKind::Return(None)));
                assert_eq!(func.body.len(), 2);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_after_line_break_is_prefix_of_next() {
        let program = parse_ok("a\n++b");
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_object_literal_keys() {
        match parse_expr("({a: 1, 'b c': 2, 3: 3, default: 4});") {
            Expression::Grouping(inner) => match *inner {
                Expression::Object(obj) => {
                    let keys: Vec<_> = obj.properties.iter().map(|p| p.key.as_str()).collect();
                    assert_eq!(keys, vec!["a", "b c", "3", "default"]);
                }
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected grouping, got {:?}", other),
        }
    }

    #[test]
    fn test_array_holes() {
        match parse_expr("[1, , 3];") {
            Expression::Array(arr) => {
                assert_eq!(arr.elements.len(), 3);
                assert!(arr.elements[1].is_none());
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_member_names() {
        match parse_expr("a.default;") {
            Expression::Member(member) => match member.property {
                MemberProperty::Named(name) => assert_eq!(name.name, "default"),
                other => panic!("expected named property, got {:?}", other),
            },
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_program() {
        assert!(parse_ok("").body.is_empty());
    }
}

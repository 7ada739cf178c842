//! Operator table and the incremental operand builder.
//!
//! Every composite expression the parser produces goes through an
//! [`OperatorNode`]: the parser looks up the [`Operator`] for the token it
//! just consumed, pushes operands as it parses them, and calls
//! [`OperatorNode::finish`] to obtain the AST node. The builder enforces the
//! operator's arity and the presence of any required closing token.
//!
//! ## Precedence tiers
//!
//! | Tier | Meaning |
//! |------|---------|
//! | `primary` | binding power of the operator itself |
//! | `secondary` | minimum precedence accepted for the right operand |
//! | `tertiary` | minimum precedence for the third operand (`?:` only) |
//!
//! Left-associative binary operators use `secondary = primary + 1`,
//! right-associative ones (assignment) use `secondary = primary`.

use bitflags::bitflags;

use crate::Error;
use crate::ast::*;

bitflags! {
    /// Which operand positions an operator fills.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OperatorFlags: u8 {
        /// Takes an operand to the left of the operator token
        const HAS_LHS_OPERAND = 1 << 0;
        /// Takes an operand to the right of the operator token
        const HAS_RHS_OPERAND = 1 << 1;
        /// Takes a second right operand after a separating token (`?:`)
        const HAS_SECONDARY_RHS_OPERAND = 1 << 2;
        /// Must see a closing or separating token before it is complete
        const HAS_CLOSING_TOKEN = 1 << 3;
    }
}

/// What an operator builds once complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    /// `( expr )`
    Grouping,
    /// `callee( args )`
    FunctionCall,
    /// `object.name`
    Member,
    /// `object[ key ]`
    Index,
    /// `new operand`
    New,
    /// `=` or a compound assignment
    Assignment(Option<BinaryOperator>),
    /// `test ? a : b`
    Conditional,
    /// `a, b`
    Comma,
    /// Prefix unary operator
    Unary(UnaryOperator),
    /// `++x` / `--x`
    PrefixUpdate(UpdateOperator),
    /// `x++` / `x--`
    PostfixUpdate(UpdateOperator),
    /// Arithmetic, relational, equality, bitwise
    Binary(BinaryOperator),
    /// `&&` / `||`
    Logical(LogicalOperator),
}

/// Precedence levels, higher binds tighter.
pub mod precedence {
    /// `,`
    pub const COMMA: u8 = 1;
    /// `=` and compound assignments
    pub const ASSIGNMENT: u8 = 2;
    /// `?:`
    pub const CONDITIONAL: u8 = 3;
    /// `||`
    pub const LOGICAL_OR: u8 = 4;
    /// `&&`
    pub const LOGICAL_AND: u8 = 5;
    /// `|`
    pub const BITWISE_OR: u8 = 6;
    /// `^`
    pub const BITWISE_XOR: u8 = 7;
    /// `&`
    pub const BITWISE_AND: u8 = 8;
    /// `==` `!=` `===` `!==`
    pub const EQUALITY: u8 = 9;
    /// `<` `>` `<=` `>=` `in` `instanceof`
    pub const RELATIONAL: u8 = 10;
    /// `<<` `>>` `>>>`
    pub const SHIFT: u8 = 11;
    /// `+` `-`
    pub const ADDITIVE: u8 = 12;
    /// `*` `/` `%`
    pub const MULTIPLICATIVE: u8 = 13;
    /// prefix operators
    pub const UNARY: u8 = 14;
    /// postfix `++` `--`
    pub const POSTFIX: u8 = 15;
    /// `new` without an argument list
    pub const NEW: u8 = 16;
    /// `.` `[]` `()`
    pub const MEMBER: u8 = 17;
    /// grouping and `new f(...)`
    pub const MAX: u8 = u8::MAX;
}

/// Static description of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    /// What the operator builds
    pub kind: OperatorKind,
    /// Number of operands
    pub arity: usize,
    /// Binding power of the operator
    pub primary: u8,
    /// Minimum precedence of the right operand
    pub secondary: u8,
    /// Minimum precedence of the third operand
    pub tertiary: u8,
    /// Operand positions
    pub flags: OperatorFlags,
}

impl Operator {
    const fn new(kind: OperatorKind, arity: usize, primary: u8, flags: OperatorFlags) -> Self {
        Self {
            kind,
            arity,
            primary,
            secondary: primary,
            tertiary: primary,
            flags,
        }
    }

    const fn left_binary(kind: OperatorKind, primary: u8) -> Self {
        let mut op = Self::new(
            kind,
            2,
            primary,
            OperatorFlags::HAS_LHS_OPERAND.union(OperatorFlags::HAS_RHS_OPERAND),
        );
        op.secondary = primary + 1;
        op.tertiary = primary + 1;
        op
    }

    /// `( expr )`
    pub const fn grouping() -> Self {
        Self::new(
            OperatorKind::Grouping,
            1,
            precedence::MAX,
            OperatorFlags::HAS_RHS_OPERAND.union(OperatorFlags::HAS_CLOSING_TOKEN),
        )
    }

    /// A call, with or without an argument operand.
    pub const fn function_call(has_arguments: bool) -> Self {
        let flags = OperatorFlags::HAS_LHS_OPERAND.union(OperatorFlags::HAS_CLOSING_TOKEN);
        if has_arguments {
            Self::new(
                OperatorKind::FunctionCall,
                2,
                precedence::MEMBER,
                flags.union(OperatorFlags::HAS_RHS_OPERAND),
            )
        } else {
            Self::new(OperatorKind::FunctionCall, 1, precedence::MEMBER, flags)
        }
    }

    /// `object.name`
    pub const fn member() -> Self {
        Self::new(
            OperatorKind::Member,
            2,
            precedence::MEMBER,
            OperatorFlags::HAS_LHS_OPERAND.union(OperatorFlags::HAS_RHS_OPERAND),
        )
    }

    /// `object[key]`
    pub const fn index() -> Self {
        Self::new(
            OperatorKind::Index,
            2,
            precedence::MEMBER,
            OperatorFlags::HAS_LHS_OPERAND
                .union(OperatorFlags::HAS_RHS_OPERAND)
                .union(OperatorFlags::HAS_CLOSING_TOKEN),
        )
    }

    /// `new operand`
    pub const fn new_expression() -> Self {
        Self::new(
            OperatorKind::New,
            1,
            precedence::NEW,
            OperatorFlags::HAS_RHS_OPERAND,
        )
    }

    /// `test ? consequent : alternate`
    pub const fn conditional() -> Self {
        Self {
            kind: OperatorKind::Conditional,
            arity: 3,
            primary: precedence::CONDITIONAL,
            secondary: precedence::ASSIGNMENT,
            tertiary: precedence::ASSIGNMENT,
            flags: OperatorFlags::HAS_LHS_OPERAND
                .union(OperatorFlags::HAS_RHS_OPERAND)
                .union(OperatorFlags::HAS_SECONDARY_RHS_OPERAND)
                .union(OperatorFlags::HAS_CLOSING_TOKEN),
        }
    }

    /// A prefix unary operator.
    pub const fn unary(operator: UnaryOperator) -> Self {
        Self::new(
            OperatorKind::Unary(operator),
            1,
            precedence::UNARY,
            OperatorFlags::HAS_RHS_OPERAND,
        )
    }

    /// `++x` / `--x`
    pub const fn prefix_update(operator: UpdateOperator) -> Self {
        Self::new(
            OperatorKind::PrefixUpdate(operator),
            1,
            precedence::UNARY,
            OperatorFlags::HAS_RHS_OPERAND,
        )
    }

    /// `x++` / `x--`
    pub const fn postfix_update(operator: UpdateOperator) -> Self {
        Self::new(
            OperatorKind::PostfixUpdate(operator),
            1,
            precedence::POSTFIX,
            OperatorFlags::HAS_LHS_OPERAND,
        )
    }

    /// Looks up the infix operator a token introduces, if any.
    ///
    /// Covers binary, logical, assignment, comma and the conditional operator.
    pub fn infix(token: &crate::lexer::TokenKind) -> Option<Operator> {
        use crate::lexer::TokenKind as T;
        use BinaryOperator as B;

        let binary = |op: B, level: u8| Operator::left_binary(OperatorKind::Binary(op), level);
        let assign = |op: Option<B>| {
            Operator::new(
                OperatorKind::Assignment(op),
                2,
                precedence::ASSIGNMENT,
                OperatorFlags::HAS_LHS_OPERAND.union(OperatorFlags::HAS_RHS_OPERAND),
            )
        };

        let op = match token {
            T::Comma => Operator::left_binary(OperatorKind::Comma, precedence::COMMA),
            T::Question => Operator::conditional(),
            T::PipePipe => Operator::left_binary(
                OperatorKind::Logical(LogicalOperator::Or),
                precedence::LOGICAL_OR,
            ),
            T::AmpersandAmpersand => Operator::left_binary(
                OperatorKind::Logical(LogicalOperator::And),
                precedence::LOGICAL_AND,
            ),
            T::Pipe => binary(B::BitwiseOr, precedence::BITWISE_OR),
            T::Caret => binary(B::BitwiseXor, precedence::BITWISE_XOR),
            T::Ampersand => binary(B::BitwiseAnd, precedence::BITWISE_AND),
            T::EqualEqual => binary(B::Equal, precedence::EQUALITY),
            T::NotEqual => binary(B::NotEqual, precedence::EQUALITY),
            T::StrictEqual => binary(B::StrictEqual, precedence::EQUALITY),
            T::StrictNotEqual => binary(B::StrictNotEqual, precedence::EQUALITY),
            T::LessThan => binary(B::LessThan, precedence::RELATIONAL),
            T::LessThanEqual => binary(B::LessThanEqual, precedence::RELATIONAL),
            T::GreaterThan => binary(B::GreaterThan, precedence::RELATIONAL),
            T::GreaterThanEqual => binary(B::GreaterThanEqual, precedence::RELATIONAL),
            T::In => binary(B::In, precedence::RELATIONAL),
            T::Instanceof => binary(B::InstanceOf, precedence::RELATIONAL),
            T::LeftShift => binary(B::LeftShift, precedence::SHIFT),
            T::RightShift => binary(B::RightShift, precedence::SHIFT),
            T::UnsignedRightShift => binary(B::UnsignedRightShift, precedence::SHIFT),
            T::Plus => binary(B::Add, precedence::ADDITIVE),
            T::Minus => binary(B::Subtract, precedence::ADDITIVE),
            T::Star => binary(B::Multiply, precedence::MULTIPLICATIVE),
            T::Slash => binary(B::Divide, precedence::MULTIPLICATIVE),
            T::Percent => binary(B::Modulo, precedence::MULTIPLICATIVE),
            T::Equal => assign(None),
            T::PlusEqual => assign(Some(B::Add)),
            T::MinusEqual => assign(Some(B::Subtract)),
            T::StarEqual => assign(Some(B::Multiply)),
            T::SlashEqual => assign(Some(B::Divide)),
            T::PercentEqual => assign(Some(B::Modulo)),
            T::LeftShiftEqual => assign(Some(B::LeftShift)),
            T::RightShiftEqual => assign(Some(B::RightShift)),
            T::UnsignedRightShiftEqual => assign(Some(B::UnsignedRightShift)),
            T::AmpersandEqual => assign(Some(B::BitwiseAnd)),
            T::PipeEqual => assign(Some(B::BitwiseOr)),
            T::CaretEqual => assign(Some(B::BitwiseXor)),
            _ => return None,
        };
        Some(op)
    }

    /// Looks up the prefix operator a token introduces, if any.
    pub fn prefix(token: &crate::lexer::TokenKind) -> Option<Operator> {
        use crate::lexer::TokenKind as T;

        let op = match token {
            T::Minus => Operator::unary(UnaryOperator::Minus),
            T::Plus => Operator::unary(UnaryOperator::Plus),
            T::Bang => Operator::unary(UnaryOperator::LogicalNot),
            T::Tilde => Operator::unary(UnaryOperator::BitwiseNot),
            T::Typeof => Operator::unary(UnaryOperator::Typeof),
            T::Void => Operator::unary(UnaryOperator::Void),
            T::Delete => Operator::unary(UnaryOperator::Delete),
            T::PlusPlus => Operator::prefix_update(UpdateOperator::Increment),
            T::MinusMinus => Operator::prefix_update(UpdateOperator::Decrement),
            _ => return None,
        };
        Some(op)
    }

    /// Number of operands that come before the separating token.
    fn operands_before_second_token(&self) -> usize {
        match self.kind {
            OperatorKind::Conditional => 2,
            _ => self.arity,
        }
    }
}

/// An operator under construction.
#[derive(Debug, Clone)]
pub struct OperatorNode {
    operator: Operator,
    operands: Vec<Expression>,
    second_token_seen: bool,
}

impl OperatorNode {
    /// Starts building a node for `operator`.
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            operands: Vec::with_capacity(operator.arity),
            second_token_seen: false,
        }
    }

    /// The operator being built.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Number of operands pushed so far.
    pub fn filled(&self) -> usize {
        self.operands.len()
    }

    /// Appends the next operand.
    pub fn push(&mut self, operand: Expression) -> Result<(), Error> {
        if !self.accepting_operands() {
            return Err(Error::SyntaxError(format!(
                "Unexpected operand for {:?}",
                self.operator.kind
            )));
        }
        self.operands.push(operand);
        Ok(())
    }

    /// Removes and returns the last operand.
    pub fn pop(&mut self) -> Option<Expression> {
        self.operands.pop()
    }

    /// Records the closing or separating token (`)`, `]`, or the `:` of `?:`).
    pub fn see_second_token(&mut self) {
        self.second_token_seen = true;
    }

    /// Operand `index` with any grouping parentheses removed.
    pub fn operand(&self, index: usize) -> Option<&Expression> {
        self.operands.get(index).map(Expression::unwrap_grouping)
    }

    /// Operand `index` exactly as it was pushed.
    pub fn raw_operand(&self, index: usize) -> Option<&Expression> {
        self.operands.get(index)
    }

    /// Whether another operand may be pushed.
    pub fn accepting_operands(&self) -> bool {
        let filled = self.operands.len();
        if filled >= self.operator.arity {
            return false;
        }
        if self.operator.flags.contains(OperatorFlags::HAS_SECONDARY_RHS_OPERAND)
            && filled >= self.operator.operands_before_second_token()
        {
            return self.second_token_seen;
        }
        true
    }

    /// Precedence this node binds with once complete.
    ///
    /// A `new` whose single raw operand is a call binds as tightly as
    /// possible, so member access and calls that follow apply to the
    /// constructed object. A parenthesized call does not qualify.
    pub fn effective_precedence(&self) -> u8 {
        if self.operator.kind == OperatorKind::New
            && self.operands.len() == 1
            && matches!(self.raw_operand(0), Some(Expression::Call(_)))
        {
            return precedence::MAX;
        }
        self.operator.primary
    }

    /// Verifies the node is complete.
    pub fn check_valid(&self) -> Result<(), Error> {
        if self.operands.len() != self.operator.arity {
            return Err(Error::SyntaxError(format!(
                "{:?} expects {} operand(s), found {}",
                self.operator.kind,
                self.operator.arity,
                self.operands.len()
            )));
        }
        if self.operator.flags.contains(OperatorFlags::HAS_CLOSING_TOKEN) && !self.second_token_seen
        {
            return Err(Error::SyntaxError(format!(
                "Missing closing token for {:?}",
                self.operator.kind
            )));
        }
        Ok(())
    }

    /// Validates the node and converts it into an AST expression.
    pub fn finish(mut self) -> Result<Expression, Error> {
        self.check_valid()?;

        let expr = match self.operator.kind {
            OperatorKind::Grouping => Expression::Grouping(Box::new(self.take_last()?)),
            OperatorKind::FunctionCall => {
                let arguments = if self.operator.arity == 2 {
                    Some(Box::new(self.take_last()?))
                } else {
                    None
                };
                Expression::Call(CallExpression {
                    callee: Box::new(self.take_last()?),
                    arguments,
                })
            }
            OperatorKind::Member => {
                let name = match self.take_last()? {
                    Expression::Identifier(id) => id,
                    other => {
                        return Err(Error::SyntaxError(format!(
                            "Expected property name, found {}",
                            other.describe()
                        )));
                    }
                };
                Expression::Member(MemberExpression {
                    object: Box::new(self.take_last()?),
                    property: MemberProperty::Named(name),
                })
            }
            OperatorKind::Index => {
                let key = self.take_last()?;
                Expression::Member(MemberExpression {
                    object: Box::new(self.take_last()?),
                    property: MemberProperty::Computed(Box::new(key)),
                })
            }
            OperatorKind::New => Expression::New(NewExpression {
                operand: Box::new(self.take_last()?),
            }),
            OperatorKind::Assignment(operator) => {
                self.require_reference(0, "assignment")?;
                let value = self.take_last()?;
                Expression::Assignment(AssignmentExpression {
                    operator,
                    target: Box::new(self.take_last()?),
                    value: Box::new(value),
                })
            }
            OperatorKind::Conditional => {
                let alternate = self.take_last()?;
                let consequent = self.take_last()?;
                Expression::Conditional(ConditionalExpression {
                    test: Box::new(self.take_last()?),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                })
            }
            OperatorKind::Comma => {
                let right = self.take_last()?;
                let mut expressions = match self.take_last()? {
                    // A raw (unparenthesized) list keeps growing; `(a, b), c` has two elements.
                    Expression::Sequence(seq) => seq.expressions,
                    left => vec![left],
                };
                expressions.push(right);
                Expression::Sequence(SequenceExpression { expressions })
            }
            OperatorKind::Unary(operator) => Expression::Unary(UnaryExpression {
                operator,
                argument: Box::new(self.take_last()?),
            }),
            OperatorKind::PrefixUpdate(operator) | OperatorKind::PostfixUpdate(operator) => {
                self.require_reference(0, "update")?;
                Expression::Update(UpdateExpression {
                    operator,
                    argument: Box::new(self.take_last()?),
                    prefix: matches!(self.operator.kind, OperatorKind::PrefixUpdate(_)),
                })
            }
            OperatorKind::Binary(operator) => {
                let right = self.take_last()?;
                Expression::Binary(BinaryExpression {
                    operator,
                    left: Box::new(self.take_last()?),
                    right: Box::new(right),
                })
            }
            OperatorKind::Logical(operator) => {
                let right = self.take_last()?;
                Expression::Logical(LogicalExpression {
                    operator,
                    left: Box::new(self.take_last()?),
                    right: Box::new(right),
                })
            }
        };
        Ok(expr)
    }

    fn take_last(&mut self) -> Result<Expression, Error> {
        self.pop()
            .ok_or_else(|| Error::InternalError("operator node ran out of operands".into()))
    }

    fn require_reference(&self, index: usize, what: &str) -> Result<(), Error> {
        match self.operand(index) {
            Some(expr) if expr.is_reference() => Ok(()),
            _ => Err(Error::SyntaxError(format!("Invalid {} target", what))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Span, TokenKind};

    fn ident(name: &str) -> Expression {
        Expression::Identifier(Identifier::new(name, Span::default()))
    }

    fn grouped(expr: Expression) -> Expression {
        Expression::Grouping(Box::new(expr))
    }

    fn call_of(name: &str) -> Expression {
        let mut node = OperatorNode::new(Operator::function_call(false));
        node.push(ident(name)).unwrap();
        node.see_second_token();
        node.finish().unwrap()
    }

    #[test]
    fn test_binary_tiers() {
        let plus = Operator::infix(&TokenKind::Plus).unwrap();
        assert_eq!(plus.arity, 2);
        assert_eq!(plus.secondary, plus.primary + 1);

        let assign = Operator::infix(&TokenKind::Equal).unwrap();
        assert_eq!(assign.secondary, assign.primary);

        let ternary = Operator::infix(&TokenKind::Question).unwrap();
        assert_eq!(ternary.primary, precedence::CONDITIONAL);
        assert_eq!(ternary.secondary, precedence::ASSIGNMENT);
        assert_eq!(ternary.tertiary, precedence::ASSIGNMENT);
        assert!(ternary.flags.contains(OperatorFlags::HAS_SECONDARY_RHS_OPERAND));
    }

    #[test]
    fn test_accepting_operands_stops_at_arity() {
        let mut node = OperatorNode::new(Operator::infix(&TokenKind::Star).unwrap());
        assert!(node.accepting_operands());
        node.push(ident("a")).unwrap();
        node.push(ident("b")).unwrap();
        assert!(!node.accepting_operands());
        assert!(matches!(node.push(ident("c")), Err(Error::SyntaxError(_))));
    }

    #[test]
    fn test_conditional_waits_for_colon() {
        let mut node = OperatorNode::new(Operator::conditional());
        node.push(ident("t")).unwrap();
        node.push(ident("a")).unwrap();
        assert!(!node.accepting_operands());
        node.see_second_token();
        assert!(node.accepting_operands());
        node.push(ident("b")).unwrap();
        assert!(matches!(node.finish().unwrap(), Expression::Conditional(_)));
    }

    #[test]
    fn test_check_valid_requires_closing_token() {
        let mut node = OperatorNode::new(Operator::conditional());
        node.push(ident("t")).unwrap();
        node.push(ident("a")).unwrap();
        assert!(matches!(node.check_valid(), Err(Error::SyntaxError(_))));

        let mut group = OperatorNode::new(Operator::grouping());
        group.push(ident("x")).unwrap();
        assert!(group.check_valid().is_err());
        group.see_second_token();
        assert!(group.check_valid().is_ok());
    }

    #[test]
    fn test_check_valid_rejects_missing_operand() {
        let mut node = OperatorNode::new(Operator::infix(&TokenKind::Minus).unwrap());
        node.push(ident("a")).unwrap();
        assert!(matches!(node.finish(), Err(Error::SyntaxError(_))));
    }

    #[test]
    fn test_operand_unwraps_grouping_but_raw_does_not() {
        let mut node = OperatorNode::new(Operator::new_expression());
        node.push(grouped(ident("f"))).unwrap();
        assert_eq!(node.operand(0), Some(&ident("f")));
        assert!(matches!(node.raw_operand(0), Some(Expression::Grouping(_))));
    }

    #[test]
    fn test_new_with_raw_call_has_max_precedence() {
        let mut node = OperatorNode::new(Operator::new_expression());
        node.push(call_of("f")).unwrap();
        assert_eq!(node.effective_precedence(), precedence::MAX);

        let mut node = OperatorNode::new(Operator::new_expression());
        node.push(grouped(call_of("f"))).unwrap();
        assert_eq!(node.effective_precedence(), precedence::NEW);

        let mut node = OperatorNode::new(Operator::new_expression());
        node.push(ident("f")).unwrap();
        assert_eq!(node.effective_precedence(), precedence::NEW);
    }

    #[test]
    fn test_comma_flattens_raw_lists_only() {
        let comma = Operator::infix(&TokenKind::Comma).unwrap();

        let mut first = OperatorNode::new(comma);
        first.push(ident("a")).unwrap();
        first.push(ident("b")).unwrap();
        let ab = first.finish().unwrap();

        let mut flat = OperatorNode::new(comma);
        flat.push(ab.clone()).unwrap();
        flat.push(ident("c")).unwrap();
        match flat.finish().unwrap() {
            Expression::Sequence(seq) => assert_eq!(seq.expressions.len(), 3),
            other => panic!("expected sequence, got {:?}", other),
        }

        let mut nested = OperatorNode::new(comma);
        nested.push(grouped(ab)).unwrap();
        nested.push(ident("c")).unwrap();
        match nested.finish().unwrap() {
            Expression::Sequence(seq) => assert_eq!(seq.expressions.len(), 2),
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_target_checked_through_grouping() {
        let assign = Operator::infix(&TokenKind::Equal).unwrap();

        let mut ok = OperatorNode::new(assign);
        ok.push(grouped(ident("a"))).unwrap();
        ok.push(ident("b")).unwrap();
        assert!(ok.finish().is_ok());

        let mut bad = OperatorNode::new(assign);
        bad.push(call_of("f")).unwrap();
        bad.push(ident("b")).unwrap();
        assert!(matches!(bad.finish(), Err(Error::SyntaxError(_))));
    }

    #[test]
    fn test_member_requires_identifier_name() {
        let mut node = OperatorNode::new(Operator::member());
        node.push(ident("a")).unwrap();
        node.push(Expression::This).unwrap();
        assert!(node.finish().is_err());
    }
}

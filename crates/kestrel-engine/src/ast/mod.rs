//! Abstract Syntax Tree (AST) definitions for JavaScript.
//!
//! The tree is immutable once the parser hands it over. Parenthesized
//! expressions are kept as [`Expression::Grouping`] nodes so that lowering
//! can tell `new (f())` apart from `new f()`, and call arguments are kept as
//! the single comma-expression operand the parser built.

use crate::lexer::Span;

/// A complete JavaScript program (script or eval code).
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The statements in the program
    pub body: Vec<Statement>,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
    /// Where it appeared
    pub span: Span,
}

impl Identifier {
    /// Creates an identifier.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// Labels attached to a statement, outermost first.
pub type LabelSet = Vec<String>;

/// A JavaScript statement together with its label set and span.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// What kind of statement this is
    pub kind: StatementKind,
    /// Labels written in front of the statement (`a: b: while (...)`)
    pub labels: LabelSet,
    /// Source span
    pub span: Span,
}

impl Statement {
    /// Creates an unlabeled statement.
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self {
            kind,
            labels: Vec::new(),
            span,
        }
    }

    /// Returns true if this statement is a loop.
    pub fn is_loop(&self) -> bool {
        matches!(self.kind, StatementKind::Loop(_))
    }
}

/// The statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `var` declaration
    Var(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(FunctionNode),
    /// Expression statement
    Expression(Expression),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// for / for-in / while / do-while
    Loop(LoopStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// Return statement
    Return(Option<Expression>),
    /// Break statement with optional label
    Break(Option<Identifier>),
    /// Continue statement with optional label
    Continue(Option<Identifier>),
    /// Throw statement
    Throw(Expression),
    /// Try statement
    Try(TryStatement),
    /// With statement
    With(WithStatement),
    /// Empty statement (;)
    Empty,
}

/// A `var` declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// The identifier being declared
    pub id: Identifier,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A function declaration or function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    /// The function name (required for declarations)
    pub id: Option<Identifier>,
    /// The parameters
    pub params: Vec<Identifier>,
    /// The function body
    pub body: Vec<Statement>,
    /// Source span of the whole function
    pub span: Span,
}

/// A block statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
}

/// Which source construct a [`LoopStatement`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// `for (init; test; update)`
    For,
    /// `for (x in obj)`
    ForIn,
    /// `while (test)`
    While,
    /// `do ... while (test)`
    DoWhile,
}

/// All four loop forms share this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStatement {
    /// Source construct
    pub kind: LoopKind,
    /// Init / condition / increment, or the for-in enumeration head
    pub head: LoopHead,
    /// The loop body
    pub body: Box<Statement>,
}

impl LoopStatement {
    /// True only for do-while: the condition is first tested after one pass.
    pub fn check_at_end(&self) -> bool {
        self.kind == LoopKind::DoWhile
    }
}

/// The head of a loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopHead {
    /// for / while / do-while
    Counted {
        /// Runs once before the first test
        init: Option<ForInit>,
        /// Absent means "always true"
        condition: Option<Expression>,
        /// Runs after every completed (or continued) body
        increment: Option<Expression>,
    },
    /// for-in
    Enumerate {
        /// Receives each key
        target: ForInTarget,
        /// The object whose keys are enumerated
        object: Expression,
    },
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    /// `var` declaration
    Declaration(VariableDeclaration),
    /// Expression
    Expression(Expression),
}

/// Left-hand side of for-in.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInTarget {
    /// `for (var k in o)`, optionally with an initializer
    Declaration(VariableDeclarator),
    /// `for (o.k in p)` or `for (k in o)`
    Expression(Expression),
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStatement {
    /// The discriminant expression
    pub discriminant: Expression,
    /// The case clauses
    pub cases: Vec<SwitchCase>,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expression>,
    /// The consequent statements
    pub consequent: Vec<Statement>,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    /// The try block
    pub block: BlockStatement,
    /// The catch clause
    pub handler: Option<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// The catch variable
    pub param: Identifier,
    /// The catch body
    pub body: BlockStatement,
}

/// A with statement.
#[derive(Debug, Clone, PartialEq)]
pub struct WithStatement {
    /// The object expression
    pub object: Expression,
    /// The body statement
    pub body: Box<Statement>,
}

/// A JavaScript expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// this keyword
    This,
    /// Array literal
    Array(ArrayExpression),
    /// Object literal
    Object(ObjectExpression),
    /// Function expression
    Function(Box<FunctionNode>),
    /// Parenthesized expression
    Grouping(Box<Expression>),
    /// Unary expression
    Unary(UnaryExpression),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Binary expression
    Binary(BinaryExpression),
    /// Short-circuit logical expression
    Logical(LogicalExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Sequence expression (comma operator)
    Sequence(SequenceExpression),
    /// Call expression
    Call(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// new expression
    New(NewExpression),
}

impl Expression {
    /// Looks through any number of grouping parentheses.
    pub fn unwrap_grouping(&self) -> &Expression {
        let mut expr = self;
        while let Expression::Grouping(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// Returns true if the expression is a valid assignment target once
    /// parentheses are removed.
    pub fn is_reference(&self) -> bool {
        matches!(
            self.unwrap_grouping(),
            Expression::Identifier(_) | Expression::Member(_)
        )
    }

    /// A short human-readable rendering used in runtime error messages.
    pub fn describe(&self) -> String {
        match self.unwrap_grouping() {
            Expression::Identifier(id) => id.name.clone(),
            Expression::This => "this".to_string(),
            Expression::Member(member) => match &member.property {
                MemberProperty::Named(name) => {
                    format!("{}.{}", member.object.describe(), name.name)
                }
                MemberProperty::Computed(_) => format!("{}[...]", member.object.describe()),
            },
            Expression::Call(call) => format!("{}(...)", call.callee.describe()),
            Expression::Literal(Literal::String(s)) => format!("\"{}\"", s),
            Expression::Literal(Literal::Number(n)) => n.to_string(),
            Expression::Function(_) => "function".to_string(),
            _ => "expression".to_string(),
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
}

/// An array expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression {
    /// The elements (None represents a hole)
    pub elements: Vec<Option<Expression>>,
}

/// An object expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectExpression {
    /// The properties
    pub properties: Vec<Property>,
}

/// An object literal property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// The property key, already converted to its string form
    pub key: String,
    /// The property value
    pub value: Expression,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    // Comparison
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    // Bitwise
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    // Other
    In,
    InstanceOf,
}

/// A short-circuit logical expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// `None` for plain `=`, otherwise the operator of a compound assignment
    pub operator: Option<BinaryOperator>,
    /// The assignment target (identifier or member expression)
    pub target: Box<Expression>,
    /// The assigned value
    pub value: Box<Expression>,
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// The consequent (if true)
    pub consequent: Box<Expression>,
    /// The alternate (if false)
    pub alternate: Box<Expression>,
}

/// A sequence expression (comma operator).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceExpression {
    /// The expressions, at least two
    pub expressions: Vec<Expression>,
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The argument operand: absent for `f()`, a raw [`Expression::Sequence`]
    /// for `f(a, b)`, anything else for a single argument
    pub arguments: Option<Box<Expression>>,
}

impl CallExpression {
    /// Whether this is a direct `eval` call: the callee is the bare
    /// identifier `eval`, possibly parenthesized.
    pub fn is_direct_eval(&self) -> bool {
        matches!(self.callee.unwrap_grouping(), Expression::Identifier(id) if id.name == "eval")
    }

    /// The argument list as lowering sees it: empty for none, one element
    /// for a single non-list argument, the flattened elements of a comma
    /// list. A parenthesized comma expression stays a single argument.
    pub fn argument_list(&self) -> Vec<&Expression> {
        match self.arguments.as_deref() {
            None => Vec::new(),
            Some(Expression::Sequence(seq)) => seq.expressions.iter().collect(),
            Some(single) => vec![single],
        }
    }
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
}

/// Member property.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    /// `a.b`
    Named(Identifier),
    /// `a[b]`
    Computed(Box<Expression>),
}

/// A new expression.
///
/// The operand is stored raw. When it is a call node, that call's callee and
/// arguments are the constructor and constructor arguments; otherwise the
/// operand itself is the constructor and it receives no arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpression {
    /// The raw operand
    pub operand: Box<Expression>,
}

impl NewExpression {
    /// Splits the raw operand into constructor and argument list.
    pub fn constructor_and_arguments(&self) -> (&Expression, Vec<&Expression>) {
        match self.operand.as_ref() {
            Expression::Call(call) => (call.callee.as_ref(), call.argument_list()),
            other => (other, Vec::new()),
        }
    }
}

//! Compile-time scope chain and variable resolution.
//!
//! Scopes live in an arena ([`ScopeChain`]) and point at their parent by
//! [`ScopeId`]. A parent link never changes after creation, and an index
//! handed out by a scope's [`BindingTable`] is never reassigned, so code
//! lowered against a scope stays valid however many declarations follow.
//!
//! ## Storage classes
//!
//! | Storage | Runtime record | Access from lowered code |
//! |---------|----------------|--------------------------|
//! | `Static` | slot vector | `Slot { depth, index }` |
//! | `Dynamic` | name-keyed store | by name |
//!
//! Each compilation unit (script, eval code, function body) picks its
//! storage once: global and eval code are always dynamic, a function is
//! dynamic when its own body contains a direct `eval(...)` call or a `with`
//! statement. Catch scopes and the scope binding a named function
//! expression's own name are always static.

use rustc_hash::FxHashMap;

use crate::Error;
use crate::ast::*;
use crate::lexer::Span;

/// Name lookup shared by compile-time scopes and runtime environment records.
pub trait NameResolver {
    /// Position of `name` when it lives in a numbered slot.
    fn slot_of(&self, name: &str) -> Option<usize>;

    /// Whether `name` is bound here at all.
    fn declares(&self, name: &str) -> bool {
        self.slot_of(name).is_some()
    }
}

/// Handle to a scope in a [`ScopeChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// The construct that introduced a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Script code
    Global,
    /// A function body
    Function,
    /// Code run by `eval`
    Eval,
    /// A catch clause; holds only the catch variable
    Catch,
    /// Binds a named function expression's own name
    Callee,
    /// A `with` statement's object
    With,
}

impl ScopeKind {
    /// Scopes whose ordinary `var` declarations belong to the parent.
    fn delegates_declarations(self) -> bool {
        matches!(self, ScopeKind::Catch | ScopeKind::Callee | ScopeKind::With)
    }
}

/// How a scope's bindings are stored at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Slot indices are baked into the lowered code
    Static,
    /// Bindings are looked up by name at runtime
    Dynamic,
}

/// A declared variable.
#[derive(Debug, Clone)]
pub struct DeclaredVariable<'a> {
    /// Variable name
    pub name: String,
    /// Slot index, stable once assigned
    pub index: usize,
    /// The function declaration materialized into the slot at scope entry
    pub initializer: Option<&'a FunctionNode>,
    /// Where the (first) declaration appeared
    pub span: Span,
}

/// Ordered name to index map.
#[derive(Debug, Clone, Default)]
pub struct BindingTable<'a> {
    index: FxHashMap<String, usize>,
    variables: Vec<DeclaredVariable<'a>>,
}

impl<'a> BindingTable<'a> {
    /// Declares `name`, returning its index.
    ///
    /// Redeclaring keeps the original index. A function initializer replaces
    /// any earlier one; a missing initializer leaves the earlier one alone.
    pub fn declare(
        &mut self,
        name: &str,
        initializer: Option<&'a FunctionNode>,
        span: Span,
    ) -> usize {
        if let Some(&index) = self.index.get(name) {
            if initializer.is_some() {
                self.variables[index].initializer = initializer;
            }
            return index;
        }

        let index = self.variables.len();
        self.index.insert(name.to_string(), index);
        self.variables.push(DeclaredVariable {
            name: name.to_string(),
            index,
            initializer,
            span,
        });
        index
    }

    /// Whether `name` has been declared.
    pub fn has_declared(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Index of `name`, if declared.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// All variables in index order.
    pub fn variables(&self) -> &[DeclaredVariable<'a>] {
        &self.variables
    }

    /// Variable names in index order.
    pub fn names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// A single compile-time scope.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    parent: Option<ScopeId>,
    kind: ScopeKind,
    storage: Storage,
    bindings: BindingTable<'a>,
}

impl<'a> Scope<'a> {
    /// The enclosing scope.
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// What introduced the scope.
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Static or dynamic storage.
    pub fn storage(&self) -> Storage {
        self.storage
    }

    /// The scope's own bindings.
    pub fn bindings(&self) -> &BindingTable<'a> {
        &self.bindings
    }

    /// Whether resolution has to fall back to a by-name lookup here.
    fn is_opaque(&self) -> bool {
        self.storage == Storage::Dynamic || self.kind == ScopeKind::With
    }
}

impl NameResolver for Scope<'_> {
    fn slot_of(&self, name: &str) -> Option<usize> {
        self.bindings.index_of(name)
    }
}

/// Where lowered code finds a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// `depth` environments up the runtime chain, slot `index`
    Slot {
        /// Number of parent links to follow
        depth: usize,
        /// Slot within that environment
        index: usize,
    },
    /// Look the name up at runtime
    Name,
}

/// Arena of compile-time scopes.
#[derive(Debug, Default)]
pub struct ScopeChain<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> ScopeChain<'a> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scope under `parent`.
    pub fn push(&mut self, parent: Option<ScopeId>, kind: ScopeKind, storage: Storage) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let storage = match kind {
            ScopeKind::Global | ScopeKind::Eval | ScopeKind::With => Storage::Dynamic,
            ScopeKind::Catch | ScopeKind::Callee => Storage::Static,
            ScopeKind::Function => storage,
        };
        self.scopes.push(Scope {
            parent,
            kind,
            storage,
            bindings: BindingTable::default(),
        });
        id
    }

    /// Looks up a scope.
    pub fn get(&self, id: ScopeId) -> &Scope<'a> {
        &self.scopes[id.0]
    }

    /// Declares a variable in the scope that owns declarations made in `id`.
    ///
    /// Catch, callee and with scopes pass ordinary declarations on to their
    /// parent, which is how a `var` inside a catch body lands in the
    /// enclosing function.
    pub fn declare(
        &mut self,
        id: ScopeId,
        name: &str,
        initializer: Option<&'a FunctionNode>,
        span: Span,
    ) -> Result<(ScopeId, usize), Error> {
        let owner = self.declaration_scope(id)?;
        let index = self.scopes[owner.0].bindings.declare(name, initializer, span);
        Ok((owner, index))
    }

    /// The scope `declare` would put a binding in.
    pub fn declaration_scope(&self, mut id: ScopeId) -> Result<ScopeId, Error> {
        while self.get(id).kind.delegates_declarations() {
            id = self.get(id).parent.ok_or_else(|| {
                Error::InternalError("catch or with scope without a parent".into())
            })?;
        }
        Ok(id)
    }

    /// Declares the single variable of a catch (or callee) scope.
    pub fn declare_catch_variable(
        &mut self,
        id: ScopeId,
        name: &str,
        span: Span,
    ) -> Result<usize, Error> {
        let scope = &mut self.scopes[id.0];
        if !matches!(scope.kind, ScopeKind::Catch | ScopeKind::Callee) {
            return Err(Error::InternalError(
                "catch variable declared outside a catch scope".into(),
            ));
        }
        if !scope.bindings.is_empty() {
            return Err(Error::SyntaxError(format!(
                "Catch scope already declares '{}'; cannot declare '{}'",
                scope.bindings.variables[0].name, name
            )));
        }
        Ok(scope.bindings.declare(name, None, span))
    }

    /// Whether `id` itself declares `name`.
    pub fn has_declared(&self, id: ScopeId, name: &str) -> bool {
        self.get(id).declares(name)
    }

    /// Index of `name` in `id` itself.
    pub fn index_of(&self, id: ScopeId, name: &str) -> Option<usize> {
        self.get(id).slot_of(name)
    }

    /// Resolves `name` as seen from `id`.
    pub fn resolve(&self, id: ScopeId, name: &str) -> Resolution {
        let mut depth = 0;
        let mut current = Some(id);

        while let Some(scope_id) = current {
            let scope = self.get(scope_id);
            if scope.is_opaque() {
                return Resolution::Name;
            }
            if let Some(index) = scope.slot_of(name) {
                return Resolution::Slot { depth, index };
            }
            depth += 1;
            current = scope.parent;
        }

        Resolution::Name
    }
}

/// Whether a function body needs dynamic storage: it contains a direct
/// `eval(...)` call or a `with` statement outside any nested function.
pub fn needs_dynamic_storage(body: &[Statement]) -> bool {
    body.iter().any(statement_is_dynamic)
}

fn statement_is_dynamic(stmt: &Statement) -> bool {
    let any_expr = |e: &Option<Expression>| e.as_ref().is_some_and(expression_is_dynamic);

    match &stmt.kind {
        StatementKind::With(_) => true,
        StatementKind::Var(decl) => declaration_is_dynamic(decl),
        StatementKind::FunctionDeclaration(_) | StatementKind::Empty => false,
        StatementKind::Expression(expr) | StatementKind::Throw(expr) => {
            expression_is_dynamic(expr)
        }
        StatementKind::Return(expr) => any_expr(expr),
        StatementKind::Break(_) | StatementKind::Continue(_) => false,
        StatementKind::Block(block) => needs_dynamic_storage(&block.body),
        StatementKind::If(stmt) => {
            expression_is_dynamic(&stmt.test)
                || statement_is_dynamic(&stmt.consequent)
                || stmt.alternate.as_deref().is_some_and(statement_is_dynamic)
        }
        StatementKind::Loop(stmt) => {
            let head = match &stmt.head {
                LoopHead::Counted {
                    init,
                    condition,
                    increment,
                } => {
                    let init = match init {
                        Some(ForInit::Declaration(decl)) => declaration_is_dynamic(decl),
                        Some(ForInit::Expression(expr)) => expression_is_dynamic(expr),
                        None => false,
                    };
                    init || any_expr(condition) || any_expr(increment)
                }
                LoopHead::Enumerate { target, object } => {
                    let target = match target {
                        ForInTarget::Declaration(d) => any_expr(&d.init),
                        ForInTarget::Expression(e) => expression_is_dynamic(e),
                    };
                    target || expression_is_dynamic(object)
                }
            };
            head || statement_is_dynamic(&stmt.body)
        }
        StatementKind::Switch(stmt) => {
            expression_is_dynamic(&stmt.discriminant)
                || stmt
                    .cases
                    .iter()
                    .any(|c| any_expr(&c.test) || needs_dynamic_storage(&c.consequent))
        }
        StatementKind::Try(stmt) => {
            needs_dynamic_storage(&stmt.block.body)
                || stmt
                    .handler
                    .as_ref()
                    .is_some_and(|h| needs_dynamic_storage(&h.body.body))
                || stmt
                    .finalizer
                    .as_ref()
                    .is_some_and(|f| needs_dynamic_storage(&f.body))
        }
    }
}

fn declaration_is_dynamic(decl: &VariableDeclaration) -> bool {
    decl.declarations
        .iter()
        .any(|d| d.init.as_ref().is_some_and(expression_is_dynamic))
}

fn expression_is_dynamic(expr: &Expression) -> bool {
    match expr {
        Expression::Call(call) => {
            call.is_direct_eval()
                || expression_is_dynamic(&call.callee)
                || call.arguments.as_deref().is_some_and(expression_is_dynamic)
        }
        Expression::Literal(_) | Expression::Identifier(_) | Expression::This => false,
        // Nested functions decide for themselves.
        Expression::Function(_) => false,
        Expression::Array(arr) => arr.elements.iter().flatten().any(expression_is_dynamic),
        Expression::Object(obj) => obj.properties.iter().any(|p| expression_is_dynamic(&p.value)),
        Expression::Grouping(inner) => expression_is_dynamic(inner),
        Expression::Unary(u) => expression_is_dynamic(&u.argument),
        Expression::Update(u) => expression_is_dynamic(&u.argument),
        Expression::Binary(b) => expression_is_dynamic(&b.left) || expression_is_dynamic(&b.right),
        Expression::Logical(l) => expression_is_dynamic(&l.left) || expression_is_dynamic(&l.right),
        Expression::Assignment(a) => {
            expression_is_dynamic(&a.target) || expression_is_dynamic(&a.value)
        }
        Expression::Conditional(c) => {
            expression_is_dynamic(&c.test)
                || expression_is_dynamic(&c.consequent)
                || expression_is_dynamic(&c.alternate)
        }
        Expression::Sequence(seq) => seq.expressions.iter().any(expression_is_dynamic),
        Expression::Member(m) => {
            expression_is_dynamic(&m.object)
                || matches!(&m.property, MemberProperty::Computed(key) if expression_is_dynamic(key))
        }
        Expression::New(n) => expression_is_dynamic(&n.operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn body_of(src: &str) -> Vec<Statement> {
        Parser::new(src).parse_program().unwrap().body
    }

    #[test]
    fn test_redeclaration_keeps_index() {
        let mut chain = ScopeChain::new();
        let f = chain.push(None, ScopeKind::Function, Storage::Static);
        let (_, first) = chain.declare(f, "x", None, Span::default()).unwrap();
        chain.declare(f, "y", None, Span::default()).unwrap();
        let (_, again) = chain.declare(f, "x", None, Span::default()).unwrap();
        assert_eq!(first, again);
        assert_eq!(chain.index_of(f, "y"), Some(1));
        assert!(chain.has_declared(f, "x"));
    }

    #[test]
    fn test_last_function_initializer_wins() {
        let program = Parser::new("function g() { return 1; } function g() { return 2; }")
            .parse_program()
            .unwrap();
        let funcs: Vec<&FunctionNode> = program
            .body
            .iter()
            .filter_map(|s| match &s.kind {
                StatementKind::FunctionDeclaration(f) => Some(f),
                _ => None,
            })
            .collect();

        let mut chain = ScopeChain::new();
        let f = chain.push(None, ScopeKind::Function, Storage::Static);
        chain.declare(f, "g", Some(funcs[0]), Span::default()).unwrap();
        chain.declare(f, "g", Some(funcs[1]), Span::default()).unwrap();
        // A plain `var g` afterwards does not erase the initializer.
        chain.declare(f, "g", None, Span::default()).unwrap();

        let table = chain.get(f).bindings();
        assert_eq!(table.len(), 1);
        let init = table.variables()[0].initializer.unwrap();
        assert!(std::ptr::eq(init, funcs[1]));
    }

    #[test]
    fn test_catch_scope_delegates_other_declarations() {
        let mut chain = ScopeChain::new();
        let f = chain.push(None, ScopeKind::Function, Storage::Static);
        let c = chain.push(Some(f), ScopeKind::Catch, Storage::Static);

        assert_eq!(chain.declare_catch_variable(c, "e", Span::default()).unwrap(), 0);
        let (owner, _) = chain.declare(c, "caught", None, Span::default()).unwrap();
        assert_eq!(owner, f);
        assert!(chain.has_declared(f, "caught"));
        assert!(!chain.has_declared(c, "caught"));
    }

    #[test]
    fn test_second_catch_variable_is_syntax_error() {
        let mut chain = ScopeChain::new();
        let f = chain.push(None, ScopeKind::Function, Storage::Static);
        let c = chain.push(Some(f), ScopeKind::Catch, Storage::Static);
        chain.declare_catch_variable(c, "e", Span::default()).unwrap();
        assert!(matches!(
            chain.declare_catch_variable(c, "f", Span::default()),
            Err(Error::SyntaxError(_))
        ));
    }

    #[test]
    fn test_resolve_slots_and_names() {
        let mut chain = ScopeChain::new();
        let global = chain.push(None, ScopeKind::Global, Storage::Dynamic);
        chain.declare(global, "g", None, Span::default()).unwrap();
        let f = chain.push(Some(global), ScopeKind::Function, Storage::Static);
        chain.declare(f, "a", None, Span::default()).unwrap();
        chain.declare(f, "b", None, Span::default()).unwrap();
        let c = chain.push(Some(f), ScopeKind::Catch, Storage::Static);
        chain.declare_catch_variable(c, "e", Span::default()).unwrap();

        assert_eq!(chain.resolve(c, "e"), Resolution::Slot { depth: 0, index: 0 });
        assert_eq!(chain.resolve(c, "b"), Resolution::Slot { depth: 1, index: 1 });
        assert_eq!(chain.resolve(c, "g"), Resolution::Name);
        assert_eq!(chain.resolve(c, "missing"), Resolution::Name);
    }

    #[test]
    fn test_dynamic_and_with_scopes_stop_resolution() {
        let mut chain = ScopeChain::new();
        let outer = chain.push(None, ScopeKind::Function, Storage::Static);
        chain.declare(outer, "x", None, Span::default()).unwrap();
        let dynamic = chain.push(Some(outer), ScopeKind::Function, Storage::Dynamic);
        chain.declare(dynamic, "y", None, Span::default()).unwrap();
        let with = chain.push(Some(outer), ScopeKind::With, Storage::Static);

        assert_eq!(chain.resolve(dynamic, "y"), Resolution::Name);
        assert_eq!(chain.resolve(dynamic, "x"), Resolution::Name);
        assert_eq!(chain.get(with).storage(), Storage::Dynamic);
        assert_eq!(chain.resolve(with, "x"), Resolution::Name);
    }

    #[test]
    fn test_needs_dynamic_storage() {
        assert!(needs_dynamic_storage(&body_of("eval('1');")));
        assert!(needs_dynamic_storage(&body_of("if (a) { x = eval(s); }")));
        assert!(needs_dynamic_storage(&body_of("with (o) { x; }")));
        assert!(needs_dynamic_storage(&body_of("(eval)('var x = 1');")));
        assert!(needs_dynamic_storage(&body_of("((eval))('1');")));
        assert!(!needs_dynamic_storage(&body_of("o.eval('1');")));
        assert!(!needs_dynamic_storage(&body_of(
            "var f = function () { eval('1'); };"
        )));
        assert!(!needs_dynamic_storage(&body_of("var x = 1; x++;")));
    }
}

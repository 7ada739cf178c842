//! Engine and compiler configuration.

/// What an assignment to an unresolvable bare identifier does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndeclaredAssignment {
    /// Create a (deletable) global binding
    #[default]
    CreateGlobal,
    /// Throw a ReferenceError
    Throw,
}

/// Options that shape lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Lower loops in rotated form (two copies of the test and body)
    pub loop_rotation: bool,
    /// Behavior for sloppy-mode code; a `"use strict"` prologue always throws
    pub undeclared_assignment: UndeclaredAssignment,
    /// Check that every statement leaves the operand stack as it found it
    pub check_stack_balance: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            loop_rotation: true,
            undeclared_assignment: UndeclaredAssignment::CreateGlobal,
            check_stack_balance: cfg!(debug_assertions),
        }
    }
}

impl CompilerOptions {
    /// Sets loop rotation.
    pub fn loop_rotation(mut self, enabled: bool) -> Self {
        self.loop_rotation = enabled;
        self
    }

    /// Sets the undeclared-assignment behavior.
    pub fn undeclared_assignment(mut self, mode: UndeclaredAssignment) -> Self {
        self.undeclared_assignment = mode;
        self
    }

    /// Enables or disables the per-statement stack balance check.
    pub fn check_stack_balance(mut self, enabled: bool) -> Self {
        self.check_stack_balance = enabled;
        self
    }
}

/// Options for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Lowering options
    pub compiler: CompilerOptions,
    /// Maximum nesting of script function calls before a RangeError
    pub max_call_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            compiler: CompilerOptions::default(),
            max_call_depth: 256,
        }
    }
}

impl EngineOptions {
    /// Replaces the compiler options.
    pub fn compiler(mut self, compiler: CompilerOptions) -> Self {
        self.compiler = compiler;
        self
    }

    /// Shorthand for strict undeclared assignment.
    pub fn strict(mut self, strict: bool) -> Self {
        self.compiler.undeclared_assignment = if strict {
            UndeclaredAssignment::Throw
        } else {
            UndeclaredAssignment::CreateGlobal
        };
        self
    }

    /// Sets the call depth limit.
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

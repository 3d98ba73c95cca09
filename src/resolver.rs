//! Static pass computing how many environment hops separate each local
//! variable access from the scope that declares it.
//!
//! Globals are not tracked: an access with no entry in [`Locals`] is looked
//! up in the global environment at runtime.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Phase};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Binding-depth cache: variable-access node to enclosing-scope hops.
pub type Locals = FxHashMap<ExprId, usize>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Can't read local variable '{}' in its own initializer.", name.lexeme)]
    ReadInOwnInitializer { name: Token },
    #[error("Can't return from top-level code.")]
    TopLevelReturn { keyword: Token },
}

impl ResolveError {
    pub fn token(&self) -> &Token {
        match self {
            Self::ReadInOwnInitializer { name } => name,
            Self::TopLevelReturn { keyword } => keyword,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("resolution failed with {} error(s)", errors.len())]
pub struct ResolveFailure {
    pub errors: Vec<ResolveError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
}

struct Resolver {
    /// Local scopes only. `false` marks a name declared but not yet initialized.
    scopes: Vec<FxHashMap<String, bool>>,
    locals: Locals,
    errors: Vec<ResolveError>,
    function: FunctionKind,
}

impl Resolver {
    fn new() -> Self {
        Self {
            scopes: Vec::new(),
            locals: Locals::default(),
            errors: Vec::new(),
            function: FunctionKind::None,
        }
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_statement(statement);
        }
    }

    fn resolve_statement(&mut self, statement: &Stmt) {
        ensure_sufficient_stack(|| self.visit_statement(statement));
    }

    fn visit_statement(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_statements(statements);
                self.end_scope();
            }
            Stmt::Expression(expression) | Stmt::Print { expression, .. } => self.resolve_expr(expression),
            Stmt::Function(declaration) => {
                // defined before the body is resolved so the function can recurse
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionKind::Function);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_statement(else_branch);
                }
            }
            Stmt::Return { keyword, value } => {
                if self.function == FunctionKind::None {
                    self.errors.push(ResolveError::TopLevelReturn {
                        keyword: keyword.clone(),
                    });
                }
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_statement(body);
            }
        }
    }

    /// Parameters and body share one scope, matching the single environment
    /// a call creates.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionKind) {
        let enclosing = std::mem::replace(&mut self.function, kind);
        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&declaration.body);
        self.end_scope();
        self.function = enclosing;
    }

    fn resolve_expr(&mut self, expression: &Expr) {
        ensure_sufficient_stack(|| self.visit_expr(expression));
    }

    fn visit_expr(&mut self, expression: &Expr) {
        match expression {
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::HostEscape { code, .. } => self.resolve_expr(code),
            Expr::Literal(_) => {}
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Variable { id, name } => {
                let declared_only = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.lexeme))
                    .is_some_and(|initialized| !initialized);
                if declared_only {
                    self.errors.push(ResolveError::ReadInOwnInitializer { name: name.clone() });
                }
                self.resolve_local(*id, name);
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (hops, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, hops);
                return;
            }
        }
        // not found: global
    }

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }
}

pub fn resolve(statements: &[Stmt], sink: &mut dyn DiagnosticSink) -> Result<Locals, ResolveFailure> {
    let mut resolver = Resolver::new();
    resolver.resolve_statements(statements);

    if resolver.errors.is_empty() {
        debug!(bindings = resolver.locals.len(), "resolved local bindings");
        return Ok(resolver.locals);
    }
    for error in &resolver.errors {
        sink.report(Diagnostic::at_token(Phase::Resolve, error.token(), error.to_string()));
    }
    Err(ResolveFailure {
        errors: resolver.errors,
    })
}

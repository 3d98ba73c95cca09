use std::fmt;
use std::rc::Rc;

use crate::token::Token;

/// Stable handle of a variable-access node, the key of the binding-depth cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// Hands out [`ExprId`]s. One allocator lives as long as the session so ids
/// stay unique across REPL entries.
#[derive(Debug, Default)]
pub struct NodeIds {
    next: u32,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ExprId {
        let id = ExprId(self.next);
        self.next += 1;
        id
    }
}

/// Value of a literal expression.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Nil,
    Bool(bool),
    Number(i64),
    Str(Rc<str>),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Grouping(Box<Expr>),
    /// `host(code)`: hands a runtime string to the host-extension registry.
    HostEscape {
        keyword: Token,
        code: Box<Expr>,
    },
    Literal(LiteralValue),
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Expression(Expr),
    Function(Rc<FunctionDecl>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    Print {
        keyword: Token,
        expression: Expr,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
}

// Nesting depth is bounded only by the source, so trees are torn down through
// a heap worklist instead of the recursive drop glue.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.detach_children(&mut pending);
        }
    }
}

impl Expr {
    fn is_leaf(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::Variable { .. })
    }

    fn detach_children(&mut self, pending: &mut Vec<Expr>) {
        match self {
            Expr::Assign { value: child, .. }
            | Expr::Grouping(child)
            | Expr::HostEscape { code: child, .. }
            | Expr::Unary { right: child, .. } => detach_expr(child, pending),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                detach_expr(left, pending);
                detach_expr(right, pending);
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                detach_expr(callee, pending);
                pending.append(arguments);
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                detach_expr(condition, pending);
                detach_expr(then_branch, pending);
                detach_expr(else_branch, pending);
            }
            Expr::Literal(_) | Expr::Variable { .. } => {}
        }
    }
}

fn detach_expr(child: &mut Box<Expr>, pending: &mut Vec<Expr>) {
    if !child.is_leaf() {
        pending.push(std::mem::replace(child.as_mut(), Expr::Literal(LiteralValue::Nil)));
    }
}

impl Drop for Stmt {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut statement) = pending.pop() {
            statement.detach_children(&mut pending);
        }
    }
}

impl Stmt {
    fn detach_children(&mut self, pending: &mut Vec<Stmt>) {
        match self {
            Stmt::Block(statements) => pending.append(statements),
            // a declaration still shared with a live closure is dropped by its last owner
            Stmt::Function(declaration) => {
                if let Some(declaration) = Rc::get_mut(declaration) {
                    pending.append(&mut declaration.body);
                }
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                detach_stmt(then_branch, pending);
                if let Some(else_branch) = else_branch {
                    detach_stmt(else_branch, pending);
                }
            }
            Stmt::While { body, .. } => detach_stmt(body, pending),
            Stmt::Expression(_) | Stmt::Print { .. } | Stmt::Return { .. } | Stmt::Var { .. } => {}
        }
    }
}

fn detach_stmt(child: &mut Box<Stmt>, pending: &mut Vec<Stmt>) {
    pending.push(std::mem::replace(child.as_mut(), Stmt::Block(Vec::new())));
}

/// Renders an expression as a parenthesized prefix form, for tests and tracing.
pub fn print_ast(root: &Expr) -> String {
    let mut printed = String::new();
    format_expr(root, &mut printed);
    printed
}

fn format_expr(expr: &Expr, output: &mut String) {
    crate::stack::ensure_sufficient_stack(|| format_expr_node(expr, output));
}

fn format_expr_node(expr: &Expr, output: &mut String) {
    match expr {
        Expr::Assign { name, value, .. } => format_parts(&format!("= {}", name.lexeme), &[value.as_ref()], output),
        Expr::Binary {
            left,
            operator,
            right,
        }
        | Expr::Logical {
            left,
            operator,
            right,
        } => format_parts(&operator.lexeme, &[left.as_ref(), right.as_ref()], output),
        Expr::Call {
            callee, arguments, ..
        } => {
            let mut parts = vec![callee.as_ref()];
            parts.extend(arguments.iter());
            format_parts("call", &parts, output);
        }
        Expr::Grouping(inner) => format_parts("group", &[inner.as_ref()], output),
        Expr::HostEscape { code, .. } => format_parts("host", &[code.as_ref()], output),
        Expr::Literal(LiteralValue::Str(value)) => {
            output.push('"');
            output.push_str(value);
            output.push('"');
        }
        Expr::Literal(value) => output.push_str(&value.to_string()),
        Expr::Ternary {
            condition,
            then_branch,
            else_branch,
        } => format_parts(
            "?:",
            &[condition.as_ref(), then_branch.as_ref(), else_branch.as_ref()],
            output,
        ),
        Expr::Unary { operator, right } => format_parts(&operator.lexeme, &[right.as_ref()], output),
        Expr::Variable { name, .. } => output.push_str(&name.lexeme),
    }
}

fn format_parts(name: &str, parts: &[&Expr], output: &mut String) {
    output.push('(');
    output.push_str(name);
    for part in parts {
        output.push(' ');
        format_expr(part, output);
    }
    output.push(')');
}

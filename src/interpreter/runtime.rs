use std::rc::Rc;

use crate::ast::{Expr, ExprId, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};

use super::Interpreter;
use super::callable::LoxFunction;
use super::environment::EnvRef;
use super::error::{RuntimeError, RuntimeErrorKind};
use super::operators;
use super::value::Value;

/// Control-flow marker for statement execution.
#[derive(Debug)]
pub enum ExecResult {
    Continue,
    Return(Value),
}

impl Interpreter {
    pub(super) fn execute(&mut self, statement: &Stmt) -> Result<ExecResult, RuntimeError> {
        ensure_sufficient_stack(|| self.execute_statement(statement))
    }

    /// Runs `statements` with `environment` as the current scope. The previous
    /// scope is restored however the block exits.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> Result<ExecResult, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_statements(statements);
        self.environment = previous;
        result
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<ExecResult, RuntimeError> {
        for statement in statements {
            if let ExecResult::Return(value) = self.execute(statement)? {
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    fn execute_statement(&mut self, statement: &Stmt) -> Result<ExecResult, RuntimeError> {
        match statement {
            Stmt::Expression(expression) => {
                self.evaluate(expression)?;
            }
            Stmt::Print {
                keyword,
                expression,
            } => {
                let value = self.evaluate(expression)?;
                self.output.print_line(&value.to_string()).map_err(|error| {
                    RuntimeError::new(
                        keyword,
                        RuntimeErrorKind::Output {
                            message: error.to_string(),
                        },
                    )
                })?;
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.as_str(), value);
            }
            Stmt::Block(statements) => {
                let environment = EnvRef::child(&self.environment);
                return self.execute_block(statements, environment);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                }
                if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let ExecResult::Return(value) = self.execute(body)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
            }
            Stmt::Function(declaration) => {
                let function = LoxFunction::new(Rc::clone(declaration), self.environment.clone());
                self.environment
                    .define(declaration.name.lexeme.as_str(), Value::Callable(Rc::new(function)));
            }
            Stmt::Return { keyword, value } => {
                if self.call_depth == 0 {
                    return Err(RuntimeError::new(
                        keyword,
                        RuntimeErrorKind::ReturnOutsideFunction,
                    ));
                }
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                return Ok(ExecResult::Return(value));
            }
        }
        Ok(ExecResult::Continue)
    }

    pub(super) fn evaluate(&mut self, expression: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.evaluate_expression(expression))
    }

    fn evaluate_expression(&mut self, expression: &Expr) -> Result<Value, RuntimeError> {
        match expression {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                self.assign_variable(*id, name, value.clone())?;
                Ok(value)
            }
            Expr::Unary { operator, right } => {
                let operand = self.evaluate(right)?;
                operators::unary(operator, operand)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                operators::binary(operator, left, right)
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                let decided = match operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if decided { Ok(left) } else { self.evaluate(right) }
            }
            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
            Expr::HostEscape { keyword, code } => {
                let code = self.evaluate(code)?.to_string();
                self.host
                    .dispatch(&code)
                    .map_err(|kind| RuntimeError::new(keyword, kind))
            }
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, RuntimeError> {
        let function = match self.evaluate(callee)? {
            Value::Callable(function) => function,
            other => {
                return Err(RuntimeError::new(
                    paren,
                    RuntimeErrorKind::NotCallable {
                        type_name: other.type_name(),
                    },
                ));
            }
        };

        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }

        if values.len() != function.arity() {
            return Err(RuntimeError::new(
                paren,
                RuntimeErrorKind::Arity {
                    name: function.name().to_string(),
                    expected: function.arity(),
                    found: values.len(),
                },
            ));
        }

        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::new(
                paren,
                RuntimeErrorKind::StackOverflow {
                    limit: self.config.max_call_depth,
                },
            ));
        }

        let caller_name = match callee {
            Expr::Variable { name, .. } => name.lexeme.as_str(),
            _ => function.name(),
        };
        let caller = Token::identifier(caller_name, paren.line);

        self.call_depth += 1;
        let result = function.call(self, values, &caller);
        self.call_depth -= 1;
        result
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, RuntimeError> {
        if !self.config.use_resolver {
            return self.environment.get(name);
        }
        match self.locals.get(&id) {
            Some(&depth) => self.environment.get_at(depth, name),
            None => self.globals.get(name),
        }
    }

    fn assign_variable(&self, id: ExprId, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if !self.config.use_resolver {
            return self.environment.assign(name, value);
        }
        match self.locals.get(&id) {
            Some(&depth) => self.environment.assign_at(depth, name, value),
            None => self.globals.assign(name, value),
        }
    }
}

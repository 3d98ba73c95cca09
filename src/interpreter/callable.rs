use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::ast::FunctionDecl;
use crate::builtins::BuiltinFunction;
use crate::token::Token;

use super::Interpreter;
use super::environment::EnvRef;
use super::error::{RuntimeError, RuntimeErrorKind};
use super::runtime::ExecResult;
use super::value::Value;

/// Anything a call expression can invoke.
///
/// `caller` is an identifier token carrying the name the callee was reached
/// through and the line of the call, for diagnostics raised inside the call.
pub trait Callable: fmt::Debug {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        caller: &Token,
    ) -> Result<Value, RuntimeError>;

    fn display_name(&self) -> String {
        format!("<fn {}>", self.name())
    }
}

/// A user-defined function together with the environment it was declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.declaration.name.lexeme)
            .field("arity", &self.declaration.params.len())
            .finish()
    }
}

impl Callable for LoxFunction {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        caller: &Token,
    ) -> Result<Value, RuntimeError> {
        trace!(function = self.name(), caller = %caller.lexeme, line = caller.line, depth = interpreter.call_depth(), "call");
        let environment = EnvRef::child(&self.closure);
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(param.lexeme.as_str(), argument);
        }
        match interpreter.execute_block(&self.declaration.body, environment)? {
            ExecResult::Continue => Ok(Value::Nil),
            ExecResult::Return(value) => Ok(value),
        }
    }
}

/// A function implemented by the interpreter itself.
#[derive(Debug, Clone, Copy)]
pub struct NativeFunction {
    builtin: BuiltinFunction,
}

impl NativeFunction {
    pub fn new(builtin: BuiltinFunction) -> Self {
        Self { builtin }
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        self.builtin.name()
    }

    fn arity(&self) -> usize {
        self.builtin.arity()
    }

    fn call(
        &self,
        _interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        caller: &Token,
    ) -> Result<Value, RuntimeError> {
        self.builtin.invoke(&arguments).map_err(|message| {
            RuntimeError::new(
                caller,
                RuntimeErrorKind::Native {
                    name: self.name().to_string(),
                    message,
                },
            )
        })
    }

    fn display_name(&self) -> String {
        format!("<native fn {}>", self.name())
    }
}

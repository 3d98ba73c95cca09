use thiserror::Error;

use crate::token::Token;

/// A failure raised while executing a program, tied to the token it
/// happened at so the diagnostic can name a line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct RuntimeError {
    pub token: Token,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(token: &Token, kind: RuntimeErrorKind) -> Self {
        Self {
            token: token.clone(),
            kind,
        }
    }

    pub fn line(&self) -> usize {
        self.token.line
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be numbers or strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Cannot add string to number.")]
    CannotAddStringToNumber,
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("Integer overflow in '{operator}'.")]
    Overflow { operator: String },
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String },
    #[error("Can only call functions, got {type_name}.")]
    NotCallable { type_name: &'static str },
    #[error("{name} expected {expected} arguments but received {found}.")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Stack overflow: more than {limit} nested calls.")]
    StackOverflow { limit: usize },
    #[error("Host extensions are disabled.")]
    HostDisabled,
    #[error("Unknown host command '{command}'.")]
    UnknownHostCommand { command: String },
    #[error("Host command '{command}' failed: {message}")]
    HostCommandFailed { command: String, message: String },
    #[error("{name}: {message}")]
    Native { name: String, message: String },
    #[error("Can't return from top-level code.")]
    ReturnOutsideFunction,
    #[error("Failed to write output: {message}")]
    Output { message: String },
    #[error("Internal error: {message}")]
    Internal { message: String },
}

use std::fmt;
use std::rc::Rc;

use crate::ast::LiteralValue;

use super::callable::Callable;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(i64),
    Str(Rc<str>),
    Callable(Rc<dyn Callable>),
}

impl Value {
    pub fn string(text: impl Into<Rc<str>>) -> Self {
        Value::Str(text.into())
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Callable(_) => "function",
        }
    }
}

/// Value equality: numbers, booleans and strings compare by content, `nil`
/// equals only `nil`, and callables compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Number(left), Value::Number(right)) => left == right,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::Callable(left), Value::Callable(right)) => {
                std::ptr::addr_eq(Rc::as_ptr(left), Rc::as_ptr(right))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value}"),
            Value::Callable(callable) => write!(f, "{}", callable.display_name()),
        }
    }
}

impl From<&LiteralValue> for Value {
    fn from(literal: &LiteralValue) -> Self {
        match literal {
            LiteralValue::Nil => Value::Nil,
            LiteralValue::Bool(value) => Value::Bool(*value),
            LiteralValue::Number(value) => Value::Number(*value),
            LiteralValue::Str(value) => Value::Str(Rc::clone(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::Number(1), Value::Number(1));
        let built = format!("{}{}", "ab", "c");
        assert_eq!(Value::string("abc"), Value::string(built));
        assert_ne!(Value::Number(1), Value::string("1"));
        assert_ne!(Value::Nil, Value::Bool(false));
    }

    #[test]
    fn renders_canonical_text() {
        assert_eq!(Value::Number(-12).to_string(), "-12");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::string("hi").to_string(), "hi");
    }
}

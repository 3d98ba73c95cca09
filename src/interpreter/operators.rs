//! Arithmetic, comparison and equality on runtime values.

use crate::token::{Token, TokenKind};

use super::error::{RuntimeError, RuntimeErrorKind};
use super::value::Value;

pub(super) fn unary(operator: &Token, operand: Value) -> Result<Value, RuntimeError> {
    match operator.kind {
        TokenKind::Minus => {
            let value = number_operand(operator, &operand)?;
            value
                .checked_neg()
                .map(Value::Number)
                .ok_or_else(|| overflow(operator))
        }
        TokenKind::Bang => Ok(Value::Bool(!operand.is_truthy())),
        _ => Err(unexpected_operator(operator)),
    }
}

pub(super) fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator.kind {
        TokenKind::Plus | TokenKind::PlusEqual => add(operator, left, right),
        TokenKind::Minus | TokenKind::MinusEqual => arithmetic(operator, &left, &right, i64::checked_sub),
        TokenKind::Star => arithmetic(operator, &left, &right, i64::checked_mul),
        TokenKind::Slash => {
            let (dividend, divisor) = number_operands(operator, &left, &right)?;
            if divisor == 0 {
                return Err(RuntimeError::new(operator, RuntimeErrorKind::DivisionByZero));
            }
            dividend
                .checked_div(divisor)
                .map(Value::Number)
                .ok_or_else(|| overflow(operator))
        }
        TokenKind::Greater => compare(operator, &left, &right, |a, b| a > b),
        TokenKind::GreaterEqual => compare(operator, &left, &right, |a, b| a >= b),
        TokenKind::Less => compare(operator, &left, &right, |a, b| a < b),
        TokenKind::LessEqual => compare(operator, &left, &right, |a, b| a <= b),
        TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
        TokenKind::BangEqual => Ok(Value::Bool(left != right)),
        _ => Err(unexpected_operator(operator)),
    }
}

/// `+` concatenates when the left operand is a string, appending a number
/// in its text form. A number on the left only accepts another number.
fn add(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => a
            .checked_add(*b)
            .map(Value::Number)
            .ok_or_else(|| overflow(operator)),
        (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Str(a), Value::Number(b)) => Ok(Value::string(format!("{a}{b}"))),
        (Value::Number(_), Value::Str(_)) => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::CannotAddStringToNumber,
        )),
        _ => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
        )),
    }
}

fn arithmetic(
    operator: &Token,
    left: &Value,
    right: &Value,
    apply: fn(i64, i64) -> Option<i64>,
) -> Result<Value, RuntimeError> {
    let (a, b) = number_operands(operator, left, right)?;
    apply(a, b).map(Value::Number).ok_or_else(|| overflow(operator))
}

fn compare(
    operator: &Token,
    left: &Value,
    right: &Value,
    apply: fn(i64, i64) -> bool,
) -> Result<Value, RuntimeError> {
    let (a, b) = number_operands(operator, left, right)?;
    Ok(Value::Bool(apply(a, b)))
}

fn number_operand(operator: &Token, operand: &Value) -> Result<i64, RuntimeError> {
    match operand {
        Value::Number(value) => Ok(*value),
        _ => Err(RuntimeError::new(operator, RuntimeErrorKind::OperandMustBeNumber)),
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(i64, i64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(operator, RuntimeErrorKind::OperandsMustBeNumbers)),
    }
}

fn overflow(operator: &Token) -> RuntimeError {
    RuntimeError::new(
        operator,
        RuntimeErrorKind::Overflow {
            operator: operator.lexeme.clone(),
        },
    )
}

fn unexpected_operator(operator: &Token) -> RuntimeError {
    RuntimeError::new(
        operator,
        RuntimeErrorKind::Internal {
            message: format!("'{}' is not an operator", operator.lexeme),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, None, 1)
    }

    fn num(value: i64) -> Value {
        Value::Number(value)
    }

    #[test]
    fn integer_division_truncates() {
        let slash = op(TokenKind::Slash, "/");
        assert_eq!(binary(&slash, num(7), num(2)), Ok(num(3)));
        assert_eq!(binary(&slash, num(-7), num(2)), Ok(num(-3)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let slash = op(TokenKind::Slash, "/");
        let error = binary(&slash, num(1), num(0)).expect_err("expected error");
        assert_eq!(error.kind, RuntimeErrorKind::DivisionByZero);
    }

    #[test]
    fn plus_is_asymmetric() {
        let plus = op(TokenKind::Plus, "+");
        assert_eq!(binary(&plus, Value::string("x"), num(5)), Ok(Value::string("x5")));
        let error = binary(&plus, num(5), Value::string("x")).expect_err("expected error");
        assert_eq!(error.to_string(), "Cannot add string to number.");
        let error = binary(&plus, Value::Nil, num(1)).expect_err("expected error");
        assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbersOrStrings);
    }

    #[test]
    fn compound_tokens_behave_like_plain_operators() {
        assert_eq!(binary(&op(TokenKind::PlusEqual, "+="), num(2), num(3)), Ok(num(5)));
        assert_eq!(binary(&op(TokenKind::MinusEqual, "-="), num(2), num(3)), Ok(num(-1)));
    }

    #[test]
    fn comparisons_need_numbers() {
        let less = op(TokenKind::Less, "<");
        assert_eq!(binary(&less, num(1), num(2)), Ok(Value::Bool(true)));
        let error = binary(&less, Value::string("a"), num(2)).expect_err("expected error");
        assert_eq!(error.kind, RuntimeErrorKind::OperandsMustBeNumbers);
    }

    #[test]
    fn equality_and_inequality_are_negations() {
        let equal = op(TokenKind::EqualEqual, "==");
        let not_equal = op(TokenKind::BangEqual, "!=");
        for (left, right) in [
            (Value::Nil, Value::Nil),
            (num(1), num(2)),
            (Value::string("a"), Value::string("a")),
            (Value::Bool(true), num(1)),
        ] {
            let eq = binary(&equal, left.clone(), right.clone()).expect("==");
            let ne = binary(&not_equal, left, right).expect("!=");
            assert_eq!(eq, Value::Bool(!ne.is_truthy()));
        }
    }

    #[test]
    fn overflow_is_reported() {
        let star = op(TokenKind::Star, "*");
        let error = binary(&star, num(i64::MAX), num(2)).expect_err("expected error");
        assert_eq!(error.to_string(), "Integer overflow in '*'.");
        let minus = op(TokenKind::Minus, "-");
        assert!(unary(&minus, num(i64::MIN)).is_err());
    }

    #[test]
    fn unary_operators() {
        let minus = op(TokenKind::Minus, "-");
        let bang = op(TokenKind::Bang, "!");
        assert_eq!(unary(&minus, num(4)), Ok(num(-4)));
        assert_eq!(unary(&bang, Value::Nil), Ok(Value::Bool(true)));
        assert_eq!(unary(&bang, num(0)), Ok(Value::Bool(false)));
        let error = unary(&minus, Value::string("a")).expect_err("expected error");
        assert_eq!(error.kind, RuntimeErrorKind::OperandMustBeNumber);
    }
}

//! Character classes used by the scanner.

pub fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_continue(c: char) -> bool {
    is_identifier_start(c) || is_digit(c)
}

/// Insignificant whitespace. Newlines are not included: they advance the line counter.
pub fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

use std::{iter::Peekable, str::CharIndices};

use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticSink, Phase};
use crate::token::{Literal, Token, TokenKind};

pub mod classify;
pub mod error;

use classify::{is_digit, is_identifier_continue, is_identifier_start, is_whitespace};
pub use error::{ScanError, ScanFailure};

pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tokens: Vec::new(),
            errors: Vec::new(),
            line: 1,
        }
    }

    /// Scans the whole input. Errors do not stop the scan; they are collected
    /// and reported together once the input is exhausted.
    pub fn scan(mut self, sink: &mut dyn DiagnosticSink) -> Result<Vec<Token>, ScanFailure> {
        while let Some((start, ch)) = self.advance_char() {
            self.scan_token(start, ch);
        }

        if !self.errors.is_empty() {
            for error in &self.errors {
                sink.report(Diagnostic::at_line(Phase::Scan, error.line(), error.to_string()));
            }
            debug!(errors = self.errors.len(), "scan failed");
            return Err(ScanFailure {
                errors: self.errors,
            });
        }

        self.tokens.push(Token::new(TokenKind::Eof, "", None, self.line));
        debug!(tokens = self.tokens.len(), "scanned source");
        Ok(self.tokens)
    }

    fn scan_token(&mut self, start: usize, ch: char) {
        match ch {
            '(' => self.add_token(TokenKind::LeftParen, start),
            ')' => self.add_token(TokenKind::RightParen, start),
            '{' => self.add_token(TokenKind::LeftBrace, start),
            '}' => self.add_token(TokenKind::RightBrace, start),
            ',' => self.add_token(TokenKind::Comma, start),
            '.' => self.add_token(TokenKind::Dot, start),
            ';' => self.add_token(TokenKind::Semicolon, start),
            ':' => self.add_token(TokenKind::Colon, start),
            '?' => self.add_token(TokenKind::Question, start),
            '*' => self.add_token(TokenKind::Star, start),
            '!' => self.add_compound(TokenKind::Bang, TokenKind::BangEqual, start),
            '=' => self.add_compound(TokenKind::Equal, TokenKind::EqualEqual, start),
            '<' => self.add_compound(TokenKind::Less, TokenKind::LessEqual, start),
            '>' => self.add_compound(TokenKind::Greater, TokenKind::GreaterEqual, start),
            '-' => self.add_compound(TokenKind::Minus, TokenKind::MinusEqual, start),
            '+' => self.add_compound(TokenKind::Plus, TokenKind::PlusEqual, start),
            '&' | '|' => {
                // no bitwise operators: only the doubled form exists
                if self.match_char(ch) {
                    let kind = if ch == '&' { TokenKind::And } else { TokenKind::Or };
                    self.add_token(kind, start);
                } else {
                    self.unexpected(ch);
                }
            }
            '/' => {
                if self.match_char('/') {
                    self.skip_line_comment();
                } else if self.match_char('*') {
                    self.skip_block_comment();
                } else {
                    self.add_token(TokenKind::Slash, start);
                }
            }
            '"' => self.read_string(start),
            '\n' => {}
            c if is_whitespace(c) => {}
            c if is_digit(c) => self.read_number(start),
            c if is_identifier_start(c) => self.read_identifier(start),
            c => self.unexpected(c),
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance_char();
        }
    }

    fn skip_block_comment(&mut self) {
        let line = self.line;
        loop {
            match self.advance_char() {
                None => {
                    self.errors.push(ScanError::UnterminatedComment { line });
                    return;
                }
                Some((_, '*')) if self.match_char('/') => return,
                Some(_) => {}
            }
        }
    }

    fn read_string(&mut self, start: usize) {
        let mut value = String::new();
        loop {
            match self.advance_char() {
                None => {
                    self.errors.push(ScanError::UnterminatedString { line: self.line });
                    return;
                }
                Some((_, '"')) => break,
                Some((_, '\\')) => {
                    // the escaped character is kept verbatim, only the backslash is dropped
                    if let Some((_, escaped)) = self.advance_char() {
                        value.push(escaped);
                    }
                }
                Some((_, c)) => value.push(c),
            }
        }
        self.add_literal(TokenKind::String, start, Literal::Str(value));
    }

    fn read_number(&mut self, start: usize) {
        self.consume_while(is_digit);
        let integer_end = self.current_index();

        if self.peek() == Some('.') && self.peek_second().is_some_and(is_digit) {
            self.advance_char(); // Consume '.'
            self.consume_while(is_digit);
        }

        // Only the integer part is stored; a fractional part is lexed and dropped.
        let integer_part = &self.input[start..integer_end];
        match integer_part.parse::<i64>() {
            Ok(value) => self.add_literal(TokenKind::Number, start, Literal::Number(value)),
            Err(_) => {
                let literal = self.input[start..self.current_index()].to_string();
                self.errors.push(ScanError::NumberTooLarge {
                    literal,
                    line: self.line,
                });
            }
        }
    }

    fn read_identifier(&mut self, start: usize) {
        self.consume_while(is_identifier_continue);
        let word = &self.input[start..self.current_index()];
        let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Identifier);
        self.add_token(kind, start);
    }

    fn unexpected(&mut self, character: char) {
        self.errors.push(ScanError::UnexpectedCharacter {
            character,
            line: self.line,
        });
    }

    fn add_compound(&mut self, single: TokenKind, with_equal: TokenKind, start: usize) {
        let kind = if self.match_char('=') { with_equal } else { single };
        self.add_token(kind, start);
    }

    fn add_token(&mut self, kind: TokenKind, start: usize) {
        let lexeme = &self.input[start..self.current_index()];
        self.tokens.push(Token::new(kind, lexeme, None, self.line));
    }

    fn add_literal(&mut self, kind: TokenKind, start: usize, literal: Literal) {
        let lexeme = &self.input[start..self.current_index()];
        self.tokens.push(Token::new(kind, lexeme, Some(literal), self.line));
    }
}

impl Lexer<'_> {
    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, '\n')) = next {
            self.line += 1;
        }
        next
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance_char();
            true
        } else {
            false
        }
    }

    fn consume_while(&mut self, predicate: fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance_char();
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        lookahead.peek().map(|&(_, c)| c)
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

pub fn tokenize(input: &str, sink: &mut dyn DiagnosticSink) -> Result<Vec<Token>, ScanFailure> {
    Lexer::new(input).scan(sink)
}

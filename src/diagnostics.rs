//! Line-tagged error reporting shared by every phase.
//!
//! Phases never print errors themselves. They hand a [`Diagnostic`] to a
//! [`DiagnosticSink`], which decides where it goes: stderr for the CLI, a
//! vector for tests.

use std::fmt;

use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scan,
    Parse,
    Resolve,
    Runtime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub line: usize,
    /// Source text the error points at, when it points at a token.
    pub location: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn at_line(phase: Phase, line: usize, message: impl Into<String>) -> Self {
        Self {
            phase,
            line,
            location: None,
            message: message.into(),
        }
    }

    pub fn at_token(phase: Phase, token: &Token, message: impl Into<String>) -> Self {
        Self {
            phase,
            line: token.line,
            location: Some(token.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[line {}] Error at {location}: {}", self.line, self.message),
            None => write!(f, "[line {}] Error: {}", self.line, self.message),
        }
    }
}

pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Writes each diagnostic to stderr as soon as it arrives.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        eprintln!("{diagnostic}");
    }
}

/// Keeps every diagnostic for later inspection.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }
}

//! A tree-walking interpreter for a small Lox dialect with integer numbers.
//!
//! Source goes through four phases: [`lexer`], [`parser`], [`resolver`] and
//! [`interpreter`]. [`Session`] runs them in order and keeps interpreter
//! state between runs.

use thiserror::Error;

pub mod ast;
pub mod builtins;
pub mod config;
pub mod diagnostics;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod resolver;
mod stack;
pub mod token;

pub use config::Config;
use diagnostics::DiagnosticSink;
use interpreter::output::Output;
use interpreter::{Interpreter, RuntimeError};
use lexer::ScanFailure;
use parser::ParseFailure;
use resolver::ResolveFailure;

/// Why a run stopped. Details have already gone to the diagnostic sink.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanFailure),
    #[error(transparent)]
    Parse(#[from] ParseFailure),
    #[error(transparent)]
    Resolve(#[from] ResolveFailure),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl RunError {
    /// Conventional sysexits code: 65 for bad input, 70 for runtime failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Scan(_) | RunError::Parse(_) | RunError::Resolve(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
    ids: ast::NodeIds,
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            interpreter: Interpreter::new(config),
            ids: ast::NodeIds::new(),
            config,
        }
    }

    pub fn with_output(config: Config, output: Output) -> Self {
        Self {
            interpreter: Interpreter::with_output(config, output),
            ids: ast::NodeIds::new(),
            config,
        }
    }

    /// Scans, parses, resolves and executes `source`. Globals defined by
    /// earlier runs stay visible.
    pub fn run(&mut self, source: &str, sink: &mut dyn DiagnosticSink) -> Result<(), RunError> {
        let tokens = lexer::tokenize(source, sink)?;
        let statements = parser::parse_tokens(tokens, &mut self.ids, sink)?;
        if self.config.use_resolver {
            let locals = resolver::resolve(&statements, sink)?;
            self.interpreter.resolve(locals);
        }
        self.interpreter.interpret(&statements, sink)?;
        Ok(())
    }

    pub fn take_output(&mut self) -> String {
        self.interpreter.take_output()
    }
}

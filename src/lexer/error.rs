use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Unexpected character '{character}'")]
    UnexpectedCharacter { character: char, line: usize },
    #[error("Unterminated string")]
    UnterminatedString { line: usize },
    #[error("Unterminated block comment")]
    UnterminatedComment { line: usize },
    #[error("Number literal '{literal}' is too large")]
    NumberTooLarge { literal: String, line: usize },
}

impl ScanError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { line, .. }
            | Self::UnterminatedString { line }
            | Self::UnterminatedComment { line }
            | Self::NumberTooLarge { line, .. } => *line,
        }
    }
}

/// Returned instead of tokens when at least one scan error occurred.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("scanning failed with {} error(s)", errors.len())]
pub struct ScanFailure {
    pub errors: Vec<ScanError>,
}

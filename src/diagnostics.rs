use std::fmt;

use thiserror::Error;

/// Represents a byte span within a registered source snippet. Offsets are
/// global across the owning [`SourceSet`](crate::ast::SourceSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A resolved source location: snippet name plus 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub name: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.name, self.line, self.col)
    }
}

/// An evaluation or parse error. The position is attached the first time
/// the error crosses an evaluation boundary and never rewritten after
/// that, so re-evaluating the same source yields identical messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub message: String,
    pub pos: Option<Position>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            pos: None,
        }
    }

    pub fn at(message: impl Into<String>, pos: Position) -> Self {
        Self {
            message: message.into(),
            pos: Some(pos),
        }
    }

    /// Attaches `pos` unless the error already carries a position.
    pub fn with_pos(mut self, pos: Position) -> Self {
        if self.pos.is_none() {
            self.pos = Some(pos);
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for Error {}

/// Unified error type for the sorrel toolchain.
#[derive(Debug, Error)]
pub enum SorrelError {
    #[error("{0}")]
    Eval(#[from] Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SorrelError>;

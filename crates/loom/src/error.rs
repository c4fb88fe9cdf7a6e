//! Hand-rolled error types for each pipeline stage.
//!
//! No `thiserror`/`anyhow`: each stage gets a plain enum implementing
//! `Display`/`Error` by hand, and `Error` wraps them via `From`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Reports a subset violation found by the checker (§6.3). Fatal, not recoverable.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckError {
    pub line: u32,
    pub node_kind: String,
    pub message: String,
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.message, self.node_kind)
    }
}

impl std::error::Error for CheckError {}

/// Codegen invariant violation: a compiler bug, not a user error.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "codegen invariant violated: {}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// A runtime exception, carrying the (type, message) pair tests compare against.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub exc_type: &'static str,
    pub message: String,
}

impl RuntimeError {
    #[must_use]
    pub fn new(exc_type: &'static str, message: impl Into<String>) -> Self {
        Self {
            exc_type,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn name_error(name: &str) -> Self {
        Self::new("NameError", format!("name '{name}' is not defined"))
    }

    #[must_use]
    pub fn unbound_local(name: &str) -> Self {
        Self::new(
            "UnboundLocalError",
            format!("local variable '{name}' referenced before assignment"),
        )
    }

    #[must_use]
    pub fn attribute_error(type_name: &str, attr: &str) -> Self {
        Self::new(
            "AttributeError",
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }

    #[must_use]
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message.into())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.exc_type)
        } else {
            write!(f, "{}: {}", self.exc_type, self.message)
        }
    }
}

impl std::error::Error for RuntimeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(LexError),
    Parse(ParseError),
    Check(CheckError),
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "{e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Check(e) => write!(f, "{e}"),
            Self::Compile(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<LexError> for Error {
    fn from(e: LexError) -> Self {
        Self::Lex(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<CheckError> for Error {
    fn from(e: CheckError) -> Self {
        Self::Check(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

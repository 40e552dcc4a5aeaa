//! Compiler error types.
//!
//! A generation run fails with exactly one of these and never leaves a
//! partially populated model or partially written stub behind.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// What went wrong on an IDL line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("missing `service` declaration")]
    MissingService,

    #[error("duplicate `service` declaration (already declared `{0}`)")]
    DuplicateService(String),

    #[error("method declared before `service`")]
    MethodBeforeService,

    #[error("malformed method signature: expected {expected}, found {found}")]
    MalformedSignature {
        expected: &'static str,
        found: String,
    },

    #[error("malformed service declaration: expected {expected}, found {found}")]
    MalformedService {
        expected: &'static str,
        found: String,
    },

    #[error("empty method name")]
    EmptyMethodName,

    #[error("unsupported type `{0}` (expected int, float, string or bool)")]
    UnsupportedType(String),

    #[error("duplicate method `{0}`")]
    DuplicateMethod(String),

    #[error("duplicate field `{0}`")]
    DuplicateField(String),

    #[error("expected exactly one return value, found {0}")]
    ReturnArity(usize),

    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),
}

/// A parse failure located at a line and column of the IDL source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number. Points one past the last line for errors
    /// detected at end of input.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// Text of the offending line (empty at end of input).
    pub text: String,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, column: usize, text: &str, kind: ParseErrorKind) -> Self {
        Self {
            line,
            column,
            text: text.to_owned(),
            kind,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.kind)?;
        if !self.text.is_empty() {
            write!(f, " in `{}`", self.text.trim())?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Failure while rendering or writing stubs.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("failed to render {stub} stub: {source}")]
    Render {
        stub: &'static str,
        #[source]
        source: askama::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Any failure of a complete generation run.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to read IDL file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IDL parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("stub generation failed: {0}")]
    Generation(#[from] GenerationError),
}

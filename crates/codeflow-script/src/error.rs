//! Error types for the script runtime.
//!
//! [`ParseError`] covers everything that can go wrong before execution
//! starts. [`Raised`] is an exception travelling through the interpreter; once
//! it escapes the module it is the traced unit's failure.

use codeflow_core::ExceptionInfo;

/// Lexing or parsing failure with the position it was detected at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }
}

/// One frame an exception passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackEntry {
    pub function: String,
    pub file: String,
    pub line: u32,
}

/// An exception raised inside the script.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{info}")]
pub struct Raised {
    pub info: ExceptionInfo,
    /// Frames the exception passed through, innermost first.
    pub traceback: Vec<TracebackEntry>,
    /// Frame depth at which the exception was last reported.
    pub(crate) reported_depth: usize,
}

impl Raised {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Raised::from_info(ExceptionInfo::new(type_name, message))
    }

    pub fn from_info(info: ExceptionInfo) -> Self {
        Raised {
            info,
            traceback: Vec::new(),
            reported_depth: 0,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.info.type_name
    }

    pub fn message(&self) -> &str {
        &self.info.message
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Raised::new("TypeError", message)
    }

    pub(crate) fn value_error(message: impl Into<String>) -> Self {
        Raised::new("ValueError", message)
    }

    pub(crate) fn zero_division(message: impl Into<String>) -> Self {
        Raised::new("ZeroDivisionError", message)
    }

    pub(crate) fn overflow() -> Self {
        Raised::new("OverflowError", "integer overflow")
    }
}

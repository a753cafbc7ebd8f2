//! Interpreter Errors
//!
//! A single enum carries both shell control flow and runtime failures
//! up the call stack:
//! - break / continue: unwind to the nearest enclosing loop
//! - return: unwind to the function (or sourced script) boundary
//! - exit / errexit: unwind the whole runner
//! - expansion and arithmetic failures: reported at the statement boundary
//!
//! `ShellError` is the narrower type handed to embedders.

use thiserror::Error;

use crate::parser::ParseException;

/// Failures that abort a whole run regardless of shell options.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("break")]
    Break(u32),
    #[error("continue")]
    Continue(u32),
    #[error("return")]
    Return(i32),
    #[error("exit")]
    Exit(i32),
    /// `set -e` saw a failing command
    #[error("errexit: command exited with status {0}")]
    Errexit(i32),
    #[error("{0}: unbound variable")]
    Nounset(String),
    #[error("{0}")]
    Expansion(String),
    #[error("{0}")]
    Arithmetic(String),
    #[error("{0}: bad substitution")]
    BadSubstitution(String),
    #[error("no match: {0}")]
    Glob(String),
    #[error("{0}")]
    Runtime(String),
    #[error("{0}")]
    Limit(String),
    #[error("{0}")]
    Parse(#[from] ParseException),
    #[error("execution cancelled")]
    Cancelled,
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl InterpreterError {
    /// Errors that fail the current statement with status 1 and let the
    /// script continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InterpreterError::Expansion(_)
                | InterpreterError::Arithmetic(_)
                | InterpreterError::BadSubstitution(_)
                | InterpreterError::Glob(_)
                | InterpreterError::Runtime(_)
                | InterpreterError::Parse(_)
        )
    }

    /// Status a runner reports when this error ends it.
    pub fn exit_status(&self) -> i32 {
        match self {
            InterpreterError::Exit(code) | InterpreterError::Errexit(code) | InterpreterError::Return(code) => *code,
            InterpreterError::Break(_) | InterpreterError::Continue(_) => 0,
            InterpreterError::Parse(_) => 2,
            InterpreterError::Cancelled => 130,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for InterpreterError {
    fn from(e: std::io::Error) -> Self {
        InterpreterError::Fatal(FatalError::Io(e))
    }
}

/// Shell-style text for an I/O error, without the `(os error N)` suffix.
pub fn io_message(err: &std::io::Error) -> String {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::NotFound => "No such file or directory".to_string(),
        ErrorKind::PermissionDenied => "Permission denied".to_string(),
        ErrorKind::AlreadyExists => "cannot overwrite existing file".to_string(),
        ErrorKind::IsADirectory => "Is a directory".to_string(),
        ErrorKind::NotADirectory => "Not a directory".to_string(),
        _ => {
            let text = err.to_string();
            match text.find(" (os error") {
                Some(i) => text[..i].to_string(),
                None => text,
            }
        }
    }
}

/// What `Shell::run` reports besides a plain exit status.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseException),
    #[error(transparent)]
    Fatal(#[from] FatalError),
    /// Expansion failure from `Shell::expand_literal`/`expand_fields`, or a
    /// rejected `Shell::set_var`
    #[error("{0}")]
    Expansion(String),
    #[error("execution cancelled")]
    Cancelled,
}

impl From<InterpreterError> for ShellError {
    fn from(e: InterpreterError) -> Self {
        match e {
            InterpreterError::Parse(e) => ShellError::Parse(e),
            InterpreterError::Fatal(e) => ShellError::Fatal(e),
            InterpreterError::Cancelled => ShellError::Cancelled,
            other => ShellError::Expansion(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(InterpreterError::Arithmetic("division by 0".into()).is_recoverable());
        assert!(InterpreterError::BadSubstitution("${x".into()).is_recoverable());
        assert!(!InterpreterError::Nounset("x".into()).is_recoverable());
        assert!(!InterpreterError::Exit(3).is_recoverable());
        assert!(!InterpreterError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(InterpreterError::Exit(7).exit_status(), 7);
        assert_eq!(InterpreterError::Errexit(2).exit_status(), 2);
        assert_eq!(InterpreterError::Nounset("x".into()).exit_status(), 1);
    }

    #[test]
    fn test_shell_error_conversion() {
        assert!(matches!(ShellError::from(InterpreterError::Cancelled), ShellError::Cancelled));
        let e = ShellError::from(InterpreterError::Nounset("X".into()));
        assert_eq!(e.to_string(), "X: unbound variable");
    }

    #[test]
    fn test_display() {
        assert_eq!(InterpreterError::Nounset("FOO".into()).to_string(), "FOO: unbound variable");
        assert_eq!(InterpreterError::BadSubstitution("${}".into()).to_string(), "${}: bad substitution");
    }
}

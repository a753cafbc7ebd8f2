//! Builtin Commands
//!
//! This module contains implementations of shell builtin commands. Every
//! builtin runs in-process against the calling runner and has the same
//! signature: the runner plus the arguments after the command name.

pub mod break_cmd;
pub mod cd_cmd;
pub mod continue_cmd;
pub mod declare_cmd;
pub mod declare_print;
pub mod echo_cmd;
pub mod eval_cmd;
pub mod exec_cmd;
pub mod exit_cmd;
pub mod export_cmd;
pub mod let_cmd;
pub mod printf_cmd;
pub mod read_cmd;
pub mod return_cmd;
pub mod set_cmd;
pub mod shift_cmd;
pub mod shopt_cmd;
pub mod source_cmd;
pub mod test_cmd;
pub mod trap_cmd;
pub mod type_cmd;
pub mod unset_cmd;
pub mod wait_cmd;

use std::io;

use crate::interpreter::errors::{io_message, InterpreterError};
use crate::interpreter::runner::{ExecResult, Runner};

/// Signature shared by all builtins.
pub type BuiltinFn = fn(&mut Runner, &[String]) -> ExecResult;

/// Every builtin name, sorted.
pub const BUILTIN_NAMES: &[&str] = &[
    ".", ":", "[", "break", "builtin", "cd", "command", "continue", "declare", "echo", "eval", "exec", "exit",
    "export", "false", "let", "local", "printf", "pwd", "read", "readonly", "return", "set", "shift", "shopt",
    "source", "test", "trap", "true", "type", "typeset", "unset", "wait",
];

pub fn lookup(name: &str) -> Option<BuiltinFn> {
    Some(match name {
        ":" | "true" => handle_true,
        "false" => handle_false,
        "." | "source" => source_cmd::handle_source,
        "[" => test_cmd::handle_bracket,
        "test" => test_cmd::handle_test,
        "break" => break_cmd::handle_break,
        "continue" => continue_cmd::handle_continue,
        "builtin" => type_cmd::handle_builtin,
        "command" => type_cmd::handle_command,
        "type" => type_cmd::handle_type,
        "cd" => cd_cmd::handle_cd,
        "pwd" => cd_cmd::handle_pwd,
        "declare" | "typeset" => declare_cmd::handle_declare,
        "local" => declare_cmd::handle_local,
        "export" => export_cmd::handle_export,
        "readonly" => export_cmd::handle_readonly,
        "echo" => echo_cmd::handle_echo,
        "printf" => printf_cmd::handle_printf,
        "eval" => eval_cmd::handle_eval,
        "exec" => exec_cmd::handle_exec,
        "exit" => exit_cmd::handle_exit,
        "return" => return_cmd::handle_return,
        "let" => let_cmd::handle_let,
        "read" => read_cmd::handle_read,
        "set" => set_cmd::handle_set,
        "shift" => shift_cmd::handle_shift,
        "shopt" => shopt_cmd::handle_shopt,
        "trap" => trap_cmd::handle_trap,
        "unset" => unset_cmd::handle_unset,
        "wait" => wait_cmd::handle_wait,
        _ => return None,
    })
}

fn handle_true(_runner: &mut Runner, _args: &[String]) -> ExecResult {
    Ok(0)
}

fn handle_false(_runner: &mut Runner, _args: &[String]) -> ExecResult {
    Ok(1)
}

/// Write builtin output to stdout. A closed reader ends the command the
/// way SIGPIPE would (status 141).
pub(crate) fn write_stdout(runner: &Runner, name: &str, text: &str) -> ExecResult {
    match runner.write_out(text) {
        Ok(()) => Ok(0),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Err(InterpreterError::Exit(141)),
        Err(e) => {
            runner.report(format!("{}: write error: {}", name, io_message(&e)));
            Ok(1)
        }
    }
}

/// Report `name: message` and return `status`.
pub(crate) fn fail(runner: &Runner, name: &str, message: impl std::fmt::Display, status: i32) -> ExecResult {
    runner.report(format!("{}: {}", name, message));
    Ok(status)
}

/// Numeric argument of exit/return/break/continue/shift.
pub(crate) fn parse_count(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix(['-', '+']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}


#[cfg(test)]
mod tests {
    use super::test_support::run;
    use super::*;

    #[test]
    fn test_names_resolve() {
        for name in BUILTIN_NAMES {
            assert!(lookup(name).is_some(), "{}", name);
        }
        assert!(lookup("ls").is_none());
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3"), Some(3));
        assert_eq!(parse_count(" -2 "), Some(-2));
        assert_eq!(parse_count("x"), None);
        assert_eq!(parse_count("-"), None);
    }

    #[test]
    fn test_true_false_colon() {
        assert_eq!(run("true").0, 0);
        assert_eq!(run("false").0, 1);
        assert_eq!(run(": ignored args").0, 0);
    }
}

//! break - Exit from loops builtin
//!
//! break [n]
//!
//! Leaves the n innermost enclosing loops (default 1). Outside a loop it
//! prints a warning and does nothing.

use super::{fail, parse_count};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};

/// Levels for break/continue, clamped to the loops actually open.
pub(crate) fn loop_levels(runner: &Runner, name: &str, args: &[String]) -> Result<u32, ExecResult> {
    if runner.loop_depth == 0 {
        return Err(fail(runner, name, "only meaningful in a `for', `while', or `until' loop", 0));
    }
    if args.len() > 1 {
        return Err(fail(runner, name, "too many arguments", 1));
    }
    let levels = match args.first() {
        None => 1,
        Some(arg) => match parse_count(arg) {
            Some(n) if n >= 1 => n,
            Some(_) => return Err(fail(runner, name, format!("{}: loop count out of range", arg), 1)),
            None => return Err(fail(runner, name, format!("{}: numeric argument required", arg), 1)),
        },
    };
    Ok(levels.min(runner.loop_depth as i64) as u32)
}

pub fn handle_break(runner: &mut Runner, args: &[String]) -> ExecResult {
    match loop_levels(runner, "break", args) {
        Ok(levels) => Err(InterpreterError::Break(levels)),
        Err(result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_break_outside_loop() {
        let (status, out, err) = run("break; echo after");
        assert_eq!(status, 0);
        assert_eq!(out, "after\n");
        assert!(err.contains("only meaningful"));
    }

    #[test]
    fn test_break_levels_are_clamped() {
        assert_eq!(run("for i in 1 2; do for j in 1 2; do break 9; done; echo inner; done; echo out").1, "out\n");
    }

    #[test]
    fn test_break_bad_count() {
        let (_, out, err) = run("for i in 1; do break 0; echo still; done");
        assert_eq!(out, "still\n");
        assert!(err.contains("loop count out of range"));
    }

    #[test]
    fn test_break_inside_function_called_from_loop() {
        // Loops do not extend into function bodies.
        let (_, out, _) = run("f() { break; }; for i in 1 2; do f; echo $i; done");
        assert_eq!(out, "1\n2\n");
    }
}

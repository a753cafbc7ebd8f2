//! continue - Skip to the next loop iteration builtin
//!
//! continue [n]
//!
//! Resumes the next iteration of the n-th enclosing loop (default 1).

use super::break_cmd::loop_levels;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_continue(runner: &mut Runner, args: &[String]) -> ExecResult {
    match loop_levels(runner, "continue", args) {
        Ok(levels) => Err(InterpreterError::Continue(levels)),
        Err(result) => result,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_continue_skips_rest_of_body() {
        assert_eq!(run("for i in 1 2 3; do [ $i = 2 ] && continue; echo $i; done").1, "1\n3\n");
    }

    #[test]
    fn test_continue_in_while() {
        let script = "i=0; while [ $i -lt 4 ]; do i=$((i+1)); [ $i = 2 ] && continue; echo $i; done";
        assert_eq!(run(script).1, "1\n3\n4\n");
    }

    #[test]
    fn test_continue_outside_loop() {
        assert_eq!(run("continue; echo $?").1, "0\n");
    }
}

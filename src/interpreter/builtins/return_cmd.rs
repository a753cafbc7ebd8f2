//! return - Return from a function or sourced script
//!
//! return [n]

use super::{fail, parse_count};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_return(runner: &mut Runner, args: &[String]) -> ExecResult {
    if runner.call_depth == 0 && runner.source_depth == 0 {
        return fail(runner, "return", "can only `return' from a function or sourced script", 1);
    }
    let code = match args.first() {
        None => runner.last_status,
        Some(arg) => match parse_count(arg) {
            Some(n) => n.rem_euclid(256) as i32,
            None => {
                runner.report(format!("return: {}: numeric argument required", arg));
                2
            }
        },
    };
    Err(InterpreterError::Return(code))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_return_status() {
        assert_eq!(run("f() { return 3; echo no; }; f; echo $?").1, "3\n");
        assert_eq!(run("f() { false; return; }; f; echo $?").1, "1\n");
    }

    #[test]
    fn test_return_from_nested_loop() {
        assert_eq!(run("f() { for i in 1 2; do while true; do return 5; done; done; }; f; echo $?").1, "5\n");
    }

    #[test]
    fn test_return_outside_function() {
        let (_, out, err) = run("return 1; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("can only `return' from a function or sourced script"));
    }
}

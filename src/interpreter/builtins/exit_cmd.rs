//! exit - Exit the shell
//!
//! exit [n]
//!
//! Without an argument the status of the last command is used. The code
//! is taken modulo 256. The EXIT trap runs on the way out.

use super::parse_count;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_exit(runner: &mut Runner, args: &[String]) -> ExecResult {
    let code = match args.first() {
        None => runner.last_status,
        Some(arg) => match parse_count(arg) {
            Some(n) => n.rem_euclid(256) as i32,
            None => {
                runner.report(format!("exit: {}: numeric argument required", arg));
                2
            }
        },
    };
    if args.len() > 1 {
        runner.report("exit: too many arguments");
        return Ok(1);
    }
    Err(InterpreterError::Exit(code))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_exit_codes() {
        assert_eq!(run("exit 3").0, 3);
        assert_eq!(run("exit 256").0, 0);
        assert_eq!(run("exit -1").0, 255);
        assert_eq!(run("false; exit").0, 1);
    }

    #[test]
    fn test_exit_stops_script() {
        assert_eq!(run("echo a; exit; echo b").1, "a\n");
    }

    #[test]
    fn test_exit_in_subshell_only_leaves_subshell() {
        assert_eq!(run("(exit 7); echo $?").1, "7\n");
    }

    #[test]
    fn test_exit_bad_argument() {
        let (status, _, err) = run("exit abc");
        assert_eq!(status, 2);
        assert!(err.contains("exit: abc: numeric argument required"));
    }
}

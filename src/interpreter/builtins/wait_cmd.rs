//! wait - Wait for background jobs
//!
//! wait          - wait for every job; status 0
//! wait ID...    - wait for the given jobs (`$!` values or `%N`); status
//!                 of the last one

use super::fail;
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_wait(runner: &mut Runner, args: &[String]) -> ExecResult {
    if args.is_empty() {
        runner.wait_all();
        return Ok(0);
    }
    let mut status = 0;
    for arg in args {
        let digits = arg.strip_prefix('%').unwrap_or(arg);
        let Ok(id) = digits.parse::<u32>() else {
            return fail(runner, "wait", format!("`{}': not a pid or valid job spec", arg), 2);
        };
        status = match runner.wait_job(id) {
            Some(code) => code,
            None => {
                runner.report(format!("wait: pid {} is not a child of this shell", id));
                127
            }
        };
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_wait_for_specific_job() {
        assert_eq!(run("(exit 3) & id=$!; wait $id; echo $?").1, "3\n");
        assert_eq!(run("(exit 5) & wait %$!; echo $?").1, "5\n");
    }

    #[test]
    fn test_wait_all() {
        let (_, out, _) = run("(echo one) & (echo two) & wait; echo $?");
        assert!(out.ends_with("0\n"));
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_wait_unknown_job() {
        let (_, out, err) = run("wait 999; echo $?");
        assert_eq!(out, "127\n");
        assert!(err.contains("pid 999 is not a child of this shell"));
    }

    #[test]
    fn test_wait_twice() {
        assert_eq!(run("true & id=$!; wait $id; wait $id; echo $?").1, "127\n");
    }
}

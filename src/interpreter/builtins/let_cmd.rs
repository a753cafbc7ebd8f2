//! let - Evaluate arithmetic expressions
//!
//! let expr [expr ...]
//!
//! Status is 0 when the last expression is nonzero, 1 otherwise.

use super::fail;
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_let(runner: &mut Runner, args: &[String]) -> ExecResult {
    if args.is_empty() {
        return fail(runner, "let", "expression expected", 1);
    }
    let mut last = 0;
    for expr in args {
        last = runner.eval_arith_text(expr)?;
    }
    Ok(if last != 0 { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_let_assigns_and_reports() {
        assert_eq!(run("let x=2+3 y=x*2; echo $x $y").1, "5 10\n");
        assert_eq!(run("let 0; echo $?").1, "1\n");
        assert_eq!(run("let 'n = 4'; echo $? $n").1, "0 4\n");
    }

    #[test]
    fn test_let_via_builtin() {
        assert_eq!(run("builtin let 'z=7'; echo $z").1, "7\n");
        let (_, out, err) = run("builtin let; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("let: expression expected"));
    }

    #[test]
    fn test_let_error() {
        let (_, out, err) = run("let 1/0; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("division by 0"));
    }
}

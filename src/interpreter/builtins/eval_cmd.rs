//! eval - Run arguments as shell source
//!
//! eval [arg ...]
//!
//! Arguments are joined with single spaces, parsed and run in the current
//! environment. Syntax errors give status 2.

use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_eval(runner: &mut Runner, args: &[String]) -> ExecResult {
    let args = match args.first() {
        Some(first) if first == "--" => &args[1..],
        _ => args,
    };
    let source = args.join(" ");
    if source.trim().is_empty() {
        return Ok(0);
    }
    runner.eval_string(&source)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_eval_runs_in_current_shell() {
        assert_eq!(run("eval 'x=5'; echo $x").1, "5\n");
        assert_eq!(run("cmd='echo a; echo b'; eval $cmd").1, "a\nb\n");
        assert_eq!(run("name=v; eval \"$name=assigned\"; echo $v").1, "assigned\n");
    }

    #[test]
    fn test_eval_status() {
        assert_eq!(run("eval false; echo $?").1, "1\n");
        assert_eq!(run("eval; echo $?").1, "0\n");
    }

    #[test]
    fn test_eval_syntax_error() {
        let (_, out, err) = run("eval 'if then'; echo $?");
        assert_eq!(out, "2\n");
        assert!(!err.is_empty());
    }
}

//! shift - Shift positional parameters
//!
//! shift [n]
//!
//! Shifts positional parameters to the left by n (default 1).
//! $n+1 becomes $1, $n+2 becomes $2, etc. A count larger than $# leaves
//! the parameters untouched and returns 1.

use super::{fail, parse_count};
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_shift(runner: &mut Runner, args: &[String]) -> ExecResult {
    if args.len() > 1 {
        return fail(runner, "shift", "too many arguments", 1);
    }
    let n = match args.first() {
        None => 1,
        Some(arg) => match parse_count(arg) {
            Some(n) if n >= 0 => n as usize,
            Some(_) => return fail(runner, "shift", format!("{}: shift count out of range", arg), 1),
            None => return fail(runner, "shift", format!("{}: numeric argument required", arg), 1),
        },
    };
    if n > runner.positional.len() {
        return Ok(1);
    }
    runner.positional.drain(..n);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_shift() {
        assert_eq!(run("set -- a b c; shift; echo $@").1, "b c\n");
        assert_eq!(run("set -- a b c; shift 2; echo $# $1").1, "1 c\n");
        assert_eq!(run("set -- a b; shift 0; echo $1").1, "a\n");
    }

    #[test]
    fn test_shift_too_far() {
        let (_, out, err) = run("set -- a; shift 3; echo $? $1");
        assert_eq!(out, "1 a\n");
        assert_eq!(err, "");
    }

    #[test]
    fn test_shift_bad_count() {
        let (_, out, err) = run("shift x; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("shift: x: numeric argument required"));
    }

    #[test]
    fn test_shift_in_function_is_local() {
        assert_eq!(run("f() { shift; echo $1; }; set -- a b; f x y; echo $1").1, "y\na\n");
    }
}

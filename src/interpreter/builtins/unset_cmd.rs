//! unset - Remove variables/functions builtin
//!
//! Supports:
//! - unset VAR - remove variable (a function when no such variable exists)
//! - unset -v VAR - remove variable only
//! - unset -f FUNC - remove function
//! - unset -n REF - remove a nameref itself rather than its target
//! - unset 'a[i]' - remove array element

use super::fail;
use crate::ast::types::WordNode;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};
use crate::parser::lexer::is_valid_name;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Variable,
    Function,
    Either,
}

/// Split `name[index]`.
fn split_element(arg: &str) -> Option<(&str, &str)> {
    let open = arg.find('[')?;
    if !arg.ends_with(']') {
        return None;
    }
    Some((&arg[..open], &arg[open + 1..arg.len() - 1]))
}

fn unset_variable(runner: &mut Runner, arg: &str, follow_nameref: bool) -> ExecResult<()> {
    let depth = runner.limits.max_nameref_depth;
    if let Some((name, index)) = split_element(arg) {
        if !is_valid_name(name) {
            return Err(InterpreterError::Runtime(format!("unset: `{}': not a valid identifier", arg)));
        }
        if index == "@" || index == "*" {
            let target = runner.env.resolve_name(name, depth).map_err(InterpreterError::Runtime)?;
            return runner.env.unset(&target).map_err(|e| InterpreterError::Runtime(format!("unset: {}", e)));
        }
        let key = runner.element_key(name, &WordNode::literal(index))?;
        let target = runner.env.resolve_name(name, depth).map_err(InterpreterError::Runtime)?;
        return runner
            .env
            .unset_element(&target, key)
            .map_err(|e| InterpreterError::Runtime(format!("unset: {}", e)));
    }
    if !is_valid_name(arg) {
        return Err(InterpreterError::Runtime(format!("unset: `{}': not a valid identifier", arg)));
    }
    let target = if follow_nameref {
        runner.env.resolve_name(arg, depth).map_err(InterpreterError::Runtime)?
    } else {
        arg.to_string()
    };
    runner.env.unset(&target).map_err(|e| InterpreterError::Runtime(format!("unset: {}", e)))
}

/// Handle the unset builtin command
pub fn handle_unset(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut mode = Mode::Either;
    let mut follow_nameref = true;
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            i += 1;
            break;
        }
        if arg.len() < 2 || !arg.starts_with('-') {
            break;
        }
        for c in arg[1..].chars() {
            match c {
                'v' => mode = Mode::Variable,
                'f' => mode = Mode::Function,
                'n' => follow_nameref = false,
                _ => return fail(runner, "unset", format!("-{}: invalid option", c), 2),
            }
        }
        i += 1;
    }

    let mut status = 0;
    for arg in &args[i..] {
        if mode == Mode::Function {
            runner.functions.remove(arg.as_str());
            continue;
        }
        if mode == Mode::Either && runner.env.get(arg).is_none() && runner.functions.contains_key(arg.as_str()) {
            runner.functions.remove(arg.as_str());
            continue;
        }
        match unset_variable(runner, arg, follow_nameref) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                runner.report(&e);
                status = 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;

    #[test]
    fn test_split_element() {
        assert_eq!(split_element("a[1]"), Some(("a", "1")));
        assert_eq!(split_element("m[key with space]"), Some(("m", "key with space")));
        assert_eq!(split_element("plain"), None);
    }

    #[test]
    fn test_unset_variable() {
        assert_eq!(run("x=1; unset x; echo \"[${x-unset}]\"").1, "[unset]\n");
        assert_eq!(run("unset never_set; echo $?").1, "0\n");
    }

    #[test]
    fn test_unset_elements() {
        assert_eq!(run("a=(x y z); unset 'a[1]'; echo ${a[@]} ${#a[@]}").1, "x z 2\n");
        assert_eq!(run("a=(x y z); unset 'a[-1]'; echo ${a[@]}").1, "x y\n");
        assert_eq!(run("declare -A m=([k]=v [j]=w); unset 'm[k]'; echo ${!m[@]}").1, "j\n");
        assert_eq!(run("a=(x y); unset 'a[@]'; echo ${#a[@]}").1, "0\n");
    }

    #[test]
    fn test_unset_functions() {
        assert_eq!(run("f() { echo f; }; unset -f f; f; echo $?").1, "127\n");
        assert_eq!(run("f() { echo f; }; unset f; type -t f; echo $?").1, "1\n");
        assert_eq!(run("f() { echo f; }; unset -v f; f").1, "f\n");
    }

    #[test]
    fn test_unset_local_hides_global() {
        let script = "x=global; f() { local x=l; unset x; echo \"[${x-gone}]\"; }; f; echo $x";
        assert_eq!(run(script).1, "[gone]\nglobal\n");
    }

    #[test]
    fn test_unset_nameref() {
        assert_eq!(run("t=1; declare -n r=t; unset r; echo \"[${t-gone}]\"").1, "[gone]\n");
        assert_eq!(run("t=1; declare -n r=t; unset -n r; echo $t; echo \"[$r]\"").1, "1\n[]\n");
    }

    #[test]
    fn test_unset_invalid() {
        let (_, out, err) = run("unset 'a b'; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("`a b': not a valid identifier"));
    }
}

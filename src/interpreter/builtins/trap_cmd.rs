//! trap - Run commands on shell conditions
//!
//! trap [-lp] [[action] condition ...]
//!
//! EXIT (or 0) runs when the shell or subshell ends and ERR after a
//! failing command. Signal traps are stored and listed; signals are never
//! delivered to a script. An empty action ignores the condition and `-`
//! resets it.

use super::{fail, write_stdout};
use crate::ast::printer::quote_single;
use crate::interpreter::runner::{ExecResult, Runner};

const SIGNALS: &[(i32, &str)] = &[
    (1, "HUP"),
    (2, "INT"),
    (3, "QUIT"),
    (4, "ILL"),
    (5, "TRAP"),
    (6, "ABRT"),
    (7, "BUS"),
    (8, "FPE"),
    (9, "KILL"),
    (10, "USR1"),
    (11, "SEGV"),
    (12, "USR2"),
    (13, "PIPE"),
    (14, "ALRM"),
    (15, "TERM"),
    (17, "CHLD"),
    (18, "CONT"),
    (19, "STOP"),
    (20, "TSTP"),
];

/// Canonical condition name, or `None` for an unknown one.
fn normalize_condition(spec: &str) -> Option<String> {
    if let Ok(number) = spec.parse::<i32>() {
        if number == 0 {
            return Some("EXIT".to_string());
        }
        return SIGNALS.iter().find(|(n, _)| *n == number).map(|(_, name)| name.to_string());
    }
    let upper = spec.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    match name {
        "EXIT" | "ERR" | "DEBUG" | "RETURN" => Some(name.to_string()),
        _ => SIGNALS.iter().find(|(_, n)| *n == name).map(|(_, n)| n.to_string()),
    }
}

fn display_name(condition: &str) -> String {
    if SIGNALS.iter().any(|(_, n)| *n == condition) {
        format!("SIG{}", condition)
    } else {
        condition.to_string()
    }
}

fn print_traps(runner: &Runner, conditions: &[String]) -> String {
    let mut names: Vec<&String> = runner.traps.keys().collect();
    names.sort();
    let mut out = String::new();
    for name in names {
        if !conditions.is_empty() && !conditions.contains(name) {
            continue;
        }
        out.push_str(&format!("trap -- {} {}\n", quote_single(&runner.traps[name]), display_name(name)));
    }
    out
}

pub fn handle_trap(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut args = args;
    let mut print = false;
    while let Some(first) = args.first() {
        match first.as_str() {
            "-l" => {
                let list: Vec<String> = SIGNALS.iter().map(|(n, name)| format!("{:2}) SIG{}", n, name)).collect();
                return write_stdout(runner, "trap", &format!("{}\n", list.join("\n")));
            }
            "-p" => print = true,
            "--" => {
                args = &args[1..];
                break;
            }
            _ => break,
        }
        args = &args[1..];
    }

    if args.is_empty() || print {
        let mut conditions = Vec::new();
        for spec in args {
            match normalize_condition(spec) {
                Some(name) => conditions.push(name),
                None => return fail(runner, "trap", format!("{}: invalid signal specification", spec), 1),
            }
        }
        let out = print_traps(runner, &conditions);
        return write_stdout(runner, "trap", &out);
    }

    // A lone condition, or a number first, resets.
    let (action, specs) = if args.len() == 1 || args[0].parse::<i32>().is_ok() {
        (None, args)
    } else if args[0] == "-" {
        (None, &args[1..])
    } else {
        (Some(args[0].clone()), &args[1..])
    };

    let mut status = 0;
    for spec in specs {
        let Some(condition) = normalize_condition(spec) else {
            runner.report(format!("trap: {}: invalid signal specification", spec));
            status = 1;
            continue;
        };
        match &action {
            Some(action) => {
                log::trace!("trap set for {}", condition);
                runner.traps.insert(condition, action.clone());
            }
            None => {
                runner.traps.remove(&condition);
            }
        }
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;

    #[test]
    fn test_normalize_condition() {
        assert_eq!(normalize_condition("0").as_deref(), Some("EXIT"));
        assert_eq!(normalize_condition("sigint").as_deref(), Some("INT"));
        assert_eq!(normalize_condition("15").as_deref(), Some("TERM"));
        assert_eq!(normalize_condition("ERR").as_deref(), Some("ERR"));
        assert_eq!(normalize_condition("NOPE"), None);
    }

    #[test]
    fn test_trap_listing() {
        // The EXIT trap still fires once the listing script ends.
        assert_eq!(run("trap 'echo x' INT EXIT; trap").1, "trap -- 'echo x' EXIT\ntrap -- 'echo x' SIGINT\nx\n");
        assert_eq!(run("trap 'echo x' INT EXIT; trap -p EXIT").1, "trap -- 'echo x' EXIT\nx\n");
    }

    #[test]
    fn test_trap_reset_and_ignore() {
        assert_eq!(run("trap 'echo bye' EXIT; trap - EXIT; echo hi").1, "hi\n");
        assert_eq!(run("trap 'echo bye' EXIT; trap EXIT; echo hi").1, "hi\n");
        assert_eq!(run("trap '' EXIT; trap").1, "trap -- '' EXIT\n");
    }

    #[test]
    fn test_exit_trap_in_subshell() {
        assert_eq!(run("(trap 'echo sub-exit' EXIT; echo in); echo out").1, "in\nsub-exit\nout\n");
    }

    #[test]
    fn test_exit_trap_sees_status() {
        assert_eq!(run("trap 'echo status=$?' EXIT; false").1, "status=1\n");
    }

    #[test]
    fn test_invalid_signal() {
        let (_, out, err) = run("trap 'echo' BOGUS; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("trap: BOGUS: invalid signal specification"));
    }
}

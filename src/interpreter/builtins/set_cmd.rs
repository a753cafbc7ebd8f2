//! set - Set/unset shell options and positional parameters
//!
//! set [-aCefnux] [+aCefnux] [-o option] [+o option] [--] [arg ...]
//!
//! With no arguments, prints every variable. `set -o` prints the option
//! table and `set +o` prints it as re-runnable commands.

use super::declare_print::set_line;
use super::{fail, write_stdout};
use crate::interpreter::runner::{ExecResult, Runner};
use crate::interpreter::types::ShellOptions;

/// Flags accepted for compatibility that change nothing.
const NOOP_FLAGS: &str = "hbmBHPTEpv";

/// `-o` names accepted for compatibility that change nothing.
const NOOP_OPTIONS: &[&str] = &[
    "braceexpand",
    "errtrace",
    "functrace",
    "hashall",
    "interactive-comments",
    "monitor",
    "posix",
    "verbose",
];

fn list_options(runner: &Runner, as_commands: bool) -> String {
    let mut names: Vec<&str> = ShellOptions::names().collect();
    names.sort_unstable();
    let mut out = String::new();
    for name in names {
        let on = runner.options.get(name).unwrap_or(false);
        if as_commands {
            out.push_str(&format!("set {}o {}\n", if on { '-' } else { '+' }, name));
        } else {
            out.push_str(&format!("{:<15}\t{}\n", name, if on { "on" } else { "off" }));
        }
    }
    out
}

fn set_long_option(runner: &mut Runner, name: &str, value: bool) -> Result<(), String> {
    if runner.options.set(name, value) || NOOP_OPTIONS.contains(&name) {
        Ok(())
    } else {
        Err(format!("{}: invalid option name", name))
    }
}

/// Handle the set builtin command
pub fn handle_set(runner: &mut Runner, args: &[String]) -> ExecResult {
    if args.is_empty() {
        let mut out = String::new();
        for name in runner.variable_names() {
            if let Some(value) = runner.env.get(&name).and_then(|v| v.value.as_ref()) {
                out.push_str(&set_line(&name, value));
                out.push('\n');
            }
        }
        return write_stdout(runner, "set", &out);
    }

    let mut i = 0;
    let mut replace_positional = false;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            replace_positional = true;
            i += 1;
            break;
        }
        if arg == "-" {
            runner.options.xtrace = false;
            replace_positional = true;
            i += 1;
            break;
        }
        let enable = match arg.chars().next() {
            Some('-') => true,
            Some('+') => false,
            _ => break,
        };
        if arg.len() < 2 {
            break;
        }
        for flag in arg[1..].chars() {
            if flag == 'o' {
                match args.get(i + 1) {
                    Some(name) => {
                        i += 1;
                        if let Err(message) = set_long_option(runner, name, enable) {
                            return fail(runner, "set", message, 2);
                        }
                    }
                    None => {
                        let listing = list_options(runner, !enable);
                        return write_stdout(runner, "set", &listing);
                    }
                }
                continue;
            }
            match ShellOptions::name_for_flag(flag) {
                Some(name) => {
                    runner.options.set(name, enable);
                }
                None if NOOP_FLAGS.contains(flag) => {}
                None => return fail(runner, "set", format!("{}{}: invalid option", &arg[..1], flag), 2),
            }
        }
        i += 1;
    }

    if replace_positional || i < args.len() {
        runner.positional = args[i..].to_vec();
    }
    Ok(0)
}

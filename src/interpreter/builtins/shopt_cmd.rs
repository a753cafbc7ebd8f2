//! shopt - Shell option builtin
//!
//! shopt [-pqsu] [-o] [optname ...]
//!
//! -s enables, -u disables, -q reports through the exit status only, and
//! -p prints options as `shopt -s`/`shopt -u` commands. -o works on the
//! `set -o` option table instead.

use super::{fail, write_stdout};
use crate::interpreter::runner::{ExecResult, Runner};
use crate::interpreter::types::{ShellOptions, ShoptOptions};

#[derive(Default)]
struct Flags {
    set: bool,
    unset: bool,
    quiet: bool,
    print: bool,
    set_o: bool,
}

fn option_value(runner: &Runner, set_o: bool, name: &str) -> Option<bool> {
    if set_o {
        runner.options.get(name)
    } else {
        runner.shopt.get(name)
    }
}

fn format_line(flags: &Flags, name: &str, on: bool) -> String {
    if flags.print {
        let command = if flags.set_o { "set" } else { "shopt" };
        let letter = match (flags.set_o, on) {
            (true, true) => "-o",
            (true, false) => "+o",
            (false, true) => "-s",
            (false, false) => "-u",
        };
        format!("{} {} {}\n", command, letter, name)
    } else {
        format!("{:<15}\t{}\n", name, if on { "on" } else { "off" })
    }
}

pub fn handle_shopt(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut flags = Flags::default();
    let mut i = 0;
    while i < args.len() && args[i].len() > 1 && args[i].starts_with('-') {
        if args[i] == "--" {
            i += 1;
            break;
        }
        for c in args[i][1..].chars() {
            match c {
                's' => flags.set = true,
                'u' => flags.unset = true,
                'q' => flags.quiet = true,
                'p' => flags.print = true,
                'o' => flags.set_o = true,
                _ => return fail(runner, "shopt", format!("-{}: invalid option", c), 2),
            }
        }
        i += 1;
    }
    if flags.set && flags.unset {
        return fail(runner, "shopt", "cannot set and unset shell options simultaneously", 1);
    }
    let names = &args[i..];

    if flags.set || flags.unset {
        let mut status = 0;
        for name in names {
            let known = if flags.set_o {
                runner.options.set(name, flags.set)
            } else {
                runner.shopt.set(name, flags.set)
            };
            if !known {
                runner.report(format!("shopt: {}: invalid shell option name", name));
                status = 1;
            }
        }
        if names.is_empty() && !flags.quiet {
            // `shopt -s` alone lists the options that are on.
            let all: Vec<&str> = if flags.set_o {
                ShellOptions::names().collect()
            } else {
                ShoptOptions::NAMES.to_vec()
            };
            let mut out = String::new();
            for name in all {
                let on = option_value(runner, flags.set_o, name).unwrap_or(false);
                if on == flags.set {
                    out.push_str(&format_line(&flags, name, on));
                }
            }
            return write_stdout(runner, "shopt", &out);
        }
        return Ok(status);
    }

    let listed: Vec<String> = if names.is_empty() {
        if flags.set_o {
            let mut all: Vec<String> = ShellOptions::names().map(str::to_string).collect();
            all.sort();
            all
        } else {
            ShoptOptions::NAMES.iter().map(|s| s.to_string()).collect()
        }
    } else {
        names.to_vec()
    };
    let mut out = String::new();
    let mut status = 0;
    for name in &listed {
        match option_value(runner, flags.set_o, name) {
            Some(on) => {
                if !on {
                    status = 1;
                }
                if !flags.quiet {
                    out.push_str(&format_line(&flags, name, on));
                }
            }
            None => {
                runner.report(format!("shopt: {}: invalid shell option name", name));
                status = 1;
            }
        }
    }
    if names.is_empty() {
        status = 0;
    }
    match write_stdout(runner, "shopt", &out)? {
        0 => Ok(status),
        failed => Ok(failed),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;

    #[test]
    fn test_shopt_set_and_query() {
        assert_eq!(run("shopt -s extglob; shopt extglob").1, "extglob        \ton\n");
        assert_eq!(run("shopt -q nullglob; echo $?").1, "1\n");
        assert_eq!(run("shopt -s nullglob; shopt -q nullglob; echo $?").1, "0\n");
        assert_eq!(run("shopt -s dotglob; shopt -u dotglob; shopt -p dotglob").1, "shopt -u dotglob\n");
    }

    #[test]
    fn test_shopt_listing() {
        let (_, out, _) = run("shopt");
        assert_eq!(out.lines().count(), 7);
        assert!(out.starts_with("dotglob        \toff\n"));
        assert_eq!(run("shopt -s globstar; shopt -s").1, "globstar       \ton\n");
    }

    #[test]
    fn test_shopt_o() {
        assert_eq!(run("shopt -so errexit; set +e; shopt -po errexit").1, "set +o errexit\n");
    }

    #[test]
    fn test_shopt_invalid_name() {
        let (_, out, err) = run("shopt -s bogus; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("shopt: bogus: invalid shell option name"));
    }

    #[test]
    fn test_shopt_affects_matching() {
        assert_eq!(run("shopt -s nocasematch; case ABC in abc) echo yes;; esac").1, "yes\n");
        assert_eq!(run("shopt -s extglob; case foo.txt in @(*.txt|*.md)) echo doc;; esac").1, "doc\n");
    }
}

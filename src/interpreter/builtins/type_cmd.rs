//! type / command / builtin - Command lookup builtins
//!
//! type [-tpP] name...   - describe how each name would be run
//! command [-vV] name... - describe, or run name skipping functions
//! builtin name [arg...] - run a builtin even when a function shadows it

use super::declare_print::function_definition;
use super::{fail, lookup, write_stdout};
use crate::interpreter::command_resolution::CommandKind;
use crate::interpreter::runner::{ExecResult, Runner};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Style {
    /// `type`, `command -V`
    Verbose,
    /// `type -t`
    Kind,
    /// `type -p`, `command -v`
    Short,
}

/// One line (or block) describing `name`; `None` if nothing by that name.
fn describe(runner: &Runner, name: &str, style: Style, path_only: bool) -> Option<String> {
    let kind = runner.command_kind(name)?;
    if path_only && !matches!(kind, CommandKind::File(_)) {
        return Some(String::new());
    }
    Some(match (style, kind) {
        (Style::Kind, CommandKind::Keyword) => "keyword\n".to_string(),
        (Style::Kind, CommandKind::Function) => "function\n".to_string(),
        (Style::Kind, CommandKind::Builtin) => "builtin\n".to_string(),
        (Style::Kind, CommandKind::File(_)) => "file\n".to_string(),
        (Style::Short, CommandKind::File(path)) => format!("{}\n", path.display()),
        (Style::Short, _) => format!("{}\n", name),
        (Style::Verbose, CommandKind::Keyword) => format!("{} is a shell keyword\n", name),
        (Style::Verbose, CommandKind::Function) => {
            format!("{} is a function\n{}", name, function_definition(runner, name).unwrap_or_default())
        }
        (Style::Verbose, CommandKind::Builtin) => format!("{} is a shell builtin\n", name),
        (Style::Verbose, CommandKind::File(path)) => format!("{} is {}\n", name, path.display()),
    })
}

pub fn handle_type(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut style = Style::Verbose;
    let mut path_only = false;
    let mut i = 0;
    while i < args.len() && args[i].len() > 1 && args[i].starts_with('-') {
        if args[i] == "--" {
            i += 1;
            break;
        }
        for c in args[i][1..].chars() {
            match c {
                't' => style = Style::Kind,
                'p' | 'P' => {
                    style = Style::Short;
                    path_only = true;
                }
                'a' | 'f' => {}
                _ => return fail(runner, "type", format!("-{}: invalid option", c), 2),
            }
        }
        i += 1;
    }

    let mut out = String::new();
    let mut status = 0;
    for name in &args[i..] {
        match describe(runner, name, style, path_only) {
            Some(text) => out.push_str(&text),
            None => {
                status = 1;
                if style == Style::Verbose {
                    runner.report(format!("type: {}: not found", name));
                }
            }
        }
    }
    match write_stdout(runner, "type", &out)? {
        0 => Ok(status),
        failed => Ok(failed),
    }
}

pub fn handle_command(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut style = None;
    let mut i = 0;
    while i < args.len() && args[i].len() > 1 && args[i].starts_with('-') {
        if args[i] == "--" {
            i += 1;
            break;
        }
        for c in args[i][1..].chars() {
            match c {
                'v' => style = Some(Style::Short),
                'V' => style = Some(Style::Verbose),
                'p' => {}
                _ => return fail(runner, "command", format!("-{}: invalid option", c), 2),
            }
        }
        i += 1;
    }
    let args = &args[i..];
    if args.is_empty() {
        return Ok(0);
    }

    if let Some(style) = style {
        let mut out = String::new();
        let mut status = 0;
        for name in args {
            match describe(runner, name, style, false) {
                Some(text) => out.push_str(&text),
                None => {
                    status = 1;
                    if style == Style::Verbose {
                        runner.report(format!("command: {}: not found", name));
                    }
                }
            }
        }
        return match write_stdout(runner, "command", &out)? {
            0 => Ok(status),
            failed => Ok(failed),
        };
    }

    match lookup(&args[0]) {
        Some(builtin) => builtin(runner, &args[1..]),
        None => runner.run_external(args, &[]),
    }
}

pub fn handle_builtin(runner: &mut Runner, args: &[String]) -> ExecResult {
    let Some(name) = args.first() else {
        return Ok(0);
    };
    match lookup(name) {
        Some(builtin) => builtin(runner, &args[1..]),
        None => fail(runner, "builtin", format!("{}: not a shell builtin", name), 1),
    }
}

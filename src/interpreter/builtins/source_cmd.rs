//! source/. - Execute commands from a file in the current environment
//!
//! source FILE [ARG ...]
//!
//! A FILE without a slash is looked up in PATH, then in the working
//! directory. ARGs replace the positional parameters while the file runs.
//! `return` inside the file ends it with the given status.

use std::path::PathBuf;

use super::fail;
use crate::interpreter::command_resolution::{is_path_command, split_path};
use crate::interpreter::errors::{io_message, InterpreterError};
use crate::interpreter::runner::{ExecResult, Runner};

fn find_source_file(runner: &Runner, name: &str) -> PathBuf {
    if !is_path_command(name) {
        if let Some(path_env) = runner.get_var("PATH") {
            for dir in split_path(&path_env) {
                let candidate = runner.cwd.join(dir).join(name);
                if candidate.is_file() {
                    return candidate;
                }
            }
        }
    }
    runner.cwd.join(name)
}

pub fn handle_source(runner: &mut Runner, args: &[String]) -> ExecResult {
    let args = match args.first() {
        Some(first) if first == "--" => &args[1..],
        _ => args,
    };
    let Some(name) = args.first() else {
        return fail(runner, "source", "filename argument required", 2);
    };
    let path = find_source_file(runner, name);
    let text = match std::fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return fail(runner, name, io_message(&e), 1),
    };
    if runner.source_depth >= runner.limits.max_call_depth {
        return Err(InterpreterError::Limit(format!(
            "{}: maximum source nesting level exceeded ({})",
            name, runner.limits.max_call_depth
        )));
    }
    let script = crate::parser::parse(&text)?;
    log::debug!("sourcing {}", path.display());

    let saved_positional = if args.len() > 1 {
        Some(std::mem::replace(&mut runner.positional, args[1..].to_vec()))
    } else {
        None
    };
    runner.source_depth += 1;
    let result = runner.execute_list(&script.statements);
    runner.source_depth -= 1;
    if let Some(saved) = saved_positional {
        runner.positional = saved;
    }
    match result {
        Err(InterpreterError::Return(code)) => Ok(code),
        other => other,
    }
}

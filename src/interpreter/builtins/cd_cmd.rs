//! cd - Change directory builtin
//!
//! Supports:
//! - cd [dir] - change to directory
//! - cd - - change to previous directory (OLDPWD)
//! - cd with no argument - change to HOME
//! - cd -L - use logical path (default)
//! - cd -P - use physical path (resolve symlinks)
//! - CDPATH support for relative paths
//!
//! Also `pwd [-L|-P]`.

use std::path::{Component, Path, PathBuf};

use super::{fail, write_stdout};
use crate::interpreter::errors::io_message;
use crate::interpreter::runner::{ExecResult, Runner};

/// Normalize a path by resolving . and .. components lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(part) => result.push(part),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    result
}

fn uses_cdpath(target: &str) -> bool {
    !target.starts_with('/') && target != "." && target != ".." && !target.starts_with("./") && !target.starts_with("../")
}

/// Handle the cd builtin command
pub fn handle_cd(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut physical = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--" => {
                i += 1;
                break;
            }
            "-L" => physical = false,
            "-P" => physical = true,
            arg if arg.starts_with('-') && arg != "-" => {
                return fail(runner, "cd", format!("{}: invalid option", arg), 2);
            }
            _ => break,
        }
        i += 1;
    }
    let operands = &args[i..];
    if operands.len() > 1 {
        return fail(runner, "cd", "too many arguments", 1);
    }

    let mut print_path = false;
    let target = match operands.first().map(String::as_str) {
        None => match runner.get_var("HOME") {
            Some(home) => home,
            None => return fail(runner, "cd", "HOME not set", 1),
        },
        Some("-") => match runner.get_var("OLDPWD") {
            Some(old) => {
                print_path = true;
                old
            }
            None => return fail(runner, "cd", "OLDPWD not set", 1),
        },
        Some(dir) => dir.to_string(),
    };
    if target.is_empty() {
        return Ok(0);
    }

    let mut candidate = runner.cwd.join(&target);
    if uses_cdpath(&target) {
        if let Some(cdpath) = runner.get_var("CDPATH") {
            for dir in cdpath.split(':') {
                let base = if dir.is_empty() { runner.cwd.clone() } else { runner.cwd.join(dir) };
                let path = base.join(&target);
                if path.is_dir() {
                    print_path |= !dir.is_empty();
                    candidate = path;
                    break;
                }
            }
        }
    }

    let logical = normalize_path(&candidate);
    let checked = if physical { &candidate } else { &logical };
    match std::fs::metadata(checked) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return fail(runner, "cd", format!("{}: Not a directory", target), 1),
        Err(e) => return fail(runner, "cd", format!("{}: {}", target, io_message(&e)), 1),
    }
    let new_dir = if physical {
        match std::fs::canonicalize(&candidate) {
            Ok(path) => path,
            Err(e) => return fail(runner, "cd", format!("{}: {}", target, io_message(&e)), 1),
        }
    } else {
        logical
    };

    let old = runner.get_var("PWD").unwrap_or_else(|| runner.cwd.to_string_lossy().into_owned());
    runner.cwd = new_dir;
    let display = runner.cwd.to_string_lossy().into_owned();
    runner.set_var("OLDPWD", old)?;
    runner.set_var("PWD", display.clone())?;
    if print_path {
        return write_stdout(runner, "cd", &format!("{}\n", display));
    }
    Ok(0)
}

/// Handle the pwd builtin command
pub fn handle_pwd(runner: &mut Runner, args: &[String]) -> ExecResult {
    let physical = args.iter().any(|a| a == "-P");
    let path = if physical {
        std::fs::canonicalize(&runner.cwd).unwrap_or_else(|_| runner.cwd.clone())
    } else {
        runner.cwd.clone()
    };
    write_stdout(runner, "pwd", &format!("{}\n", path.to_string_lossy()))
}

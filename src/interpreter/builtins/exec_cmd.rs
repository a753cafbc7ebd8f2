//! exec - Replace the shell with a command, or apply redirections
//!
//! exec               - redirections on the exec line stay in effect
//! exec cmd [arg...]  - run cmd, then end the shell with its status
//!
//! The host process is never replaced; the runner ends as if `exit` had
//! been called with the command's status.

use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};

pub fn handle_exec(runner: &mut Runner, args: &[String]) -> ExecResult {
    let args = match args.first() {
        Some(first) if first == "--" => &args[1..],
        _ => args,
    };
    if args.is_empty() {
        return Ok(0);
    }
    let status = runner.run_external(args, &[])?;
    Err(InterpreterError::Exit(status))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, run_in};
    use tempfile::TempDir;

    #[test]
    fn test_exec_redirection_persists() {
        let dir = TempDir::new().unwrap();
        let (_, out, _) = run_in(dir.path(), "", "exec > log.txt; echo one; echo two");
        assert_eq!(out, "");
        assert_eq!(std::fs::read_to_string(dir.path().join("log.txt")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_exec_command_ends_shell() {
        let (status, out, _) = run("exec sh -c 'echo replaced; exit 3'; echo never");
        assert_eq!(status, 3);
        assert_eq!(out, "replaced\n");
    }

    #[test]
    fn test_exec_missing_command() {
        let (status, _, err) = run("exec no_such_program_xyz; echo never");
        assert_eq!(status, 127);
        assert!(err.contains("no_such_program_xyz: command not found"));
    }
}

//! Command Resolution
//!
//! Decides what a command name refers to (function, builtin, or an
//! executable found on PATH) and runs it. External programs go through the
//! `ExecHandler` seam so an embedder can sandbox or replace process
//! execution; the default handler spawns real processes.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::ast::types::StatementNode;
use crate::interpreter::builtins;
use crate::interpreter::environment::Variable;
use crate::interpreter::errors::{io_message, InterpreterError};
use crate::interpreter::runner::{ExecResult, Runner};

/// Default PATH value when not set in environment
pub const DEFAULT_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Reserved words, for `type`.
pub const KEYWORDS: &[&str] = &[
    "if", "then", "elif", "else", "fi", "case", "esac", "for", "while", "until", "do", "done", "in", "function",
    "coproc", "{", "}", "!", "[[", "]]", "time",
];

/// Result type for command resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveCommandResult {
    /// Found an executable at the given path
    Command { path: PathBuf },
    NotFound,
    /// File exists but is not executable, or is a directory
    PermissionDenied { path: PathBuf },
}

/// Split PATH into individual directories
pub fn split_path(path_env: &str) -> Vec<&str> {
    path_env.split(':').filter(|s| !s.is_empty()).collect()
}

/// Check if a command name contains a path separator (making it a path reference)
pub fn is_path_command(command_name: &str) -> bool {
    command_name.contains('/')
}

fn is_executable(path: &Path) -> Option<bool> {
    let meta = fs::metadata(path).ok()?;
    Some(meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

/// Find `name` the way `execvp` would, relative paths against `cwd`.
pub fn resolve_command(name: &str, path_env: &str, cwd: &Path) -> ResolveCommandResult {
    if is_path_command(name) {
        let path = cwd.join(name);
        return match is_executable(&path) {
            Some(true) => ResolveCommandResult::Command { path },
            Some(false) => ResolveCommandResult::PermissionDenied { path },
            None => ResolveCommandResult::NotFound,
        };
    }
    let mut denied = None;
    for dir in split_path(path_env) {
        let path = cwd.join(dir).join(name);
        match is_executable(&path) {
            Some(true) => return ResolveCommandResult::Command { path },
            Some(false) if denied.is_none() && path.is_file() => denied = Some(path),
            _ => {}
        }
    }
    match denied {
        Some(path) => ResolveCommandResult::PermissionDenied { path },
        None => ResolveCommandResult::NotFound,
    }
}

/// Everything needed to start one external command.
#[derive(Debug)]
pub struct ExecRequest<'a> {
    /// The command name as written (argv[0])
    pub program: &'a str,
    pub args: &'a [String],
    /// Complete environment of the child
    pub env: &'a [(String, String)],
    pub cwd: &'a Path,
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
}

impl ExecRequest<'_> {
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Runs external commands and reports their exit status.
///
/// `io::ErrorKind::NotFound` becomes status 127 and
/// `io::ErrorKind::PermissionDenied` status 126.
pub trait ExecHandler: Send + Sync {
    fn exec(&self, request: ExecRequest<'_>) -> io::Result<i32>;
}

/// Spawns real processes with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsExecHandler;

impl ExecHandler for OsExecHandler {
    fn exec(&self, request: ExecRequest<'_>) -> io::Result<i32> {
        let path_env = request.env_var("PATH").unwrap_or(DEFAULT_PATH);
        let path = match resolve_command(request.program, path_env, request.cwd) {
            ResolveCommandResult::Command { path } => path,
            ResolveCommandResult::NotFound => {
                return Err(io::Error::new(io::ErrorKind::NotFound, "command not found"));
            }
            ResolveCommandResult::PermissionDenied { .. } => {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"));
            }
        };
        let status = Command::new(&path)
            .arg0(request.program)
            .args(request.args)
            .env_clear()
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(request.cwd)
            .stdin(request.stdin)
            .stdout(request.stdout)
            .stderr(request.stderr)
            .status()?;
        Ok(match status.code() {
            Some(code) => code,
            None => 128 + status.signal().unwrap_or(0),
        })
    }
}

/// What a name refers to, in lookup order.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    Keyword,
    Function,
    Builtin,
    File(PathBuf),
}

impl Runner {
    /// Run an expanded command line.
    pub(crate) fn dispatch_command(&mut self, args: &[String], prefix: &[(String, String)]) -> ExecResult {
        let name = args[0].as_str();
        if let Some(body) = self.functions.get(name).cloned() {
            log::trace!("dispatch {}: function", name);
            return self.with_prefix_assignments(prefix, |runner| runner.call_function(name, body, &args[1..]));
        }
        if let Some(builtin) = builtins::lookup(name) {
            log::trace!("dispatch {}: builtin", name);
            return self.with_prefix_assignments(prefix, |runner| builtin(runner, &args[1..]));
        }
        log::trace!("dispatch {}: external", name);
        self.run_external(args, prefix)
    }

    /// Make `NAME=value` prefixes visible (and exported) for the duration
    /// of an in-process command.
    fn with_prefix_assignments<F>(&mut self, prefix: &[(String, String)], f: F) -> ExecResult
    where
        F: FnOnce(&mut Runner) -> ExecResult,
    {
        if prefix.is_empty() {
            return f(self);
        }
        let mut vars = HashMap::new();
        for (name, value) in prefix {
            if self.env.get(name).map_or(false, |v| v.readonly) {
                return Err(InterpreterError::Runtime(format!("{}: readonly variable", name)));
            }
            let mut var = Variable::scalar(value.clone());
            var.exported = true;
            vars.insert(name.clone(), var);
        }
        self.env.push_temporary_scope(vars);
        let result = f(self);
        self.env.pop_scope();
        result
    }

    pub(crate) fn call_function(&mut self, name: &str, body: Arc<StatementNode>, args: &[String]) -> ExecResult {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(InterpreterError::Limit(format!(
                "{}: maximum function nesting level exceeded ({})",
                name, self.limits.max_call_depth
            )));
        }
        self.call_depth += 1;
        self.env.push_scope();
        let saved_positional = std::mem::replace(&mut self.positional, args.to_vec());
        let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);

        let result = self.execute_statement_inner(&body);

        self.loop_depth = saved_loop_depth;
        self.positional = saved_positional;
        self.env.pop_scope();
        self.call_depth -= 1;
        match result {
            Err(InterpreterError::Return(code)) => Ok(code),
            other => other,
        }
    }

    pub(crate) fn run_external(&mut self, args: &[String], prefix: &[(String, String)]) -> ExecResult {
        let mut env = self.env.exported();
        for (name, value) in prefix {
            match env.iter_mut().find(|(k, _)| k == name) {
                Some(entry) => entry.1 = value.clone(),
                None => env.push((name.clone(), value.clone())),
            }
        }

        let (stdin, feeder) = self.io.stdin().to_stdio()?;
        let (stdout, stdout_pump) = self.io.stdout().to_stdio()?;
        let (stderr, stderr_pump) = self.io.stderr().to_stdio()?;
        let request = ExecRequest {
            program: &args[0],
            args: &args[1..],
            env: &env,
            cwd: &self.cwd,
            stdin,
            stdout,
            stderr,
        };
        log::debug!("spawning external command {}", args[0]);
        let result = self.exec_handler.exec(request);
        for handle in [feeder, stdout_pump, stderr_pump].into_iter().flatten() {
            // A pump thread only fails if it panicked; nothing to recover.
            let _ = handle.join();
        }

        match result {
            Ok(status) => Ok(status),
            Err(e) => {
                log::debug!("failed to run {}: {}", args[0], e);
                match e.kind() {
                    io::ErrorKind::NotFound => {
                        self.report(format!("{}: command not found", args[0]));
                        Ok(127)
                    }
                    io::ErrorKind::PermissionDenied => {
                        self.report(format!("{}: Permission denied", args[0]));
                        Ok(126)
                    }
                    _ => {
                        self.report(format!("{}: {}", args[0], io_message(&e)));
                        Ok(126)
                    }
                }
            }
        }
    }

    /// Classify a name for `type` and `command -v`.
    pub(crate) fn command_kind(&self, name: &str) -> Option<CommandKind> {
        if KEYWORDS.contains(&name) {
            return Some(CommandKind::Keyword);
        }
        if self.functions.contains_key(name) {
            return Some(CommandKind::Function);
        }
        if builtins::lookup(name).is_some() {
            return Some(CommandKind::Builtin);
        }
        let path_env = self.get_var("PATH").unwrap_or_else(|| DEFAULT_PATH.to_string());
        match resolve_command(name, &path_env, &self.cwd) {
            ResolveCommandResult::Command { path } => Some(CommandKind::File(path)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::interpreter::io::{InputStream, IoContext, OutputStream};
    use crate::parser::parse;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/a::/b:"), vec!["/a", "/b"]);
    }

    #[test]
    fn test_resolve_command() {
        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("tool");
        fs::write(&tool, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let plain = dir.path().join("plain");
        fs::write(&plain, "").unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();

        let path_env = dir.path().to_string_lossy().into_owned();
        assert_eq!(resolve_command("tool", &path_env, Path::new("/")), ResolveCommandResult::Command { path: tool });
        assert!(matches!(resolve_command("plain", &path_env, Path::new("/")), ResolveCommandResult::PermissionDenied { .. }));
        assert_eq!(resolve_command("absent", &path_env, Path::new("/")), ResolveCommandResult::NotFound);
        assert!(matches!(resolve_command("./plain", "", dir.path()), ResolveCommandResult::PermissionDenied { .. }));
    }

    /// Records requests instead of spawning anything.
    struct RecordingHandler {
        calls: Mutex<Vec<(String, Vec<String>, Option<String>)>>,
        result: fn() -> io::Result<i32>,
    }

    impl ExecHandler for RecordingHandler {
        fn exec(&self, request: ExecRequest<'_>) -> io::Result<i32> {
            self.calls.lock().unwrap().push((
                request.program.to_string(),
                request.args.to_vec(),
                request.env_var("GREETING").map(str::to_string),
            ));
            (self.result)()
        }
    }

    fn run_with(handler: Arc<RecordingHandler>, source: &str) -> (i32, String) {
        let mut runner = Runner::new(Environment::new(), std::env::temp_dir());
        let (err, err_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, OutputStream::Null, err);
        runner.set_exec_handler(handler);
        let status = runner.run_script(&parse(source).unwrap()).unwrap();
        let err = String::from_utf8(err_buf.lock().unwrap().clone()).unwrap();
        (status, err)
    }

    #[test]
    fn test_handler_receives_prefix_env() {
        let handler = Arc::new(RecordingHandler { calls: Mutex::new(Vec::new()), result: || Ok(3) });
        let (status, _) = run_with(handler.clone(), "GREETING=hi tool a 'b c'");
        assert_eq!(status, 3);
        let calls = handler.calls.lock().unwrap();
        assert_eq!(calls[0], ("tool".to_string(), vec!["a".to_string(), "b c".to_string()], Some("hi".to_string())));
    }

    #[test]
    fn test_not_found_and_denied_statuses() {
        let missing = Arc::new(RecordingHandler {
            calls: Mutex::new(Vec::new()),
            result: || Err(io::Error::new(io::ErrorKind::NotFound, "nope")),
        });
        let (status, err) = run_with(missing, "nosuchcmd");
        assert_eq!(status, 127);
        assert_eq!(err, "tasksh: nosuchcmd: command not found\n");

        let denied = Arc::new(RecordingHandler {
            calls: Mutex::new(Vec::new()),
            result: || Err(io::Error::new(io::ErrorKind::PermissionDenied, "sandbox")),
        });
        assert_eq!(run_with(denied, "blocked").0, 126);
    }

    #[test]
    fn test_function_shadows_builtin() {
        let handler = Arc::new(RecordingHandler { calls: Mutex::new(Vec::new()), result: || Ok(0) });
        let (status, _) = run_with(handler, "true() { return 4; }; true");
        assert_eq!(status, 4);
    }

    #[test]
    fn test_recursion_limit() {
        let handler = Arc::new(RecordingHandler { calls: Mutex::new(Vec::new()), result: || Ok(0) });
        let mut runner = Runner::new(Environment::new(), std::env::temp_dir());
        runner.limits.max_call_depth = 20;
        let (err, err_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, OutputStream::Null, err);
        runner.set_exec_handler(handler);
        let status = runner.run_script(&parse("f() { f; }; f").unwrap()).unwrap();
        assert_eq!(status, 1);
        let err = String::from_utf8(err_buf.lock().unwrap().clone()).unwrap();
        assert!(err.contains("maximum function nesting level exceeded"));
    }

    #[test]
    fn test_os_handler_runs_process() {
        let mut runner = Runner::new(Environment::from_exported([("PATH", "/usr/bin:/bin")]), std::env::temp_dir());
        let (out, out_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::bytes(b"b\na\n".to_vec()), out, OutputStream::Null);
        let status = runner.run_script(&parse("sort").unwrap()).unwrap();
        assert_eq!(status, 0);
        assert_eq!(&*out_buf.lock().unwrap(), b"a\nb\n");
    }
}

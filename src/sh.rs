//! Shell - embedding entry point
//!
//! Ties the parser and the runner together behind one handle that keeps
//! its variables, functions, options and working directory between runs.
//!
//! ```no_run
//! use tasksh::{Shell, ShellConfig};
//!
//! let mut shell = Shell::new(ShellConfig::default().with_env([("NAME", "world")]));
//! let status = shell.run_str("echo \"hello $NAME\"").unwrap();
//! assert_eq!(status, 0);
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::ast::types::ScriptNode;
use crate::config::ShellConfig;
use crate::interpreter::command_resolution::ExecHandler;
use crate::interpreter::environment::{Environment, Value};
use crate::interpreter::errors::{FatalError, ShellError};
use crate::interpreter::io::{InputStream, IoContext, OutputStream};
use crate::interpreter::runner::Runner;
use crate::interpreter::types::{CancelToken, ExecResult};
use crate::parser::{parse_word_with, WordMode};

#[derive(Debug)]
pub struct Shell {
    runner: Runner,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        let cwd = config
            .cwd
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| "/".into());
        let mut env = Environment::from_exported(config.env);
        // An inherited PWD names the host's directory, not this shell's.
        let var = env.attributes_mut("PWD");
        var.value = Some(Value::Scalar(cwd.to_string_lossy().into_owned()));
        var.exported = true;
        let mut runner = Runner::new(env, cwd);
        runner.options = config.options;
        runner.shopt = config.shopt;
        runner.limits = config.limits;
        runner.positional = config.args;
        if let Some(name) = config.script_name {
            runner.script_name = name;
        }
        Self { runner }
    }

    /// Replace the host-process streams the script reads and writes.
    pub fn set_io(&mut self, stdin: InputStream, stdout: OutputStream, stderr: OutputStream) {
        self.runner.io = IoContext::new(stdin, stdout, stderr);
    }

    /// Install the handler that runs external commands (a sandbox layer).
    pub fn set_exec_handler(&mut self, handler: Arc<dyn ExecHandler>) {
        self.runner.set_exec_handler(handler);
    }

    /// Run a parsed script; the exit status is `Ok` even when non-zero.
    pub fn run(&mut self, script: &ScriptNode) -> Result<i32, ShellError> {
        self.on_engine_thread(|runner| Ok(runner.run_script(script)?))
    }

    /// Parse and run. Nothing runs when the source fails to parse.
    pub fn run_str(&mut self, source: &str) -> Result<i32, ShellError> {
        let script = crate::parser::parse(source)?;
        self.run(&script)
    }

    /// Run with captured output. Stdin is empty. Background jobs are
    /// waited for so their output is part of the result.
    pub async fn exec(&mut self, source: &str) -> Result<ExecResult, ShellError> {
        tokio::task::block_in_place(|| self.exec_captured(source))
    }

    /// `exec` that stops at the next statement boundary once `timeout`
    /// has passed; a timed-out run yields `ShellError::Cancelled`.
    pub async fn exec_with_timeout(&mut self, source: &str, timeout: Duration) -> Result<ExecResult, ShellError> {
        let token = self.runner.cancel.clone();
        token.reset();
        token.set_timeout(timeout);
        let result = tokio::task::block_in_place(|| self.exec_captured(source));
        token.clear_timeout();
        result
    }

    fn exec_captured(&mut self, source: &str) -> Result<ExecResult, ShellError> {
        let script = crate::parser::parse(source)?;
        let (stdout, out_buf) = OutputStream::buffer();
        let (stderr, err_buf) = OutputStream::buffer();
        let status = self.on_engine_thread(|runner| {
            let saved = std::mem::replace(&mut runner.io, IoContext::new(InputStream::Null, stdout, stderr));
            let result = runner.run_script(&script);
            runner.wait_all();
            runner.io = saved;
            Ok(result?)
        })?;
        let collect = |buf: &Arc<std::sync::Mutex<Vec<u8>>>| {
            buf.lock().map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default()
        };
        Ok(ExecResult::new(collect(&out_buf), collect(&err_buf), status))
    }

    /// Expand one word to one string: parameters, arithmetic and command
    /// substitution apply, splitting and globbing do not.
    pub fn expand_literal(&mut self, word: &str) -> Result<String, ShellError> {
        let word = parse_word_with(word, WordMode::PLAIN, 1, 1)?;
        self.on_engine_thread(|runner| Ok(runner.expand_word_string(&word)?))
    }

    /// Expand words the way command arguments are expanded.
    pub fn expand_fields(&mut self, words: &[&str]) -> Result<Vec<String>, ShellError> {
        let words = words
            .iter()
            .map(|w| parse_word_with(w, WordMode::NORMAL, 1, 1))
            .collect::<Result<Vec<_>, _>>()?;
        self.on_engine_thread(|runner| Ok(runner.expand_words(&words)?))
    }

    /// Run `f` on a thread whose stack fits the configured call and
    /// expression depth limits; the caller's own stack may be far smaller.
    fn on_engine_thread<T, F>(&mut self, f: F) -> Result<T, ShellError>
    where
        T: Send,
        F: FnOnce(&mut Runner) -> Result<T, ShellError> + Send,
    {
        let builder = std::thread::Builder::new()
            .name("tasksh".to_string())
            .stack_size(self.runner.limits.thread_stack_size());
        let runner = &mut self.runner;
        std::thread::scope(|scope| -> Result<T, ShellError> {
            let handle = builder.spawn_scoped(scope, move || f(runner)).map_err(FatalError::Io)?;
            handle.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload))
        })
    }

    /// Token that stops the shell at the next statement boundary.
    pub fn cancel_handle(&self) -> CancelToken {
        self.runner.cancel.clone()
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.runner.get_var(name)
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>) -> Result<(), ShellError> {
        Ok(self.runner.set_var(name, value)?)
    }

    pub fn cwd(&self) -> &Path {
        &self.runner.cwd
    }

    /// `$?` of the last run.
    pub fn last_status(&self) -> i32 {
        self.runner.last_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell() -> Shell {
        Shell::new(ShellConfig::default().with_env([("PATH", "/usr/bin:/bin")]))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_captures_output() {
        let mut sh = shell();
        let result = sh.exec("echo out; echo err >&2; exit 3").await.unwrap();
        assert_eq!(result, ExecResult::new("out\n".into(), "err\n".into(), 3));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_state_persists_between_runs() {
        let mut sh = shell();
        sh.exec("x=1; f() { echo \"f$1\"; }").await.unwrap();
        assert_eq!(sh.exec("echo $x; f 2").await.unwrap().stdout, "1\nf2\n");
        assert_eq!(sh.var("x").as_deref(), Some("1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_parse_error_runs_nothing() {
        let mut sh = shell();
        let err = sh.exec("echo before; if then").await.unwrap_err();
        assert!(matches!(err, ShellError::Parse(_)));
        assert_eq!(sh.var("x"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_with_timeout_cancels() {
        let mut sh = shell();
        let err = sh.exec_with_timeout("while true; do :; done", Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, ShellError::Cancelled));
        // The shell is usable again afterwards.
        assert_eq!(sh.exec_with_timeout("echo ok", Duration::from_secs(5)).await.unwrap().stdout, "ok\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_waits_for_background_jobs() {
        let mut sh = shell();
        assert_eq!(sh.exec("(echo late) &").await.unwrap().stdout, "late\n");
    }

    #[test]
    fn test_cancel_handle() {
        let mut sh = shell();
        sh.cancel_handle().cancel();
        assert!(matches!(sh.run_str("echo hi"), Err(ShellError::Cancelled)));
    }

    #[test]
    fn test_expand_literal() {
        let mut sh = shell();
        sh.set_var("NAME", "world").unwrap();
        assert_eq!(sh.expand_literal("hello $NAME").unwrap(), "hello world");
        assert_eq!(sh.expand_literal("'$NAME' ${NAME:0:1}").unwrap(), "$NAME w");
        assert_eq!(sh.expand_literal("*").unwrap(), "*");
        assert_eq!(sh.expand_literal("$((6 * 7))").unwrap(), "42");
        assert!(matches!(sh.expand_literal("${MISSING:?gone}"), Err(ShellError::Expansion(_))));
    }

    #[test]
    fn test_expand_literal_is_idempotent_on_plain_text() {
        let mut sh = shell();
        sh.set_var("V", "a b").unwrap();
        let once = sh.expand_literal("x $V y").unwrap();
        assert_eq!(sh.expand_literal(&once).unwrap(), once);
    }

    #[test]
    fn test_expand_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        let mut sh = Shell::new(ShellConfig { cwd: Some(dir.path().to_path_buf()), ..Default::default() });
        sh.set_var("LIST", "one two").unwrap();
        assert_eq!(sh.expand_fields(&["$LIST", "*.txt", "'q r'"]).unwrap(), vec!["one", "two", "a.txt", "b.txt", "q r"]);
    }

    #[test]
    fn test_config_applies() {
        let config = ShellConfig {
            script_name: Some("task".into()),
            args: vec!["x".into(), "y".into()],
            cwd: Some("/".into()),
            ..Default::default()
        };
        let mut sh = Shell::new(config);
        let (out, buf) = OutputStream::buffer();
        sh.set_io(InputStream::Null, out, OutputStream::Null);
        sh.run_str("echo $0 $# $2 $PWD").unwrap();
        assert_eq!(&*buf.lock().unwrap(), b"task 2 y /\n");
        assert_eq!(sh.cwd(), Path::new("/"));
    }

    #[test]
    fn test_inherited_pwd_is_replaced() {
        let dir = TempDir::new().unwrap();
        let mut config = ShellConfig::default().with_env([("PWD", "/stale/host/dir"), ("OLDPWD", "/elsewhere")]);
        config.cwd = Some(dir.path().to_path_buf());
        let mut sh = Shell::new(config);
        let (out, buf) = OutputStream::buffer();
        sh.set_io(InputStream::Null, out, OutputStream::Null);
        sh.run_str("echo $PWD; pwd").unwrap();
        let expected = format!("{0}\n{0}\n", dir.path().display());
        assert_eq!(String::from_utf8_lossy(&buf.lock().unwrap()), expected);
        assert_eq!(sh.var("PWD"), Some(dir.path().display().to_string()));
    }

    #[test]
    fn test_script_stdin_not_seen_by_later_stages() {
        let mut sh = shell();
        let (out, buf) = OutputStream::buffer();
        sh.set_io(InputStream::bytes(b"from shell stdin\n".to_vec()), out, OutputStream::Null);
        sh.run_str("true | cat; echo sep; cat").unwrap();
        assert_eq!(&*buf.lock().unwrap(), b"sep\nfrom shell stdin\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_deep_recursion_off_the_main_thread() {
        let mut sh = shell();
        let define = "f() { if [ $1 -gt 0 ]; then f $(($1 - 1)); else echo bottom; fi; }";
        sh.exec(define).await.unwrap();
        assert_eq!(sh.exec("f 900").await.unwrap().stdout, "bottom\n");
        assert_eq!(sh.exec("f 900 | cat").await.unwrap().stdout, "bottom\n");
        assert_eq!(sh.exec("f 900 & wait").await.unwrap().stdout, "bottom\n");
        assert_eq!(sh.exec("echo $(f 900)").await.unwrap().stdout, "bottom\n");
        let result = sh.exec("f 1500 | cat; echo status ${PIPESTATUS[0]}").await.unwrap();
        assert!(result.stderr.contains("maximum function nesting level exceeded"));
        assert_eq!(result.stdout, "status 1\n");
    }

    #[test]
    fn test_deep_recursion_from_small_caller_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(256 << 10)
            .spawn(|| {
                let mut sh = shell();
                let (out, buf) = OutputStream::buffer();
                sh.set_io(InputStream::Null, out, OutputStream::Null);
                sh.run_str("f() { [ $1 -gt 0 ] && f $(($1 - 1)) || echo bottom; }; f 600").unwrap();
                let bytes = buf.lock().unwrap().clone();
                String::from_utf8(bytes).unwrap()
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), "bottom\n");
    }

    #[test]
    fn test_readonly_set_var_fails() {
        let mut sh = shell();
        sh.run_str("readonly R=1").unwrap();
        assert!(sh.set_var("R", "2").is_err());
    }
}

//! Runner - AST Execution Engine
//!
//! Walks the AST one statement at a time. Each runner owns its variables,
//! working directory and descriptor table; subshells, pipeline stages,
//! substitutions and background jobs run on a forked copy so they can never
//! mutate the parent's state.
//!
//! Delegates to specialized modules for:
//! - Word expansion (expansion/)
//! - Arithmetic evaluation (arithmetic.rs)
//! - Conditional evaluation (conditionals.rs)
//! - Compound commands (control_flow.rs)
//! - Pipelines (pipeline_execution.rs)
//! - Redirections (redirections.rs)
//! - Command dispatch (command_resolution.rs)
//! - Built-in commands (builtins/)

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::ast::printer::print_word;
use crate::ast::types::*;
use crate::interpreter::command_resolution::{ExecHandler, OsExecHandler};
use crate::interpreter::environment::{Environment, Value, Variable};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::io::{Fd, InputStream, IoContext, OutputStream};
use crate::interpreter::types::{CancelToken, ExecutionLimits, ShellOptions, ShoptOptions};

pub type ExecResult<T = i32> = Result<T, InterpreterError>;

/// A statement running on its own thread after `&` or `coproc`.
#[derive(Debug)]
pub(crate) struct Job {
    pub id: u32,
    pub handle: JoinHandle<i32>,
}

/// A `>(cmd)` waiting for its statement to finish.
#[derive(Debug)]
pub(crate) struct PendingOutputSubstitution {
    pub path: tempfile::TempPath,
    pub body: ScriptNode,
}

pub struct Runner {
    pub env: Environment,
    pub cwd: PathBuf,
    pub options: ShellOptions,
    pub shopt: ShoptOptions,
    pub limits: ExecutionLimits,
    /// `$0`
    pub script_name: String,
    /// `$1`...
    pub positional: Vec<String>,
    /// `$?`
    pub last_status: i32,
    pub functions: HashMap<String, Arc<StatementNode>>,
    /// Trap commands by condition name (EXIT, ERR, signal names)
    pub traps: HashMap<String, String>,
    pub io: IoContext,
    pub(crate) exec_handler: Arc<dyn ExecHandler>,
    pub(crate) cancel: CancelToken,
    pub(crate) jobs: Vec<Job>,
    job_counter: Arc<AtomicU32>,
    /// `$!`
    pub(crate) last_background: Option<u32>,
    pub(crate) loop_depth: u32,
    pub(crate) call_depth: u32,
    pub(crate) source_depth: u32,
    /// True while running an `if`/`while` condition or the left side of
    /// `&&`/`||`, where a failure must not trigger errexit.
    pub(crate) in_condition: bool,
    /// Status of the last command substitution in the current command.
    pub(crate) substitution_status: Option<i32>,
    pub(crate) pending_inputs: Vec<tempfile::TempPath>,
    pub(crate) pending_outputs: Vec<PendingOutputSubstitution>,
    /// Captured-output files of co-processes, kept until the runner ends.
    pub(crate) coproc_files: Vec<tempfile::TempPath>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("cwd", &self.cwd)
            .field("options", &self.options)
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(env: Environment, cwd: PathBuf) -> Self {
        Self {
            env,
            cwd,
            options: ShellOptions::default(),
            shopt: ShoptOptions::default(),
            limits: ExecutionLimits::default(),
            script_name: "tasksh".to_string(),
            positional: Vec::new(),
            last_status: 0,
            functions: HashMap::new(),
            traps: HashMap::new(),
            io: IoContext::inherit(),
            exec_handler: Arc::new(OsExecHandler),
            cancel: CancelToken::new(),
            jobs: Vec::new(),
            job_counter: Arc::new(AtomicU32::new(0)),
            last_background: None,
            loop_depth: 0,
            call_depth: 0,
            source_depth: 0,
            in_condition: false,
            substitution_status: None,
            pending_inputs: Vec::new(),
            pending_outputs: Vec::new(),
            coproc_files: Vec::new(),
        }
    }

    pub fn set_exec_handler(&mut self, handler: Arc<dyn ExecHandler>) {
        self.exec_handler = handler;
    }

    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = token;
    }

    /// Copy-on-fork child: same variables, functions, options and streams;
    /// no jobs, no traps, no pending substitutions.
    pub fn fork(&self) -> Runner {
        Runner {
            env: self.env.clone(),
            cwd: self.cwd.clone(),
            options: self.options.clone(),
            shopt: self.shopt.clone(),
            limits: self.limits.clone(),
            script_name: self.script_name.clone(),
            positional: self.positional.clone(),
            last_status: self.last_status,
            functions: self.functions.clone(),
            traps: HashMap::new(),
            io: self.io.clone(),
            exec_handler: self.exec_handler.clone(),
            cancel: self.cancel.clone(),
            jobs: Vec::new(),
            job_counter: self.job_counter.clone(),
            last_background: self.last_background,
            loop_depth: self.loop_depth,
            call_depth: self.call_depth,
            source_depth: self.source_depth,
            in_condition: self.in_condition,
            substitution_status: None,
            pending_inputs: Vec::new(),
            pending_outputs: Vec::new(),
            coproc_files: Vec::new(),
        }
    }

    pub(crate) fn check_cancelled(&self) -> ExecResult<()> {
        if self.cancel.is_cancelled() {
            log::debug!("cancellation observed");
            return Err(InterpreterError::Cancelled);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Output helpers
    // ------------------------------------------------------------------

    pub(crate) fn write_out(&self, text: &str) -> std::io::Result<()> {
        self.io.stdout().write_str(text)
    }

    pub(crate) fn write_err(&self, text: &str) -> std::io::Result<()> {
        self.io.stderr().write_str(text)
    }

    /// Print `tasksh: message` on the script's stderr.
    pub(crate) fn report(&self, message: impl std::fmt::Display) {
        // Nowhere left to report a failing stderr.
        let _ = self.write_err(&format!("tasksh: {}\n", message));
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Scalar value of a variable (element 0 of an array).
    pub fn get_var(&self, name: &str) -> Option<String> {
        self.env
            .value(name, self.limits.max_nameref_depth)
            .and_then(Value::scalar)
            .map(str::to_string)
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>) -> ExecResult<()> {
        let mut value = value.into();
        if self.env.lookup(name, self.limits.max_nameref_depth).map_or(false, |v| v.integer) {
            value = self.eval_arith_text(&value)?.to_string();
        }
        self.env
            .set_scalar(name, value, self.limits.max_nameref_depth)
            .map_err(InterpreterError::Runtime)?;
        if self.options.allexport {
            self.env.attributes_mut(name).exported = true;
        }
        Ok(())
    }

    pub(crate) fn set_value(&mut self, name: &str, value: Value) -> ExecResult<()> {
        self.env
            .set_value(name, value, self.limits.max_nameref_depth)
            .map_err(InterpreterError::Runtime)
    }

    pub(crate) fn ifs(&self) -> String {
        self.get_var("IFS").unwrap_or_else(|| " \t\n".to_string())
    }

    // ------------------------------------------------------------------
    // Scripts and statement lists
    // ------------------------------------------------------------------

    /// Run a whole script and convert control-flow exits into a status.
    /// Only cancellation and fatal errors remain errors.
    pub fn run_script(&mut self, script: &ScriptNode) -> ExecResult {
        let result = self.execute_list(&script.statements);
        let status = self.finish_child(result)?;
        self.last_status = status;
        Ok(status)
    }

    pub(crate) fn execute_list(&mut self, statements: &[StatementNode]) -> ExecResult {
        let mut status = 0;
        for statement in statements {
            status = self.execute_statement(statement)?;
        }
        Ok(status)
    }

    /// Run a list with errexit suspended.
    pub(crate) fn execute_condition(&mut self, statements: &[StatementNode]) -> ExecResult {
        let saved = std::mem::replace(&mut self.in_condition, true);
        let result = self.execute_list(statements);
        self.in_condition = saved;
        result
    }

    /// Turn the outcome of a forked runner's body into its exit status,
    /// reporting terminal errors and running its EXIT trap.
    pub(crate) fn finish_child(&mut self, result: ExecResult) -> ExecResult {
        let status = match result {
            Ok(status) => status,
            Err(e @ (InterpreterError::Cancelled | InterpreterError::Fatal(_))) => return Err(e),
            Err(e) => {
                if matches!(e, InterpreterError::Nounset(_) | InterpreterError::Limit(_)) {
                    self.report(&e);
                }
                match e {
                    InterpreterError::Break(_) | InterpreterError::Continue(_) => self.last_status,
                    other => other.exit_status(),
                }
            }
        };
        self.run_exit_trap(status)
    }

    pub(crate) fn run_exit_trap(&mut self, status: i32) -> ExecResult {
        let Some(action) = self.traps.remove("EXIT") else {
            return Ok(status);
        };
        self.last_status = status;
        match self.eval_string(&action) {
            Ok(_) => Ok(status),
            Err(InterpreterError::Exit(code)) => Ok(code),
            Err(e @ (InterpreterError::Cancelled | InterpreterError::Fatal(_))) => Err(e),
            Err(_) => Ok(status),
        }
    }

    fn run_err_trap(&mut self, status: i32) -> ExecResult<()> {
        if let Some(action) = self.traps.get("ERR").cloned() {
            let saved = std::mem::replace(&mut self.in_condition, true);
            let result = self.eval_string(&action);
            self.in_condition = saved;
            self.last_status = status;
            match result {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Parse and run source text in this runner (eval, traps).
    pub(crate) fn eval_string(&mut self, source: &str) -> ExecResult {
        let script = crate::parser::parse(source)?;
        self.execute_list(&script.statements)
    }

    pub(crate) fn execute_statement(&mut self, statement: &StatementNode) -> ExecResult {
        self.check_cancelled()?;
        if self.options.noexec {
            return Ok(0);
        }
        if statement.background {
            return self.spawn_background(statement);
        }

        let inputs_mark = self.pending_inputs.len();
        let outputs_mark = self.pending_outputs.len();
        let result = self.execute_statement_inner(statement);
        self.finish_process_substitutions(inputs_mark, outputs_mark)?;

        let mut status = match result {
            Ok(status) => status,
            Err(e) if e.is_recoverable() => {
                self.report(&e);
                e.exit_status()
            }
            Err(e) => return Err(e),
        };
        if statement.negated {
            status = if status == 0 { 1 } else { 0 };
        }
        self.last_status = status;

        let and_or = matches!(
            &statement.command,
            Some(CommandNode::Binary(BinaryNode { operator: BinaryOperator::And | BinaryOperator::Or, .. }))
        );
        if status != 0 && !statement.negated && !self.in_condition && !and_or {
            self.run_err_trap(status)?;
            if self.options.errexit {
                return Err(InterpreterError::Errexit(status));
            }
        }
        Ok(status)
    }

    /// Run a statement without status bookkeeping (function bodies).
    pub(crate) fn execute_statement_inner(&mut self, statement: &StatementNode) -> ExecResult {
        match &statement.command {
            None => {
                self.substitution_status = None;
                let saved = self.apply_redirections(&statement.redirections)?;
                let result = self.apply_assignments(&statement.assignments);
                self.io = saved;
                result?;
                Ok(self.substitution_status.take().unwrap_or(0))
            }
            Some(CommandNode::Call(call)) => self.execute_simple_command(statement, call),
            Some(command) => {
                let saved = self.apply_redirections(&statement.redirections)?;
                let result = self.execute_compound(command);
                self.io = saved;
                result
            }
        }
    }

    fn execute_simple_command(&mut self, statement: &StatementNode, call: &CallNode) -> ExecResult {
        self.substitution_status = None;
        let args = self.expand_words(&call.args)?;

        if args.is_empty() {
            let saved = self.apply_redirections(&statement.redirections)?;
            let result = self.apply_assignments(&statement.assignments);
            self.io = saved;
            result?;
            return Ok(self.substitution_status.take().unwrap_or(0));
        }

        let mut prefix = Vec::with_capacity(statement.assignments.len());
        for assignment in &statement.assignments {
            let value = match &assignment.value {
                Some(word) => self.expand_word_string(word)?,
                None => String::new(),
            };
            prefix.push((assignment.name.clone(), value));
        }

        if self.options.xtrace {
            self.trace(&prefix, &args);
        }

        let saved = self.apply_redirections(&statement.redirections)?;
        let keep_redirections = args.len() == 1 && args[0] == "exec";
        let result = self.dispatch_command(&args, &prefix);
        if !keep_redirections {
            self.io = saved;
        }
        result
    }

    fn trace(&self, prefix: &[(String, String)], args: &[String]) {
        let mut words: Vec<String> = prefix
            .iter()
            .map(|(name, value)| format!("{}={}", name, quote_for_trace(value)))
            .collect();
        words.extend(args.iter().map(|a| quote_for_trace(a)));
        let _ = self.write_err(&format!("+ {}\n", words.join(" ")));
    }

    /// Assign each statement-level assignment in order.
    pub(crate) fn apply_assignments(&mut self, assignments: &[AssignmentNode]) -> ExecResult<()> {
        for assignment in assignments {
            self.apply_assignment(assignment, false)?;
        }
        Ok(())
    }

    /// Evaluate one assignment. `local` creates the binding in the current
    /// function layer first.
    pub(crate) fn apply_assignment(&mut self, assignment: &AssignmentNode, local: bool) -> ExecResult<()> {
        let name = assignment.name.as_str();
        if local {
            self.env.declare_local(name).map_err(|e| InterpreterError::Runtime(format!("local: {}", e)))?;
        }

        if let Some(elements) = &assignment.array {
            return self.assign_array_literal(name, elements, assignment.append);
        }

        let value = match &assignment.value {
            Some(word) => self.expand_word_string(word)?,
            None => String::new(),
        };

        if let Some(index) = &assignment.index {
            let key = self.element_key(name, index)?;
            let value = if assignment.append {
                let current = self.element_value(name, &key).unwrap_or_default();
                format!("{}{}", current, value)
            } else {
                value
            };
            return self
                .env
                .set_element(name, key, value, self.limits.max_nameref_depth)
                .map_err(InterpreterError::Runtime);
        }

        if assignment.append {
            let integer = self.env.lookup(name, self.limits.max_nameref_depth).map_or(false, |v| v.integer);
            let current = self.get_var(name).unwrap_or_default();
            let combined = if integer {
                let add = self.eval_arith_text(&value)?;
                let base = self.eval_arith_text(&current)?;
                base.wrapping_add(add).to_string()
            } else {
                format!("{}{}", current, value)
            };
            return self.set_var(name, combined);
        }
        self.set_var(name, value)
    }

    fn assign_array_literal(&mut self, name: &str, elements: &[ArrayElement], append: bool) -> ExecResult<()> {
        let assoc = matches!(self.env.value(name, self.limits.max_nameref_depth), Some(Value::Assoc(_)));
        if assoc {
            let mut map = match (append, self.env.value(name, self.limits.max_nameref_depth)) {
                (true, Some(Value::Assoc(existing))) => existing.clone(),
                _ => indexmap::IndexMap::new(),
            };
            for element in elements {
                let value = self.expand_word_string(&element.value)?;
                let key = match &element.index {
                    Some(index) => self.expand_word_string(index)?,
                    None => {
                        return Err(InterpreterError::Runtime(format!(
                            "{}: {}: must use subscript when assigning associative array",
                            name, value
                        )))
                    }
                };
                map.insert(key, value);
            }
            return self.set_value(name, Value::Assoc(map));
        }

        let mut map = match (append, self.env.value(name, self.limits.max_nameref_depth)) {
            (true, Some(Value::Indexed(existing))) => existing.clone(),
            (true, Some(Value::Scalar(s))) => std::collections::BTreeMap::from([(0, s.clone())]),
            _ => std::collections::BTreeMap::new(),
        };
        let mut next = map.keys().next_back().map_or(0, |k| k + 1);
        for element in elements {
            match &element.index {
                Some(index) => {
                    let text = self.expand_word_string(index)?;
                    let i = self.eval_arith_text(&text)?;
                    let value = self.expand_word_string(&element.value)?;
                    map.insert(i, value);
                    next = i + 1;
                }
                None => {
                    for value in self.expand_words(std::slice::from_ref(&element.value))? {
                        map.insert(next, value);
                        next += 1;
                    }
                }
            }
        }
        self.set_value(name, Value::Indexed(map))
    }

    // ------------------------------------------------------------------
    // Background jobs
    // ------------------------------------------------------------------

    pub(crate) fn next_job_id(&self) -> u32 {
        self.job_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn spawn_background(&mut self, statement: &StatementNode) -> ExecResult {
        let mut fork = self.fork();
        fork.io.set(0, Fd::Input(InputStream::Null));
        let mut statement = statement.clone();
        statement.background = false;
        let id = self.start_job(fork, statement)?;
        self.last_background = Some(id);
        Ok(0)
    }

    /// Run `statement` on its own thread in `fork`.
    pub(crate) fn start_job(&mut self, mut fork: Runner, statement: StatementNode) -> ExecResult<u32> {
        let id = self.next_job_id();
        log::debug!("background job {} started", id);
        let builder = std::thread::Builder::new()
            .name(format!("tasksh-job-{}", id))
            .stack_size(self.limits.thread_stack_size());
        let handle = builder.spawn(move || {
            let result = fork.execute_statement(&statement);
            let status = match fork.finish_child(result) {
                Ok(status) => status,
                Err(e) => {
                    log::debug!("background job {} stopped: {}", id, e);
                    e.exit_status()
                }
            };
            fork.wait_all();
            log::debug!("background job {} finished with status {}", id, status);
            status
        })?;
        self.jobs.push(Job { id, handle });
        Ok(id)
    }

    /// Join one job; `None` if no such job belongs to this runner.
    pub(crate) fn wait_job(&mut self, id: u32) -> Option<i32> {
        let index = self.jobs.iter().position(|j| j.id == id)?;
        let job = self.jobs.remove(index);
        Some(job.handle.join().unwrap_or(1))
    }

    /// Join every job; returns the status of the last one.
    pub(crate) fn wait_all(&mut self) -> i32 {
        let mut status = 0;
        for job in std::mem::take(&mut self.jobs) {
            status = job.handle.join().unwrap_or(1);
        }
        status
    }

    pub(crate) fn spawn_coproc(&mut self, node: &CoprocNode) -> ExecResult {
        let name = node.name.clone().unwrap_or_else(|| "COPROC".to_string());
        let file = tempfile::NamedTempFile::new()?;
        let (file, path) = file.into_parts();
        let mut fork = self.fork();
        fork.io.set(0, Fd::Input(InputStream::Null));
        fork.io.set(1, Fd::Output(OutputStream::File(Arc::new(file))));
        let id = self.start_job(fork, (*node.body).clone())?;
        let display = path.to_string_lossy().into_owned();
        self.coproc_files.push(path);
        self.set_value(&name, Value::Indexed(std::collections::BTreeMap::from([(0, display)])))?;
        self.set_var(&format!("{}_PID", name), id.to_string())?;
        self.last_background = Some(id);
        Ok(0)
    }

    // ------------------------------------------------------------------
    // Process substitution bookkeeping
    // ------------------------------------------------------------------

    /// Run queued `>(cmd)` readers and drop temp files created since the
    /// marks were taken.
    fn finish_process_substitutions(&mut self, inputs_mark: usize, outputs_mark: usize) -> ExecResult<()> {
        if self.pending_outputs.len() > outputs_mark {
            let pending: Vec<PendingOutputSubstitution> = self.pending_outputs.drain(outputs_mark..).collect();
            for substitution in pending {
                let file = std::fs::File::open(&substitution.path)?;
                let mut fork = self.fork();
                fork.io.set(0, Fd::Input(InputStream::File(Arc::new(file))));
                let result = fork.execute_list(&substitution.body.statements);
                fork.finish_child(result)?;
            }
        }
        self.pending_inputs.truncate(inputs_mark);
        Ok(())
    }

    /// Names visible to `${!prefix*}`, `set` and `declare -p`.
    pub(crate) fn variable_names(&self) -> Vec<String> {
        self.env.names()
    }

    pub(crate) fn variable(&self, name: &str) -> Option<&Variable> {
        self.env.lookup(name, self.limits.max_nameref_depth)
    }
}

/// Quote an xtrace word only when needed.
fn quote_for_trace(word: &str) -> String {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c)) {
        word.to_string()
    } else {
        crate::ast::printer::quote_single(word)
    }
}

/// Text of a word as written, for diagnostics.
pub(crate) fn word_text(word: &WordNode) -> String {
    print_word(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn runner_with_capture() -> (Runner, Arc<std::sync::Mutex<Vec<u8>>>, Arc<std::sync::Mutex<Vec<u8>>>) {
        let mut runner = Runner::new(Environment::from_exported([("PATH", "/usr/bin:/bin")]), std::env::temp_dir());
        let (out, out_buf) = OutputStream::buffer();
        let (err, err_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, out, err);
        (runner, out_buf, err_buf)
    }

    fn run(source: &str) -> (i32, String, String) {
        let (mut runner, out, err) = runner_with_capture();
        let status = runner.run_script(&parse(source).unwrap()).unwrap();
        let out = String::from_utf8(out.lock().unwrap().clone()).unwrap();
        let err = String::from_utf8(err.lock().unwrap().clone()).unwrap();
        (status, out, err)
    }

    #[test]
    fn test_sequential_status() {
        assert_eq!(run("true; false").0, 1);
        assert_eq!(run("false; true").0, 0);
        assert_eq!(run("false; echo $?").1, "1\n");
    }

    #[test]
    fn test_negation() {
        assert_eq!(run("! false").0, 0);
        assert_eq!(run("! true").0, 1);
    }

    #[test]
    fn test_assignment_only_statement() {
        assert_eq!(run("x=hello; echo $x").1, "hello\n");
        assert_eq!(run("x=$(false); echo $?").1, "1\n");
    }

    #[test]
    fn test_prefix_assignment_is_temporary_for_builtins() {
        assert_eq!(run("x=1; x=2 true; echo $x").1, "1\n");
    }

    #[test]
    fn test_errexit() {
        let (status, out, _) = run("set -e; echo a; false; echo b");
        assert_eq!(status, 1);
        assert_eq!(out, "a\n");
        assert_eq!(run("set -e; false || true; echo ok").1, "ok\n");
        assert_eq!(run("set -e; if false; then :; fi; echo ok").1, "ok\n");
        assert_eq!(run("set -e; false && true; echo ok").1, "ok\n");
        assert_eq!(run("set -e; ! true; echo ok").1, "ok\n");
    }

    #[test]
    fn test_recoverable_errors_continue() {
        let (status, out, err) = run("echo $((1/0)); echo after");
        assert_eq!(status, 0);
        assert_eq!(out, "after\n");
        assert!(err.contains("division by 0"), "{}", err);
    }

    #[test]
    fn test_nounset_stops_script() {
        let (status, out, err) = run("set -u; echo $missing; echo after");
        assert_eq!(status, 1);
        assert_eq!(out, "");
        assert!(err.contains("missing: unbound variable"));
    }

    #[test]
    fn test_exit_and_trap() {
        let (status, out, _) = run("trap 'echo bye' EXIT; echo hi; exit 3; echo never");
        assert_eq!(status, 3);
        assert_eq!(out, "hi\nbye\n");
    }

    #[test]
    fn test_err_trap() {
        assert_eq!(run("trap 'echo failed' ERR; false; true").1, "failed\n");
    }

    #[test]
    fn test_background_and_wait() {
        let (_, out, _) = run("echo bg > /dev/null & wait; echo done");
        assert_eq!(out, "done\n");
        assert_eq!(run("(exit 4) & wait $!; echo $?").1, "4\n");
    }

    #[test]
    fn test_fork_isolation() {
        assert_eq!(run("x=1; (x=2); echo $x").1, "1\n");
        assert_eq!(run("x=1; y=$(x=2; echo $x); echo $x$y").1, "12\n");
    }

    #[test]
    fn test_cancellation() {
        let (mut runner, _, _) = runner_with_capture();
        runner.cancel.cancel();
        let result = runner.run_script(&parse("echo hi").unwrap());
        assert!(matches!(result, Err(InterpreterError::Cancelled)));
    }

    #[test]
    fn test_xtrace() {
        let (_, _, err) = run("set -x; echo 'a b' c");
        assert_eq!(err, "+ echo 'a b' c\n");
    }

    #[test]
    fn test_array_assignment() {
        assert_eq!(run("a=(x y [5]=z); echo ${a[@]} ${!a[@]}").1, "x y z 0 1 5\n");
        assert_eq!(run("a=(x); a+=(y); a[0]+=1; echo ${a[@]}").1, "x1 y\n");
        assert_eq!(run("declare -A m; m=([k]=v [j]=w); echo ${m[k]}${m[j]}").1, "vw\n");
    }
}

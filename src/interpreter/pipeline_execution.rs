//! Pipeline Execution
//!
//! Handles execution of command pipelines (cmd1 | cmd2 | cmd3).
//!
//! Every stage runs concurrently in its own forked runner, connected by OS
//! pipes, so a stage that stops reading lets the writer see a broken pipe
//! instead of buffering forever.

use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use crate::ast::types::*;
use crate::interpreter::environment::Value;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::io::{Fd, InputStream, OutputStream};
use crate::interpreter::runner::{ExecResult, Runner};

/// One stage of a flattened pipeline.
#[derive(Debug, Clone, Copy)]
struct Stage<'a> {
    statement: &'a StatementNode,
    /// `|&`: stderr joins stdout into the pipe
    with_stderr: bool,
}

/// Result of executing a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Exit codes of all commands in the pipeline (for PIPESTATUS)
    pub pipestatus: Vec<i32>,
}

impl PipelineResult {
    /// Status of the whole pipeline: the last stage, or with `pipefail`
    /// the rightmost stage that failed.
    pub fn exit_code(&self, pipefail: bool) -> i32 {
        if pipefail {
            self.pipestatus.iter().rev().copied().find(|s| *s != 0).unwrap_or(0)
        } else {
            self.pipestatus.last().copied().unwrap_or(0)
        }
    }
}

fn flatten<'a>(statement: &'a StatementNode, stages: &mut Vec<Stage<'a>>) {
    match &statement.command {
        Some(CommandNode::Binary(node))
            if matches!(node.operator, BinaryOperator::Pipe | BinaryOperator::PipeAll)
                && !statement.negated
                && statement.redirections.is_empty()
                && statement.assignments.is_empty() =>
        {
            flatten_binary(node, stages)
        }
        _ => stages.push(Stage { statement, with_stderr: false }),
    }
}

fn flatten_binary<'a>(node: &'a BinaryNode, stages: &mut Vec<Stage<'a>>) {
    flatten(&node.left, stages);
    if let Some(last) = stages.last_mut() {
        last.with_stderr = node.operator == BinaryOperator::PipeAll;
    }
    flatten(&node.right, stages);
}

impl Runner {
    pub(crate) fn execute_pipeline(&mut self, node: &BinaryNode) -> ExecResult {
        let mut stages = Vec::new();
        flatten_binary(node, &mut stages);
        log::trace!("pipeline with {} stages", stages.len());

        let result = self.run_stages(&stages)?;
        let pipestatus: BTreeMap<i64, String> =
            result.pipestatus.iter().enumerate().map(|(i, s)| (i as i64, s.to_string())).collect();
        self.set_value("PIPESTATUS", Value::Indexed(pipestatus))?;
        Ok(result.exit_code(self.options.pipefail))
    }

    fn run_stages(&mut self, stages: &[Stage<'_>]) -> ExecResult<PipelineResult> {
        let count = stages.len();
        let stack_size = self.limits.thread_stack_size();
        let outcomes = std::thread::scope(|scope| -> io::Result<Vec<ExecResult>> {
            let mut handles = Vec::with_capacity(count);
            let mut next_input: Option<InputStream> = None;
            for (i, stage) in stages.iter().enumerate() {
                let mut fork = self.fork();
                if let Some(input) = next_input.take() {
                    fork.io.set(0, Fd::Input(input));
                }
                if i + 1 < count {
                    let (reader, writer) = io::pipe()?;
                    let output = OutputStream::Pipe(Arc::new(writer));
                    if stage.with_stderr {
                        fork.io.set(2, Fd::Output(output.clone()));
                    }
                    fork.io.set(1, Fd::Output(output));
                    next_input = Some(InputStream::Pipe(Arc::new(reader)));
                }
                let statement = stage.statement;
                let builder = std::thread::Builder::new().stack_size(stack_size);
                handles.push(builder.spawn_scoped(scope, move || {
                    let result = fork.execute_statement(statement);
                    let status = fork.finish_child(result);
                    fork.wait_all();
                    status
                })?);
            }
            Ok(handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(Ok(1)))
                .collect())
        })?;

        let mut pipestatus = Vec::with_capacity(count);
        for outcome in outcomes {
            match outcome {
                Ok(status) => pipestatus.push(status),
                Err(e) => return Err(e),
            }
        }
        Ok(PipelineResult { pipestatus })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::interpreter::io::IoContext;
    use crate::parser::parse;

    fn run(source: &str) -> (i32, String) {
        let mut runner = Runner::new(Environment::from_exported([("PATH", "/usr/bin:/bin")]), std::env::temp_dir());
        let (out, out_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, out, OutputStream::Null);
        let status = runner.run_script(&parse(source).unwrap()).unwrap();
        let bytes = out_buf.lock().unwrap().clone();
        (status, String::from_utf8(bytes).unwrap())
    }

    #[test]
    fn test_exit_code_selection() {
        let result = PipelineResult { pipestatus: vec![0, 3, 0] };
        assert_eq!(result.exit_code(false), 0);
        assert_eq!(result.exit_code(true), 3);
        let result = PipelineResult { pipestatus: vec![2, 0, 5] };
        assert_eq!(result.exit_code(true), 5);
    }

    #[test]
    fn test_builtin_pipeline() {
        assert_eq!(run("echo hello | { read x; echo got $x; }").1, "got hello\n");
        assert_eq!(run("printf 'a\\nb\\n' | while read l; do echo [$l]; done").1, "[a]\n[b]\n");
    }

    #[test]
    fn test_pipefail_and_pipestatus() {
        assert_eq!(run("false | true").0, 0);
        assert_eq!(run("set -o pipefail; false | true").0, 1);
        assert_eq!(run("(exit 2) | (exit 3) | true; echo ${PIPESTATUS[@]}").1, "2 3 0\n");
    }

    #[test]
    fn test_stages_do_not_leak_state() {
        assert_eq!(run("x=1; echo | x=2; echo $x").1, "1\n");
        assert_eq!(run("echo v | read y; echo \"[$y]\"").1, "[]\n");
    }

    #[test]
    fn test_stderr_pipe() {
        assert_eq!(run("{ echo err >&2; } |& { read l; echo \"<$l>\"; }").1, "<err>\n");
    }

    #[test]
    fn test_external_stages() {
        assert_eq!(run("printf 'b\\na\\n' | sort | head -n 1").1, "a\n");
    }

    #[test]
    fn test_negated_pipeline() {
        assert_eq!(run("! echo x | false").0, 0);
    }
}

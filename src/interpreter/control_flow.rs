//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - for loops (word list and C-style)
//! - while / until loops
//! - case statements with `;;`, `;&` and `;;&`
//! - && / || lists, groups and subshells
//! - break/continue unwinding

use crate::ast::types::*;
use crate::interpreter::errors::{FatalError, InterpreterError};
use crate::interpreter::runner::{ExecResult, Runner};
use crate::shell::pattern::{Pattern, PatternOptions};

/// What a loop does after one pass over its body.
enum Flow {
    Normal(i32),
    Break,
    Continue,
}

/// Consume a break/continue aimed at this loop; outer levels keep unwinding.
fn loop_flow(result: ExecResult) -> ExecResult<Flow> {
    match result {
        Ok(status) => Ok(Flow::Normal(status)),
        Err(InterpreterError::Break(n)) if n > 1 => Err(InterpreterError::Break(n - 1)),
        Err(InterpreterError::Break(_)) => Ok(Flow::Break),
        Err(InterpreterError::Continue(n)) if n > 1 => Err(InterpreterError::Continue(n - 1)),
        Err(InterpreterError::Continue(_)) => Ok(Flow::Continue),
        Err(e) => Err(e),
    }
}

impl Runner {
    /// Run any command other than a simple command.
    pub(crate) fn execute_compound(&mut self, command: &CommandNode) -> ExecResult {
        match command {
            CommandNode::Call(_) => Err(InterpreterError::Fatal(FatalError::Internal(
                "simple command reached compound dispatch".to_string(),
            ))),
            CommandNode::Binary(node) => match node.operator {
                BinaryOperator::And | BinaryOperator::Or => self.execute_and_or(node),
                BinaryOperator::Pipe | BinaryOperator::PipeAll => self.execute_pipeline(node),
            },
            CommandNode::Block(node) => self.execute_list(&node.body),
            CommandNode::Subshell(node) => self.execute_subshell(&node.body),
            CommandNode::If(node) => self.execute_if(node),
            CommandNode::While(node) => self.in_loop(|runner| runner.execute_while(node)),
            CommandNode::For(node) => self.in_loop(|runner| runner.execute_for(node)),
            CommandNode::Case(node) => self.execute_case(node),
            CommandNode::FunctionDecl(node) => {
                log::trace!("defining function {}", node.name);
                self.functions.insert(node.name.clone(), node.body.clone());
                Ok(0)
            }
            CommandNode::Arithmetic(node) => {
                let value = self.eval_arith(&node.expression)?;
                Ok(if value != 0 { 0 } else { 1 })
            }
            CommandNode::Test(node) => self.execute_test_clause(node),
            CommandNode::Declare(node) => self.execute_declare(node),
            CommandNode::Let(node) => {
                let mut last = 0;
                for arg in &node.args {
                    let text = self.expand_word_string(arg)?;
                    last = self.eval_arith_text(&text)?;
                }
                Ok(if last != 0 { 0 } else { 1 })
            }
            CommandNode::Coproc(node) => self.spawn_coproc(node),
        }
    }

    fn execute_and_or(&mut self, node: &BinaryNode) -> ExecResult {
        let saved = std::mem::replace(&mut self.in_condition, true);
        let left = self.execute_statement(&node.left);
        self.in_condition = saved;
        let left = left?;
        let run_right = match node.operator {
            BinaryOperator::And => left == 0,
            _ => left != 0,
        };
        if run_right {
            self.execute_statement(&node.right)
        } else {
            Ok(left)
        }
    }

    /// `( list )`: runs in a forked runner; nothing leaks back.
    pub(crate) fn execute_subshell(&mut self, body: &[StatementNode]) -> ExecResult {
        let mut fork = self.fork();
        let result = fork.execute_list(body);
        let status = fork.finish_child(result)?;
        fork.wait_all();
        Ok(status)
    }

    fn execute_if(&mut self, node: &IfNode) -> ExecResult {
        for clause in &node.clauses {
            if self.execute_condition(&clause.condition)? == 0 {
                return self.execute_list(&clause.body);
            }
        }
        match &node.else_body {
            Some(body) => self.execute_list(body),
            None => Ok(0),
        }
    }

    fn in_loop<F>(&mut self, f: F) -> ExecResult
    where
        F: FnOnce(&mut Runner) -> ExecResult,
    {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    fn count_iteration(&self, iterations: &mut u64, keyword: &str) -> ExecResult<()> {
        self.check_cancelled()?;
        *iterations += 1;
        if *iterations > self.limits.max_loop_iterations {
            return Err(InterpreterError::Limit(format!(
                "{}: too many iterations ({})",
                keyword, self.limits.max_loop_iterations
            )));
        }
        Ok(())
    }

    fn execute_while(&mut self, node: &WhileNode) -> ExecResult {
        let keyword = if node.until { "until" } else { "while" };
        let mut status = 0;
        let mut iterations = 0;
        loop {
            self.count_iteration(&mut iterations, keyword)?;
            let condition = match loop_flow(self.execute_condition(&node.condition))? {
                Flow::Normal(status) => status,
                Flow::Break => break,
                Flow::Continue => continue,
            };
            if (condition == 0) == node.until {
                break;
            }
            match loop_flow(self.execute_list(&node.body))? {
                Flow::Normal(s) => status = s,
                Flow::Break => {
                    status = 0;
                    break;
                }
                Flow::Continue => status = 0,
            }
        }
        Ok(status)
    }

    fn execute_for(&mut self, node: &ForNode) -> ExecResult {
        match &node.kind {
            ForKind::WordList { variable, words } => {
                let items = match words {
                    Some(words) => self.expand_words(words)?,
                    None => self.positional.clone(),
                };
                let mut status = 0;
                let mut iterations = 0;
                for item in items {
                    self.count_iteration(&mut iterations, "for")?;
                    self.set_var(variable, item)?;
                    match loop_flow(self.execute_list(&node.body))? {
                        Flow::Normal(s) => status = s,
                        Flow::Break => {
                            status = 0;
                            break;
                        }
                        Flow::Continue => status = 0,
                    }
                }
                Ok(status)
            }
            ForKind::CStyle { init, condition, update } => {
                if let Some(init) = init {
                    self.eval_arith(init)?;
                }
                let mut status = 0;
                let mut iterations = 0;
                loop {
                    self.count_iteration(&mut iterations, "for")?;
                    if let Some(condition) = condition {
                        if self.eval_arith(condition)? == 0 {
                            break;
                        }
                    }
                    match loop_flow(self.execute_list(&node.body))? {
                        Flow::Normal(s) => status = s,
                        Flow::Break => {
                            status = 0;
                            break;
                        }
                        Flow::Continue => status = 0,
                    }
                    if let Some(update) = update {
                        self.eval_arith(update)?;
                    }
                }
                Ok(status)
            }
        }
    }

    fn case_matches(&mut self, subject: &str, item: &CaseItemNode) -> ExecResult<bool> {
        let options = PatternOptions { extglob: self.shopt.extglob, nocase: self.shopt.nocasematch };
        for word in &item.patterns {
            let pattern = self.expand_word_pattern(word)?;
            if Pattern::new(&pattern, options).is_match(subject) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn execute_case(&mut self, node: &CaseNode) -> ExecResult {
        let subject = self.expand_word_string(&node.word)?;
        let mut status = 0;
        let mut fall_through = false;
        for item in &node.items {
            if !fall_through && !self.case_matches(&subject, item)? {
                continue;
            }
            status = self.execute_list(&item.body)?;
            match item.terminator {
                CaseTerminator::Break => return Ok(status),
                CaseTerminator::FallThrough => fall_through = true,
                CaseTerminator::ContinueMatching => fall_through = false,
            }
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::interpreter::io::{InputStream, IoContext, OutputStream};
    use crate::parser::parse;

    fn run(source: &str) -> (i32, String, String) {
        let mut runner = Runner::new(Environment::new(), std::env::temp_dir());
        let (out, out_buf) = OutputStream::buffer();
        let (err, err_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, out, err);
        let status = runner.run_script(&parse(source).unwrap()).unwrap();
        let out = String::from_utf8(out_buf.lock().unwrap().clone()).unwrap();
        let err = String::from_utf8(err_buf.lock().unwrap().clone()).unwrap();
        (status, out, err)
    }

    #[test]
    fn test_if_elif_else() {
        assert_eq!(run("if false; then echo a; elif true; then echo b; else echo c; fi").1, "b\n");
        assert_eq!(run("if false; then echo a; fi").0, 0);
    }

    #[test]
    fn test_while_and_until() {
        assert_eq!(run("i=0; while (( i < 3 )); do echo $i; i=$((i+1)); done").1, "0\n1\n2\n");
        assert_eq!(run("i=0; until [[ $i == 2 ]]; do i=$((i+1)); done; echo $i").1, "2\n");
    }

    #[test]
    fn test_for_loops() {
        assert_eq!(run("for x in a 'b c'; do echo \"$x\"; done").1, "a\nb c\n");
        assert_eq!(run("set -- p q; for x; do echo $x; done").1, "p\nq\n");
        assert_eq!(run("for ((i=0; i<3; i++)); do echo -n $i; done").1, "012");
        assert_eq!(run("for x in; do echo never; done; echo $?").1, "0\n");
    }

    #[test]
    fn test_break_and_continue_levels() {
        let script = "for i in 1 2 3; do for j in a b; do [[ $j == b ]] && continue 2; [[ $i == 3 ]] && break 2; echo $i$j; done; done";
        assert_eq!(run(script).1, "1a\n2a\n");
        assert_eq!(run("for i in 1 2 3; do [[ $i == 2 ]] && continue; echo $i; done").1, "1\n3\n");
    }

    #[test]
    fn test_case_terminators() {
        let script = "case foo in f*) echo one ;& bar) echo two ;; *) echo three ;; esac";
        assert_eq!(run(script).1, "one\ntwo\n");
        let script = "case foo in f*) echo one ;;& *o) echo two ;;& x) echo three ;; esac";
        assert_eq!(run(script).1, "one\ntwo\n");
        assert_eq!(run("case x in y) echo no ;; esac; echo $?").1, "0\n");
        assert_eq!(run("v='*'; case a in \"$v\") echo lit ;; $v) echo glob ;; esac").1, "glob\n");
    }

    #[test]
    fn test_case_nocasematch() {
        assert_eq!(run("shopt -s nocasematch; case ABC in abc) echo hit ;; esac").1, "hit\n");
    }

    #[test]
    fn test_and_or_lists() {
        assert_eq!(run("false && echo a || echo b").1, "b\n");
        assert_eq!(run("true || echo a; echo $?").1, "0\n");
    }

    #[test]
    fn test_group_vs_subshell() {
        assert_eq!(run("x=1; { x=2; }; echo $x").1, "2\n");
        assert_eq!(run("x=1; (x=2; exit 5); echo $? $x").1, "5 1\n");
    }

    #[test]
    fn test_loop_limit() {
        let mut runner = Runner::new(Environment::new(), std::env::temp_dir());
        runner.limits.max_loop_iterations = 10;
        let (err, err_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, OutputStream::Null, err);
        let status = runner.run_script(&parse("while true; do :; done; echo after").unwrap()).unwrap();
        assert_eq!(status, 1);
        let err = String::from_utf8(err_buf.lock().unwrap().clone()).unwrap();
        assert!(err.contains("too many iterations"));
    }

    #[test]
    fn test_arithmetic_command_status() {
        assert_eq!(run("(( 0 ))").0, 1);
        assert_eq!(run("(( 2 > 1 ))").0, 0);
        assert_eq!(run("let 'x = 3' 'x * 0'; echo $? $x").1, "1 3\n");
    }
}

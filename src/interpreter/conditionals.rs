//! Conditional Expression Evaluation
//!
//! Handles:
//! - [[ ... ]] conditional commands
//! - File tests (-f, -d, -e, etc.) and string tests (-z, -n)
//! - String, pattern (==) and regex (=~) comparisons
//! - Numeric comparisons (-eq, -ne, -lt, etc.)
//!
//! The unary and binary primitives are shared with the `test`/`[` builtin.

use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::Path;

use regex_lite::Regex;

use crate::ast::types::*;
use crate::interpreter::environment::Value;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::io::{Fd, InputStream, OutputStream};
use crate::interpreter::runner::{ExecResult, Runner};
use crate::shell::pattern::{Pattern, PatternOptions};

/// access(2) against a path.
fn accessible(path: &Path, mode: libc::c_int) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the call.
    unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
}

fn is_tty(fd: i32) -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(fd) == 1 }
}

fn modified(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Integer operand of `-eq` and friends in `test`.
pub(crate) fn parse_test_integer(text: &str) -> Result<i64, String> {
    let trimmed = text.trim();
    trimmed.parse::<i64>().map_err(|_| format!("{}: integer expression expected", text))
}

impl Runner {
    /// `[[ ... ]]`: 0 true, 1 false, 2 on evaluation errors.
    pub(crate) fn execute_test_clause(&mut self, node: &TestClauseNode) -> ExecResult {
        match self.eval_test_expr(&node.expression) {
            Ok(true) => Ok(0),
            Ok(false) => Ok(1),
            Err(InterpreterError::Runtime(message)) => {
                self.report(message);
                Ok(2)
            }
            Err(e) => Err(e),
        }
    }

    fn eval_test_expr(&mut self, expr: &TestExpr) -> ExecResult<bool> {
        match expr {
            TestExpr::Word(word) => Ok(!self.expand_word_string(word)?.is_empty()),
            TestExpr::Not(inner) => Ok(!self.eval_test_expr(inner)?),
            TestExpr::Group(inner) => self.eval_test_expr(inner),
            TestExpr::And(left, right) => Ok(self.eval_test_expr(left)? && self.eval_test_expr(right)?),
            TestExpr::Or(left, right) => Ok(self.eval_test_expr(left)? || self.eval_test_expr(right)?),
            TestExpr::Unary { operator, operand } => {
                let operand = self.expand_word_string(operand)?;
                Ok(self.unary_test(*operator, &operand))
            }
            TestExpr::Binary { operator, left, right } => {
                let left_value = self.expand_word_string(left)?;
                match operator {
                    BinaryTestOperator::StrEq | BinaryTestOperator::StrNe => {
                        let source = self.expand_word_pattern(right)?;
                        let pattern = Pattern::new(
                            &source,
                            PatternOptions { extglob: true, nocase: self.shopt.nocasematch },
                        );
                        let matched = pattern.is_match(&left_value);
                        Ok(if *operator == BinaryTestOperator::StrEq { matched } else { !matched })
                    }
                    BinaryTestOperator::Match => {
                        let source = self.expand_word_regex(right)?;
                        self.regex_match(&left_value, &source)
                    }
                    BinaryTestOperator::NumEq
                    | BinaryTestOperator::NumNe
                    | BinaryTestOperator::NumLt
                    | BinaryTestOperator::NumLe
                    | BinaryTestOperator::NumGt
                    | BinaryTestOperator::NumGe => {
                        let right_value = self.expand_word_string(right)?;
                        let a = self.eval_arith_text(&left_value)?;
                        let b = self.eval_arith_text(&right_value)?;
                        Ok(compare_numbers(*operator, a, b))
                    }
                    _ => {
                        let right_value = self.expand_word_string(right)?;
                        self.binary_test(*operator, &left_value, &right_value)
                            .map_err(InterpreterError::Runtime)
                    }
                }
            }
        }
    }

    /// `=~`; captures land in BASH_REMATCH.
    fn regex_match(&mut self, text: &str, source: &str) -> ExecResult<bool> {
        let source = if self.shopt.nocasematch { format!("(?i){}", source) } else { source.to_string() };
        let regex = Regex::new(&source)
            .map_err(|_| InterpreterError::Runtime(format!("invalid regular expression `{}'", source)))?;
        let Some(captures) = regex.captures(text) else {
            self.set_value("BASH_REMATCH", Value::Indexed(Default::default()))?;
            return Ok(false);
        };
        let groups = (0..captures.len())
            .map(|i| (i as i64, captures.get(i).map_or(String::new(), |m| m.as_str().to_string())))
            .collect();
        self.set_value("BASH_REMATCH", Value::Indexed(groups))?;
        Ok(true)
    }

    pub(crate) fn resolve_path(&self, path: &str) -> std::path::PathBuf {
        self.cwd.join(path)
    }

    /// Unary primitive shared by `[[ ]]` and `test`.
    pub(crate) fn unary_test(&self, operator: UnaryTestOperator, operand: &str) -> bool {
        use UnaryTestOperator::*;
        match operator {
            EmptyString => return operand.is_empty(),
            NonEmptyString => return !operand.is_empty(),
            VarSet => return self.is_var_set(operand),
            OptionSet => return self.options.get(operand).unwrap_or(false),
            Terminal => return self.is_terminal(operand),
            _ => {}
        }
        if operand.is_empty() {
            return false;
        }
        let path = self.resolve_path(operand);
        if operator == Symlink {
            return fs::symlink_metadata(&path).map(|m| m.file_type().is_symlink()).unwrap_or(false);
        }
        let Ok(meta) = fs::metadata(&path) else {
            return false;
        };
        let mode = meta.permissions().mode();
        match operator {
            Exists => true,
            RegularFile => meta.is_file(),
            Directory => meta.is_dir(),
            Readable => accessible(&path, libc::R_OK),
            Writable => accessible(&path, libc::W_OK),
            Executable => accessible(&path, libc::X_OK),
            NonEmptyFile => meta.len() > 0,
            BlockDevice => meta.file_type().is_block_device(),
            CharDevice => meta.file_type().is_char_device(),
            NamedPipe => meta.file_type().is_fifo(),
            Socket => meta.file_type().is_socket(),
            SetGid => mode & libc::S_ISGID as u32 != 0,
            SetUid => mode & libc::S_ISUID as u32 != 0,
            Sticky => mode & libc::S_ISVTX as u32 != 0,
            // SAFETY: geteuid/getegid cannot fail.
            OwnedByUser => meta.uid() == unsafe { libc::geteuid() },
            OwnedByGroup => meta.gid() == unsafe { libc::getegid() },
            Symlink | EmptyString | NonEmptyString | VarSet | OptionSet | Terminal => false,
        }
    }

    /// Binary primitive shared by `[[ ]]` and `test`; plain string
    /// comparison for `=`/`!=`.
    pub(crate) fn binary_test(&self, operator: BinaryTestOperator, left: &str, right: &str) -> Result<bool, String> {
        use BinaryTestOperator::*;
        Ok(match operator {
            StrEq | Match => left == right,
            StrNe => left != right,
            StrLt => left < right,
            StrGt => left > right,
            NumEq | NumNe | NumLt | NumLe | NumGt | NumGe => {
                compare_numbers(operator, parse_test_integer(left)?, parse_test_integer(right)?)
            }
            NewerThan => match (modified(&self.resolve_path(left)), modified(&self.resolve_path(right))) {
                (Some(a), Some(b)) => a > b,
                (Some(_), None) => true,
                _ => false,
            },
            OlderThan => match (modified(&self.resolve_path(left)), modified(&self.resolve_path(right))) {
                (Some(a), Some(b)) => a < b,
                (None, Some(_)) => true,
                _ => false,
            },
            SameFile => match (fs::metadata(self.resolve_path(left)), fs::metadata(self.resolve_path(right))) {
                (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
                _ => false,
            },
        })
    }

    /// `-v name` / `-v name[index]`
    fn is_var_set(&self, operand: &str) -> bool {
        let depth = self.limits.max_nameref_depth;
        if let Some((name, rest)) = operand.split_once('[') {
            let key = rest.trim_end_matches(']');
            return match self.env.value(name, depth) {
                Some(Value::Indexed(map)) => key.parse::<i64>().map_or(false, |i| map.contains_key(&i)),
                Some(Value::Assoc(map)) => map.contains_key(key),
                Some(Value::Scalar(_)) => key == "0",
                None => false,
            };
        }
        if let Ok(n) = operand.parse::<usize>() {
            return n >= 1 && n <= self.positional.len();
        }
        self.env.value(operand, depth).is_some()
    }

    /// `-t fd`: only descriptors still bound to the host terminal count.
    pub(crate) fn is_terminal(&self, operand: &str) -> bool {
        let Ok(fd) = operand.trim().parse::<u32>() else {
            return false;
        };
        match self.io.get(fd) {
            Some(Fd::Input(InputStream::Stdin)) if fd == 0 => is_tty(0),
            Some(Fd::Output(OutputStream::Stdout)) => is_tty(1),
            Some(Fd::Output(OutputStream::Stderr)) => is_tty(2),
            _ => false,
        }
    }
}

fn compare_numbers(operator: BinaryTestOperator, a: i64, b: i64) -> bool {
    match operator {
        BinaryTestOperator::NumEq => a == b,
        BinaryTestOperator::NumNe => a != b,
        BinaryTestOperator::NumLt => a < b,
        BinaryTestOperator::NumLe => a <= b,
        BinaryTestOperator::NumGt => a > b,
        BinaryTestOperator::NumGe => a >= b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::parser::parse;
    use tempfile::TempDir;

    fn check(runner: &mut Runner, source: &str) -> i32 {
        let script = parse(source).unwrap();
        match &script.statements[0].command {
            Some(CommandNode::Test(node)) => runner.execute_test_clause(node).unwrap(),
            other => panic!("not a test clause: {:?}", other),
        }
    }

    fn runner(cwd: &Path) -> Runner {
        let mut runner = Runner::new(Environment::new(), cwd.to_path_buf());
        let (err, _) = OutputStream::buffer();
        runner.io.set(2, Fd::Output(err));
        runner
    }

    #[test]
    fn test_string_and_pattern() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        r.set_var("f", "report.txt").unwrap();
        assert_eq!(check(&mut r, "[[ $f == *.txt ]]"), 0);
        assert_eq!(check(&mut r, "[[ $f == \"*.txt\" ]]"), 1);
        assert_eq!(check(&mut r, "[[ $f != *.md ]]"), 0);
        assert_eq!(check(&mut r, "[[ -n $f && -z $empty ]]"), 0);
        assert_eq!(check(&mut r, "[[ a < b ]]"), 0);
        assert_eq!(check(&mut r, "[[ ! -n $f || x ]]"), 0);
    }

    #[test]
    fn test_numeric() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(check(&mut r, "[[ 10 -gt 9 ]]"), 0);
        assert_eq!(check(&mut r, "[[ 1+1 -eq 2 ]]"), 0);
    }

    #[test]
    fn test_regex_captures() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(check(&mut r, "[[ v1.22 =~ ^v([0-9]+)\\.([0-9]+)$ ]]"), 0);
        let groups = r.env.value("BASH_REMATCH", 10).unwrap().elements();
        assert_eq!(groups, vec!["v1.22", "1", "22"]);
        assert_eq!(check(&mut r, "[[ abc =~ \"a.c\" ]]"), 1);
        assert_eq!(check(&mut r, "[[ abc =~ a[ ]]"), 2);
    }

    #[test]
    fn test_file_operators() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file"), "data").unwrap();
        std::fs::write(dir.path().join("empty"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let mut r = runner(dir.path());
        assert_eq!(check(&mut r, "[[ -f file && -s file ]]"), 0);
        assert_eq!(check(&mut r, "[[ -s empty ]]"), 1);
        assert_eq!(check(&mut r, "[[ -d sub && ! -f sub ]]"), 0);
        assert_eq!(check(&mut r, "[[ -e missing ]]"), 1);
        assert_eq!(check(&mut r, "[[ -r file ]]"), 0);
        assert_eq!(check(&mut r, "[[ file -ef ./file ]]"), 0);
    }

    #[test]
    fn test_var_set() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        r.set_var("x", "").unwrap();
        assert_eq!(check(&mut r, "[[ -v x ]]"), 0);
        assert_eq!(check(&mut r, "[[ -v y ]]"), 1);
    }
}

//! Redirection Handling
//!
//! Applies a statement's redirections, in order, to the runner's descriptor
//! table and hands back the previous table so the caller can restore it
//! once the statement finishes. A failed redirection restores the table
//! itself and the command is not run.

use std::fs::{File, OpenOptions};
use std::sync::Arc;

use crate::ast::types::*;
use crate::interpreter::errors::{io_message, InterpreterError};
use crate::interpreter::io::{Fd, InputStream, IoContext, OutputStream};
use crate::interpreter::runner::{ExecResult, Runner};

fn redirect_error(message: impl Into<String>) -> InterpreterError {
    InterpreterError::Runtime(message.into())
}

impl Runner {
    pub(crate) fn apply_redirections(&mut self, redirections: &[RedirectionNode]) -> ExecResult<IoContext> {
        let saved = self.io.clone();
        for redirection in redirections {
            if let Err(e) = self.apply_redirection(redirection) {
                self.io = saved;
                return Err(e);
            }
        }
        Ok(saved)
    }

    fn redirect_target(&mut self, word: &WordNode) -> ExecResult<String> {
        let mut fields = self.expand_words(std::slice::from_ref(word))?;
        if fields.len() != 1 {
            return Err(redirect_error(format!("{}: ambiguous redirect", crate::interpreter::runner::word_text(word))));
        }
        Ok(fields.remove(0))
    }

    /// Descriptors the script can name as files.
    fn special_file(&self, path: &str) -> Option<Fd> {
        let fd = match path {
            "/dev/stdin" => 0,
            "/dev/stdout" => 1,
            "/dev/stderr" => 2,
            other => other.strip_prefix("/dev/fd/")?.parse().ok()?,
        };
        self.io.get(fd).cloned()
    }

    fn open_file(&self, path: &str, options: &OpenOptions) -> ExecResult<Arc<File>> {
        options
            .open(self.resolve_path(path))
            .map(Arc::new)
            .map_err(|e| redirect_error(format!("{}: {}", path, io_message(&e))))
    }

    fn open_output(&self, path: &str, append: bool, force: bool) -> ExecResult<Fd> {
        if let Some(fd) = self.special_file(path) {
            return Ok(fd);
        }
        if self.options.noclobber && !append && !force {
            let resolved = self.resolve_path(path);
            if std::fs::metadata(&resolved).map(|m| m.is_file()).unwrap_or(false) {
                return Err(redirect_error(format!("{}: cannot overwrite existing file", path)));
            }
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        if append {
            options.append(true);
        } else {
            options.truncate(true);
        }
        Ok(Fd::Output(OutputStream::File(self.open_file(path, &options)?)))
    }

    fn apply_redirection(&mut self, redirection: &RedirectionNode) -> ExecResult<()> {
        let fd = redirection.fd.unwrap_or_else(|| redirection.operator.default_fd());
        match redirection.operator {
            RedirectionOperator::Less => {
                let path = self.redirect_target(&redirection.target)?;
                let stream = match self.special_file(&path) {
                    Some(stream) => stream,
                    None => Fd::Input(InputStream::File(self.open_file(&path, OpenOptions::new().read(true))?)),
                };
                self.io.set(fd, stream);
            }
            RedirectionOperator::Great | RedirectionOperator::Clobber | RedirectionOperator::DGreat => {
                let path = self.redirect_target(&redirection.target)?;
                let append = redirection.operator == RedirectionOperator::DGreat;
                let force = redirection.operator == RedirectionOperator::Clobber;
                let stream = self.open_output(&path, append, force)?;
                self.io.set(fd, stream);
            }
            RedirectionOperator::LessGreat => {
                let path = self.redirect_target(&redirection.target)?;
                let file = self.open_file(&path, OpenOptions::new().read(true).write(true).create(true))?;
                self.io.set(fd, Fd::ReadWrite(file));
            }
            RedirectionOperator::AndGreat | RedirectionOperator::AndDGreat => {
                let path = self.redirect_target(&redirection.target)?;
                let stream = self.open_output(&path, redirection.operator == RedirectionOperator::AndDGreat, false)?;
                self.io.set(1, stream.clone());
                self.io.set(2, stream);
            }
            RedirectionOperator::GreatAnd | RedirectionOperator::LessAnd => {
                let target = self.redirect_target(&redirection.target)?;
                self.duplicate(fd, &target, redirection)?;
            }
            RedirectionOperator::DLess | RedirectionOperator::DLessDash => {
                let body = match &redirection.heredoc {
                    Some(heredoc) if heredoc.quoted => heredoc.body.as_literal().unwrap_or_default(),
                    Some(heredoc) => self.expand_heredoc(&heredoc.body)?,
                    None => String::new(),
                };
                self.io.set(fd, Fd::Input(InputStream::bytes(body.into_bytes())));
            }
            RedirectionOperator::TLess => {
                let mut text = self.expand_word_string(&redirection.target)?;
                text.push('\n');
                self.io.set(fd, Fd::Input(InputStream::bytes(text.into_bytes())));
            }
        }
        Ok(())
    }

    /// `n>&m`, `n<&m`, `n>&-`, `n>&m-` and the `>&file` shorthand.
    fn duplicate(&mut self, fd: u32, target: &str, redirection: &RedirectionNode) -> ExecResult<()> {
        if target == "-" {
            self.io.close(fd);
            return Ok(());
        }
        let (number, close_source) = match target.strip_suffix('-') {
            Some(number) => (number, true),
            None => (target, false),
        };
        match number.parse::<u32>() {
            Ok(source) => {
                let stream = self
                    .io
                    .get(source)
                    .cloned()
                    .ok_or_else(|| redirect_error(format!("{}: bad file descriptor", source)))?;
                self.io.set(fd, stream);
                if close_source && source != fd {
                    self.io.close(source);
                }
                Ok(())
            }
            Err(_) if redirection.operator == RedirectionOperator::GreatAnd && redirection.fd.is_none() => {
                let stream = self.open_output(target, false, false)?;
                self.io.set(1, stream.clone());
                self.io.set(2, stream);
                Ok(())
            }
            Err(_) => Err(redirect_error(format!("{}: ambiguous redirect", target))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::parser::parse;
    use tempfile::TempDir;

    fn run_in(dir: &TempDir, source: &str) -> (i32, String, String) {
        let mut runner = Runner::new(Environment::new(), dir.path().to_path_buf());
        let (out, out_buf) = OutputStream::buffer();
        let (err, err_buf) = OutputStream::buffer();
        runner.io = IoContext::new(InputStream::Null, out, err);
        let status = runner.run_script(&parse(source).unwrap()).unwrap();
        let out = String::from_utf8(out_buf.lock().unwrap().clone()).unwrap();
        let err = String::from_utf8(err_buf.lock().unwrap().clone()).unwrap();
        (status, out, err)
    }

    #[test]
    fn test_output_and_append() {
        let dir = TempDir::new().unwrap();
        run_in(&dir, "echo one > f; echo two >> f");
        assert_eq!(std::fs::read_to_string(dir.path().join("f")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_input_redirection() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("in"), "line\n").unwrap();
        assert_eq!(run_in(&dir, "read x < in; echo $x").1, "line\n");
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let (status, out, err) = run_in(&dir, "echo hi < missing; echo $?");
        assert_eq!(status, 0);
        assert_eq!(out, "1\n");
        assert_eq!(err, "tasksh: missing: No such file or directory\n");
    }

    #[test]
    fn test_duplication_order() {
        let dir = TempDir::new().unwrap();
        let (_, out, _) = run_in(&dir, "echo err >&2 2>/dev/null; { echo to-err 1>&2; } 2>&1");
        assert_eq!(out, "to-err\n");
        run_in(&dir, "{ echo out; echo err >&2; } > both 2>&1");
        assert_eq!(std::fs::read_to_string(dir.path().join("both")).unwrap(), "out\nerr\n");
        run_in(&dir, "{ echo out; echo err >&2; } &> both2");
        assert_eq!(std::fs::read_to_string(dir.path().join("both2")).unwrap(), "out\nerr\n");
    }

    #[test]
    fn test_close_descriptor() {
        let dir = TempDir::new().unwrap();
        assert_eq!(run_in(&dir, "echo gone >&-; echo kept").1, "kept\n");
    }

    #[test]
    fn test_heredoc_and_herestring() {
        let dir = TempDir::new().unwrap();
        let (_, out, _) = run_in(&dir, "x=world\nread a <<EOF\nhello $x\nEOF\necho $a");
        assert_eq!(out, "hello world\n");
        let (_, out, _) = run_in(&dir, "read a <<'EOF'\n$x\nEOF\necho \"$a\"");
        assert_eq!(out, "$x\n");
        assert_eq!(run_in(&dir, "read a b <<< 'one two'; echo $b$a").1, "twoone\n");
    }

    #[test]
    fn test_noclobber() {
        let dir = TempDir::new().unwrap();
        let (_, out, err) = run_in(&dir, "echo a > f; set -C; echo b > f; echo $?; echo c >| f");
        assert_eq!(out, "1\n");
        assert!(err.contains("cannot overwrite existing file"));
        assert_eq!(std::fs::read_to_string(dir.path().join("f")).unwrap(), "c\n");
    }

    #[test]
    fn test_redirection_is_restored() {
        let dir = TempDir::new().unwrap();
        let (_, out, _) = run_in(&dir, "echo hidden > f; echo shown");
        assert_eq!(out, "shown\n");
    }
}

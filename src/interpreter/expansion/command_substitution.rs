//! Command Substitution
//!
//! `$(cmd)` and backquotes run the body in a forked runner whose stdout is
//! captured; process substitution hands the body a temporary file instead
//! of a named pipe.

use std::sync::Arc;

use crate::ast::types::*;
use crate::interpreter::io::{Fd, OutputStream};
use crate::interpreter::runner::{ExecResult, PendingOutputSubstitution, Runner};

/// `$(< file)` reads the file without running anything.
pub fn get_file_read_shorthand(body: &ScriptNode) -> Option<&WordNode> {
    let [statement] = body.statements.as_slice() else {
        return None;
    };
    if statement.command.is_some() || !statement.assignments.is_empty() || statement.negated {
        return None;
    }
    match statement.redirections.as_slice() {
        [redirection] if redirection.operator == RedirectionOperator::Less && redirection.fd.is_none() => {
            Some(&redirection.target)
        }
        _ => None,
    }
}

impl Runner {
    /// Run `body` and return its output without trailing newlines.
    pub(crate) fn command_substitution(&mut self, body: &ScriptNode) -> ExecResult<String> {
        if let Some(target) = get_file_read_shorthand(body) {
            let path = self.expand_word_string(target)?;
            return match std::fs::read(self.resolve_path(&path)) {
                Ok(data) => {
                    self.substitution_status = Some(0);
                    Ok(trim_trailing_newlines(String::from_utf8_lossy(&data).into_owned()))
                }
                Err(e) => {
                    self.report(format!("{}: {}", path, crate::interpreter::errors::io_message(&e)));
                    self.substitution_status = Some(1);
                    Ok(String::new())
                }
            };
        }

        let (stdout, buffer) = OutputStream::buffer();
        let mut fork = self.fork();
        fork.io.set(1, Fd::Output(stdout));
        let result = fork.execute_list(&body.statements);
        let status = fork.finish_child(result)?;
        self.substitution_status = Some(status);

        let data = buffer.lock().map(|b| b.clone()).unwrap_or_default();
        Ok(trim_trailing_newlines(String::from_utf8_lossy(&data).into_owned()))
    }

    /// Substitute a temporary file path for `<(cmd)` or `>(cmd)`.
    pub(crate) fn process_substitution(&mut self, part: &ProcessSubstitutionPart) -> ExecResult<String> {
        let file = tempfile::NamedTempFile::new()?;
        let (file, path) = file.into_parts();
        let display = path.to_string_lossy().into_owned();
        match part.direction {
            ProcessDirection::Input => {
                let mut fork = self.fork();
                fork.io.set(1, Fd::Output(OutputStream::File(Arc::new(file))));
                let result = fork.execute_list(&part.body.statements);
                fork.finish_child(result)?;
                self.pending_inputs.push(path);
            }
            ProcessDirection::Output => {
                drop(file);
                self.pending_outputs.push(PendingOutputSubstitution { path, body: part.body.clone() });
            }
        }
        Ok(display)
    }
}

fn trim_trailing_newlines(mut text: String) -> String {
    let trimmed = text.trim_end_matches('\n').len();
    text.truncate(trimmed);
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_file_read_shorthand() {
        let script = parse("< file.txt").unwrap();
        assert!(get_file_read_shorthand(&script).is_some());
        let script = parse("cat < file.txt").unwrap();
        assert!(get_file_read_shorthand(&script).is_none());
    }

    #[test]
    fn test_trim_trailing_newlines() {
        assert_eq!(trim_trailing_newlines("a\n\nb\n\n\n".into()), "a\n\nb");
        assert_eq!(trim_trailing_newlines("\n".into()), "");
    }
}

//! Word Expansion
//!
//! Turns parsed words into strings. Every word first becomes a list of
//! segments tagged with where their text came from; the caller then picks
//! a finisher:
//! - fields: field splitting plus pathname expansion (command arguments)
//! - string: plain concatenation (assignments, redirect targets, here-docs)
//! - pattern: quoted text escaped for the pattern matcher
//! - regex: quoted text escaped for `=~`

pub mod brace_range;
pub mod command_substitution;
pub mod parameter_ops;
pub mod tilde;
pub mod word_split;

use crate::ast::printer::print_word;
use crate::ast::types::*;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};
use crate::shell::glob_expander::{expand_glob, GlobOptions};
use crate::shell::pattern::{escape_glob, has_glob_chars};

use brace_range::expand_braces;
use parameter_ops::is_list_expansion;
use word_split::{split_fields, Origin, Segment};

/// True if the parts contain something that can vanish entirely inside
/// double quotes (`"$@"` with no parameters).
fn has_list_expansion(parts: &[WordPart]) -> bool {
    parts.iter().any(|part| matches!(part, WordPart::Parameter(p) if is_list_expansion(p)))
}

impl Runner {
    /// Expand the parts of a word into segments.
    pub(crate) fn word_segments(&mut self, parts: &[WordPart], quoted: bool, out: &mut Vec<Segment>) -> ExecResult<()> {
        let literal = if quoted { Origin::Quoted } else { Origin::Literal };
        let expanded = if quoted { Origin::Quoted } else { Origin::Expanded };
        for part in parts {
            match part {
                WordPart::Literal(text) | WordPart::ExtGlob(text) => out.push(Segment::Text(text.clone(), literal)),
                WordPart::SingleQuoted(text) | WordPart::Escaped(text) => {
                    out.push(Segment::Text(text.clone(), Origin::Quoted))
                }
                WordPart::DoubleQuoted(inner) => {
                    let before = out.len();
                    self.word_segments(inner, true, out)?;
                    if out.len() == before && !has_list_expansion(inner) {
                        out.push(Segment::Text(String::new(), Origin::Quoted));
                    }
                }
                WordPart::Parameter(p) => self.expand_parameter(p, quoted, out)?,
                WordPart::CommandSubstitution(substitution) => {
                    let text = self.command_substitution(&substitution.body)?;
                    out.push(Segment::Text(text, expanded));
                }
                WordPart::Arithmetic(expr) => {
                    let value = self.eval_arith(expr)?;
                    out.push(Segment::Text(value.to_string(), expanded));
                }
                WordPart::ProcessSubstitution(substitution) => {
                    let path = self.process_substitution(substitution)?;
                    out.push(Segment::Text(path, Origin::Quoted));
                }
                WordPart::Tilde(user) => {
                    let home = self.expand_tilde(user.as_deref());
                    out.push(Segment::Text(home, Origin::Quoted));
                }
                WordPart::BraceExpansion(_) => {
                    // Only reached where brace expansion does not apply.
                    let text = print_word(&WordNode::new(vec![part.clone()]));
                    out.push(Segment::Text(text, literal));
                }
            }
        }
        Ok(())
    }

    /// Expand a list of words into fields.
    pub(crate) fn expand_words(&mut self, words: &[WordNode]) -> ExecResult<Vec<String>> {
        let mut fields = Vec::new();
        for word in words {
            for braced in expand_braces(word) {
                self.expand_word_fields(&braced, &mut fields)?;
            }
        }
        Ok(fields)
    }

    /// Split and glob one brace-free word.
    fn expand_word_fields(&mut self, word: &WordNode, fields: &mut Vec<String>) -> ExecResult<()> {
        let mut segments = Vec::new();
        self.word_segments(&word.parts, false, &mut segments)?;
        let ifs = self.ifs();
        for field in split_fields(&segments, &ifs, true) {
            if !self.options.noglob && has_glob_chars(&field.pattern, self.shopt.extglob) {
                let matches = expand_glob(&field.pattern, &self.cwd, self.glob_options());
                if !matches.is_empty() {
                    fields.extend(matches);
                    continue;
                }
                if self.shopt.failglob {
                    return Err(InterpreterError::Glob(field.text));
                }
                if self.shopt.nullglob {
                    continue;
                }
            }
            fields.push(field.text);
        }
        Ok(())
    }

    fn glob_options(&self) -> GlobOptions {
        GlobOptions {
            dotglob: self.shopt.dotglob,
            nocaseglob: self.shopt.nocaseglob,
            extglob: self.shopt.extglob,
            globstar: self.shopt.globstar,
        }
    }

    /// Expand without splitting or globbing; list elements join with spaces.
    pub(crate) fn expand_word_string(&mut self, word: &WordNode) -> ExecResult<String> {
        let mut segments = Vec::new();
        self.word_segments(&word.parts, false, &mut segments)?;
        Ok(join_segments(&segments, |text, _| text.to_string()))
    }

    /// Expand for use as a shell pattern: quoted text matches literally.
    pub(crate) fn expand_word_pattern(&mut self, word: &WordNode) -> ExecResult<String> {
        let mut segments = Vec::new();
        self.word_segments(&word.parts, false, &mut segments)?;
        Ok(join_segments(&segments, |text, origin| match origin {
            Origin::Quoted => escape_glob(text),
            _ => text.to_string(),
        }))
    }

    /// Expand the right side of `=~`: quoted text matches literally.
    pub(crate) fn expand_word_regex(&mut self, word: &WordNode) -> ExecResult<String> {
        let mut segments = Vec::new();
        self.word_segments(&word.parts, false, &mut segments)?;
        Ok(join_segments(&segments, |text, origin| match origin {
            Origin::Quoted => regex_lite::escape(text),
            _ => text.to_string(),
        }))
    }

    /// Expand a here-document body: parameter, command and arithmetic
    /// expansion only.
    pub(crate) fn expand_heredoc(&mut self, body: &WordNode) -> ExecResult<String> {
        let mut segments = Vec::new();
        self.word_segments(&body.parts, true, &mut segments)?;
        Ok(join_segments(&segments, |text, _| text.to_string()))
    }
}

fn join_segments<F>(segments: &[Segment], mut render: F) -> String
where
    F: FnMut(&str, Origin) -> String,
{
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text, origin) => out.push_str(&render(text, *origin)),
            Segment::Break => out.push(' '),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;
    use crate::parser::parse_word;
    use tempfile::TempDir;

    fn runner(cwd: &std::path::Path) -> Runner {
        let mut runner = Runner::new(Environment::from_exported([("HOME", "/home/u")]), cwd.to_path_buf());
        runner.set_var("sp", "a  b").unwrap();
        runner.set_var("star", "*").unwrap();
        runner
    }

    fn fields(runner: &mut Runner, text: &str) -> Vec<String> {
        runner.expand_words(&[parse_word(text).unwrap()]).unwrap()
    }

    #[test]
    fn test_single_quotes_are_identity() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(fields(&mut r, "'$sp * $(x) ~'"), vec!["$sp * $(x) ~"]);
    }

    #[test]
    fn test_splitting_only_unquoted() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(fields(&mut r, "$sp"), vec!["a", "b"]);
        assert_eq!(fields(&mut r, "\"$sp\""), vec!["a  b"]);
        assert!(fields(&mut r, "$missing").is_empty());
        assert_eq!(fields(&mut r, "\"$missing\""), vec![""]);
    }

    #[test]
    fn test_positional_fields() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        r.positional = vec!["x y".into(), "".into()];
        assert_eq!(fields(&mut r, "\"$@\""), vec!["x y", ""]);
        assert_eq!(fields(&mut r, "\"$*\""), vec!["x y "]);
        assert_eq!(fields(&mut r, "$@"), vec!["x", "y"]);
        r.positional.clear();
        assert!(fields(&mut r, "\"$@\"").is_empty());
        assert_eq!(fields(&mut r, "\"a$@\""), vec!["a"]);
    }

    #[test]
    fn test_globbing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let mut r = runner(dir.path());
        assert_eq!(fields(&mut r, "*.txt"), vec!["a.txt", "b.txt"]);
        assert_eq!(fields(&mut r, "\"*.txt\""), vec!["*.txt"]);
        assert_eq!(fields(&mut r, "*.none"), vec!["*.none"]);
        assert_eq!(fields(&mut r, "$star.txt"), vec!["a.txt", "b.txt"]);
        r.shopt.nullglob = true;
        assert!(fields(&mut r, "*.none").is_empty());
        r.shopt.nullglob = false;
        r.shopt.failglob = true;
        assert!(r.expand_words(&[parse_word("*.none").unwrap()]).is_err());
        r.options.noglob = true;
        assert_eq!(fields(&mut r, "*.txt"), vec!["*.txt"]);
    }

    #[test]
    fn test_brace_and_tilde() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(fields(&mut r, "x{1..3}"), vec!["x1", "x2", "x3"]);
        assert_eq!(fields(&mut r, "~/src"), vec!["/home/u/src"]);
    }

    #[test]
    fn test_pattern_escaping() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(r.expand_word_pattern(&parse_word("a\"*\"$star").unwrap()).unwrap(), "a\\**");
        assert_eq!(r.expand_word_regex(&parse_word("'a.b'.c").unwrap()).unwrap(), "a\\.b.c");
    }

    #[test]
    fn test_arithmetic_and_substitution() {
        let dir = TempDir::new().unwrap();
        let mut r = runner(dir.path());
        assert_eq!(fields(&mut r, "$((2 + 3 * 4))"), vec!["14"]);
        assert_eq!(fields(&mut r, "$((2 ** 3 ** 2))"), vec!["512"]);
        assert_eq!(fields(&mut r, "\"$(echo hi; echo)\""), vec!["hi"]);
    }
}

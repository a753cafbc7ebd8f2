//! tasksh - an embeddable POSIX-style shell interpreter
//!
//! Parses shell scripts into an AST and runs them in-process: builtins,
//! functions, pipelines and control flow execute inside the interpreter,
//! external commands are spawned through a pluggable `ExecHandler`.
//!
//!   Input → Lexer → Parser → AST → Expander → Runner
//!
//! `Shell` is the embedding entry point. `parse`, `expand_literal` and
//! `expand_fields` are conveniences for callers that only need one step.

pub mod ast;
pub mod config;
pub mod interpreter;
pub mod parser;
pub mod sh;
pub mod shell;

use std::collections::HashMap;

pub use ast::types::*;
pub use config::{ConfigError, ShellConfig};
pub use interpreter::{
    CancelToken, ExecHandler, ExecRequest, ExecResult, ExecutionLimits, FatalError, OsExecHandler, ShellError,
    ShellOptions, ShoptOptions,
};
pub use parser::{ParseException, Parser};
pub use sh::Shell;

/// Parse `source`; `name` labels the script in diagnostics.
pub fn parse(source: &str, name: &str) -> Result<ScriptNode, ParseException> {
    log::debug!("parsing {}", name);
    parser::parse(source).inspect_err(|e| log::debug!("{}: {}", name, e))
}

fn shell_with(env: &HashMap<String, String>) -> Shell {
    Shell::new(ShellConfig::default().with_env(env.iter().map(|(k, v)| (k.clone(), v.clone()))))
}

/// Expand one word against `env` without splitting or globbing.
pub fn expand_literal(word: &str, env: &HashMap<String, String>) -> Result<String, ShellError> {
    shell_with(env).expand_literal(word)
}

/// Expand words against `env` into argv-style fields.
pub fn expand_fields(words: &[&str], env: &HashMap<String, String>) -> Result<Vec<String>, ShellError> {
    shell_with(env).expand_fields(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports_position() {
        assert_eq!(parse("echo hi; echo there", "ok.sh").unwrap().statements.len(), 2);
        let err = parse("echo 'unterminated", "bad.sh").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_expand_literal_with_env() {
        let env = HashMap::from([("TASK".to_string(), "build".to_string())]);
        assert_eq!(expand_literal("run-${TASK}", &env).unwrap(), "run-build");
        assert_eq!(expand_literal("${X:-bar}", &env).unwrap(), "bar");
    }

    #[test]
    fn test_expand_fields_with_env() {
        let env = HashMap::from([("FLAGS".to_string(), "-a  -b".to_string())]);
        assert_eq!(expand_fields(&["cmd", "$FLAGS", "\"$FLAGS\""], &env).unwrap(), vec!["cmd", "-a", "-b", "-a  -b"]);
    }
}

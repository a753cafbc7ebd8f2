//! Interpreter Types
//!
//! Option sets, execution limits and the cancellation token shared by a
//! runner and everything it forks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Shell options (set -e, etc.)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellOptions {
    /// set -e: Exit immediately if a command exits with non-zero status
    pub errexit: bool,
    /// set -u: Treat unset variables as an error when substituting
    pub nounset: bool,
    /// set -f: Disable filename expansion (globbing)
    pub noglob: bool,
    /// set -x: Print commands and their arguments as they are executed
    pub xtrace: bool,
    /// set -o pipefail: a pipeline fails with its rightmost failing stage
    pub pipefail: bool,
    /// set -a: Export all variables
    pub allexport: bool,
    /// set -n: Read commands but do not execute them
    pub noexec: bool,
    /// set -C: Prevent overwriting files with redirection
    pub noclobber: bool,
}

/// Single-letter flag, long name, for every option `set` understands.
const OPTION_NAMES: &[(char, &str)] = &[
    ('e', "errexit"),
    ('u', "nounset"),
    ('f', "noglob"),
    ('x', "xtrace"),
    (' ', "pipefail"),
    ('a', "allexport"),
    ('n', "noexec"),
    ('C', "noclobber"),
];

impl ShellOptions {
    fn slot(&mut self, name: &str) -> Option<&mut bool> {
        Some(match name {
            "errexit" => &mut self.errexit,
            "nounset" => &mut self.nounset,
            "noglob" => &mut self.noglob,
            "xtrace" => &mut self.xtrace,
            "pipefail" => &mut self.pipefail,
            "allexport" => &mut self.allexport,
            "noexec" => &mut self.noexec,
            "noclobber" => &mut self.noclobber,
            _ => return None,
        })
    }

    /// Set an option by long name. Returns false for unknown names.
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        match self.slot(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.clone().slot(name).map(|v| *v)
    }

    /// Map a `set -X` letter to its long name.
    pub fn name_for_flag(flag: char) -> Option<&'static str> {
        OPTION_NAMES.iter().find(|(c, _)| *c == flag && flag != ' ').map(|(_, n)| *n)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        OPTION_NAMES.iter().map(|(_, n)| *n)
    }

    /// Value of `$-`.
    pub fn flags(&self) -> String {
        OPTION_NAMES
            .iter()
            .filter(|(c, name)| *c != ' ' && self.get(name).unwrap_or(false))
            .map(|(c, _)| *c)
            .chain(std::iter::once('h'))
            .collect()
    }
}

/// Shopt options (shopt -s, etc.)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShoptOptions {
    /// shopt -s extglob: Enable extended globbing patterns @(), *(), +(), ?(), !()
    pub extglob: bool,
    /// shopt -s globstar: Enable ** recursive glob patterns
    pub globstar: bool,
    /// shopt -s nullglob: Return empty for non-matching globs instead of literal pattern
    pub nullglob: bool,
    /// shopt -s failglob: Fail if glob pattern has no matches
    pub failglob: bool,
    /// shopt -s dotglob: Include dotfiles in glob expansion
    pub dotglob: bool,
    /// shopt -s nocaseglob: Case-insensitive glob matching
    pub nocaseglob: bool,
    /// shopt -s nocasematch: Case-insensitive matching in [[ ]] and case
    pub nocasematch: bool,
}

impl ShoptOptions {
    pub const NAMES: &'static [&'static str] =
        &["dotglob", "extglob", "failglob", "globstar", "nocaseglob", "nocasematch", "nullglob"];

    pub fn set(&mut self, name: &str, value: bool) -> bool {
        let slot = match name {
            "extglob" => &mut self.extglob,
            "globstar" => &mut self.globstar,
            "nullglob" => &mut self.nullglob,
            "failglob" => &mut self.failglob,
            "dotglob" => &mut self.dotglob,
            "nocaseglob" => &mut self.nocaseglob,
            "nocasematch" => &mut self.nocasematch,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        Some(match name {
            "extglob" => self.extglob,
            "globstar" => self.globstar,
            "nullglob" => self.nullglob,
            "failglob" => self.failglob,
            "dotglob" => self.dotglob,
            "nocaseglob" => self.nocaseglob,
            "nocasematch" => self.nocasematch,
            _ => return None,
        })
    }
}

/// Execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    /// Maximum nesting of function calls
    pub max_call_depth: u32,
    /// Maximum iterations of any single loop
    pub max_loop_iterations: u64,
    /// Maximum length of a nameref or `${!name}` chain
    pub max_nameref_depth: u32,
    /// Maximum recursion when a variable's value is itself an expression
    pub max_arith_depth: u32,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_loop_iterations: 1_000_000,
            max_nameref_depth: 100,
            max_arith_depth: 1024,
        }
    }
}

impl ExecutionLimits {
    /// Stack for threads that run interpreter code, large enough for
    /// `max_call_depth` nested function calls and `max_arith_depth`
    /// nested expressions.
    pub fn thread_stack_size(&self) -> usize {
        const BASE: usize = 16 << 20;
        const PER_CALL: usize = 256 << 10;
        const PER_ARITH: usize = 16 << 10;
        const MAX: usize = 1 << 30;
        (self.max_call_depth as usize)
            .saturating_mul(PER_CALL)
            .saturating_add((self.max_arith_depth as usize).saturating_mul(PER_ARITH))
            .saturating_add(BASE)
            .min(MAX)
    }
}

/// External stop signal, checked at statement and loop boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn set_timeout(&self, timeout: Duration) {
        if let Ok(mut deadline) = self.deadline.lock() {
            *deadline = Some(Instant::now() + timeout);
        }
    }

    pub fn clear_timeout(&self) {
        if let Ok(mut deadline) = self.deadline.lock() {
            *deadline = None;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match self.deadline.lock() {
            Ok(deadline) => deadline.map_or(false, |d| Instant::now() >= d),
            Err(_) => false,
        }
    }

    /// Clear a previous cancellation so the shell can run again.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.clear_timeout();
    }
}

/// Captured result of running a script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn new(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_stack_size_follows_limits() {
        let small = ExecutionLimits { max_call_depth: 10, max_arith_depth: 10, ..Default::default() };
        let default = ExecutionLimits::default();
        assert!(small.thread_stack_size() < default.thread_stack_size());
        assert!(default.thread_stack_size() >= 1000 * (256 << 10));
        let huge = ExecutionLimits { max_call_depth: u32::MAX, ..Default::default() };
        assert_eq!(huge.thread_stack_size(), 1 << 30);
    }

    #[test]
    fn test_shell_option_lookup() {
        let mut opts = ShellOptions::default();
        assert!(opts.set("errexit", true));
        assert!(!opts.set("bogus", true));
        assert_eq!(opts.get("errexit"), Some(true));
        assert_eq!(ShellOptions::name_for_flag('u'), Some("nounset"));
        assert_eq!(ShellOptions::name_for_flag(' '), None);
        assert_eq!(opts.flags(), "eh");
    }

    #[test]
    fn test_shopt_lookup() {
        let mut opts = ShoptOptions::default();
        assert!(opts.set("globstar", true));
        assert_eq!(opts.get("globstar"), Some(true));
        assert_eq!(opts.get("nosuch"), None);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let forked = token.clone();
        forked.cancel();
        assert!(token.is_cancelled());
        token.reset();
        token.set_timeout(Duration::from_secs(0));
        assert!(forked.is_cancelled());
    }

    #[test]
    fn test_limits_deserialize_with_defaults() {
        let limits: ExecutionLimits = toml::from_str("max_call_depth = 5").unwrap();
        assert_eq!(limits.max_call_depth, 5);
        assert_eq!(limits.max_loop_iterations, 1_000_000);
    }
}

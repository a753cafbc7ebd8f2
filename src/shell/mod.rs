//! Pattern matching and pathname expansion.

pub mod glob_expander;
pub mod pattern;

pub use glob_expander::{expand_glob, GlobOptions};
pub use pattern::{has_glob_chars, Pattern, PatternOptions};

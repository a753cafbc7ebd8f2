//! Abstract Syntax Tree
//!
//! Node types produced by the parser and a printer that renders them back
//! into shell source.
//!
//!   Input → Lexer → Parser → AST → Expander → Runner

pub mod printer;
pub mod types;

pub use printer::{print_arith, print_script, print_statement, print_word};

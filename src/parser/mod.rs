//! Parser module for shell scripts
//!
//! This module contains the lexer, the word and arithmetic sub-parsers and
//! the statement parser.

pub mod types;
pub mod lexer;
pub mod arithmetic_parser;
pub mod word_parser;
pub mod conditional_parser;
pub mod compound_parser;
pub mod parser;

// Re-exports
pub use types::ParseException;
pub use lexer::{Lexer, LexerError, Token, TokenType};
pub use arithmetic_parser::parse_arithmetic;
pub use word_parser::{parse_word, parse_word_with, WordMode};
pub use parser::{parse, Parser};

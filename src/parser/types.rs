//! Parser Types and Constants
//!
//! Shared error type and limits used across parser modules.

use std::fmt;
use thiserror::Error;

use crate::parser::lexer::{LexerError, Token, TokenType};

// Parser limits to prevent hangs and resource exhaustion
pub const MAX_INPUT_SIZE: usize = 1_000_000; // 1MB max input
pub const MAX_PARSER_DEPTH: usize = 200; // Max recursion depth for nested constructs

/// Check if a token type is a redirection operator
pub fn is_redirection_token(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Less
            | TokenType::Great
            | TokenType::DLess
            | TokenType::DGreat
            | TokenType::LessAnd
            | TokenType::GreatAnd
            | TokenType::LessGreat
            | TokenType::DLessDash
            | TokenType::Clobber
            | TokenType::TLess
            | TokenType::AndGreat
            | TokenType::AndDGreat
    )
}

/// Tokens that end a simple command
pub fn is_command_terminator(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Eof
            | TokenType::Newline
            | TokenType::Semicolon
            | TokenType::Amp
            | TokenType::Pipe
            | TokenType::PipeAmp
            | TokenType::AndAnd
            | TokenType::OrOr
            | TokenType::RParen
            | TokenType::DSemi
            | TokenType::SemiAnd
            | TokenType::SemiSemiAnd
    )
}

/// A fatal syntax error. Parsing stops at the first one.
#[derive(Debug, Clone, Error, PartialEq)]
pub struct ParseException {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{}: {}", self.line, self.column, self.message)
    }
}

impl ParseException {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn at_token(message: impl Into<String>, token: &Token) -> Self {
        Self::new(message, token.line, token.column)
    }
}

impl From<LexerError> for ParseException {
    fn from(e: LexerError) -> Self {
        Self::new(e.message, e.line, e.column)
    }
}

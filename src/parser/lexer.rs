//! Lexer for Shell Scripts
//!
//! The lexer tokenizes input into a stream of tokens that the parser consumes.
//! Words keep their raw source text (quotes included); the word parser turns
//! that text into structured parts later. The lexer handles:
//! - Operators and delimiters
//! - Word boundaries across nested quoting and substitution contexts
//! - Comments and line continuations
//! - Here-document bodies
//! - `((...))` arithmetic commands and `[[ ... =~ regex ]]` operands

/// Token types for the shell lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // End of input
    Eof,

    // Newlines and separators
    Newline,
    Semicolon,
    Amp, // &

    // Operators
    Pipe,    // |
    PipeAmp, // |&
    AndAnd,  // &&
    OrOr,    // ||

    // Redirections
    Less,      // <
    Great,     // >
    DLess,     // <<
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    DLessDash, // <<-
    Clobber,   // >|
    TLess,     // <<<
    AndGreat,  // &>
    AndDGreat, // &>>

    // Grouping
    LParen, // (
    RParen, // )

    // Case terminators
    DSemi,       // ;;
    SemiAnd,     // ;&
    SemiSemiAnd, // ;;&

    /// Raw contents of `(( ... ))` in command position or after `for`
    ArithCommand,

    /// Any word, reserved words included. The parser decides what it means.
    Word,
    /// Digits directly followed by a redirection operator (`2>`)
    IoNumber,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eof => "end of file",
            Self::Newline => "newline",
            Self::Semicolon => ";",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::PipeAmp => "|&",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Less => "<",
            Self::Great => ">",
            Self::DLess => "<<",
            Self::DGreat => ">>",
            Self::LessAnd => "<&",
            Self::GreatAnd => ">&",
            Self::LessGreat => "<>",
            Self::DLessDash => "<<-",
            Self::Clobber => ">|",
            Self::TLess => "<<<",
            Self::AndGreat => "&>",
            Self::AndDGreat => "&>>",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::DSemi => ";;",
            Self::SemiAnd => ";&",
            Self::SemiSemiAnd => ";;&",
            Self::ArithCommand => "((",
            Self::Word => "word",
            Self::IoNumber => "number",
        }
    }
}

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    /// Original position in input
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    /// Word contains quotes or backslash escapes
    pub quoted: bool,
    /// Body of a here-document, attached to its `<<`/`<<-` operator token
    pub heredoc: Option<String>,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        start: usize,
        end: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            start,
            end,
            line,
            column,
            quoted: false,
            heredoc: None,
        }
    }

    /// True for an unquoted word spelled exactly `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.token_type == TokenType::Word && !self.quoted && self.value == word
    }

    pub fn describe(&self) -> String {
        match self.token_type {
            TokenType::Word | TokenType::IoNumber => format!("`{}'", self.value),
            TokenType::Eof | TokenType::Newline => self.token_type.as_str().to_string(),
            t => format!("`{}'", t.as_str()),
        }
    }
}

/// Error raised when the lexer encounters invalid input
#[derive(Debug, Clone)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for LexerError {}

impl LexerError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Pending heredoc information
#[derive(Debug, Clone)]
struct PendingHeredoc {
    /// Index of the `<<` token the body belongs to
    token_index: usize,
    delimiter: String,
    strip_tabs: bool,
    line: usize,
    column: usize,
}

/// Three-character operators
const THREE_CHAR_OPS: &[(&str, TokenType)] = &[
    (";;&", TokenType::SemiSemiAnd),
    ("<<<", TokenType::TLess),
    ("&>>", TokenType::AndDGreat),
    ("<<-", TokenType::DLessDash),
];

/// Two-character operators
const TWO_CHAR_OPS: &[(&str, TokenType)] = &[
    ("&&", TokenType::AndAnd),
    ("||", TokenType::OrOr),
    (";;", TokenType::DSemi),
    (";&", TokenType::SemiAnd),
    ("|&", TokenType::PipeAmp),
    (">>", TokenType::DGreat),
    ("<&", TokenType::LessAnd),
    (">&", TokenType::GreatAnd),
    ("<>", TokenType::LessGreat),
    (">|", TokenType::Clobber),
    ("&>", TokenType::AndGreat),
    ("<<", TokenType::DLess),
];

/// Single-character operators
const ONE_CHAR_OPS: &[(char, TokenType)] = &[
    ('|', TokenType::Pipe),
    ('&', TokenType::Amp),
    (';', TokenType::Semicolon),
    ('(', TokenType::LParen),
    (')', TokenType::RParen),
    ('<', TokenType::Less),
    ('>', TokenType::Great),
];

/// Check if a string is a valid variable name
pub fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Pieces of an assignment word: `name[index]+=value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AssignmentParts<'a> {
    pub name: &'a str,
    pub index: Option<&'a str>,
    pub append: bool,
    pub value: &'a str,
}

/// Split a raw word into assignment pieces, if it is one.
pub(crate) fn split_assignment(word: &str) -> Option<AssignmentParts<'_>> {
    let name_end = word
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(word.len());
    let name = &word[..name_end];
    if !is_valid_name(name) {
        return None;
    }
    let mut rest = &word[name_end..];
    let mut index = None;
    if rest.starts_with('[') {
        let mut depth = 0usize;
        let mut close = None;
        for (i, c) in rest.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close?;
        index = Some(&rest[1..close]);
        rest = &rest[close + 1..];
    }
    let append = rest.starts_with("+=");
    if append {
        rest = &rest[2..];
    } else if let Some(r) = rest.strip_prefix('=') {
        rest = r;
    } else {
        return None;
    }
    Some(AssignmentParts { name, index, append, value: rest })
}

// =============================================================================
// NESTED CONSTRUCT SCANNING
// =============================================================================

/// Quoting and substitution contexts that can nest inside a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Construct {
    /// after `'`
    SingleQuote,
    /// after `$'`
    AnsiQuote,
    /// after `"`
    DoubleQuote,
    /// after a backquote
    Backquote,
    /// after `$(`, `<(` or `>(`; closes at `)`
    CommandSubst,
    /// after `$((`; closes at `))`
    Arith,
    /// after `${`; closes at `}`
    Param,
    /// after `(` of an extglob or array literal
    Group,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    construct: Construct,
    /// open `case` keywords inside a command substitution
    case_depth: usize,
    /// a `${` opened inside double quotes treats `'` literally
    in_dquote: bool,
}

impl Frame {
    fn new(construct: Construct, in_dquote: bool) -> Self {
        Self { construct, case_depth: 0, in_dquote }
    }
}

fn is_cmd_word_start(chars: &[char], i: usize, start: usize) -> bool {
    i == start || matches!(chars[i - 1], ' ' | '\t' | '\n' | ';' | '&' | '|' | '(')
}

fn is_keyword_end(c: Option<char>) -> bool {
    matches!(c, None | Some(' ' | '\t' | '\n' | ';' | '&' | '|' | ')' | '('))
}

/// Handle a `$` inside a scanned construct; returns the index to resume at.
fn push_dollar(stack: &mut Vec<Frame>, chars: &[char], i: usize, in_dquote: bool) -> usize {
    match chars.get(i + 1) {
        Some('\'') if !in_dquote => {
            stack.push(Frame::new(Construct::AnsiQuote, false));
            i + 2
        }
        Some('(') => {
            if chars.get(i + 2) == Some(&'(') {
                if let Some(end) = skip_construct(chars, i + 3, Construct::Arith) {
                    return end;
                }
            }
            stack.push(Frame::new(Construct::CommandSubst, false));
            i + 2
        }
        Some('{') => {
            stack.push(Frame::new(Construct::Param, in_dquote));
            i + 2
        }
        _ => i + 1,
    }
}

/// Scan from `start` (just past an opening delimiter) to the end of the
/// construct. Returns the index just past the closing delimiter, or `None`
/// when input ends first.
pub(crate) fn skip_construct(chars: &[char], start: usize, construct: Construct) -> Option<usize> {
    scan(chars, start, Frame::new(construct, false))
}

/// Like `skip_construct` for a `${` that opened inside double quotes.
pub(crate) fn skip_param(chars: &[char], start: usize, in_dquote: bool) -> Option<usize> {
    scan(chars, start, Frame::new(Construct::Param, in_dquote))
}

fn scan(chars: &[char], start: usize, frame: Frame) -> Option<usize> {
    let mut stack = vec![frame];
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let top = *stack.last()?;
        match top.construct {
            Construct::SingleQuote => {
                if c == '\'' {
                    stack.pop();
                }
                i += 1;
            }
            Construct::AnsiQuote | Construct::Backquote => {
                let close = if top.construct == Construct::AnsiQuote { '\'' } else { '`' };
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == close {
                    stack.pop();
                }
                i += 1;
            }
            Construct::DoubleQuote => match c {
                '\\' => i += 2,
                '"' => {
                    stack.pop();
                    i += 1;
                }
                '`' => {
                    stack.push(Frame::new(Construct::Backquote, false));
                    i += 1;
                }
                '$' => i = push_dollar(&mut stack, chars, i, true),
                _ => i += 1,
            },
            Construct::Param => match c {
                '\\' => i += 2,
                '}' => {
                    stack.pop();
                    i += 1;
                }
                '\'' if !top.in_dquote => {
                    stack.push(Frame::new(Construct::SingleQuote, false));
                    i += 1;
                }
                '"' => {
                    stack.push(Frame::new(Construct::DoubleQuote, false));
                    i += 1;
                }
                '`' => {
                    stack.push(Frame::new(Construct::Backquote, false));
                    i += 1;
                }
                '$' => i = push_dollar(&mut stack, chars, i, top.in_dquote),
                _ => i += 1,
            },
            Construct::CommandSubst | Construct::Arith | Construct::Group => match c {
                '\\' => i += 2,
                '\'' => {
                    stack.push(Frame::new(Construct::SingleQuote, false));
                    i += 1;
                }
                '"' => {
                    stack.push(Frame::new(Construct::DoubleQuote, false));
                    i += 1;
                }
                '`' => {
                    stack.push(Frame::new(Construct::Backquote, false));
                    i += 1;
                }
                '$' => i = push_dollar(&mut stack, chars, i, false),
                '(' => {
                    stack.push(Frame::new(Construct::Group, false));
                    i += 1;
                }
                ')' => match top.construct {
                    Construct::Arith => {
                        if next != Some(')') {
                            return None;
                        }
                        stack.pop();
                        i += 2;
                    }
                    Construct::CommandSubst if top.case_depth > 0 => i += 1,
                    _ => {
                        stack.pop();
                        i += 1;
                    }
                },
                '#' if top.construct == Construct::CommandSubst && is_cmd_word_start(chars, i, start) => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                }
                c if top.construct == Construct::CommandSubst
                    && c.is_ascii_alphabetic()
                    && is_cmd_word_start(chars, i, start) =>
                {
                    let mut j = i;
                    while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                        j += 1;
                    }
                    if is_keyword_end(chars.get(j).copied()) {
                        let word: String = chars[i..j].iter().collect();
                        if let Some(frame) = stack.last_mut() {
                            match word.as_str() {
                                "case" => frame.case_depth += 1,
                                "esac" => frame.case_depth = frame.case_depth.saturating_sub(1),
                                _ => {}
                            }
                        }
                    }
                    i = j;
                }
                _ => i += 1,
            },
        }
        if stack.is_empty() {
            return Some(i);
        }
    }
    None
}

// =============================================================================
// LEXER
// =============================================================================

/// Lexer over a complete script
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    pending_heredocs: Vec<PendingHeredoc>,
    /// Set after `<<`/`<<-`: (operator token index, strip tabs)
    heredoc_operator: Option<(usize, bool)>,
    /// Inside `[[ ... ]]`
    in_dbrack: bool,
    /// Next word is the right operand of `=~`
    regex_next: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            pending_heredocs: Vec::new(),
            heredoc_operator: None,
            in_dbrack: false,
            regex_next: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        loop {
            self.skip_whitespace();
            if self.pos >= self.input.len() {
                break;
            }
            let Some(token) = self.next_token()? else {
                continue;
            };
            let token_type = token.token_type;
            self.tokens.push(token);
            self.after_push(token_type)?;
        }

        if let Some(pending) = self.pending_heredocs.first() {
            return Err(LexerError::new(
                format!("unterminated here-document (wanted `{}')", pending.delimiter),
                pending.line,
                pending.column,
            ));
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            "",
            self.pos,
            self.pos,
            self.line,
            self.column,
        ));
        Ok(self.tokens)
    }

    fn after_push(&mut self, token_type: TokenType) -> Result<(), LexerError> {
        let index = self.tokens.len() - 1;
        match token_type {
            TokenType::DLess | TokenType::DLessDash => {
                self.heredoc_operator = Some((index, token_type == TokenType::DLessDash));
            }
            TokenType::Word => {
                if let Some((op_index, strip_tabs)) = self.heredoc_operator.take() {
                    let raw = &self.tokens[index];
                    let delimiter: String = raw
                        .value
                        .chars()
                        .filter(|c| !matches!(c, '\'' | '"' | '\\'))
                        .collect();
                    let op = &self.tokens[op_index];
                    self.pending_heredocs.push(PendingHeredoc {
                        token_index: op_index,
                        delimiter,
                        strip_tabs,
                        line: op.line,
                        column: op.column,
                    });
                }
            }
            TokenType::Newline => {
                if !self.pending_heredocs.is_empty() {
                    self.read_heredoc_bodies()?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    /// Move to `end`, keeping line and column in step.
    fn advance_to(&mut self, end: usize) {
        while self.pos < end && self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    /// Consume input up to `end`, appending it to `value`.
    fn take_until(&mut self, end: usize, value: &mut String) {
        value.extend(&self.input[self.pos..end.min(self.input.len())]);
        self.advance_to(end);
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\r' => self.advance_to(self.pos + 1),
                '\\' if self.peek(1) == Some('\n') => self.advance_to(self.pos + 2),
                _ => break,
            }
        }
    }

    fn at_command_start(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(t) => match t.token_type {
                TokenType::Newline
                | TokenType::Semicolon
                | TokenType::Amp
                | TokenType::Pipe
                | TokenType::PipeAmp
                | TokenType::AndAnd
                | TokenType::OrOr
                | TokenType::LParen
                | TokenType::RParen
                | TokenType::DSemi
                | TokenType::SemiAnd
                | TokenType::SemiSemiAnd => true,
                TokenType::Word => {
                    !t.quoted
                        && matches!(
                            t.value.as_str(),
                            "then" | "do" | "else" | "elif" | "if" | "while" | "until" | "!" | "{" | "}" | "for"
                        )
                }
                _ => false,
            },
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        let start_line = self.line;
        let start_column = self.column;
        let start_pos = self.pos;

        let c0 = match self.current() {
            Some(c) => c,
            None => return Ok(None),
        };
        let c1 = self.peek(1);

        // Comments run to end of line
        if c0 == '#' {
            while let Some(c) = self.current() {
                if c == '\n' {
                    break;
                }
                self.advance_to(self.pos + 1);
            }
            return Ok(None);
        }

        if c0 == '\n' {
            self.advance_to(self.pos + 1);
            return Ok(Some(Token::new(
                TokenType::Newline,
                "\n",
                start_pos,
                self.pos,
                start_line,
                start_column,
            )));
        }

        if self.regex_next {
            self.regex_next = false;
            return self.read_regex_word().map(Some);
        }

        // (( arithmetic )) in command position
        if c0 == '(' && c1 == Some('(') && !self.in_dbrack && self.at_command_start() {
            if let Some(end) = skip_construct(&self.input, self.pos + 2, Construct::Arith) {
                let content: String = self.input[self.pos + 2..end - 2].iter().collect();
                self.advance_to(end);
                return Ok(Some(Token::new(
                    TokenType::ArithCommand,
                    content,
                    start_pos,
                    self.pos,
                    start_line,
                    start_column,
                )));
            }
        }

        // Process substitution starts a word
        if (c0 == '<' || c0 == '>') && c1 == Some('(') {
            return self.read_word().map(Some);
        }

        let rest: String = self.input[self.pos..(self.pos + 3).min(self.input.len())].iter().collect();
        for (op, token_type) in THREE_CHAR_OPS {
            if rest.starts_with(op) {
                return Ok(Some(self.operator(*token_type, op.len())));
            }
        }
        for (op, token_type) in TWO_CHAR_OPS {
            if rest.starts_with(op) {
                return Ok(Some(self.operator(*token_type, op.len())));
            }
        }
        for (op, token_type) in ONE_CHAR_OPS {
            if c0 == *op {
                return Ok(Some(self.operator(*token_type, 1)));
            }
        }

        self.read_word().map(Some)
    }

    fn operator(&mut self, token_type: TokenType, len: usize) -> Token {
        let (start, line, column) = (self.pos, self.line, self.column);
        let value: String = self.input[self.pos..self.pos + len].iter().collect();
        self.advance_to(self.pos + len);
        Token::new(token_type, value, start, self.pos, line, column)
    }

    /// Scan a nested construct whose opener is `open_len` chars at the
    /// current position.
    fn take_construct(
        &mut self,
        open_len: usize,
        construct: Construct,
        what: &str,
        value: &mut String,
    ) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        match skip_construct(&self.input, self.pos + open_len, construct) {
            Some(end) => {
                self.take_until(end, value);
                Ok(())
            }
            None => Err(LexerError::new(format!("unterminated {}", what), line, column)),
        }
    }

    /// Consume a `$` construct. Returns true if the word became quoted.
    fn take_dollar(&mut self, value: &mut String) -> Result<bool, LexerError> {
        match self.peek(1) {
            Some('\'') => {
                self.take_construct(2, Construct::AnsiQuote, "$' quote", value)?;
                Ok(true)
            }
            Some('(') => {
                let arith = self.peek(2) == Some('(');
                if arith {
                    if let Some(end) = skip_construct(&self.input, self.pos + 3, Construct::Arith) {
                        self.take_until(end, value);
                        return Ok(false);
                    }
                }
                // `$( (cmd) )` is a substitution whose body starts with a subshell.
                let what = if arith { "arithmetic expansion" } else { "command substitution" };
                self.take_construct(2, Construct::CommandSubst, what, value)?;
                Ok(false)
            }
            Some('{') => {
                self.take_construct(2, Construct::Param, "parameter expansion", value)?;
                Ok(false)
            }
            _ => {
                self.take_until(self.pos + 1, value);
                Ok(false)
            }
        }
    }

    fn read_word(&mut self) -> Result<Token, LexerError> {
        let (start_pos, start_line, start_column) = (self.pos, self.line, self.column);
        let command_start = self.at_command_start();
        let mut value = String::new();
        let mut quoted = false;

        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\r' | '\n' | ';' | '&' | '|' | ')' => break,
                '<' | '>' => {
                    if value.is_empty() && self.peek(1) == Some('(') {
                        self.take_construct(2, Construct::CommandSubst, "process substitution", &mut value)?;
                    } else {
                        break;
                    }
                }
                '(' => {
                    let extglob = matches!(value.chars().last(), Some('@' | '*' | '+' | '?' | '!'));
                    let array = value.ends_with('=')
                        && split_assignment(&value).map(|a| a.value.is_empty()).unwrap_or(false);
                    if extglob || array {
                        let what = if array { "array literal" } else { "pattern group" };
                        self.take_construct(1, Construct::Group, what, &mut value)?;
                    } else {
                        break;
                    }
                }
                '\\' => match self.peek(1) {
                    Some('\n') => self.advance_to(self.pos + 2),
                    Some(_) => {
                        quoted = true;
                        self.take_until(self.pos + 2, &mut value);
                    }
                    None => self.take_until(self.pos + 1, &mut value),
                },
                '\'' => {
                    quoted = true;
                    self.take_construct(1, Construct::SingleQuote, "single quote", &mut value)?;
                }
                '"' => {
                    quoted = true;
                    self.take_construct(1, Construct::DoubleQuote, "double quote", &mut value)?;
                }
                '`' => {
                    self.take_construct(1, Construct::Backquote, "backquote", &mut value)?;
                }
                '$' => {
                    if self.take_dollar(&mut value)? {
                        quoted = true;
                    }
                }
                _ => self.take_until(self.pos + 1, &mut value),
            }
        }

        let is_io_number = !value.is_empty()
            && value.chars().all(|c| c.is_ascii_digit())
            && matches!(self.current(), Some('<' | '>'));
        let token_type = if is_io_number { TokenType::IoNumber } else { TokenType::Word };

        if token_type == TokenType::Word && !quoted {
            match value.as_str() {
                "[[" if command_start => self.in_dbrack = true,
                "]]" if self.in_dbrack => self.in_dbrack = false,
                "=~" if self.in_dbrack => self.regex_next = true,
                _ => {}
            }
        }

        let mut token = Token::new(token_type, value, start_pos, self.pos, start_line, start_column);
        token.quoted = quoted;
        Ok(token)
    }

    /// The right side of `=~`: parentheses and `|` belong to the word.
    fn read_regex_word(&mut self) -> Result<Token, LexerError> {
        let (start_pos, start_line, start_column) = (self.pos, self.line, self.column);
        let mut value = String::new();
        let mut quoted = false;
        let mut depth = 0usize;

        while let Some(c) = self.current() {
            match c {
                ' ' | '\t' | '\n' | ';' | '&' | '<' | '>' if depth == 0 => break,
                '(' => {
                    depth += 1;
                    self.take_until(self.pos + 1, &mut value);
                }
                ')' => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.take_until(self.pos + 1, &mut value);
                }
                '\\' => {
                    quoted = true;
                    self.take_until(self.pos + 2, &mut value);
                }
                '\'' => {
                    quoted = true;
                    self.take_construct(1, Construct::SingleQuote, "single quote", &mut value)?;
                }
                '"' => {
                    quoted = true;
                    self.take_construct(1, Construct::DoubleQuote, "double quote", &mut value)?;
                }
                '$' => {
                    self.take_dollar(&mut value)?;
                }
                _ => self.take_until(self.pos + 1, &mut value),
            }
        }

        let mut token = Token::new(TokenType::Word, value, start_pos, self.pos, start_line, start_column);
        token.quoted = quoted;
        Ok(token)
    }

    /// Read every pending here-document body, in order, after a newline.
    fn read_heredoc_bodies(&mut self) -> Result<(), LexerError> {
        let pending = std::mem::take(&mut self.pending_heredocs);
        for heredoc in pending {
            let mut body = String::new();
            let mut terminated = false;
            while self.pos < self.input.len() {
                let line_end = self.input[self.pos..]
                    .iter()
                    .position(|&c| c == '\n')
                    .map(|p| self.pos + p)
                    .unwrap_or(self.input.len());
                let mut line: String = self.input[self.pos..line_end].iter().collect();
                self.advance_to(line_end + 1);
                if heredoc.strip_tabs {
                    line = line.trim_start_matches('\t').to_string();
                }
                if line == heredoc.delimiter {
                    terminated = true;
                    break;
                }
                body.push_str(&line);
                body.push('\n');
            }
            if !terminated {
                return Err(LexerError::new(
                    format!("unterminated here-document (wanted `{}')", heredoc.delimiter),
                    heredoc.line,
                    heredoc.column,
                ));
            }
            if let Some(token) = self.tokens.get_mut(heredoc.token_index) {
                token.heredoc = Some(body);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    fn types(input: &str) -> Vec<TokenType> {
        tokenize(input).into_iter().map(|t| t.token_type).collect()
    }

    fn values(input: &str) -> Vec<String> {
        tokenize(input).into_iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_simple_words() {
        let tokens = tokenize("echo hello world");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].value, "echo");
        assert_eq!(tokens[2].value, "world");
        assert_eq!(tokens[3].token_type, TokenType::Eof);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            types("a && b || c | d |& e; f &"),
            vec![
                TokenType::Word,
                TokenType::AndAnd,
                TokenType::Word,
                TokenType::OrOr,
                TokenType::Word,
                TokenType::Pipe,
                TokenType::Word,
                TokenType::PipeAmp,
                TokenType::Word,
                TokenType::Semicolon,
                TokenType::Word,
                TokenType::Amp,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn test_quotes_stay_in_word() {
        assert_eq!(values("echo 'a b' \"c $d\" e\\ f"), vec!["echo", "'a b'", "\"c $d\"", "e\\ f", ""]);
        assert!(tokenize("echo 'x'")[1].quoted);
        assert!(!tokenize("echo x")[1].quoted);
    }

    #[test]
    fn test_command_substitution_spans_spaces() {
        assert_eq!(values("echo $(ls -l | wc -l) x"), vec!["echo", "$(ls -l | wc -l)", "x", ""]);
        assert_eq!(values("echo $(echo \")\")"), vec!["echo", "$(echo \")\")", ""]);
    }

    #[test]
    fn test_case_inside_command_substitution() {
        let v = values("x=$(case a in a) echo y;; esac)");
        assert_eq!(v[0], "x=$(case a in a) echo y;; esac)");
    }

    #[test]
    fn test_arith_command() {
        let tokens = tokenize("((x = 1 + 2))");
        assert_eq!(tokens[0].token_type, TokenType::ArithCommand);
        assert_eq!(tokens[0].value, "x = 1 + 2");
    }

    #[test]
    fn test_nested_subshell_is_not_arith() {
        assert_eq!(types("( (echo a) )")[0], TokenType::LParen);
    }

    #[test]
    fn test_io_number() {
        let tokens = tokenize("cmd 2>&1");
        assert_eq!(tokens[1].token_type, TokenType::IoNumber);
        assert_eq!(tokens[2].token_type, TokenType::GreatAnd);
        assert_eq!(tokens[3].value, "1");
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(values("echo a # comment\necho b#c"), vec!["echo", "a", "\n", "echo", "b#c", ""]);
    }

    #[test]
    fn test_line_continuation() {
        assert_eq!(values("echo a\\\nb c"), vec!["echo", "ab", "c", ""]);
    }

    #[test]
    fn test_heredoc_body_attached() {
        let tokens = tokenize("cat <<EOF\nhello\nworld\nEOF\necho done");
        assert_eq!(tokens[1].token_type, TokenType::DLess);
        assert_eq!(tokens[1].heredoc.as_deref(), Some("hello\nworld\n"));
        assert_eq!(tokens[2].value, "EOF");
        assert!(tokens.iter().any(|t| t.value == "done"));
    }

    #[test]
    fn test_heredoc_strip_tabs() {
        let tokens = tokenize("cat <<-END\n\tindented\n\tEND\n");
        assert_eq!(tokens[1].heredoc.as_deref(), Some("indented\n"));
    }

    #[test]
    fn test_unterminated_heredoc() {
        let err = Lexer::new("cat <<EOF\nbody\n").tokenize().unwrap_err();
        assert!(err.message.contains("here-document"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_unterminated_quote_reports_opening_position() {
        let err = Lexer::new("echo ok\necho 'abc").tokenize().unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 6);
        assert!(err.message.contains("single quote"));
    }

    #[test]
    fn test_unterminated_substitutions_are_named() {
        let err = Lexer::new("echo $((1+2").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated arithmetic expansion");
        assert_eq!((err.line, err.column), (1, 6));
        let err = Lexer::new("echo $(date").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated command substitution");
        assert_eq!(values("echo $( (echo a) )"), vec!["echo", "$( (echo a) )", ""]);
    }

    #[test]
    fn test_array_literal_is_one_word() {
        assert_eq!(values("a=(1 2 \"x y\")"), vec!["a=(1 2 \"x y\")", ""]);
    }

    #[test]
    fn test_extglob_group() {
        assert_eq!(values("ls @(a|b).txt"), vec!["ls", "@(a|b).txt", ""]);
    }

    #[test]
    fn test_regex_operand() {
        let v = values("[[ $x =~ ^(a|b)+$ ]]");
        assert_eq!(v, vec!["[[", "$x", "=~", "^(a|b)+$", "]]", ""]);
    }

    #[test]
    fn test_process_substitution_word() {
        assert_eq!(values("diff <(ls a) <(ls b)"), vec!["diff", "<(ls a)", "<(ls b)", ""]);
    }

    #[test]
    fn test_split_assignment() {
        let a = split_assignment("arr[1+2]+=x").unwrap();
        assert_eq!(a.name, "arr");
        assert_eq!(a.index, Some("1+2"));
        assert!(a.append);
        assert_eq!(a.value, "x");
        assert!(split_assignment("1a=b").is_none());
        assert!(split_assignment("echo").is_none());
    }
}

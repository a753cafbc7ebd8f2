//! Recursive Descent Parser for Shell Scripts
//!
//! Consumes the lexer's token stream and builds the AST. Grammar, loosely:
//!
//! ```text
//! script    := list EOF
//! list      := (and_or (';' | '&' | NEWLINE)*)*
//! and_or    := pipeline (('&&' | '||') NEWLINE* pipeline)*
//! pipeline  := '!'* command (('|' | '|&') NEWLINE* command)*
//! command   := compound redirect* | function_def | simple
//! simple    := (assignment | redirect)* word (word | redirect)*
//! ```
//!
//! Reserved words are ordinary word tokens; they are only recognized when
//! unquoted and in command position.

use std::sync::Arc;

use crate::ast::types::*;
use crate::parser::arithmetic_parser::parse_arithmetic;
use crate::parser::lexer::{is_valid_name, split_assignment, AssignmentParts, Lexer, Token, TokenType};
use crate::parser::types::{is_command_terminator, is_redirection_token, ParseException, MAX_INPUT_SIZE, MAX_PARSER_DEPTH};
use crate::parser::word_parser::{parse_heredoc_body, parse_word_with, WordMode};

/// Words that close a compound command and cannot start one.
const CLOSING_WORDS: &[&str] = &["then", "else", "elif", "fi", "do", "done", "esac", "}", "]]"];

/// Builtins whose `name=value` arguments are parsed as assignments.
const DECLARATION_COMMANDS: &[&str] = &["declare", "typeset", "local", "export", "readonly"];

/// Parser state over one token stream
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self { tokens: Vec::new(), pos: 0, depth: 0 }
    }

    /// Parse a complete script.
    pub fn parse(&mut self, input: &str) -> Result<ScriptNode, ParseException> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(ParseException::new(
                format!("input too large: {} bytes (max {})", input.len(), MAX_INPUT_SIZE),
                1,
                1,
            ));
        }
        let tokens = Lexer::new(input).tokenize()?;
        self.parse_tokens(tokens)
    }

    pub fn parse_tokens(&mut self, tokens: Vec<Token>) -> Result<ScriptNode, ParseException> {
        self.tokens = tokens;
        self.pos = 0;
        self.depth = 0;
        let statements = self.parse_statement_list(&[])?;
        if !self.check(TokenType::Eof) {
            return Err(self.unexpected());
        }
        Ok(ScriptNode { statements })
    }

    // =========================================================================
    // TOKEN HELPERS
    // =========================================================================

    pub(crate) fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, token_type: TokenType) -> bool {
        self.current().token_type == token_type
    }

    pub(crate) fn at_keyword(&self, keyword: &str) -> bool {
        self.current().is_word(keyword)
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(TokenType::Newline) {
            self.pos += 1;
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseException {
        ParseException::at_token(message, self.current())
    }

    pub(crate) fn unexpected(&self) -> ParseException {
        self.error(format!("syntax error near unexpected token {}", self.current().describe()))
    }

    /// Consume a reserved word or fail with "expected `kw'".
    pub(crate) fn expect_keyword(&mut self, keyword: &str, opened_by: &str) -> Result<Token, ParseException> {
        if self.at_keyword(keyword) {
            return Ok(self.advance());
        }
        Err(self.error(format!(
            "syntax error: expected `{}' to match `{}', found {}",
            keyword,
            opened_by,
            self.current().describe()
        )))
    }

    pub(crate) fn expect(&mut self, token_type: TokenType, message: &str) -> Result<Token, ParseException> {
        if self.check(token_type) {
            return Ok(self.advance());
        }
        Err(self.error(format!("syntax error: {}, found {}", message, self.current().describe())))
    }

    fn enter(&mut self) -> Result<(), ParseException> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(self.error("maximum nesting depth exceeded"));
        }
        Ok(())
    }

    pub(crate) fn position_of(token: &Token) -> Position {
        Position::new(token.start, token.line, token.column)
    }

    pub(crate) fn word_from(token: &Token, mode: WordMode) -> Result<WordNode, ParseException> {
        parse_word_with(&token.value, mode, token.line, token.column)
    }

    // =========================================================================
    // LISTS, AND-OR LISTS, PIPELINES
    // =========================================================================

    /// Parse statements until end of input, a closing token, or one of the
    /// `stops` reserved words in command position.
    pub(crate) fn parse_statement_list(&mut self, stops: &[&str]) -> Result<Vec<StatementNode>, ParseException> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            let token = self.current();
            match token.token_type {
                TokenType::Eof
                | TokenType::RParen
                | TokenType::DSemi
                | TokenType::SemiAnd
                | TokenType::SemiSemiAnd => break,
                TokenType::Word if !token.quoted && stops.contains(&token.value.as_str()) => break,
                _ => {}
            }

            let mut statement = self.parse_and_or()?;
            match self.current().token_type {
                TokenType::Semicolon => {
                    self.advance();
                    statement.terminator = Terminator::Semicolon;
                }
                TokenType::Newline => {
                    self.advance();
                    statement.terminator = Terminator::Newline;
                }
                TokenType::Amp => {
                    self.advance();
                    statement.background = true;
                    statement.terminator = Terminator::Amp;
                }
                _ => {
                    statements.push(statement);
                    break;
                }
            }
            statements.push(statement);
        }
        Ok(statements)
    }

    fn parse_and_or(&mut self) -> Result<StatementNode, ParseException> {
        let mut left = self.parse_pipeline()?;
        loop {
            let operator = match self.current().token_type {
                TokenType::AndAnd => BinaryOperator::And,
                TokenType::OrOr => BinaryOperator::Or,
                _ => break,
            };
            let op_token = self.advance();
            self.skip_newlines();
            if self.check(TokenType::Eof) {
                return Err(ParseException::at_token(
                    format!("syntax error: expected command after `{}'", operator.as_str()),
                    &op_token,
                ));
            }
            let right = self.parse_pipeline()?;
            let position = left.position;
            left = StatementNode::new(
                CommandNode::Binary(BinaryNode { operator, left: Box::new(left), right: Box::new(right) }),
                position,
            );
        }
        Ok(left)
    }

    fn parse_pipeline(&mut self) -> Result<StatementNode, ParseException> {
        let mut negated = false;
        while self.at_keyword("!") {
            self.advance();
            negated = !negated;
        }

        let mut left = self.parse_command()?;
        loop {
            let operator = match self.current().token_type {
                TokenType::Pipe => BinaryOperator::Pipe,
                TokenType::PipeAmp => BinaryOperator::PipeAll,
                _ => break,
            };
            let op_token = self.advance();
            self.skip_newlines();
            if self.check(TokenType::Eof) {
                return Err(ParseException::at_token(
                    format!("syntax error: expected command after `{}'", operator.as_str()),
                    &op_token,
                ));
            }
            let right = self.parse_command()?;
            let position = left.position;
            left = StatementNode::new(
                CommandNode::Binary(BinaryNode { operator, left: Box::new(left), right: Box::new(right) }),
                position,
            );
        }
        if negated {
            left.negated = !left.negated;
        }
        Ok(left)
    }

    // =========================================================================
    // COMMANDS
    // =========================================================================

    pub(crate) fn parse_command(&mut self) -> Result<StatementNode, ParseException> {
        self.enter()?;
        let result = self.parse_command_inner();
        self.depth -= 1;
        result
    }

    fn parse_command_inner(&mut self) -> Result<StatementNode, ParseException> {
        let token = self.current().clone();
        let position = Self::position_of(&token);

        let compound = match token.token_type {
            TokenType::LParen => Some(self.parse_subshell()?),
            TokenType::ArithCommand => {
                self.advance();
                let expression = parse_arithmetic(&token.value)
                    .map_err(|e| ParseException::at_token(e.message, &token))?;
                Some(CommandNode::Arithmetic(ArithmeticCommandNode { expression }))
            }
            TokenType::Word if !token.quoted => match token.value.as_str() {
                "{" => Some(self.parse_brace_group()?),
                "if" => Some(self.parse_if()?),
                "while" => Some(self.parse_while(false)?),
                "until" => Some(self.parse_while(true)?),
                "for" => Some(self.parse_for()?),
                "case" => Some(self.parse_case()?),
                "[[" => Some(self.parse_test_clause()?),
                "function" => return self.parse_function_keyword(),
                "coproc" => return self.parse_coproc(),
                w if CLOSING_WORDS.contains(&w) => return Err(self.unexpected()),
                _ => None,
            },
            _ => None,
        };

        match compound {
            Some(command) => {
                let redirections = self.parse_redirections()?;
                Ok(StatementNode { command: Some(command), redirections, position, ..Default::default() })
            }
            None => self.parse_simple_command(),
        }
    }

    fn is_redirection_start(&self) -> bool {
        let t = self.current().token_type;
        t == TokenType::IoNumber || is_redirection_token(t)
    }

    pub(crate) fn parse_redirections(&mut self) -> Result<Vec<RedirectionNode>, ParseException> {
        let mut redirections = Vec::new();
        while self.is_redirection_start() {
            redirections.push(self.parse_redirection()?);
        }
        Ok(redirections)
    }

    fn parse_simple_command(&mut self) -> Result<StatementNode, ParseException> {
        let first = self.current().clone();
        let position = Self::position_of(&first);
        let mut assignments = Vec::new();
        let mut redirections = Vec::new();
        let mut words: Vec<Token> = Vec::new();
        let mut declare_args: Vec<DeclareArg> = Vec::new();

        loop {
            if self.is_redirection_start() {
                redirections.push(self.parse_redirection()?);
                continue;
            }
            let token = self.current().clone();
            if token.token_type != TokenType::Word {
                break;
            }

            if words.is_empty() {
                if let Some(parts) = split_assignment(&token.value) {
                    self.advance();
                    assignments.push(self.parse_assignment(&token, parts)?);
                    continue;
                }
                // name ( ) compound-command
                if assignments.is_empty()
                    && redirections.is_empty()
                    && !token.quoted
                    && self.peek(1).token_type == TokenType::LParen
                    && self.peek(2).token_type == TokenType::RParen
                {
                    return self.parse_function_body(token.value.clone(), position);
                }
            } else if words[0].token_type == TokenType::Word
                && !words[0].quoted
                && DECLARATION_COMMANDS.contains(&words[0].value.as_str())
            {
                self.advance();
                match split_assignment(&token.value) {
                    Some(parts) => declare_args.push(DeclareArg::Assign(self.parse_assignment(&token, parts)?)),
                    None => declare_args.push(DeclareArg::Word(Self::word_from(&token, WordMode::NORMAL)?)),
                }
                words.push(token);
                continue;
            }
            self.advance();
            words.push(token);
        }

        if words.is_empty() && assignments.is_empty() && redirections.is_empty() {
            return Err(self.unexpected());
        }
        if !is_command_terminator(self.current().token_type) {
            return Err(self.unexpected());
        }

        let command = match words.first() {
            None => None,
            Some(name) if !name.quoted && DECLARATION_COMMANDS.contains(&name.value.as_str()) => {
                Some(CommandNode::Declare(DeclareNode { variant: name.value.clone(), args: declare_args }))
            }
            Some(name) if !name.quoted && name.value == "let" => {
                let mut args = Vec::with_capacity(words.len() - 1);
                for w in &words[1..] {
                    args.push(Self::word_from(w, WordMode::PLAIN)?);
                }
                Some(CommandNode::Let(LetNode { args }))
            }
            Some(_) => {
                let mut args = Vec::with_capacity(words.len());
                for w in &words {
                    args.push(Self::word_from(w, WordMode::NORMAL)?);
                }
                Some(CommandNode::Call(CallNode { args }))
            }
        };

        Ok(StatementNode { command, assignments, redirections, position, ..Default::default() })
    }

    /// Build an assignment from a `name[index]+=value` word.
    fn parse_assignment(&self, token: &Token, parts: AssignmentParts<'_>) -> Result<AssignmentNode, ParseException> {
        let index = match parts.index {
            Some(i) => Some(parse_word_with(i, WordMode::PLAIN, token.line, token.column)?),
            None => None,
        };
        let is_array = index.is_none() && parts.value.starts_with('(') && parts.value.ends_with(')') && parts.value.len() >= 2;
        if is_array {
            let inner = &parts.value[1..parts.value.len() - 1];
            let array = self.parse_array_literal(inner, token)?;
            return Ok(AssignmentNode {
                name: parts.name.to_string(),
                index: None,
                value: None,
                array: Some(array),
                append: parts.append,
            });
        }
        Ok(AssignmentNode {
            name: parts.name.to_string(),
            index,
            value: Some(parse_word_with(parts.value, WordMode::ASSIGNMENT, token.line, token.column)?),
            array: None,
            append: parts.append,
        })
    }

    fn parse_array_literal(&self, inner: &str, token: &Token) -> Result<Vec<ArrayElement>, ParseException> {
        let relocate = |e: ParseException| ParseException::at_token(e.message, token);
        let tokens = Lexer::new(inner).tokenize().map_err(|e| relocate(e.into()))?;
        let mut elements = Vec::new();
        for t in tokens {
            match t.token_type {
                TokenType::Newline | TokenType::Eof => continue,
                TokenType::Word => {}
                _ => return Err(ParseException::at_token(
                    format!("syntax error near unexpected token {} in array literal", t.describe()),
                    token,
                )),
            }
            // [key]=value
            let keyed = t
                .value
                .strip_prefix('[')
                .and_then(|rest| rest.find("]=").map(|close| (&rest[..close], &rest[close + 2..])));
            let element = match keyed {
                Some((key, value)) => ArrayElement {
                    index: Some(parse_word_with(key, WordMode::PLAIN, token.line, token.column).map_err(relocate)?),
                    value: parse_word_with(value, WordMode::ASSIGNMENT, token.line, token.column).map_err(relocate)?,
                },
                None => ArrayElement {
                    index: None,
                    value: parse_word_with(&t.value, WordMode::NORMAL, token.line, token.column).map_err(relocate)?,
                },
            };
            elements.push(element);
        }
        Ok(elements)
    }

    fn parse_redirection(&mut self) -> Result<RedirectionNode, ParseException> {
        let first = self.current().clone();
        let position = Self::position_of(&first);
        let mut fd = None;
        if first.token_type == TokenType::IoNumber {
            let n = first
                .value
                .parse::<u32>()
                .map_err(|_| ParseException::at_token(format!("{}: bad file descriptor", first.value), &first))?;
            fd = Some(n);
            self.advance();
        }

        let op = self.advance();
        let operator = match op.token_type {
            TokenType::Less => RedirectionOperator::Less,
            TokenType::Great => RedirectionOperator::Great,
            TokenType::DGreat => RedirectionOperator::DGreat,
            TokenType::Clobber => RedirectionOperator::Clobber,
            TokenType::LessGreat => RedirectionOperator::LessGreat,
            TokenType::GreatAnd => RedirectionOperator::GreatAnd,
            TokenType::LessAnd => RedirectionOperator::LessAnd,
            TokenType::AndGreat => RedirectionOperator::AndGreat,
            TokenType::AndDGreat => RedirectionOperator::AndDGreat,
            TokenType::DLess => RedirectionOperator::DLess,
            TokenType::DLessDash => RedirectionOperator::DLessDash,
            TokenType::TLess => RedirectionOperator::TLess,
            _ => return Err(ParseException::at_token(format!("syntax error near unexpected token {}", op.describe()), &op)),
        };

        let target = self.current().clone();
        if target.token_type != TokenType::Word {
            return Err(self.error(format!(
                "syntax error: expected a word after `{}', found {}",
                operator.as_str(),
                target.describe()
            )));
        }
        self.advance();

        if matches!(operator, RedirectionOperator::DLess | RedirectionOperator::DLessDash) {
            let delimiter: String = target.value.chars().filter(|c| !matches!(c, '\'' | '"' | '\\')).collect();
            let body = op.heredoc.clone().unwrap_or_default();
            let quoted = target.quoted;
            let body = if quoted {
                WordNode::literal(body)
            } else {
                parse_heredoc_body(&body, op.line + 1, 1)?
            };
            return Ok(RedirectionNode {
                fd,
                operator,
                target: WordNode::literal(delimiter),
                heredoc: Some(HereDocNode {
                    body,
                    strip_tabs: operator == RedirectionOperator::DLessDash,
                    quoted,
                }),
                position,
            });
        }

        Ok(RedirectionNode {
            fd,
            operator,
            target: Self::word_from(&target, WordMode { brace: false, ..WordMode::NORMAL })?,
            heredoc: None,
            position,
        })
    }

    // =========================================================================
    // FUNCTIONS AND COPROCESSES
    // =========================================================================

    fn parse_function_keyword(&mut self) -> Result<StatementNode, ParseException> {
        let keyword = self.advance();
        let name = self.current().clone();
        if name.token_type != TokenType::Word {
            return Err(self.error("syntax error: expected function name after `function'"));
        }
        let parens = self.peek(1).token_type == TokenType::LParen && self.peek(2).token_type == TokenType::RParen;
        self.parse_function_body_at(name.value, Self::position_of(&keyword), parens)
    }

    fn parse_function_body(&mut self, name: String, position: Position) -> Result<StatementNode, ParseException> {
        self.parse_function_body_at(name, position, true)
    }

    /// The current token is the function name, optionally followed by `()`.
    fn parse_function_body_at(&mut self, name: String, position: Position, parens: bool) -> Result<StatementNode, ParseException> {
        self.advance();
        if parens {
            self.advance();
            self.advance();
        }
        self.skip_newlines();
        let body_start = self.current().clone();
        let body = self.parse_command()?;
        let is_compound = matches!(
            body.command,
            Some(
                CommandNode::Block(_)
                    | CommandNode::Subshell(_)
                    | CommandNode::If(_)
                    | CommandNode::While(_)
                    | CommandNode::For(_)
                    | CommandNode::Case(_)
                    | CommandNode::Arithmetic(_)
                    | CommandNode::Test(_)
            )
        );
        if !is_compound {
            return Err(ParseException::at_token(
                format!("syntax error: function body for `{}' must be a compound command", name),
                &body_start,
            ));
        }
        Ok(StatementNode::new(
            CommandNode::FunctionDecl(FunctionDeclNode { name, body: Arc::new(body) }),
            position,
        ))
    }

    fn parse_coproc(&mut self) -> Result<StatementNode, ParseException> {
        let keyword = self.advance();
        let mut name = None;
        let candidate = self.current().clone();
        let next = self.peek(1).clone();
        if candidate.token_type == TokenType::Word
            && !candidate.quoted
            && is_valid_name(&candidate.value)
            && (next.is_word("{") || next.token_type == TokenType::LParen)
        {
            name = Some(candidate.value);
            self.advance();
        }
        let body = self.parse_command()?;
        Ok(StatementNode::new(
            CommandNode::Coproc(CoprocNode { name, body: Box::new(body) }),
            Self::position_of(&keyword),
        ))
    }
}

/// Parse a script into an AST.
pub fn parse(input: &str) -> Result<ScriptNode, ParseException> {
    log::trace!("parsing {} bytes", input.len());
    let script = Parser::new().parse(input)?;
    log::debug!("parsed {} top-level statements", script.statements.len());
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(input: &str) -> StatementNode {
        parse(input).unwrap().statements.remove(0)
    }

    fn call_args(stmt: &StatementNode) -> Vec<String> {
        match &stmt.command {
            Some(CommandNode::Call(c)) => c.args.iter().map(|w| w.as_literal().unwrap_or_default()).collect(),
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse("").unwrap().statements.is_empty());
        assert!(parse("\n\n# only a comment\n").unwrap().statements.is_empty());
    }

    #[test]
    fn test_parse_simple_command() {
        let stmt = first("echo hello world");
        assert_eq!(call_args(&stmt), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_parse_assignments() {
        let stmt = first("A=1 B+=2 env");
        assert_eq!(stmt.assignments.len(), 2);
        assert_eq!(stmt.assignments[0].name, "A");
        assert!(stmt.assignments[1].append);
        assert_eq!(call_args(&stmt), vec!["env"]);

        let stmt = first("X=1");
        assert!(stmt.command.is_none());
    }

    #[test]
    fn test_parse_array_assignment() {
        let stmt = first("a=(one \"two three\" [5]=five)");
        let array = stmt.assignments[0].array.as_ref().unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array[2].index, Some(WordNode::literal("5")));
    }

    #[test]
    fn test_parse_pipeline() {
        let stmt = first("a | b | c");
        match stmt.command {
            Some(CommandNode::Binary(b)) => {
                assert_eq!(b.operator, BinaryOperator::Pipe);
                assert!(matches!(b.left.command, Some(CommandNode::Binary(_))));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_and_or_left_associative() {
        let stmt = first("a && b || c");
        match stmt.command {
            Some(CommandNode::Binary(b)) => {
                assert_eq!(b.operator, BinaryOperator::Or);
                match b.left.command {
                    Some(CommandNode::Binary(inner)) => assert_eq!(inner.operator, BinaryOperator::And),
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dangling_and_is_error() {
        let err = parse("echo a &&").unwrap_err();
        assert!(err.message.contains("&&"));
        assert!(parse("echo a |").is_err());
    }

    #[test]
    fn test_negation_and_background() {
        let stmt = first("! false");
        assert!(stmt.negated);
        let stmt = first("sleep 1 &");
        assert!(stmt.background);
    }

    #[test]
    fn test_parse_redirections() {
        let stmt = first("cmd >out 2>&1 <in");
        assert_eq!(stmt.redirections.len(), 3);
        assert_eq!(stmt.redirections[0].operator, RedirectionOperator::Great);
        assert_eq!(stmt.redirections[1].fd, Some(2));
        assert_eq!(stmt.redirections[1].operator, RedirectionOperator::GreatAnd);
        assert_eq!(stmt.redirections[2].operator, RedirectionOperator::Less);
    }

    #[test]
    fn test_parse_heredoc() {
        let stmt = first("cat <<'EOF'\n$x\nEOF\n");
        let heredoc = stmt.redirections[0].heredoc.as_ref().unwrap();
        assert!(heredoc.quoted);
        assert_eq!(heredoc.body, WordNode::literal("$x\n"));
    }

    #[test]
    fn test_parse_function() {
        let stmt = first("greet() { echo hi; }");
        match stmt.command {
            Some(CommandNode::FunctionDecl(f)) => {
                assert_eq!(f.name, "greet");
                assert!(matches!(f.body.command, Some(CommandNode::Block(_))));
            }
            other => panic!("unexpected {:?}", other),
        }
        let stmt = first("function greet { echo hi; }");
        assert!(matches!(stmt.command, Some(CommandNode::FunctionDecl(_))));
    }

    #[test]
    fn test_parse_declare() {
        let stmt = first("local a=1 b arr=(x y)");
        match stmt.command {
            Some(CommandNode::Declare(d)) => {
                assert_eq!(d.variant, "local");
                assert_eq!(d.args.len(), 3);
                assert!(matches!(&d.args[2], DeclareArg::Assign(a) if a.array.is_some()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_closing_word() {
        let err = parse("fi").unwrap_err();
        assert!(err.message.contains("fi"));
        let err = parse("echo a\n}").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_keywords_as_arguments() {
        let stmt = first("echo if then fi");
        assert_eq!(call_args(&stmt), vec!["echo", "if", "then", "fi"]);
    }

    #[test]
    fn test_nested_command_substitution() {
        let stmt = first("echo $(echo $(echo deep))");
        match &stmt.command {
            Some(CommandNode::Call(c)) => {
                assert!(matches!(c.args[1].parts[0], WordPart::CommandSubstitution(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

//! Compound Command Parser
//!
//! Handles parsing of compound commands: if, for, while, until, case,
//! subshell and group.

use crate::ast::types::*;
use crate::parser::arithmetic_parser::parse_arithmetic;
use crate::parser::lexer::{is_valid_name, TokenType};
use crate::parser::parser::Parser;
use crate::parser::types::ParseException;
use crate::parser::word_parser::WordMode;

/// Case patterns see tildes but no brace expansion.
const PATTERN_MODE: WordMode = WordMode { brace: false, tilde: true, assignment: false, in_dquote: false };

/// Split the inside of `for (( ; ; ))` on top-level semicolons.
fn split_for_clauses(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth == 0 => {
                clauses.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(&text[start..]);
    clauses
}

impl Parser {
    pub(crate) fn parse_subshell(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();
        let body = self.parse_statement_list(&[])?;
        self.expect(TokenType::RParen, "expected `)' to close subshell")?;
        Ok(CommandNode::Subshell(SubshellNode { body }))
    }

    pub(crate) fn parse_brace_group(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();
        let body = self.parse_statement_list(&["}"])?;
        self.expect_keyword("}", "{")?;
        Ok(CommandNode::Block(BlockNode { body }))
    }

    pub(crate) fn parse_if(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();
        let mut clauses = Vec::new();
        let mut else_body = None;

        let condition = self.parse_statement_list(&["then"])?;
        self.expect_keyword("then", "if")?;
        let body = self.parse_statement_list(&["elif", "else", "fi"])?;
        clauses.push(IfClause { condition, body });

        loop {
            if self.at_keyword("elif") {
                self.advance();
                let condition = self.parse_statement_list(&["then"])?;
                self.expect_keyword("then", "elif")?;
                let body = self.parse_statement_list(&["elif", "else", "fi"])?;
                clauses.push(IfClause { condition, body });
            } else if self.at_keyword("else") {
                self.advance();
                else_body = Some(self.parse_statement_list(&["fi"])?);
                break;
            } else {
                break;
            }
        }
        self.expect_keyword("fi", "if")?;
        Ok(CommandNode::If(IfNode { clauses, else_body }))
    }

    pub(crate) fn parse_while(&mut self, until: bool) -> Result<CommandNode, ParseException> {
        let keyword = if until { "until" } else { "while" };
        self.advance();
        let condition = self.parse_statement_list(&["do"])?;
        self.expect_keyword("do", keyword)?;
        let body = self.parse_statement_list(&["done"])?;
        self.expect_keyword("done", "do")?;
        Ok(CommandNode::While(WhileNode { condition, body, until }))
    }

    /// Loop body: `do ... done` or a `{ ... }` group.
    fn parse_loop_body(&mut self) -> Result<Vec<StatementNode>, ParseException> {
        self.skip_newlines();
        if self.at_keyword("{") {
            return match self.parse_brace_group()? {
                CommandNode::Block(block) => Ok(block.body),
                _ => Err(self.error("syntax error: malformed loop body")),
            };
        }
        self.expect_keyword("do", "for")?;
        let body = self.parse_statement_list(&["done"])?;
        self.expect_keyword("done", "do")?;
        Ok(body)
    }

    pub(crate) fn parse_for(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();

        if self.check(TokenType::ArithCommand) {
            let token = self.advance();
            let clauses = split_for_clauses(&token.value);
            if clauses.len() != 3 {
                return Err(ParseException::at_token("syntax error: expected `((init; cond; update))'", &token));
            }
            let mut parsed = Vec::with_capacity(3);
            for clause in clauses {
                if clause.trim().is_empty() {
                    parsed.push(None);
                } else {
                    parsed.push(Some(
                        parse_arithmetic(clause).map_err(|e| ParseException::at_token(e.message, &token))?,
                    ));
                }
            }
            let update = parsed.pop().flatten();
            let condition = parsed.pop().flatten();
            let init = parsed.pop().flatten();
            if self.check(TokenType::Semicolon) {
                self.advance();
            }
            let body = self.parse_loop_body()?;
            return Ok(CommandNode::For(ForNode { kind: ForKind::CStyle { init, condition, update }, body }));
        }

        let name = self.current().clone();
        if name.token_type != TokenType::Word || !is_valid_name(&name.value) {
            return Err(self.error(format!("syntax error: `{}': not a valid identifier", name.value)));
        }
        self.advance();
        self.skip_newlines();

        let mut words = None;
        if self.at_keyword("in") {
            self.advance();
            let mut list = Vec::new();
            while self.check(TokenType::Word) {
                let token = self.advance();
                list.push(Self::word_from(&token, WordMode::NORMAL)?);
            }
            match self.current().token_type {
                TokenType::Semicolon | TokenType::Newline => {
                    self.advance();
                }
                _ => {
                    if !self.at_keyword("do") {
                        return Err(self.unexpected());
                    }
                }
            }
            words = Some(list);
        } else if self.check(TokenType::Semicolon) {
            self.advance();
        }

        let body = self.parse_loop_body()?;
        Ok(CommandNode::For(ForNode { kind: ForKind::WordList { variable: name.value, words }, body }))
    }

    pub(crate) fn parse_case(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();
        let subject = self.current().clone();
        if subject.token_type != TokenType::Word {
            return Err(self.error("syntax error: expected a word after `case'"));
        }
        self.advance();
        let word = Self::word_from(&subject, PATTERN_MODE)?;
        self.skip_newlines();
        self.expect_keyword("in", "case")?;
        self.skip_newlines();

        let mut items = Vec::new();
        loop {
            if self.at_keyword("esac") {
                self.advance();
                break;
            }
            if self.check(TokenType::Eof) {
                return Err(self.error("syntax error: expected `esac' to match `case', found end of file"));
            }
            if self.check(TokenType::LParen) {
                self.advance();
            }

            let mut patterns = Vec::new();
            loop {
                let token = self.current().clone();
                if token.token_type != TokenType::Word {
                    return Err(self.unexpected());
                }
                self.advance();
                patterns.push(Self::word_from(&token, PATTERN_MODE)?);
                if self.check(TokenType::Pipe) {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect(TokenType::RParen, "expected `)' after case pattern")?;

            let body = self.parse_statement_list(&["esac"])?;
            let terminator = match self.current().token_type {
                TokenType::DSemi => CaseTerminator::Break,
                TokenType::SemiAnd => CaseTerminator::FallThrough,
                TokenType::SemiSemiAnd => CaseTerminator::ContinueMatching,
                _ if self.at_keyword("esac") => CaseTerminator::Break,
                _ => return Err(self.error(format!(
                    "syntax error: expected `;;' or `esac', found {}",
                    self.current().describe()
                ))),
            };
            if !self.at_keyword("esac") {
                self.advance();
            }
            items.push(CaseItemNode { patterns, body, terminator });
            self.skip_newlines();
        }
        Ok(CommandNode::Case(CaseNode { word, items }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::types::*;
    use crate::parser::parse;

    fn command(input: &str) -> CommandNode {
        parse(input).unwrap().statements.remove(0).command.unwrap()
    }

    #[test]
    fn test_parse_if_elif_else() {
        match command("if a; then b; elif c; then d; else e; fi") {
            CommandNode::If(node) => {
                assert_eq!(node.clauses.len(), 2);
                assert_eq!(node.else_body.map(|b| b.len()), Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_fi_reports_expectation() {
        let err = parse("if true; then\n  echo x\n").unwrap_err();
        assert!(err.message.contains("expected `fi'"), "{}", err.message);
    }

    #[test]
    fn test_parse_while_and_until() {
        assert!(matches!(command("while true; do :; done"), CommandNode::While(WhileNode { until: false, .. })));
        assert!(matches!(command("until false\ndo\n:\ndone"), CommandNode::While(WhileNode { until: true, .. })));
    }

    #[test]
    fn test_parse_for_loops() {
        match command("for f in a b c; do echo $f; done") {
            CommandNode::For(ForNode { kind: ForKind::WordList { variable, words }, body }) => {
                assert_eq!(variable, "f");
                assert_eq!(words.map(|w| w.len()), Some(3));
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            command("for x; do :; done"),
            CommandNode::For(ForNode { kind: ForKind::WordList { words: None, .. }, .. })
        ));
        match command("for ((i = 0; i < 3; i++)); do :; done") {
            CommandNode::For(ForNode { kind: ForKind::CStyle { init, condition, update }, .. }) => {
                assert!(init.is_some() && condition.is_some() && update.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            command("for ((;;)) { break; }"),
            CommandNode::For(ForNode { kind: ForKind::CStyle { init: None, condition: None, update: None }, .. })
        ));
    }

    #[test]
    fn test_parse_case() {
        match command("case $x in\n  a|b) echo ab;;\n  (c) echo c;&\n  *) echo other;;&\nesac") {
            CommandNode::Case(node) => {
                assert_eq!(node.items.len(), 3);
                assert_eq!(node.items[0].patterns.len(), 2);
                assert_eq!(node.items[1].terminator, CaseTerminator::FallThrough);
                assert_eq!(node.items[2].terminator, CaseTerminator::ContinueMatching);
            }
            other => panic!("unexpected {:?}", other),
        }
        match command("case x in x) echo last\nesac") {
            CommandNode::Case(node) => assert_eq!(node.items[0].terminator, CaseTerminator::Break),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_group_and_subshell() {
        assert!(matches!(command("{ a; b; }"), CommandNode::Block(_)));
        assert!(matches!(command("(a; b)"), CommandNode::Subshell(_)));
        assert!(parse("{ a; ").is_err());
        assert!(parse("(a").is_err());
    }

    #[test]
    fn test_compound_with_redirection() {
        let stmt = parse("while read l; do echo $l; done < file").unwrap().statements.remove(0);
        assert_eq!(stmt.redirections.len(), 1);
    }
}

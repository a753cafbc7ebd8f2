//! Conditional Expression Parser
//!
//! Handles parsing of `[[ ... ]]` test clauses. Operands are never split or
//! globbed, so words are parsed without brace expansion.

use crate::ast::types::*;
use crate::parser::lexer::TokenType;
use crate::parser::parser::Parser;
use crate::parser::types::ParseException;
use crate::parser::word_parser::WordMode;

const OPERAND_MODE: WordMode = WordMode { brace: false, tilde: true, assignment: false, in_dquote: false };

impl Parser {
    pub(crate) fn parse_test_clause(&mut self) -> Result<CommandNode, ParseException> {
        self.advance();
        self.skip_newlines();
        if self.at_keyword("]]") {
            return Err(self.error("syntax error: empty `[[ ]]' expression"));
        }
        let expression = self.parse_test_or()?;
        self.skip_newlines();
        self.expect_keyword("]]", "[[")?;
        Ok(CommandNode::Test(TestClauseNode { expression }))
    }

    fn parse_test_or(&mut self) -> Result<TestExpr, ParseException> {
        let mut left = self.parse_test_and()?;
        while self.check(TokenType::OrOr) {
            self.advance();
            self.skip_newlines();
            let right = self.parse_test_and()?;
            left = TestExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_test_and(&mut self) -> Result<TestExpr, ParseException> {
        let mut left = self.parse_test_not()?;
        while self.check(TokenType::AndAnd) {
            self.advance();
            self.skip_newlines();
            let right = self.parse_test_not()?;
            left = TestExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_test_not(&mut self) -> Result<TestExpr, ParseException> {
        if self.at_keyword("!") {
            self.advance();
            return Ok(TestExpr::Not(Box::new(self.parse_test_not()?)));
        }
        self.parse_test_primary()
    }

    /// True if the current token can serve as an operand.
    fn at_test_operand(&self) -> bool {
        self.check(TokenType::Word) && !self.at_keyword("]]")
    }

    fn binary_operator_at(&self, offset: usize) -> Option<BinaryTestOperator> {
        let token = self.peek(offset);
        match token.token_type {
            TokenType::Less => Some(BinaryTestOperator::StrLt),
            TokenType::Great => Some(BinaryTestOperator::StrGt),
            TokenType::Word if !token.quoted => BinaryTestOperator::from_str(&token.value),
            _ => None,
        }
    }

    fn parse_test_primary(&mut self) -> Result<TestExpr, ParseException> {
        if self.check(TokenType::LParen) {
            self.advance();
            self.skip_newlines();
            let inner = self.parse_test_or()?;
            self.skip_newlines();
            self.expect(TokenType::RParen, "expected `)' in conditional expression")?;
            return Ok(TestExpr::Group(Box::new(inner)));
        }

        if !self.at_test_operand() {
            return Err(self.error(format!(
                "syntax error: unexpected {} in conditional expression",
                self.current().describe()
            )));
        }

        let first = self.current().clone();
        let next = self.peek(1).clone();

        // Unary: -f file, -z string
        if !first.quoted && next.token_type == TokenType::Word && !next.is_word("]]") {
            if let Some(operator) = UnaryTestOperator::from_str(&first.value) {
                if self.binary_operator_at(1).is_none() {
                    self.advance();
                    let operand = self.advance();
                    return Ok(TestExpr::Unary { operator, operand: Self::word_from(&operand, OPERAND_MODE)? });
                }
            }
        }

        self.advance();
        let left = Self::word_from(&first, OPERAND_MODE)?;

        if let Some(operator) = self.binary_operator_at(0) {
            self.advance();
            let right_token = self.current().clone();
            if right_token.token_type != TokenType::Word {
                return Err(self.error(format!(
                    "syntax error: expected operand after `{}' in conditional expression",
                    operator.as_str()
                )));
            }
            self.advance();
            let right = Self::word_from(&right_token, OPERAND_MODE)?;
            return Ok(TestExpr::Binary { operator, left, right });
        }

        Ok(TestExpr::Word(left))
    }
}

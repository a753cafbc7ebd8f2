//! Arithmetic Expression Parser
//!
//! Parses shell arithmetic expressions like:
//! - $((1 + 2))
//! - $((x++))
//! - $((a ? b : c))
//! - $((2#1010))
//!
//! Operators follow C precedence; `**` and the assignment operators are
//! right-associative.

use crate::ast::types::*;
use crate::parser::lexer::{skip_construct, skip_param, Construct};
use crate::parser::types::{ParseException, MAX_PARSER_DEPTH};
use crate::parser::word_parser::{parse_word_with, WordMode};

#[derive(Debug, Clone, PartialEq)]
enum ArithToken {
    Number(i64),
    Name(String),
    Expansion(WordNode),
    Op(&'static str),
}

/// Operators, longest first so that `<<=` wins over `<<` and `<`.
const OPERATORS: &[&str] = &[
    "<<=", ">>=", "**", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "~", "&", "|", "^", "?", ":", ",",
    "(", ")", "[", "]",
];

fn syntax_error(message: impl Into<String>) -> ParseException {
    ParseException::new(message, 1, 1)
}

/// Parse an integer constant: decimal, `0x` hex, leading-zero octal or
/// `base#digits` with bases 2 through 64.
pub fn parse_number(text: &str) -> Result<i64, String> {
    let invalid = || format!("{}: value too great for base (error token is \"{}\")", text, text);
    if let Some((base, digits)) = text.split_once('#') {
        let base: u32 = base.parse().map_err(|_| invalid())?;
        if !(2..=64).contains(&base) || digits.is_empty() {
            return Err(format!("{}: invalid arithmetic base", text));
        }
        let mut value: i64 = 0;
        for c in digits.chars() {
            let d = match c {
                '0'..='9' => c as u32 - '0' as u32,
                'a'..='z' => c as u32 - 'a' as u32 + 10,
                'A'..='Z' if base <= 36 => c as u32 - 'A' as u32 + 10,
                'A'..='Z' => c as u32 - 'A' as u32 + 36,
                '@' => 62,
                '_' => 63,
                _ => return Err(invalid()),
            };
            if d >= base {
                return Err(invalid());
            }
            value = value.wrapping_mul(base as i64).wrapping_add(d as i64);
        }
        return Ok(value);
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_err(|_| invalid());
    }
    if text.len() > 1 && text.starts_with('0') {
        return i64::from_str_radix(&text[1..], 8).map_err(|_| invalid());
    }
    if text.chars().all(|c| c.is_ascii_digit()) {
        // Overflow wraps like the C arithmetic it imitates
        let mut value: i64 = 0;
        for c in text.chars() {
            value = value.wrapping_mul(10).wrapping_add((c as u8 - b'0') as i64);
        }
        return Ok(value);
    }
    Err(invalid())
}

fn tokenize(text: &str) -> Result<Vec<ArithToken>, ParseException> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || (c == '\\' && chars.get(i + 1) == Some(&'\n')) {
            i += if c == '\\' { 2 } else { 1 };
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '#' | '@' | '_')) {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(ArithToken::Number(parse_number(&literal).map_err(syntax_error)?));
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(ArithToken::Name(chars[start..i].iter().collect()));
            continue;
        }
        if c == '$' || c == '"' || c == '`' || c == '\'' {
            let end = expansion_end(&chars, i)
                .ok_or_else(|| syntax_error(format!("unterminated expansion in arithmetic: {}", text)))?;
            let raw: String = chars[i..end].iter().collect();
            tokens.push(ArithToken::Expansion(parse_word_with(&raw, WordMode::PLAIN, 1, 1)?));
            i = end;
            continue;
        }
        let rest: String = chars[i..(i + 3).min(chars.len())].iter().collect();
        match OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            Some(op) => {
                tokens.push(ArithToken::Op(*op));
                i += op.len();
            }
            None => {
                let remaining: String = chars[i..].iter().collect();
                return Err(syntax_error(format!(
                    "syntax error: invalid arithmetic operator (error token is \"{}\")",
                    remaining
                )));
            }
        }
    }
    Ok(tokens)
}

/// End of a `$...`, quoted string or backquote inside arithmetic text.
fn expansion_end(chars: &[char], i: usize) -> Option<usize> {
    match chars[i] {
        '"' => skip_construct(chars, i + 1, Construct::DoubleQuote),
        '\'' => skip_construct(chars, i + 1, Construct::SingleQuote),
        '`' => skip_construct(chars, i + 1, Construct::Backquote),
        _ => match chars.get(i + 1) {
            Some('{') => skip_param(chars, i + 2, false),
            Some('(') => {
                if chars.get(i + 2) == Some(&'(') {
                    if let Some(end) = skip_construct(chars, i + 3, Construct::Arith) {
                        return Some(end);
                    }
                }
                skip_construct(chars, i + 2, Construct::CommandSubst)
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let mut end = i + 1;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                Some(end)
            }
            Some(c) if c.is_ascii_digit() || matches!(c, '?' | '#' | '@' | '*' | '$' | '!' | '-') => Some(i + 2),
            _ => None,
        },
    }
}

/// Parse an arithmetic expression. Blank input evaluates to zero.
pub fn parse_arithmetic(text: &str) -> Result<ArithExpr, ParseException> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(ArithExpr::Number(0));
    }
    let mut parser = ArithParser { tokens, pos: 0, depth: 0 };
    let expr = parser.parse_comma()?;
    if let Some(token) = parser.tokens.get(parser.pos) {
        return Err(syntax_error(format!(
            "syntax error in expression (error token is \"{}\")",
            describe(token)
        )));
    }
    Ok(expr)
}

fn describe(token: &ArithToken) -> String {
    match token {
        ArithToken::Number(n) => n.to_string(),
        ArithToken::Name(n) => n.clone(),
        ArithToken::Expansion(_) => "$".to_string(),
        ArithToken::Op(op) => op.to_string(),
    }
}

struct ArithParser {
    tokens: Vec<ArithToken>,
    pos: usize,
    depth: usize,
}

/// Binary precedence levels, lowest first.
const BINARY_LEVELS: &[&[(&str, ArithBinaryOperator)]] = &[
    &[("||", ArithBinaryOperator::LogOr)],
    &[("&&", ArithBinaryOperator::LogAnd)],
    &[("|", ArithBinaryOperator::BitOr)],
    &[("^", ArithBinaryOperator::BitXor)],
    &[("&", ArithBinaryOperator::BitAnd)],
    &[("==", ArithBinaryOperator::Eq), ("!=", ArithBinaryOperator::Ne)],
    &[
        ("<", ArithBinaryOperator::Lt),
        ("<=", ArithBinaryOperator::Le),
        (">", ArithBinaryOperator::Gt),
        (">=", ArithBinaryOperator::Ge),
    ],
    &[("<<", ArithBinaryOperator::LShift), (">>", ArithBinaryOperator::RShift)],
    &[("+", ArithBinaryOperator::Add), ("-", ArithBinaryOperator::Sub)],
    &[("*", ArithBinaryOperator::Mul), ("/", ArithBinaryOperator::Div), ("%", ArithBinaryOperator::Mod)],
];

const ASSIGN_OPS: &[(&str, ArithAssignOperator)] = &[
    ("=", ArithAssignOperator::Assign),
    ("+=", ArithAssignOperator::Add),
    ("-=", ArithAssignOperator::Sub),
    ("*=", ArithAssignOperator::Mul),
    ("/=", ArithAssignOperator::Div),
    ("%=", ArithAssignOperator::Mod),
    ("<<=", ArithAssignOperator::LShift),
    (">>=", ArithAssignOperator::RShift),
    ("&=", ArithAssignOperator::And),
    ("|=", ArithAssignOperator::Or),
    ("^=", ArithAssignOperator::Xor),
];

impl ArithParser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(ArithToken::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn eat(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, op: &str) -> Result<(), ParseException> {
        if self.eat(op) {
            Ok(())
        } else {
            let found = self.tokens.get(self.pos).map(describe).unwrap_or_default();
            Err(syntax_error(format!("syntax error: `{}' expected (error token is \"{}\")", op, found)))
        }
    }

    fn enter(&mut self) -> Result<(), ParseException> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            return Err(syntax_error("expression nested too deeply"));
        }
        Ok(())
    }

    fn parse_comma(&mut self) -> Result<ArithExpr, ParseException> {
        let mut left = self.parse_assignment()?;
        while self.eat(",") {
            let right = self.parse_assignment()?;
            left = ArithExpr::Binary {
                operator: ArithBinaryOperator::Comma,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_assignment(&mut self) -> Result<ArithExpr, ParseException> {
        self.enter()?;
        let left = self.parse_ternary()?;
        let assign = self
            .peek_op()
            .and_then(|op| ASSIGN_OPS.iter().find(|(s, _)| *s == op).map(|(_, a)| *a));
        let result = match assign {
            Some(operator) => {
                let target = to_lvalue(left)?;
                self.pos += 1;
                let value = self.parse_assignment()?;
                ArithExpr::Assign { operator, target, value: Box::new(value) }
            }
            None => left,
        };
        self.depth -= 1;
        Ok(result)
    }

    fn parse_ternary(&mut self) -> Result<ArithExpr, ParseException> {
        let condition = self.parse_binary(0)?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let consequent = self.parse_assignment()?;
        self.expect(":")?;
        let alternate = self.parse_assignment()?;
        Ok(ArithExpr::Ternary {
            condition: Box::new(condition),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_binary(&mut self, level: usize) -> Result<ArithExpr, ParseException> {
        if level >= BINARY_LEVELS.len() {
            return self.parse_power();
        }
        let mut left = self.parse_binary(level + 1)?;
        loop {
            let op = self
                .peek_op()
                .and_then(|op| BINARY_LEVELS[level].iter().find(|(s, _)| *s == op).map(|(_, b)| *b));
            let Some(operator) = op else {
                break;
            };
            self.pos += 1;
            let right = self.parse_binary(level + 1)?;
            left = ArithExpr::Binary { operator, left: Box::new(left), right: Box::new(right) };
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<ArithExpr, ParseException> {
        let base = self.parse_unary()?;
        if self.eat("**") {
            self.enter()?;
            let exponent = self.parse_power()?;
            self.depth -= 1;
            return Ok(ArithExpr::Binary {
                operator: ArithBinaryOperator::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<ArithExpr, ParseException> {
        self.enter()?;
        let result = match self.peek_op() {
            Some(op @ ("++" | "--")) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                ArithExpr::Update { increment: op == "++", prefix: true, target: to_lvalue(operand)? }
            }
            Some(op @ ("-" | "+" | "!" | "~")) => {
                self.pos += 1;
                let operator = match op {
                    "-" => ArithUnaryOperator::Neg,
                    "+" => ArithUnaryOperator::Pos,
                    "!" => ArithUnaryOperator::Not,
                    _ => ArithUnaryOperator::BitNot,
                };
                ArithExpr::Unary { operator, operand: Box::new(self.parse_unary()?) }
            }
            _ => self.parse_postfix()?,
        };
        self.depth -= 1;
        Ok(result)
    }

    fn parse_postfix(&mut self) -> Result<ArithExpr, ParseException> {
        let primary = self.parse_primary()?;
        if matches!(primary, ArithExpr::Variable(_) | ArithExpr::Element { .. }) {
            if let Some(op @ ("++" | "--")) = self.peek_op() {
                self.pos += 1;
                return Ok(ArithExpr::Update { increment: op == "++", prefix: false, target: to_lvalue(primary)? });
            }
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<ArithExpr, ParseException> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(syntax_error("syntax error: operand expected"));
        };
        self.pos += 1;
        match token {
            ArithToken::Number(n) => Ok(ArithExpr::Number(n)),
            ArithToken::Expansion(word) => Ok(ArithExpr::Expansion(word)),
            ArithToken::Name(name) => {
                if self.eat("[") {
                    let index = self.parse_comma()?;
                    self.expect("]")?;
                    Ok(ArithExpr::Element { name, index: Box::new(index) })
                } else {
                    Ok(ArithExpr::Variable(name))
                }
            }
            ArithToken::Op("(") => {
                let inner = self.parse_comma()?;
                self.expect(")")?;
                Ok(ArithExpr::Group(Box::new(inner)))
            }
            ArithToken::Op(op) => Err(syntax_error(format!(
                "syntax error: operand expected (error token is \"{}\")",
                op
            ))),
        }
    }
}

fn to_lvalue(expr: ArithExpr) -> Result<ArithLValue, ParseException> {
    match expr {
        ArithExpr::Variable(name) => Ok(ArithLValue { name, index: None }),
        ArithExpr::Element { name, index } => Ok(ArithLValue { name, index: Some(index) }),
        _ => Err(syntax_error("attempted assignment to non-variable")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(operator: ArithBinaryOperator, left: ArithExpr, right: ArithExpr) -> ArithExpr {
        ArithExpr::Binary { operator, left: Box::new(left), right: Box::new(right) }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse_arithmetic("2 + 3 * 4").unwrap(),
            bin(
                ArithBinaryOperator::Add,
                ArithExpr::Number(2),
                bin(ArithBinaryOperator::Mul, ArithExpr::Number(3), ArithExpr::Number(4))
            )
        );
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(
            parse_arithmetic("2 ** 3 ** 2").unwrap(),
            bin(
                ArithBinaryOperator::Pow,
                ArithExpr::Number(2),
                bin(ArithBinaryOperator::Pow, ArithExpr::Number(3), ArithExpr::Number(2))
            )
        );
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        assert_eq!(
            parse_arithmetic("10 - 4 - 3").unwrap(),
            bin(
                ArithBinaryOperator::Sub,
                bin(ArithBinaryOperator::Sub, ArithExpr::Number(10), ArithExpr::Number(4)),
                ArithExpr::Number(3)
            )
        );
    }

    #[test]
    fn test_assignment_and_update() {
        assert!(matches!(
            parse_arithmetic("x += 2").unwrap(),
            ArithExpr::Assign { operator: ArithAssignOperator::Add, .. }
        ));
        assert!(matches!(
            parse_arithmetic("i++").unwrap(),
            ArithExpr::Update { increment: true, prefix: false, .. }
        ));
        assert!(matches!(parse_arithmetic("--a[1]").unwrap(), ArithExpr::Update { prefix: true, .. }));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_number("0x1F"), Ok(31));
        assert_eq!(parse_number("017"), Ok(15));
        assert_eq!(parse_number("2#1010"), Ok(10));
        assert_eq!(parse_number("36#z"), Ok(35));
        assert!(parse_number("08").is_err());
        assert!(parse_number("12abc").is_err());
    }

    #[test]
    fn test_ternary_and_expansion() {
        match parse_arithmetic("$x > 1 ? ${y} : 0").unwrap() {
            ArithExpr::Ternary { condition, .. } => assert!(matches!(*condition, ArithExpr::Binary { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_errors() {
        assert!(parse_arithmetic("1 +").is_err());
        assert!(parse_arithmetic("(1").is_err());
        assert!(parse_arithmetic("1 2").is_err());
        assert!(parse_arithmetic("3 = 4").is_err());
        assert_eq!(parse_arithmetic("  ").unwrap(), ArithExpr::Number(0));
    }
}

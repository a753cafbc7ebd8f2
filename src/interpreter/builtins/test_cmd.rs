//! test / [ - Evaluate conditional expressions
//!
//! Up to four arguments follow the POSIX rules, which decide by argument
//! count. Longer expressions are parsed with the usual precedence:
//! `!` binds tightest, then `-a`, then `-o`, with `( )` for grouping.
//! Exit status is 0 for true, 1 for false and 2 for a malformed
//! expression.

use crate::ast::types::{BinaryTestOperator, UnaryTestOperator};
use crate::interpreter::runner::{ExecResult, Runner};

fn binary_operator(op: &str) -> Option<BinaryTestOperator> {
    // `=~` belongs to [[ ]] only.
    BinaryTestOperator::from_str(op).filter(|o| *o != BinaryTestOperator::Match)
}

struct ExprParser<'a> {
    runner: &'a Runner,
    args: &'a [String],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.args.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Result<&'a str, String> {
        let token = self.args.get(self.pos).map(String::as_str).ok_or_else(|| "argument expected".to_string())?;
        self.pos += 1;
        Ok(token)
    }

    fn parse_or(&mut self) -> Result<bool, String> {
        let mut value = self.parse_and()?;
        while self.peek() == Some("-o") {
            self.pos += 1;
            let right = self.parse_and()?;
            value = value || right;
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<bool, String> {
        let mut value = self.parse_not()?;
        while self.peek() == Some("-a") {
            self.pos += 1;
            let right = self.parse_not()?;
            value = value && right;
        }
        Ok(value)
    }

    fn parse_not(&mut self) -> Result<bool, String> {
        if self.peek() == Some("!") {
            self.pos += 1;
            return Ok(!self.parse_not()?);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<bool, String> {
        let token = self.next()?;
        if token == "(" {
            let value = self.parse_or()?;
            return match self.next() {
                Ok(")") => Ok(value),
                _ => Err("`)' expected".to_string()),
            };
        }
        if let Some(op) = self.peek().and_then(binary_operator) {
            self.pos += 1;
            let right = self.next()?;
            return self.runner.binary_test(op, token, right);
        }
        if let Some(op) = UnaryTestOperator::from_str(token) {
            if self.pos < self.args.len() {
                let operand = self.next()?;
                return Ok(self.runner.unary_test(op, operand));
            }
        }
        Ok(!token.is_empty())
    }
}

fn parse_expression(runner: &Runner, args: &[String]) -> Result<bool, String> {
    let mut parser = ExprParser { runner, args, pos: 0 };
    let value = parser.parse_or()?;
    match parser.peek() {
        None => Ok(value),
        Some(extra) => Err(format!("{}: unexpected argument", extra)),
    }
}

/// Evaluate `args` (without the closing `]`).
pub(crate) fn evaluate(runner: &Runner, args: &[String]) -> Result<bool, String> {
    match args.len() {
        0 => Ok(false),
        1 => Ok(!args[0].is_empty()),
        2 => {
            if args[0] == "!" {
                return Ok(args[1].is_empty());
            }
            match UnaryTestOperator::from_str(&args[0]) {
                Some(op) => Ok(runner.unary_test(op, &args[1])),
                None => Err(format!("{}: unary operator expected", args[0])),
            }
        }
        3 => {
            if let Some(op) = binary_operator(&args[1]) {
                return runner.binary_test(op, &args[0], &args[2]);
            }
            match (args[0].as_str(), args[1].as_str(), args[2].as_str()) {
                ("!", _, _) => evaluate(runner, &args[1..]).map(|v| !v),
                ("(", inner, ")") => Ok(!inner.is_empty()),
                (left, "-a", right) => Ok(!left.is_empty() && !right.is_empty()),
                (left, "-o", right) => Ok(!left.is_empty() || !right.is_empty()),
                (_, op, _) => Err(format!("{}: binary operator expected", op)),
            }
        }
        4 => {
            if args[0] == "!" {
                return evaluate(runner, &args[1..]).map(|v| !v);
            }
            if args[0] == "(" && args[3] == ")" {
                return evaluate(runner, &args[1..3]);
            }
            parse_expression(runner, args)
        }
        _ => parse_expression(runner, args),
    }
}

fn run_test(runner: &mut Runner, name: &str, args: &[String]) -> ExecResult {
    match evaluate(runner, args) {
        Ok(true) => Ok(0),
        Ok(false) => Ok(1),
        Err(message) => {
            runner.report(format!("{}: {}", name, message));
            Ok(2)
        }
    }
}

pub fn handle_test(runner: &mut Runner, args: &[String]) -> ExecResult {
    run_test(runner, "test", args)
}

pub fn handle_bracket(runner: &mut Runner, args: &[String]) -> ExecResult {
    match args.last() {
        Some(last) if last == "]" => run_test(runner, "[", &args[..args.len() - 1]),
        _ => {
            runner.report("[: missing `]'");
            Ok(2)
        }
    }
}

//! Arithmetic Evaluation
//!
//! Evaluates `$(( ))`, `(( ))`, `let`, C-style `for` headers, array
//! subscripts and integer-attribute assignments over 64-bit signed integers
//! with wrapping overflow, as bash does.
//!
//! Variable values are themselves evaluated: an empty or unset variable is
//! 0, a name is looked up recursively, anything else is parsed as an
//! expression. A value that does not parse is an error, never a silent 0.

use crate::ast::printer::print_arith;
use crate::ast::types::*;
use crate::interpreter::environment::{ElementKey, Value};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::runner::{ExecResult, Runner};
use crate::parser::arithmetic_parser::{parse_arithmetic, parse_number};
use crate::parser::lexer::is_valid_name;

fn arith_error(message: impl Into<String>) -> InterpreterError {
    InterpreterError::Arithmetic(message.into())
}

// ============================================================================
// Operators
// ============================================================================

fn apply_binary_op(left: i64, right: i64, operator: ArithBinaryOperator) -> ExecResult<i64> {
    use ArithBinaryOperator::*;
    let truth = |b: bool| if b { 1 } else { 0 };
    Ok(match operator {
        Add => left.wrapping_add(right),
        Sub => left.wrapping_sub(right),
        Mul => left.wrapping_mul(right),
        Div | Mod if right == 0 => return Err(arith_error("division by 0")),
        Div => left.wrapping_div(right),
        Mod => left.wrapping_rem(right),
        Pow => {
            if right < 0 {
                return Err(arith_error("exponent less than 0"));
            }
            left.wrapping_pow(right.min(u32::MAX as i64) as u32)
        }
        LShift => left.wrapping_shl(right as u32),
        RShift => left.wrapping_shr(right as u32),
        Lt => truth(left < right),
        Le => truth(left <= right),
        Gt => truth(left > right),
        Ge => truth(left >= right),
        Eq => truth(left == right),
        Ne => truth(left != right),
        BitAnd => left & right,
        BitOr => left | right,
        BitXor => left ^ right,
        LogAnd => truth(left != 0 && right != 0),
        LogOr => truth(left != 0 || right != 0),
        Comma => right,
    })
}

fn apply_unary_op(operand: i64, operator: ArithUnaryOperator) -> i64 {
    match operator {
        ArithUnaryOperator::Neg => operand.wrapping_neg(),
        ArithUnaryOperator::Pos => operand,
        ArithUnaryOperator::Not => (operand == 0) as i64,
        ArithUnaryOperator::BitNot => !operand,
    }
}

// ============================================================================
// Evaluation
// ============================================================================

impl Runner {
    pub(crate) fn eval_arith(&mut self, expr: &ArithExpr) -> ExecResult<i64> {
        self.eval_arith_at(expr, 0)
    }

    /// Parse and evaluate arithmetic source text.
    pub(crate) fn eval_arith_text(&mut self, text: &str) -> ExecResult<i64> {
        self.arith_value(text, 0)
    }

    fn check_arith_depth(&self, depth: u32) -> ExecResult<()> {
        if depth > self.limits.max_arith_depth {
            return Err(InterpreterError::Limit("expression recursion level exceeded".to_string()));
        }
        Ok(())
    }

    /// Numeric meaning of a string found in a variable or expansion.
    fn arith_value(&mut self, text: &str, depth: u32) -> ExecResult<i64> {
        self.check_arith_depth(depth)?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        if let Ok(n) = parse_number(trimmed) {
            return Ok(n);
        }
        if is_valid_name(trimmed) {
            return self.arith_variable(trimmed, depth + 1);
        }
        let expr = parse_arithmetic(trimmed)
            .map_err(|e| arith_error(format!("{}: {}", trimmed, e.message)))?;
        self.eval_arith_at(&expr, depth + 1)
    }

    fn arith_variable(&mut self, name: &str, depth: u32) -> ExecResult<i64> {
        match self.get_var(name) {
            Some(value) => self.arith_value(&value, depth),
            None if self.options.nounset => Err(InterpreterError::Nounset(name.to_string())),
            None => Ok(0),
        }
    }

    /// Subscript of `name[index]` inside an arithmetic expression.
    fn arith_key(&mut self, name: &str, index: &ArithExpr, depth: u32) -> ExecResult<ElementKey> {
        if matches!(self.env.value(name, self.limits.max_nameref_depth), Some(Value::Assoc(_))) {
            let key = match index {
                ArithExpr::Expansion(word) => self.expand_word_string(word)?,
                other => print_arith(other),
            };
            return Ok(ElementKey::Key(key));
        }
        let mut i = self.eval_arith_at(index, depth + 1)?;
        if i < 0 {
            let end = match self.env.value(name, self.limits.max_nameref_depth) {
                Some(Value::Indexed(map)) => map.keys().next_back().map_or(0, |k| k + 1),
                Some(Value::Scalar(_)) => 1,
                _ => 0,
            };
            i += end;
            if i < 0 {
                return Err(InterpreterError::Expansion(format!("{}: bad array subscript", name)));
            }
        }
        Ok(ElementKey::Index(i))
    }

    fn read_lvalue(&mut self, target: &ArithLValue, depth: u32) -> ExecResult<(Option<ElementKey>, i64)> {
        match &target.index {
            None => Ok((None, self.arith_variable(&target.name, depth + 1)?)),
            Some(index) => {
                let key = self.arith_key(&target.name, index, depth)?;
                let current = self.element_value(&target.name, &key).unwrap_or_default();
                let value = self.arith_value(&current, depth + 1)?;
                Ok((Some(key), value))
            }
        }
    }

    fn write_lvalue(&mut self, target: &ArithLValue, key: Option<ElementKey>, value: i64) -> ExecResult<()> {
        match key {
            None => self.set_var(&target.name, value.to_string()),
            Some(key) => self
                .env
                .set_element(&target.name, key, value.to_string(), self.limits.max_nameref_depth)
                .map_err(InterpreterError::Runtime),
        }
    }

    fn eval_arith_at(&mut self, expr: &ArithExpr, depth: u32) -> ExecResult<i64> {
        self.check_arith_depth(depth)?;
        match expr {
            ArithExpr::Number(n) => Ok(*n),
            ArithExpr::Variable(name) => self.arith_variable(name, depth + 1),
            ArithExpr::Element { name, index } => {
                let key = self.arith_key(name, index, depth)?;
                match self.element_value(name, &key) {
                    Some(value) => self.arith_value(&value, depth + 1),
                    None => Ok(0),
                }
            }
            ArithExpr::Expansion(word) => {
                let text = self.expand_word_string(word)?;
                self.arith_value(&text, depth + 1)
            }
            ArithExpr::Group(inner) => self.eval_arith_at(inner, depth + 1),
            ArithExpr::Unary { operator, operand } => {
                let value = self.eval_arith_at(operand, depth + 1)?;
                Ok(apply_unary_op(value, *operator))
            }
            ArithExpr::Binary { operator: ArithBinaryOperator::LogAnd, left, right } => {
                if self.eval_arith_at(left, depth + 1)? == 0 {
                    return Ok(0);
                }
                Ok((self.eval_arith_at(right, depth + 1)? != 0) as i64)
            }
            ArithExpr::Binary { operator: ArithBinaryOperator::LogOr, left, right } => {
                if self.eval_arith_at(left, depth + 1)? != 0 {
                    return Ok(1);
                }
                Ok((self.eval_arith_at(right, depth + 1)? != 0) as i64)
            }
            ArithExpr::Binary { operator, left, right } => {
                let left = self.eval_arith_at(left, depth + 1)?;
                let right = self.eval_arith_at(right, depth + 1)?;
                apply_binary_op(left, right, *operator)
            }
            ArithExpr::Ternary { condition, consequent, alternate } => {
                if self.eval_arith_at(condition, depth + 1)? != 0 {
                    self.eval_arith_at(consequent, depth + 1)
                } else {
                    self.eval_arith_at(alternate, depth + 1)
                }
            }
            ArithExpr::Update { increment, prefix, target } => {
                let (key, old) = self.read_lvalue(target, depth)?;
                let new = if *increment { old.wrapping_add(1) } else { old.wrapping_sub(1) };
                self.write_lvalue(target, key, new)?;
                Ok(if *prefix { new } else { old })
            }
            ArithExpr::Assign { operator, target, value } => {
                let rhs = self.eval_arith_at(value, depth + 1)?;
                let (key, result) = match operator.binary() {
                    None => {
                        let key = match &target.index {
                            Some(index) => Some(self.arith_key(&target.name, index, depth)?),
                            None => None,
                        };
                        (key, rhs)
                    }
                    Some(op) => {
                        let (key, current) = self.read_lvalue(target, depth)?;
                        (key, apply_binary_op(current, rhs, op)?)
                    }
                };
                self.write_lvalue(target, key, result)?;
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::environment::Environment;

    fn eval(runner: &mut Runner, text: &str) -> ExecResult<i64> {
        runner.eval_arith_text(text)
    }

    fn runner() -> Runner {
        Runner::new(Environment::new(), std::env::temp_dir())
    }

    #[test]
    fn test_precedence() {
        let mut r = runner();
        assert_eq!(eval(&mut r, "2 + 3 * 4").unwrap(), 14);
        assert_eq!(eval(&mut r, "2 ** 3 ** 2").unwrap(), 512);
        assert_eq!(eval(&mut r, "(2 + 3) * 4").unwrap(), 20);
        assert_eq!(eval(&mut r, "1 ? 2 : 3").unwrap(), 2);
        assert_eq!(eval(&mut r, "7 % 3 == 1 && 2 > 1").unwrap(), 1);
    }

    #[test]
    fn test_variables_recurse() {
        let mut r = runner();
        r.set_var("a", "b").unwrap();
        r.set_var("b", "3 + 4").unwrap();
        assert_eq!(eval(&mut r, "a * 2").unwrap(), 14);
        assert_eq!(eval(&mut r, "unset_var + 1").unwrap(), 1);
    }

    #[test]
    fn test_assignment_and_update() {
        let mut r = runner();
        assert_eq!(eval(&mut r, "x = 5").unwrap(), 5);
        assert_eq!(eval(&mut r, "x += 2").unwrap(), 7);
        assert_eq!(eval(&mut r, "x++").unwrap(), 7);
        assert_eq!(eval(&mut r, "++x").unwrap(), 9);
        assert_eq!(r.get_var("x").as_deref(), Some("9"));
        eval(&mut r, "arr[2] = 4").unwrap();
        assert_eq!(eval(&mut r, "arr[2] * 2").unwrap(), 8);
    }

    #[test]
    fn test_errors() {
        let mut r = runner();
        assert_eq!(eval(&mut r, "1 / 0").unwrap_err().to_string(), "division by 0");
        assert!(eval(&mut r, "2 ** -1").is_err());
        r.set_var("bad", "1 +").unwrap();
        assert!(matches!(eval(&mut r, "bad"), Err(InterpreterError::Arithmetic(_))));
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let mut r = runner();
        r.set_var("loop", "loop").unwrap();
        assert!(matches!(eval(&mut r, "loop"), Err(InterpreterError::Limit(_))));
    }

    #[test]
    fn test_wrapping_and_short_circuit() {
        let mut r = runner();
        assert_eq!(eval(&mut r, "9223372036854775807 + 1").unwrap(), i64::MIN);
        assert_eq!(eval(&mut r, "0 && (y = 1)").unwrap(), 0);
        assert_eq!(r.get_var("y"), None);
        assert_eq!(eval(&mut r, "0x10 + 010 + 2#101").unwrap(), 16 + 8 + 5);
    }
}

//! printf - Formatted output builtin
//!
//! printf [-v var] format [arguments]
//!
//! The format is reused until every argument has been consumed; missing
//! arguments read as an empty string or zero. Conversions: %s %b %q %c
//! %d %i %u %o %x %X %e %E %f %F %g %G and %%, with flags `-+ #0`, a
//! width and a precision (either may be `*`).

use super::echo_cmd::decode_echo_escapes;
use super::{fail, write_stdout};
use crate::ast::printer::quote_single;
use crate::interpreter::runner::{ExecResult, Runner};
use crate::parser::lexer::is_valid_name;

#[derive(Debug, Default, Clone)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    alternate: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

/// Argument cursor shared across passes over the format.
struct Args<'a> {
    values: &'a [String],
    next: usize,
    errors: Vec<String>,
}

impl<'a> Args<'a> {
    fn take(&mut self) -> Option<&'a str> {
        let value = self.values.get(self.next).map(String::as_str);
        if value.is_some() {
            self.next += 1;
        }
        value
    }

    fn text(&mut self) -> &'a str {
        self.take().unwrap_or("")
    }

    fn integer(&mut self) -> i64 {
        let Some(text) = self.take() else {
            return 0;
        };
        match parse_integer(text) {
            Some(n) => n,
            None => {
                self.errors.push(format!("{}: invalid number", text));
                leading_integer(text)
            }
        }
    }

    fn float(&mut self) -> f64 {
        let Some(text) = self.take() else {
            return 0.0;
        };
        if let Some(c) = quoted_char(text) {
            return c as u32 as f64;
        }
        match text.trim().parse::<f64>() {
            Ok(v) => v,
            Err(_) => match parse_integer(text) {
                Some(n) => n as f64,
                None => {
                    self.errors.push(format!("{}: invalid number", text));
                    0.0
                }
            },
        }
    }
}

/// `'c` and `"c` stand for the character code of c.
fn quoted_char(text: &str) -> Option<char> {
    let rest = text.strip_prefix('\'').or_else(|| text.strip_prefix('"'))?;
    Some(rest.chars().next().unwrap_or('\0'))
}

fn parse_integer(text: &str) -> Option<i64> {
    if let Some(c) = quoted_char(text) {
        return Some(c as i64);
    }
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        u64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<u64>().ok()?
    };
    let value = magnitude as i64;
    Some(if negative { value.wrapping_neg() } else { value })
}

/// Value of the leading digits of an invalid number, as printf reports it.
fn leading_integer(text: &str) -> i64 {
    let trimmed = text.trim();
    let end = trimmed
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed[..end].parse().unwrap_or(0)
}

/// Backslash escapes allowed in the format string itself.
fn format_escape(chars: &[char], i: usize, out: &mut String) -> usize {
    let Some(&c) = chars.get(i + 1) else {
        out.push('\\');
        return 1;
    };
    match c {
        '0'..='7' => {
            let start = if c == '0' { i + 2 } else { i + 1 };
            let mut value = 0u32;
            let mut len = 0;
            while len < 3 {
                match chars.get(start + len).and_then(|d| d.to_digit(8)) {
                    Some(d) => {
                        value = value * 8 + d;
                        len += 1;
                    }
                    None => break,
                }
            }
            out.push(char::from_u32(value & 0xff).unwrap_or('\0'));
            start + len - i
        }
        _ => {
            // Everything else decodes like echo -e.
            let mut end = i + 2;
            if matches!(c, 'x' | 'u' | 'U') {
                let max = match c {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                while end < chars.len() && end < i + 2 + max && chars[end].is_ascii_hexdigit() {
                    end += 1;
                }
            }
            let text: String = chars[i..end].iter().collect();
            out.push_str(&decode_echo_escapes(&text).0);
            end - i
        }
    }
}

fn pad(text: String, spec: &Spec, zero_ok: bool) -> String {
    let len = text.chars().count();
    let Some(width) = spec.width.filter(|w| *w > len) else {
        return text;
    };
    let fill = width - len;
    if spec.left {
        return format!("{}{}", text, " ".repeat(fill));
    }
    if spec.zero && zero_ok {
        let sign_len = text
            .find(|c: char| !matches!(c, '-' | '+' | ' '))
            .unwrap_or(0);
        let (sign, digits) = text.split_at(sign_len);
        let (prefix, digits) = match digits.get(..2) {
            Some("0x") | Some("0X") => digits.split_at(2),
            _ => ("", digits),
        };
        return format!("{}{}{}{}", sign, prefix, "0".repeat(fill), digits);
    }
    format!("{}{}", " ".repeat(fill), text)
}

fn sign_prefix(spec: &Spec, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn format_signed(spec: &Spec, value: i64) -> String {
    let mut digits = value.unsigned_abs().to_string();
    if let Some(p) = spec.precision {
        if digits.len() < p {
            digits = format!("{}{}", "0".repeat(p - digits.len()), digits);
        }
        if p == 0 && value == 0 {
            digits.clear();
        }
    }
    let text = format!("{}{}", sign_prefix(spec, value < 0), digits);
    pad(text, spec, spec.precision.is_none())
}

fn format_unsigned(spec: &Spec, value: i64) -> String {
    let value = value as u64;
    let mut digits = match spec.conversion {
        'o' => format!("{:o}", value),
        'x' => format!("{:x}", value),
        'X' => format!("{:X}", value),
        _ => value.to_string(),
    };
    if let Some(p) = spec.precision {
        if digits.len() < p {
            digits = format!("{}{}", "0".repeat(p - digits.len()), digits);
        }
    }
    if spec.alternate && value != 0 {
        match spec.conversion {
            'o' if !digits.starts_with('0') => digits.insert(0, '0'),
            'x' => digits.insert_str(0, "0x"),
            'X' => digits.insert_str(0, "0X"),
            _ => {}
        }
    }
    pad(digits, spec, spec.precision.is_none())
}

/// C-style exponent form: `1.500000e+02`.
fn exponent_form(value: f64, precision: usize, upper: bool) -> String {
    let text = format!("{:.*e}", precision, value);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let result = format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    if upper {
        result.to_uppercase()
    } else {
        result
    }
}

fn strip_fraction_zeros(text: &str) -> String {
    let (number, suffix) = match text.find(['e', 'E']) {
        Some(i) => text.split_at(i),
        None => (text, ""),
    };
    let number = if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    };
    format!("{}{}", number, suffix)
}

fn format_float(spec: &Spec, value: f64) -> String {
    let upper = spec.conversion.is_ascii_uppercase();
    if !value.is_finite() {
        let text = if value.is_nan() { "nan".to_string() } else { "inf".to_string() };
        let text = format!("{}{}", sign_prefix(spec, value.is_sign_negative()), text);
        return pad(if upper { text.to_uppercase() } else { text }, spec, false);
    }
    let precision = spec.precision.unwrap_or(6);
    let magnitude = value.abs();
    let body = match spec.conversion.to_ascii_lowercase() {
        'e' => exponent_form(magnitude, precision, upper),
        'g' => {
            let p = precision.max(1);
            let scientific = format!("{:.*e}", p - 1, magnitude);
            let exponent: i32 = scientific.split_once('e').and_then(|(_, e)| e.parse().ok()).unwrap_or(0);
            let text = if exponent < -4 || exponent >= p as i32 {
                exponent_form(magnitude, p - 1, upper)
            } else {
                format!("{:.*}", (p as i32 - 1 - exponent).max(0) as usize, magnitude)
            };
            if spec.alternate {
                text
            } else {
                strip_fraction_zeros(&text)
            }
        }
        _ => format!("{:.*}", precision, magnitude),
    };
    let text = format!("{}{}", sign_prefix(spec, value.is_sign_negative() && value != 0.0), body);
    pad(text, spec, true)
}

/// Widths and precisions above this are rejected rather than allocated.
const MAX_FIELD: usize = 1 << 24;

fn field_size(value: Option<usize>, text: &str) -> Result<usize, String> {
    match value {
        Some(n) if n <= MAX_FIELD => Ok(n),
        _ => Err(format!("{}: field width or precision too large", text)),
    }
}

fn digits_at(chars: &[char], mut i: usize) -> (String, usize) {
    let start = i;
    while chars.get(i).map_or(false, char::is_ascii_digit) {
        i += 1;
    }
    (chars[start..i].iter().collect(), i)
}

/// Parse a conversion starting after `%`. Returns the spec and the index
/// just past the conversion character.
fn parse_spec(chars: &[char], mut i: usize, args: &mut Args<'_>) -> Result<(Spec, usize), String> {
    let mut spec = Spec::default();
    while let Some(&c) = chars.get(i) {
        match c {
            '-' => spec.left = true,
            '+' => spec.plus = true,
            ' ' => spec.space = true,
            '#' => spec.alternate = true,
            '0' => spec.zero = true,
            _ => break,
        }
        i += 1;
    }
    if chars.get(i) == Some(&'*') {
        let width = args.integer();
        if width < 0 {
            spec.left = true;
        }
        let size = usize::try_from(width.unsigned_abs()).ok();
        spec.width = Some(field_size(size, &width.to_string())?);
        i += 1;
    } else {
        let (digits, next) = digits_at(chars, i);
        if next > i {
            spec.width = Some(field_size(digits.parse().ok(), &digits)?);
        }
        i = next;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        if chars.get(i) == Some(&'*') {
            let precision = args.integer().max(0);
            spec.precision = Some(field_size(usize::try_from(precision).ok(), &precision.to_string())?);
            i += 1;
        } else {
            let (digits, next) = digits_at(chars, i);
            let precision = if digits.is_empty() { Some(0) } else { digits.parse().ok() };
            spec.precision = Some(field_size(precision, &digits)?);
            i = next;
        }
    }
    // Length modifiers are accepted and ignored.
    while matches!(chars.get(i), Some('h' | 'l' | 'L' | 'j' | 'z' | 't')) {
        i += 1;
    }
    let Some(&conversion) = chars.get(i) else {
        return Err("missing format character".to_string());
    };
    spec.conversion = conversion;
    Ok((spec, i + 1))
}

/// Render the format once. Returns false when `\c` stopped all output.
fn render(format: &[char], args: &mut Args<'_>, out: &mut String) -> Result<bool, String> {
    let mut i = 0;
    while i < format.len() {
        match format[i] {
            '\\' => {
                if format.get(i + 1) == Some(&'c') {
                    return Ok(false);
                }
                i += format_escape(format, i, out);
            }
            '%' if format.get(i + 1) == Some(&'%') => {
                out.push('%');
                i += 2;
            }
            '%' => {
                let (spec, next) = parse_spec(format, i + 1, args)?;
                i = next;
                match spec.conversion {
                    's' => {
                        let mut text = args.text().to_string();
                        if let Some(p) = spec.precision {
                            text = text.chars().take(p).collect();
                        }
                        out.push_str(&pad(text, &spec, false));
                    }
                    'b' => {
                        let (text, stop) = decode_echo_escapes(args.text());
                        out.push_str(&pad(text, &spec, false));
                        if stop {
                            return Ok(false);
                        }
                    }
                    'q' => {
                        let text = args.text();
                        let quoted = if !text.is_empty()
                            && text.chars().all(|c| c.is_ascii_alphanumeric() || "-_./,:@%+=".contains(c))
                        {
                            text.to_string()
                        } else {
                            quote_single(text)
                        };
                        out.push_str(&pad(quoted, &spec, false));
                    }
                    'c' => {
                        let text: String = args.text().chars().take(1).collect();
                        out.push_str(&pad(text, &spec, false));
                    }
                    'd' | 'i' => out.push_str(&format_signed(&spec, args.integer())),
                    'u' | 'o' | 'x' | 'X' => out.push_str(&format_unsigned(&spec, args.integer())),
                    'e' | 'E' | 'f' | 'F' | 'g' | 'G' => out.push_str(&format_float(&spec, args.float())),
                    other => return Err(format!("%{}: invalid format character", other)),
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(true)
}

/// Format `format` with `arguments`, reusing the format while arguments
/// remain. Conversion errors are collected rather than fatal.
pub(crate) fn format_printf(format: &str, arguments: &[String]) -> (String, Vec<String>) {
    let chars: Vec<char> = format.chars().collect();
    let mut args = Args { values: arguments, next: 0, errors: Vec::new() };
    let mut out = String::new();
    loop {
        let before = args.next;
        match render(&chars, &mut args, &mut out) {
            Ok(true) => {}
            Ok(false) => break,
            Err(message) => {
                args.errors.push(message);
                break;
            }
        }
        if args.next == before || args.next >= arguments.len() {
            break;
        }
    }
    (out, args.errors)
}

pub fn handle_printf(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut target = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-v" => {
                let Some(name) = args.get(i + 1) else {
                    return fail(runner, "printf", "-v: option requires an argument", 2);
                };
                let base = name.split('[').next().unwrap_or(name);
                if !is_valid_name(base) {
                    return fail(runner, "printf", format!("`{}': not a valid identifier", name), 2);
                }
                target = Some(name.clone());
                i += 2;
            }
            "--" => {
                i += 1;
                break;
            }
            _ => break,
        }
    }
    let Some(format) = args.get(i) else {
        return fail(runner, "printf", "usage: printf [-v var] format [arguments]", 2);
    };

    let (output, errors) = format_printf(format, &args[i + 1..]);
    for error in &errors {
        runner.report(format!("printf: {}", error));
    }
    let status = if errors.is_empty() { 0 } else { 1 };

    match target {
        Some(name) => {
            match name.split_once('[') {
                Some((base, rest)) => {
                    let index = crate::ast::types::WordNode::literal(rest.trim_end_matches(']'));
                    let key = runner.element_key(base, &index)?;
                    runner
                        .env
                        .set_element(base, key, output, runner.limits.max_nameref_depth)
                        .map_err(crate::interpreter::errors::InterpreterError::Runtime)?;
                }
                None => runner.set_var(&name, output)?,
            }
            Ok(status)
        }
        None => match write_stdout(runner, "printf", &output)? {
            0 => Ok(status),
            failed => Ok(failed),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;

    fn fmt(format: &str, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        format_printf(format, &args).0
    }

    #[test]
    fn test_basic_conversions() {
        assert_eq!(fmt("Hello %s", &["world"]), "Hello world");
        assert_eq!(fmt("%d|%i", &["42", "-7"]), "42|-7");
        assert_eq!(fmt("%x %X %o %#x", &["255", "255", "8", "255"]), "ff FF 10 0xff");
        assert_eq!(fmt("100%%", &[]), "100%");
        assert_eq!(fmt("%c", &["xyz"]), "x");
        assert_eq!(fmt("%d", &["'A"]), "65");
    }

    #[test]
    fn test_width_and_precision() {
        assert_eq!(fmt("%5s|%-5s|", &["ab", "cd"]), "   ab|cd   |");
        assert_eq!(fmt("%05d", &["42"]), "00042");
        assert_eq!(fmt("%05d", &["-42"]), "-0042");
        assert_eq!(fmt("%+d", &["5"]), "+5");
        assert_eq!(fmt("%.3d", &["7"]), "007");
        assert_eq!(fmt("%.2s", &["abcdef"]), "ab");
        assert_eq!(fmt("%*d|%-*d|", &["4", "1", "3", "2"]), "   1|2  |");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt("%f", &["3.14"]), "3.140000");
        assert_eq!(fmt("%.2f", &["3.14159"]), "3.14");
        assert_eq!(fmt("%e", &["150"]), "1.500000e+02");
        assert_eq!(fmt("%g %g %g", &["0.0001", "123456", "1234567"]), "0.0001 123456 1.23457e+06");
        assert_eq!(fmt("%8.3f|", &["-1.5"]), "  -1.500|");
    }

    #[test]
    fn test_format_reuse_and_missing_args() {
        assert_eq!(fmt("%s=%s\n", &["a", "1", "b"]), "a=1\nb=\n");
        assert_eq!(fmt("%s %s", &["only"]), "only ");
        assert_eq!(fmt("[%d]", &[]), "[0]");
    }

    #[test]
    fn test_escapes() {
        assert_eq!(fmt("a\\tb\\n", &[]), "a\tb\n");
        assert_eq!(fmt("\\101\\x42\\0103", &[]), "ABC");
        assert_eq!(fmt("%b", &["x\\ny"]), "x\ny");
        assert_eq!(fmt("%b|%s", &["stop\\cnow", "never"]), "stop");
        assert_eq!(fmt("%q", &["a b"]), "'a b'");
    }

    #[test]
    fn test_invalid_number() {
        let (out, errors) = format_printf("%d", &["12abc".to_string()]);
        assert_eq!(out, "12");
        assert_eq!(errors, vec!["12abc: invalid number"]);
        let (_, out, err) = run("printf '%d\\n' nope; echo $?");
        assert_eq!(out, "0\n1\n");
        assert!(err.contains("printf: nope: invalid number"));
    }

    #[test]
    fn test_quoted_conversion() {
        assert_eq!(fmt("%q|%q|%lq", &["plain-word", "it's", "x y"]), "plain-word|$'it\\'s'|'x y'");
        assert_eq!(run("printf '%q\\n' 'a b'"), (0, "'a b'\n".to_string(), String::new()));
    }

    #[test]
    fn test_oversized_field_is_an_error() {
        let (out, errors) = format_printf("%*d|", &["99999999999".to_string(), "1".to_string()]);
        assert_eq!(out, "");
        assert_eq!(errors, vec!["99999999999: field width or precision too large"]);
        let (_, errors) = format_printf("%.99999999999999999999f", &["1".to_string()]);
        assert_eq!(errors.len(), 1);
        let (status, out, err) = run("printf '%*d|\\n' 99999999999 1; echo $?");
        assert_eq!((status, out.as_str()), (0, "1\n"));
        assert!(err.contains("printf: 99999999999: field width or precision too large"));
    }

    #[test]
    fn test_printf_v() {
        assert_eq!(run("printf -v out '%03d' 7; echo $out").1, "007\n");
        assert_eq!(run("printf -v 'arr[2]' %s x; echo ${arr[2]}").1, "x\n");
        assert_eq!(run("printf; echo $?").1, "2\n");
    }
}

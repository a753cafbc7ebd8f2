//! echo - Write arguments builtin
//!
//! echo [-neE] [arg ...]
//!
//! -n suppresses the trailing newline, -e enables backslash escapes and
//! -E disables them (the default). Option parsing stops at the first
//! argument that is not made only of those letters.

use super::write_stdout;
use crate::interpreter::runner::{ExecResult, Runner};

fn take_digits(chars: &[char], start: usize, max: usize, radix: u32) -> (u32, usize) {
    let mut value = 0u32;
    let mut len = 0;
    while len < max {
        match chars.get(start + len).and_then(|c| c.to_digit(radix)) {
            Some(d) => {
                value = value * radix + d;
                len += 1;
            }
            None => break,
        }
    }
    (value, len)
}

/// Interpret echo-style backslash escapes. The flag is true when `\c`
/// asked for all further output to be dropped.
pub(crate) fn decode_echo_escapes(text: &str) -> (String, bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let c = chars[i + 1];
        i += 2;
        match c {
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'c' => return (out, true),
            'e' | 'E' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            '0' => {
                let (value, len) = take_digits(&chars, i, 3, 8);
                i += len;
                out.push(char::from_u32(value).unwrap_or('\0'));
            }
            'x' => {
                let (value, len) = take_digits(&chars, i, 2, 16);
                if len == 0 {
                    out.push_str("\\x");
                } else {
                    i += len;
                    out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                }
            }
            'u' | 'U' => {
                let max = if c == 'u' { 4 } else { 8 };
                let (value, len) = take_digits(&chars, i, max, 16);
                if len == 0 {
                    out.push('\\');
                    out.push(c);
                } else {
                    i += len;
                    out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    (out, false)
}

fn is_option(arg: &str) -> bool {
    arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| matches!(c, 'n' | 'e' | 'E'))
}

pub fn handle_echo(runner: &mut Runner, args: &[String]) -> ExecResult {
    let mut newline = true;
    let mut escapes = false;
    let mut i = 0;
    while i < args.len() && is_option(&args[i]) {
        for c in args[i][1..].chars() {
            match c {
                'n' => newline = false,
                'e' => escapes = true,
                _ => escapes = false,
            }
        }
        i += 1;
    }

    let mut output = args[i..].join(" ");
    if escapes {
        let (decoded, stop) = decode_echo_escapes(&output);
        output = decoded;
        if stop {
            newline = false;
        }
    }
    if newline {
        output.push('\n');
    }
    write_stdout(runner, "echo", &output)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run;
    use super::*;

    #[test]
    fn test_decode_echo_escapes() {
        assert_eq!(decode_echo_escapes("a\\tb\\n"), ("a\tb\n".to_string(), false));
        assert_eq!(decode_echo_escapes("\\0101\\x42\\u00e9"), ("ABé".to_string(), false));
        assert_eq!(decode_echo_escapes("keep\\cdrop"), ("keep".to_string(), true));
        assert_eq!(decode_echo_escapes("\\q\\"), ("\\q\\".to_string(), false));
    }

    #[test]
    fn test_echo_options() {
        assert_eq!(run("echo a b").1, "a b\n");
        assert_eq!(run("echo -n a").1, "a");
        assert_eq!(run("echo -e 'x\\ty'").1, "x\ty\n");
        assert_eq!(run("echo 'x\\ty'").1, "x\\ty\n");
        assert_eq!(run("echo -eE 'x\\ty'").1, "x\\ty\n");
        assert_eq!(run("echo -nx").1, "-nx\n");
        assert_eq!(run("echo -- a").1, "-- a\n");
        assert_eq!(run("echo -e 'a\\cb'; echo c").1, "ac\n");
    }

    #[test]
    fn test_echo_empty() {
        assert_eq!(run("echo").1, "\n");
        assert_eq!(run("echo ''").1, "\n");
    }
}

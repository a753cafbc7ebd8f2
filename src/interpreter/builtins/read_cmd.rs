//! read - Read a line of input builtin
//!
//! Supports:
//! - read VAR... - split the line on IFS; the last name takes the rest
//! - read - line goes to REPLY unsplit
//! - read -r - raw mode (no backslash escaping)
//! - read -d DELIM - stop at DELIM instead of newline ('' means NUL)
//! - read -n N - read at most N characters
//! - read -a ARRAY - read fields into an indexed array
//! - read -p PROMPT - prompt on stderr when input is a terminal
//! - read -u FD - read from file descriptor
//! - read -s / -t - accepted and ignored
//!
//! Input is consumed one byte at a time so the rest of the stream is left
//! for the next command.

use std::collections::BTreeMap;

use super::fail;
use crate::interpreter::environment::Value;
use crate::interpreter::errors::io_message;
use crate::interpreter::expansion::word_split::split_for_read;
use crate::interpreter::io::InputStream;
use crate::interpreter::runner::{ExecResult, Runner};
use crate::parser::lexer::is_valid_name;

struct Options {
    raw: bool,
    delimiter: u8,
    max_chars: Option<usize>,
    array: Option<String>,
    prompt: Option<String>,
    fd: u32,
}

/// Parse options; returns the index of the first name.
fn parse_options(args: &[String]) -> Result<(Options, usize), (String, i32)> {
    let mut options = Options { raw: false, delimiter: b'\n', max_chars: None, array: None, prompt: None, fd: 0 };
    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "--" {
            return Ok((options, i + 1));
        }
        if arg.len() < 2 || !arg.starts_with('-') {
            break;
        }
        let letters: Vec<char> = arg[1..].chars().collect();
        for (pos, &c) in letters.iter().enumerate() {
            match c {
                'r' => options.raw = true,
                's' => {}
                'd' | 'n' | 'a' | 'p' | 'u' | 't' => {
                    // The value is the rest of this word or the next word.
                    let inline: String = letters[pos + 1..].iter().collect();
                    let value = if !inline.is_empty() {
                        inline
                    } else {
                        i += 1;
                        match args.get(i) {
                            Some(v) => v.clone(),
                            None => return Err((format!("-{}: option requires an argument", c), 2)),
                        }
                    };
                    match c {
                        'd' => options.delimiter = value.bytes().next().unwrap_or(0),
                        'n' => match value.parse::<usize>() {
                            Ok(n) => options.max_chars = Some(n),
                            Err(_) => return Err((format!("{}: invalid number", value), 1)),
                        },
                        'a' => options.array = Some(value),
                        'p' => options.prompt = Some(value),
                        'u' => match value.parse::<u32>() {
                            Ok(fd) => options.fd = fd,
                            Err(_) => return Err((format!("{}: invalid file descriptor specification", value), 1)),
                        },
                        _ => {}
                    }
                    break;
                }
                _ => return Err((format!("-{}: invalid option", c), 2)),
            }
        }
        i += 1;
    }
    Ok((options, i))
}

/// Read up to the delimiter. Returns the text and whether the delimiter
/// (or the character limit) was reached before end of input.
fn read_record(input: &InputStream, options: &Options) -> std::io::Result<(String, bool)> {
    let mut bytes = Vec::new();
    let mut chars = 0;
    loop {
        if options.max_chars.map_or(false, |max| chars >= max) {
            return Ok((String::from_utf8_lossy(&bytes).into_owned(), true));
        }
        let Some(byte) = input.read_byte()? else {
            return Ok((String::from_utf8_lossy(&bytes).into_owned(), false));
        };
        if byte == options.delimiter {
            return Ok((String::from_utf8_lossy(&bytes).into_owned(), true));
        }
        if byte == b'\\' && !options.raw {
            match input.read_byte()? {
                // Line continuation
                Some(b'\n') => continue,
                Some(next) => {
                    bytes.push(next);
                    chars += 1;
                    continue;
                }
                None => return Ok((String::from_utf8_lossy(&bytes).into_owned(), false)),
            }
        }
        bytes.push(byte);
        // Count characters, not UTF-8 continuation bytes.
        if byte & 0xC0 != 0x80 {
            chars += 1;
        }
    }
}

pub fn handle_read(runner: &mut Runner, args: &[String]) -> ExecResult {
    let (options, first_name) = match parse_options(args) {
        Ok(parsed) => parsed,
        Err((message, status)) => return fail(runner, "read", message, status),
    };
    let names = &args[first_name..];
    for name in names.iter().chain(options.array.iter()) {
        if !is_valid_name(name) {
            return fail(runner, "read", format!("`{}': not a valid identifier", name), 1);
        }
    }
    if options.fd != 0 && runner.io.get(options.fd).is_none() {
        return fail(runner, "read", format!("{}: invalid file descriptor: Bad file descriptor", options.fd), 1);
    }

    if let Some(prompt) = &options.prompt {
        if runner.is_terminal(&options.fd.to_string()) {
            let _ = runner.write_err(prompt);
        }
    }

    let input = runner.io.input(options.fd);
    let (line, complete) = match read_record(&input, &options) {
        Ok(record) => record,
        Err(e) => return fail(runner, "read", format!("read error: {}", io_message(&e)), 1),
    };
    let status = if complete { 0 } else { 1 };
    if !complete && line.is_empty() && names.is_empty() && options.array.is_none() {
        runner.set_var("REPLY", "")?;
        return Ok(1);
    }

    let ifs = runner.ifs();
    if let Some(array) = &options.array {
        let fields = split_for_read(&line, &ifs, 0);
        let map: BTreeMap<i64, String> = fields.into_iter().enumerate().map(|(i, f)| (i as i64, f)).collect();
        runner.set_value(array, Value::Indexed(map))?;
        return Ok(status);
    }
    if names.is_empty() {
        runner.set_var("REPLY", line)?;
        return Ok(status);
    }
    let mut fields = split_for_read(&line, &ifs, names.len()).into_iter();
    for name in names {
        runner.set_var(name, fields.next().unwrap_or_default())?;
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::run_in;

    fn read_with(stdin: &str, script: &str) -> String {
        run_in(&std::env::temp_dir(), stdin, script).1
    }

    #[test]
    fn test_read_fields() {
        assert_eq!(read_with("a b c\n", "read x y; echo \"$x|$y\""), "a|b c\n");
        assert_eq!(read_with("  lead  \n", "read x; echo \"[$x]\""), "[lead]\n");
        assert_eq!(read_with("one\n", "read x y; echo \"[$x][$y]\""), "[one][]\n");
    }

    #[test]
    fn test_read_reply_keeps_whitespace() {
        assert_eq!(read_with("  spaced  \n", "read; echo \"[$REPLY]\""), "[  spaced  ]\n");
    }

    #[test]
    fn test_read_backslashes() {
        assert_eq!(read_with("a\\ b\n", "read x; echo \"$x\""), "a b\n");
        assert_eq!(read_with("a\\ b\n", "read -r x; echo \"$x\""), "a\\ b\n");
        assert_eq!(read_with("one \\\ntwo\n", "read x; echo \"$x\""), "one two\n");
    }

    #[test]
    fn test_read_eof_status() {
        assert_eq!(read_with("", "read x; echo $?"), "1\n");
        assert_eq!(read_with("partial", "read x; echo $? $x"), "1 partial\n");
    }

    #[test]
    fn test_read_loop() {
        assert_eq!(read_with("1\n2\n3\n", "while read n; do echo \"<$n>\"; done"), "<1>\n<2>\n<3>\n");
    }

    #[test]
    fn test_read_options() {
        assert_eq!(read_with("a,b;rest", "IFS=, read -d ';' x y; echo $x $y"), "a b\n");
        assert_eq!(read_with("abcdef", "read -n 3 x; echo $x"), "abc\n");
        assert_eq!(read_with("p q r\n", "read -a arr; echo ${#arr[@]} ${arr[2]}"), "3 r\n");
        assert_eq!(read_with("x\n", "read -p 'prompt> ' v; echo $v"), "x\n");
    }

    #[test]
    fn test_read_from_here_string_and_fd() {
        assert_eq!(read_with("", "read a b <<< 'left right'; echo $b"), "right\n");
        assert_eq!(read_with("", "read -u 3 v 3<<< fdline; echo $v"), "fdline\n");
    }

    #[test]
    fn test_read_invalid_name() {
        let (_, out, err) = run_in(&std::env::temp_dir(), "x\n", "read 1bad; echo $?");
        assert_eq!(out, "1\n");
        assert!(err.contains("`1bad': not a valid identifier"));
    }
}

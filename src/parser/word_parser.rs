//! Word Parser
//!
//! Turns the raw text of a word token into structured `WordPart`s: quoting,
//! parameter expansion, command and arithmetic substitution, tilde prefixes,
//! brace expansion and extended-glob groups.

use crate::ast::types::*;
use crate::parser::arithmetic_parser::parse_arithmetic;
use crate::parser::lexer::{is_valid_name, skip_construct, skip_param, Construct};
use crate::parser::parser::Parser;
use crate::parser::types::ParseException;

/// Which word-level features are active for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordMode {
    pub brace: bool,
    pub tilde: bool,
    /// Tilde also expands after `:` (assignment values)
    pub assignment: bool,
    /// Text lives inside `"${x:-...}"`: single quotes are literal
    pub in_dquote: bool,
}

impl WordMode {
    pub const NORMAL: Self = Self { brace: true, tilde: true, assignment: false, in_dquote: false };
    pub const ASSIGNMENT: Self = Self { brace: false, tilde: true, assignment: true, in_dquote: false };
    /// Patterns, subscripts and operator words
    pub const PLAIN: Self = Self { brace: false, tilde: false, assignment: false, in_dquote: false };
    pub const DQUOTE_WORD: Self = Self { brace: false, tilde: false, assignment: false, in_dquote: true };
}

/// Parse a word with the normal set of features.
pub fn parse_word(raw: &str) -> Result<WordNode, ParseException> {
    parse_word_with(raw, WordMode::NORMAL, 1, 1)
}

/// Parse a word, attributing errors to `line`/`column`.
pub fn parse_word_with(raw: &str, mode: WordMode, line: usize, column: usize) -> Result<WordNode, ParseException> {
    let mut parser = WordParser::new(raw, mode, line, column);
    let parts = parser.parse_unquoted()?;
    Ok(WordNode::new(parts))
}

/// Parse an unquoted here-document body: expansions apply, quotes do not.
pub fn parse_heredoc_body(body: &str, line: usize, column: usize) -> Result<WordNode, ParseException> {
    let mut parser = WordParser::new(body, WordMode::PLAIN, line, column);
    let parts = parser.parse_double_quoted(true)?;
    Ok(WordNode::new(parts))
}

struct WordParser {
    chars: Vec<char>,
    pos: usize,
    mode: WordMode,
    line: usize,
    column: usize,
}

fn flush(lit: &mut String, parts: &mut Vec<WordPart>) {
    if !lit.is_empty() {
        parts.push(WordPart::Literal(std::mem::take(lit)));
    }
}

fn is_tilde_user_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

impl WordParser {
    fn new(raw: &str, mode: WordMode, line: usize, column: usize) -> Self {
        Self { chars: raw.chars().collect(), pos: 0, mode, line, column }
    }

    fn error(&self, message: impl Into<String>) -> ParseException {
        ParseException::new(message, self.line, self.column)
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn text(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn skip(&self, start: usize, construct: Construct, what: &str) -> Result<usize, ParseException> {
        skip_construct(&self.chars, start, construct)
            .ok_or_else(|| self.error(format!("unterminated {}", what)))
    }

    fn parse_unquoted(&mut self) -> Result<Vec<WordPart>, ParseException> {
        let mut parts = Vec::new();
        let mut lit = String::new();

        while let Some(c) = self.current() {
            match c {
                '\\' => match self.peek(1) {
                    Some(next) => {
                        flush(&mut lit, &mut parts);
                        parts.push(WordPart::Escaped(next.to_string()));
                        self.pos += 2;
                    }
                    None => {
                        lit.push('\\');
                        self.pos += 1;
                    }
                },
                '\'' if !self.mode.in_dquote => {
                    flush(&mut lit, &mut parts);
                    let end = self.skip(self.pos + 1, Construct::SingleQuote, "single quote")?;
                    parts.push(WordPart::SingleQuoted(self.text(self.pos + 1, end - 1)));
                    self.pos = end;
                }
                '"' => {
                    flush(&mut lit, &mut parts);
                    let end = self.skip(self.pos + 1, Construct::DoubleQuote, "double quote")?;
                    let inner = self.text(self.pos + 1, end - 1);
                    let mut nested = WordParser::new(&inner, self.mode, self.line, self.column);
                    parts.push(WordPart::DoubleQuoted(nested.parse_double_quoted(false)?));
                    self.pos = end;
                }
                '`' => {
                    flush(&mut lit, &mut parts);
                    parts.push(self.parse_backquote(false)?);
                }
                '$' if self.peek(1) == Some('"') && !self.mode.in_dquote => {
                    // $"..." is an ordinary double-quoted string
                    self.pos += 1;
                }
                '$' => match self.parse_dollar(self.mode.in_dquote)? {
                    Some(part) => {
                        flush(&mut lit, &mut parts);
                        parts.push(part);
                    }
                    None => {
                        lit.push('$');
                        self.pos += 1;
                    }
                },
                '~' if self.tilde_allowed(&lit, &parts) => match self.parse_tilde() {
                    Some(part) => {
                        flush(&mut lit, &mut parts);
                        parts.push(part);
                    }
                    None => {
                        lit.push('~');
                        self.pos += 1;
                    }
                },
                '{' if self.mode.brace => match self.try_brace_expansion()? {
                    Some(part) => {
                        flush(&mut lit, &mut parts);
                        parts.push(part);
                    }
                    None => {
                        lit.push('{');
                        self.pos += 1;
                    }
                },
                '<' | '>' if self.pos == 0 && self.peek(1) == Some('(') => {
                    let end = self.skip(self.pos + 2, Construct::CommandSubst, "process substitution")?;
                    let body = self.parse_script(&self.text(self.pos + 2, end - 1))?;
                    let direction = if c == '<' { ProcessDirection::Input } else { ProcessDirection::Output };
                    parts.push(WordPart::ProcessSubstitution(ProcessSubstitutionPart { body, direction }));
                    self.pos = end;
                }
                '@' | '*' | '+' | '?' | '!' if self.peek(1) == Some('(') => {
                    flush(&mut lit, &mut parts);
                    let end = self.skip(self.pos + 2, Construct::Group, "pattern group")?;
                    parts.push(WordPart::ExtGlob(self.text(self.pos, end)));
                    self.pos = end;
                }
                _ => {
                    lit.push(c);
                    self.pos += 1;
                }
            }
        }
        flush(&mut lit, &mut parts);
        Ok(parts)
    }

    /// Contents of double quotes (or a here-document body when `heredoc`).
    fn parse_double_quoted(&mut self, heredoc: bool) -> Result<Vec<WordPart>, ParseException> {
        let mut parts = Vec::new();
        let mut lit = String::new();

        while let Some(c) = self.current() {
            match c {
                '\\' => match self.peek(1) {
                    Some('\n') => self.pos += 2,
                    Some(next @ ('$' | '`' | '\\')) => {
                        lit.push(next);
                        self.pos += 2;
                    }
                    Some('"') if !heredoc => {
                        lit.push('"');
                        self.pos += 2;
                    }
                    _ => {
                        lit.push('\\');
                        self.pos += 1;
                    }
                },
                '`' => {
                    flush(&mut lit, &mut parts);
                    parts.push(self.parse_backquote(!heredoc)?);
                }
                '$' => match self.parse_dollar(true)? {
                    Some(part) => {
                        flush(&mut lit, &mut parts);
                        parts.push(part);
                    }
                    None => {
                        lit.push('$');
                        self.pos += 1;
                    }
                },
                _ => {
                    lit.push(c);
                    self.pos += 1;
                }
            }
        }
        flush(&mut lit, &mut parts);
        Ok(parts)
    }

    fn parse_script(&self, source: &str) -> Result<ScriptNode, ParseException> {
        Parser::new().parse(source)
    }

    fn parse_backquote(&mut self, in_dquote: bool) -> Result<WordPart, ParseException> {
        let end = self.skip(self.pos + 1, Construct::Backquote, "backquote")?;
        let raw = &self.chars[self.pos + 1..end - 1];
        let mut source = String::new();
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == '\\' {
                match raw.get(i + 1) {
                    Some(&n) if n == '\\' || n == '`' || n == '$' || (in_dquote && n == '"') => {
                        source.push(n);
                        i += 2;
                        continue;
                    }
                    _ => {}
                }
            }
            source.push(raw[i]);
            i += 1;
        }
        self.pos = end;
        let body = self.parse_script(&source)?;
        Ok(WordPart::CommandSubstitution(CommandSubstitutionPart { body, backquote: true }))
    }

    /// Parse the construct starting at a `$`. `None` means a literal dollar.
    fn parse_dollar(&mut self, in_dquote: bool) -> Result<Option<WordPart>, ParseException> {
        let Some(next) = self.peek(1) else {
            return Ok(None);
        };
        match next {
            '\'' if !in_dquote => {
                let end = self.skip(self.pos + 2, Construct::AnsiQuote, "$' quote")?;
                let decoded = decode_ansi_c(&self.chars[self.pos + 2..end - 1]);
                self.pos = end;
                Ok(Some(WordPart::SingleQuoted(decoded)))
            }
            '(' => {
                let arith = self.peek(2) == Some('(');
                if arith {
                    if let Some(end) = skip_construct(&self.chars, self.pos + 3, Construct::Arith) {
                        let text = self.text(self.pos + 3, end - 2);
                        let expr = parse_arithmetic(&text).map_err(|e| self.error(e.message))?;
                        self.pos = end;
                        return Ok(Some(WordPart::Arithmetic(expr)));
                    }
                }
                let what = if arith { "arithmetic expansion" } else { "command substitution" };
                let end = self.skip(self.pos + 2, Construct::CommandSubst, what)?;
                let body = self.parse_script(&self.text(self.pos + 2, end - 1))?;
                self.pos = end;
                Ok(Some(WordPart::CommandSubstitution(CommandSubstitutionPart { body, backquote: false })))
            }
            '{' => {
                let end = skip_param(&self.chars, self.pos + 2, in_dquote)
                    .ok_or_else(|| self.error("unterminated parameter expansion"))?;
                let inner = self.text(self.pos + 2, end - 1);
                self.pos = end;
                Ok(Some(WordPart::Parameter(self.parse_braced_param(&inner, in_dquote)?)))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = self.pos + 1;
                let mut end = start;
                while end < self.chars.len() && (self.chars[end].is_ascii_alphanumeric() || self.chars[end] == '_') {
                    end += 1;
                }
                let name = self.text(start, end);
                self.pos = end;
                Ok(Some(WordPart::Parameter(ParameterExpansion::simple(name))))
            }
            c if c.is_ascii_digit() || matches!(c, '?' | '#' | '@' | '*' | '$' | '!' | '-') => {
                self.pos += 2;
                Ok(Some(WordPart::Parameter(ParameterExpansion::simple(c.to_string()))))
            }
            _ => Ok(None),
        }
    }

    fn tilde_allowed(&self, lit: &str, parts: &[WordPart]) -> bool {
        if !self.mode.tilde {
            return false;
        }
        if self.pos == 0 {
            return true;
        }
        self.mode.assignment && lit.ends_with(':') && self.chars[self.pos - 1] == ':'
            || self.mode.assignment && parts.is_empty() && lit.is_empty()
    }

    fn parse_tilde(&mut self) -> Option<WordPart> {
        let mut end = self.pos + 1;
        while end < self.chars.len() && is_tilde_user_char(self.chars[end]) {
            end += 1;
        }
        match self.chars.get(end) {
            None | Some('/') => {}
            Some(':') if self.mode.assignment => {}
            _ => return None,
        }
        let user = self.text(self.pos + 1, end);
        self.pos = end;
        Some(WordPart::Tilde(if user.is_empty() { None } else { Some(user) }))
    }

    // =========================================================================
    // BRACE EXPANSION
    // =========================================================================

    /// Find the `}` matching the `{` at `open`, skipping quoted text.
    fn find_brace_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = open;
        while i < self.chars.len() {
            match self.chars[i] {
                '\\' => i += 2,
                '\'' => i = skip_construct(&self.chars, i + 1, Construct::SingleQuote)?,
                '"' => i = skip_construct(&self.chars, i + 1, Construct::DoubleQuote)?,
                '`' => i = skip_construct(&self.chars, i + 1, Construct::Backquote)?,
                '$' if self.chars.get(i + 1) == Some(&'{') => i = skip_param(&self.chars, i + 2, false)?,
                '$' if self.chars.get(i + 1) == Some(&'(') => {
                    i = skip_construct(&self.chars, i + 2, Construct::CommandSubst)?
                }
                '{' => {
                    depth += 1;
                    i += 1;
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
        None
    }

    /// Split brace content on top-level commas.
    fn split_brace_items(&self, start: usize, end: usize) -> Vec<(usize, usize)> {
        let mut items = Vec::new();
        let mut depth = 0usize;
        let mut item_start = start;
        let mut i = start;
        while i < end {
            let step = match self.chars[i] {
                '\\' => 2,
                '\'' => skip_construct(&self.chars, i + 1, Construct::SingleQuote).map(|e| e - i).unwrap_or(1),
                '"' => skip_construct(&self.chars, i + 1, Construct::DoubleQuote).map(|e| e - i).unwrap_or(1),
                '$' if self.chars.get(i + 1) == Some(&'{') => {
                    skip_param(&self.chars, i + 2, false).map(|e| e - i).unwrap_or(1)
                }
                '{' => {
                    depth += 1;
                    1
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    1
                }
                ',' if depth == 0 => {
                    items.push((item_start, i));
                    item_start = i + 1;
                    1
                }
                _ => 1,
            };
            i += step;
        }
        items.push((item_start, end));
        items
    }

    fn try_brace_expansion(&mut self) -> Result<Option<WordPart>, ParseException> {
        let Some(close) = self.find_brace_close(self.pos) else {
            return Ok(None);
        };
        let start = self.pos + 1;
        let items = self.split_brace_items(start, close);

        if items.len() > 1 {
            let mut words = Vec::with_capacity(items.len());
            let mode = WordMode { tilde: false, ..self.mode };
            for (s, e) in items {
                let text = self.text(s, e);
                words.push(BraceItem::Word(parse_word_with(&text, mode, self.line, self.column)?));
            }
            self.pos = close + 1;
            return Ok(Some(WordPart::BraceExpansion(BraceExpansionPart { items: words })));
        }

        let content = self.text(start, close);
        match parse_brace_range(&content) {
            Some(item) => {
                self.pos = close + 1;
                Ok(Some(WordPart::BraceExpansion(BraceExpansionPart { items: vec![item] })))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // PARAMETER EXPANSION
    // =========================================================================

    fn parse_braced_param(&self, inner: &str, in_dquote: bool) -> Result<ParameterExpansion, ParseException> {
        let chars: Vec<char> = inner.chars().collect();
        let invalid = || ParameterExpansion {
            name: String::new(),
            index: None,
            short: false,
            length: false,
            indirect: false,
            operation: Some(ParameterOperation::Invalid(inner.to_string())),
        };
        if chars.is_empty() {
            return Ok(invalid());
        }

        // ${#name} / ${#arr[@]}
        if chars[0] == '#' && chars.len() > 1 {
            if let Some((name, index, end)) = self.param_name(&chars, 1)? {
                if end == chars.len() {
                    return Ok(ParameterExpansion {
                        name,
                        index,
                        short: false,
                        length: true,
                        indirect: false,
                        operation: None,
                    });
                }
            }
        }

        let mut indirect = false;
        let mut start = 0;
        if chars[0] == '!' && chars.len() > 1 {
            // ${!prefix*} / ${!prefix@}
            let last = chars[chars.len() - 1];
            let prefix: String = chars[1..chars.len() - 1].iter().collect();
            if (last == '*' || last == '@') && is_valid_name(&prefix) {
                return Ok(ParameterExpansion {
                    name: prefix,
                    index: None,
                    short: false,
                    length: false,
                    indirect: false,
                    operation: Some(ParameterOperation::NamePrefix { star: last == '*' }),
                });
            }
            indirect = true;
            start = 1;
        }

        let Some((name, index, end)) = self.param_name(&chars, start)? else {
            return Ok(invalid());
        };
        let rest: String = chars[end..].iter().collect();
        let operation = self.parse_param_operation(&rest, in_dquote)?;
        if let Some(ParameterOperation::Invalid(_)) = operation {
            return Ok(invalid());
        }
        Ok(ParameterExpansion {
            name,
            index,
            short: false,
            length: false,
            indirect,
            operation,
        })
    }

    /// Read a parameter name and optional subscript starting at `start`.
    fn param_name(
        &self,
        chars: &[char],
        start: usize,
    ) -> Result<Option<(String, Option<Subscript>, usize)>, ParseException> {
        let Some(&first) = chars.get(start) else {
            return Ok(None);
        };
        let mut end = start;
        if first.is_ascii_alphabetic() || first == '_' {
            while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
        } else if first.is_ascii_digit() {
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
        } else if matches!(first, '@' | '*' | '#' | '?' | '$' | '!' | '-') {
            end += 1;
        } else {
            return Ok(None);
        }
        let name: String = chars[start..end].iter().collect();

        let mut index = None;
        if chars.get(end) == Some(&'[') && is_valid_name(&name) {
            let mut depth = 0usize;
            let mut close = None;
            for (i, &c) in chars.iter().enumerate().skip(end) {
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
            let Some(close) = close else {
                return Ok(None);
            };
            let sub: String = chars[end + 1..close].iter().collect();
            index = Some(match sub.as_str() {
                "@" => Subscript::All,
                "*" => Subscript::Star,
                _ => Subscript::Expr(parse_word_with(&sub, WordMode::PLAIN, self.line, self.column)?),
            });
            end = close + 1;
        }
        Ok(Some((name, index, end)))
    }

    fn sub_word(&self, text: &str, mode: WordMode) -> Result<WordNode, ParseException> {
        parse_word_with(text, mode, self.line, self.column)
    }

    fn parse_param_operation(&self, rest: &str, in_dquote: bool) -> Result<Option<ParameterOperation>, ParseException> {
        if rest.is_empty() {
            return Ok(None);
        }
        let word_mode = if in_dquote { WordMode::DQUOTE_WORD } else { WordMode::PLAIN };
        let word_mode = WordMode { tilde: !in_dquote, ..word_mode };

        for (prefix, check_empty) in [(":", true), ("", false)] {
            let Some(r) = rest.strip_prefix(prefix) else {
                continue;
            };
            let Some(op) = r.chars().next() else {
                continue;
            };
            let word_text = &r[op.len_utf8()..];
            let op = match op {
                '-' => ParameterOperation::Default { word: self.sub_word(word_text, word_mode)?, check_empty },
                '=' => ParameterOperation::Assign { word: self.sub_word(word_text, word_mode)?, check_empty },
                '?' => ParameterOperation::Error {
                    word: if word_text.is_empty() { None } else { Some(self.sub_word(word_text, word_mode)?) },
                    check_empty,
                },
                '+' => ParameterOperation::Alternative { word: self.sub_word(word_text, word_mode)?, check_empty },
                _ => continue,
            };
            return Ok(Some(op));
        }

        if let Some(r) = rest.strip_prefix(':') {
            let (offset, length) = split_top_level_colon(r);
            let offset = parse_arithmetic(offset).map_err(|e| self.error(e.message))?;
            let length = match length {
                Some(l) => Some(parse_arithmetic(l).map_err(|e| self.error(e.message))?),
                None => None,
            };
            return Ok(Some(ParameterOperation::Substring { offset, length }));
        }

        for (op, suffix, longest) in [("##", false, true), ("#", false, false), ("%%", true, true), ("%", true, false)] {
            if let Some(pattern) = rest.strip_prefix(op) {
                return Ok(Some(ParameterOperation::RemovePattern {
                    pattern: self.sub_word(pattern, WordMode::PLAIN)?,
                    suffix,
                    longest,
                }));
            }
        }

        if let Some(r) = rest.strip_prefix('/') {
            let (all, anchor, body) = if let Some(b) = r.strip_prefix('/') {
                (true, None, b)
            } else if let Some(b) = r.strip_prefix('#') {
                (false, Some(PatternAnchor::Start), b)
            } else if let Some(b) = r.strip_prefix('%') {
                (false, Some(PatternAnchor::End), b)
            } else {
                (false, None, r)
            };
            let (pattern, replacement) = split_replacement(body);
            return Ok(Some(ParameterOperation::Replace {
                pattern: self.sub_word(pattern, WordMode::PLAIN)?,
                replacement: match replacement {
                    Some(r) => Some(self.sub_word(r, word_mode)?),
                    None => None,
                },
                all,
                anchor,
            }));
        }

        for (op, upper, all) in [("^^", true, true), ("^", true, false), (",,", false, true), (",", false, false)] {
            if let Some(pattern) = rest.strip_prefix(op) {
                return Ok(Some(ParameterOperation::CaseConvert {
                    upper,
                    all,
                    pattern: if pattern.is_empty() { None } else { Some(self.sub_word(pattern, WordMode::PLAIN)?) },
                }));
            }
        }

        if let Some(r) = rest.strip_prefix('@') {
            let mut cs = r.chars();
            if let (Some(c), None) = (cs.next(), cs.next()) {
                if matches!(c, 'Q' | 'U' | 'L' | 'u' | 'E' | 'a' | 'A' | 'K') {
                    return Ok(Some(ParameterOperation::Transform(c)));
                }
            }
        }

        Ok(Some(ParameterOperation::Invalid(rest.to_string())))
    }
}

/// Split `offset:length` at the first colon outside parentheses.
fn split_top_level_colon(s: &str) -> (&str, Option<&str>) {
    let mut depth = 0i32;
    let mut ternary = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '?' if depth == 0 => ternary += 1,
            ':' if depth == 0 => {
                if ternary > 0 {
                    ternary -= 1;
                } else {
                    return (&s[..i], Some(&s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    (s, None)
}

/// Split `pattern/replacement` at the first unescaped, unquoted slash.
fn split_replacement(s: &str) -> (&str, Option<&str>) {
    let chars: Vec<(usize, char)> = s.char_indices().collect();
    let all: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let (byte, c) = chars[i];
        match c {
            '\\' => i += 2,
            '\'' => i = skip_construct(&all, i + 1, Construct::SingleQuote).unwrap_or(chars.len()),
            '"' => i = skip_construct(&all, i + 1, Construct::DoubleQuote).unwrap_or(chars.len()),
            '$' if all.get(i + 1) == Some(&'{') => i = skip_param(&all, i + 2, false).unwrap_or(chars.len()),
            '/' => return (&s[..byte], Some(&s[byte + 1..])),
            _ => i += 1,
        }
    }
    (s, None)
}

/// Recognize `a..b[..step]` numeric and character ranges.
pub(crate) fn parse_brace_range(content: &str) -> Option<BraceItem> {
    let pieces: Vec<&str> = content.split("..").collect();
    if pieces.len() != 2 && pieces.len() != 3 {
        return None;
    }
    let step = match pieces.get(2) {
        Some(s) => Some(s.parse::<i64>().ok()?),
        None => None,
    };
    let (a, b) = (pieces[0], pieces[1]);
    if let (Ok(start), Ok(end)) = (a.parse::<i64>(), b.parse::<i64>()) {
        let padded = |s: &str| {
            let digits = s.trim_start_matches('-');
            digits.len() > 1 && digits.starts_with('0')
        };
        let width = if padded(a) || padded(b) { a.len().max(b.len()) } else { 0 };
        return Some(BraceItem::NumberRange { start, end, step, width });
    }
    let mut ca = a.chars();
    let mut cb = b.chars();
    match (ca.next(), ca.next(), cb.next(), cb.next()) {
        (Some(x), None, Some(y), None) if x.is_ascii_alphabetic() && y.is_ascii_alphabetic() => {
            Some(BraceItem::CharRange { start: x, end: y, step })
        }
        _ => None,
    }
}

/// Decode the body of a `$'...'` string.
pub(crate) fn decode_ansi_c(chars: &[char]) -> String {
    let mut out = String::new();
    let mut i = 0;
    let read_radix = |i: &mut usize, radix: u32, max: usize| -> Option<u32> {
        let mut value = 0u32;
        let mut n = 0;
        while n < max {
            match chars.get(*i).and_then(|c| c.to_digit(radix)) {
                Some(d) => {
                    value = value * radix + d;
                    *i += 1;
                    n += 1;
                }
                None => break,
            }
        }
        if n == 0 { None } else { Some(value) }
    };
    while i < chars.len() {
        let c = chars[i];
        if c != '\\' || i + 1 >= chars.len() {
            out.push(c);
            i += 1;
            continue;
        }
        let e = chars[i + 1];
        i += 2;
        match e {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'e' | 'E' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' | '\'' | '"' | '?' => out.push(e),
            'c' => {
                if let Some(&ctl) = chars.get(i) {
                    out.push(((ctl.to_ascii_uppercase() as u8) ^ 0x40) as char);
                    i += 1;
                }
            }
            'x' => match read_radix(&mut i, 16, 2) {
                Some(v) => out.push(char::from_u32(v).unwrap_or('\u{fffd}')),
                None => out.push_str("\\x"),
            },
            'u' | 'U' => {
                let max = if e == 'u' { 4 } else { 8 };
                match read_radix(&mut i, 16, max) {
                    Some(v) => out.push(char::from_u32(v).unwrap_or('\u{fffd}')),
                    None => {
                        out.push('\\');
                        out.push(e);
                    }
                }
            }
            '0'..='7' => {
                i -= 1;
                let max = if e == '0' { 4 } else { 3 };
                let v = read_radix(&mut i, 8, max).unwrap_or(0);
                out.push(char::from_u32(v & 0xff).unwrap_or('\u{fffd}'));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(raw: &str) -> Vec<WordPart> {
        parse_word(raw).unwrap().parts
    }

    fn param(raw: &str) -> ParameterExpansion {
        match parts(raw).into_iter().next() {
            Some(WordPart::Parameter(p)) => p,
            other => panic!("expected parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_and_quotes() {
        assert_eq!(
            parts("a'b c'\"d\"\\e"),
            vec![
                WordPart::Literal("a".into()),
                WordPart::SingleQuoted("b c".into()),
                WordPart::DoubleQuoted(vec![WordPart::Literal("d".into())]),
                WordPart::Escaped("e".into()),
            ]
        );
    }

    #[test]
    fn test_simple_parameters() {
        assert_eq!(param("$HOME"), ParameterExpansion::simple("HOME"));
        assert_eq!(param("$1"), ParameterExpansion::simple("1"));
        assert_eq!(param("$?"), ParameterExpansion::simple("?"));
        assert_eq!(parts("$"), vec![WordPart::Literal("$".into())]);
    }

    #[test]
    fn test_double_quoted_parameter() {
        let p = parts("\"x=$x\"");
        assert_eq!(
            p,
            vec![WordPart::DoubleQuoted(vec![
                WordPart::Literal("x=".into()),
                WordPart::Parameter(ParameterExpansion::simple("x")),
            ])]
        );
    }

    #[test]
    fn test_default_operator() {
        let p = param("${X:-bar}");
        assert_eq!(p.name, "X");
        assert_eq!(
            p.operation,
            Some(ParameterOperation::Default { word: WordNode::literal("bar"), check_empty: true })
        );
        let p = param("${X=baz}");
        assert!(matches!(p.operation, Some(ParameterOperation::Assign { check_empty: false, .. })));
    }

    #[test]
    fn test_pattern_removal_operators() {
        let p = param("${F%%.*}");
        assert_eq!(
            p.operation,
            Some(ParameterOperation::RemovePattern { pattern: WordNode::literal(".*"), suffix: true, longest: true })
        );
        let p = param("${F#*/}");
        assert!(matches!(p.operation, Some(ParameterOperation::RemovePattern { suffix: false, longest: false, .. })));
    }

    #[test]
    fn test_length_and_indirect() {
        let p = param("${#name}");
        assert!(p.length);
        assert_eq!(p.name, "name");
        let p = param("${#arr[@]}");
        assert!(p.length);
        assert_eq!(p.index, Some(Subscript::All));
        let p = param("${!ref}");
        assert!(p.indirect);
        assert_eq!(p.name, "ref");
        let p = param("${!PATH_*}");
        assert_eq!(p.operation, Some(ParameterOperation::NamePrefix { star: true }));
    }

    #[test]
    fn test_substring_and_replace() {
        let p = param("${s:1:2}");
        assert_eq!(
            p.operation,
            Some(ParameterOperation::Substring { offset: ArithExpr::Number(1), length: Some(ArithExpr::Number(2)) })
        );
        let p = param("${s//a/b}");
        assert_eq!(
            p.operation,
            Some(ParameterOperation::Replace {
                pattern: WordNode::literal("a"),
                replacement: Some(WordNode::literal("b")),
                all: true,
                anchor: None,
            })
        );
    }

    #[test]
    fn test_bad_substitution_is_deferred() {
        let p = param("${x!y}");
        assert!(matches!(p.operation, Some(ParameterOperation::Invalid(_))));
    }

    #[test]
    fn test_command_and_arith_substitution() {
        assert!(matches!(parts("$(echo hi)")[0], WordPart::CommandSubstitution(_)));
        assert!(matches!(parts("`echo hi`")[0], WordPart::CommandSubstitution(CommandSubstitutionPart { backquote: true, .. })));
        assert!(matches!(parts("$((1 + 2))")[0], WordPart::Arithmetic(_)));
    }

    #[test]
    fn test_tilde() {
        assert_eq!(parts("~/x")[0], WordPart::Tilde(None));
        assert_eq!(parts("~bob")[0], WordPart::Tilde(Some("bob".into())));
        assert_eq!(parts("a~"), vec![WordPart::Literal("a~".into())]);
        let w = parse_word_with("/a:~/b", WordMode::ASSIGNMENT, 1, 1).unwrap();
        assert!(w.parts.contains(&WordPart::Tilde(None)));
    }

    #[test]
    fn test_brace_expansion() {
        match &parts("a{b,c}d")[1] {
            WordPart::BraceExpansion(b) => assert_eq!(b.items.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match &parts("{01..10..2}")[0] {
            WordPart::BraceExpansion(b) => assert_eq!(
                b.items[0],
                BraceItem::NumberRange { start: 1, end: 10, step: Some(2), width: 2 }
            ),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(parts("{a}"), vec![WordPart::Literal("{a}".into())]);
        assert_eq!(parts("{}"), vec![WordPart::Literal("{}".into())]);
    }

    #[test]
    fn test_ansi_c_quote() {
        assert_eq!(parts("$'a\\tb\\x41\\n'"), vec![WordPart::SingleQuoted("a\tbA\n".into())]);
    }

    #[test]
    fn test_heredoc_body_keeps_quotes() {
        let w = parse_heredoc_body("say \"$x\" 'y'\n", 1, 1).unwrap();
        assert_eq!(
            w.parts,
            vec![
                WordPart::Literal("say \"".into()),
                WordPart::Parameter(ParameterExpansion::simple("x")),
                WordPart::Literal("\" 'y'\n".into()),
            ]
        );
    }

    #[test]
    fn test_extglob_part() {
        assert_eq!(
            parts("x@(a|b)"),
            vec![WordPart::Literal("x".into()), WordPart::ExtGlob("@(a|b)".into())]
        );
    }
}

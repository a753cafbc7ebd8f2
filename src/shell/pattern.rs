//! Pattern Matching
//!
//! Converts shell glob patterns to regex equivalents and matches them
//! against candidate strings. Used by pathname globbing, `case`, `[[ == ]]`
//! and the pattern operators of parameter expansion.
//!
//! A backslash quotes the next character. Unclosed character classes
//! (`[abc`) are treated as a literal `[`; a pattern whose regex fails to
//! compile (e.g. `[z-a]`) falls back to a literal comparison.
//!
//! `!(...)` needs lookahead, which the regex engine lacks, so a pattern
//! with a top-level negated group is matched piecewise.

use std::collections::HashMap;

use regex_lite::Regex;

lazy_static::lazy_static! {
    /// Valid POSIX character class names
    static ref POSIX_CLASSES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("alnum", "a-zA-Z0-9");
        m.insert("alpha", "a-zA-Z");
        m.insert("ascii", "\\x00-\\x7F");
        m.insert("blank", " \\t");
        m.insert("cntrl", "\\x00-\\x1F\\x7F");
        m.insert("digit", "0-9");
        m.insert("graph", "!-~");
        m.insert("lower", "a-z");
        m.insert("print", " -~");
        m.insert("punct", "!-/:-@\\[-`{-~");
        m.insert("space", " \\t\\n\\r\\f\\v");
        m.insert("upper", "A-Z");
        m.insert("word", "a-zA-Z0-9_");
        m.insert("xdigit", "0-9A-Fa-f");
        m
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Recognize `@(..)`, `*(..)`, `+(..)`, `?(..)`, `!(..)`
    pub extglob: bool,
    pub nocase: bool,
}

#[derive(Debug, Clone)]
enum Piece {
    Regex(Regex),
    /// `!(a|b)`: any string not matched by one of the alternatives
    Not(Vec<Pattern>),
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Pieces(Vec<Piece>),
    Literal(String),
}

/// A compiled shell pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    matcher: Matcher,
    nocase: bool,
}

fn anchored(body: &str, nocase: bool) -> Option<Regex> {
    let flags = if nocase { "(?si)" } else { "(?s)" };
    Regex::new(&format!("^{}(?:{})$", flags, body)).ok()
}

impl Pattern {
    pub fn new(pattern: &str, options: PatternOptions) -> Self {
        let chars: Vec<char> = pattern.chars().collect();
        let matcher = if options.extglob && has_negated_group(&chars) {
            compile_pieces(&chars, options)
        } else {
            anchored(&pattern_to_regex(&chars, options.extglob), options.nocase).map(Matcher::Regex)
        };
        Self {
            matcher: matcher.unwrap_or_else(|| Matcher::Literal(unescape_glob(pattern))),
            nocase: options.nocase,
        }
    }

    /// Full match against `text`.
    pub fn is_match(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(text),
            Matcher::Pieces(pieces) => match_pieces(pieces, text),
            Matcher::Literal(lit) if self.nocase => lit.to_lowercase() == text.to_lowercase(),
            Matcher::Literal(lit) => lit == text,
        }
    }
}

/// Split at top-level `!(...)` groups; everything between them is an
/// ordinary regex chunk.
fn compile_pieces(chars: &[char], options: PatternOptions) -> Option<Matcher> {
    let mut pieces = Vec::new();
    let mut chunk_start = 0;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == '[' {
            if let Some(end) = find_char_class_end(chars, i) {
                i = end + 1;
                continue;
            }
        }
        if chars[i] == '!' && chars.get(i + 1) == Some(&'(') {
            if let Some(close) = find_matching_paren(chars, i + 1) {
                let body = pattern_to_regex(&chars[chunk_start..i], options.extglob);
                pieces.push(Piece::Regex(anchored(&body, options.nocase)?));
                let content: String = chars[i + 2..close].iter().collect();
                let alternatives = split_extglob_alternatives(&content)
                    .iter()
                    .map(|alt| Pattern::new(alt, options))
                    .collect();
                pieces.push(Piece::Not(alternatives));
                i = close + 1;
                chunk_start = i;
                continue;
            }
        }
        i += 1;
    }
    let body = pattern_to_regex(&chars[chunk_start..], options.extglob);
    pieces.push(Piece::Regex(anchored(&body, options.nocase)?));
    Some(Matcher::Pieces(pieces))
}

fn boundaries(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len()))
}

fn match_pieces(pieces: &[Piece], text: &str) -> bool {
    let Some((first, rest)) = pieces.split_first() else {
        return text.is_empty();
    };
    if rest.is_empty() {
        return piece_matches(first, text);
    }
    boundaries(text).any(|end| piece_matches(first, &text[..end]) && match_pieces(rest, &text[end..]))
}

fn piece_matches(piece: &Piece, text: &str) -> bool {
    match piece {
        Piece::Regex(re) => re.is_match(text),
        Piece::Not(alternatives) => !alternatives.iter().any(|p| p.is_match(text)),
    }
}

fn has_negated_group(chars: &[char]) -> bool {
    let mut i = 0;
    while i + 1 < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == '!' && chars[i + 1] == '(' {
            return true;
        }
        i += 1;
    }
    false
}

/// Convert a shell glob pattern to a regex body (unanchored).
fn pattern_to_regex(chars: &[char], extglob: bool) -> String {
    let mut regex = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if extglob && matches!(c, '@' | '*' | '+' | '?' | '!') && chars.get(i + 1) == Some(&'(') {
            if let Some(close) = find_matching_paren(chars, i + 1) {
                let content: String = chars[i + 2..close].iter().collect();
                let alternatives: Vec<String> = split_extglob_alternatives(&content)
                    .iter()
                    .map(|alt| {
                        let alt: Vec<char> = alt.chars().collect();
                        pattern_to_regex(&alt, extglob)
                    })
                    .collect();
                let group = alternatives.join("|");
                match c {
                    '@' => regex.push_str(&format!("(?:{})", group)),
                    '*' => regex.push_str(&format!("(?:{})*", group)),
                    '+' => regex.push_str(&format!("(?:{})+", group)),
                    '?' => regex.push_str(&format!("(?:{})?", group)),
                    // Nested negation cannot be expressed; accept anything.
                    _ => regex.push_str(".*"),
                }
                i = close + 1;
                continue;
            }
        }

        match c {
            '\\' => {
                match chars.get(i + 1) {
                    Some(next) => regex.push_str(&regex_lite::escape(&next.to_string())),
                    None => regex.push_str("\\\\"),
                }
                i += 2;
            }
            '*' => {
                regex.push_str(".*");
                i += 1;
            }
            '?' => {
                regex.push('.');
                i += 1;
            }
            '[' => match find_char_class_end(chars, i) {
                Some(end) => {
                    regex.push_str(&convert_char_class(&chars[i + 1..end]));
                    i = end + 1;
                }
                None => {
                    regex.push_str("\\[");
                    i += 1;
                }
            },
            _ => {
                regex.push_str(&regex_lite::escape(&c.to_string()));
                i += 1;
            }
        }
    }
    regex
}

/// Find the matching closing parenthesis, handling nesting
fn find_matching_paren(chars: &[char], open_idx: usize) -> Option<usize> {
    let mut depth = 0;
    let mut i = open_idx;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split the inside of an extglob group on top-level `|`.
fn split_extglob_alternatives(content: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            '(' => depth += 1,
            ')' => depth -= 1,
            '|' if depth == 0 => {
                alternatives.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    alternatives.push(current);
    alternatives
}

/// Index of the `]` closing the class opened at `start`.
fn find_char_class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if matches!(chars.get(i), Some('!') | Some('^')) {
        i += 1;
    }
    // A leading ] is literal
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' if chars.get(i + 1) == Some(&':') => {
                let rest: String = chars[i + 2..].iter().collect();
                if let Some(end) = rest.find(":]") {
                    i += 2 + rest[..end].chars().count() + 1;
                }
            }
            ']' => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn convert_char_class(content: &[char]) -> String {
    let mut out = String::from("[");
    let mut i = 0;
    if matches!(content.first(), Some('!') | Some('^')) {
        out.push('^');
        i = 1;
    }
    while i < content.len() {
        let c = content[i];
        if c == '[' && content.get(i + 1) == Some(&':') {
            let rest: String = content[i + 2..].iter().collect();
            if let Some(end) = rest.find(":]") {
                let name = &rest[..end];
                if let Some(class) = POSIX_CLASSES.get(name) {
                    out.push_str(class);
                }
                i += 2 + name.chars().count() + 2;
                continue;
            }
        }
        let c = if c == '\\' && i + 1 < content.len() {
            i += 1;
            content[i]
        } else {
            c
        };
        if content.get(i + 1) == Some(&'-') && i + 2 < content.len() {
            let end = content[i + 2];
            out.push_str(&regex_lite::escape(&c.to_string()));
            out.push('-');
            out.push_str(&regex_lite::escape(&end.to_string()));
            i += 3;
            continue;
        }
        out.push_str(&regex_lite::escape(&c.to_string()));
        i += 1;
    }
    out.push(']');
    out
}

/// True if the pattern contains an unquoted glob metacharacter.
pub fn has_glob_chars(pattern: &str, extglob: bool) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '*' | '?' => return true,
            '[' if find_char_class_end(&chars, i).is_some() => return true,
            '@' | '+' | '!' if extglob && chars.get(i + 1) == Some(&'(') => return true,
            _ => {}
        }
        i += 1;
    }
    false
}

/// Remove backslash quoting.
pub fn unescape_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Quote every character that is special in a pattern.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '?' | '[' | ']' | '(' | ')' | '|' | '!' | '@' | '+') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `${v#pat}` / `${v##pat}`
pub fn remove_prefix<'a>(text: &'a str, pattern: &Pattern, longest: bool) -> &'a str {
    let mut ends: Vec<usize> = boundaries(text).collect();
    if longest {
        ends.reverse();
    }
    match ends.into_iter().find(|&end| pattern.is_match(&text[..end])) {
        Some(end) => &text[end..],
        None => text,
    }
}

/// `${v%pat}` / `${v%%pat}`
pub fn remove_suffix<'a>(text: &'a str, pattern: &Pattern, longest: bool) -> &'a str {
    let mut starts: Vec<usize> = boundaries(text).collect();
    if !longest {
        starts.reverse();
    }
    match starts.into_iter().find(|&start| pattern.is_match(&text[start..])) {
        Some(start) => &text[..start],
        None => text,
    }
}

/// Where a replacement pattern must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Anywhere,
    Start,
    End,
}

/// `${v/pat/rep}` and friends. Each match is the longest one starting at
/// the leftmost position; empty matches are skipped.
pub fn replace(text: &str, pattern: &Pattern, replacement: &str, all: bool, anchor: Anchor) -> String {
    match anchor {
        Anchor::Start => {
            let end = boundaries(text).collect::<Vec<_>>().into_iter().rev().find(|&e| pattern.is_match(&text[..e]));
            match end {
                Some(end) => format!("{}{}", replacement, &text[end..]),
                None => text.to_string(),
            }
        }
        Anchor::End => {
            let start = boundaries(text).find(|&s| pattern.is_match(&text[s..]));
            match start {
                Some(start) => format!("{}{}", &text[..start], replacement),
                None => text.to_string(),
            }
        }
        Anchor::Anywhere => {
            let mut out = String::new();
            let mut pos = 0;
            let mut replaced = false;
            while pos < text.len() {
                let found = if replaced && !all {
                    None
                } else {
                    let ends: Vec<usize> = boundaries(&text[pos..]).skip(1).map(|e| pos + e).collect();
                    ends.into_iter().rev().find(|&e| pattern.is_match(&text[pos..e]))
                };
                match found {
                    Some(end) => {
                        out.push_str(replacement);
                        pos = end;
                        replaced = true;
                    }
                    None => {
                        let c = text[pos..].chars().next().map_or(1, char::len_utf8);
                        out.push_str(&text[pos..pos + c]);
                        pos += c;
                    }
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, text: &str) -> bool {
        Pattern::new(pattern, PatternOptions { extglob: true, nocase: false }).is_match(text)
    }

    #[test]
    fn test_basic_wildcards() {
        assert!(matches("*.txt", "a.txt"));
        assert!(!matches("*.txt", "a.txt.bak"));
        assert!(matches("?b", "ab"));
        assert!(!matches("?b", "b"));
        assert!(matches("*", ""));
        assert!(matches("a*b*c", "aXXbYc"));
    }

    #[test]
    fn test_character_classes() {
        assert!(matches("[abc]x", "bx"));
        assert!(matches("[!abc]x", "dx"));
        assert!(!matches("[^abc]x", "ax"));
        assert!(matches("[a-c]", "b"));
        assert!(matches("[[:digit:]][[:alpha:]]", "1z"));
        assert!(matches("[]]", "]"));
        assert!(matches("[abc", "[abc"));
        assert!(matches("[.-]", "-"));
    }

    #[test]
    fn test_escapes() {
        assert!(matches("\\*", "*"));
        assert!(!matches("\\*", "x"));
        assert!(matches("a.b", "a.b"));
        assert!(!matches("a.b", "axb"));
        assert!(matches("(x)", "(x)"));
    }

    #[test]
    fn test_extglob() {
        assert!(matches("@(foo|bar).c", "bar.c"));
        assert!(!matches("@(foo|bar).c", "baz.c"));
        assert!(matches("+(ab)", "ababab"));
        assert!(matches("*(x)y", "y"));
        assert!(matches("?(a)b", "ab"));
        assert!(matches("!(*.txt)", "a.rs"));
        assert!(!matches("!(*.txt)", "a.txt"));
        assert!(matches("x!(a)z", "xbz"));
        assert!(!matches("x!(a)z", "xaz"));
    }

    #[test]
    fn test_extglob_disabled_is_literal() {
        let p = Pattern::new("@(a)", PatternOptions::default());
        assert!(p.is_match("@(a)"));
        assert!(!p.is_match("a"));
    }

    #[test]
    fn test_nocase() {
        let p = Pattern::new("*.TXT", PatternOptions { extglob: false, nocase: true });
        assert!(p.is_match("a.txt"));
    }

    #[test]
    fn test_invalid_range_falls_back() {
        assert!(matches("[z-a]", "[z-a]"));
    }

    #[test]
    fn test_has_glob_chars() {
        assert!(has_glob_chars("*.c", false));
        assert!(!has_glob_chars("\\*.c", false));
        assert!(!has_glob_chars("[abc", false));
        assert!(has_glob_chars("@(a|b)", true));
        assert!(!has_glob_chars("@(a|b)", false));
    }

    #[test]
    fn test_prefix_suffix_removal() {
        let opts = PatternOptions::default();
        let f = "hello.tar.gz";
        assert_eq!(remove_suffix(f, &Pattern::new(".gz", opts), false), "hello.tar");
        assert_eq!(remove_suffix(f, &Pattern::new(".*", opts), true), "hello");
        assert_eq!(remove_suffix(f, &Pattern::new(".*", opts), false), "hello.tar");
        assert_eq!(remove_prefix(f, &Pattern::new("*.", opts), false), "tar.gz");
        assert_eq!(remove_prefix(f, &Pattern::new("*.", opts), true), "gz");
        assert_eq!(remove_prefix(f, &Pattern::new("x", opts), true), f);
    }

    #[test]
    fn test_replace() {
        let opts = PatternOptions::default();
        assert_eq!(replace("aXbXc", &Pattern::new("X", opts), "-", false, Anchor::Anywhere), "a-bXc");
        assert_eq!(replace("aXbXc", &Pattern::new("X", opts), "-", true, Anchor::Anywhere), "a-b-c");
        assert_eq!(replace("abcabc", &Pattern::new("b*", opts), "", false, Anchor::Anywhere), "a");
        assert_eq!(replace("abc", &Pattern::new("a", opts), "X", false, Anchor::Start), "Xbc");
        assert_eq!(replace("abc", &Pattern::new("b", opts), "X", false, Anchor::Start), "abc");
        assert_eq!(replace("abc", &Pattern::new("c", opts), "X", false, Anchor::End), "abX");
    }

    #[test]
    fn test_escape_roundtrip() {
        let text = "a*b?[c]";
        assert!(matches(&escape_glob(text), text));
        assert_eq!(unescape_glob(&escape_glob(text)), text);
    }
}

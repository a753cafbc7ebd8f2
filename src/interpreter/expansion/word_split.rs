//! Word Splitting
//!
//! IFS-based splitting of expanded segments into fields. Quoted and literal
//! segments join whatever field they touch; only unquoted expansion results
//! are split. Each field also carries a glob pattern in which quoted
//! characters are escaped, so pathname expansion can tell `"*"` from `*`.

use crate::shell::pattern::escape_glob;

/// Default field separators.
pub const DEFAULT_IFS: &str = " \t\n";

/// Where a piece of expanded text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Unquoted literal word text (glob-active, never split)
    Literal,
    /// Inside quotes (neither split nor globbed)
    Quoted,
    /// Result of an unquoted expansion (split and globbed)
    Expanded,
}

/// Segment for word splitting.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String, Origin),
    /// Hard field boundary between array elements of `"$@"`.
    Break,
}

/// One field after splitting, before pathname expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    pub text: String,
    pub pattern: String,
}

fn is_ifs_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n')
}

struct Splitter<'a> {
    ifs: &'a str,
    fields: Vec<Field>,
    current: Option<Field>,
    /// The last field ended on IFS whitespace; a following non-whitespace
    /// separator belongs to the same delimiter.
    after_whitespace: bool,
}

impl Splitter<'_> {
    fn open(&mut self) -> &mut Field {
        self.current.get_or_insert_with(Field::default)
    }

    fn close(&mut self) {
        if let Some(field) = self.current.take() {
            self.fields.push(field);
        }
    }

    fn push_unsplit(&mut self, value: &str, origin: Origin) {
        self.after_whitespace = false;
        let field = self.open();
        field.text.push_str(value);
        if origin == Origin::Quoted {
            field.pattern.push_str(&escape_glob(value));
        } else {
            field.pattern.push_str(value);
        }
    }

    fn push_split(&mut self, value: &str) {
        for ch in value.chars() {
            if !self.ifs.contains(ch) {
                self.after_whitespace = false;
                let field = self.open();
                field.text.push(ch);
                field.pattern.push(ch);
            } else if is_ifs_whitespace(ch) {
                if self.current.is_some() {
                    self.close();
                    self.after_whitespace = true;
                }
            } else {
                if self.current.is_some() {
                    self.close();
                } else if !self.after_whitespace {
                    self.fields.push(Field::default());
                }
                self.after_whitespace = false;
            }
        }
    }
}

/// Split segments into fields. With `split` false every expansion result is
/// treated as if it were quoted for splitting purposes (but stays
/// glob-active).
pub fn split_fields(segments: &[Segment], ifs: &str, split: bool) -> Vec<Field> {
    let mut splitter = Splitter { ifs, fields: Vec::new(), current: None, after_whitespace: false };
    for segment in segments {
        match segment {
            Segment::Text(value, Origin::Expanded) if split && !ifs.is_empty() => splitter.push_split(value),
            Segment::Text(value, Origin::Expanded) => {
                if !value.is_empty() {
                    splitter.push_unsplit(value, Origin::Expanded);
                }
            }
            Segment::Text(value, origin) => splitter.push_unsplit(value, *origin),
            Segment::Break => {
                splitter.close();
                splitter.after_whitespace = false;
            }
        }
    }
    splitter.close();
    splitter.fields
}

/// Split a line for `read`: leading and trailing IFS whitespace is dropped
/// and the last of `max_fields` fields receives the unsplit remainder.
/// `max_fields` of zero means no limit.
pub fn split_for_read(line: &str, ifs: &str, max_fields: usize) -> Vec<String> {
    let is_delim = |c: char| ifs.contains(c);
    let is_ws = |c: char| is_delim(c) && is_ifs_whitespace(c);
    let chars: Vec<char> = line.chars().collect();
    let mut fields = Vec::new();
    let mut i = 0;
    while i < chars.len() && is_ws(chars[i]) {
        i += 1;
    }
    while i < chars.len() {
        if max_fields > 0 && fields.len() + 1 == max_fields {
            let rest: String = chars[i..].iter().collect();
            fields.push(rest.trim_end_matches(is_ws).to_string());
            return fields;
        }
        let start = i;
        while i < chars.len() && !is_delim(chars[i]) {
            i += 1;
        }
        fields.push(chars[start..i].iter().collect());
        while i < chars.len() && is_ws(chars[i]) {
            i += 1;
        }
        if i < chars.len() && !is_ws(chars[i]) && is_delim(chars[i]) {
            i += 1;
            while i < chars.len() && is_ws(chars[i]) {
                i += 1;
            }
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(fields: Vec<Field>) -> Vec<String> {
        fields.into_iter().map(|f| f.text).collect()
    }

    fn expanded(value: &str) -> Segment {
        Segment::Text(value.to_string(), Origin::Expanded)
    }

    fn quoted(value: &str) -> Segment {
        Segment::Text(value.to_string(), Origin::Quoted)
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(texts(split_fields(&[expanded("  a   b  ")], DEFAULT_IFS, true)), vec!["a", "b"]);
    }

    #[test]
    fn test_non_whitespace_delimiters() {
        assert_eq!(texts(split_fields(&[expanded("a::b")], ":", true)), vec!["a", "", "b"]);
        assert_eq!(texts(split_fields(&[expanded(":a")], ":", true)), vec!["", "a"]);
        assert_eq!(texts(split_fields(&[expanded("a:")], ":", true)), vec!["a"]);
        assert_eq!(texts(split_fields(&[expanded("a : b")], " :", true)), vec!["a", "b"]);
    }

    #[test]
    fn test_quoted_joins_adjacent_field() {
        let segments = [expanded("1 2"), quoted("3 4")];
        assert_eq!(texts(split_fields(&segments, DEFAULT_IFS, true)), vec!["1", "23 4"]);
    }

    #[test]
    fn test_empty_expansion_vanishes() {
        assert!(split_fields(&[expanded("")], DEFAULT_IFS, true).is_empty());
        assert_eq!(texts(split_fields(&[quoted("")], DEFAULT_IFS, true)), vec![""]);
    }

    #[test]
    fn test_breaks() {
        let segments = [quoted("a"), Segment::Break, quoted(""), Segment::Break, quoted("c")];
        assert_eq!(texts(split_fields(&segments, DEFAULT_IFS, true)), vec!["a", "", "c"]);
    }

    #[test]
    fn test_quoted_pattern_is_escaped() {
        let fields = split_fields(&[Segment::Text("*".into(), Origin::Literal), quoted("*")], DEFAULT_IFS, true);
        assert_eq!(fields[0].pattern, "*\\*");
    }

    #[test]
    fn test_read_split() {
        assert_eq!(split_for_read("  a b  c  ", DEFAULT_IFS, 2), vec!["a", "b  c"]);
        assert_eq!(split_for_read("a:b:c", ":", 0), vec!["a", "b", "c"]);
        assert_eq!(split_for_read("one", DEFAULT_IFS, 3), vec!["one"]);
        assert_eq!(split_for_read(" x ", "", 1), vec![" x "]);
    }
}

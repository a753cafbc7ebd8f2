//! Parameter Expansion
//!
//! Resolves `$name` / `${...}` to a value (scalar, list, or unset) and
//! applies the operator: defaults, assignment, error, alternative,
//! substring, pattern removal and replacement, case conversion and the
//! `@` transforms. List values keep their element boundaries so that
//! `"$@"` and `"${a[@]}"` yield one field per element.

use rand::Rng;

use crate::ast::printer::{print_parameter, quote_single};
use crate::ast::types::*;
use crate::interpreter::environment::{ElementKey, Value};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::expansion::word_split::{Origin, Segment};
use crate::interpreter::runner::{ExecResult, Runner};
use crate::parser::lexer::is_valid_name;
use crate::parser::word_parser::decode_ansi_c;
use crate::parser::{parse_word_with, WordMode};
use crate::shell::pattern::{self, Anchor, Pattern, PatternOptions};

/// The value of a parameter before its operator is applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParamValue {
    Unset,
    Scalar(String),
    /// `$@`, `$*`, `${a[@]}`, `${a[*]}`; `star` joins quoted elements.
    List { items: Vec<String>, star: bool },
}

impl ParamValue {
    fn is_unset(&self) -> bool {
        match self {
            ParamValue::Unset => true,
            ParamValue::Scalar(_) => false,
            ParamValue::List { items, .. } => items.is_empty(),
        }
    }

    fn is_null(&self) -> bool {
        match self {
            ParamValue::Unset => true,
            ParamValue::Scalar(s) => s.is_empty(),
            ParamValue::List { items, .. } => items.iter().all(String::is_empty),
        }
    }

    /// Apply `f` to the scalar or to every element.
    fn map<F>(self, mut f: F) -> ExecResult<ParamValue>
    where
        F: FnMut(String) -> ExecResult<String>,
    {
        Ok(match self {
            ParamValue::Unset => ParamValue::Unset,
            ParamValue::Scalar(s) => ParamValue::Scalar(f(s)?),
            ParamValue::List { items, star } => ParamValue::List {
                items: items.into_iter().map(f).collect::<ExecResult<Vec<_>>>()?,
                star,
            },
        })
    }
}

/// True for expansions that may produce zero fields inside double quotes.
pub(crate) fn is_list_expansion(p: &ParameterExpansion) -> bool {
    !p.length
        && (p.name == "@"
            || matches!(p.index, Some(Subscript::All))
            || matches!(p.operation, Some(ParameterOperation::NamePrefix { star: false })))
}

fn is_special(name: &str) -> bool {
    matches!(name, "@" | "*" | "#" | "?" | "$" | "!" | "-") || name.chars().all(|c| c.is_ascii_digit())
}

fn change_case(text: &str, upper: bool, all: bool, matcher: Option<&Pattern>) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        let selected = (all || i == 0) && matcher.map_or(true, |m| m.is_match(&c.to_string()));
        if selected {
            if upper {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Resolve the start of a slice; `None` when out of range.
fn slice_start(offset: i64, len: usize) -> Option<usize> {
    let start = if offset < 0 { len as i64 + offset } else { offset };
    if start < 0 || start as usize > len {
        None
    } else {
        Some(start as usize)
    }
}

impl Runner {
    pub(crate) fn expand_parameter(
        &mut self,
        p: &ParameterExpansion,
        quoted: bool,
        out: &mut Vec<Segment>,
    ) -> ExecResult<()> {
        if let Some(ParameterOperation::NamePrefix { star }) = &p.operation {
            let items: Vec<String> = self.variable_names().into_iter().filter(|n| n.starts_with(&p.name)).collect();
            self.emit(ParamValue::List { items, star: *star }, quoted, out);
            return Ok(());
        }
        if let Some(ParameterOperation::Invalid(text)) = &p.operation {
            return Err(InterpreterError::BadSubstitution(text.clone()));
        }

        let (name, value) = self.resolve_parameter(p)?;

        if p.length {
            let length = match &value {
                ParamValue::Unset => {
                    if self.options.nounset && !is_special(&name) {
                        return Err(InterpreterError::Nounset(name));
                    }
                    0
                }
                ParamValue::Scalar(s) => s.chars().count(),
                ParamValue::List { items, .. } => items.len(),
            };
            out.push(Segment::Text(length.to_string(), self.origin(quoted)));
            return Ok(());
        }

        let tolerant = matches!(
            p.operation,
            Some(
                ParameterOperation::Default { .. }
                    | ParameterOperation::Assign { .. }
                    | ParameterOperation::Error { .. }
                    | ParameterOperation::Alternative { .. }
            )
        );
        if matches!(value, ParamValue::Unset) && self.options.nounset && !tolerant {
            return Err(InterpreterError::Nounset(name));
        }

        let Some(operation) = &p.operation else {
            self.emit(value, quoted, out);
            return Ok(());
        };

        match operation {
            ParameterOperation::Default { word, check_empty } => {
                if value.is_unset() || (*check_empty && value.is_null()) {
                    self.word_segments(&word.parts, quoted, out)?;
                } else {
                    self.emit(value, quoted, out);
                }
            }
            ParameterOperation::Alternative { word, check_empty } => {
                if !(value.is_unset() || (*check_empty && value.is_null())) {
                    self.word_segments(&word.parts, quoted, out)?;
                }
            }
            ParameterOperation::Assign { word, check_empty } => {
                if value.is_unset() || (*check_empty && value.is_null()) {
                    if is_special(&name) || p.indirect {
                        return Err(InterpreterError::Expansion(format!("${}: cannot assign in this way", name)));
                    }
                    let text = self.expand_word_string(word)?;
                    match &p.index {
                        Some(Subscript::Expr(index)) => {
                            let key = self.element_key(&name, index)?;
                            self.env
                                .set_element(&name, key, text.clone(), self.limits.max_nameref_depth)
                                .map_err(InterpreterError::Runtime)?;
                        }
                        _ => self.set_var(&name, text.clone())?,
                    }
                    out.push(Segment::Text(text, self.origin(quoted)));
                } else {
                    self.emit(value, quoted, out);
                }
            }
            ParameterOperation::Error { word, check_empty } => {
                if value.is_unset() || (*check_empty && value.is_null()) {
                    let message = match word {
                        Some(word) => self.expand_word_string(word)?,
                        None if *check_empty => "parameter null or not set".to_string(),
                        None => "parameter not set".to_string(),
                    };
                    return Err(InterpreterError::Expansion(format!("{}: {}", name, message)));
                }
                self.emit(value, quoted, out);
            }
            ParameterOperation::Substring { offset, length } => {
                let offset = self.eval_arith(offset)?;
                let length = match length {
                    Some(expr) => Some(self.eval_arith(expr)?),
                    None => None,
                };
                let sliced = self.substring(&name, value, offset, length)?;
                self.emit(sliced, quoted, out);
            }
            ParameterOperation::RemovePattern { pattern: word, suffix, longest } => {
                let matcher = self.compile_pattern(word)?;
                let value = value.map(|s| {
                    Ok(if *suffix {
                        pattern::remove_suffix(&s, &matcher, *longest).to_string()
                    } else {
                        pattern::remove_prefix(&s, &matcher, *longest).to_string()
                    })
                })?;
                self.emit(value, quoted, out);
            }
            ParameterOperation::Replace { pattern: word, replacement, all, anchor } => {
                let source = self.expand_word_pattern(word)?;
                let replacement = match replacement {
                    Some(r) => self.expand_word_string(r)?,
                    None => String::new(),
                };
                let matcher = Pattern::new(&source, self.pattern_options());
                let anchor = match anchor {
                    Some(PatternAnchor::Start) => Anchor::Start,
                    Some(PatternAnchor::End) => Anchor::End,
                    None => Anchor::Anywhere,
                };
                let value = value.map(|s| {
                    Ok(match (source.is_empty(), anchor) {
                        (true, Anchor::Start) => format!("{}{}", replacement, s),
                        (true, Anchor::End) => format!("{}{}", s, replacement),
                        (true, Anchor::Anywhere) => s,
                        (false, anchor) => pattern::replace(&s, &matcher, &replacement, *all, anchor),
                    })
                })?;
                self.emit(value, quoted, out);
            }
            ParameterOperation::CaseConvert { upper, all, pattern: word } => {
                let matcher = match word {
                    Some(word) => Some(self.compile_pattern(word)?),
                    None => None,
                };
                let value = value.map(|s| Ok(change_case(&s, *upper, *all, matcher.as_ref())))?;
                self.emit(value, quoted, out);
            }
            ParameterOperation::Transform(op) => {
                let value = self.transform(&name, value, *op, p)?;
                self.emit(value, quoted, out);
            }
            ParameterOperation::NamePrefix { .. } | ParameterOperation::Invalid(_) => {}
        }
        Ok(())
    }

    fn origin(&self, quoted: bool) -> Origin {
        if quoted {
            Origin::Quoted
        } else {
            Origin::Expanded
        }
    }

    pub(crate) fn pattern_options(&self) -> PatternOptions {
        PatternOptions { extglob: self.shopt.extglob, nocase: false }
    }

    fn compile_pattern(&mut self, word: &WordNode) -> ExecResult<Pattern> {
        let source = self.expand_word_pattern(word)?;
        Ok(Pattern::new(&source, self.pattern_options()))
    }

    /// Append the segments for a value.
    fn emit(&self, value: ParamValue, quoted: bool, out: &mut Vec<Segment>) {
        match value {
            ParamValue::Unset => out.push(Segment::Text(String::new(), self.origin(quoted))),
            ParamValue::Scalar(s) => out.push(Segment::Text(s, self.origin(quoted))),
            ParamValue::List { items, star: true } if quoted => {
                let separator = match self.get_var("IFS") {
                    None => " ".to_string(),
                    Some(ifs) => ifs.chars().next().map(String::from).unwrap_or_default(),
                };
                out.push(Segment::Text(items.join(&separator), Origin::Quoted));
            }
            ParamValue::List { items, .. } => {
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        out.push(Segment::Break);
                    }
                    out.push(Segment::Text(item, self.origin(quoted)));
                }
            }
        }
    }

    /// Name and value a parameter refers to, following `${!name}`.
    fn resolve_parameter(&mut self, p: &ParameterExpansion) -> ExecResult<(String, ParamValue)> {
        if !p.indirect {
            let value = self.param_value(&p.name, p.index.as_ref())?;
            return Ok((p.name.clone(), value));
        }

        // ${!a[@]} lists keys
        if matches!(p.index, Some(Subscript::All | Subscript::Star)) {
            let keys = self.env.value(&p.name, self.limits.max_nameref_depth).map(Value::keys).unwrap_or_default();
            let star = matches!(p.index, Some(Subscript::Star));
            return Ok((p.name.clone(), ParamValue::List { items: keys, star }));
        }

        if let Some(var) = self.env.get(&p.name) {
            if var.nameref {
                let target = var.value.as_ref().and_then(Value::scalar).unwrap_or_default().to_string();
                return Ok((p.name.clone(), ParamValue::Scalar(target)));
            }
        }

        let target = match self.param_value(&p.name, p.index.as_ref())? {
            ParamValue::Scalar(s) if !s.is_empty() => s,
            _ => return Err(InterpreterError::Expansion(format!("{}: invalid indirect expansion", p.name))),
        };
        let (name, index) = match target.find('[') {
            Some(open) if target.ends_with(']') => {
                let inner = &target[open + 1..target.len() - 1];
                let index = match inner {
                    "@" => Subscript::All,
                    "*" => Subscript::Star,
                    _ => Subscript::Expr(parse_word_with(inner, WordMode::PLAIN, 1, 1)?),
                };
                (target[..open].to_string(), Some(index))
            }
            _ => (target.clone(), None),
        };
        if !is_valid_name(&name) && !is_special(&name) {
            return Err(InterpreterError::BadSubstitution(target));
        }
        let value = self.param_value(&name, index.as_ref())?;
        Ok((name, value))
    }

    /// Look up a parameter without applying any operator.
    pub(crate) fn param_value(&mut self, name: &str, index: Option<&Subscript>) -> ExecResult<ParamValue> {
        let scalar = |s: String| -> ExecResult<ParamValue> { Ok(ParamValue::Scalar(s)) };
        match name {
            "@" | "*" => {
                return Ok(ParamValue::List { items: self.positional.clone(), star: name == "*" });
            }
            "#" => return scalar(self.positional.len().to_string()),
            "?" => return scalar(self.last_status.to_string()),
            "$" => return scalar(std::process::id().to_string()),
            "!" => {
                return Ok(match self.last_background {
                    Some(id) => ParamValue::Scalar(id.to_string()),
                    None => ParamValue::Unset,
                })
            }
            "-" => return scalar(self.options.flags()),
            "0" => return scalar(self.script_name.clone()),
            "RANDOM" if self.env.get("RANDOM").is_none() => {
                return scalar(rand::thread_rng().gen_range(0..32768).to_string());
            }
            _ => {}
        }
        if let Ok(n) = name.parse::<usize>() {
            return Ok(match self.positional.get(n.wrapping_sub(1)) {
                Some(value) => ParamValue::Scalar(value.clone()),
                None => ParamValue::Unset,
            });
        }

        let depth = self.limits.max_nameref_depth;
        self.env.resolve_name(name, depth).map_err(InterpreterError::Expansion)?;
        match index {
            None => Ok(match self.env.value(name, depth).and_then(Value::scalar) {
                Some(s) => ParamValue::Scalar(s.to_string()),
                None => ParamValue::Unset,
            }),
            Some(subscript @ (Subscript::All | Subscript::Star)) => Ok(ParamValue::List {
                items: self.env.value(name, depth).map(Value::elements).unwrap_or_default(),
                star: matches!(subscript, Subscript::Star),
            }),
            Some(Subscript::Expr(word)) => {
                let key = self.element_key(name, word)?;
                Ok(match self.element_value(name, &key) {
                    Some(s) => ParamValue::Scalar(s),
                    None => ParamValue::Unset,
                })
            }
        }
    }

    /// Evaluate a subscript: a string key for associative arrays, an
    /// arithmetic index otherwise. Negative indices count from the end.
    pub(crate) fn element_key(&mut self, name: &str, index: &WordNode) -> ExecResult<ElementKey> {
        let depth = self.limits.max_nameref_depth;
        if matches!(self.env.value(name, depth), Some(Value::Assoc(_))) {
            return Ok(ElementKey::Key(self.expand_word_string(index)?));
        }
        let text = self.expand_word_string(index)?;
        let mut i = self.eval_arith_text(&text)?;
        if i < 0 {
            let end = match self.env.value(name, depth) {
                Some(Value::Indexed(map)) => map.keys().next_back().map_or(0, |k| k + 1),
                Some(Value::Scalar(_)) => 1,
                _ => 0,
            };
            i += end;
            if i < 0 {
                return Err(InterpreterError::Expansion(format!("{}[{}]: bad array subscript", name, text)));
            }
        }
        Ok(ElementKey::Index(i))
    }

    pub(crate) fn element_value(&self, name: &str, key: &ElementKey) -> Option<String> {
        match (self.env.value(name, self.limits.max_nameref_depth)?, key) {
            (Value::Scalar(s), ElementKey::Index(0)) => Some(s.clone()),
            (Value::Indexed(map), ElementKey::Index(i)) => map.get(i).cloned(),
            (Value::Assoc(map), ElementKey::Key(k)) => map.get(k).cloned(),
            (Value::Assoc(map), ElementKey::Index(i)) => map.get(&i.to_string()).cloned(),
            _ => None,
        }
    }

    fn substring(&self, name: &str, value: ParamValue, offset: i64, length: Option<i64>) -> ExecResult<ParamValue> {
        let negative_length = || InterpreterError::Expansion(format!("{}: substring expression < 0", name));
        match value {
            ParamValue::Unset => Ok(ParamValue::Unset),
            ParamValue::Scalar(s) => {
                let chars: Vec<char> = s.chars().collect();
                let Some(start) = slice_start(offset, chars.len()) else {
                    return Ok(ParamValue::Scalar(String::new()));
                };
                let end = match length {
                    None => chars.len(),
                    Some(l) if l >= 0 => (start as i64 + l).min(chars.len() as i64) as usize,
                    Some(l) => {
                        let end = chars.len() as i64 + l;
                        if end < start as i64 {
                            return Err(negative_length());
                        }
                        end as usize
                    }
                };
                Ok(ParamValue::Scalar(chars[start..end].iter().collect()))
            }
            ParamValue::List { items, star } => {
                // ${@:0} starts at $0
                let items = if name == "@" || name == "*" {
                    std::iter::once(self.script_name.clone()).chain(items).collect()
                } else {
                    items
                };
                let Some(start) = slice_start(offset, items.len()) else {
                    return Ok(ParamValue::List { items: Vec::new(), star });
                };
                let end = match length {
                    None => items.len(),
                    Some(l) if l >= 0 => (start + l as usize).min(items.len()),
                    Some(_) => return Err(negative_length()),
                };
                Ok(ParamValue::List { items: items[start..end].to_vec(), star })
            }
        }
    }

    fn transform(&self, name: &str, value: ParamValue, op: char, p: &ParameterExpansion) -> ExecResult<ParamValue> {
        match op {
            'Q' => value.map(|s| Ok(quote_single(&s))),
            'U' => value.map(|s| Ok(s.to_uppercase())),
            'L' => value.map(|s| Ok(s.to_lowercase())),
            'u' => value.map(|s| Ok(change_case(&s, true, false, None))),
            'E' => value.map(|s| Ok(decode_ansi_c(&s.chars().collect::<Vec<_>>()))),
            'a' => {
                let flags = self.attribute_flags(name);
                value.map(|_| Ok(flags.clone()))
            }
            _ => Err(InterpreterError::BadSubstitution(print_parameter(p))),
        }
    }

    /// `declare`-style attribute letters of a variable.
    pub(crate) fn attribute_flags(&self, name: &str) -> String {
        let Some(var) = self.env.get(name) else {
            return String::new();
        };
        let mut flags = String::new();
        match &var.value {
            Some(Value::Indexed(_)) => flags.push('a'),
            Some(Value::Assoc(_)) => flags.push('A'),
            _ => {}
        }
        for (set, flag) in [
            (var.integer, 'i'),
            (var.lowercase, 'l'),
            (var.nameref, 'n'),
            (var.readonly, 'r'),
            (var.uppercase, 'u'),
            (var.exported, 'x'),
        ] {
            if set {
                flags.push(flag);
            }
        }
        flags
    }
}

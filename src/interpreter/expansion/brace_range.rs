//! Brace Expansion
//!
//! Structural expansion that runs before every other step: `{a,b}` lists
//! (nested), numeric `{1..10..2}` and character `{a..e}` ranges. A word
//! with braces becomes several words; the rest of the pipeline expands
//! each one independently.

use crate::ast::types::{BraceItem, WordNode, WordPart};

/// Maximum elements a single range may produce.
const MAX_SAFE_RANGE_ITERATIONS: usize = 10000;

/// Expand a numeric range. A zero step counts as 1 and the sign of the
/// step is ignored: the range always runs from `start` towards `end`.
/// `width` > 0 zero-pads every element to that many characters.
pub fn expand_numeric_range(start: i64, end: i64, step: Option<i64>, width: usize) -> Vec<String> {
    let step = step.map(i64::unsigned_abs).filter(|s| *s != 0).unwrap_or(1);
    let mut results = Vec::new();
    let mut current = start as i128;
    let (end, step) = (end as i128, step as i128);
    while results.len() < MAX_SAFE_RANGE_ITERATIONS {
        if (start as i128 <= end && current > end) || (start as i128 > end && current < end) {
            break;
        }
        results.push(if width > 0 {
            format!("{:0width$}", current, width = width)
        } else {
            current.to_string()
        });
        if start as i128 <= end {
            current += step;
        } else {
            current -= step;
        }
    }
    results
}

/// Expand a character range such as `{a..e}` or `{z..a..2}`.
pub fn expand_char_range(start: char, end: char, step: Option<i64>) -> Vec<String> {
    let step = step.map(i64::unsigned_abs).filter(|s| *s != 0).unwrap_or(1) as u32;
    let (from, to) = (start as u32, end as u32);
    let mut results = Vec::new();
    let mut current = from;
    loop {
        if let Some(c) = char::from_u32(current) {
            results.push(c.to_string());
        }
        if results.len() >= MAX_SAFE_RANGE_ITERATIONS {
            break;
        }
        if from <= to {
            match current.checked_add(step) {
                Some(next) if next <= to => current = next,
                _ => break,
            }
        } else {
            match current.checked_sub(step) {
                Some(next) if next >= to => current = next,
                _ => break,
            }
        }
    }
    results
}

fn item_alternatives(item: &BraceItem) -> Vec<Vec<WordPart>> {
    match item {
        BraceItem::Word(word) => expand_braces(word).into_iter().map(|w| w.parts).collect(),
        BraceItem::NumberRange { start, end, step, width } => expand_numeric_range(*start, *end, *step, *width)
            .into_iter()
            .map(|s| vec![WordPart::Literal(s)])
            .collect(),
        BraceItem::CharRange { start, end, step } => expand_char_range(*start, *end, *step)
            .into_iter()
            .map(|s| vec![WordPart::Literal(s)])
            .collect(),
    }
}

/// Expand every brace group in `word`, left to right.
pub fn expand_braces(word: &WordNode) -> Vec<WordNode> {
    if !word.parts.iter().any(|p| matches!(p, WordPart::BraceExpansion(_))) {
        return vec![word.clone()];
    }
    let mut words: Vec<Vec<WordPart>> = vec![Vec::new()];
    for part in &word.parts {
        match part {
            WordPart::BraceExpansion(brace) => {
                let alternatives: Vec<Vec<WordPart>> = brace.items.iter().flat_map(item_alternatives).collect();
                let mut next = Vec::with_capacity(words.len() * alternatives.len().max(1));
                for prefix in &words {
                    for alternative in &alternatives {
                        let mut combined = prefix.clone();
                        combined.extend(alternative.iter().cloned());
                        next.push(combined);
                    }
                }
                words = next;
            }
            other => {
                for w in &mut words {
                    w.push(other.clone());
                }
            }
        }
    }
    words.into_iter().map(WordNode::new).collect()
}

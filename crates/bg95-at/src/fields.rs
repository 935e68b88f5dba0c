//! Field extraction helpers for command parsers.
//!
//! Data lines look like `+NAME: 0,"host",1883` or, for test responses,
//! `+NAME: (0-5),(1-65535),"<topic>"`. Commas inside quotes or parentheses
//! do not separate fields.

use std::str::FromStr;

use crate::codec::lines;
use crate::responses::data_prefix;

/// Get the payload of the first complete `+<name>:` line, trimmed.
pub fn payload<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    payloads(raw, name).into_iter().next()
}

/// Get the payloads of every complete `+<name>:` line, in order.
pub fn payloads<'a>(raw: &'a str, name: &str) -> Vec<&'a str> {
    let prefix = data_prefix(name);
    lines(raw.as_bytes())
        .filter(|line| line.complete && line.starts_with(prefix.as_bytes()))
        .filter_map(|line| {
            // Line boundaries are ASCII, so these offsets are char boundaries
            let start = line.offset + prefix.len();
            let end = line.offset + line.text.len();
            raw.get(start..end).map(str::trim)
        })
        .collect()
}

/// Split a payload into fields on commas outside quotes and parentheses.
///
/// Fields are trimmed; an empty payload yields no fields.
pub fn split_fields(payload: &str) -> Vec<&str> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in payload.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                fields.push(payload[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(payload[start..].trim());

    fields
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
}

/// Parse a numeric field, `None` when empty or malformed.
pub fn parse_number<T: FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

/// Parse a numeric field and keep it only if `valid` accepts it.
pub fn parse_number_in<T, F>(field: Option<&str>, valid: F) -> Option<T>
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    field.and_then(parse_number).filter(|v| valid(v))
}

/// An inclusive range as reported by a test command, e.g. `(0-5)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    /// Lower bound.
    pub min: i64,
    /// Upper bound.
    pub max: i64,
}

impl CodeRange {
    /// Check whether a value lies in the range.
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Items of a parenthesised list: `(0-31,99)` yields `["0-31", "99"]`.
///
/// Returns `None` if the field is not parenthesised.
pub fn paren_items(field: &str) -> Option<Vec<&str>> {
    let inner = field.trim().strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
}

/// Parse one list item as a range; a single value is a one-element range.
pub fn parse_range_item(item: &str) -> Option<CodeRange> {
    let item = item.trim();
    // Skip a leading minus so "-1-5" splits on the separator
    let split_from = usize::from(item.starts_with('-'));
    match item[split_from..].find('-') {
        Some(pos) => {
            let pos = pos + split_from;
            let min = item[..pos].trim().parse().ok()?;
            let max = item[pos + 1..].trim().parse().ok()?;
            Some(CodeRange { min, max })
        }
        None => {
            let value = item.parse().ok()?;
            Some(CodeRange { min: value, max: value })
        }
    }
}

/// Parse a field holding a single parenthesised range, e.g. `(0-5)`.
pub fn parse_range(field: &str) -> Option<CodeRange> {
    match paren_items(field)?.as_slice() {
        [item] => parse_range_item(item),
        _ => None,
    }
}

/// Parse a parenthesised list of ranges and values, e.g. `(0-31,99)`.
pub fn parse_range_list(field: &str) -> Option<Vec<CodeRange>> {
    paren_items(field)?
        .into_iter()
        .map(parse_range_item)
        .collect()
}

/// Parse a parenthesised list of plain values, e.g. `(3,4)`.
pub fn parse_value_list(field: &str) -> Option<Vec<i64>> {
    paren_items(field)?
        .into_iter()
        .map(|item| item.parse().ok())
        .collect()
}

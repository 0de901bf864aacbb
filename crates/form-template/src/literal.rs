use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("number literal pattern"));

/// Recognizes a whole-string literal: quoted string, number, boolean or null.
pub fn read_literal(text: &str) -> Option<Value> {
    if let Some(value) = read_quoted(text) {
        return Some(Value::String(value));
    }
    match text {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "null" | "undefined" => return Some(Value::Null),
        _ => {}
    }
    if NUMBER.is_match(text) {
        return read_number(text);
    }
    None
}

fn read_number(text: &str) -> Option<Value> {
    if !text.contains('.')
        && let Ok(int) = text.parse::<i64>()
    {
        return Some(Value::Number(int.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Decodes `'...'` or `"..."` when the quotes enclose the entire text.
///
/// An unescaped copy of the delimiter inside the body means the text is not a
/// single literal (`'a' == 'b'`), so `None` is returned.
fn read_quoted(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    let body = &text[1..text.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                // trailing backslash escapes the closing quote
                None => return None,
            },
            c if c == quote => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

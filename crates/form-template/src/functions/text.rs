use serde_json::Value;

use super::{array_arg, at_least, between, exactly};
use crate::{
    error::EvaluationError,
    registry::FunctionResult,
    value::{number_value, stringify, to_number, type_name},
};

pub(super) fn concat(args: &[Value]) -> FunctionResult {
    Ok(Value::String(args.iter().map(stringify).collect()))
}

pub(super) fn length(args: &[Value]) -> FunctionResult {
    exactly("length", args, 1)?;
    let len = match &args[0] {
        Value::String(text) => text.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        other => {
            return Err(EvaluationError::mismatch(
                "length",
                format!("{} has no length", type_name(other)),
            ));
        }
    };
    Ok(Value::from(len))
}

/// Character-indexed slice; bounds are clamped and swapped when reversed.
pub(super) fn substring(args: &[Value]) -> FunctionResult {
    between("substring", args, 2, 3)?;
    let chars: Vec<char> = stringify(&args[0]).chars().collect();
    let clamp = |value: f64| value.trunc().clamp(0.0, chars.len() as f64) as usize;
    let start = clamp(to_number(&args[1])?);
    let end = match args.get(2) {
        Some(end) => clamp(to_number(end)?),
        None => chars.len(),
    };
    let (from, to) = if start <= end { (start, end) } else { (end, start) };
    Ok(Value::String(chars[from..to].iter().collect()))
}

pub(super) fn to_lower(args: &[Value]) -> FunctionResult {
    exactly("toLower", args, 1)?;
    Ok(Value::String(stringify(&args[0]).to_lowercase()))
}

pub(super) fn to_upper(args: &[Value]) -> FunctionResult {
    exactly("toUpper", args, 1)?;
    Ok(Value::String(stringify(&args[0]).to_uppercase()))
}

pub(super) fn trim(args: &[Value]) -> FunctionResult {
    exactly("trim", args, 1)?;
    Ok(Value::String(stringify(&args[0]).trim().to_string()))
}

pub(super) fn join(args: &[Value]) -> FunctionResult {
    between("join", args, 1, 2)?;
    let items = array_arg("join", &args[0])?;
    let separator = args.get(1).map(stringify).unwrap_or_else(|| ",".into());
    let joined = items.iter().map(stringify).collect::<Vec<_>>().join(&separator);
    Ok(Value::String(joined))
}

/// `%s %d %f %j` consume arguments left to right; a directive with no
/// argument left is emitted unchanged, `%%` is a literal percent.
pub(super) fn format(args: &[Value]) -> FunctionResult {
    at_least("format", args, 1)?;
    let pattern = stringify(&args[0]);
    let mut rest = args[1..].iter();
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let Some(&directive) = chars.peek() else {
            out.push('%');
            break;
        };
        match directive {
            '%' => {
                chars.next();
                out.push('%');
            }
            's' | 'd' | 'f' | 'j' => {
                chars.next();
                match rest.next() {
                    Some(arg) => out.push_str(&format_arg(directive, arg)?),
                    None => {
                        out.push('%');
                        out.push(directive);
                    }
                }
            }
            _ => out.push('%'),
        }
    }
    Ok(Value::String(out))
}

fn format_arg(directive: char, arg: &Value) -> Result<String, EvaluationError> {
    Ok(match directive {
        'd' => stringify(&number_value("format", to_number(arg)?.trunc())?),
        'f' => stringify(&number_value("format", to_number(arg)?)?),
        'j' => arg.to_string(),
        _ => stringify(arg),
    })
}

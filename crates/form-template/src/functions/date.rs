use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Timelike, Utc,
};
use serde_json::Value;

use super::{between, exactly};
use crate::{
    error::EvaluationError,
    registry::FunctionResult,
    value::{stringify, to_number},
};

const DEFAULT_PATTERN: &str = "yyyy-MM-dd";

/// Whether a date came in as a bare calendar date; `addDays` answers in kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    DateOnly,
    DateTime,
}

fn parse_date(value: &Value) -> Result<(DateTime<Utc>, Shape), EvaluationError> {
    let invalid = || EvaluationError::InvalidDate(stringify(value));
    match value {
        Value::String(text) => {
            let text = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Ok((parsed.with_timezone(&Utc), Shape::DateTime));
            }
            if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
                return Ok((parsed.and_utc(), Shape::DateTime));
            }
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?;
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
            Ok((midnight.and_utc(), Shape::DateOnly))
        }
        Value::Number(num) => num
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|parsed| (parsed, Shape::DateTime))
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

pub(super) fn now(args: &[Value]) -> FunctionResult {
    exactly("now", args, 0)?;
    Ok(Value::String(
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

pub(super) fn format_date(args: &[Value]) -> FunctionResult {
    between("formatDate", args, 1, 2)?;
    let (date, _) = parse_date(&args[0])?;
    let pattern = args
        .get(1)
        .map(stringify)
        .unwrap_or_else(|| DEFAULT_PATTERN.into());
    Ok(Value::String(render(&date, &pattern)))
}

/// Replaces `yyyy MM dd HH mm ss` tokens; every other character is copied.
fn render(date: &DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    while !rest.is_empty() {
        let token = [
            ("yyyy", format!("{:04}", date.year())),
            ("MM", format!("{:02}", date.month())),
            ("dd", format!("{:02}", date.day())),
            ("HH", format!("{:02}", date.hour())),
            ("mm", format!("{:02}", date.minute())),
            ("ss", format!("{:02}", date.second())),
        ]
        .into_iter()
        .find(|(token, _)| rest.starts_with(token));

        match token {
            Some((token, value)) => {
                out.push_str(&value);
                rest = &rest[token.len()..];
            }
            None => {
                let mut chars = rest.chars();
                if let Some(ch) = chars.next() {
                    out.push(ch);
                }
                rest = chars.as_str();
            }
        }
    }
    out
}

pub(super) fn add_days(args: &[Value]) -> FunctionResult {
    exactly("addDays", args, 2)?;
    let (date, shape) = parse_date(&args[0])?;
    let days = to_number(&args[1])?.trunc() as i64;
    let shifted = TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| EvaluationError::InvalidDate(format!("{} + {days} days", stringify(&args[0]))))?;
    let text = match shape {
        Shape::DateOnly => shifted.format("%Y-%m-%d").to_string(),
        Shape::DateTime => shifted.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    Ok(Value::String(text))
}

//! Coercion helpers shared by the evaluator and the function library.

use serde_json::{Number, Value};

use crate::error::EvaluationError;

/// Interpolation form of a value: strings verbatim, null as empty text,
/// containers as compact JSON.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(num) => number_to_string(num),
        other => other.to_string(),
    }
}

fn number_to_string(num: &Number) -> String {
    match num.as_f64() {
        Some(f) if num.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => num.to_string(),
    }
}

/// Null, false, zero, NaN and the empty string are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(num) => num.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Null or empty string, the values `??`, `default` and `coalesce` skip over.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// The single numeric gate: numbers pass, numeric strings parse, booleans map
/// to 0/1, everything else is a coercion error.
pub fn to_number(value: &Value) -> Result<f64, EvaluationError> {
    match value {
        Value::Number(num) => num.as_f64().ok_or_else(|| coercion_error(value)),
        Value::Bool(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(coercion_error(value));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| coercion_error(value))
        }
        _ => Err(coercion_error(value)),
    }
}

fn coercion_error(value: &Value) -> EvaluationError {
    EvaluationError::Coercion {
        value: value.to_string(),
        target: "number",
    }
}

/// Wraps an arithmetic result; integral values become JSON integers.
pub fn number_value(function: &str, result: f64) -> Result<Value, EvaluationError> {
    if !result.is_finite() {
        return Err(EvaluationError::mismatch(function, "result is not a finite number"));
    }
    if result.fract() == 0.0 && result >= i64::MIN as f64 && result <= i64::MAX as f64 {
        return Ok(Value::Number((result as i64).into()));
    }
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| EvaluationError::mismatch(function, "result is not a finite number"))
}

/// Short type label used in error messages and suggestions.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stringify_matches_interpolation_rules() {
        assert_eq!(stringify(&json!("a")), "a");
        assert_eq!(stringify(&json!(5)), "5");
        assert_eq!(stringify(&json!(5.0)), "5");
        assert_eq!(stringify(&json!(2.5)), "2.5");
        assert_eq!(stringify(&Value::Null), "");
        assert_eq!(stringify(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn to_number_gate() {
        assert_eq!(to_number(&json!(3)).unwrap(), 3.0);
        assert_eq!(to_number(&json!(" 4.5 ")).unwrap(), 4.5);
        assert_eq!(to_number(&json!(true)).unwrap(), 1.0);
        assert!(to_number(&json!("")).is_err());
        assert!(to_number(&json!("abc")).is_err());
        assert!(to_number(&Value::Null).is_err());
        assert!(to_number(&json!([1])).is_err());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
    }

    #[test]
    fn number_value_prefers_integers() {
        assert_eq!(number_value("add", 5.0).unwrap(), json!(5));
        assert_eq!(number_value("add", 0.5).unwrap(), json!(0.5));
        assert!(number_value("divide", f64::INFINITY).is_err());
    }
}

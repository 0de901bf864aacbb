use std::cmp::Ordering;

use serde_json::Value;

use super::{between, exactly};
use crate::{
    error::EvaluationError,
    registry::FunctionResult,
    value::{is_truthy, to_number},
};

pub(super) fn if_(args: &[Value]) -> FunctionResult {
    between("if", args, 2, 3)?;
    if is_truthy(&args[0]) {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(Value::Null))
    }
}

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (to_number(a), to_number(b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

pub(super) fn eq(args: &[Value]) -> FunctionResult {
    exactly("eq", args, 2)?;
    Ok(Value::Bool(loosely_equal(&args[0], &args[1])))
}

pub(super) fn ne(args: &[Value]) -> FunctionResult {
    exactly("ne", args, 2)?;
    Ok(Value::Bool(!loosely_equal(&args[0], &args[1])))
}

/// Numeric ordering when both sides coerce, string ordering when both are
/// strings, otherwise the coercion failure of the offending operand.
fn order(function: &str, args: &[Value]) -> Result<Ordering, EvaluationError> {
    exactly(function, args, 2)?;
    let (a, b) = (&args[0], &args[1]);
    match (to_number(a), to_number(b)) {
        (Ok(x), Ok(y)) => x
            .partial_cmp(&y)
            .ok_or_else(|| EvaluationError::mismatch(function, "numbers are not comparable")),
        (Err(err), _) | (_, Err(err)) => match (a, b) {
            (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
            _ => Err(err),
        },
    }
}

pub(super) fn gt(args: &[Value]) -> FunctionResult {
    Ok(Value::Bool(order("gt", args)? == Ordering::Greater))
}

pub(super) fn lt(args: &[Value]) -> FunctionResult {
    Ok(Value::Bool(order("lt", args)? == Ordering::Less))
}

pub(super) fn gte(args: &[Value]) -> FunctionResult {
    Ok(Value::Bool(order("gte", args)? != Ordering::Less))
}

pub(super) fn lte(args: &[Value]) -> FunctionResult {
    Ok(Value::Bool(order("lte", args)? != Ordering::Greater))
}

pub(super) fn and(args: &[Value]) -> FunctionResult {
    Ok(Value::Bool(args.iter().all(is_truthy)))
}

pub(super) fn or(args: &[Value]) -> FunctionResult {
    Ok(Value::Bool(args.iter().any(is_truthy)))
}

pub(super) fn not(args: &[Value]) -> FunctionResult {
    exactly("not", args, 1)?;
    Ok(Value::Bool(!is_truthy(&args[0])))
}

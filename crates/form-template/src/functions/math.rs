use serde_json::Value;

use super::{at_least, between, exactly};
use crate::{
    error::EvaluationError,
    registry::FunctionResult,
    value::{number_value, to_number},
};

fn fold(function: &str, args: &[Value], init: f64, op: fn(f64, f64) -> f64) -> FunctionResult {
    at_least(function, args, 2)?;
    let total = args
        .iter()
        .try_fold(init, |acc, arg| to_number(arg).map(|n| op(acc, n)))?;
    number_value(function, total)
}

fn pair(function: &str, args: &[Value]) -> Result<(f64, f64), EvaluationError> {
    exactly(function, args, 2)?;
    Ok((to_number(&args[0])?, to_number(&args[1])?))
}

pub(super) fn add(args: &[Value]) -> FunctionResult {
    fold("add", args, 0.0, |a, b| a + b)
}

pub(super) fn multiply(args: &[Value]) -> FunctionResult {
    fold("multiply", args, 1.0, |a, b| a * b)
}

pub(super) fn subtract(args: &[Value]) -> FunctionResult {
    let (a, b) = pair("subtract", args)?;
    number_value("subtract", a - b)
}

pub(super) fn divide(args: &[Value]) -> FunctionResult {
    let (a, b) = pair("divide", args)?;
    if b == 0.0 {
        return Err(EvaluationError::DivisionByZero {
            function: "divide".into(),
        });
    }
    number_value("divide", a / b)
}

pub(super) fn modulo(args: &[Value]) -> FunctionResult {
    let (a, b) = pair("mod", args)?;
    if b == 0.0 {
        return Err(EvaluationError::DivisionByZero {
            function: "mod".into(),
        });
    }
    number_value("mod", a % b)
}

pub(super) fn round(args: &[Value]) -> FunctionResult {
    between("round", args, 1, 2)?;
    let value = to_number(&args[0])?;
    let decimals = match args.get(1) {
        Some(arg) => to_number(arg)?.trunc().clamp(0.0, 15.0) as i32,
        None => 0,
    };
    let factor = 10f64.powi(decimals);
    number_value("round", (value * factor).round() / factor)
}

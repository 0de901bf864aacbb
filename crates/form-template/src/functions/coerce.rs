use serde_json::Value;

use super::exactly;
use crate::{
    registry::FunctionResult,
    value::{self, is_blank, is_truthy, number_value, stringify},
};

pub(super) fn to_string(args: &[Value]) -> FunctionResult {
    exactly("toString", args, 1)?;
    Ok(Value::String(stringify(&args[0])))
}

pub(super) fn to_number(args: &[Value]) -> FunctionResult {
    exactly("toNumber", args, 1)?;
    number_value("toNumber", value::to_number(&args[0])?)
}

pub(super) fn to_bool(args: &[Value]) -> FunctionResult {
    exactly("toBool", args, 1)?;
    let flag = match &args[0] {
        Value::String(text) => {
            let text = text.trim();
            !(text.is_empty() || text.eq_ignore_ascii_case("false") || text == "0")
        }
        other => is_truthy(other),
    };
    Ok(Value::Bool(flag))
}

pub(super) fn default(args: &[Value]) -> FunctionResult {
    exactly("default", args, 2)?;
    if is_blank(&args[0]) {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

pub(super) fn coalesce(args: &[Value]) -> FunctionResult {
    Ok(args
        .iter()
        .find(|arg| !is_blank(arg))
        .or(args.last())
        .cloned()
        .unwrap_or(Value::Null))
}

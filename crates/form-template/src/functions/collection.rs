use serde_json::Value;

use super::{array_arg, exactly};
use crate::registry::FunctionResult;

pub(super) fn first(args: &[Value]) -> FunctionResult {
    exactly("first", args, 1)?;
    Ok(array_arg("first", &args[0])?
        .first()
        .cloned()
        .unwrap_or(Value::Null))
}

pub(super) fn last(args: &[Value]) -> FunctionResult {
    exactly("last", args, 1)?;
    Ok(array_arg("last", &args[0])?
        .last()
        .cloned()
        .unwrap_or(Value::Null))
}

pub(super) fn count(args: &[Value]) -> FunctionResult {
    exactly("count", args, 1)?;
    Ok(Value::from(array_arg("count", &args[0])?.len()))
}

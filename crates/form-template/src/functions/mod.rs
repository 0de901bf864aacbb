//! Built-in function library. Every function is pure and receives its
//! arguments already evaluated.

mod coerce;
mod collection;
mod date;
mod logic;
mod math;
mod text;

use serde_json::Value;

use crate::{
    error::EvaluationError,
    registry::{FunctionInfo, FunctionResult, TemplateFunction, VariableRegistry},
};

type Builtin = fn(&[Value]) -> FunctionResult;

/// Name, signature, description and implementation of every built-in.
const BUILTINS: &[(&str, &str, &str, Builtin)] = &[
    // logic
    ("if", "if(condition, then, else)", "Pick a value based on a condition", logic::if_),
    ("eq", "eq(a, b)", "True when both values are equal", logic::eq),
    ("ne", "ne(a, b)", "True when the values differ", logic::ne),
    ("gt", "gt(a, b)", "True when a is greater than b", logic::gt),
    ("lt", "lt(a, b)", "True when a is less than b", logic::lt),
    ("gte", "gte(a, b)", "True when a is greater than or equal to b", logic::gte),
    ("lte", "lte(a, b)", "True when a is less than or equal to b", logic::lte),
    ("and", "and(a, b, ...)", "True when every argument is truthy", logic::and),
    ("or", "or(a, b, ...)", "True when any argument is truthy", logic::or),
    ("not", "not(value)", "Negate a value's truthiness", logic::not),
    // arithmetic
    ("add", "add(a, b, ...)", "Sum of the arguments", math::add),
    ("subtract", "subtract(a, b)", "Difference of two numbers", math::subtract),
    ("multiply", "multiply(a, b, ...)", "Product of the arguments", math::multiply),
    ("divide", "divide(a, b)", "Quotient of two numbers", math::divide),
    ("mod", "mod(a, b)", "Remainder of a divided by b", math::modulo),
    ("round", "round(value, decimals?)", "Round to the given number of decimals", math::round),
    // strings
    ("concat", "concat(a, b, ...)", "Join the arguments as text", text::concat),
    ("length", "length(value)", "Length of a string, array or object", text::length),
    ("substring", "substring(text, start, end?)", "Slice of a string", text::substring),
    ("toLower", "toLower(text)", "Lowercase text", text::to_lower),
    ("toUpper", "toUpper(text)", "Uppercase text", text::to_upper),
    ("trim", "trim(text)", "Strip surrounding whitespace", text::trim),
    ("join", "join(array, separator?)", "Join array items into text", text::join),
    ("format", "format(pattern, ...args)", "printf-style formatting with %s %d %f %j", text::format),
    // collections
    ("first", "first(array)", "First item of an array", collection::first),
    ("last", "last(array)", "Last item of an array", collection::last),
    ("count", "count(array)", "Number of items in an array", collection::count),
    // coercion
    ("toString", "toString(value)", "Convert a value to text", coerce::to_string),
    ("toNumber", "toNumber(value)", "Convert a value to a number", coerce::to_number),
    ("toBool", "toBool(value)", "Convert a value to a boolean", coerce::to_bool),
    ("default", "default(value, fallback)", "Fallback when value is null or empty", coerce::default),
    ("coalesce", "coalesce(a, b, ...)", "First non-empty argument", coerce::coalesce),
    // dates
    ("now", "now()", "Current UTC timestamp", date::now),
    ("formatDate", "formatDate(date, pattern?)", "Format a date (yyyy, MM, dd, HH, mm, ss)", date::format_date),
    ("addDays", "addDays(date, days)", "Shift a date by a number of days", date::add_days),
];

/// Installs the built-in library into `registry`.
pub fn register_builtins(registry: &mut VariableRegistry) {
    for (name, signature, description, function) in BUILTINS {
        registry.register_function_with_info(
            *name,
            FunctionInfo::new(*signature, *description),
            TemplateFunction::from_sync(*function),
        );
    }
}

/// Names of all built-in functions.
pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, ..)| *name)
}

fn exactly(function: &str, args: &[Value], count: usize) -> Result<(), EvaluationError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(EvaluationError::arity(
            function,
            format!("exactly {count}"),
            args.len(),
        ))
    }
}

fn at_least(function: &str, args: &[Value], min: usize) -> Result<(), EvaluationError> {
    if args.len() >= min {
        Ok(())
    } else {
        Err(EvaluationError::arity(
            function,
            format!("at least {min}"),
            args.len(),
        ))
    }
}

fn between(function: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvaluationError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(EvaluationError::arity(
            function,
            format!("{min} to {max}"),
            args.len(),
        ))
    }
}

fn array_arg<'a>(function: &str, value: &'a Value) -> Result<&'a Vec<Value>, EvaluationError> {
    value.as_array().ok_or_else(|| EvaluationError::NotAnArray {
        function: function.to_string(),
    })
}

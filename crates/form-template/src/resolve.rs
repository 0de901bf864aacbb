use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    context::TemplateContext, engine::TemplateEngine, error::TemplateError,
    parser::contains_template,
};

/// What to do when one template inside a document fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Fail the whole resolution on the first error.
    #[default]
    Strict,
    /// Keep the raw template text and carry on.
    Lenient,
}

/// Walks `document` and replaces every string containing `${` with its
/// evaluated value. Keys and plain strings are left untouched.
pub fn resolve_document(
    engine: &TemplateEngine,
    document: &Value,
    ctx: &TemplateContext,
    mode: ResolutionMode,
) -> Result<Value, TemplateError> {
    resolve_at(engine, document, ctx, mode, "")
}

fn resolve_at(
    engine: &TemplateEngine,
    value: &Value,
    ctx: &TemplateContext,
    mode: ResolutionMode,
    pointer: &str,
) -> Result<Value, TemplateError> {
    match value {
        Value::String(raw) if contains_template(raw) => match engine.evaluate(raw, ctx) {
            Ok(resolved) => Ok(resolved),
            Err(error) => match mode {
                ResolutionMode::Strict => Err(error),
                ResolutionMode::Lenient => {
                    warn!(%pointer, %error, "template left unresolved");
                    Ok(value.clone())
                }
            },
        },
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| resolve_at(engine, item, ctx, mode, &format!("{pointer}/{index}")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, child) in map {
                let child_pointer = format!("{pointer}/{key}");
                resolved.insert(
                    key.clone(),
                    resolve_at(engine, child, ctx, mode, &child_pointer)?,
                );
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

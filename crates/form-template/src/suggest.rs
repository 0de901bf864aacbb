//! Autocomplete index built from registry contents.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::VariableRegistry;

pub const DEFAULT_SUGGESTION_DEPTH: usize = 5;
const SAMPLE_TEXT_LIMIT: usize = 20;
const SAMPLE_KEYS: usize = 3;
const ELLIPSIS: &str = "...";

static INDEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").expect("index pattern"));
static ELEMENT_ACCESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+\[\d+\])\.$").expect("element access pattern"));
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$")
        .expect("iso date pattern")
});

/// Element type and sample access path of an array-valued suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArrayInfo {
    pub item_type: String,
    pub sample_access: String,
}

/// One addressable path or function offered to editor tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariableSuggestion {
    pub expr: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    pub is_nested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_info: Option<ArrayInfo>,
    pub is_function: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// `string|number|boolean|null|date|object|array<T>`.
pub fn infer_type(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(_) => "number".into(),
        Value::String(text) if ISO_DATE.is_match(text) => "date".into(),
        Value::String(_) => "string".into(),
        Value::Object(_) => "object".into(),
        Value::Array(items) => match items.first() {
            Some(first) => format!("array<{}>", infer_type(first)),
            None => "array<unknown>".into(),
        },
    }
}

/// Truncated preview of a value.
pub fn sample(value: &Value) -> Value {
    match value {
        Value::String(text) if text.chars().count() > SAMPLE_TEXT_LIMIT => {
            let head: String = text.chars().take(SAMPLE_TEXT_LIMIT).collect();
            Value::String(format!("{head}{ELLIPSIS}"))
        }
        Value::Array(items) => match items.first() {
            Some(first) => Value::Array(vec![sample(first), Value::String(ELLIPSIS.into())]),
            None => Value::Array(Vec::new()),
        },
        Value::Object(map) => {
            let mut preview: Map<String, Value> = map
                .iter()
                .take(SAMPLE_KEYS)
                .map(|(key, child)| (key.clone(), sample(child)))
                .collect();
            if map.len() > SAMPLE_KEYS {
                preview.insert(ELLIPSIS.into(), Value::String(ELLIPSIS.into()));
            }
            Value::Object(preview)
        }
        other => other.clone(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SuggestionGenerator {
    max_depth: usize,
}

impl Default for SuggestionGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SUGGESTION_DEPTH)
    }
}

impl SuggestionGenerator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Flat list: variables (sorted, with nested paths) followed by functions (sorted).
    pub fn generate(&self, registry: &VariableRegistry) -> Vec<VariableSuggestion> {
        let mut out = Vec::new();

        let mut variables: Vec<_> = registry.variables().collect();
        variables.sort_by(|a, b| a.0.cmp(b.0));
        for (name, value) in variables {
            self.collect(name.clone(), value, "Registered variable".into(), false, 0, &mut out);
        }

        let mut functions: Vec<_> = registry.function_names().collect();
        functions.sort();
        for name in functions {
            let (signature, description) = match registry.function_info(name) {
                Some(info) => (info.signature.clone(), info.description.clone()),
                None => (format!("{name}(...)"), "Custom function".to_string()),
            };
            out.push(VariableSuggestion {
                expr: name.clone(),
                value_type: "function".into(),
                description,
                value: None,
                children: None,
                is_nested: false,
                array_info: None,
                is_function: true,
                signature: Some(signature),
            });
        }
        out
    }

    fn collect(
        &self,
        expr: String,
        value: &Value,
        description: String,
        is_nested: bool,
        depth: usize,
        out: &mut Vec<VariableSuggestion>,
    ) {
        let mut suggestion = VariableSuggestion {
            expr: expr.clone(),
            value_type: infer_type(value),
            description,
            value: Some(sample(value)),
            children: None,
            is_nested,
            array_info: None,
            is_function: false,
            signature: None,
        };
        let descend = depth < self.max_depth;

        match value {
            Value::Object(map) => {
                suggestion.children =
                    Some(map.keys().map(|key| format!("{expr}.{key}")).collect());
                out.push(suggestion);
                if descend {
                    for (key, child) in map {
                        self.collect(
                            format!("{expr}.{key}"),
                            child,
                            format!("Property of {expr}"),
                            true,
                            depth + 1,
                            out,
                        );
                    }
                }
            }
            Value::Array(items) => {
                let sample_access = format!("{expr}[0]");
                suggestion.array_info = Some(ArrayInfo {
                    item_type: items
                        .first()
                        .map(infer_type)
                        .unwrap_or_else(|| "unknown".into()),
                    sample_access: sample_access.clone(),
                });
                out.push(suggestion);
                if descend && let Some(first) = items.first() {
                    self.collect(
                        sample_access,
                        first,
                        format!("First item of {expr}"),
                        true,
                        depth + 1,
                        out,
                    );
                }
            }
            _ => out.push(suggestion),
        }
    }
}

/// Suggestions for `registry` with the default nesting limit.
pub fn generate_suggestions(registry: &VariableRegistry) -> Vec<VariableSuggestion> {
    SuggestionGenerator::default().generate(registry)
}

/// Narrows `all` to what fits after the partial expression the user typed.
pub fn filter_suggestions(all: &[VariableSuggestion], partial: &str) -> Vec<VariableSuggestion> {
    let text = partial.trim_start();
    let text = text.strip_prefix("${").unwrap_or(text).trim_start();

    if text.ends_with('(') {
        return all.to_vec();
    }

    let token = current_token(text).trim();
    if token.is_empty() {
        return all.to_vec();
    }

    if let Some(captures) = ELEMENT_ACCESS.captures(token) {
        let element = &captures[1];
        let mut found = children_of(all, element);
        found.push(VariableSuggestion {
            expr: format!("{element}.property"),
            value_type: "unknown".into(),
            description: format!("Any property of {element}"),
            value: None,
            children: None,
            is_nested: true,
            array_info: None,
            is_function: false,
            signature: None,
        });
        return found;
    }

    if let Some(parent) = token.strip_suffix('.') {
        return children_of(all, parent);
    }

    let needle = token.to_lowercase();
    all.iter()
        .filter(|suggestion| suggestion.expr.to_lowercase().starts_with(&needle))
        .cloned()
        .collect()
}

/// Text after the innermost unclosed `(` or its last comma; the whole text
/// when no call is open.
fn current_token(text: &str) -> &str {
    let mut open: Vec<usize> = Vec::new();
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | ',' if ch == '(' || !open.is_empty() => {
                if ch == ',' {
                    open.pop();
                }
                open.push(i);
            }
            ')' => {
                open.pop();
            }
            _ => {}
        }
    }
    match open.last() {
        Some(&at) => &text[at + 1..],
        None => text,
    }
}

/// Declared children of `parent`, or its sample access for arrays. Indexed
/// paths are looked up through their `[0]` sample and reported under the
/// index the user typed.
fn children_of(all: &[VariableSuggestion], parent: &str) -> Vec<VariableSuggestion> {
    let sampled = INDEX.replace_all(parent, "[0]");
    let Some(found) = all.iter().find(|s| !s.is_function && s.expr == sampled) else {
        return Vec::new();
    };

    let wanted: Vec<String> = match (&found.children, &found.array_info) {
        (Some(children), _) => children.clone(),
        (None, Some(info)) => vec![info.sample_access.clone()],
        (None, None) => return Vec::new(),
    };

    all.iter()
        .filter(|s| !s.is_function && wanted.contains(&s.expr))
        .map(|s| rebase(s, &sampled, parent))
        .collect()
}

fn rebase(suggestion: &VariableSuggestion, from: &str, to: &str) -> VariableSuggestion {
    if from == to {
        return suggestion.clone();
    }
    let swap = |expr: &str| match expr.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => expr.to_string(),
    };
    let mut rebased = suggestion.clone();
    rebased.expr = swap(&suggestion.expr);
    rebased.children = suggestion
        .children
        .as_ref()
        .map(|children| children.iter().map(|child| swap(child)).collect());
    if let Some(info) = rebased.array_info.as_mut() {
        info.sample_access = swap(&info.sample_access);
    }
    rebased
}

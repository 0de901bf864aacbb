use serde_json::{Map, Value};

use crate::path::{resolve_path, split_root};

/// Per-call variable overlay consulted before the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    values: Map<String, Value>,
    coalescing: bool,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a JSON object; any other value yields an empty context.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(values) => Self {
                values,
                coalescing: false,
            },
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Resolves a full dotted/indexed path against the overlay.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let (root, rest) = split_root(path);
        let value = self.values.get(root)?;
        if rest.is_empty() {
            Some(value)
        } else {
            resolve_path(value, rest)
        }
    }

    /// Copy of this context with one extra binding; the original is untouched.
    pub fn with_binding(&self, name: &str, value: Value) -> Self {
        let mut derived = self.clone();
        derived.values.insert(name.to_string(), value);
        derived
    }

    pub(crate) fn is_coalescing(&self) -> bool {
        self.coalescing
    }

    pub(crate) fn coalescing(&self) -> Self {
        Self {
            values: self.values.clone(),
            coalescing: true,
        }
    }
}

impl From<Map<String, Value>> for TemplateContext {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            coalescing: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_nested_paths() {
        let ctx = TemplateContext::from_value(json!({
            "form": { "answers": [{ "id": "q1" }] }
        }));
        assert_eq!(ctx.lookup("form.answers[0].id"), Some(&json!("q1")));
        assert_eq!(ctx.lookup("form.missing"), None);
        assert_eq!(ctx.lookup("other"), None);
    }

    #[test]
    fn derived_binding_leaves_original_untouched() {
        let ctx = TemplateContext::new().with("a", json!(1));
        let derived = ctx.with_binding("item", json!("x"));
        assert!(derived.contains("item"));
        assert!(!ctx.contains("item"));
        assert!(!derived.is_coalescing());
        assert!(ctx.coalescing().is_coalescing());
    }
}

use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::EvaluationError,
    functions,
    path::{resolve_path, split_root},
};

pub type FunctionResult = Result<Value, EvaluationError>;
type SyncImpl = dyn Fn(&[Value]) -> FunctionResult + Send + Sync;
type AsyncImpl = dyn Fn(Vec<Value>) -> BoxFuture<'static, FunctionResult> + Send + Sync;

/// A callable registered under a name. Receives already-evaluated arguments.
#[derive(Clone)]
pub enum TemplateFunction {
    Sync(Arc<SyncImpl>),
    Async(Arc<AsyncImpl>),
}

impl TemplateFunction {
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        TemplateFunction::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FunctionResult> + Send + 'static,
    {
        TemplateFunction::Async(Arc::new(move |args: Vec<Value>| f(args).boxed()))
    }

    pub async fn call(&self, args: Vec<Value>) -> FunctionResult {
        match self {
            TemplateFunction::Sync(f) => f(&args),
            TemplateFunction::Async(f) => f(args).await,
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, TemplateFunction::Async(_))
    }
}

impl fmt::Debug for TemplateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateFunction::Sync(_) => f.write_str("TemplateFunction::Sync(..)"),
            TemplateFunction::Async(_) => f.write_str("TemplateFunction::Async(..)"),
        }
    }
}

/// Curated signature and description shown by the suggestion generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FunctionInfo {
    pub signature: String,
    pub description: String,
}

impl FunctionInfo {
    pub fn new(signature: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
            description: description.into(),
        }
    }
}

/// Root variables and the function library for one evaluation scope.
#[derive(Debug, Clone)]
pub struct VariableRegistry {
    variables: HashMap<String, Value>,
    functions: HashMap<String, TemplateFunction>,
    info: HashMap<String, FunctionInfo>,
}

impl VariableRegistry {
    /// Registry preloaded with the built-in function library.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        functions::register_builtins(&mut registry);
        registry
    }

    /// Registry with no variables and no functions.
    pub fn empty() -> Self {
        Self {
            variables: HashMap::new(),
            functions: HashMap::new(),
            info: HashMap::new(),
        }
    }

    /// Stores a root binding, replacing any previous value.
    pub fn register_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn register_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        self.insert_function(name.into(), TemplateFunction::from_sync(f), None);
    }

    pub fn register_async_function<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FunctionResult> + Send + 'static,
    {
        self.insert_function(name.into(), TemplateFunction::from_async(f), None);
    }

    pub fn register_function_with_info(
        &mut self,
        name: impl Into<String>,
        info: FunctionInfo,
        function: TemplateFunction,
    ) {
        self.insert_function(name.into(), function, Some(info));
    }

    fn insert_function(
        &mut self,
        name: String,
        function: TemplateFunction,
        info: Option<FunctionInfo>,
    ) {
        match info {
            Some(info) => {
                self.info.insert(name.clone(), info);
            }
            None => {
                self.info.remove(&name);
            }
        }
        self.functions.insert(name, function);
    }

    /// Resolves `user.address[0].city` style paths against the root bindings.
    pub fn get_variable(&self, path: &str) -> Option<&Value> {
        let (root, rest) = split_root(path);
        if root.is_empty() {
            return None;
        }
        let value = self.variables.get(root)?;
        if rest.is_empty() {
            Some(value)
        } else {
            resolve_path(value, rest)
        }
    }

    pub fn get_function(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    pub fn function_info(&self, name: &str) -> Option<&FunctionInfo> {
        self.info.get(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.variables.iter()
    }

    pub fn functions(&self) -> impl Iterator<Item = (&String, &TemplateFunction)> {
        self.functions.iter()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &String> {
        self.functions.keys()
    }
}

impl Default for VariableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_variable_resolves_root_and_nested_paths() {
        let mut registry = VariableRegistry::empty();
        registry.register_variable("user", json!({ "address": [{ "city": "Lagos" }] }));
        assert_eq!(
            registry.get_variable("user.address[0].city"),
            Some(&json!("Lagos"))
        );
        assert_eq!(registry.get_variable("user.address[5].city"), None);
        assert!(registry.get_variable("user").is_some());
        assert_eq!(registry.get_variable("other"), None);
        assert_eq!(registry.get_variable(""), None);
    }

    #[test]
    fn register_variable_overwrites() {
        let mut registry = VariableRegistry::empty();
        registry.register_variable("n", json!(1));
        registry.register_variable("n", json!(2));
        assert_eq!(registry.get_variable("n"), Some(&json!(2)));
    }

    #[test]
    fn overriding_a_builtin_drops_its_curated_info() {
        let mut registry = VariableRegistry::new();
        assert!(registry.function_info("add").is_some());
        registry.register_function("add", |_| Ok(json!(0)));
        assert!(registry.function_info("add").is_none());
        assert!(registry.get_function("add").is_some());
    }
}

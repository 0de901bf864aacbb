use std::{future::Future, sync::Arc};

use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{
    ast::TemplateExpression,
    cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ExpressionCache},
    context::TemplateContext,
    error::{ConfigError, ParseError, TemplateError},
    eval::{DEFAULT_MAX_DEPTH, Evaluator},
    parser::Parser,
    registry::{FunctionInfo, FunctionResult, TemplateFunction, VariableRegistry},
    suggest::{DEFAULT_SUGGESTION_DEPTH, SuggestionGenerator, VariableSuggestion, filter_suggestions},
    value::stringify,
};

/// Limits applied by one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum nesting accepted by the parser and the evaluator.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Parsed expressions kept in memory; zero disables the cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// How deep the suggestion generator descends into variable values.
    #[serde(default = "default_suggestion_depth")]
    pub suggestion_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_suggestion_depth() -> usize {
    DEFAULT_SUGGESTION_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            suggestion_depth: DEFAULT_SUGGESTION_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Blank input yields the defaults.
    pub fn from_json_str(config_json: &str) -> Result<Self, ConfigError> {
        if config_json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(config_json).map_err(ConfigError::Parse)
    }
}

/// One evaluation scope: a registry, its expression cache and limits.
#[derive(Debug)]
pub struct TemplateEngine {
    registry: VariableRegistry,
    cache: ExpressionCache,
    config: EngineConfig,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Engine with the built-in function library and default limits.
    pub fn new() -> Self {
        Self::with_registry(VariableRegistry::new(), EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_registry(VariableRegistry::new(), config)
    }

    pub fn with_registry(registry: VariableRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            cache: ExpressionCache::new(config.cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn register_variable(&mut self, name: impl Into<String>, value: Value) {
        self.registry.register_variable(name, value);
    }

    pub fn register_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> FunctionResult + Send + Sync + 'static,
    {
        self.registry.register_function(name, f);
    }

    pub fn register_async_function<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FunctionResult> + Send + 'static,
    {
        self.registry.register_async_function(name, f);
    }

    pub fn register_function_with_info(
        &mut self,
        name: impl Into<String>,
        info: FunctionInfo,
        function: TemplateFunction,
    ) {
        self.registry
            .register_function_with_info(name, info, function);
    }

    /// Parses `raw`, serving repeated strings from the cache.
    pub fn parse(&self, raw: &str) -> Result<Arc<TemplateExpression>, ParseError> {
        let parser = Parser::new(self.config.max_depth);
        self.cache.get_or_parse(raw, |raw| parser.parse(raw))
    }

    /// Parses (or fetches) and evaluates `raw` to completion on the current thread.
    ///
    /// Blocks on async functions; callers already running inside an executor
    /// should await [`TemplateEngine::evaluate_async`] instead.
    pub fn evaluate(&self, raw: &str, ctx: &TemplateContext) -> Result<Value, TemplateError> {
        block_on(self.evaluate_async(raw, ctx))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(raw = %raw))]
    pub async fn evaluate_async(
        &self,
        raw: &str,
        ctx: &TemplateContext,
    ) -> Result<Value, TemplateError> {
        let expr = self.parse(raw)?;
        let evaluator = Evaluator::new(&self.registry, self.config.max_depth);
        let value = evaluator.evaluate(&expr, ctx).await?;
        debug!(result = %value, "evaluated template");
        Ok(value)
    }

    pub fn evaluate_as_string(
        &self,
        raw: &str,
        ctx: &TemplateContext,
    ) -> Result<String, TemplateError> {
        self.evaluate(raw, ctx).map(|value| stringify(&value))
    }

    /// Registry-wide suggestion list filtered for `partial`.
    pub fn get_suggestions(&self, partial: &str) -> Vec<VariableSuggestion> {
        filter_suggestions(&self.all_suggestions(), partial)
    }

    /// Every suggestion the registry currently yields, unfiltered.
    pub fn all_suggestions(&self) -> Vec<VariableSuggestion> {
        SuggestionGenerator::new(self.config.suggestion_depth).generate(&self.registry)
    }
}

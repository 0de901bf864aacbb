//! Tree-walking evaluator over [`AstPart`] nodes.
//!
//! The walk is async so registered functions may suspend; every argument,
//! branch and loop iteration is awaited in order, depth first, with no
//! concurrent fan-out.

use futures::future::{BoxFuture, FutureExt};
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::{
    ast::{AstPart, TemplateExpression},
    context::TemplateContext,
    error::EvaluationError,
    registry::VariableRegistry,
    value::{is_blank, stringify},
};

pub const DEFAULT_MAX_DEPTH: usize = 64;

type EvalResult = Result<Value, EvaluationError>;

/// Evaluates parsed expressions against one registry.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r VariableRegistry,
    max_depth: usize,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r VariableRegistry, max_depth: usize) -> Self {
        Self {
            registry,
            max_depth,
        }
    }

    /// Single-part expressions keep their native value; multi-part ones are
    /// stringified and concatenated.
    pub async fn evaluate(&self, expr: &TemplateExpression, ctx: &TemplateContext) -> EvalResult {
        if expr.is_single_part() {
            return self.evaluate_part(&expr.parts[0], ctx, 0).await;
        }
        let mut out = String::new();
        for part in &expr.parts {
            let value = self.evaluate_part(part, ctx, 0).await?;
            out.push_str(&stringify(&value));
        }
        Ok(Value::String(out))
    }

    pub fn evaluate_part<'a>(
        &'a self,
        part: &'a AstPart,
        ctx: &'a TemplateContext,
        depth: usize,
    ) -> BoxFuture<'a, EvalResult> {
        async move {
            if depth > self.max_depth {
                debug!(kind = part.kind(), limit = self.max_depth, "evaluation too deep");
                return Err(EvaluationError::DepthExceeded(self.max_depth));
            }
            match part {
                AstPart::Text { text } => Ok(Value::String(text.clone())),
                AstPart::Literal { value } => Ok(value.clone()),
                AstPart::Variable { path } => self.variable(path, ctx),
                AstPart::Function { name, args } => self.call(name, args, ctx, depth).await,
                AstPart::NullCoalesce { left, right } => {
                    self.null_coalesce(left, right, ctx, depth).await
                }
                AstPart::ForEach {
                    item,
                    index,
                    collection,
                    body,
                } => {
                    self.for_each(item, index.as_deref(), collection, body, ctx, depth)
                        .await
                }
            }
        }
        .boxed()
    }

    /// A null in the context counts as absent and defers to the registry.
    fn variable(&self, path: &str, ctx: &TemplateContext) -> EvalResult {
        if let Some(value) = ctx.lookup(path).filter(|value| !value.is_null()) {
            return Ok(value.clone());
        }
        if let Some(value) = self.registry.get_variable(path) {
            return Ok(value.clone());
        }
        if ctx.is_coalescing() {
            return Ok(Value::Null);
        }
        Err(EvaluationError::VariableNotFound(path.to_string()))
    }

    async fn call(
        &self,
        name: &str,
        args: &[AstPart],
        ctx: &TemplateContext,
        depth: usize,
    ) -> EvalResult {
        let function = self
            .registry
            .get_function(name)
            .ok_or_else(|| EvaluationError::FunctionNotFound(name.to_string()))?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_part(arg, ctx, depth + 1).await?);
        }
        trace!(
            function = name,
            is_async = function.is_async(),
            args = values.len(),
            "calling function"
        );
        function.call(values).await
    }

    async fn null_coalesce(
        &self,
        left: &AstPart,
        right: &AstPart,
        ctx: &TemplateContext,
        depth: usize,
    ) -> EvalResult {
        let marked = ctx.coalescing();
        let value = match self.evaluate_part(left, &marked, depth + 1).await {
            Ok(value) => value,
            Err(EvaluationError::DepthExceeded(limit)) => {
                return Err(EvaluationError::DepthExceeded(limit));
            }
            Err(error) => {
                trace!(%error, "left side of '??' failed, using right side");
                Value::Null
            }
        };
        if !is_blank(&value) {
            return Ok(value);
        }
        self.evaluate_part(right, ctx, depth + 1).await
    }

    async fn for_each(
        &self,
        item: &str,
        index: Option<&str>,
        collection: &AstPart,
        body: &AstPart,
        ctx: &TemplateContext,
        depth: usize,
    ) -> EvalResult {
        let entries = match self.evaluate_part(collection, ctx, depth + 1).await? {
            Value::Array(items) => items,
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| json!({ "key": key, "value": value }))
                .collect(),
            _ => return Ok(Value::String(String::new())),
        };

        let mut out = String::new();
        for (position, element) in entries.into_iter().enumerate() {
            let mut scope = ctx.with_binding(item, element);
            if let Some(index) = index {
                scope.insert(index, Value::from(position));
            }
            let rendered = stringify(&self.evaluate_part(body, &scope, depth + 1).await?);
            trace!(item, position, skipped = rendered.is_empty(), "forEach iteration");
            out.push_str(&rendered);
        }
        Ok(Value::String(out))
    }
}

impl AstPart {
    /// Evaluates this node with the default depth limit.
    pub fn evaluate<'a>(
        &'a self,
        registry: &'a VariableRegistry,
        ctx: &'a TemplateContext,
    ) -> BoxFuture<'a, EvalResult> {
        async move {
            Evaluator::new(registry, DEFAULT_MAX_DEPTH)
                .evaluate_part(self, ctx, 0)
                .await
        }
        .boxed()
    }
}

impl TemplateExpression {
    /// Evaluates the whole template with the default depth limit.
    pub async fn evaluate(&self, registry: &VariableRegistry, ctx: &TemplateContext) -> EvalResult {
        Evaluator::new(registry, DEFAULT_MAX_DEPTH)
            .evaluate(self, ctx)
            .await
    }
}

#![allow(missing_docs)]

pub mod ast;
pub mod cache;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod literal;
pub mod parser;
pub mod path;
pub mod registry;
pub mod resolve;
pub mod suggest;
pub mod value;

pub use ast::{AstPart, TemplateExpression};
pub use cache::{CacheStats, ExpressionCache};
pub use context::TemplateContext;
pub use engine::{EngineConfig, TemplateEngine};
pub use error::{ConfigError, EvaluationError, ParseError, TemplateError};
pub use eval::Evaluator;
pub use parser::{Parser, contains_template, parse};
pub use registry::{FunctionInfo, FunctionResult, TemplateFunction, VariableRegistry};
pub use resolve::{ResolutionMode, resolve_document};
pub use suggest::{
    ArrayInfo, SuggestionGenerator, VariableSuggestion, filter_suggestions, generate_suggestions,
};
pub use value::{is_truthy, stringify};

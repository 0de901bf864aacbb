use thiserror::Error;

/// Malformed template syntax. Detected once per raw string and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty expression in template span")]
    EmptyExpression,
    #[error("unterminated '${{' starting at byte {offset}")]
    UnterminatedSpan { offset: usize },
    #[error("unbalanced quotes in '{0}'")]
    UnbalancedQuotes(String),
    #[error("unbalanced parentheses in '{0}'")]
    UnbalancedParens(String),
    #[error("ternary in '{0}' is missing its ':' branch")]
    MissingTernaryBranch(String),
    #[error("forEach expects item, [index,] collection and body; got {0} argument(s)")]
    ForEachArity(usize),
    #[error("'{0}' is not a valid loop variable name")]
    InvalidLoopVariable(String),
    #[error("expression nesting exceeds the limit of {0}")]
    TooDeep(usize),
}

/// Failures raised while walking a parsed expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("variable not found: {0}")]
    VariableNotFound(String),
    #[error("function not found: {0}")]
    FunctionNotFound(String),
    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },
    #[error("cannot convert {value} to {target}")]
    Coercion { value: String, target: &'static str },
    #[error("{function}: division by zero")]
    DivisionByZero { function: String },
    #[error("{function} expects an array argument")]
    NotAnArray { function: String },
    #[error("{function}: {message}")]
    TypeMismatch { function: String, message: String },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("evaluation depth exceeds the limit of {0}")]
    DepthExceeded(usize),
    #[error("{0}")]
    Custom(String),
}

impl EvaluationError {
    pub(crate) fn arity(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvaluationError::Arity {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub(crate) fn mismatch(function: &str, message: impl Into<String>) -> Self {
        EvaluationError::TypeMismatch {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Error surfaced by the engine entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

/// Typed failure while loading [`crate::EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[source] serde_json::Error),
}

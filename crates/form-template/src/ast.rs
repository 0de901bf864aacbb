use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed template: literal text interleaved with `${...}` expression spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateExpression {
    pub raw: String,
    pub parts: Vec<AstPart>,
}

impl TemplateExpression {
    /// True when the template is a single span, so evaluation keeps the native value type.
    pub fn is_single_part(&self) -> bool {
        self.parts.len() == 1
    }

    /// True when the template has no `${}` spans at all.
    pub fn is_plain_text(&self) -> bool {
        self.parts.iter().all(|part| matches!(part, AstPart::Text { .. }))
    }
}

/// One node of the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AstPart {
    Text {
        text: String,
    },
    Literal {
        value: Value,
    },
    Variable {
        path: String,
    },
    Function {
        name: String,
        args: Vec<AstPart>,
    },
    NullCoalesce {
        left: Box<AstPart>,
        right: Box<AstPart>,
    },
    ForEach {
        item: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<String>,
        collection: Box<AstPart>,
        body: Box<AstPart>,
    },
}

impl AstPart {
    pub fn text(text: impl Into<String>) -> Self {
        AstPart::Text { text: text.into() }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        AstPart::Literal {
            value: value.into(),
        }
    }

    pub fn variable(path: impl Into<String>) -> Self {
        AstPart::Variable { path: path.into() }
    }

    pub fn function(name: impl Into<String>, args: Vec<AstPart>) -> Self {
        AstPart::Function {
            name: name.into(),
            args,
        }
    }

    pub fn null_coalesce(left: AstPart, right: AstPart) -> Self {
        AstPart::NullCoalesce {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn for_each(
        item: impl Into<String>,
        index: Option<String>,
        collection: AstPart,
        body: AstPart,
    ) -> Self {
        AstPart::ForEach {
            item: item.into(),
            index,
            collection: Box::new(collection),
            body: Box::new(body),
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AstPart::Text { .. } => "text",
            AstPart::Literal { .. } => "literal",
            AstPart::Variable { .. } => "variable",
            AstPart::Function { .. } => "function",
            AstPart::NullCoalesce { .. } => "null_coalesce",
            AstPart::ForEach { .. } => "for_each",
        }
    }
}

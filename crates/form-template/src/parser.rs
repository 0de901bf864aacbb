//! Template parser.
//!
//! A raw template is first cut into literal text and `${...}` spans. Each span
//! is then parsed by [`Parser::parse_expression_part`], which tries, in order:
//! literal, parenthesized group, ternary, `??`, comparison, `forEach(...)`,
//! generic call and finally a variable path.
//!
//! Ternary and `??` split at their first top-level occurrence, so chains are
//! resolved left to right rather than by operator associativity.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{
    ast::{AstPart, TemplateExpression},
    error::ParseError,
    eval::DEFAULT_MAX_DEPTH,
    literal::read_literal,
};

static CALL_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("call head pattern")
});
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"));

const FOR_EACH: &str = "forEach";

/// Comparison operators, two-character forms first, with the function each maps to.
const COMPARISONS: &[(&str, &str)] = &[
    (">=", "gte"),
    ("<=", "lte"),
    ("==", "eq"),
    ("!=", "ne"),
    (">", "gt"),
    ("<", "lt"),
];

/// Parses with the default nesting limit.
pub fn parse(raw: &str) -> Result<TemplateExpression, ParseError> {
    Parser::default().parse(raw)
}

/// Cheap check for whether a string carries any expression span.
pub fn contains_template(text: &str) -> bool {
    text.contains("${")
}

#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

enum Span<'a> {
    Text(&'a str),
    Expr(&'a str),
}

impl Parser {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn parse(&self, raw: &str) -> Result<TemplateExpression, ParseError> {
        let spans = split_spans(raw)?;
        let mut parts = Vec::with_capacity(spans.len());
        for span in spans {
            match span {
                Span::Text(text) => parts.push(AstPart::text(text)),
                Span::Expr(inner) => parts.push(self.parse_expression_part(inner)?),
            }
        }
        if parts.is_empty() {
            parts.push(AstPart::text(raw));
        }
        debug!(raw, parts = parts.len(), "parsed template");
        Ok(TemplateExpression {
            raw: raw.to_string(),
            parts,
        })
    }

    /// Parses the inner text of one `${...}` span.
    pub fn parse_expression_part(&self, text: &str) -> Result<AstPart, ParseError> {
        self.parse_at(text, 0)
    }

    fn parse_at(&self, text: &str, depth: usize) -> Result<AstPart, ParseError> {
        if depth > self.max_depth {
            return Err(ParseError::TooDeep(self.max_depth));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::EmptyExpression);
        }
        if let Some(value) = read_literal(text) {
            return Ok(AstPart::Literal { value });
        }

        let top = top_level(text)?;
        let next = depth + 1;

        if text.starts_with('(') && closing_paren(&top, 0) == Some(text.len() - 1) {
            return self.parse_at(&text[1..text.len() - 1], next);
        }

        if let Some(question) = find_ternary(text, &top) {
            let colon = top
                .iter()
                .find(|(i, ch)| *i > question && *ch == ':')
                .map(|(i, _)| *i)
                .ok_or_else(|| ParseError::MissingTernaryBranch(text.to_string()))?;
            return Ok(AstPart::function(
                "if",
                vec![
                    self.parse_at(&text[..question], next)?,
                    self.parse_at(&text[question + 1..colon], next)?,
                    self.parse_at(&text[colon + 1..], next)?,
                ],
            ));
        }

        if let Some(at) = find_coalesce(text, &top) {
            return Ok(AstPart::null_coalesce(
                self.parse_at(&text[..at], next)?,
                self.parse_at(&text[at + 2..], next)?,
            ));
        }

        if let Some((at, op, name)) = find_comparison(text, &top) {
            return Ok(AstPart::function(
                name,
                vec![
                    self.parse_at(&text[..at], next)?,
                    self.parse_at(&text[at + op.len()..], next)?,
                ],
            ));
        }

        if let Some((name, inner)) = call_parts(text, &top) {
            let args = split_args(inner)?;
            if name == FOR_EACH {
                return self.parse_for_each(&args, next);
            }
            let args = args
                .into_iter()
                .map(|arg| self.parse_at(arg, next))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(AstPart::function(name, args));
        }

        Ok(AstPart::variable(text))
    }

    fn parse_for_each(&self, args: &[&str], depth: usize) -> Result<AstPart, ParseError> {
        let (item, index, collection, body) = match args {
            [item, collection, body] => (*item, None, *collection, *body),
            [item, index, collection, body] => (*item, Some(loop_variable(index)?), *collection, *body),
            _ => return Err(ParseError::ForEachArity(args.len())),
        };
        Ok(AstPart::for_each(
            loop_variable(item)?,
            index,
            self.parse_at(collection, depth)?,
            self.parse_at(body, depth)?,
        ))
    }
}

fn loop_variable(text: &str) -> Result<String, ParseError> {
    let text = text.trim();
    if IDENTIFIER.is_match(text) {
        Ok(text.to_string())
    } else {
        Err(ParseError::InvalidLoopVariable(text.to_string()))
    }
}

/// Cuts `raw` into text and `${...}` spans using balanced-brace matching.
fn split_spans(raw: &str) -> Result<Vec<Span<'_>>, ParseError> {
    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(found) = raw[cursor..].find("${") {
        let start = cursor + found;
        if start > cursor {
            spans.push(Span::Text(&raw[cursor..start]));
        }
        let body_start = start + 2;
        let end = matching_brace(&raw[body_start..])
            .map(|offset| body_start + offset)
            .ok_or(ParseError::UnterminatedSpan { offset: start })?;
        spans.push(Span::Expr(&raw[body_start..end]));
        cursor = end + 1;
    }
    if cursor < raw.len() {
        spans.push(Span::Text(&raw[cursor..]));
    }
    Ok(spans)
}

/// Byte offset of the `}` closing a span body, ignoring braces inside quotes.
fn matching_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Positions of characters outside quotes and at parenthesis depth zero.
/// An opening paren at depth zero and its matching close are included.
fn top_level(text: &str) -> Result<Vec<(usize, char)>, ParseError> {
    let mut positions = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => {
                if depth == 0 {
                    positions.push((i, ch));
                }
                depth += 1;
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| ParseError::UnbalancedParens(text.to_string()))?;
                if depth == 0 {
                    positions.push((i, ch));
                }
            }
            _ if depth == 0 => positions.push((i, ch)),
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(ParseError::UnbalancedQuotes(text.to_string()));
    }
    if depth != 0 {
        return Err(ParseError::UnbalancedParens(text.to_string()));
    }
    Ok(positions)
}

/// The top-level `)` matching the `(` at byte `open`.
fn closing_paren(top: &[(usize, char)], open: usize) -> Option<usize> {
    top.iter()
        .find(|(i, ch)| *i > open && *ch == ')')
        .map(|(i, _)| *i)
}

fn find_ternary(text: &str, top: &[(usize, char)]) -> Option<usize> {
    let bytes = text.as_bytes();
    top.iter()
        .filter(|(_, ch)| *ch == '?')
        .map(|(i, _)| *i)
        .find(|&i| bytes.get(i + 1) != Some(&b'?') && (i == 0 || bytes[i - 1] != b'?'))
}

fn find_coalesce(text: &str, top: &[(usize, char)]) -> Option<usize> {
    let bytes = text.as_bytes();
    top.iter()
        .map(|(i, _)| *i)
        .find(|&i| bytes[i] == b'?' && bytes.get(i + 1) == Some(&b'?'))
}

fn find_comparison(
    text: &str,
    top: &[(usize, char)],
) -> Option<(usize, &'static str, &'static str)> {
    top.iter()
        .filter(|(_, ch)| matches!(*ch, '>' | '<' | '=' | '!'))
        .find_map(|(i, _)| {
            COMPARISONS
                .iter()
                .find(|(op, _)| text[*i..].starts_with(op))
                .map(|(op, name)| (*i, *op, *name))
        })
}

/// Splits `name(inner)` when the call's opening paren closes at the very end.
fn call_parts<'a>(text: &'a str, top: &[(usize, char)]) -> Option<(&'a str, &'a str)> {
    let captures = CALL_HEAD.captures(text)?;
    let name = captures.get(1)?.as_str();
    let open = captures.get(0)?.end() - 1;
    if closing_paren(top, open)? != text.len() - 1 {
        return None;
    }
    Some((name, &text[open + 1..text.len() - 1]))
}

/// Quote- and paren-aware comma split. Blank input means zero arguments.
fn split_args(inner: &str) -> Result<Vec<&str>, ParseError> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut args = Vec::new();
    let mut start = 0;
    for (i, ch) in top_level(inner)? {
        if ch == ',' {
            args.push(&inner[start..i]);
            start = i + 1;
        }
    }
    args.push(&inner[start..]);
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn part(text: &str) -> AstPart {
        Parser::default()
            .parse_expression_part(text)
            .expect("expression should parse")
    }

    #[test]
    fn plain_text_is_a_single_text_part() {
        let expr = parse("Hello world").expect("parse");
        assert_eq!(expr.parts, vec![AstPart::text("Hello world")]);
        assert!(expr.is_plain_text());
        let empty = parse("").expect("parse");
        assert_eq!(empty.parts, vec![AstPart::text("")]);
    }

    #[test]
    fn mixes_text_and_spans() {
        let expr = parse("Hi ${user.name}, you are ${user.age}!").expect("parse");
        assert_eq!(
            expr.parts,
            vec![
                AstPart::text("Hi "),
                AstPart::variable("user.name"),
                AstPart::text(", you are "),
                AstPart::variable("user.age"),
                AstPart::text("!"),
            ]
        );
    }

    #[test]
    fn literals_take_precedence() {
        assert_eq!(part("'a, b'"), AstPart::literal("a, b"));
        assert_eq!(part(" 18 "), AstPart::literal(18));
        assert_eq!(part("false"), AstPart::literal(false));
        assert_eq!(part("null"), AstPart::literal(json!(null)));
    }

    #[test]
    fn nested_function_calls() {
        assert_eq!(
            part("if(gt(user.age,18),'Adult','Minor')"),
            AstPart::function(
                "if",
                vec![
                    AstPart::function(
                        "gt",
                        vec![AstPart::variable("user.age"), AstPart::literal(18)]
                    ),
                    AstPart::literal("Adult"),
                    AstPart::literal("Minor"),
                ]
            )
        );
        assert_eq!(part("now()"), AstPart::function("now", vec![]));
    }

    #[test]
    fn ternary_desugars_to_if() {
        assert_eq!(
            part("gt(5,3) ? 'yes' : 'no'"),
            AstPart::function(
                "if",
                vec![
                    AstPart::function("gt", vec![AstPart::literal(5), AstPart::literal(3)]),
                    AstPart::literal("yes"),
                    AstPart::literal("no"),
                ]
            )
        );
    }

    #[test]
    fn ternary_ignores_question_marks_in_strings_and_coalesce() {
        assert_eq!(
            part("a ?? b ? 'why?' : 'x:y'"),
            AstPart::function(
                "if",
                vec![
                    AstPart::null_coalesce(AstPart::variable("a"), AstPart::variable("b")),
                    AstPart::literal("why?"),
                    AstPart::literal("x:y"),
                ]
            )
        );
    }

    #[test]
    fn ternary_without_colon_fails() {
        assert!(matches!(
            Parser::default().parse_expression_part("a ? b"),
            Err(ParseError::MissingTernaryBranch(_))
        ));
    }

    #[test]
    fn coalesce_splits_at_first_occurrence() {
        assert_eq!(
            part("a ?? b ?? 'c'"),
            AstPart::null_coalesce(
                AstPart::variable("a"),
                AstPart::null_coalesce(AstPart::variable("b"), AstPart::literal("c")),
            )
        );
    }

    #[test]
    fn comparison_operators_map_to_functions() {
        assert_eq!(
            part("user.age >= 18"),
            AstPart::function(
                "gte",
                vec![AstPart::variable("user.age"), AstPart::literal(18)]
            )
        );
        assert_eq!(
            part("status != 'done'"),
            AstPart::function(
                "ne",
                vec![AstPart::variable("status"), AstPart::literal("done")]
            )
        );
    }

    #[test]
    fn comparison_scan_skips_quoted_operators() {
        assert_eq!(
            part("concat('a>b', x)"),
            AstPart::function(
                "concat",
                vec![AstPart::literal("a>b"), AstPart::variable("x")]
            )
        );
        assert_eq!(
            part("label == 'a<b'"),
            AstPart::function(
                "eq",
                vec![AstPart::variable("label"), AstPart::literal("a<b")]
            )
        );
    }

    #[test]
    fn parentheses_group_nested_conditionals() {
        assert_eq!(
            part("a ? (b ? 1 : 2) : 3"),
            AstPart::function(
                "if",
                vec![
                    AstPart::variable("a"),
                    AstPart::function(
                        "if",
                        vec![
                            AstPart::variable("b"),
                            AstPart::literal(1),
                            AstPart::literal(2)
                        ]
                    ),
                    AstPart::literal(3),
                ]
            )
        );
    }

    #[test]
    fn for_each_forms() {
        assert_eq!(
            part("forEach(item, items, item.name)"),
            AstPart::for_each(
                "item",
                None,
                AstPart::variable("items"),
                AstPart::variable("item.name"),
            )
        );
        assert_eq!(
            part("forEach(item, idx, items, concat(toString(idx), item))"),
            AstPart::for_each(
                "item",
                Some("idx".into()),
                AstPart::variable("items"),
                AstPart::function(
                    "concat",
                    vec![
                        AstPart::function("toString", vec![AstPart::variable("idx")]),
                        AstPart::variable("item"),
                    ]
                ),
            )
        );
    }

    #[test]
    fn malformed_for_each_is_rejected() {
        let parser = Parser::default();
        assert_eq!(
            parser.parse_expression_part("forEach(item, items)"),
            Err(ParseError::ForEachArity(2))
        );
        assert!(matches!(
            parser.parse_expression_part("forEach(item, 'x', items, item)"),
            Err(ParseError::InvalidLoopVariable(_))
        ));
        assert!(matches!(
            parser.parse_expression_part("forEach(a.b, items, item)"),
            Err(ParseError::InvalidLoopVariable(_))
        ));
    }

    #[test]
    fn syntax_errors() {
        let parser = Parser::default();
        assert_eq!(
            parser.parse_expression_part("   "),
            Err(ParseError::EmptyExpression)
        );
        assert!(matches!(
            parser.parse_expression_part("concat('a, b)"),
            Err(ParseError::UnbalancedQuotes(_))
        ));
        assert!(matches!(
            parser.parse_expression_part("concat(a, (b)"),
            Err(ParseError::UnbalancedParens(_))
        ));
        assert_eq!(
            parser.parse("${}").map(|_| ()),
            Err(ParseError::EmptyExpression)
        );
        assert_eq!(
            parser.parse("Hi ${user.name").map(|_| ()),
            Err(ParseError::UnterminatedSpan { offset: 3 })
        );
        assert_eq!(
            parser.parse_expression_part("f(a,,b)"),
            Err(ParseError::EmptyExpression)
        );
    }

    #[test]
    fn braces_inside_strings_do_not_close_spans() {
        let expr = parse("${concat('}', name)}").expect("parse");
        assert_eq!(
            expr.parts,
            vec![AstPart::function(
                "concat",
                vec![AstPart::literal("}"), AstPart::variable("name")]
            )]
        );
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}1{}", "toNumber(".repeat(10), ")".repeat(10));
        assert_eq!(
            Parser::new(4).parse_expression_part(&deep),
            Err(ParseError::TooDeep(4))
        );
        assert!(Parser::new(16).parse_expression_part(&deep).is_ok());
    }

    #[test]
    fn contains_template_checks_for_spans() {
        assert!(contains_template("Hello ${name}"));
        assert!(!contains_template("Hello $name"));
    }
}

use serde_json::{Value, json};

use form_template::{
    EvaluationError, ResolutionMode, TemplateContext, TemplateEngine, TemplateError,
    contains_template, resolve_document,
};

fn fixture() -> Value {
    serde_json::from_str(include_str!("../tests/fixtures/form_schema.json")).expect("fixture")
}

fn engine() -> TemplateEngine {
    let mut engine = TemplateEngine::new();
    engine.register_variable("company", json!({ "name": "Acme" }));
    engine.register_variable("plans", json!(["basic", "pro"]));
    engine
}

#[test]
fn strict_mode_resolves_every_template() {
    let mut engine = engine();
    engine.register_variable("support", json!({ "email": "help@acme.test" }));
    let ctx = TemplateContext::new().with("user", json!({ "name": "Ada", "age": 36 }));

    let resolved =
        resolve_document(&engine, &fixture(), &ctx, ResolutionMode::Strict).expect("resolve");

    assert_eq!(resolved["id"], "signup");
    assert_eq!(resolved["title"], "Welcome to Acme");
    assert_eq!(resolved["fields"][0]["label"], "Full name");
    assert_eq!(resolved["fields"][0]["default"], "Ada");
    assert_eq!(resolved["fields"][0]["placeholder"], "ADA");
    assert_eq!(resolved["fields"][1]["default"], json!(36));
    assert_eq!(resolved["fields"][1]["hint"], "Adult rate applies");
    assert_eq!(resolved["fields"][2]["options"], "basic | pro");
    assert_eq!(resolved["fields"][2]["summary"], "1. basic 2. pro ");
    assert_eq!(resolved["footer"], "Questions? Mail help@acme.test");
}

#[test]
fn strict_mode_stops_at_first_failure() {
    let engine = engine();
    let ctx = TemplateContext::new().with("user", json!({ "name": "Ada", "age": 36 }));
    let err = resolve_document(&engine, &fixture(), &ctx, ResolutionMode::Strict).unwrap_err();
    assert_eq!(
        err,
        TemplateError::Evaluation(EvaluationError::VariableNotFound("support.email".into()))
    );
}

#[test]
fn lenient_mode_keeps_unresolved_strings() {
    let engine = engine();
    let ctx = TemplateContext::new().with("user", json!({ "name": "Ada", "age": 12 }));
    let resolved =
        resolve_document(&engine, &fixture(), &ctx, ResolutionMode::Lenient).expect("lenient");

    assert_eq!(resolved["fields"][1]["hint"], "Junior rate applies");
    assert_eq!(resolved["footer"], "Questions? Mail ${support.email}");
    assert!(contains_template(resolved["footer"].as_str().expect("footer")));
    assert!(!contains_template(resolved["title"].as_str().expect("title")));
}

#[test]
fn resolution_mode_uses_snake_case() {
    let mode: ResolutionMode = serde_json::from_str("\"lenient\"").expect("mode");
    assert_eq!(mode, ResolutionMode::Lenient);
    assert_eq!(ResolutionMode::default(), ResolutionMode::Strict);
}

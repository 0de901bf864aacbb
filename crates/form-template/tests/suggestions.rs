use serde_json::json;

use form_template::{TemplateEngine, VariableSuggestion};

fn engine() -> TemplateEngine {
    let mut engine = TemplateEngine::new();
    engine.register_variable(
        "user",
        json!({
            "name": "Ada",
            "age": 36,
            "orders": [{ "id": 7, "total": 12.5 }]
        }),
    );
    engine.register_variable("company", json!({ "name": "Analytical Engines" }));
    engine
}

fn exprs(suggestions: &[VariableSuggestion]) -> Vec<&str> {
    suggestions.iter().map(|s| s.expr.as_str()).collect()
}

#[test]
fn dot_lists_children_of_the_parent_only() {
    let engine = engine();
    let found = engine.get_suggestions("${user.");
    let names = exprs(&found);
    assert!(names.contains(&"user.name"));
    assert!(names.contains(&"user.age"));
    assert!(names.contains(&"user.orders"));
    assert!(!names.iter().any(|name| name.starts_with("company")));
}

#[test]
fn indexed_element_maps_to_typed_index() {
    let engine = engine();
    let found = engine.get_suggestions("user.orders[3].");
    let names = exprs(&found);
    assert!(names.contains(&"user.orders[3].id"));
    assert!(names.contains(&"user.orders[3].total"));
    assert!(names.contains(&"user.orders[3].property"));
}

#[test]
fn prefix_filter_covers_variables_and_functions() {
    let engine = engine();
    let found = engine.get_suggestions("co");
    let names = exprs(&found);
    assert!(names.contains(&"company"));
    assert!(names.contains(&"concat"));
    assert!(names.contains(&"count"));
    assert!(!names.contains(&"user"));

    let concat = found.iter().find(|s| s.expr == "concat").expect("concat");
    assert!(concat.is_function);
    assert!(concat.signature.is_some());
}

#[test]
fn open_call_offers_everything_then_filters_after_comma() {
    let engine = engine();
    let all = engine.all_suggestions();
    assert_eq!(engine.get_suggestions("${concat(").len(), all.len());

    let found = engine.get_suggestions("${concat(user.name, com");
    assert_eq!(exprs(&found), vec!["company", "company.name"]);
}

#[test]
fn array_entries_describe_their_items() {
    let engine = engine();
    let all = engine.all_suggestions();
    let orders = all.iter().find(|s| s.expr == "user.orders").expect("orders");
    assert_eq!(orders.value_type, "array<object>");
    let info = orders.array_info.as_ref().expect("array info");
    assert_eq!(info.sample_access, "user.orders[0]");
    assert!(all.iter().any(|s| s.expr == "user.orders[0].total" && s.is_nested));
}

#[test]
fn suggestions_serialize_in_camel_case() {
    let engine = engine();
    let found = engine.get_suggestions("user.orders");
    let json = serde_json::to_value(&found).expect("serialize");
    let orders = &json[0];
    assert_eq!(orders["expr"], "user.orders");
    assert_eq!(orders["type"], "array<object>");
    assert_eq!(orders["arrayInfo"]["sampleAccess"], "user.orders[0]");
    assert_eq!(orders["isFunction"], false);
}

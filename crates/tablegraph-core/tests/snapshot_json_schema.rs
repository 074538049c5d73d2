use jsonschema::JSONSchema;
use schemars::schema_for;
use std::fs;
use std::path::Path;
use tablegraph_core::{SchemaGraph, SchemaSnapshot};

fn load_json(name: &str) -> serde_json::Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse json")
}

#[test]
fn fixtures_validate_against_generated_schema() {
    let schema = schema_for!(SchemaSnapshot);
    let schema_json = serde_json::to_value(&schema).expect("serialize generated schema");
    let compiled = JSONSchema::compile(&schema_json).expect("compile snapshot schema");

    for name in ["chinook.json", "obscure_names.json", "ordering.json", "shop.json"] {
        let instance = load_json(name);
        let messages: Vec<String> = match compiled.validate(&instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.map(|error| error.to_string()).collect(),
        };
        assert!(messages.is_empty(), "{name} failed validation: {messages:?}");

        let snapshot: SchemaSnapshot =
            serde_json::from_value(instance).expect("parse snapshot fixture");
        SchemaGraph::from_snapshot(&snapshot).expect("load snapshot fixture");
    }
}

#[test]
fn schema_rejects_unknown_kinds() {
    let schema = schema_for!(SchemaSnapshot);
    let schema_json = serde_json::to_value(&schema).expect("serialize generated schema");
    let compiled = JSONSchema::compile(&schema_json).expect("compile snapshot schema");

    let instance = serde_json::json!({
        "schema_version": "0.1",
        "tables": [
            { "name": "t", "kind": "materialized_view", "columns": [] }
        ]
    });

    assert!(!compiled.is_valid(&instance));
}

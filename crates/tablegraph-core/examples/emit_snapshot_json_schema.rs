use schemars::schema_for;
use tablegraph_core::SchemaSnapshot;

fn main() {
    let schema = schema_for!(SchemaSnapshot);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}

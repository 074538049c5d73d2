use std::fs;
use std::path::Path;

use tablegraph_core::{
    InferenceOptions, InferenceOverrides, SchemaGraph, SchemaSnapshot, attach_implied,
    find_implied, order_tables,
};

fn load_graph(name: &str) -> SchemaGraph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    let snapshot: SchemaSnapshot = serde_json::from_str(&contents).expect("parse snapshot");
    SchemaGraph::from_snapshot(&snapshot).expect("load snapshot")
}

/// `(parent table.column, child table.column)` for each proposal.
fn pairs(graph: &SchemaGraph, options: &InferenceOptions) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = find_implied(graph, options, &InferenceOverrides::default())
        .iter()
        .map(|constraint| {
            (
                graph.qualified_column(constraint.parent_columns()[0]),
                graph.qualified_column(constraint.child_columns()[0]),
            )
        })
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn chinook_yields_three_implied_constraints() {
    let graph = load_graph("chinook.json");

    let found = pairs(&graph, &InferenceOptions::default());

    assert_eq!(
        found,
        vec![
            ("ALbum.ID".to_string(), "Track.AlbumId".to_string()),
            ("Artist.Id".to_string(), "ALbum.arTistID".to_string()),
            ("Track.Id".to_string(), "InvoiceLine.TrackId".to_string()),
        ]
    );
}

#[test]
fn obscure_names_match_after_normalization() {
    let graph = load_graph("obscure_names.json");

    let found = pairs(&graph, &InferenceOptions::default());

    assert_eq!(
        found,
        vec![(
            "ObscureParentTable.{ColumnName}".to_string(),
            "Obscure{Child}Table.ObscureParentTable{ColumnName}".to_string(),
        )]
    );
}

#[test]
fn implied_constraints_drive_ordering() {
    let mut graph = load_graph("chinook.json");
    let added = attach_implied(
        &mut graph,
        &InferenceOptions::default(),
        &InferenceOverrides::default(),
    );
    assert_eq!(added.len(), 3);

    let names: Vec<&str> = added
        .iter()
        .map(|id| graph.constraint(*id).name())
        .collect();
    assert!(names.contains(&"implied:ALbum.arTistID"));

    let order = order_tables(&graph);
    let insertion: Vec<&str> = order
        .insertion
        .iter()
        .map(|id| graph.table(*id).name())
        .collect();
    assert_eq!(insertion, vec!["Artist", "ALbum", "Track", "InvoiceLine"]);

    // A second pass finds nothing new.
    assert!(find_implied(&graph, &InferenceOptions::default(), &InferenceOverrides::default()).is_empty());
}

#[test]
fn declared_constraints_are_never_duplicated() {
    let graph = load_graph("shop.json");

    for constraint in find_implied(&graph, &InferenceOptions::default(), &InferenceOverrides::default()) {
        let parent = constraint.parent_columns()[0];
        let child = constraint.child_columns()[0];
        assert!(!graph.are_related(parent, child));
        assert!(!graph.column(child).is_foreign_key());
    }
}

#[test]
fn rails_finder_follows_plural_table_names() {
    let graph = load_graph("shop.json");

    let mut names: Vec<String> = tablegraph_core::find_rails(&graph, &InferenceOverrides::default())
        .iter()
        .map(|constraint| constraint.name().to_string())
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec!["rails:order_items.product_id", "rails:order_totals.order_id"]
    );
}

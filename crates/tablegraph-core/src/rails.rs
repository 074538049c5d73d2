use crate::constraints::{ConstraintKind, ForeignKeyConstraint};
use crate::graph::SchemaGraph;
use crate::inflection::pluralize;
use crate::overrides::InferenceOverrides;
use crate::schema::{ColumnId, TableId};

/// Prefix of synthesized Rails constraint names.
pub const RAILS_PREFIX: &str = "rails:";

const ID_SUFFIX: &str = "_id";

/// Table a Rails-style `<singular>_id` column points at: `vaccine_id` -> `vaccines`.
pub fn rails_table_name(column: &str) -> Option<String> {
    let lower = column.to_lowercase();
    let singular = lower.strip_suffix(ID_SUFFIX)?;
    if singular.is_empty() {
        return None;
    }
    Some(pluralize(singular))
}

/// Propose `<plural>.id -> <table>.<singular>_id` constraints.
///
/// Tables are visited in sort order and columns in insertion order. A
/// column whose plural name matches tables in several schemas is skipped.
pub fn find_rails(graph: &SchemaGraph, overrides: &InferenceOverrides) -> Vec<ForeignKeyConstraint> {
    let mut tables: Vec<TableId> = graph.table_ids().collect();
    graph.sort_tables(&mut tables);

    let mut found = Vec::new();
    for table_id in tables {
        for column in graph.table_columns(table_id) {
            if column.is_foreign_key() || !overrides.allows_implied_parents(graph, column.id()) {
                continue;
            }
            let Some(target) = rails_table_name(column.name()) else {
                continue;
            };

            let keys: Vec<ColumnId> = graph
                .tables_named(&target)
                .filter_map(|table| graph.table(table).column_id("id"))
                .collect();
            let [parent] = keys.as_slice() else {
                continue;
            };
            if graph.are_related(*parent, column.id()) {
                continue;
            }

            let table = graph.table(table_id);
            found.push(ForeignKeyConstraint::inferred(
                ConstraintKind::Rails,
                format!("{RAILS_PREFIX}{}.{}", table.name(), column.name()),
                *parent,
                column.id(),
            ));
        }
    }

    tracing::debug!(event = "rails_found", count = found.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::implied::attach_inferred;
    use crate::schema::{Column, Table};
    use crate::types::ColumnType;

    fn table(graph: &mut SchemaGraph, name: &str, columns: &[&str]) -> TableId {
        let id = graph.add_table(Table::new(None, None, name)).unwrap();
        for column in columns {
            graph
                .add_column(id, Column::new(*column, ColumnType::named("bigint")))
                .unwrap();
        }
        id
    }

    #[test]
    fn column_names_map_to_plural_tables() {
        assert_eq!(rails_table_name("vaccine_id").as_deref(), Some("vaccines"));
        assert_eq!(
            rails_table_name("active_ingredient_id").as_deref(),
            Some("active_ingredients")
        );
        assert_eq!(rails_table_name("Person_ID").as_deref(), Some("people"));
        assert_eq!(rails_table_name("_id"), None);
        assert_eq!(rails_table_name("identifier"), None);
    }

    #[test]
    fn rails_columns_reference_plural_tables() {
        let mut graph = SchemaGraph::new();
        table(&mut graph, "vaccines", &["id", "name"]);
        table(&mut graph, "doses", &["id", "vaccine_id", "clinic_id"]);

        let found = find_rails(&graph, &InferenceOverrides::default());

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "rails:doses.vaccine_id");
        assert_eq!(found[0].kind(), ConstraintKind::Rails);

        let added = attach_inferred(&mut graph, found);
        assert_eq!(added.len(), 1);
        assert!(find_rails(&graph, &InferenceOverrides::default()).is_empty());
    }

    #[test]
    fn tables_without_id_are_ignored() {
        let mut graph = SchemaGraph::new();
        table(&mut graph, "vaccines", &["code"]);
        table(&mut graph, "doses", &["vaccine_id"]);

        assert!(find_rails(&graph, &InferenceOverrides::default()).is_empty());
    }
}

use serde::{Deserialize, Serialize};

use crate::analysis;
use crate::constraints::{ConstraintId, ConstraintKind, FkAction};
use crate::graph::SchemaGraph;
use crate::orderer::TableOrder;
use crate::schema::{ColumnId, TableId};
use crate::SNAPSHOT_VERSION;

/// Counts shown at the top of an ordering report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub tables: usize,
    pub constraints: usize,
    pub implied: usize,
    pub recursive: usize,
}

/// Flattened view of one constraint, named by table and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSummary {
    pub name: String,
    pub kind: ConstraintKind,
    pub child_table: String,
    pub child_columns: Vec<String>,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
    pub on_delete: FkAction,
}

impl ConstraintSummary {
    pub fn from_graph(graph: &SchemaGraph, id: ConstraintId) -> Self {
        let constraint = graph.constraint(id);
        let (parent, child) = graph.constraint_tables(id);
        Self {
            name: constraint.name().to_string(),
            kind: constraint.kind(),
            child_table: graph.table(child).full_name().to_string(),
            child_columns: column_names(graph, constraint.child_columns()),
            parent_table: graph.table(parent).full_name().to_string(),
            parent_columns: column_names(graph, constraint.parent_columns()),
            on_delete: constraint.on_delete(),
        }
    }
}

fn column_names(graph: &SchemaGraph, columns: &[ColumnId]) -> Vec<String> {
    columns
        .iter()
        .map(|id| graph.column(*id).name().to_string())
        .collect()
}

fn table_names(graph: &SchemaGraph, tables: &[TableId]) -> Vec<String> {
    tables
        .iter()
        .map(|id| graph.table(*id).full_name().to_string())
        .collect()
}

/// Serializable result of an ordering run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReport {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    pub summary: OrderSummary,
    pub insertion_order: Vec<String>,
    pub deletion_order: Vec<String>,
    pub skipped_remote: Vec<String>,
    pub recursive_constraints: Vec<ConstraintSummary>,
    pub implied_constraints: Vec<ConstraintSummary>,
}

/// Build a report from an ordering and the graph it was computed on.
///
/// Implied constraints list every inferred constraint in the graph, Rails ones included.
pub fn build_order_report(graph: &SchemaGraph, order: &TableOrder) -> OrderReport {
    let implied: Vec<ConstraintSummary> = graph
        .constraints()
        .filter(|(_, constraint)| !constraint.is_real())
        .map(|(id, _)| ConstraintSummary::from_graph(graph, id))
        .collect();

    OrderReport {
        schema_version: SNAPSHOT_VERSION.to_string(),
        run_id: None,
        generated_at: None,
        summary: OrderSummary {
            tables: order.insertion.len(),
            constraints: graph.constraint_count(),
            implied: implied.len(),
            recursive: order.recursive.len(),
        },
        insertion_order: table_names(graph, &order.insertion),
        deletion_order: table_names(graph, &order.deletion),
        skipped_remote: table_names(graph, &order.skipped_remote),
        recursive_constraints: order
            .recursive
            .iter()
            .map(|id| ConstraintSummary::from_graph(graph, *id))
            .collect(),
        implied_constraints: implied,
    }
}

/// Column reference in an anomaly listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Schema smells worth a second look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub schema_version: String,
    /// Tables with no declared relationships.
    pub orphan_tables: Vec<String>,
    pub tables_with_one_column: Vec<String>,
    pub tables_with_incrementing_column_names: Vec<String>,
    pub default_null_string_columns: Vec<ColumnRef>,
    /// Inferred constraints, a hint of missing declarations.
    pub implied_constraints: Vec<ConstraintSummary>,
}

pub fn build_anomaly_report(graph: &SchemaGraph) -> AnomalyReport {
    AnomalyReport {
        schema_version: SNAPSHOT_VERSION.to_string(),
        orphan_tables: table_names(graph, &analysis::orphan_tables(graph, false)),
        tables_with_one_column: table_names(graph, &analysis::tables_with_one_column(graph)),
        tables_with_incrementing_column_names: table_names(
            graph,
            &analysis::tables_with_incrementing_column_names(graph),
        ),
        default_null_string_columns: analysis::default_null_string_columns(graph)
            .into_iter()
            .map(|id| {
                let column = graph.column(id);
                ColumnRef {
                    table: graph.table(column.table()).full_name().to_string(),
                    column: column.name().to_string(),
                }
            })
            .collect(),
        implied_constraints: graph
            .constraints()
            .filter(|(_, constraint)| !constraint.is_real())
            .map(|(id, _)| ConstraintSummary::from_graph(graph, id))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ForeignKeyConstraint;
    use crate::orderer::order_tables;
    use crate::schema::{Column, Table};
    use crate::types::ColumnType;

    #[test]
    fn report_names_tables_by_full_name() {
        let mut graph = SchemaGraph::new();
        let users = graph
            .add_table(Table::new(None, Some("public"), "users"))
            .unwrap();
        let orders = graph
            .add_table(Table::new(None, Some("public"), "orders"))
            .unwrap();
        let id = graph
            .add_column(users, Column::new("id", ColumnType::named("int")))
            .unwrap();
        let user_id = graph
            .add_column(orders, Column::new("user_id", ColumnType::named("int")))
            .unwrap();
        graph
            .attach(ForeignKeyConstraint::new("fk_orders_user", id, user_id))
            .unwrap();

        let report = build_order_report(&graph, &order_tables(&graph));

        assert_eq!(report.insertion_order, vec!["public.users", "public.orders"]);
        assert_eq!(report.deletion_order, vec!["public.orders", "public.users"]);
        assert_eq!(report.summary.constraints, 1);
        assert_eq!(report.summary.implied, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("run_id").is_none());
        assert_eq!(json["summary"]["tables"], 2);
    }
}

//! Serialized schema metadata and graph loading.
//!
//! A snapshot is the output contract of a metadata collector: tables with
//! their columns, primary keys and declared foreign keys. Loading runs in two
//! passes so foreign keys may reference tables declared later in the file.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::{FkAction, ForeignKeyConstraint};
use crate::error::{Error, Result};
use crate::graph::{Attachment, SchemaGraph};
use crate::schema::{Column, ColumnId, Table, TableId, TableKind};
use crate::types::ColumnType;
use crate::SNAPSHOT_VERSION;

/// Top-level metadata snapshot for one analyzed schema.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaSnapshot {
    /// Contract version for this snapshot format.
    pub schema_version: String,
    /// Database name when available.
    #[serde(default)]
    pub database: Option<String>,
    pub tables: Vec<TableSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSnapshot {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub kind: TableKind,
    /// Declared outside the analyzed schema.
    #[serde(default)]
    pub remote: bool,
    /// Declared through metadata only, not present in the database.
    #[serde(default)]
    pub logical: bool,
    #[serde(default)]
    pub comment: Option<String>,
    pub columns: Vec<ColumnSnapshot>,
    /// Primary key column names in key sequence order.
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub type_code: Option<i32>,
    #[serde(default)]
    pub length: i32,
    #[serde(default)]
    pub decimal_digits: i32,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// A declared foreign key. Missing referenced catalog/schema default to the
/// referencing table's own.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeySnapshot {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub referenced_catalog: Option<String>,
    #[serde(default)]
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: FkAction,
    #[serde(default)]
    pub on_update: FkAction,
}

impl ColumnSnapshot {
    fn to_column(&self) -> Column {
        let column_type = ColumnType {
            type_name: self.type_name.clone(),
            type_code: self.type_code,
            length: self.length,
            decimal_digits: self.decimal_digits,
        };
        Column::new(&self.name, column_type)
            .nullable(self.nullable)
            .with_default(self.default_value.clone())
    }
}

impl SchemaGraph {
    /// Build a graph from a snapshot, attaching all declared foreign keys.
    pub fn from_snapshot(snapshot: &SchemaSnapshot) -> Result<Self> {
        if snapshot.schema_version != SNAPSHOT_VERSION {
            tracing::warn!(
                event = "snapshot_version_mismatch",
                found = %snapshot.schema_version,
                expected = SNAPSHOT_VERSION
            );
        }

        let mut graph = SchemaGraph::new();
        let mut declared = Vec::with_capacity(snapshot.tables.len());

        for table in &snapshot.tables {
            let id = add_table(&mut graph, table)?;
            declared.push(id);
        }

        let mut attached = 0usize;
        for (table, id) in snapshot.tables.iter().zip(declared) {
            for fk in &table.foreign_keys {
                if attach_foreign_key(&mut graph, table, id, fk)?.is_added() {
                    attached += 1;
                }
            }
        }

        tracing::info!(
            event = "snapshot_loaded",
            tables = snapshot.tables.len(),
            remote = graph.tables().filter(|table| table.is_remote()).count(),
            constraints = attached
        );
        Ok(graph)
    }
}

fn add_table(graph: &mut SchemaGraph, snapshot: &TableSnapshot) -> Result<TableId> {
    let mut table = Table::new(
        snapshot.catalog.as_deref(),
        snapshot.schema.as_deref(),
        &snapshot.name,
    )
    .with_kind(snapshot.kind)
    .with_comment(snapshot.comment.clone());
    if snapshot.remote {
        table = table.remote();
    }
    if snapshot.logical {
        table = table.logical();
    }

    let id = graph.add_table(table)?;
    for column in &snapshot.columns {
        graph.add_column(id, column.to_column())?;
    }

    let primary_key = snapshot
        .primary_key
        .iter()
        .map(|name| existing_column(graph, id, name))
        .collect::<Result<Vec<_>>>()?;
    graph.set_primary_key(id, &primary_key)?;
    Ok(id)
}

fn existing_column(graph: &SchemaGraph, table: TableId, name: &str) -> Result<ColumnId> {
    graph
        .table(table)
        .column_id(name)
        .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", graph.table(table).full_name(), name)))
}

fn attach_foreign_key(
    graph: &mut SchemaGraph,
    table: &TableSnapshot,
    child_table: TableId,
    fk: &ForeignKeySnapshot,
) -> Result<Attachment> {
    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
        return Err(Error::InvalidSchema(format!(
            "foreign key {} on {} maps {} columns to {}",
            fk.name,
            graph.table(child_table).full_name(),
            fk.columns.len(),
            fk.referenced_columns.len()
        )));
    }

    let children = fk
        .columns
        .iter()
        .map(|name| existing_column(graph, child_table, name))
        .collect::<Result<Vec<_>>>()?;

    let catalog = fk.referenced_catalog.as_deref().or(table.catalog.as_deref());
    let schema = fk.referenced_schema.as_deref().or(table.schema.as_deref());
    let parent_table = match graph.find_table(catalog, schema, &fk.referenced_table) {
        Some(id) => id,
        None => {
            tracing::debug!(
                event = "remote_table_added",
                table = %fk.referenced_table,
                referenced_by = %fk.name
            );
            graph.add_table(Table::new(catalog, schema, &fk.referenced_table).remote())?
        }
    };

    let parents = if graph.table(parent_table).is_remote() {
        fk.referenced_columns
            .iter()
            .map(|name| graph.ensure_column(parent_table, name))
            .collect::<Result<Vec<_>>>()?
    } else {
        fk.referenced_columns
            .iter()
            .map(|name| existing_column(graph, parent_table, name))
            .collect::<Result<Vec<_>>>()?
    };

    let constraint = ForeignKeyConstraint::composite(&fk.name, parents, children)
        .with_rules(fk.on_update, fk.on_delete);
    graph.attach(constraint)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> ColumnSnapshot {
        ColumnSnapshot {
            name: name.to_string(),
            type_name: "int4".to_string(),
            type_code: Some(4),
            length: 0,
            decimal_digits: 0,
            nullable: false,
            default_value: None,
        }
    }

    fn table(name: &str, columns: &[&str], primary_key: &[&str]) -> TableSnapshot {
        TableSnapshot {
            catalog: None,
            schema: Some("public".to_string()),
            name: name.to_string(),
            kind: TableKind::Table,
            remote: false,
            logical: false,
            comment: None,
            columns: columns.iter().map(|name| column(name)).collect(),
            primary_key: primary_key.iter().map(|name| name.to_string()).collect(),
            foreign_keys: Vec::new(),
        }
    }

    fn fk(name: &str, columns: &[&str], table: &str, referenced: &[&str]) -> ForeignKeySnapshot {
        ForeignKeySnapshot {
            name: name.to_string(),
            columns: columns.iter().map(|name| name.to_string()).collect(),
            referenced_catalog: None,
            referenced_schema: None,
            referenced_table: table.to_string(),
            referenced_columns: referenced.iter().map(|name| name.to_string()).collect(),
            on_delete: FkAction::Cascade,
            on_update: FkAction::NoAction,
        }
    }

    fn snapshot(tables: Vec<TableSnapshot>) -> SchemaSnapshot {
        SchemaSnapshot {
            schema_version: SNAPSHOT_VERSION.to_string(),
            database: Some("shop".to_string()),
            tables,
        }
    }

    #[test]
    fn forward_references_resolve() {
        let mut orders = table("orders", &["id", "user_id"], &["id"]);
        orders.foreign_keys.push(fk("fk_orders_user", &["user_id"], "users", &["id"]));
        let users = table("users", &["id"], &["id"]);

        let graph = SchemaGraph::from_snapshot(&snapshot(vec![orders, users])).unwrap();

        assert_eq!(graph.constraint_count(), 1);
        let users = graph.find_table(None, Some("public"), "users").unwrap();
        let orders = graph.find_table(None, Some("public"), "orders").unwrap();
        assert_eq!(graph.table_children(users).into_iter().collect::<Vec<_>>(), vec![orders]);
        let (_, constraint) = graph.constraints().next().unwrap();
        assert!(constraint.is_cascade_on_delete());
    }

    #[test]
    fn unknown_referenced_tables_become_remote() {
        let mut orders = table("orders", &["id", "account_id"], &["id"]);
        let mut reference = fk("fk_account", &["account_id"], "accounts", &["id"]);
        reference.referenced_schema = Some("billing".to_string());
        orders.foreign_keys.push(reference);

        let graph = SchemaGraph::from_snapshot(&snapshot(vec![orders])).unwrap();

        let remote = graph.find_table(None, Some("billing"), "accounts").unwrap();
        assert!(graph.table(remote).is_remote());
        assert!(graph.table(remote).column_id("id").is_some());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn missing_columns_are_reported() {
        let mut orders = table("orders", &["id", "user_id"], &["id"]);
        orders.foreign_keys.push(fk("fk_orders_user", &["user_id"], "users", &["uuid"]));
        let users = table("users", &["id"], &["id"]);

        let err = SchemaGraph::from_snapshot(&snapshot(vec![orders, users])).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(message) if message == "public.users.uuid"));

        let broken_pk = table("users", &["id"], &["missing"]);
        let err = SchemaGraph::from_snapshot(&snapshot(vec![broken_pk])).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(_)));
    }

    #[test]
    fn mismatched_column_counts_are_invalid() {
        let mut orders = table("orders", &["id", "user_id"], &["id"]);
        orders
            .foreign_keys
            .push(fk("fk_orders_user", &["user_id", "id"], "users", &["id"]));
        let users = table("users", &["id"], &["id"]);

        let err = SchemaGraph::from_snapshot(&snapshot(vec![orders, users])).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn duplicate_tables_are_invalid() {
        let err = SchemaGraph::from_snapshot(&snapshot(vec![
            table("users", &["id"], &[]),
            table("USERS", &["id"], &[]),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn snapshot_defaults_fill_optional_fields() {
        let json = r#"{
            "schema_version": "0.1",
            "tables": [
                { "name": "users", "columns": [ { "name": "id" } ] }
            ]
        }"#;
        let parsed: SchemaSnapshot = serde_json::from_str(json).unwrap();
        let users = &parsed.tables[0];
        assert_eq!(users.kind, TableKind::Table);
        assert!(!users.remote);
        assert!(users.foreign_keys.is_empty());
        assert_eq!(users.columns[0].type_name, "");
    }
}

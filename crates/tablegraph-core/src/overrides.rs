use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::SchemaGraph;
use crate::schema::ColumnId;

/// Knobs shared by the naming-convention finders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceOptions {
    /// Run the implied constraint finder.
    pub implied: bool,
    /// Run the Rails `<singular>_id` finder.
    pub rails: bool,
    /// Implied matches must also agree on column type and length.
    pub require_type_match: bool,
    /// Column names never treated as implied children (case-insensitive).
    pub ignored_columns: Vec<String>,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            implied: true,
            rails: false,
            require_type_match: true,
            ignored_columns: Vec::new(),
        }
    }
}

impl InferenceOptions {
    pub fn is_ignored(&self, column: &str) -> bool {
        self.ignored_columns
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(column))
    }
}

/// Declarative per-column suppression flags.
///
/// `table` matches either the bare table name or its full name, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverride {
    pub table: String,
    pub column: String,
    /// When false, the column is never given an implied parent.
    #[serde(default = "default_true")]
    pub implied_parents: bool,
    /// When false, the column is never proposed as an implied parent.
    #[serde(default = "default_true")]
    pub implied_children: bool,
}

fn default_true() -> bool {
    true
}

/// Overrides indexed for lookup during inference.
#[derive(Debug, Clone, Default)]
pub struct InferenceOverrides {
    entries: BTreeMap<(String, String), ColumnOverride>,
}

impl InferenceOverrides {
    pub fn new(overrides: impl IntoIterator<Item = ColumnOverride>) -> Self {
        let entries = overrides
            .into_iter()
            .map(|entry| {
                let key = (entry.table.to_lowercase(), entry.column.to_lowercase());
                (key, entry)
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, graph: &SchemaGraph, column: ColumnId) -> Option<&ColumnOverride> {
        if self.entries.is_empty() {
            return None;
        }
        let column = graph.column(column);
        let table = graph.table(column.table());
        let column_key = column.name().to_lowercase();

        self.entries
            .get(&(table.full_name().to_lowercase(), column_key.clone()))
            .or_else(|| self.entries.get(&(table.name().to_lowercase(), column_key)))
    }

    pub fn allows_implied_parents(&self, graph: &SchemaGraph, column: ColumnId) -> bool {
        self.lookup(graph, column)
            .is_none_or(|entry| entry.implied_parents)
    }

    pub fn allows_implied_children(&self, graph: &SchemaGraph, column: ColumnId) -> bool {
        self.lookup(graph, column)
            .is_none_or(|entry| entry.implied_children)
    }
}

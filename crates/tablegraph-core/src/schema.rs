use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintId;
use crate::types::ColumnType;

/// Unique identifier for a table within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Unique identifier for a column within a graph (not per table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnId({})", self.0)
    }
}

/// Kind of table-like object represented in the catalog.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
}

/// A table or view and everything the graph knows about it.
///
/// Columns and constraints are owned by the [`SchemaGraph`](crate::SchemaGraph)
/// registry; the table keeps their ids. Column lookup by name is
/// case-insensitive, iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct Table {
    pub(crate) id: TableId,
    catalog: Option<String>,
    schema: Option<String>,
    name: String,
    full_name: String,
    sort_key: String,
    kind: TableKind,
    remote: bool,
    logical: bool,
    comment: Option<String>,
    pub(crate) columns: Vec<ColumnId>,
    pub(crate) column_index: BTreeMap<String, ColumnId>,
    pub(crate) primary_key: Vec<ColumnId>,
    pub(crate) foreign_keys: BTreeMap<String, ConstraintId>,
}

impl Table {
    pub fn new(catalog: Option<&str>, schema: Option<&str>, name: impl Into<String>) -> Self {
        let name = name.into();
        let full_name = full_name(catalog, schema, &name);
        Self {
            id: TableId(u32::MAX),
            catalog: catalog.map(str::to_string),
            schema: schema.map(str::to_string),
            sort_key: full_name.to_lowercase(),
            full_name,
            name,
            kind: TableKind::Table,
            remote: false,
            logical: false,
            comment: None,
            columns: Vec::new(),
            column_index: BTreeMap::new(),
            primary_key: Vec::new(),
            foreign_keys: BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: TableKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark as declared outside the analyzed schema.
    pub fn remote(mut self) -> Self {
        self.remote = true;
        self
    }

    /// Mark as synthetic: declared through metadata only.
    pub fn logical(mut self) -> Self {
        self.logical = true;
        self
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        self
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `catalog.schema.name` with absent parts omitted.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// First of schema or catalog, the namespace the table lives in.
    pub fn container(&self) -> Option<&str> {
        self.schema().or(self.catalog())
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn is_view(&self) -> bool {
        self.kind == TableKind::View
    }

    pub fn is_remote(&self) -> bool {
        self.remote
    }

    pub fn is_logical(&self) -> bool {
        self.logical
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Column ids in insertion order.
    pub fn column_ids(&self) -> &[ColumnId] {
        &self.columns
    }

    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.column_index.get(&name.to_lowercase()).copied()
    }

    /// Primary key columns ordered by key sequence.
    pub fn primary_key(&self) -> &[ColumnId] {
        &self.primary_key
    }

    pub fn is_primary(&self, column: ColumnId) -> bool {
        self.primary_key.contains(&column)
    }

    /// Constraints where this table is the referencing side, by lowercase name.
    pub fn foreign_keys(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.foreign_keys.values().copied()
    }

    pub fn foreign_key(&self, name: &str) -> Option<ConstraintId> {
        self.foreign_keys.get(&name.to_lowercase()).copied()
    }

    /// Deterministic ordering: full name ignoring case, then exact full name.
    pub fn compare(&self, other: &Table) -> Ordering {
        self.sort_key
            .cmp(&other.sort_key)
            .then_with(|| self.full_name.cmp(&other.full_name))
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub(crate) fn full_name(catalog: Option<&str>, schema: Option<&str>, name: &str) -> String {
    catalog
        .into_iter()
        .chain(schema)
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(".")
}

/// Column metadata plus both sides of its relationships.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) id: ColumnId,
    pub(crate) table: TableId,
    pub(crate) ordinal: usize,
    name: String,
    column_type: ColumnType,
    nullable: bool,
    default_value: Option<String>,
    /// Referenced columns, keyed by the parent column.
    pub(crate) parents: BTreeMap<ColumnId, ConstraintId>,
    /// Referencing columns, keyed by the child column.
    pub(crate) children: BTreeMap<ColumnId, ConstraintId>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            id: ColumnId(u32::MAX),
            table: TableId(u32::MAX),
            ordinal: 0,
            name: name.into(),
            column_type,
            nullable: false,
            default_value: None,
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Stand-in for a column whose metadata has not been collected.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::default()).nullable(true)
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, default_value: Option<String>) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// Zero-based position within the owning table.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// True when this column references another column.
    pub fn is_foreign_key(&self) -> bool {
        !self.parents.is_empty()
    }

    pub fn parents(&self) -> impl Iterator<Item = (ColumnId, ConstraintId)> + '_ {
        self.parents.iter().map(|(column, constraint)| (*column, *constraint))
    }

    pub fn children(&self) -> impl Iterator<Item = (ColumnId, ConstraintId)> + '_ {
        self.children.iter().map(|(column, constraint)| (*column, *constraint))
    }

    pub fn parent_constraint(&self, parent: ColumnId) -> Option<ConstraintId> {
        self.parents.get(&parent).copied()
    }

    pub fn child_constraint(&self, child: ColumnId) -> Option<ConstraintId> {
        self.children.get(&child).copied()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

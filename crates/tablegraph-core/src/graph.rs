//! Relationship graph: tables, columns and the shared constraint registry.
//!
//! Provides:
//! - Arena storage keyed by [`TableId`], [`ColumnId`] and [`ConstraintId`]
//! - Idempotent constraint attachment that keeps both column sides in sync
//! - Table-level parent/child queries used by ordering and analysis

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::{ConstraintId, ForeignKeyConstraint};
use crate::error::{Error, Result};
use crate::schema::{Column, ColumnId, Table, TableId, full_name};

/// Result of [`SchemaGraph::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The constraint was registered under a new id.
    Added(ConstraintId),
    /// An equivalent constraint already existed; nothing changed.
    Duplicate(ConstraintId),
}

impl Attachment {
    pub fn id(self) -> ConstraintId {
        match self {
            Attachment::Added(id) | Attachment::Duplicate(id) => id,
        }
    }

    pub fn is_added(self) -> bool {
        matches!(self, Attachment::Added(_))
    }
}

/// Schema relationship graph.
///
/// Constraints live in a single registry. A child column's `parents`, the
/// parent column's `children` and the child table's named constraint map all
/// hold the same [`ConstraintId`], so the two directions cannot drift apart.
///
/// Ids are only meaningful for the graph that issued them; the by-id
/// accessors panic on ids from another graph, like slice indexing.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    tables: Vec<Table>,
    columns: Vec<Column>,
    constraints: Vec<ForeignKeyConstraint>,
    table_index: BTreeMap<String, TableId>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table, returning its id. Full names must be unique ignoring case.
    pub fn add_table(&mut self, mut table: Table) -> Result<TableId> {
        let key = table.full_name().to_lowercase();
        if self.table_index.contains_key(&key) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.full_name()
            )));
        }

        let id = TableId(self.tables.len() as u32);
        table.id = id;
        tracing::debug!(event = "table_added", table = %table.full_name(), remote = table.is_remote());
        self.table_index.insert(key, id);
        self.tables.push(table);
        Ok(id)
    }

    /// Append a column to `table`. Names must be unique per table ignoring case.
    pub fn add_column(&mut self, table: TableId, mut column: Column) -> Result<ColumnId> {
        let owner = self
            .tables
            .get_mut(table.0 as usize)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;

        let key = column.name().to_lowercase();
        if owner.column_index.contains_key(&key) {
            return Err(Error::InvalidSchema(format!(
                "duplicate column name: {}.{}",
                owner.full_name(),
                column.name()
            )));
        }

        let id = ColumnId(self.columns.len() as u32);
        column.id = id;
        column.table = table;
        column.ordinal = owner.columns.len();
        owner.columns.push(id);
        owner.column_index.insert(key, id);
        self.columns.push(column);
        Ok(id)
    }

    /// Look up a column by name, creating a placeholder when it is missing.
    pub fn ensure_column(&mut self, table: TableId, name: &str) -> Result<ColumnId> {
        let existing = self
            .tables
            .get(table.0 as usize)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?
            .column_id(name);

        match existing {
            Some(id) => Ok(id),
            None => self.add_column(table, Column::placeholder(name)),
        }
    }

    /// Declare the primary key of `table`, in key sequence order.
    pub fn set_primary_key(&mut self, table: TableId, columns: &[ColumnId]) -> Result<()> {
        if table.0 as usize >= self.tables.len() {
            return Err(Error::TableNotFound(table.to_string()));
        }

        for column in columns {
            let owner = self.get_column(*column)?.table;
            if owner != table {
                return Err(Error::InvalidSchema(format!(
                    "primary key column {} does not belong to {}",
                    self.qualified_column(*column),
                    self.table(table).full_name()
                )));
            }
        }

        self.tables[table.0 as usize].primary_key = columns.to_vec();
        Ok(())
    }

    /// Attach a constraint to both endpoint columns and the child table.
    ///
    /// Attaching a constraint whose column pairs are already connected is a
    /// no-op that returns [`Attachment::Duplicate`]. A constraint that shares
    /// some pairs or its name with a different constraint is rejected.
    pub fn attach(&mut self, constraint: ForeignKeyConstraint) -> Result<Attachment> {
        let (_, child_table) = self.validate_endpoints(&constraint)?;

        for (parent, child) in constraint.column_pairs() {
            if let Some(existing) = self.columns[child.0 as usize].parent_constraint(parent) {
                if self.constraint(existing).same_columns(&constraint) {
                    tracing::debug!(
                        event = "constraint_duplicate_skipped",
                        constraint = %constraint.name(),
                        existing = %self.constraint(existing).name()
                    );
                    return Ok(Attachment::Duplicate(existing));
                }
                return Err(Error::DuplicateConstraint(format!(
                    "{} overlaps {} on {} -> {}",
                    constraint.name(),
                    self.constraint(existing).name(),
                    self.qualified_column(parent),
                    self.qualified_column(child)
                )));
            }
        }

        let name_key = constraint.name().to_lowercase();
        if let Some(existing) = self.tables[child_table.0 as usize].foreign_key(&name_key) {
            return Err(Error::DuplicateConstraint(format!(
                "{}.{} already names {}",
                self.table(child_table).full_name(),
                constraint.name(),
                self.describe(existing)
            )));
        }

        let id = ConstraintId(self.constraints.len() as u32);
        for (parent, child) in constraint.column_pairs() {
            self.columns[child.0 as usize].parents.insert(parent, id);
            self.columns[parent.0 as usize].children.insert(child, id);
        }
        self.tables[child_table.0 as usize]
            .foreign_keys
            .insert(name_key, id);
        self.constraints.push(constraint);

        tracing::debug!(event = "constraint_attached", constraint = %self.describe(id));
        Ok(Attachment::Added(id))
    }

    fn validate_endpoints(&self, constraint: &ForeignKeyConstraint) -> Result<(TableId, TableId)> {
        let parents = constraint.parent_columns();
        let children = constraint.child_columns();
        if parents.is_empty() || parents.len() != children.len() {
            return Err(Error::InvalidSchema(format!(
                "constraint {} pairs {} parent columns with {} child columns",
                constraint.name(),
                parents.len(),
                children.len()
            )));
        }

        let parent_table = self.single_owner(constraint.name(), parents)?;
        let child_table = self.single_owner(constraint.name(), children)?;

        if let Some((column, _)) = constraint
            .column_pairs()
            .find(|(parent, child)| parent == child)
        {
            return Err(Error::SelfReferencingColumn(format!(
                "{} on {}",
                constraint.name(),
                self.qualified_column(column)
            )));
        }

        Ok((parent_table, child_table))
    }

    fn single_owner(&self, name: &str, columns: &[ColumnId]) -> Result<TableId> {
        let mut owner = None;
        for column in columns {
            let table = self.get_column(*column)?.table;
            match owner {
                None => owner = Some(table),
                Some(existing) if existing != table => {
                    return Err(Error::InvalidSchema(format!(
                        "constraint {name} spans columns of more than one table"
                    )));
                }
                Some(_) => {}
            }
        }
        owner.ok_or_else(|| Error::InvalidSchema(format!("constraint {name} has no columns")))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0 as usize]
    }

    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.0 as usize]
    }

    /// Checked column lookup.
    pub fn get_column(&self, id: ColumnId) -> Result<&Column> {
        self.columns
            .get(id.0 as usize)
            .ok_or(Error::UnknownColumn(id))
    }

    pub fn constraint(&self, id: ConstraintId) -> &ForeignKeyConstraint {
        &self.constraints[id.0 as usize]
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn table_ids(&self) -> impl Iterator<Item = TableId> + '_ {
        self.tables.iter().map(Table::id)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &ForeignKeyConstraint)> {
        self.constraints
            .iter()
            .enumerate()
            .map(|(index, constraint)| (ConstraintId(index as u32), constraint))
    }

    /// Exact lookup by qualified name, ignoring case.
    pub fn find_table(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        name: &str,
    ) -> Option<TableId> {
        let key = full_name(catalog, schema, name).to_lowercase();
        self.table_index.get(&key).copied()
    }

    /// Tables whose unqualified name matches, ignoring case, in id order.
    pub fn tables_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = TableId> + 'a {
        self.tables
            .iter()
            .filter(move |table| table.name().eq_ignore_ascii_case(name))
            .map(Table::id)
    }

    /// Columns of `table` in insertion order.
    pub fn table_columns(&self, table: TableId) -> impl Iterator<Item = &Column> + '_ {
        self.table(table)
            .column_ids()
            .iter()
            .map(|id| self.column(*id))
    }

    pub fn column_by_name(&self, table: TableId, name: &str) -> Option<&Column> {
        self.table(table).column_id(name).map(|id| self.column(id))
    }

    pub fn primary_columns(&self, table: TableId) -> impl Iterator<Item = &Column> + '_ {
        self.table(table)
            .primary_key()
            .iter()
            .map(|id| self.column(*id))
    }

    pub fn is_primary(&self, column: ColumnId) -> bool {
        let owner = self.column(column).table;
        self.table(owner).is_primary(column)
    }

    /// Referenced (parent) table of a constraint.
    pub fn parent_table(&self, id: ConstraintId) -> TableId {
        let first = self.constraint(id).parent_columns()[0];
        self.column(first).table
    }

    /// Referencing (child) table of a constraint.
    pub fn child_table(&self, id: ConstraintId) -> TableId {
        let first = self.constraint(id).child_columns()[0];
        self.column(first).table
    }

    /// `(parent table, child table)` of a constraint.
    pub fn constraint_tables(&self, id: ConstraintId) -> (TableId, TableId) {
        (self.parent_table(id), self.child_table(id))
    }

    /// Columns referenced by `column`.
    pub fn parents_of(&self, column: ColumnId) -> impl Iterator<Item = &Column> + '_ {
        self.column(column)
            .parents
            .keys()
            .map(|parent| self.column(*parent))
    }

    /// Columns referencing `column`.
    pub fn children_of(&self, column: ColumnId) -> impl Iterator<Item = &Column> + '_ {
        self.column(column)
            .children
            .keys()
            .map(|child| self.column(*child))
    }

    pub fn is_foreign_key(&self, column: ColumnId) -> bool {
        self.column(column).is_foreign_key()
    }

    /// Constraint connecting `parent` to `child`, if any.
    pub fn constraint_between(&self, parent: ColumnId, child: ColumnId) -> Option<ConstraintId> {
        self.column(child).parent_constraint(parent)
    }

    /// Whether `a` and `b` are connected in either direction.
    pub fn are_related(&self, a: ColumnId, b: ColumnId) -> bool {
        self.constraint_between(a, b).is_some() || self.constraint_between(b, a).is_some()
    }

    /// Number of column-level references this table makes.
    pub fn num_parents(&self, table: TableId) -> usize {
        self.table_columns(table)
            .map(|column| column.parents.len())
            .sum()
    }

    /// Number of column-level references made to this table.
    pub fn num_children(&self, table: TableId) -> usize {
        self.table_columns(table)
            .map(|column| column.children.len())
            .sum()
    }

    /// A root references no other table.
    pub fn is_root(&self, table: TableId) -> bool {
        self.table_columns(table).all(|column| !column.is_foreign_key())
    }

    /// A leaf is referenced by no other table.
    pub fn is_leaf(&self, table: TableId) -> bool {
        self.table_columns(table)
            .all(|column| column.children.is_empty())
    }

    /// Distinct tables referenced by `table` (self included for self-references).
    pub fn table_parents(&self, table: TableId) -> BTreeSet<TableId> {
        self.table_columns(table)
            .flat_map(|column| column.parents.keys())
            .map(|parent| self.column(*parent).table)
            .collect()
    }

    /// Distinct tables referencing `table`.
    pub fn table_children(&self, table: TableId) -> BTreeSet<TableId> {
        self.table_columns(table)
            .flat_map(|column| column.children.keys())
            .map(|child| self.column(*child).table)
            .collect()
    }

    /// Constraints declared on the database side (not inferred).
    pub fn real_constraints(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraints()
            .filter(|(_, constraint)| constraint.is_real())
            .map(|(id, _)| id)
    }

    pub fn implied_constraints(&self) -> impl Iterator<Item = ConstraintId> + '_ {
        self.constraints()
            .filter(|(_, constraint)| constraint.is_implied())
            .map(|(id, _)| id)
    }

    /// Sort table ids by the tables' deterministic ordering.
    pub fn sort_tables(&self, ids: &mut [TableId]) {
        ids.sort_by(|a, b| self.compare_tables(*a, *b));
    }

    pub fn compare_tables(&self, a: TableId, b: TableId) -> Ordering {
        self.table(a).compare(self.table(b))
    }

    /// `table.column` for messages.
    pub fn qualified_column(&self, id: ColumnId) -> String {
        match self.columns.get(id.0 as usize) {
            Some(column) => format!("{}.{}", self.table(column.table).name(), column.name()),
            None => id.to_string(),
        }
    }

    fn column_list(&self, columns: &[ColumnId]) -> String {
        let names: Vec<&str> = columns.iter().map(|id| self.column(*id).name()).collect();
        match names.as_slice() {
            [single] => (*single).to_string(),
            _ => format!("[{}]", names.join(", ")),
        }
    }

    /// One-line description: `child.col references parent.col via name`.
    pub fn describe(&self, id: ConstraintId) -> String {
        let constraint = self.constraint(id);
        let parent = self.table(self.parent_table(id));
        let child = self.table(self.child_table(id));

        let mut text = format!(
            "{}.{} references ",
            child.name(),
            self.column_list(constraint.child_columns())
        );
        if parent.is_remote() {
            if let Some(container) = parent.container() {
                text.push_str(container);
                text.push('.');
            }
        }
        text.push_str(&format!(
            "{}.{} via {}",
            parent.name(),
            self.column_list(constraint.parent_columns()),
            constraint.name()
        ));
        text
    }
}

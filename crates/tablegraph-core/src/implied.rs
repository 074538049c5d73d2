//! Naming-convention relationship inference.
//!
//! A column such as `Album.ArtistId` is taken to reference `Artist.Id` when
//! the normalized column name equals the normalized table name followed by
//! the normalized primary key name. Columns whose normalized name equals
//! another table's normalized primary key name are matched as a fallback. Ambiguous matches produce
//! nothing.

use crate::constraints::{ConstraintId, ConstraintKind, ForeignKeyConstraint};
use crate::graph::{Attachment, SchemaGraph};
use crate::overrides::{InferenceOptions, InferenceOverrides};
use crate::schema::{ColumnId, TableId};

/// Prefix of synthesized implied constraint names.
pub const IMPLIED_PREFIX: &str = "implied:";

/// Lowercase and keep only alphanumeric characters.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|ch| ch.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug)]
struct ParentKey {
    table: TableId,
    column: ColumnId,
    /// `norm(column)`; empty names never match.
    normalized: String,
    /// `norm(table) + norm(column)`; `None` when either part normalizes to nothing.
    joined: Option<String>,
}

/// Proposes implied constraints over a populated graph.
pub struct ImpliedConstraintFinder<'a> {
    graph: &'a SchemaGraph,
    options: &'a InferenceOptions,
    overrides: &'a InferenceOverrides,
}

impl<'a> ImpliedConstraintFinder<'a> {
    pub fn new(
        graph: &'a SchemaGraph,
        options: &'a InferenceOptions,
        overrides: &'a InferenceOverrides,
    ) -> Self {
        Self {
            graph,
            options,
            overrides,
        }
    }

    /// Candidate constraints in deterministic order. Never mutates the graph.
    pub fn find(&self) -> Vec<ForeignKeyConstraint> {
        let parents = self.parent_keys();
        let mut found = Vec::new();

        for child in self.child_candidates() {
            let matches: Vec<&ParentKey> = parents
                .iter()
                .filter(|parent| self.matches(parent, child))
                .collect();

            let parent = match matches.as_slice() {
                [single] => *single,
                [] => continue,
                _ => {
                    tracing::debug!(
                        event = "implied_ambiguous",
                        column = %self.graph.qualified_column(child),
                        candidates = matches.len()
                    );
                    continue;
                }
            };

            if self.graph.are_related(parent.column, child) {
                continue;
            }

            let column = self.graph.column(child);
            let table = self.graph.table(column.table());
            found.push(ForeignKeyConstraint::inferred(
                ConstraintKind::Implied,
                format!("{IMPLIED_PREFIX}{}.{}", table.name(), column.name()),
                parent.column,
                child,
            ));
        }

        tracing::debug!(event = "implied_found", count = found.len());
        found
    }

    /// Single-column primary keys of every table, sorted by table.
    fn parent_keys(&self) -> Vec<ParentKey> {
        let mut tables: Vec<TableId> = self.graph.table_ids().collect();
        self.graph.sort_tables(&mut tables);

        tables
            .into_iter()
            .filter_map(|table_id| {
                let table = self.graph.table(table_id);
                let [column] = table.primary_key() else {
                    return None;
                };
                if !self.overrides.allows_implied_children(self.graph, *column) {
                    return None;
                }

                let table_part = normalize(table.name());
                let column_part = normalize(self.graph.column(*column).name());
                let joined = (!table_part.is_empty() && !column_part.is_empty())
                    .then(|| format!("{table_part}{column_part}"));

                Some(ParentKey {
                    table: table_id,
                    column: *column,
                    normalized: column_part,
                    joined,
                })
            })
            .collect()
    }

    /// Columns that could still gain a parent, sorted by table then name.
    fn child_candidates(&self) -> Vec<ColumnId> {
        let mut tables: Vec<TableId> = self.graph.table_ids().collect();
        self.graph.sort_tables(&mut tables);

        let mut candidates = Vec::new();
        for table in tables {
            let mut columns: Vec<ColumnId> = self
                .graph
                .table_columns(table)
                .filter(|column| {
                    !column.is_foreign_key()
                        && !self.graph.is_primary(column.id())
                        && !self.options.is_ignored(column.name())
                        && self.overrides.allows_implied_parents(self.graph, column.id())
                })
                .map(|column| column.id())
                .collect();
            columns.sort_by(|a, b| {
                let a = self.graph.column(*a).name();
                let b = self.graph.column(*b).name();
                a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
            });
            candidates.extend(columns);
        }
        candidates
    }

    fn matches(&self, parent: &ParentKey, child: ColumnId) -> bool {
        let child_column = self.graph.column(child);
        if child_column.table() == parent.table {
            return false;
        }

        let child_name = normalize(child_column.name());
        if child_name.is_empty() {
            return false;
        }
        let joined = parent.joined.as_deref() == Some(child_name.as_str());
        let exact = child_name == parent.normalized;
        if !(joined || exact) {
            return false;
        }

        let parent_column = self.graph.column(parent.column);
        !self.options.require_type_match
            || child_column
                .column_type()
                .is_compatible_with(parent_column.column_type())
    }
}

/// Run the implied finder with the given options.
pub fn find_implied(
    graph: &SchemaGraph,
    options: &InferenceOptions,
    overrides: &InferenceOverrides,
) -> Vec<ForeignKeyConstraint> {
    ImpliedConstraintFinder::new(graph, options, overrides).find()
}

/// Attach inferred constraints, returning the ids of those actually added.
///
/// Constraints that duplicate an existing one are skipped; constraints the
/// graph rejects are logged and skipped.
pub fn attach_inferred(
    graph: &mut SchemaGraph,
    constraints: Vec<ForeignKeyConstraint>,
) -> Vec<ConstraintId> {
    let mut added = Vec::new();
    for constraint in constraints {
        let name = constraint.name().to_string();
        match graph.attach(constraint) {
            Ok(Attachment::Added(id)) => added.push(id),
            Ok(Attachment::Duplicate(_)) => {}
            Err(err) => {
                tracing::warn!(event = "inferred_constraint_skipped", constraint = %name, error = %err);
            }
        }
    }
    added
}

/// Find implied constraints and attach them in one step.
pub fn attach_implied(
    graph: &mut SchemaGraph,
    options: &InferenceOptions,
    overrides: &InferenceOverrides,
) -> Vec<ConstraintId> {
    let found = find_implied(graph, options, overrides);
    let added = attach_inferred(graph, found);
    tracing::info!(event = "implied_attached", count = added.len());
    added
}

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::ColumnId;

/// Index of a constraint in the graph's shared registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConstraintId(pub u32);

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstraintId({})", self.0)
    }
}

/// Foreign key action semantics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    Unknown,
}

/// Where a constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Declared by the database or by metadata overrides.
    Real,
    /// Inferred from column naming.
    Implied,
    /// Inferred from Rails `<singular>_id` conventions.
    Rails,
}

/// A directed edge from referenced (parent) columns to referencing (child) columns.
///
/// Composite keys are stored as ordered column pairs; most constraints have
/// exactly one pair. Values are immutable once built and are owned by the
/// graph's registry, both endpoint columns refer to them by [`ConstraintId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint {
    name: String,
    kind: ConstraintKind,
    parent_columns: Vec<ColumnId>,
    child_columns: Vec<ColumnId>,
    on_update: FkAction,
    on_delete: FkAction,
}

impl ForeignKeyConstraint {
    /// Declared single-column constraint with `NO ACTION` rules.
    pub fn new(name: impl Into<String>, parent: ColumnId, child: ColumnId) -> Self {
        Self::composite(name, vec![parent], vec![child])
    }

    /// Declared constraint over matching column lists.
    pub fn composite(
        name: impl Into<String>,
        parent_columns: Vec<ColumnId>,
        child_columns: Vec<ColumnId>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Real,
            parent_columns,
            child_columns,
            on_update: FkAction::NoAction,
            on_delete: FkAction::NoAction,
        }
    }

    /// Constraint proposed by a naming heuristic rather than declared.
    pub fn inferred(
        kind: ConstraintKind,
        name: impl Into<String>,
        parent: ColumnId,
        child: ColumnId,
    ) -> Self {
        Self {
            kind,
            ..Self::new(name, parent, child)
        }
    }

    pub fn with_rules(mut self, on_update: FkAction, on_delete: FkAction) -> Self {
        self.on_update = on_update;
        self.on_delete = on_delete;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn is_implied(&self) -> bool {
        self.kind == ConstraintKind::Implied
    }

    /// True only for constraints that came from the database metadata.
    pub fn is_real(&self) -> bool {
        self.kind == ConstraintKind::Real
    }

    pub fn parent_columns(&self) -> &[ColumnId] {
        &self.parent_columns
    }

    pub fn child_columns(&self) -> &[ColumnId] {
        &self.child_columns
    }

    /// Ordered `(parent, child)` column pairs.
    pub fn column_pairs(&self) -> impl Iterator<Item = (ColumnId, ColumnId)> + '_ {
        self.parent_columns
            .iter()
            .copied()
            .zip(self.child_columns.iter().copied())
    }

    /// Structural equality: same ordered column pairs, names ignored.
    pub fn same_columns(&self, other: &ForeignKeyConstraint) -> bool {
        self.parent_columns == other.parent_columns && self.child_columns == other.child_columns
    }

    pub fn on_update(&self) -> FkAction {
        self.on_update
    }

    pub fn on_delete(&self) -> FkAction {
        self.on_delete
    }

    pub fn is_cascade_on_delete(&self) -> bool {
        self.on_delete == FkAction::Cascade
    }

    /// Parent rows cannot be deleted while children exist.
    pub fn is_restrict_delete(&self) -> bool {
        matches!(self.on_delete, FkAction::NoAction | FkAction::Restrict)
    }

    pub fn is_null_on_delete(&self) -> bool {
        self.on_delete == FkAction::SetNull
    }

    /// Short human label for the delete rule, empty when unremarkable.
    pub fn delete_rule_name(&self) -> &'static str {
        match self.on_delete {
            FkAction::Cascade => "Cascade on delete",
            FkAction::Restrict | FkAction::NoAction => "Restrict delete",
            FkAction::SetNull => "Null on delete",
            FkAction::SetDefault | FkAction::Unknown => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_ignores_names() {
        let a = ForeignKeyConstraint::new("fk_a", ColumnId(1), ColumnId(2));
        let b = ForeignKeyConstraint::inferred(ConstraintKind::Implied, "other", ColumnId(1), ColumnId(2));
        let reversed = ForeignKeyConstraint::new("fk_a", ColumnId(2), ColumnId(1));

        assert!(a.same_columns(&b));
        assert!(!a.same_columns(&reversed));
    }

    #[test]
    fn delete_rules_map_to_labels() {
        let fk = ForeignKeyConstraint::new("fk", ColumnId(0), ColumnId(1))
            .with_rules(FkAction::NoAction, FkAction::Cascade);
        assert!(fk.is_cascade_on_delete());
        assert!(!fk.is_restrict_delete());
        assert_eq!(fk.delete_rule_name(), "Cascade on delete");

        let plain = ForeignKeyConstraint::new("fk", ColumnId(0), ColumnId(1));
        assert!(plain.is_restrict_delete());
        assert!(plain.is_real());
        assert!(!plain.is_implied());
    }
}

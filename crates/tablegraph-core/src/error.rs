use thiserror::Error;

use crate::schema::ColumnId;

/// Structural errors raised while assembling a schema graph.
///
/// These point at defects in the metadata handed to the graph. Cycles are
/// never reported here.
#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot violates internal invariants (duplicates, bad shapes).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A table referenced by name does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),
    /// A column referenced by name does not exist in its table.
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    /// A column id that was never issued by this graph.
    #[error("unknown column id: {0}")]
    UnknownColumn(ColumnId),
    /// Same constraint name on the same table with different columns.
    #[error("duplicate constraint: {0}")]
    DuplicateConstraint(String),
    /// A constraint pairing a column with itself.
    #[error("column references itself: {0}")]
    SelfReferencingColumn(String),
}

/// Convenience alias for results returned by tablegraph crates.
pub type Result<T> = std::result::Result<T, Error>;

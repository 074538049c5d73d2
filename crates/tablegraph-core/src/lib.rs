//! Schema relationship graph, relationship inference and table ordering.
//!
//! This crate loads a schema snapshot into an arena-backed graph, proposes
//! foreign keys that exist only by naming convention, and orders tables so
//! referenced rows are inserted first while cycles are isolated.

pub mod analysis;
pub mod constraints;
pub mod error;
pub mod graph;
pub mod implied;
pub mod inflection;
pub mod orderer;
pub mod overrides;
pub mod rails;
pub mod report;
pub mod schema;
pub mod snapshot;
pub mod types;

pub use constraints::{ConstraintId, ConstraintKind, FkAction, ForeignKeyConstraint};
pub use error::{Error, Result};
pub use graph::{Attachment, SchemaGraph};
pub use implied::{ImpliedConstraintFinder, attach_implied, attach_inferred, find_implied};
pub use orderer::{TableOrder, TableOrderer, order_tables};
pub use overrides::{ColumnOverride, InferenceOptions, InferenceOverrides};
pub use rails::find_rails;
pub use report::{
    AnomalyReport, ColumnRef, ConstraintSummary, OrderReport, OrderSummary, build_anomaly_report,
    build_order_report,
};
pub use schema::{Column, ColumnId, Table, TableId, TableKind};
pub use snapshot::{ColumnSnapshot, ForeignKeySnapshot, SchemaSnapshot, TableSnapshot};
pub use types::ColumnType;

/// Current contract version for schema snapshots and reports.
pub const SNAPSHOT_VERSION: &str = "0.1";

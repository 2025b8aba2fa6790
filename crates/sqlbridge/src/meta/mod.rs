//! Relational metadata model.
//!
//! An in-memory, mutable description of a relation's shape and constraints:
//! [`RelationDef`] owns ordered [`ColumnDef`]s, at most one
//! [`PrimaryKeyDef`], and any number of [`UniqueKeyDef`]s and
//! [`ForeignKeyDef`]s, all scoped to one [`Location`](crate::location::Location).

mod column;
mod diff;
mod keys;
mod relation;

pub use column::ColumnDef;
pub use diff::{ColumnChange, FieldChange, RelationDiff};
pub use keys::{ForeignKeyDef, PrimaryKeyDef, UniqueKeyDef};
pub use relation::{RelationDef, RelationKind};

//! Connectivity boundary traits.
//!
//! The core never talks to a vendor driver directly; it goes through the
//! object-safe [`Driver`] / [`Connection`] / [`Cursor`] traits below. The
//! scheduling model is synchronous: every call blocks the caller, and any
//! timeout handling belongs to the trait implementation, not the core.
//!
//! Driver cursors follow the 1-based column convention of the mainstream
//! connectivity APIs; the 0-based translation happens once, in
//! [`SelectStream`](crate::stream::SelectStream), nowhere else.

mod mock;
mod value;

pub use mock::{MockConnection, MockDriver};
pub use value::SqlValue;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::location::Location;
use crate::types::TypeBuilder;

/// Static capabilities of a driver, consulted before each strategy choice
/// (batching, binding, cursor rewind, writer concurrency).
#[derive(Debug, Clone, Copy)]
pub struct DriverCapabilities {
    /// Whether statements can be executed with a batch of parameter rows.
    pub batch_execute: bool,

    /// Whether statements accept bound parameters at all.
    pub parameter_binding: bool,

    /// Whether cursors can rewind without re-executing the query.
    pub scrollable_cursors: bool,

    /// How many connections may write concurrently. Single-writer embedded
    /// engines report 1.
    pub max_writer_connections: u32,

    /// Whether locations may carry a catalog segment.
    pub supports_catalogs: bool,

    /// Whether locations may carry a schema segment.
    pub supports_schemas: bool,

    /// Whether relations can be renamed in place.
    pub supports_rename: bool,
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self {
            batch_execute: true,
            parameter_binding: true,
            scrollable_cursors: false,
            max_writer_connections: u32::MAX,
            supports_catalogs: true,
            supports_schemas: true,
            supports_rename: false,
        }
    }
}

/// Introspected shape of one column, as reported by a driver.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column name as reported.
    pub name: String,
    /// Vendor type name.
    pub type_name: String,
    /// Vendor type code.
    pub type_code: i32,
    /// Declared precision, when the type takes one.
    pub precision: Option<u32>,
    /// Declared scale, when the type takes one.
    pub scale: Option<u32>,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Whether the column auto-increments.
    pub auto_increment: bool,
    /// Whether the column is computed by the store.
    pub generated: bool,
    /// Default value expression, when present.
    pub default_value: Option<String>,
    /// Column comment, when present.
    pub comment: Option<String>,
}

/// Introspected primary key.
#[derive(Debug, Clone)]
pub struct PrimaryKeyInfo {
    /// Constraint name, when the vendor reports one.
    pub name: Option<String>,
    /// Ordered key column names.
    pub columns: Vec<String>,
}

/// Introspected foreign key.
#[derive(Debug, Clone)]
pub struct ForeignKeyInfo {
    /// Constraint name, when the vendor reports one.
    pub name: Option<String>,
    /// Ordered local (child) column names.
    pub columns: Vec<String>,
    /// Location of the referenced relation.
    pub ref_location: Location,
    /// Ordered referenced column names.
    pub ref_columns: Vec<String>,
}

/// A factory for connections to one kind of store.
pub trait Driver: Send + Sync {
    /// Vendor product name (matches the extension registry key).
    fn product_name(&self) -> &str;

    /// Static driver capabilities.
    fn capabilities(&self) -> DriverCapabilities;

    /// Open a new connection. Called lazily, under the store's
    /// serialized-creation rule.
    fn connect(&self, config: &StoreConfig) -> Result<Box<dyn Connection>>;
}

/// One live connection to a store.
///
/// A connection is owned by exactly one user at a time (the store, or a
/// dedicated stream); it is not itself thread-safe.
pub trait Connection: Send {
    /// Execute a statement without parameters; returns affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Execute a statement with one row of bound parameters.
    fn execute_bound(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Execute a statement once per parameter row, as a driver-level batch.
    fn execute_batch(&mut self, sql: &str, rows: &[Vec<SqlValue>]) -> Result<u64>;

    /// Execute a query and return its cursor.
    fn query(&mut self, sql: &str) -> Result<Box<dyn Cursor>>;

    /// Turn auto-commit on or off.
    fn set_auto_commit(&mut self, enabled: bool) -> Result<()>;

    /// Current auto-commit mode.
    fn auto_commit(&self) -> bool;

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Whether the connection has been closed (locally or by the server).
    fn is_closed(&self) -> bool;

    /// Close the connection. Idempotent.
    fn close(&mut self) -> Result<()>;

    // ===== Introspection =====

    /// Column metadata for a relation.
    fn read_columns(&mut self, location: &Location) -> Result<Vec<ColumnInfo>>;

    /// Primary key of a relation, when it has one.
    fn read_primary_key(&mut self, location: &Location) -> Result<Option<PrimaryKeyInfo>>;

    /// Foreign keys of a relation.
    fn read_foreign_keys(&mut self, location: &Location) -> Result<Vec<ForeignKeyInfo>>;

    /// Vendor-reported type declarations.
    fn declared_types(&mut self) -> Result<Vec<TypeBuilder>>;

    /// Whether an object exists at the location.
    fn object_exists(&mut self, location: &Location) -> Result<bool>;
}

/// A query result cursor. Columns are addressed 1-based, matching the
/// underlying driver convention.
pub trait Cursor {
    /// Advance to the next row; false once exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Value of the 1-based column in the current row.
    fn value(&self, column: usize) -> Result<SqlValue>;

    /// Number of columns in the result.
    fn column_count(&self) -> usize;

    /// Result column names, in projection order.
    fn column_names(&self) -> &[String];

    /// Whether the cursor can only move forward.
    fn is_forward_only(&self) -> bool;

    /// Reposition before the first row. `Unsupported` on forward-only
    /// cursors; the select stream re-executes the query instead.
    fn rewind(&mut self) -> Result<()>;
}

//! # sqlbridge
//!
//! Dialect-agnostic relational metadata and type unification for moving
//! schemas and rows between SQL-capable stores.
//!
//! The crate describes data elements through [`Location`]s, models their
//! shape as [`RelationDef`]s, unifies vendor type systems in a per-store
//! [`TypeCatalog`], generates statement text from the metadata, and streams
//! rows between stores with batched inserts and cursor-based selects.
//! Vendor quirks are patched through injected
//! [`ExtensionProvider`](store::ExtensionProvider)s; connectivity stays
//! behind the synchronous [`driver`] boundary traits.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sqlbridge::{
//!     AnsiType, ExtensionRegistry, HostType, InsertStream, Location, MockDriver,
//!     RelationDef, SqlValue, Store, StoreConfig, TypeBuilder,
//! };
//!
//! fn main() -> sqlbridge::Result<()> {
//!     let driver = Arc::new(MockDriver::new());
//!     driver.declare_type(
//!         TypeBuilder::new("bigint", -5).host(HostType::I64).ansi(AnsiType::BigInt),
//!     );
//!     let store = Store::new(StoreConfig::new("main"), driver, &ExtensionRegistry::new());
//!
//!     let mut rel = RelationDef::table(Location::parse("dbo.events@main")?);
//!     rel.get_or_create_column("id", store.type_by_name("bigint")?)?;
//!     store.create_relation(&rel)?;
//!
//!     let mut stream = InsertStream::open(&store, &rel)?;
//!     stream.insert(vec![SqlValue::I64(1)])?;
//!     let report = stream.close()?;
//!     assert_eq!(report.rows_committed, 1);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod location;
pub mod meta;
pub mod sql;
pub mod store;
pub mod stream;
pub mod types;

// Re-exports for convenient access
pub use config::StoreConfig;
pub use driver::{
    ColumnInfo, Connection, Cursor, Driver, DriverCapabilities, ForeignKeyInfo, MockDriver,
    PrimaryKeyInfo, SqlValue,
};
pub use error::{BridgeError, Result};
pub use location::Location;
pub use meta::{
    ColumnDef, ForeignKeyDef, PrimaryKeyDef, RelationDef, RelationDiff, RelationKind,
    UniqueKeyDef,
};
pub use sql::{ParamStyle, QuoteStyle, StatementGenerator};
pub use store::{ExtensionProvider, ExtensionRegistry, Store};
pub use stream::{copy_rows, InsertStream, SelectStream, TransferListener, TransferReport};
pub use types::{AnsiType, HostType, KeyPolicy, SqlType, TypeBuilder, TypeCatalog, TypeKey};

//! Statement generation.
//!
//! Pure functions over the metadata model and type catalog producing
//! CREATE/ALTER/INSERT/SELECT/DROP/TRUNCATE text, with store-configurable
//! quoting, placeholders, and strict/lenient precision policy.

mod ddl;
mod dml;
mod quote;

pub use ddl::StatementGenerator;
pub use quote::{validate_identifier, ParamStyle, QuoteStyle};

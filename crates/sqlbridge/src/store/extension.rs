//! Vendor extension providers.
//!
//! An [`ExtensionProvider`] patches driver deficiencies for one vendor
//! product: buggy introspection, unstable type codes, nonstandard truncate
//! syntax, or values that need coercion before binding. Every hook has a
//! generic fallback, so the absence of an extension is normal.
//!
//! Providers live in an [`ExtensionRegistry`] keyed by product name and
//! injected into the store at construction. No global state, no discovery
//! magic: registration is explicit and deterministic, and tests can build
//! registries with mock providers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::{Connection, SqlValue};
use crate::error::Result;
use crate::location::Location;
use crate::meta::RelationDef;
use crate::types::{SqlType, TypeCatalog};

/// Per-vendor overrides for store behavior.
///
/// The `try_` hooks return whether they handled the case, so the generic
/// driver-metadata fallback runs otherwise.
pub trait ExtensionProvider: Send + Sync {
    /// Vendor product name this provider applies to (registry key).
    fn product_name(&self) -> &str;

    /// Register or patch type builders before the generic catalog build.
    fn declare_types(&self, _catalog: &mut TypeCatalog) -> Result<()> {
        Ok(())
    }

    /// Name of the type to use for a vendor code the driver misreports.
    fn type_for_code(&self, _code: i32) -> Option<String> {
        None
    }

    /// Build the relation's columns, when the driver's column introspection
    /// is unusable. Returns whether the case was handled.
    fn try_build_columns(
        &self,
        _conn: &mut dyn Connection,
        _catalog: &TypeCatalog,
        _relation: &mut RelationDef,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Build the relation's primary key. Returns whether the case was
    /// handled.
    fn try_build_primary_key(
        &self,
        _conn: &mut dyn Connection,
        _relation: &mut RelationDef,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Build the relation's foreign keys. Returns whether the case was
    /// handled.
    fn try_build_foreign_keys(
        &self,
        _conn: &mut dyn Connection,
        _relation: &mut RelationDef,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Normalize an object name to the store's canonical form (e.g. an
    /// engine that uppercases every identifier).
    fn normative_object_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Override the driver-reported writer-concurrency limit.
    fn max_writer_connections(&self) -> Option<u32> {
        None
    }

    /// Override the TRUNCATE statement text for a location.
    fn truncate_statement(&self, _location: &Location) -> Option<String> {
        None
    }

    /// Coerce a value before it is bound for load into a column of the
    /// given type (e.g. a string that must become a numeric wrapper).
    fn coerce_for_load(&self, _target: &SqlType, value: SqlValue) -> Result<SqlValue> {
        Ok(value)
    }
}

/// Explicit, injected registry of extension providers keyed by vendor
/// product name (matched case-insensitively).
#[derive(Default)]
pub struct ExtensionRegistry {
    providers: HashMap<String, Arc<dyn ExtensionProvider>>,
}

impl ExtensionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its product name. A later registration for
    /// the same product replaces the earlier one.
    pub fn register(&mut self, provider: Arc<dyn ExtensionProvider>) {
        self.providers
            .insert(provider.product_name().to_lowercase(), provider);
    }

    /// Look up the provider for a product name.
    pub fn lookup(&self, product: &str) -> Option<Arc<dyn ExtensionProvider>> {
        self.providers.get(&product.to_lowercase()).cloned()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

//! Store and connectivity management.
//!
//! A [`Store`] owns the lifecycle of one store's connection (lazy creation,
//! transparent reconnection, serialized handshakes), its per-connection
//! [`TypeCatalog`], and the store-level operations: exists, row count,
//! create, drop, truncate, rename, and relation introspection. Vendor
//! behavior overrides come from an injected [`ExtensionRegistry`].

mod extension;

pub use extension::{ExtensionProvider, ExtensionRegistry};

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::driver::{Connection, Driver, SqlValue};
use crate::error::{BridgeError, Result};
use crate::location::Location;
use crate::meta::{PrimaryKeyDef, RelationDef};
use crate::sql::StatementGenerator;
use crate::types::{AnsiType, HostType, SqlType, TypeBuilder, TypeCatalog};

/// One configured store and its live connection state.
pub struct Store {
    config: StoreConfig,
    driver: Arc<dyn Driver>,
    extension: Option<Arc<dyn ExtensionProvider>>,
    conn: Mutex<Option<Box<dyn Connection>>>,
    catalog: Mutex<TypeCatalog>,
}

impl Store {
    /// Create a store over a driver, resolving the extension provider for
    /// the configured product (or the driver's product) from the registry.
    pub fn new(
        config: StoreConfig,
        driver: Arc<dyn Driver>,
        extensions: &ExtensionRegistry,
    ) -> Self {
        let product = config
            .product
            .clone()
            .unwrap_or_else(|| driver.product_name().to_string());
        let extension = extensions.lookup(&product);
        if extension.is_some() {
            debug!("store {} uses the {product} extension provider", config.name);
        }
        let catalog = TypeCatalog::from_config(&config);
        Self {
            config,
            driver,
            extension,
            conn: Mutex::new(None),
            catalog: Mutex::new(catalog),
        }
    }

    /// Store name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The extension provider in effect, if any.
    pub(crate) fn extension(&self) -> Option<&Arc<dyn ExtensionProvider>> {
        self.extension.as_ref()
    }

    /// The driver's static capabilities.
    pub(crate) fn capabilities(&self) -> crate::driver::DriverCapabilities {
        self.driver.capabilities()
    }

    /// Whether a live connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.lock_conn()
            .as_ref()
            .map(|c| !c.is_closed())
            .unwrap_or(false)
    }

    /// How many connections may write concurrently: the extension override
    /// when present, the driver capability otherwise.
    pub fn writer_limit(&self) -> u32 {
        self.extension
            .as_ref()
            .and_then(|e| e.max_writer_connections())
            .unwrap_or_else(|| self.driver.capabilities().max_writer_connections)
    }

    /// Close the store's connection. Streams holding dedicated connections
    /// are unaffected.
    pub fn close(&self) -> Result<()> {
        if let Some(mut conn) = self.lock_conn().take() {
            conn.close()?;
            info!("store {} closed", self.name());
        }
        Ok(())
    }

    fn lock_conn(&self) -> MutexGuard<'_, Option<Box<dyn Connection>>> {
        self.conn.lock().expect("store connection lock poisoned")
    }

    fn lock_catalog(&self) -> MutexGuard<'_, TypeCatalog> {
        self.catalog.lock().expect("store catalog lock poisoned")
    }

    /// Run a closure against the store's shared connection, opening or
    /// transparently reopening it first. The connection mutex serializes
    /// creation, so concurrent first access cannot race two handshakes.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut dyn Connection) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.lock_conn();
        let reopen = matches!(guard.as_ref(), Some(c) if c.is_closed());
        if reopen {
            warn!(
                "connection to store {} was closed, reopening",
                self.name()
            );
            *guard = None;
        }
        if guard.is_none() {
            debug!("opening connection to store {}", self.name());
            *guard = Some(self.driver.connect(&self.config)?);
        }
        f(guard.as_deref_mut().expect("connection just ensured"))
    }

    /// Open a connection dedicated to one stream. Creation is serialized
    /// with the shared connection's.
    pub(crate) fn open_dedicated_connection(&self) -> Result<Box<dyn Connection>> {
        let _guard = self.lock_conn();
        debug!("opening dedicated connection to store {}", self.name());
        self.driver.connect(&self.config)
    }

    // ===== Type catalog =====

    /// Build the type catalog if it is not built yet. Runs the driver's type
    /// declarations through the extension's declaration hook, then the
    /// generic build. Lazy: called on first type query, because connection
    /// credentials and per-store defaults are not available earlier.
    pub fn ensure_types(&self) -> Result<()> {
        if self.lock_catalog().is_built() {
            return Ok(());
        }
        let builders = self.with_connection(|c| c.declared_types())?;
        let mut catalog = self.lock_catalog();
        if catalog.is_built() {
            return Ok(());
        }
        for builder in builders {
            catalog.note_vendor_type(builder.name.clone());
            catalog.declare(builder)?;
        }
        let ext = self.extension.clone();
        catalog.build_with(move |cat| match &ext {
            Some(e) => e.declare_types(cat),
            None => Ok(()),
        })
    }

    /// Declare a type builder before the catalog is built.
    pub fn declare_type(&self, builder: TypeBuilder) -> Result<()> {
        self.lock_catalog().declare(builder)
    }

    /// Register a host-type override before the catalog is built.
    pub fn override_host_type(&self, host: HostType, type_name: &str) -> Result<()> {
        self.lock_catalog().override_host(host, type_name)
    }

    /// Look up a type by name (builds the catalog on first use).
    pub fn type_by_name(&self, name: &str) -> Result<Arc<SqlType>> {
        self.ensure_types()?;
        self.lock_catalog().type_by_name(name)
    }

    /// Look up the mapped type for a host value type.
    pub fn type_for_host(&self, host: HostType) -> Result<Arc<SqlType>> {
        self.ensure_types()?;
        self.lock_catalog().type_for_host(host)
    }

    /// Look up the representative type for an ANSI classification.
    pub fn type_for_ansi(&self, ansi: AnsiType) -> Result<Arc<SqlType>> {
        self.ensure_types()?;
        self.lock_catalog().type_for_ansi(ansi)
    }

    /// Look up a type by vendor code, consulting the extension first.
    pub fn type_for_code(&self, code: i32) -> Result<Arc<SqlType>> {
        self.ensure_types()?;
        if let Some(name) = self.extension.as_ref().and_then(|e| e.type_for_code(code)) {
            return self.lock_catalog().type_by_name(&name);
        }
        self.lock_catalog().type_for_code(code)
    }

    // ===== Store-level operations =====

    /// Whether an object exists at the location.
    pub fn exists(&self, location: &Location) -> Result<bool> {
        self.with_connection(|conn| conn.object_exists(location))
    }

    /// Number of rows at the location.
    pub fn row_count(&self, location: &Location) -> Result<i64> {
        let sql = StatementGenerator::new(&self.config).row_count(location)?;
        self.with_connection(|conn| {
            let mut cursor = conn
                .query(&sql)
                .map_err(|e| wrap_driver(e, &sql, location))?;
            if !cursor.advance()? {
                return Err(BridgeError::driver("count query returned no rows")
                    .with_sql(&sql)
                    .with_location(location));
            }
            match cursor.value(1)?.cast_to(HostType::I64)? {
                SqlValue::I64(count) => Ok(count),
                other => Err(BridgeError::driver(format!(
                    "count query returned a non-numeric value: {other:?}"
                ))
                .with_sql(&sql)
                .with_location(location)),
            }
        })
    }

    /// Create the relation: CREATE TABLE, then one ALTER TABLE per primary
    /// key, unique key and foreign key, so constraint creation can be
    /// retried independently.
    pub fn create_relation(&self, relation: &RelationDef) -> Result<()> {
        self.ensure_types()?;
        let statements = {
            let catalog = self.lock_catalog();
            let generator = StatementGenerator::with_catalog(&self.config, &catalog);
            let mut statements = vec![generator.create_table(relation)?];
            if let Some(pk) = generator.add_primary_key(relation)? {
                statements.push(pk);
            }
            statements.extend(generator.add_unique_keys(relation)?);
            statements.extend(generator.add_foreign_keys(relation)?);
            statements
        };
        self.with_connection(|conn| {
            for sql in &statements {
                conn.execute(sql)
                    .map_err(|e| wrap_driver(e, sql, &relation.location))?;
            }
            Ok(())
        })?;
        info!(
            "created {} ({} columns, {} statements)",
            relation.full_name(),
            relation.column_count(),
            statements.len()
        );
        Ok(())
    }

    /// Drop the relation at the location.
    pub fn drop_relation(&self, location: &Location) -> Result<()> {
        let sql = StatementGenerator::new(&self.config).drop_table(location)?;
        self.with_connection(|conn| {
            conn.execute(&sql)
                .map_err(|e| wrap_driver(e, &sql, location))?;
            Ok(())
        })
    }

    /// Empty the relation at the location, honoring the extension's
    /// truncate-statement override.
    pub fn truncate(&self, location: &Location) -> Result<()> {
        let sql = match self
            .extension
            .as_ref()
            .and_then(|e| e.truncate_statement(location))
        {
            Some(text) => text,
            None => StatementGenerator::new(&self.config).truncate(location)?,
        };
        self.with_connection(|conn| {
            conn.execute(&sql)
                .map_err(|e| wrap_driver(e, &sql, location))?;
            Ok(())
        })
    }

    /// Rename the relation in place, when the driver supports it.
    pub fn rename_relation(&self, location: &Location, new_name: &str) -> Result<Location> {
        if !self.driver.capabilities().supports_rename {
            return Err(BridgeError::Unsupported(format!(
                "store {} does not support rename",
                self.name()
            )));
        }
        let sql = StatementGenerator::new(&self.config).rename(location, new_name)?;
        self.with_connection(|conn| {
            conn.execute(&sql)
                .map_err(|e| wrap_driver(e, &sql, location))?;
            Ok(())
        })?;
        location.sibling(new_name)
    }

    /// Introspect the relation at the location.
    ///
    /// Extension try-hooks run first for columns, primary key and foreign
    /// keys; the generic driver-metadata path handles whatever they decline.
    pub fn read_relation(&self, location: &Location) -> Result<RelationDef> {
        self.ensure_types()?;
        let location = match (&self.extension, location.name()) {
            (Some(ext), Some(name)) => location.with_name(&ext.normative_object_name(name))?,
            _ => location.clone(),
        };
        let ext = self.extension.clone();
        self.with_connection(|conn| {
            let catalog = self.lock_catalog();
            let mut relation = RelationDef::table(location.clone());

            let handled = match &ext {
                Some(e) => e.try_build_columns(conn, &catalog, &mut relation)?,
                None => false,
            };
            if !handled {
                let infos = conn.read_columns(&location)?;
                if infos.is_empty() {
                    return Err(BridgeError::not_found(
                        "relation",
                        location.to_string(),
                    ));
                }
                for info in infos {
                    let sql_type = match catalog.type_by_name(&info.type_name) {
                        Ok(t) => t,
                        Err(BridgeError::NotFound { .. }) => {
                            match ext.as_ref().and_then(|e| e.type_for_code(info.type_code)) {
                                Some(name) => catalog.type_by_name(&name)?,
                                None => catalog.type_for_code(info.type_code)?,
                            }
                        }
                        Err(e) => return Err(e),
                    };
                    let col = relation.create_column(&info.name, sql_type);
                    col.nullable = info.nullable;
                    col.precision = info.precision;
                    col.scale = info.scale;
                    col.auto_increment = col.auto_increment || info.auto_increment;
                    col.generated = info.generated;
                    col.default_value = info.default_value;
                    col.comment = info.comment;
                }
            }

            let handled = match &ext {
                Some(e) => e.try_build_primary_key(conn, &mut relation)?,
                None => false,
            };
            if !handled {
                if let Some(pk) = conn.read_primary_key(&location)? {
                    relation.set_primary_key_named(pk.name, &pk.columns)?;
                }
            }

            let handled = match &ext {
                Some(e) => e.try_build_foreign_keys(conn, &mut relation)?,
                None => false,
            };
            if !handled {
                for fk in conn.read_foreign_keys(&location)? {
                    let references = PrimaryKeyDef {
                        name: None,
                        relation: fk.ref_location,
                        columns: fk.ref_columns,
                    };
                    match fk.name {
                        Some(name) => {
                            relation.add_foreign_key(name, references, &fk.columns)?;
                        }
                        None => {
                            relation.foreign_key_of(references, &fk.columns)?;
                        }
                    }
                }
            }

            Ok(relation)
        })
    }
}

/// Attach statement and location context to a driver error.
pub(crate) fn wrap_driver(error: BridgeError, sql: &str, location: &Location) -> BridgeError {
    match error {
        e @ BridgeError::Driver { .. } => e.with_sql(sql).with_location(location),
        other => other,
    }
}

//! DDL text generation over the metadata model and type catalog.

use tracing::warn;

use crate::config::StoreConfig;
use crate::error::{BridgeError, Result};
use crate::location::Location;
use crate::meta::{ColumnDef, RelationDef};
use crate::types::{SqlType, TypeCatalog};

/// Generates statement text for one store.
///
/// Pure over its inputs: the store config supplies quoting, placeholder and
/// strictness policy; the optional type catalog re-unifies column types into
/// the target store's own type names (needed when the relation's shape was
/// copied from a store with a different type system).
pub struct StatementGenerator<'a> {
    pub(crate) config: &'a StoreConfig,
    pub(crate) catalog: Option<&'a TypeCatalog>,
}

impl<'a> StatementGenerator<'a> {
    /// A generator rendering types exactly as the metadata declares them.
    pub fn new(config: &'a StoreConfig) -> Self {
        Self {
            config,
            catalog: None,
        }
    }

    /// A generator resolving every column type through the given catalog.
    pub fn with_catalog(config: &'a StoreConfig, catalog: &'a TypeCatalog) -> Self {
        Self {
            config,
            catalog: Some(catalog),
        }
    }

    /// The fully-qualified, vendor-quoted name of a location, applying the
    /// store's default schema to bare single-segment locations.
    pub fn qualified_name(&self, location: &Location) -> Result<String> {
        if location.is_query() || location.is_root() {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot render a qualified name for {location}"
            )));
        }
        let quote = self.config.quote_style;
        let mut parts: Vec<String> = Vec::with_capacity(3);
        if location.depth() == 1 {
            if let Some(schema) = &self.config.default_schema {
                parts.push(quote.quote(schema)?);
            }
        }
        for segment in location.segments() {
            parts.push(quote.quote(segment)?);
        }
        Ok(parts.join("."))
    }

    /// The quoted, comma-separated column list of a relation.
    pub fn column_list(&self, relation: &RelationDef) -> Result<String> {
        let quote = self.config.quote_style;
        let parts: Result<Vec<String>> = relation
            .columns()
            .iter()
            .map(|c| quote.quote(&c.name))
            .collect();
        Ok(parts?.join(", "))
    }

    /// CREATE TABLE with inline precision/scale and NOT NULL clauses.
    ///
    /// NOT NULL is suppressed for read-only stores, whose DDL is only ever
    /// used as documentation of shape.
    pub fn create_table(&self, relation: &RelationDef) -> Result<String> {
        let quote = self.config.quote_style;
        let mut defs: Vec<String> = Vec::with_capacity(relation.column_count());
        for col in relation.columns() {
            let mut def = format!("{} {}", quote.quote(&col.name)?, self.render_type(col)?);
            if let Some(default) = &col.default_value {
                def.push_str(&format!(" DEFAULT {default}"));
            }
            if !col.nullable && !self.config.read_only {
                def.push_str(" NOT NULL");
            }
            defs.push(def);
        }
        Ok(format!(
            "CREATE TABLE {} ({})",
            self.qualified_name(&relation.location)?,
            defs.join(", ")
        ))
    }

    /// ALTER TABLE statement adding the primary key, when one is defined.
    ///
    /// Kept separate from CREATE TABLE so constraint creation can be retried
    /// independently of table creation.
    pub fn add_primary_key(&self, relation: &RelationDef) -> Result<Option<String>> {
        let quote = self.config.quote_style;
        let Some(pk) = relation.primary_key() else {
            return Ok(None);
        };
        let constraint = match &pk.name {
            Some(name) => name.clone(),
            None => format!("{}_pk", relation.location.name().unwrap_or("relation")),
        };
        let cols: Result<Vec<String>> = pk.columns.iter().map(|c| quote.quote(c)).collect();
        Ok(Some(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.qualified_name(&relation.location)?,
            quote.quote(&constraint)?,
            cols?.join(", ")
        )))
    }

    /// One ALTER TABLE statement per foreign key.
    pub fn add_foreign_keys(&self, relation: &RelationDef) -> Result<Vec<String>> {
        let quote = self.config.quote_style;
        let table = self.qualified_name(&relation.location)?;
        let mut statements = Vec::with_capacity(relation.foreign_keys().len());
        for fk in relation.foreign_keys() {
            let local: Result<Vec<String>> = fk.columns.iter().map(|c| quote.quote(c)).collect();
            let referenced: Result<Vec<String>> = fk
                .references
                .columns
                .iter()
                .map(|c| quote.quote(c))
                .collect();
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                table,
                quote.quote(&fk.name)?,
                local?.join(", "),
                self.qualified_name(&fk.references.relation)?,
                referenced?.join(", ")
            ));
        }
        Ok(statements)
    }

    /// One ALTER TABLE statement per unique key.
    pub fn add_unique_keys(&self, relation: &RelationDef) -> Result<Vec<String>> {
        let quote = self.config.quote_style;
        let table = self.qualified_name(&relation.location)?;
        let mut statements = Vec::with_capacity(relation.unique_keys().len());
        for (i, uk) in relation.unique_keys().iter().enumerate() {
            let constraint = match &uk.name {
                Some(name) => name.clone(),
                None => format!(
                    "{}_uq{}",
                    relation.location.name().unwrap_or("relation"),
                    i + 1
                ),
            };
            let cols: Result<Vec<String>> = uk.columns.iter().map(|c| quote.quote(c)).collect();
            statements.push(format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                table,
                quote.quote(&constraint)?,
                cols?.join(", ")
            ));
        }
        Ok(statements)
    }

    /// DROP TABLE statement.
    pub fn drop_table(&self, location: &Location) -> Result<String> {
        Ok(format!("DROP TABLE {}", self.qualified_name(location)?))
    }

    /// Generic TRUNCATE statement. Vendor extensions may override the text
    /// at the store level.
    pub fn truncate(&self, location: &Location) -> Result<String> {
        Ok(format!("TRUNCATE TABLE {}", self.qualified_name(location)?))
    }

    /// ALTER TABLE ... RENAME TO statement.
    pub fn rename(&self, location: &Location, new_name: &str) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME TO {}",
            self.qualified_name(location)?,
            self.config.quote_style.quote(new_name)?
        ))
    }

    /// Render a column's type, resolving it through the catalog when one is
    /// attached and applying the precision policy.
    pub(crate) fn render_type(&self, col: &ColumnDef) -> Result<String> {
        let resolved: std::sync::Arc<SqlType>;
        let sql_type: &SqlType = match self.catalog {
            Some(catalog) => {
                resolved = self.resolve_type(catalog, &col.sql_type)?;
                &resolved
            }
            None => &col.sql_type,
        };

        let mut text = sql_type.name.clone();
        if sql_type.takes_precision() {
            if let Some(precision) = col.precision {
                let precision = self.checked_precision(col, sql_type, precision)?;
                if sql_type.takes_scale() {
                    let max_scale = sql_type.max_scale.unwrap_or(u32::MAX);
                    let scale = col.scale.unwrap_or(0).min(max_scale);
                    text.push_str(&format!("({precision},{scale})"));
                } else {
                    text.push_str(&format!("({precision})"));
                }
            }
        }
        Ok(text)
    }

    /// Re-unify a foreign type into this store's catalog: exact key first,
    /// then the ANSI classification, then the name.
    fn resolve_type(
        &self,
        catalog: &TypeCatalog,
        sql_type: &std::sync::Arc<SqlType>,
    ) -> Result<std::sync::Arc<SqlType>> {
        if let Ok(found) = catalog.type_for_key(&sql_type.key) {
            return Ok(found);
        }
        if let Some(ansi) = sql_type.ansi {
            if let Ok(found) = catalog.type_for_ansi(ansi) {
                return Ok(found);
            }
        }
        catalog.type_by_name(&sql_type.name)
    }

    fn checked_precision(
        &self,
        col: &ColumnDef,
        sql_type: &SqlType,
        precision: u32,
    ) -> Result<u32> {
        let max = sql_type.max_precision.unwrap_or(u32::MAX);
        if precision > max {
            if self.config.strict {
                return Err(BridgeError::InvalidArgument(format!(
                    "precision {precision} of column {} exceeds the maximum {max} of type {}",
                    col.name, sql_type.name
                )));
            }
            warn!(
                "clamping precision {} of column {} to the maximum {} of type {}",
                precision, col.name, max, sql_type.name
            );
            return Ok(max);
        }
        Ok(precision.max(sql_type.min_precision.unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::QuoteStyle;
    use crate::types::{AnsiType, HostType, KeyPolicy, TypeBuilder};

    fn catalog() -> TypeCatalog {
        let mut cat = TypeCatalog::new(KeyPolicy::NameOnly, false, false);
        cat.declare(
            TypeBuilder::new("bigint", -5)
                .host(HostType::I64)
                .ansi(AnsiType::BigInt),
        )
        .unwrap();
        cat.declare(
            TypeBuilder::new("varchar", 12)
                .host(HostType::Text)
                .ansi(AnsiType::Varchar)
                .precision(1, 8000),
        )
        .unwrap();
        cat.declare(
            TypeBuilder::new("decimal", 3)
                .host(HostType::Decimal)
                .ansi(AnsiType::Decimal)
                .precision(1, 38)
                .max_scale(38),
        )
        .unwrap();
        cat.build().unwrap();
        cat
    }

    fn relation(cat: &TypeCatalog) -> RelationDef {
        let mut rel = RelationDef::table(Location::object("main", &["dbo", "users"]).unwrap());
        let id = rel.create_column("id", cat.type_by_name("bigint").unwrap());
        id.auto_increment = true;
        id.nullable = false;
        let name = rel.create_column("name", cat.type_by_name("varchar").unwrap());
        name.precision = Some(50);
        name.nullable = false;
        rel.set_primary_key(&["id"]).unwrap();
        rel
    }

    #[test]
    fn test_qualified_name() {
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::new(&config);
        let loc = Location::object("main", &["dbo", "users"]).unwrap();
        assert_eq!(generator.qualified_name(&loc).unwrap(), "\"dbo\".\"users\"");

        assert!(generator.qualified_name(&Location::root("main")).is_err());
        assert!(generator
            .qualified_name(&Location::query("main", "select 1"))
            .is_err());
    }

    #[test]
    fn test_default_schema_applies_to_bare_names() {
        let mut config = StoreConfig::new("main");
        config.default_schema = Some("public".to_string());
        let generator = StatementGenerator::new(&config);
        let loc = Location::object("main", &["users"]).unwrap();
        assert_eq!(
            generator.qualified_name(&loc).unwrap(),
            "\"public\".\"users\""
        );
    }

    #[test]
    fn test_create_table_text() {
        let cat = catalog();
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::with_catalog(&config, &cat);
        let sql = generator.create_table(&relation(&cat)).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE \"dbo\".\"users\" (\"id\" bigint NOT NULL, \"name\" varchar(50) NOT NULL)"
        );
    }

    #[test]
    fn test_read_only_store_suppresses_not_null() {
        let cat = catalog();
        let mut config = StoreConfig::new("main");
        config.read_only = true;
        let generator = StatementGenerator::with_catalog(&config, &cat);
        let sql = generator.create_table(&relation(&cat)).unwrap();
        assert!(!sql.contains("NOT NULL"));
    }

    #[test]
    fn test_bracket_quoting() {
        let cat = catalog();
        let mut config = StoreConfig::new("main");
        config.quote_style = QuoteStyle::Bracket;
        let generator = StatementGenerator::with_catalog(&config, &cat);
        let sql = generator.create_table(&relation(&cat)).unwrap();
        assert!(sql.starts_with("CREATE TABLE [dbo].[users]"));
    }

    #[test]
    fn test_constraint_statements_are_separate() {
        let cat = catalog();
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::with_catalog(&config, &cat);
        let mut rel = relation(&cat);
        rel.add_unique_key(None, &["name"]).unwrap();

        let pk = generator.add_primary_key(&rel).unwrap().unwrap();
        assert_eq!(
            pk,
            "ALTER TABLE \"dbo\".\"users\" ADD CONSTRAINT \"users_pk\" PRIMARY KEY (\"id\")"
        );

        let uks = generator.add_unique_keys(&rel).unwrap();
        assert_eq!(uks.len(), 1);
        assert!(uks[0].contains("ADD CONSTRAINT \"users_uq1\" UNIQUE (\"name\")"));
    }

    #[test]
    fn test_foreign_key_statement() {
        let cat = catalog();
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::with_catalog(&config, &cat);

        let users = relation(&cat);
        let mut orders =
            RelationDef::table(Location::object("main", &["dbo", "orders"]).unwrap());
        orders
            .get_or_create_column("user_id", cat.type_by_name("bigint").unwrap())
            .unwrap();
        orders
            .foreign_key_of(users.primary_key().unwrap().clone(), &["user_id"])
            .unwrap();

        let fks = generator.add_foreign_keys(&orders).unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(
            fks[0],
            "ALTER TABLE \"dbo\".\"orders\" ADD CONSTRAINT \"orders_fk1\" FOREIGN KEY (\"user_id\") \
             REFERENCES \"dbo\".\"users\" (\"id\")"
        );
    }

    #[test]
    fn test_precision_overflow_strict_vs_lenient() {
        let cat = catalog();
        let mut rel = RelationDef::table(Location::object("main", &["dbo", "t"]).unwrap());
        let col = rel.create_column("v", cat.type_by_name("varchar").unwrap());
        col.precision = Some(90_000);

        let mut config = StoreConfig::new("main");
        config.strict = true;
        let strict = StatementGenerator::with_catalog(&config, &cat);
        assert!(matches!(
            strict.create_table(&rel).unwrap_err(),
            BridgeError::InvalidArgument(_)
        ));

        let lenient_config = StoreConfig::new("main");
        let lenient = StatementGenerator::with_catalog(&lenient_config, &cat);
        let sql = lenient.create_table(&rel).unwrap();
        assert!(sql.contains("varchar(8000)"));
    }

    #[test]
    fn test_decimal_renders_precision_and_scale() {
        let cat = catalog();
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::with_catalog(&config, &cat);
        let mut rel = RelationDef::table(Location::object("main", &["dbo", "t"]).unwrap());
        let col = rel.create_column("amount", cat.type_by_name("decimal").unwrap());
        col.precision = Some(19);
        col.scale = Some(4);
        let sql = generator.create_table(&rel).unwrap();
        assert!(sql.contains("\"amount\" decimal(19,4)"));
    }

    #[test]
    fn test_foreign_metadata_resolves_through_ansi() {
        // A relation whose columns were introspected on another store, with
        // type names this catalog has never heard of.
        let mut foreign = TypeCatalog::new(KeyPolicy::NameOnly, false, false);
        foreign
            .declare(
                TypeBuilder::new("int8", 20)
                    .host(HostType::I64)
                    .ansi(AnsiType::BigInt),
            )
            .unwrap();
        foreign.build().unwrap();

        let mut rel = RelationDef::table(Location::object("main", &["dbo", "t"]).unwrap());
        rel.get_or_create_column("id", foreign.type_by_name("int8").unwrap())
            .unwrap();

        let cat = catalog();
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::with_catalog(&config, &cat);
        let sql = generator.create_table(&rel).unwrap();
        assert!(sql.contains("\"id\" bigint"));
    }

    #[test]
    fn test_drop_truncate_rename() {
        let config = StoreConfig::new("main");
        let generator = StatementGenerator::new(&config);
        let loc = Location::object("main", &["dbo", "users"]).unwrap();
        assert_eq!(
            generator.drop_table(&loc).unwrap(),
            "DROP TABLE \"dbo\".\"users\""
        );
        assert_eq!(
            generator.truncate(&loc).unwrap(),
            "TRUNCATE TABLE \"dbo\".\"users\""
        );
        assert_eq!(
            generator.rename(&loc, "users_old").unwrap(),
            "ALTER TABLE \"dbo\".\"users\" RENAME TO \"users_old\""
        );
    }
}

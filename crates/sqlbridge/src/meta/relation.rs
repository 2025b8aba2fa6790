//! Relation metadata: ordered columns plus key constraints, scoped to one
//! location.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::location::Location;
use crate::types::SqlType;

use super::{ColumnDef, ForeignKeyDef, PrimaryKeyDef, UniqueKeyDef};

/// What kind of element a relation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Table,
    View,
    Query,
}

/// The column and constraint shape of a table, view or query.
///
/// Columns are ordered by their 1-based position, which stays dense
/// (`1..=N`) through every operation. Column lookups match names
/// case-insensitively and misses surface as the domain "no such column"
/// error rather than a generic fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    /// Where this relation lives.
    pub location: Location,

    /// Table, view or query.
    pub kind: RelationKind,

    columns: Vec<ColumnDef>,
    primary_key: Option<PrimaryKeyDef>,
    unique_keys: Vec<UniqueKeyDef>,
    foreign_keys: Vec<ForeignKeyDef>,

    /// Free-form comment.
    pub comment: Option<String>,
}

impl RelationDef {
    /// An empty relation of the given kind.
    pub fn new(location: Location, kind: RelationKind) -> Self {
        Self {
            location,
            kind,
            columns: Vec::new(),
            primary_key: None,
            unique_keys: Vec::new(),
            foreign_keys: Vec::new(),
            comment: None,
        }
    }

    /// An empty table relation.
    pub fn table(location: Location) -> Self {
        Self::new(location, RelationKind::Table)
    }

    /// An empty view relation.
    pub fn view(location: Location) -> Self {
        Self::new(location, RelationKind::View)
    }

    /// A relation describing the projection of a query location.
    pub fn query(location: Location) -> Self {
        Self::new(location, RelationKind::Query)
    }

    /// The location text of this relation.
    pub fn full_name(&self) -> String {
        self.location.to_string()
    }

    // ===== Columns =====

    /// Columns in position order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.matches_name(name))
            .ok_or_else(|| BridgeError::not_found_at("column", name, self.full_name()))
    }

    /// Look up a column by name for mutation.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut ColumnDef> {
        let full_name = self.full_name();
        self.columns
            .iter_mut()
            .find(|c| c.matches_name(name))
            .ok_or_else(|| BridgeError::not_found_at("column", name, full_name))
    }

    /// Look up a column by 1-based position.
    pub fn column_at(&self, position: u32) -> Result<&ColumnDef> {
        if position == 0 || position as usize > self.columns.len() {
            return Err(BridgeError::not_found_at(
                "column",
                format!("position {position}"),
                self.full_name(),
            ));
        }
        Ok(&self.columns[position as usize - 1])
    }

    /// Whether a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.matches_name(name))
    }

    /// Get the existing column when name and type match, or create one at
    /// the next free position. Requesting an existing name with a different
    /// type is an error: a column's type never changes silently.
    pub fn get_or_create_column(
        &mut self,
        name: &str,
        sql_type: Arc<SqlType>,
    ) -> Result<&ColumnDef> {
        if let Some(idx) = self.columns.iter().position(|c| c.matches_name(name)) {
            let existing = &self.columns[idx];
            if existing.sql_type.key != sql_type.key {
                return Err(BridgeError::InvalidArgument(format!(
                    "column {} of {} is already defined as {}, cannot redefine as {}",
                    existing.name,
                    self.full_name(),
                    existing.sql_type,
                    sql_type
                )));
            }
            return Ok(&self.columns[idx]);
        }
        let position = self.columns.len() as u32 + 1;
        self.columns.push(ColumnDef::new(name, position, sql_type));
        Ok(self.columns.last().expect("column just pushed"))
    }

    /// Create a fresh column object. A prior column with the same normalized
    /// name is replaced in place, keeping its position; this is how metadata
    /// gets rebuilt after introspection without shuffling column order.
    pub fn create_column(&mut self, name: &str, sql_type: Arc<SqlType>) -> &mut ColumnDef {
        match self.columns.iter().position(|c| c.matches_name(name)) {
            Some(idx) => {
                let position = self.columns[idx].position;
                self.columns[idx] = ColumnDef::new(name, position, sql_type);
                &mut self.columns[idx]
            }
            None => {
                let position = self.columns.len() as u32 + 1;
                self.columns.push(ColumnDef::new(name, position, sql_type));
                self.columns.last_mut().expect("column just pushed")
            }
        }
    }

    // ===== Constraints =====

    /// The primary key, when one is defined.
    pub fn primary_key(&self) -> Option<&PrimaryKeyDef> {
        self.primary_key.as_ref()
    }

    /// Unique keys.
    pub fn unique_keys(&self) -> &[UniqueKeyDef] {
        &self.unique_keys
    }

    /// Foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKeyDef] {
        &self.foreign_keys
    }

    /// Define the primary key over existing columns, replacing any prior
    /// one. Column names resolve to their stored spelling.
    pub fn set_primary_key<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&PrimaryKeyDef> {
        self.set_primary_key_named(None, columns)
    }

    /// [`set_primary_key`](Self::set_primary_key) with a vendor-reported
    /// constraint name.
    pub fn set_primary_key_named<S: AsRef<str>>(
        &mut self,
        name: Option<String>,
        columns: &[S],
    ) -> Result<&PrimaryKeyDef> {
        let resolved = self.resolve_column_names(columns)?;
        let mut pk = PrimaryKeyDef::new(self.location.clone(), resolved);
        pk.name = name;
        self.primary_key = Some(pk);
        Ok(self.primary_key.as_ref().expect("primary key just set"))
    }

    /// Add a unique key over existing columns. Structurally equal keys are
    /// deduplicated.
    pub fn add_unique_key<S: AsRef<str>>(
        &mut self,
        name: Option<String>,
        columns: &[S],
    ) -> Result<&UniqueKeyDef> {
        let resolved = self.resolve_column_names(columns)?;
        let candidate = UniqueKeyDef::new(name, resolved);
        let idx = match self.unique_keys.iter().position(|uk| *uk == candidate) {
            Some(existing) => existing,
            None => {
                self.unique_keys.push(candidate);
                self.unique_keys.len() - 1
            }
        };
        Ok(&self.unique_keys[idx])
    }

    /// Get or create the foreign key for a (referenced primary key, ordered
    /// child columns) pair. Requesting the same pair twice returns the
    /// existing key; the name is synthesized as `<relationName>_fk<N>`.
    pub fn foreign_key_of<S: AsRef<str>>(
        &mut self,
        references: PrimaryKeyDef,
        columns: &[S],
    ) -> Result<&ForeignKeyDef> {
        let name = format!(
            "{}_fk{}",
            self.location.name().unwrap_or("relation"),
            self.foreign_keys.len() + 1
        );
        self.add_foreign_key(name, references, columns)
    }

    /// Get or create a foreign key with a vendor-supplied name.
    pub fn add_foreign_key<S: AsRef<str>>(
        &mut self,
        name: String,
        references: PrimaryKeyDef,
        columns: &[S],
    ) -> Result<&ForeignKeyDef> {
        let resolved = self.resolve_column_names(columns)?;
        if resolved.len() != references.columns.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "foreign key on {} has {} columns but references a {}-column key",
                self.full_name(),
                resolved.len(),
                references.columns.len()
            )));
        }
        let idx = match self
            .foreign_keys
            .iter()
            .position(|fk| fk.matches(&references, &resolved))
        {
            Some(existing) => existing,
            None => {
                self.foreign_keys.push(ForeignKeyDef {
                    name,
                    columns: resolved,
                    references,
                });
                self.foreign_keys.len() - 1
            }
        };
        Ok(&self.foreign_keys[idx])
    }

    fn resolve_column_names<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<String>> {
        if columns.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "a key needs at least one column".to_string(),
            ));
        }
        columns
            .iter()
            .map(|name| self.column(name.as_ref()).map(|c| c.name.clone()))
            .collect()
    }

    // ===== Merge (same store) =====

    /// Union this relation's columns with another's, preserving the source
    /// position order for newly adopted columns. Both relations must live on
    /// the same store.
    pub fn merge_columns(&mut self, other: &RelationDef) -> Result<()> {
        self.require_same_store(other)?;
        for col in other.columns() {
            if !self.has_column(&col.name) {
                self.adopt_column(col, &col.name);
            }
        }
        Ok(())
    }

    /// Adopt the other relation's primary key (when this one has none) and
    /// union its unique keys. Key columns must already exist here.
    pub fn merge_local_constraints(&mut self, other: &RelationDef) -> Result<()> {
        self.require_same_store(other)?;
        if self.primary_key.is_none() {
            if let Some(pk) = other.primary_key() {
                self.set_primary_key(&pk.columns)?;
            }
        }
        for uk in other.unique_keys() {
            self.add_unique_key(uk.name.clone(), &uk.columns)?;
        }
        Ok(())
    }

    /// Merge columns and local constraints.
    pub fn merge_struct(&mut self, other: &RelationDef) -> Result<()> {
        self.merge_columns(other)?;
        self.merge_local_constraints(other)
    }

    /// Merge the full data definition: columns, local constraints and
    /// foreign keys.
    pub fn merge_data_def(&mut self, other: &RelationDef) -> Result<()> {
        self.merge_struct(other)?;
        for fk in other.foreign_keys().to_vec() {
            self.add_foreign_key(fk.name, fk.references, &fk.columns)?;
        }
        Ok(())
    }

    // ===== Copy (any store) =====

    /// Replace this relation's shape with a copy of the source's columns,
    /// primary key and unique keys, preserving source position order.
    pub fn copy_struct(&mut self, source: &RelationDef) -> Result<()> {
        self.copy_struct_mapped(source, &|name| name.to_string())
    }

    /// [`copy_struct`](Self::copy_struct) with an identifier mapping applied
    /// to every column name, for targets with different naming conventions.
    pub fn copy_struct_mapped(
        &mut self,
        source: &RelationDef,
        map: &dyn Fn(&str) -> String,
    ) -> Result<()> {
        self.columns.clear();
        self.primary_key = None;
        self.unique_keys.clear();
        self.foreign_keys.clear();

        for col in source.columns() {
            let mapped = map(&col.name);
            self.adopt_column(col, &mapped);
        }
        if let Some(pk) = source.primary_key() {
            let cols: Vec<String> = pk.columns.iter().map(|c| map(c)).collect();
            self.set_primary_key(&cols)?;
        }
        for uk in source.unique_keys() {
            let cols: Vec<String> = uk.columns.iter().map(|c| map(c)).collect();
            self.add_unique_key(uk.name.clone(), &cols)?;
        }
        Ok(())
    }

    /// Copy the full data definition, foreign keys included.
    pub fn copy_data_def(&mut self, source: &RelationDef) -> Result<()> {
        self.copy_struct(source)?;
        self.copy_foreign_keys_from(source)
    }

    /// Copy the source's foreign keys, re-anchoring each referenced relation
    /// into this relation's store.
    pub fn copy_foreign_keys_from(&mut self, source: &RelationDef) -> Result<()> {
        self.copy_foreign_keys_mapped(source, &|name| name.to_string())
    }

    /// [`copy_foreign_keys_from`](Self::copy_foreign_keys_from) with an
    /// identifier mapping applied to constraint, column and referenced
    /// names.
    pub fn copy_foreign_keys_mapped(
        &mut self,
        source: &RelationDef,
        map: &dyn Fn(&str) -> String,
    ) -> Result<()> {
        let store = self.location.store().to_string();
        for fk in source.foreign_keys() {
            let ref_segments: Vec<String> = fk
                .references
                .relation
                .segments()
                .iter()
                .map(|s| map(s))
                .collect();
            let ref_location = Location::object(store.clone(), &ref_segments)?;
            let references = PrimaryKeyDef {
                name: fk.references.name.clone(),
                relation: ref_location,
                columns: fk.references.columns.iter().map(|c| map(c)).collect(),
            };
            let columns: Vec<String> = fk.columns.iter().map(|c| map(c)).collect();
            self.add_foreign_key(map(&fk.name), references, &columns)?;
        }
        Ok(())
    }

    fn adopt_column(&mut self, source: &ColumnDef, name: &str) {
        let col = self.create_column(name, Arc::clone(&source.sql_type));
        col.nullable = source.nullable;
        col.precision = source.precision;
        col.scale = source.scale;
        col.auto_increment = source.auto_increment;
        col.generated = source.generated;
        col.default_value = source.default_value.clone();
        col.comment = source.comment.clone();
        col.attributes = source.attributes.clone();
    }

    fn require_same_store(&self, other: &RelationDef) -> Result<()> {
        if self.location.store() != other.location.store() {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot merge {} into {}: relations live on different stores",
                other.full_name(),
                self.full_name()
            )));
        }
        Ok(())
    }
}

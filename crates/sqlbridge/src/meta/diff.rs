//! Structural comparison between two relations.

use serde::Serialize;

use super::{ColumnDef, RelationDef};

/// One changed column field: name, old value, new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub from: String,
    pub to: String,
}

/// A column present on both sides with differing definitions.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnChange {
    /// Column name (source spelling).
    pub name: String,
    /// Every differing field.
    pub fields: Vec<FieldChange>,
}

/// Result of [`RelationDef::diff`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationDiff {
    /// Columns present in the source but missing in the target.
    pub added: Vec<String>,
    /// Columns present in the target but missing in the source.
    pub removed: Vec<String>,
    /// Columns present on both sides with differing definitions.
    pub changed: Vec<ColumnChange>,
    /// Whether the primary keys differ structurally.
    pub primary_key_changed: bool,
    /// Whether the unique key sets differ.
    pub unique_keys_changed: bool,
    /// Whether the foreign key sets differ.
    pub foreign_keys_changed: bool,
}

impl RelationDiff {
    /// Whether the two relations have the same shape.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && !self.primary_key_changed
            && !self.unique_keys_changed
            && !self.foreign_keys_changed
    }
}

impl std::fmt::Display for RelationDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "no differences");
        }
        write!(
            f,
            "{} added, {} removed, {} changed",
            self.added.len(),
            self.removed.len(),
            self.changed.len()
        )
    }
}

impl RelationDef {
    /// Compare this relation's shape against a target relation.
    ///
    /// Columns match by case-insensitive name; types compare by identity
    /// key, falling back to the ANSI classification so that a copy into a
    /// store with a different type system still diffs clean.
    pub fn diff(&self, target: &RelationDef) -> RelationDiff {
        let mut diff = RelationDiff::default();

        for col in self.columns() {
            match target.column(&col.name) {
                Ok(other) => {
                    let fields = column_changes(col, other);
                    if !fields.is_empty() {
                        diff.changed.push(ColumnChange {
                            name: col.name.clone(),
                            fields,
                        });
                    }
                }
                Err(_) => diff.added.push(col.name.clone()),
            }
        }
        for col in target.columns() {
            if !self.has_column(&col.name) {
                diff.removed.push(col.name.clone());
            }
        }

        diff.primary_key_changed = match (self.primary_key(), target.primary_key()) {
            (None, None) => false,
            (Some(a), Some(b)) => !same_key_columns(&a.columns, &b.columns),
            _ => true,
        };
        diff.unique_keys_changed = self.unique_keys().len() != target.unique_keys().len()
            || self
                .unique_keys()
                .iter()
                .any(|uk| !target.unique_keys().contains(uk));
        diff.foreign_keys_changed = self.foreign_keys().len() != target.foreign_keys().len()
            || self.foreign_keys().iter().any(|fk| {
                !target
                    .foreign_keys()
                    .iter()
                    .any(|other| same_key_columns(&fk.columns, &other.columns))
            });

        diff
    }
}

fn same_key_columns(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn column_changes(source: &ColumnDef, target: &ColumnDef) -> Vec<FieldChange> {
    let mut fields = Vec::new();
    let mut push = |field: &'static str, from: String, to: String| {
        fields.push(FieldChange { field, from, to });
    };

    let types_match = source.sql_type.key == target.sql_type.key
        || matches!(
            (source.sql_type.ansi, target.sql_type.ansi),
            (Some(a), Some(b)) if a == b
        );
    if !types_match {
        push(
            "type",
            source.sql_type.to_string(),
            target.sql_type.to_string(),
        );
    }
    if source.position != target.position {
        push(
            "position",
            source.position.to_string(),
            target.position.to_string(),
        );
    }
    if source.nullable != target.nullable {
        push(
            "nullable",
            source.nullable.to_string(),
            target.nullable.to_string(),
        );
    }
    if source.precision != target.precision {
        push(
            "precision",
            format!("{:?}", source.precision),
            format!("{:?}", target.precision),
        );
    }
    if source.scale != target.scale {
        push(
            "scale",
            format!("{:?}", source.scale),
            format!("{:?}", target.scale),
        );
    }
    if source.auto_increment != target.auto_increment {
        push(
            "auto_increment",
            source.auto_increment.to_string(),
            target.auto_increment.to_string(),
        );
    }
    if source.default_value != target.default_value {
        push(
            "default",
            format!("{:?}", source.default_value),
            format!("{:?}", target.default_value),
        );
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use crate::types::{AnsiType, HostType, KeyPolicy, TypeBuilder, TypeCatalog};

    fn catalog() -> TypeCatalog {
        let mut cat = TypeCatalog::new(KeyPolicy::NameOnly, false, false);
        cat.declare(
            TypeBuilder::new("int", 4)
                .host(HostType::I32)
                .ansi(AnsiType::Integer),
        )
        .unwrap();
        cat.declare(
            TypeBuilder::new("integer", 4)
                .host(HostType::I32)
                .ansi(AnsiType::Integer),
        )
        .unwrap();
        cat.declare(
            TypeBuilder::new("varchar", 12)
                .host(HostType::Text)
                .ansi(AnsiType::Varchar)
                .precision(1, 8000),
        )
        .unwrap();
        cat.build().unwrap();
        cat
    }

    fn sample(cat: &TypeCatalog, store: &str) -> RelationDef {
        let mut rel =
            RelationDef::table(Location::object(store, &["dbo", "items"]).unwrap());
        rel.get_or_create_column("id", cat.type_by_name("int").unwrap())
            .unwrap();
        let name = rel.create_column("name", cat.type_by_name("varchar").unwrap());
        name.precision = Some(40);
        rel.set_primary_key(&["id"]).unwrap();
        rel
    }

    #[test]
    fn test_identical_relations_diff_empty() {
        let cat = catalog();
        let a = sample(&cat, "main");
        let b = sample(&cat, "main");
        let diff = a.diff(&b);
        assert!(diff.is_empty(), "{diff}");
    }

    #[test]
    fn test_copy_then_diff_round_trip() {
        let cat = catalog();
        let source = sample(&cat, "main");
        let mut target =
            RelationDef::table(Location::object("backup", &["dbo", "items"]).unwrap());
        target.copy_data_def(&source).unwrap();
        assert!(target.diff(&source).is_empty());
        assert!(source.diff(&target).is_empty());
    }

    #[test]
    fn test_added_removed_changed() {
        let cat = catalog();
        let mut a = sample(&cat, "main");
        a.create_column("extra", cat.type_by_name("int").unwrap());

        let mut b = sample(&cat, "main");
        b.create_column("legacy", cat.type_by_name("int").unwrap());
        b.column_mut("name").unwrap().precision = Some(80);

        let diff = a.diff(&b);
        assert_eq!(diff.added, vec!["extra"]);
        assert_eq!(diff.removed, vec!["legacy"]);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].name, "name");
        assert_eq!(diff.changed[0].fields[0].field, "precision");
    }

    #[test]
    fn test_types_compare_through_ansi() {
        let cat = catalog();
        let mut a = sample(&cat, "main");
        let mut b = sample(&cat, "main");
        // Same ANSI classification under different vendor names.
        a.create_column("n", cat.type_by_name("int").unwrap());
        b.create_column("n", cat.type_by_name("integer").unwrap());
        assert!(a.diff(&b).is_empty());
    }

    #[test]
    fn test_primary_key_change_detected() {
        let cat = catalog();
        let a = sample(&cat, "main");
        let mut b = sample(&cat, "main");
        b.set_primary_key(&["name"]).unwrap();
        let diff = a.diff(&b);
        assert!(diff.primary_key_changed);
        assert!(!diff.is_empty());
    }
}

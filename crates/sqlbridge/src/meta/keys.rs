//! Key constraint metadata.

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Primary key: an ordered column list owned by exactly one relation.
///
/// Equality is structural: owning location plus the ordered column list,
/// ignoring the constraint name. Column names compare case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyDef {
    /// Constraint name, when the vendor reports one.
    pub name: Option<String>,

    /// Location of the owning relation.
    pub relation: Location,

    /// Ordered key column names.
    pub columns: Vec<String>,
}

impl PrimaryKeyDef {
    /// Create a primary key for the given relation.
    pub fn new<S: Into<String>>(relation: Location, columns: Vec<S>) -> Self {
        Self {
            name: None,
            relation,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach the vendor-reported constraint name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl PartialEq for PrimaryKeyDef {
    fn eq(&self, other: &Self) -> bool {
        self.relation == other.relation
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for PrimaryKeyDef {}

/// Unique key: an unordered set of columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueKeyDef {
    /// Constraint name, when the vendor reports one.
    pub name: Option<String>,

    /// Key column names; order carries no meaning.
    pub columns: Vec<String>,
}

impl UniqueKeyDef {
    /// Create a unique key over the given columns.
    pub fn new<S: Into<String>>(name: Option<String>, columns: Vec<S>) -> Self {
        Self {
            name,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    fn sorted_lower(&self) -> Vec<String> {
        let mut cols: Vec<String> = self.columns.iter().map(|c| c.to_lowercase()).collect();
        cols.sort();
        cols
    }
}

impl PartialEq for UniqueKeyDef {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_lower() == other.sorted_lower()
    }
}

impl Eq for UniqueKeyDef {}

/// Foreign key: ordered local columns referencing another relation's
/// primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name, vendor-supplied or synthesized.
    pub name: String,

    /// Ordered local (child) column names.
    pub columns: Vec<String>,

    /// The referenced primary key.
    pub references: PrimaryKeyDef,
}

impl ForeignKeyDef {
    /// Whether this key matches the given (referenced pk, local columns)
    /// pair, the identity used for idempotent creation.
    pub fn matches(&self, references: &PrimaryKeyDef, columns: &[String]) -> bool {
        self.references == *references
            && self.columns.len() == columns.len()
            && self
                .columns
                .iter()
                .zip(columns)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl PartialEq for ForeignKeyDef {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.references, &other.columns)
    }
}

impl Eq for ForeignKeyDef {}

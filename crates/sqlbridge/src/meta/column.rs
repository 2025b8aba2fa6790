//! Column metadata.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::SqlType;

/// One column of a relation.
///
/// Names are matched case-insensitively throughout; the stored spelling is
/// whatever the caller or the store reported. Positions are 1-based and
/// dense within the owning relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name as declared or reported.
    pub name: String,

    /// 1-based ordinal position, assigned once at first creation.
    pub position: u32,

    /// The concrete type of this column.
    pub sql_type: Arc<SqlType>,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Declared precision (or length), when the type takes one.
    pub precision: Option<u32>,

    /// Declared scale, when the type takes one.
    pub scale: Option<u32>,

    /// Whether the column auto-increments.
    pub auto_increment: bool,

    /// Whether the column is computed by the store.
    pub generated: bool,

    /// Default value expression.
    pub default_value: Option<String>,

    /// Free-form comment.
    pub comment: Option<String>,

    /// Open attribute bag for extension data.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl ColumnDef {
    /// Create a column at the given position.
    pub fn new(name: impl Into<String>, position: u32, sql_type: Arc<SqlType>) -> Self {
        let auto_increment = sql_type.auto_increment;
        Self {
            name: name.into(),
            position,
            sql_type,
            nullable: true,
            precision: None,
            scale: None,
            auto_increment,
            generated: false,
            default_value: None,
            comment: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Case-insensitive name match.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Set an extension attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }

    /// Read an extension attribute.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnsiType, HostType, KeyPolicy, TypeKey};

    fn int_type() -> Arc<SqlType> {
        Arc::new(SqlType {
            key: TypeKey::new("int", 4, KeyPolicy::NameOnly),
            name: "int".to_string(),
            code: 4,
            host: HostType::I32,
            ansi: Some(AnsiType::Integer),
            min_precision: None,
            max_precision: None,
            max_scale: None,
            auto_increment: false,
            unsigned: false,
            aliases: vec![],
            priority: 0,
            parent: None,
            children: vec![],
        })
    }

    #[test]
    fn test_name_matching_is_case_insensitive() {
        let col = ColumnDef::new("UserId", 1, int_type());
        assert!(col.matches_name("userid"));
        assert!(col.matches_name("USERID"));
        assert!(!col.matches_name("user_id"));
    }

    #[test]
    fn test_attribute_bag() {
        let mut col = ColumnDef::new("id", 1, int_type());
        assert!(col.attribute("collation").is_none());
        col.set_attribute("collation", serde_json::json!("latin1"));
        assert_eq!(
            col.attribute("collation"),
            Some(&serde_json::json!("latin1"))
        );
    }
}

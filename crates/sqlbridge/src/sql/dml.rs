//! INSERT and SELECT text generation.

use crate::driver::SqlValue;
use crate::error::{BridgeError, Result};
use crate::location::Location;
use crate::meta::{ColumnDef, RelationDef};

use super::ddl::StatementGenerator;

impl StatementGenerator<'_> {
    /// The columns an INSERT targets: everything except autoincrement and
    /// generated columns, in position order.
    pub fn insert_columns<'r>(&self, relation: &'r RelationDef) -> Vec<&'r ColumnDef> {
        relation
            .columns()
            .iter()
            .filter(|c| !c.auto_increment && !c.generated)
            .collect()
    }

    /// Parameterized INSERT over the insertable columns.
    pub fn insert(&self, relation: &RelationDef) -> Result<String> {
        let quote = self.config.quote_style;
        let columns = self.insert_columns(relation);
        if columns.is_empty() {
            return Err(BridgeError::InvalidArgument(format!(
                "{} has no insertable columns",
                relation.full_name()
            )));
        }
        let names: Result<Vec<String>> = columns.iter().map(|c| quote.quote(&c.name)).collect();
        let placeholders: Vec<String> = (1..=columns.len())
            .map(|i| self.config.param_style.placeholder(i))
            .collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_name(&relation.location)?,
            names?.join(", "),
            placeholders.join(", ")
        ))
    }

    /// Literal-valued INSERT for one row, used when the driver cannot bind
    /// parameters. The row is aligned to [`insert_columns`](Self::insert_columns).
    pub fn insert_literal(&self, relation: &RelationDef, row: &[SqlValue]) -> Result<String> {
        let quote = self.config.quote_style;
        let columns = self.insert_columns(relation);
        if row.len() != columns.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "row has {} values but {} takes {} insertable columns",
                row.len(),
                relation.full_name(),
                columns.len()
            )));
        }
        let names: Result<Vec<String>> = columns.iter().map(|c| quote.quote(&c.name)).collect();
        let values: Vec<String> = row.iter().map(SqlValue::to_sql_literal).collect();
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.qualified_name(&relation.location)?,
            names?.join(", "),
            values.join(", ")
        ))
    }

    /// SELECT with an explicit column list, never `select *`, so projection
    /// order is deterministic and insulated from store-side reordering. A
    /// query relation returns its own SQL text.
    pub fn select(&self, relation: &RelationDef) -> Result<String> {
        if let Some(sql) = relation.location.query_text() {
            return Ok(sql.to_string());
        }
        if relation.column_count() == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "{} has no columns to select",
                relation.full_name()
            )));
        }
        Ok(format!(
            "SELECT {} FROM {}",
            self.column_list(relation)?,
            self.qualified_name(&relation.location)?
        ))
    }

    /// COUNT(*) query for a location.
    pub fn row_count(&self, location: &Location) -> Result<String> {
        if let Some(sql) = location.query_text() {
            return Ok(format!("SELECT COUNT(*) FROM ({sql}) AS q"));
        }
        Ok(format!(
            "SELECT COUNT(*) FROM {}",
            self.qualified_name(location)?
        ))
    }
}

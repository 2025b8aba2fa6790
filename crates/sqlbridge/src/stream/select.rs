//! Cursor-based row reading.

use tracing::debug;

use crate::driver::{Cursor, SqlValue};
use crate::error::Result;
use crate::meta::RelationDef;
use crate::sql::StatementGenerator;
use crate::store::{wrap_driver, Store};
use crate::types::HostType;

/// A forward cursor over one relation's rows.
///
/// Accessors are 0-based at this layer; the translation to the driver's
/// 1-based cursor happens here, once, nowhere else.
pub struct SelectStream<'a> {
    store: &'a Store,
    relation: RelationDef,
    sql: String,
    cursor: Box<dyn Cursor>,
}

impl<'a> SelectStream<'a> {
    /// Execute the relation's SELECT (explicit column list, or the query
    /// text for a query relation) and open a cursor over it.
    pub fn open(store: &'a Store, relation: &RelationDef) -> Result<SelectStream<'a>> {
        let sql = StatementGenerator::new(store.config()).select(relation)?;
        let cursor = store
            .with_connection(|conn| conn.query(&sql))
            .map_err(|e| wrap_driver(e, &sql, &relation.location))?;
        Ok(SelectStream {
            store,
            relation: relation.clone(),
            sql,
            cursor,
        })
    }

    /// The SELECT text this stream runs.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of projected columns.
    pub fn column_count(&self) -> usize {
        self.cursor.column_count()
    }

    /// Projected column names.
    pub fn column_names(&self) -> &[String] {
        self.cursor.column_names()
    }

    /// Advance to the next row; false once exhausted.
    pub fn next(&mut self) -> Result<bool> {
        self.cursor.advance()
    }

    /// Value of the 0-based column in the current row.
    pub fn value(&self, index: usize) -> Result<SqlValue> {
        self.cursor.value(index + 1)
    }

    /// Text of the 0-based column, None for NULL.
    pub fn string(&self, index: usize) -> Result<Option<String>> {
        Ok(match self.value(index)? {
            SqlValue::Null => None,
            other => Some(other.render()),
        })
    }

    /// 64-bit integer of the 0-based column, None for NULL.
    pub fn i64(&self, index: usize) -> Result<Option<i64>> {
        Ok(match self.value(index)?.cast_to(HostType::I64)? {
            SqlValue::Null => None,
            SqlValue::I64(v) => Some(v),
            _ => None,
        })
    }

    /// Double of the 0-based column, None for NULL.
    pub fn f64(&self, index: usize) -> Result<Option<f64>> {
        Ok(match self.value(index)?.cast_to(HostType::F64)? {
            SqlValue::Null => None,
            SqlValue::F64(v) => Some(v),
            _ => None,
        })
    }

    /// Reposition before the first row. A forward-only cursor cannot
    /// rewind, so the query is re-executed instead.
    pub fn before_first(&mut self) -> Result<()> {
        if self.cursor.is_forward_only() {
            debug!(
                "re-executing {} to rewind a forward-only cursor",
                self.relation.full_name()
            );
            self.cursor = self
                .store
                .with_connection(|conn| conn.query(&self.sql))
                .map_err(|e| wrap_driver(e, &self.sql, &self.relation.location))?;
            Ok(())
        } else {
            self.cursor.rewind()
        }
    }
}

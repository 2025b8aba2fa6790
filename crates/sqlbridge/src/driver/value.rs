//! SQL value types for store-agnostic row handling.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{BridgeError, Result};
use crate::types::HostType;

/// One SQL value as held in memory between a cursor read and a bind/insert.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer (smallint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (double precision).
    F64(f64),

    /// Exact decimal value.
    Decimal(Decimal),

    /// Text data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// UUID/GUID value.
    Uuid(Uuid),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    DateTimeTz(DateTime<FixedOffset>),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// The host value type of this value, None for NULL.
    #[must_use]
    pub fn host_type(&self) -> Option<HostType> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(_) => Some(HostType::Bool),
            SqlValue::I16(_) => Some(HostType::I16),
            SqlValue::I32(_) => Some(HostType::I32),
            SqlValue::I64(_) => Some(HostType::I64),
            SqlValue::F32(_) => Some(HostType::F32),
            SqlValue::F64(_) => Some(HostType::F64),
            SqlValue::Decimal(_) => Some(HostType::Decimal),
            SqlValue::Text(_) => Some(HostType::Text),
            SqlValue::Bytes(_) => Some(HostType::Bytes),
            SqlValue::Uuid(_) => Some(HostType::Uuid),
            SqlValue::Date(_) => Some(HostType::Date),
            SqlValue::Time(_) => Some(HostType::Time),
            SqlValue::DateTime(_) => Some(HostType::DateTime),
            SqlValue::DateTimeTz(_) => Some(HostType::DateTimeTz),
        }
    }

    /// Convert this value to the given host type.
    ///
    /// Lossless widenings always succeed, integer narrowings are
    /// range-checked, and anything converts to text. A conversion that would
    /// lose information is an `InvalidArgument` error, never a silent cast.
    pub fn cast_to(self, target: HostType) -> Result<SqlValue> {
        if self.is_null() {
            return Ok(SqlValue::Null);
        }
        if self.host_type() == Some(target) {
            return Ok(self);
        }
        match (self, target) {
            // Integer widening.
            (SqlValue::I16(v), HostType::I32) => Ok(SqlValue::I32(v as i32)),
            (SqlValue::I16(v), HostType::I64) => Ok(SqlValue::I64(v as i64)),
            (SqlValue::I32(v), HostType::I64) => Ok(SqlValue::I64(v as i64)),
            (SqlValue::I16(v), HostType::Decimal) => Ok(SqlValue::Decimal(Decimal::from(v))),
            (SqlValue::I32(v), HostType::Decimal) => Ok(SqlValue::Decimal(Decimal::from(v))),
            (SqlValue::I64(v), HostType::Decimal) => Ok(SqlValue::Decimal(Decimal::from(v))),

            // Exact integer-to-float widening.
            (SqlValue::I16(v), HostType::F64) => Ok(SqlValue::F64(v as f64)),
            (SqlValue::I32(v), HostType::F64) => Ok(SqlValue::F64(v as f64)),
            (SqlValue::F32(v), HostType::F64) => Ok(SqlValue::F64(v as f64)),

            // Range-checked integer narrowing.
            (SqlValue::I32(v), HostType::I16) => i16::try_from(v)
                .map(SqlValue::I16)
                .map_err(|_| narrowing("i32", v.to_string(), "i16")),
            (SqlValue::I64(v), HostType::I16) => i16::try_from(v)
                .map(SqlValue::I16)
                .map_err(|_| narrowing("i64", v.to_string(), "i16")),
            (SqlValue::I64(v), HostType::I32) => i32::try_from(v)
                .map(SqlValue::I32)
                .map_err(|_| narrowing("i64", v.to_string(), "i32")),

            // Text accepts a rendering of anything.
            (value, HostType::Text) => Ok(SqlValue::Text(value.render())),

            // Text parses into a UUID.
            (SqlValue::Text(s), HostType::Uuid) => Uuid::parse_str(s.trim())
                .map(SqlValue::Uuid)
                .map_err(|e| BridgeError::InvalidArgument(format!("invalid uuid text: {e}"))),

            (value, target) => Err(BridgeError::InvalidArgument(format!(
                "cannot convert {:?} value to host type {target:?}",
                value.host_type()
            ))),
        }
    }

    /// Render the value as plain text (no quoting).
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => v.to_string(),
            SqlValue::I16(v) => v.to_string(),
            SqlValue::I32(v) => v.to_string(),
            SqlValue::I64(v) => v.to_string(),
            SqlValue::F32(v) => v.to_string(),
            SqlValue::F64(v) => v.to_string(),
            SqlValue::Decimal(v) => v.to_string(),
            SqlValue::Text(v) => v.clone(),
            SqlValue::Bytes(v) => hex_literal(v),
            SqlValue::Uuid(v) => v.to_string(),
            SqlValue::Date(v) => v.format("%Y-%m-%d").to_string(),
            SqlValue::Time(v) => v.format("%H:%M:%S%.f").to_string(),
            SqlValue::DateTime(v) => v.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            SqlValue::DateTimeTz(v) => v.format("%Y-%m-%d %H:%M:%S%.f %:z").to_string(),
        }
    }

    /// Render the value as a SQL literal with single quotes doubled.
    ///
    /// Sufficient for generated statements against stores whose drivers do
    /// not support parameter binding; prefer bound parameters elsewhere.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => {
                if *v {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            SqlValue::I16(_)
            | SqlValue::I32(_)
            | SqlValue::I64(_)
            | SqlValue::F32(_)
            | SqlValue::F64(_)
            | SqlValue::Decimal(_) => self.render(),
            SqlValue::Bytes(v) => hex_literal(v),
            other => format!("'{}'", other.render().replace('\'', "''")),
        }
    }
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(3 + bytes.len() * 2);
    out.push_str("X'");
    for b in bytes {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('\'');
    out
}

fn narrowing(from: &str, value: String, to: &str) -> BridgeError {
    BridgeError::InvalidArgument(format!("{from} value {value} does not fit in {to}"))
}

// From implementations for common types
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::I16(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::F32(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for SqlValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        SqlValue::DateTimeTz(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_type_mapping() {
        assert_eq!(SqlValue::I32(1).host_type(), Some(HostType::I32));
        assert_eq!(SqlValue::Null.host_type(), None);
        assert_eq!(SqlValue::from("x").host_type(), Some(HostType::Text));
    }

    #[test]
    fn test_cast_widening() {
        assert_eq!(
            SqlValue::I16(7).cast_to(HostType::I64).unwrap(),
            SqlValue::I64(7)
        );
        assert_eq!(
            SqlValue::I64(7).cast_to(HostType::Decimal).unwrap(),
            SqlValue::Decimal(Decimal::from(7))
        );
    }

    #[test]
    fn test_cast_narrowing_is_range_checked() {
        assert_eq!(
            SqlValue::I64(1000).cast_to(HostType::I32).unwrap(),
            SqlValue::I32(1000)
        );
        assert!(SqlValue::I64(i64::MAX).cast_to(HostType::I32).is_err());
        assert!(SqlValue::I32(70_000).cast_to(HostType::I16).is_err());
    }

    #[test]
    fn test_cast_null_passes_through() {
        assert_eq!(
            SqlValue::Null.cast_to(HostType::Uuid).unwrap(),
            SqlValue::Null
        );
    }

    #[test]
    fn test_cast_text_to_uuid() {
        let id = Uuid::nil();
        assert_eq!(
            SqlValue::Text(id.to_string()).cast_to(HostType::Uuid).unwrap(),
            SqlValue::Uuid(id)
        );
        assert!(SqlValue::Text("not-a-uuid".into()).cast_to(HostType::Uuid).is_err());
    }

    #[test]
    fn test_unsupported_cast_is_an_error() {
        assert!(SqlValue::Bool(true).cast_to(HostType::Date).is_err());
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(SqlValue::I64(42).to_sql_literal(), "42");
        assert_eq!(SqlValue::Null.to_sql_literal(), "NULL");
        assert_eq!(SqlValue::Bool(true).to_sql_literal(), "TRUE");
        assert_eq!(
            SqlValue::Text("O'Brien".into()).to_sql_literal(),
            "'O''Brien'"
        );
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_sql_literal(), "X'DEAD'");
        assert_eq!(
            SqlValue::Uuid(Uuid::nil()).to_sql_literal(),
            "'00000000-0000-0000-0000-000000000000'"
        );
    }
}

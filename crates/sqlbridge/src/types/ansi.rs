//! ANSI standard type classifications.
//!
//! The ANSI classification is the vendor-neutral hub used to unify type
//! systems across dialects: every built vendor type may carry one, and the
//! catalog derives a per-classification representative type from it. The
//! alias tables below follow the standard spellings plus the handful of
//! abbreviations every mainstream engine understands.

use serde::{Deserialize, Serialize};

use super::HostType;

/// Vendor-neutral standard type category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnsiType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Double,
    Char,
    Varchar,
    Clob,
    Binary,
    Varbinary,
    Blob,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Interval,
    Uuid,
    Xml,
    Json,
}

impl AnsiType {
    /// All classifications, in a fixed order used for deterministic map
    /// derivation.
    pub fn all() -> &'static [AnsiType] {
        use AnsiType::*;
        &[
            Boolean, SmallInt, Integer, BigInt, Decimal, Real, Double, Char, Varchar, Clob,
            Binary, Varbinary, Blob, Date, Time, Timestamp, TimestampTz, Interval, Uuid, Xml,
            Json,
        ]
    }

    /// The standard name of this classification.
    pub fn name(&self) -> &'static str {
        match self {
            AnsiType::Boolean => "boolean",
            AnsiType::SmallInt => "smallint",
            AnsiType::Integer => "integer",
            AnsiType::BigInt => "bigint",
            AnsiType::Decimal => "decimal",
            AnsiType::Real => "real",
            AnsiType::Double => "double precision",
            AnsiType::Char => "character",
            AnsiType::Varchar => "character varying",
            AnsiType::Clob => "character large object",
            AnsiType::Binary => "binary",
            AnsiType::Varbinary => "binary varying",
            AnsiType::Blob => "binary large object",
            AnsiType::Date => "date",
            AnsiType::Time => "time",
            AnsiType::Timestamp => "timestamp",
            AnsiType::TimestampTz => "timestamp with time zone",
            AnsiType::Interval => "interval",
            AnsiType::Uuid => "uuid",
            AnsiType::Xml => "xml",
            AnsiType::Json => "json",
        }
    }

    /// Standard aliases and common abbreviations for this classification.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            AnsiType::Boolean => &["bool"],
            AnsiType::SmallInt => &["int2"],
            AnsiType::Integer => &["int", "int4"],
            AnsiType::BigInt => &["int8"],
            AnsiType::Decimal => &["numeric", "dec"],
            AnsiType::Real => &["float4"],
            AnsiType::Double => &["double", "float8", "float"],
            AnsiType::Char => &["char"],
            AnsiType::Varchar => &["varchar", "char varying"],
            AnsiType::Clob => &["clob", "text"],
            AnsiType::Binary => &[],
            AnsiType::Varbinary => &["varbinary"],
            AnsiType::Blob => &["blob", "bytea"],
            AnsiType::Date => &[],
            AnsiType::Time => &[],
            AnsiType::Timestamp => &["datetime"],
            AnsiType::TimestampTz => &["timestamptz"],
            AnsiType::Interval => &[],
            AnsiType::Uuid => &["uniqueidentifier", "guid"],
            AnsiType::Xml => &[],
            AnsiType::Json => &[],
        }
    }

    /// Whether the given normalized name is the standard name or one of the
    /// aliases of this classification.
    pub fn matches_name(&self, normalized: &str) -> bool {
        self.name() == normalized || self.aliases().contains(&normalized)
    }

    /// Find the classification whose standard name equals `normalized`.
    pub fn by_name(normalized: &str) -> Option<AnsiType> {
        AnsiType::all()
            .iter()
            .copied()
            .find(|a| a.name() == normalized)
    }

    /// Find the classification listing `normalized` among its aliases.
    pub fn by_alias(normalized: &str) -> Option<AnsiType> {
        AnsiType::all()
            .iter()
            .copied()
            .find(|a| a.aliases().contains(&normalized))
    }

    /// The host value type a value of this classification materializes as.
    pub fn default_host(&self) -> HostType {
        match self {
            AnsiType::Boolean => HostType::Bool,
            AnsiType::SmallInt => HostType::I16,
            AnsiType::Integer => HostType::I32,
            AnsiType::BigInt => HostType::I64,
            AnsiType::Decimal => HostType::Decimal,
            AnsiType::Real => HostType::F32,
            AnsiType::Double => HostType::F64,
            AnsiType::Char | AnsiType::Varchar | AnsiType::Clob => HostType::Text,
            AnsiType::Binary | AnsiType::Varbinary | AnsiType::Blob => HostType::Bytes,
            AnsiType::Date => HostType::Date,
            AnsiType::Time => HostType::Time,
            AnsiType::Timestamp => HostType::DateTime,
            AnsiType::TimestampTz => HostType::DateTimeTz,
            AnsiType::Interval => HostType::Text,
            AnsiType::Uuid => HostType::Uuid,
            AnsiType::Xml | AnsiType::Json => HostType::Text,
        }
    }
}

impl std::fmt::Display for AnsiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_alias_lookup() {
        assert_eq!(AnsiType::by_name("integer"), Some(AnsiType::Integer));
        assert_eq!(AnsiType::by_name("int"), None);
        assert_eq!(AnsiType::by_alias("int"), Some(AnsiType::Integer));
        assert_eq!(AnsiType::by_alias("int8"), Some(AnsiType::BigInt));
        assert_eq!(AnsiType::by_alias("no-such"), None);
    }

    #[test]
    fn test_matches_name() {
        assert!(AnsiType::Double.matches_name("double precision"));
        assert!(AnsiType::Double.matches_name("float8"));
        assert!(!AnsiType::Double.matches_name("real"));
    }

    #[test]
    fn test_alias_tables_are_disjoint() {
        // A name matching two classifications would make four-tier lookup
        // nondeterministic across builds.
        let mut seen = std::collections::HashSet::new();
        for ansi in AnsiType::all() {
            assert!(seen.insert(ansi.name().to_string()), "{}", ansi.name());
            for alias in ansi.aliases() {
                assert!(seen.insert(alias.to_string()), "{alias}");
            }
        }
    }
}

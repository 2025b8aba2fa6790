//! Type catalog and type-unification engine.
//!
//! Vendor-reported types are declared as [`TypeBuilder`]s, realized into an
//! immutable graph of [`SqlType`]s by the [`TypeCatalog`] build, and unified
//! across dialects through ANSI classifications and host value types.

mod ansi;
mod builder;
mod catalog;
mod key;

pub use ansi::AnsiType;
pub use builder::{TypeBuilder, TypeRegistry};
pub use catalog::{SqlType, TypeCatalog};
pub use key::{normalize_type_name, KeyPolicy, TypeKey};

use serde::{Deserialize, Serialize};

/// The in-memory value representation a type materializes as.
///
/// Mirrors the variants of [`SqlValue`](crate::driver::SqlValue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Text,
    Bytes,
    Uuid,
    Date,
    Time,
    DateTime,
    DateTimeTz,
}

impl HostType {
    /// The next wider host type in the lossless fallback chain, if any.
    ///
    /// Integers widen toward decimal, floats toward double. Everything else
    /// has no lossless widening.
    pub fn widened(self) -> Option<HostType> {
        match self {
            HostType::I16 => Some(HostType::I32),
            HostType::I32 => Some(HostType::I64),
            HostType::I64 => Some(HostType::Decimal),
            HostType::F32 => Some(HostType::F64),
            _ => None,
        }
    }

    /// Whether `self` reaches `target` by repeated lossless widening.
    pub fn widens_to(self, target: HostType) -> bool {
        let mut probe = self.widened();
        while let Some(h) = probe {
            if h == target {
                return true;
            }
            probe = h.widened();
        }
        false
    }
}

//! Type identity keys.
//!
//! Some drivers report stable numeric type codes, some do not, and some
//! report the same name under several codes. The [`KeyPolicy`] is a
//! connection-scoped choice of which parts of (name, code) identify a type.

use serde::{Deserialize, Serialize};

/// Which parts of (name, code) identify a type for a given store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Identity is the normalized name alone.
    #[default]
    NameOnly,
    /// Identity is the normalized name plus the numeric code.
    NameAndCode,
    /// Identity is the numeric code alone.
    CodeOnly,
}

/// The identity of a type under a [`KeyPolicy`].
///
/// Parts the policy ignores are blanked at construction, so two keys built
/// under the same policy compare equal exactly when the policy says they
/// identify the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeKey {
    name: String,
    code: i32,
}

impl TypeKey {
    /// Build a key for (name, code) under the given policy.
    pub fn new(name: &str, code: i32, policy: KeyPolicy) -> Self {
        let normalized = normalize_type_name(name);
        match policy {
            KeyPolicy::NameOnly => Self {
                name: normalized,
                code: 0,
            },
            KeyPolicy::NameAndCode => Self {
                name: normalized,
                code,
            },
            KeyPolicy::CodeOnly => Self {
                name: String::new(),
                code,
            },
        }
    }

    /// Normalized name part (empty under code-only policy).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric code part (zero under name-only policy).
    pub fn code(&self) -> i32 {
        self.code
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            write!(f, "#{}", self.code)
        } else if self.code == 0 {
            f.write_str(&self.name)
        } else {
            write!(f, "{}#{}", self.name, self.code)
        }
    }
}

/// Normalize a vendor type name for matching: trimmed, lowercased, inner
/// whitespace collapsed.
pub fn normalize_type_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("  INT  IDENTITY "), "int identity");
        assert_eq!(normalize_type_name("VarChar"), "varchar");
    }

    #[test]
    fn test_policy_blanks_unused_parts() {
        let by_name = TypeKey::new("INT", 4, KeyPolicy::NameOnly);
        assert_eq!(by_name, TypeKey::new("int", 99, KeyPolicy::NameOnly));

        let by_both = TypeKey::new("INT", 4, KeyPolicy::NameAndCode);
        assert_ne!(by_both, TypeKey::new("int", 99, KeyPolicy::NameAndCode));

        let by_code = TypeKey::new("INT", 4, KeyPolicy::CodeOnly);
        assert_eq!(by_code, TypeKey::new("other", 4, KeyPolicy::CodeOnly));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TypeKey::new("int", 4, KeyPolicy::NameAndCode).to_string(),
            "int#4"
        );
        assert_eq!(TypeKey::new("int", 4, KeyPolicy::NameOnly).to_string(), "int");
        assert_eq!(TypeKey::new("int", 4, KeyPolicy::CodeOnly).to_string(), "#4");
    }
}

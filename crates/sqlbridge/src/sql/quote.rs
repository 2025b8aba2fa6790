//! Identifier validation and quoting.
//!
//! SQL identifiers cannot be passed as bound parameters, only data values
//! can. Generated statements therefore validate every identifier for
//! suspicious content (null bytes, excessive length) and apply the store's
//! quoting style with in-quote escaping by doubling.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Maximum identifier length (conservative limit across databases).
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier before it is spliced into statement text.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BridgeError::InvalidArgument(
            "identifier cannot be empty".to_string(),
        ));
    }
    if name.contains('\0') {
        return Err(BridgeError::InvalidArgument(format!(
            "identifier contains a null byte: {name:?}"
        )));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(BridgeError::InvalidArgument(format!(
            "identifier exceeds {MAX_IDENTIFIER_LENGTH} bytes (got {}): {name:?}",
            name.len()
        )));
    }
    Ok(())
}

/// Identifier quoting style of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// `"identifier"` with inner double quotes doubled (the SQL standard).
    #[default]
    DoubleQuote,
    /// `[identifier]` with inner closing brackets doubled.
    Bracket,
    /// `` `identifier` `` with inner backticks doubled.
    Backtick,
    /// No quoting; the identifier must already be a plain name.
    Bare,
}

impl QuoteStyle {
    /// Quote one identifier, validating it first.
    pub fn quote(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        Ok(match self {
            QuoteStyle::DoubleQuote => format!("\"{}\"", name.replace('"', "\"\"")),
            QuoteStyle::Bracket => format!("[{}]", name.replace(']', "]]")),
            QuoteStyle::Backtick => format!("`{}`", name.replace('`', "``")),
            QuoteStyle::Bare => name.to_string(),
        })
    }
}

/// Statement parameter placeholder style of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStyle {
    /// `?` for every parameter.
    #[default]
    Question,
    /// `$1`, `$2`, ...
    Dollar,
    /// `@p1`, `@p2`, ...
    AtP,
}

impl ParamStyle {
    /// The placeholder for the given 1-based parameter index.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            ParamStyle::Question => "?".to_string(),
            ParamStyle::Dollar => format!("${index}"),
            ParamStyle::AtP => format!("@p{index}"),
        }
    }
}

//! Store configuration types.
//!
//! A [`StoreConfig`] describes one SQL-capable store: how its identifiers are
//! quoted, how statement parameters are written, how type identity is keyed,
//! and the batching/commit cadence used by the transfer streams. Configs are
//! plain serde structs loadable from YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::sql::{ParamStyle, QuoteStyle};
use crate::types::KeyPolicy;

/// Configuration for a single store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store name, used in location text (`table@name`).
    pub name: String,

    /// Vendor product name, used to look up an extension provider.
    /// None selects the generic, standards-based behavior.
    #[serde(default)]
    pub product: Option<String>,

    /// Strict mode: ambiguous name lookups and precision overflow become
    /// hard errors instead of best-effort fallbacks.
    #[serde(default)]
    pub strict: bool,

    /// Diagnostic mode: catalog build verifies that every vendor-declared
    /// type was realized.
    #[serde(default)]
    pub diagnostic: bool,

    /// Read-only store: NOT NULL clauses are suppressed in generated DDL.
    #[serde(default)]
    pub read_only: bool,

    /// Identifier quoting style.
    #[serde(default)]
    pub quote_style: QuoteStyle,

    /// Statement parameter placeholder style.
    #[serde(default)]
    pub param_style: ParamStyle,

    /// How type identity is keyed for this store's driver.
    #[serde(default)]
    pub key_policy: KeyPolicy,

    /// Rows per logical insert batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Commit every N batches.
    #[serde(default = "default_commit_interval")]
    pub commit_interval: usize,

    /// Default catalog for locations that omit one.
    #[serde(default)]
    pub default_catalog: Option<String>,

    /// Default schema for locations that omit one.
    #[serde(default)]
    pub default_schema: Option<String>,
}

fn default_batch_size() -> usize {
    500
}

fn default_commit_interval() -> usize {
    10
}

impl StoreConfig {
    /// Create a config with defaults for the given store name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product: None,
            strict: false,
            diagnostic: false,
            read_only: false,
            quote_style: QuoteStyle::default(),
            param_style: ParamStyle::default(),
            key_policy: KeyPolicy::default(),
            batch_size: default_batch_size(),
            commit_interval: default_commit_interval(),
            default_catalog: None,
            default_schema: None,
        }
    }

    /// Load a config from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse a config from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Builder-style toggle for strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Builder-style override for the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder-style override for the commit interval.
    pub fn with_commit_interval(mut self, commit_interval: usize) -> Self {
        self.commit_interval = commit_interval;
        self
    }
}

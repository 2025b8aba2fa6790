//! Type builder declarations and the registry arena they live in.
//!
//! A [`TypeBuilder`] is the mutable, pre-build declaration of one vendor
//! type. Builders are declared into a [`TypeRegistry`] (a plain arena indexed
//! by [`TypeKey`]) and resolved against each other by key lookup during the
//! catalog build, never by object identity.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_type_name, AnsiType, HostType, KeyPolicy, TypeKey};

/// Pre-build declaration of one vendor type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeBuilder {
    /// Vendor type name as reported or declared.
    pub name: String,

    /// Vendor numeric type code.
    pub code: i32,

    /// Host value type; inherited from the parent when unset.
    #[serde(default)]
    pub host: Option<HostType>,

    /// ANSI classification; inherited from the parent when unset.
    #[serde(default)]
    pub ansi: Option<AnsiType>,

    /// Smallest usable precision, when the type takes one.
    #[serde(default)]
    pub min_precision: Option<u32>,

    /// Largest declarable precision, when the type takes one.
    #[serde(default)]
    pub max_precision: Option<u32>,

    /// Largest declarable scale, when the type takes one.
    #[serde(default)]
    pub max_scale: Option<u32>,

    /// Whether the type auto-increments.
    #[serde(default)]
    pub auto_increment: bool,

    /// Whether the type is unsigned.
    #[serde(default)]
    pub unsigned: bool,

    /// Name of the parent type when this one is an alias/synonym.
    #[serde(default)]
    pub parent: Option<String>,

    /// Additional names this type answers to.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Tie-break priority among types sharing a classification.
    #[serde(default)]
    pub priority: i32,
}

impl TypeBuilder {
    /// Start a declaration for (name, code).
    pub fn new(name: impl Into<String>, code: i32) -> Self {
        Self {
            name: name.into(),
            code,
            host: None,
            ansi: None,
            min_precision: None,
            max_precision: None,
            max_scale: None,
            auto_increment: false,
            unsigned: false,
            parent: None,
            aliases: Vec::new(),
            priority: 0,
        }
    }

    /// Set the host value type.
    pub fn host(mut self, host: HostType) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the ANSI classification.
    pub fn ansi(mut self, ansi: AnsiType) -> Self {
        self.ansi = Some(ansi);
        self
    }

    /// Set the precision bounds.
    pub fn precision(mut self, min: u32, max: u32) -> Self {
        self.min_precision = Some(min);
        self.max_precision = Some(max);
        self
    }

    /// Set the maximum scale.
    pub fn max_scale(mut self, max: u32) -> Self {
        self.max_scale = Some(max);
        self
    }

    /// Mark the type as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark the type as unsigned.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Declare this type an alias/synonym of `parent`.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Add an alternative name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the tie-break priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The identity key of this declaration under a policy.
    pub fn key(&self, policy: KeyPolicy) -> TypeKey {
        TypeKey::new(&self.name, self.code, policy)
    }
}

/// Declaration arena: every builder registered before the catalog build.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    builders: Vec<TypeBuilder>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a builder. A declaration with the same key as an earlier one
    /// replaces it, which is how vendor hooks patch driver-reported types.
    pub fn declare(&mut self, builder: TypeBuilder, policy: KeyPolicy) {
        let key = builder.key(policy);
        if let Some(existing) = self
            .builders
            .iter_mut()
            .find(|b| b.key(policy) == key)
        {
            debug!("type declaration for {key} replaces an earlier one");
            *existing = builder;
        } else {
            self.builders.push(builder);
        }
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.builders.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Declarations in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeBuilder> {
        self.builders.iter()
    }

    /// Declaration at a registration index.
    pub(crate) fn get(&self, index: usize) -> &TypeBuilder {
        &self.builders[index]
    }

    /// Find a declaration index by normalized name, searching declared names
    /// first and aliases second. Used for parent resolution.
    pub(crate) fn find_by_name(&self, name: &str) -> Option<usize> {
        let normalized = normalize_type_name(name);
        if let Some(i) = self
            .builders
            .iter()
            .position(|b| normalize_type_name(&b.name) == normalized)
        {
            return Some(i);
        }
        self.builders.iter().position(|b| {
            b.aliases
                .iter()
                .any(|a| normalize_type_name(a) == normalized)
        })
    }
}

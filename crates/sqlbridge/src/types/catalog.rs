//! Per-connection type catalog: a deduplicated graph of built vendor types.
//!
//! Builders are declared into the catalog's registry, then realized in one
//! build pass: parents before children (with explicit three-color cycle
//! detection), followed by derivation of the ANSI map, the host-value-type
//! map, caller overrides, and an optional diagnostic verification that every
//! vendor-declared type was realized.
//!
//! The catalog is a state machine: unbuilt -> building -> built. Lookups
//! while building are a recursion error (a store implementation must not
//! need a type to resolve a type); lookups before the build are a lifecycle
//! error distinct from "no such type".

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{BridgeError, Result};

use super::{
    normalize_type_name, AnsiType, HostType, KeyPolicy, TypeBuilder, TypeKey, TypeRegistry,
};

/// A realized, immutable type node in the catalog graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlType {
    /// Identity key under the catalog's policy.
    pub key: TypeKey,
    /// Normalized vendor name.
    pub name: String,
    /// Vendor numeric code.
    pub code: i32,
    /// Host value type.
    pub host: HostType,
    /// ANSI classification, when the type has one.
    pub ansi: Option<AnsiType>,
    /// Smallest usable precision.
    pub min_precision: Option<u32>,
    /// Largest declarable precision.
    pub max_precision: Option<u32>,
    /// Largest declarable scale.
    pub max_scale: Option<u32>,
    /// Whether the type auto-increments.
    pub auto_increment: bool,
    /// Whether the type is unsigned.
    pub unsigned: bool,
    /// Normalized alternative names.
    pub aliases: Vec<String>,
    /// Tie-break priority.
    pub priority: i32,
    /// Key of the parent type when this one is an alias/synonym.
    pub parent: Option<TypeKey>,
    /// Keys of the alias types built on top of this one.
    pub children: Vec<TypeKey>,
}

impl SqlType {
    /// Whether this type is an alias/synonym of another.
    pub fn is_alias(&self) -> bool {
        self.parent.is_some()
    }

    /// Whether the type accepts a precision argument.
    pub fn takes_precision(&self) -> bool {
        self.max_precision.is_some()
    }

    /// Whether the type accepts a scale argument.
    pub fn takes_scale(&self) -> bool {
        self.max_scale.is_some()
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Catalog lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Unbuilt,
    Building,
    Built,
}

/// Three-color mark for the recursive parent-first build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Per-connection registry of built types with derived lookup tables.
#[derive(Debug)]
pub struct TypeCatalog {
    policy: KeyPolicy,
    strict: bool,
    diagnostic: bool,

    registry: TypeRegistry,
    vendor_declared: Vec<String>,
    host_overrides: Vec<(HostType, String)>,

    state: BuildState,
    types: Vec<Arc<SqlType>>,
    by_key: HashMap<TypeKey, usize>,
    ansi_map: HashMap<AnsiType, usize>,
    host_map: HashMap<HostType, usize>,
}

impl TypeCatalog {
    /// Create an unbuilt catalog.
    pub fn new(policy: KeyPolicy, strict: bool, diagnostic: bool) -> Self {
        Self {
            policy,
            strict,
            diagnostic,
            registry: TypeRegistry::new(),
            vendor_declared: Vec::new(),
            host_overrides: Vec::new(),
            state: BuildState::Unbuilt,
            types: Vec::new(),
            by_key: HashMap::new(),
            ansi_map: HashMap::new(),
            host_map: HashMap::new(),
        }
    }

    /// Create an unbuilt catalog from a store config.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.key_policy, config.strict, config.diagnostic)
    }

    /// The key policy of this catalog.
    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    /// Whether the catalog has been built.
    pub fn is_built(&self) -> bool {
        self.state == BuildState::Built
    }

    /// Declare a type builder. Allowed until the build completes; a later
    /// declaration with the same key replaces the earlier one.
    pub fn declare(&mut self, builder: TypeBuilder) -> Result<()> {
        if self.state == BuildState::Built {
            return Err(BridgeError::State(
                "cannot declare types on a built catalog".to_string(),
            ));
        }
        self.registry.declare(builder, self.policy);
        Ok(())
    }

    /// Record a vendor-reported type name for diagnostic verification.
    pub fn note_vendor_type(&mut self, name: impl Into<String>) {
        self.vendor_declared.push(name.into());
    }

    /// Force the host-type map entry for `host` to the type named
    /// `type_name`. Applied after the derived maps, taking precedence.
    pub fn override_host(&mut self, host: HostType, type_name: impl Into<String>) -> Result<()> {
        if self.state == BuildState::Built {
            return Err(BridgeError::State(
                "cannot override host mappings on a built catalog".to_string(),
            ));
        }
        self.host_overrides.push((host, type_name.into()));
        Ok(())
    }

    /// Build the catalog from the declared builders.
    pub fn build(&mut self) -> Result<()> {
        self.build_with(|_| Ok(()))
    }

    /// Build the catalog, first running a declaration hook (the store's
    /// vendor hook). A nested build, or any lookup from inside the hook,
    /// fails with a recursion error.
    pub fn build_with<F>(&mut self, hook: F) -> Result<()>
    where
        F: FnOnce(&mut TypeCatalog) -> Result<()>,
    {
        match self.state {
            BuildState::Built => return Ok(()),
            BuildState::Building => {
                return Err(BridgeError::Recursion(
                    "type catalog build re-entered".to_string(),
                ))
            }
            BuildState::Unbuilt => {}
        }
        self.state = BuildState::Building;
        let result = hook(self).and_then(|()| self.run_build());
        match result {
            Ok(()) => {
                self.state = BuildState::Built;
                debug!(
                    "type catalog built: {} types, {} ansi mappings, {} host mappings",
                    self.types.len(),
                    self.ansi_map.len(),
                    self.host_map.len()
                );
                Ok(())
            }
            Err(e) => {
                self.state = BuildState::Unbuilt;
                self.types.clear();
                self.by_key.clear();
                self.ansi_map.clear();
                self.host_map.clear();
                Err(e)
            }
        }
    }

    fn run_build(&mut self) -> Result<()> {
        let registry = self.registry.clone();
        let policy = self.policy;

        // Parent-first recursive realization with three-color marks.
        let mut marks = vec![Mark::White; registry.len()];
        let mut built: Vec<SqlType> = Vec::with_capacity(registry.len());
        let mut by_key: HashMap<TypeKey, usize> = HashMap::new();
        for i in 0..registry.len() {
            build_one(&registry, policy, i, &mut marks, &mut built, &mut by_key)?;
        }

        // Link children onto their parents.
        let links: Vec<(usize, TypeKey)> = built
            .iter()
            .filter_map(|t| {
                t.parent
                    .as_ref()
                    .map(|p| (by_key[p], t.key.clone()))
            })
            .collect();
        for (parent_idx, child_key) in links {
            built[parent_idx].children.push(child_key);
        }

        self.ansi_map = derive_ansi_map(&built);
        self.host_map = derive_host_map(&built, &self.ansi_map);

        // Caller overrides take precedence over the derived host map.
        for (host, type_name) in self.host_overrides.clone() {
            let idx = find_by_name_or_alias(&built, &type_name).ok_or_else(|| {
                BridgeError::Config(format!(
                    "host override for {host:?} names unknown type {type_name:?}"
                ))
            })?;
            self.host_map.insert(host, idx);
        }

        // Diagnostic mode: every vendor-declared type must have realized.
        if self.diagnostic {
            for name in &self.vendor_declared {
                if find_by_name_or_alias(&built, name).is_none() {
                    return Err(BridgeError::Config(format!(
                        "vendor-declared type {name:?} was not realized by the catalog build"
                    )));
                }
            }
        }

        self.by_key = by_key;
        self.types = built.into_iter().map(Arc::new).collect();
        Ok(())
    }

    fn require_built(&self) -> Result<()> {
        match self.state {
            BuildState::Built => Ok(()),
            BuildState::Building => Err(BridgeError::Recursion(
                "type lookup during catalog build".to_string(),
            )),
            BuildState::Unbuilt => Err(BridgeError::State(
                "type catalog is not built".to_string(),
            )),
        }
    }

    /// All built types in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<SqlType>> {
        self.types.iter()
    }

    /// The built type with the given key.
    pub fn type_for_key(&self, key: &TypeKey) -> Result<Arc<SqlType>> {
        self.require_built()?;
        self.by_key
            .get(key)
            .map(|&i| Arc::clone(&self.types[i]))
            .ok_or_else(|| BridgeError::not_found("type", key.to_string()))
    }

    /// The parent type of an alias, when it has one.
    pub fn parent_of(&self, t: &SqlType) -> Result<Option<Arc<SqlType>>> {
        match &t.parent {
            Some(key) => Ok(Some(self.type_for_key(key)?)),
            None => Ok(None),
        }
    }

    /// The alias types built on top of the given type.
    pub fn children_of(&self, t: &SqlType) -> Result<Vec<Arc<SqlType>>> {
        t.children
            .iter()
            .map(|key| self.type_for_key(key))
            .collect()
    }

    /// Look up the mapped type for a host value type.
    ///
    /// Walks the widening chain (i16 -> i32 -> i64 -> decimal, f32 -> f64)
    /// before giving up, and refuses to return a match whose host type is
    /// narrower than requested.
    pub fn type_for_host(&self, host: HostType) -> Result<Arc<SqlType>> {
        self.require_built()?;
        let mut probe = Some(host);
        while let Some(h) = probe {
            if let Some(&i) = self.host_map.get(&h) {
                let t = &self.types[i];
                if t.host != host && t.host.widens_to(host) {
                    return Err(BridgeError::InvalidArgument(format!(
                        "host type {host:?} would narrow to {:?} via type {}",
                        t.host, t.name
                    )));
                }
                return Ok(Arc::clone(t));
            }
            probe = h.widened();
        }
        Err(BridgeError::not_found("type", format!("host type {host:?}")))
    }

    /// Look up the representative type for an ANSI classification.
    pub fn type_for_ansi(&self, ansi: AnsiType) -> Result<Arc<SqlType>> {
        self.require_built()?;
        self.ansi_map
            .get(&ansi)
            .map(|&i| Arc::clone(&self.types[i]))
            .ok_or_else(|| BridgeError::not_found("type", ansi.to_string()))
    }

    /// Look up a type by name across four tiers: exact declared name, alias,
    /// ANSI standard name, ANSI alias. In strict mode a tier with more than
    /// one candidate is an ambiguity error; otherwise the first candidate in
    /// declaration order wins.
    pub fn type_by_name(&self, name: &str) -> Result<Arc<SqlType>> {
        self.require_built()?;
        let normalized = normalize_type_name(name);

        let exact: Vec<usize> = (0..self.types.len())
            .filter(|&i| self.types[i].name == normalized)
            .collect();
        if let Some(t) = self.pick_candidate(&normalized, &exact)? {
            return Ok(t);
        }

        let aliased: Vec<usize> = (0..self.types.len())
            .filter(|&i| self.types[i].aliases.iter().any(|a| a == &normalized))
            .collect();
        if let Some(t) = self.pick_candidate(&normalized, &aliased)? {
            return Ok(t);
        }

        if let Some(ansi) = AnsiType::by_name(&normalized) {
            if let Some(&i) = self.ansi_map.get(&ansi) {
                return Ok(Arc::clone(&self.types[i]));
            }
        }
        if let Some(ansi) = AnsiType::by_alias(&normalized) {
            if let Some(&i) = self.ansi_map.get(&ansi) {
                return Ok(Arc::clone(&self.types[i]));
            }
        }

        Err(BridgeError::not_found("type", name))
    }

    /// Look up a type by vendor code, preferring root types over aliases.
    pub fn type_for_code(&self, code: i32) -> Result<Arc<SqlType>> {
        self.require_built()?;
        let root = self
            .types
            .iter()
            .find(|t| t.code == code && !t.is_alias());
        let any = root.or_else(|| self.types.iter().find(|t| t.code == code));
        any.cloned()
            .ok_or_else(|| BridgeError::not_found("type", format!("code {code}")))
    }

    fn pick_candidate(&self, name: &str, candidates: &[usize]) -> Result<Option<Arc<SqlType>>> {
        match candidates {
            [] => Ok(None),
            [only] => Ok(Some(Arc::clone(&self.types[*only]))),
            many => {
                if self.strict {
                    Err(BridgeError::Ambiguous {
                        name: name.to_string(),
                        candidates: many
                            .iter()
                            .map(|&i| self.types[i].key.to_string())
                            .collect(),
                    })
                } else {
                    debug!("name {name} matches {} types, picking the first", many.len());
                    Ok(Some(Arc::clone(&self.types[many[0]])))
                }
            }
        }
    }
}

/// Realize one builder, parents first.
fn build_one(
    registry: &TypeRegistry,
    policy: KeyPolicy,
    index: usize,
    marks: &mut [Mark],
    built: &mut Vec<SqlType>,
    by_key: &mut HashMap<TypeKey, usize>,
) -> Result<usize> {
    let builder = registry.get(index);
    let key = builder.key(policy);
    match marks[index] {
        Mark::Gray => {
            return Err(BridgeError::Cycle(format!(
                "type {} references itself through its parent chain",
                builder.name
            )))
        }
        Mark::Black => return Ok(by_key[&key]),
        Mark::White => {}
    }
    marks[index] = Mark::Gray;

    let parent_idx = match &builder.parent {
        Some(parent_name) => {
            let pi = registry.find_by_name(parent_name).ok_or_else(|| {
                BridgeError::Config(format!(
                    "parent type {parent_name:?} of {:?} is not declared",
                    builder.name
                ))
            })?;
            Some(build_one(registry, policy, pi, marks, built, by_key)?)
        }
        None => None,
    };
    let parent = parent_idx.map(|i| &built[i]);

    let ansi = builder.ansi.or(parent.and_then(|p| p.ansi));
    let host = builder
        .host
        .or(parent.map(|p| p.host))
        .or(ansi.map(|a| a.default_host()))
        .ok_or_else(|| {
            BridgeError::Config(format!(
                "type {:?} declares no host value type and none can be inherited",
                builder.name
            ))
        })?;

    let realized = SqlType {
        key: key.clone(),
        name: normalize_type_name(&builder.name),
        code: builder.code,
        host,
        ansi,
        min_precision: builder.min_precision.or(parent.and_then(|p| p.min_precision)),
        max_precision: builder.max_precision.or(parent.and_then(|p| p.max_precision)),
        max_scale: builder.max_scale.or(parent.and_then(|p| p.max_scale)),
        auto_increment: builder.auto_increment,
        unsigned: builder.unsigned,
        aliases: builder
            .aliases
            .iter()
            .map(|a| normalize_type_name(a))
            .collect(),
        priority: builder.priority,
        parent: parent.map(|p| p.key.clone()),
        children: Vec::new(),
    };

    let idx = built.len();
    built.push(realized);
    by_key.insert(key, idx);
    marks[index] = Mark::Black;
    Ok(idx)
}

/// Derive the per-classification representative types.
///
/// Among the signed built types of each classification: prefer an exact name
/// match to the standard name or one of its aliases (highest priority on a
/// tie); otherwise a maximum-priority type that lists its own name among its
/// aliases; otherwise the maximum-priority type.
fn derive_ansi_map(built: &[SqlType]) -> HashMap<AnsiType, usize> {
    let mut map = HashMap::new();
    for &ansi in AnsiType::all() {
        let group: Vec<usize> = (0..built.len())
            .filter(|&i| built[i].ansi == Some(ansi) && !built[i].unsigned)
            .collect();
        if group.is_empty() {
            continue;
        }

        let exact: Vec<usize> = group
            .iter()
            .copied()
            .filter(|&i| ansi.matches_name(&built[i].name))
            .collect();
        let pick = if !exact.is_empty() {
            let top = exact.iter().map(|&i| built[i].priority).max().unwrap();
            exact
                .iter()
                .copied()
                .find(|&i| built[i].priority == top)
                .unwrap()
        } else {
            let top = group.iter().map(|&i| built[i].priority).max().unwrap();
            group
                .iter()
                .copied()
                .find(|&i| built[i].priority == top && built[i].aliases.contains(&built[i].name))
                .unwrap_or_else(|| {
                    group
                        .iter()
                        .copied()
                        .find(|&i| built[i].priority == top)
                        .unwrap()
                })
        };
        map.insert(ansi, pick);
    }
    map
}

/// Derive the per-host-value-type representative types.
///
/// For each host type: prefer the ANSI-mapped type when one of them lives in
/// the group (scanning classifications in fixed order); otherwise the
/// highest-priority type whose own name is a recognized ANSI name or alias;
/// otherwise the first type encountered.
fn derive_host_map(
    built: &[SqlType],
    ansi_map: &HashMap<AnsiType, usize>,
) -> HashMap<HostType, usize> {
    let mut map: HashMap<HostType, usize> = HashMap::new();
    let mut order: Vec<HostType> = Vec::new();
    for t in built {
        if !order.contains(&t.host) {
            order.push(t.host);
        }
    }

    for host in order {
        let group: Vec<usize> = (0..built.len())
            .filter(|&i| built[i].host == host)
            .collect();

        let from_ansi = AnsiType::all()
            .iter()
            .filter_map(|a| ansi_map.get(a))
            .copied()
            .find(|i| group.contains(i));

        let pick = from_ansi.unwrap_or_else(|| {
            let named: Vec<usize> = group
                .iter()
                .copied()
                .filter(|&i| {
                    AnsiType::by_name(&built[i].name).is_some()
                        || AnsiType::by_alias(&built[i].name).is_some()
                })
                .collect();
            if named.is_empty() {
                group[0]
            } else {
                let top = named.iter().map(|&i| built[i].priority).max().unwrap();
                named
                    .iter()
                    .copied()
                    .find(|&i| built[i].priority == top)
                    .unwrap()
            }
        });
        map.insert(host, pick);
    }
    map
}

/// Find a built type index by normalized name, declared names before aliases.
fn find_by_name_or_alias(built: &[SqlType], name: &str) -> Option<usize> {
    let normalized = normalize_type_name(name);
    built
        .iter()
        .position(|t| t.name == normalized)
        .or_else(|| {
            built
                .iter()
                .position(|t| t.aliases.iter().any(|a| a == &normalized))
        })
}

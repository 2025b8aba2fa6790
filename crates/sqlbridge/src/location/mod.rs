//! Location addressing for data elements inside a store.
//!
//! A [`Location`] identifies a table, view or ad-hoc query within one named
//! store. Object locations carry at most three ordered path segments
//! (catalog, schema, name); query locations carry free-form SQL text and no
//! segments. The text form is `[catalog.][schema.]name@storeName`.
//!
//! Relative navigation uses `.` (no-op), `..` (ascend one segment), a bare
//! segment (append) and a `/`-prefixed segment (absolute reset). Every
//! navigation result is re-derived from the segments so that store URIs stay
//! reproducible text rather than accidental object identity.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Maximum number of path segments (catalog, schema, name).
const MAX_SEGMENTS: usize = 3;

/// Path separator for absolute segments in navigation syntax.
pub const PATH_SEPARATOR: char = '/';

/// The addressable position of a table/view/query inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Store name this location belongs to.
    store: String,

    /// Ordered path segments, most specific last. Empty for the store root
    /// and for query locations.
    segments: Vec<String>,

    /// Free-form SQL text for query locations.
    query: Option<String>,
}

impl Location {
    /// The root of a store (no catalog/schema/name).
    pub fn root(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            segments: Vec::new(),
            query: None,
        }
    }

    /// An object location from ordered segments (most specific last).
    pub fn object<S: AsRef<str>>(store: impl Into<String>, segments: &[S]) -> Result<Self> {
        if segments.len() > MAX_SEGMENTS {
            return Err(BridgeError::InvalidArgument(format!(
                "location accepts at most {} segments (got {})",
                MAX_SEGMENTS,
                segments.len()
            )));
        }
        let mut out = Vec::with_capacity(segments.len());
        for seg in segments {
            out.push(validated_segment(seg.as_ref())?);
        }
        Ok(Self {
            store: store.into(),
            segments: out,
            query: None,
        })
    }

    /// A query location carrying free-form SQL text.
    pub fn query(store: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            segments: Vec::new(),
            query: Some(sql.into()),
        }
    }

    /// Parse the text form `[catalog.][schema.]name@storeName`.
    pub fn parse(text: &str) -> Result<Self> {
        let (path, store) = text.rsplit_once('@').ok_or_else(|| {
            BridgeError::InvalidArgument(format!("location text missing @store suffix: {text:?}"))
        })?;
        if store.is_empty() {
            return Err(BridgeError::InvalidArgument(format!(
                "location text has empty store name: {text:?}"
            )));
        }
        if path.is_empty() {
            return Ok(Self::root(store));
        }
        let segments: Vec<&str> = path.split('.').collect();
        Self::object(store, &segments)
    }

    /// Store name.
    pub fn store(&self) -> &str {
        &self.store
    }

    /// Whether this location is a query rather than a table/view.
    pub fn is_query(&self) -> bool {
        self.query.is_some()
    }

    /// SQL text of a query location.
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Whether this location is the store root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty() && self.query.is_none()
    }

    /// Number of filled path segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Ordered path segments, most specific last.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Object name: the last (most specific) segment.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Schema: the segment preceding the name, when present.
    pub fn schema(&self) -> Option<&str> {
        match self.segments.len() {
            n if n >= 2 => Some(&self.segments[n - 2]),
            _ => None,
        }
    }

    /// Catalog: only present on fully qualified three-segment locations.
    pub fn catalog(&self) -> Option<&str> {
        match self.segments.len() {
            3 => Some(&self.segments[0]),
            _ => None,
        }
    }

    /// Apply one navigation segment.
    ///
    /// `.` is a no-op, `..` ascends one segment (error at the root), a
    /// `/`-prefixed segment resets the path to that single segment, anything
    /// else appends. The result is always a freshly derived location.
    pub fn resolve(&self, segment: &str) -> Result<Location> {
        if self.is_query() {
            return Err(BridgeError::InvalidArgument(
                "cannot navigate relative to a query location".to_string(),
            ));
        }
        let mut segments = self.segments.clone();
        match segment {
            "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(BridgeError::InvalidArgument(format!(
                        "cannot ascend past the root of store {}",
                        self.store
                    )));
                }
            }
            other if other.starts_with(PATH_SEPARATOR) => {
                let name = validated_segment(&other[PATH_SEPARATOR.len_utf8()..])?;
                segments.clear();
                segments.push(name);
            }
            other => {
                if segments.len() == MAX_SEGMENTS {
                    return Err(BridgeError::InvalidArgument(format!(
                        "location {self} is already fully qualified"
                    )));
                }
                segments.push(validated_segment(other)?);
            }
        }
        Ok(Location {
            store: self.store.clone(),
            segments,
            query: None,
        })
    }

    /// Apply several navigation segments left-to-right.
    pub fn resolve_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<Location> {
        let mut current = self.clone();
        for seg in segments {
            current = current.resolve(seg.as_ref())?;
        }
        Ok(current)
    }

    /// Replace only the last segment.
    pub fn sibling(&self, name: &str) -> Result<Location> {
        if self.is_query() {
            return Err(BridgeError::InvalidArgument(
                "a query location has no siblings".to_string(),
            ));
        }
        let mut segments = self.segments.clone();
        match segments.last_mut() {
            Some(last) => *last = validated_segment(name)?,
            None => {
                return Err(BridgeError::InvalidArgument(format!(
                    "the root of store {} has no sibling",
                    self.store
                )))
            }
        }
        Ok(Location {
            store: self.store.clone(),
            segments,
            query: None,
        })
    }

    /// The same path addressed in a different store.
    pub fn with_store(&self, store: impl Into<String>) -> Location {
        Location {
            store: store.into(),
            segments: self.segments.clone(),
            query: self.query.clone(),
        }
    }

    /// The same location with the object name replaced (or set).
    pub fn with_name(&self, name: &str) -> Result<Location> {
        if self.segments.is_empty() {
            self.resolve(name)
        } else {
            self.sibling(name)
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(sql) = &self.query {
            return write!(f, "{sql}");
        }
        write!(f, "{}@{}", self.segments.join("."), self.store)
    }
}

/// Validate one path segment: non-empty, no NUL byte, no syntax characters.
fn validated_segment(segment: &str) -> Result<String> {
    if segment.is_empty() {
        return Err(BridgeError::InvalidArgument(
            "location segment cannot be empty".to_string(),
        ));
    }
    if segment.contains('\0') {
        return Err(BridgeError::InvalidArgument(format!(
            "location segment contains a null byte: {segment:?}"
        )));
    }
    if segment.contains('.') || segment.contains('@') || segment.contains(PATH_SEPARATOR) {
        return Err(BridgeError::InvalidArgument(format!(
            "location segment contains a reserved character: {segment:?}"
        )));
    }
    Ok(segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Location {
        Location::object("main", &["crm", "dbo", "users"]).unwrap()
    }

    #[test]
    fn test_accessors() {
        let loc = table();
        assert_eq!(loc.store(), "main");
        assert_eq!(loc.catalog(), Some("crm"));
        assert_eq!(loc.schema(), Some("dbo"));
        assert_eq!(loc.name(), Some("users"));
        assert!(!loc.is_root());
        assert!(!loc.is_query());
    }

    #[test]
    fn test_partial_qualification() {
        let loc = Location::object("main", &["dbo", "users"]).unwrap();
        assert_eq!(loc.catalog(), None);
        assert_eq!(loc.schema(), Some("dbo"));
        assert_eq!(loc.name(), Some("users"));

        let loc = Location::object("lite", &["users"]).unwrap();
        assert_eq!(loc.schema(), None);
        assert_eq!(loc.name(), Some("users"));
    }

    #[test]
    fn test_display_and_parse_round_trip() {
        let loc = table();
        assert_eq!(loc.to_string(), "crm.dbo.users@main");
        assert_eq!(Location::parse("crm.dbo.users@main").unwrap(), loc);

        let root = Location::root("main");
        assert_eq!(root.to_string(), "@main");
        assert_eq!(Location::parse("@main").unwrap(), root);
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        assert!(Location::parse("users").is_err());
        assert!(Location::parse("users@").is_err());
        assert!(Location::parse("a.b.c.d@main").is_err());
        assert!(Location::parse(".users@main").is_err());
    }

    #[test]
    fn test_resolve_dot_is_identity() {
        let loc = table();
        assert_eq!(loc.resolve(".").unwrap(), loc);
    }

    #[test]
    fn test_resolve_ascend_and_restore() {
        let base = Location::object("main", &["dbo"]).unwrap();
        let child = base.resolve("users").unwrap();
        assert_eq!(child.name(), Some("users"));
        assert_eq!(child.resolve("..").unwrap(), base);
    }

    #[test]
    fn test_resolve_ascend_at_root_is_an_error() {
        let err = Location::root("main").resolve("..").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[test]
    fn test_resolve_absolute_resets_path() {
        let loc = table().resolve("/archive").unwrap();
        assert_eq!(loc.segments(), ["archive"]);
        assert_eq!(loc.store(), "main");
    }

    #[test]
    fn test_resolve_refuses_fourth_segment() {
        assert!(table().resolve("extra").is_err());
    }

    #[test]
    fn test_resolve_path_applies_left_to_right() {
        let loc = Location::root("main")
            .resolve_path(&["crm", "dbo", "users", "..", "orders"])
            .unwrap();
        assert_eq!(loc.to_string(), "crm.dbo.orders@main");
    }

    #[test]
    fn test_sibling() {
        let loc = table().sibling("orders").unwrap();
        assert_eq!(loc.to_string(), "crm.dbo.orders@main");
        assert!(Location::root("main").sibling("x").is_err());
    }

    #[test]
    fn test_query_locations_do_not_navigate() {
        let q = Location::query("main", "select 1");
        assert!(q.is_query());
        assert_eq!(q.query_text(), Some("select 1"));
        assert!(q.resolve("x").is_err());
        assert!(q.sibling("x").is_err());
    }

    #[test]
    fn test_segment_validation() {
        assert!(Location::object("main", &[""]).is_err());
        assert!(Location::object("main", &["a\0b"]).is_err());
        assert!(Location::object("main", &["a.b"]).is_err());
    }

    #[test]
    fn test_with_store_remaps_for_copy() {
        let loc = table().with_store("backup");
        assert_eq!(loc.to_string(), "crm.dbo.users@backup");
    }
}

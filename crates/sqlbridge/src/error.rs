//! Error types for the metadata and transfer library.

use thiserror::Error;

/// Main error type for metadata, catalog and transfer operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A named element (column, type, location) does not exist.
    #[error("No such {kind}: {name}{}", context_suffix(.context))]
    NotFound {
        /// What kind of element was looked up ("column", "type", ...).
        kind: &'static str,
        /// The name that failed to resolve.
        name: String,
        /// Where the lookup happened, when known.
        context: Option<String>,
    },

    /// Malformed identifier, null required value, or a lossy match that
    /// strict rules refuse to return.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Strict-mode lookup matched more than one candidate.
    #[error("Ambiguous name {name}: matches {}", .candidates.join(", "))]
    Ambiguous {
        /// The name that was looked up.
        name: String,
        /// Every candidate that matched in the same search tier.
        candidates: Vec<String>,
    },

    /// Type catalog build re-entered itself.
    #[error("Recursive type catalog access: {0}")]
    Recursion(String),

    /// A type builder references itself through its parent chain.
    #[error("Type alias cycle detected at {0}")]
    Cycle(String),

    /// Operation not implemented by this store.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The underlying connectivity call failed. Always carries the attempted
    /// SQL text and the target location when they are known.
    #[error("Driver failure: {message}{}{}", sql_suffix(.sql), context_suffix(.location))]
    Driver {
        message: String,
        sql: Option<String>,
        location: Option<String>,
    },

    /// Lifecycle violation (e.g. a lookup against an unbuilt catalog or a
    /// closed stream). Distinct from NotFound by design.
    #[error("Invalid state: {0}")]
    State(String),

    /// IO error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn sql_suffix(sql: &Option<String>) -> String {
    match sql {
        Some(s) => format!("\n  SQL: {s}"),
        None => String::new(),
    }
}

fn context_suffix(context: &Option<String>) -> String {
    match context {
        Some(c) => format!(" (at {c})"),
        None => String::new(),
    }
}

impl BridgeError {
    /// Create a NotFound error for a named element.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        BridgeError::NotFound {
            kind,
            name: name.into(),
            context: None,
        }
    }

    /// Create a NotFound error with location context.
    pub fn not_found_at(
        kind: &'static str,
        name: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        BridgeError::NotFound {
            kind,
            name: name.into(),
            context: Some(context.into()),
        }
    }

    /// Create a Driver error without statement context.
    pub fn driver(message: impl Into<String>) -> Self {
        BridgeError::Driver {
            message: message.into(),
            sql: None,
            location: None,
        }
    }

    /// Attach the attempted SQL text to a Driver error.
    pub fn with_sql(self, sql: impl Into<String>) -> Self {
        match self {
            BridgeError::Driver {
                message, location, ..
            } => BridgeError::Driver {
                message,
                sql: Some(sql.into()),
                location,
            },
            other => other,
        }
    }

    /// Attach the target location to a Driver error.
    pub fn with_location(self, location: impl ToString) -> Self {
        match self {
            BridgeError::Driver { message, sql, .. } => BridgeError::Driver {
                message,
                sql,
                location: Some(location.to_string()),
            },
            other => other,
        }
    }

    /// Format error with full details including the source chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
